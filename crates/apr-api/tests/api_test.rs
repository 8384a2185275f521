//! HTTP tests against a live server on an ephemeral port, with a temp
//! workspace, the lopdf processor and a mock LLM backend.

use std::sync::Arc;

use apr_api::AppState;
use apr_core::{AppConfig, Role};
use apr_inference::mock::MockBackend;
use apr_pdf::test_fixtures::sample_pdf;
use apr_pdf::LopdfProcessor;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

struct TestServer {
    base_url: String,
    client: Client,
    llm: MockBackend,
    workspace: TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> reqwest::Response {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .unwrap();
        self.client
            .post(self.url("/papers/upload"))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn post_json(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }
}

async fn spawn_with(llm: MockBackend, max_file_size_mb: u64) -> TestServer {
    let workspace = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.storage.workspace_root = workspace.path().to_path_buf();
    config.pdf.max_file_size_mb = max_file_size_mb;

    let state = AppState::new(
        config,
        Arc::new(LopdfProcessor::new()),
        Arc::new(llm.clone()),
    );
    let router = apr_api::app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Give server a moment to start
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    TestServer {
        base_url,
        client: Client::new(),
        llm,
        workspace,
    }
}

async fn spawn() -> TestServer {
    spawn_with(MockBackend::new().with_fixed_response("Mock answer"), 50).await
}

// -- Health --

#[tokio::test]
async fn test_health_endpoints() {
    let server = spawn().await;

    let (status, body) = server.get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "ai-paper-reader");

    let (status, body) = server.get_json("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let server = spawn().await;
    let resp = server.client.get(server.url("/health")).send().await.unwrap();
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let server = spawn().await;
    let resp = server
        .client
        .get(server.url("/health"))
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
}

// -- Papers --

#[tokio::test]
async fn test_upload_list_get_and_delete_paper() {
    let server = spawn().await;
    let bytes = sample_pdf(2, Some("Attention Is All You Need"), Some("Vaswani"));

    let resp = server.upload("Foo Bar.pdf", bytes.clone()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["paper"]["id"], "Foo Bar");
    assert_eq!(body["paper"]["page_count"], 2);
    assert_eq!(body["message"], "Paper uploaded successfully");

    let (status, list) = server.get_json("/papers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, found) = server.get_json("/papers/search?q=vaswani").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found[0]["id"], "Foo Bar");

    let (status, paper) = server.get_json("/papers/Foo%20Bar").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paper["paper"]["title"], "Attention Is All You Need");

    let resp = server
        .client
        .get(server.url("/papers/Foo%20Bar/content"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/pdf");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), bytes.as_slice());

    let resp = server
        .client
        .delete(server.url("/papers/Foo%20Bar"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, body) = server.get_json("/papers/Foo%20Bar").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["category"], "not_found");
}

#[tokio::test]
async fn test_upload_rejects_non_pdf() {
    let server = spawn().await;
    let resp = server.upload("notes.txt", b"plain text".to_vec()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["category"], "invalid_input");
    assert_eq!(body["error"], "Only PDF files are allowed");
}

#[tokio::test]
async fn test_upload_over_limit_is_413_and_writes_nothing() {
    let server = spawn_with(MockBackend::new(), 1).await;
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(1_500_000, b' ');

    let resp = server.upload("Big.pdf", bytes).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["category"], "payload_too_large");
    assert_eq!(
        std::fs::read_dir(server.workspace.path()).unwrap().count(),
        0
    );
}

#[tokio::test]
async fn test_upload_past_request_body_limit_keeps_json_error() {
    // Larger than the upload maximum plus multipart overhead, so the body
    // limit trips while the multipart field is still being read.
    let server = spawn_with(MockBackend::new(), 1).await;
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(2_500_000, b' ');

    let resp = server.upload("Huge.pdf", bytes).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["category"], "payload_too_large");
    assert!(body["error"].as_str().unwrap().contains("1 MB"));
    assert_eq!(
        std::fs::read_dir(server.workspace.path()).unwrap().count(),
        0
    );
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let server = spawn().await;
    let resp = server
        .client
        .post(server.url("/papers/upload"))
        .multipart(Form::new().text("other", "value"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_search_is_rejected() {
    let server = spawn().await;
    let (status, body) = server.get_json("/papers/search?q=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["category"], "invalid_input");
}

// -- PDF --

#[tokio::test]
async fn test_pdf_details_and_text() {
    let server = spawn().await;
    server.upload("paper.pdf", sample_pdf(3, None, None)).await;

    let (status, details) = server.get_json("/pdf/paper").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["page_count"], 3);
    assert_eq!(details["filename"], "paper.pdf");

    let (status, text) = server.get_json("/pdf/paper/text?pages=1-2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text["page_count"], 3);
    let pages: Vec<u64> = text["texts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["page"].as_u64().unwrap())
        .collect();
    assert_eq!(pages, vec![1, 2]);

    let (status, _) = server.get_json("/pdf/paper/text?pages=5-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.get_json("/pdf/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_highlight_by_rect_writes_annotated_copy() {
    let server = spawn().await;
    server.upload("paper.pdf", sample_pdf(1, None, None)).await;

    let (status, body) = server
        .post_json(
            "/pdf/paper/highlight",
            json!({
                "page": 0,
                "rect": {"x0": 72.0, "y0": 60.0, "x1": 300.0, "y1": 80.0},
                "comment": "key result"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["saved_path"], "paper_annotated.pdf");
    assert!(body["highlight_id"].is_string());
    assert!(server
        .workspace
        .path()
        .join("paper")
        .join("paper_annotated.pdf")
        .is_file());

    let (status, _) = server
        .post_json("/pdf/paper/highlight", json!({"page": 0}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post_json(
            "/pdf/paper/highlight",
            json!({"page": 9, "rect": {"x0": 0.0, "y0": 0.0, "x1": 1.0, "y1": 1.0}}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// -- Notes --

#[tokio::test]
async fn test_note_lifecycle() {
    let server = spawn().await;
    server.upload("p1.pdf", sample_pdf(1, None, None)).await;

    let (status, created) = server
        .post_json("/notes", json!({"paper_id": "p1", "content": "hello"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["content"], "hello");
    assert!(!created["html"].as_str().unwrap().is_empty());

    let (status, conflict) = server
        .post_json("/notes", json!({"paper_id": "p1", "content": "again"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        conflict["error"],
        "Note already exists for paper: p1. Use PUT to update."
    );

    let resp = server
        .client
        .patch(server.url("/notes/p1"))
        .json(&json!({"content": "world"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let patched: Value = resp.json().await.unwrap();
    assert_eq!(patched["content"], "hello\n\n---\n\nworld");

    let (status, alias) = server.get_json("/notes/paper/p1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alias["content"], "hello\n\n---\n\nworld");

    let (status, html) = server.get_json("/notes/p1/html").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(html["note_id"], "p1");
    assert!(html["html"].as_str().unwrap().contains("<hr"));

    let (status, list) = server.get_json("/notes?paper_id=p1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);

    let resp = server
        .client
        .put(server.url("/notes/p1"))
        .json(&json!({"content": "# Rewritten"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = server
        .client
        .delete(server.url("/notes/p1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, body) = server.get_json("/notes/p1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["category"], "not_found");
}

#[tokio::test]
async fn test_update_missing_note_is_404() {
    let server = spawn().await;
    let resp = server
        .client
        .put(server.url("/notes/ghost"))
        .json(&json!({"content": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// -- AI --

#[tokio::test]
async fn test_ask_with_context() {
    let server = spawn().await;
    let (status, body) = server
        .post_json(
            "/ai/ask",
            json!({"query": "What is attention?", "context": "Attention weighs tokens."}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Mock answer");
    assert_eq!(body["context_used"], true);
    assert_eq!(body["model"], "mock-model");
    assert_eq!(body["provider"], "mock");

    let call = server.llm.last_call().unwrap();
    assert_eq!(call[0].role, Role::System);
    assert!(call[0].content.contains("Attention weighs tokens."));
    assert_eq!(call[1].content, "What is attention?");
}

#[tokio::test]
async fn test_ask_custom_system_prompt_and_missing_pdf() {
    let server = spawn().await;
    let (status, body) = server
        .post_json(
            "/ai/ask",
            json!({"query": "hi", "pdf_id": "nope", "system_prompt": "Be terse."}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["context_used"], false);
    assert_eq!(server.llm.last_call().unwrap()[0].content, "Be terse.");
}

#[tokio::test]
async fn test_ask_empty_query_is_400() {
    let server = spawn().await;
    let (status, body) = server.post_json("/ai/ask", json!({"query": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Query cannot be empty");
    assert_eq!(server.llm.call_count(), 0);
}

#[tokio::test]
async fn test_upstream_errors_map_to_status() {
    let cases = [
        (
            "Error code: 429 - rate_limit_exceeded",
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
        ),
        (
            "authentication failed",
            StatusCode::UNAUTHORIZED,
            "unauthorized",
        ),
        (
            "insufficient_quota",
            StatusCode::PAYMENT_REQUIRED,
            "quota_exceeded",
        ),
        (
            "connection reset",
            StatusCode::INTERNAL_SERVER_ERROR,
            "upstream_error",
        ),
    ];

    for (message, expected_status, category) in cases {
        let server = spawn_with(MockBackend::new().with_error(message), 50).await;
        let (status, body) = server.post_json("/ai/ask", json!({"query": "q"})).await;
        assert_eq!(status, expected_status, "for {}", message);
        assert_eq!(body["category"], category);
    }
}

#[tokio::test]
async fn test_summarize() {
    let server = spawn().await;

    let (status, body) = server.post_json("/ai/summarize", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No text or PDF provided to summarize");

    let (status, body) = server
        .post_json("/ai/summarize", json!({"context": "Long technical text."}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "Summarize content");
    assert_eq!(body["context_used"], true);

    let call = server.llm.last_call().unwrap();
    assert!(call[1]
        .content
        .starts_with("Please summarize the following content:"));
    assert!(call[1].content.contains("Long technical text."));
}

#[tokio::test]
async fn test_models() {
    let server = spawn().await;
    let (status, body) = server.get_json("/ai/models").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], "openai");
    assert_eq!(body["model"], "mock-model");
    assert_eq!(
        body["available_providers"],
        json!(["openai", "grok", "minimax"])
    );
}

// -- Chat --

#[tokio::test]
async fn test_stateless_chat_forwards_history() {
    let server = spawn().await;
    let (status, body) = server
        .post_json(
            "/chat/ask",
            json!({
                "message": "And the decoder?",
                "paper_id": "p1",
                "history": [
                    {"role": "user", "content": "Explain the encoder"},
                    {"role": "assistant", "content": "It stacks layers."}
                ]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Mock answer");
    assert_eq!(body["sources"], json!([]));

    let call = server.llm.last_call().unwrap();
    assert_eq!(call.len(), 4);
    assert!(call[0].content.contains("Paper ID: p1"));
    assert_eq!(call[3].content, "And the decoder?");
}

#[tokio::test]
async fn test_chat_session_lifecycle() {
    let server = spawn().await;

    let (status, session) = server
        .post_json("/chat/sessions", json!({"paper_id": "p1"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["title"], "New Chat");
    let id = session["id"].as_str().unwrap().to_string();

    let (status, reply) = server
        .post_json(
            &format!("/chat/sessions/{}/messages", id),
            json!({"content": "Summarize section 2"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["role"], "assistant");
    assert_eq!(reply["content"], "Mock answer");

    server
        .post_json(
            &format!("/chat/sessions/{}/messages", id),
            json!({"content": "And section 3?"}),
        )
        .await;
    // system + two recorded turns + new message
    assert_eq!(server.llm.last_call().unwrap().len(), 4);

    let (status, fetched) = server.get_json(&format!("/chat/sessions/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["messages"].as_array().unwrap().len(), 4);

    let (_, all) = server.get_json("/chat/sessions").await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let resp = server
        .client
        .delete(server.url(&format!("/chat/sessions/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, body) = server.get_json(&format!("/chat/sessions/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Session not found");
}

#[tokio::test]
async fn test_failed_session_message_is_not_recorded() {
    let server = spawn_with(MockBackend::new().with_error("connection reset"), 50).await;
    let (_, session) = server.post_json("/chat/sessions", json!({})).await;
    let id = session["id"].as_str().unwrap().to_string();

    let (status, _) = server
        .post_json(
            &format!("/chat/sessions/{}/messages", id),
            json!({"content": "hello"}),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, fetched) = server.get_json(&format!("/chat/sessions/{}", id)).await;
    assert!(fetched["messages"].as_array().unwrap().is_empty());
}
