//! # apr-api
//!
//! HTTP API for the AI Paper Reader backend: paper upload and browsing,
//! PDF text and highlights, Markdown notes, and LLM-backed question
//! answering, summarization and chat.

pub mod error;
pub mod handlers;
pub mod state;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, Request};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use tracing::Span;
use uuid::Uuid;

use apr_core::defaults::MULTIPART_OVERHEAD_BYTES;
use apr_core::logging::{REQUEST_ID, SUBSYSTEM};

pub use error::ApiError;
pub use state::{AppState, ChatSession};

use handlers::{ai, chat, health, notes, papers, pdf};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generates UUIDv7 request IDs for time-ordered correlation.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Span for one HTTP request, carrying the id set by [`MakeRequestUuidV7`].
fn request_span<B>(request: &Request<B>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        { REQUEST_ID } = %request_id,
        { SUBSYSTEM } = "api",
    )
}

/// Routes under `/api`, without middleware.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Health
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        // Papers
        .route("/papers", get(papers::list_papers))
        .route("/papers/upload", post(papers::upload_paper))
        .route("/papers/search", get(papers::search_papers))
        .route(
            "/papers/:id",
            get(papers::get_paper).delete(papers::delete_paper),
        )
        .route("/papers/:id/content", get(papers::get_paper_content))
        // PDF
        .route("/pdf/:id", get(pdf::get_pdf_details))
        .route("/pdf/:id/text", get(pdf::extract_text))
        .route("/pdf/:id/highlight", post(pdf::highlight))
        // Notes
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route("/notes/paper/:id", get(notes::get_note))
        .route(
            "/notes/:id",
            get(notes::get_note)
                .put(notes::update_note)
                .patch(notes::patch_note)
                .delete(notes::delete_note),
        )
        .route("/notes/:id/html", get(notes::get_note_html))
        // AI
        .route("/ai/ask", post(ai::ask))
        .route("/ai/summarize", post(ai::summarize))
        .route("/ai/models", get(ai::models))
        // Chat
        .route("/chat", post(chat::chat))
        .route("/chat/ask", post(chat::chat))
        .route(
            "/chat/sessions",
            get(chat::list_sessions).post(chat::create_session),
        )
        .route(
            "/chat/sessions/:id",
            get(chat::get_session).delete(chat::delete_session),
        )
        .route("/chat/sessions/:id/messages", post(chat::send_message));

    Router::new().nest("/api", api).with_state(state)
}

/// Parse configured CORS origins, skipping invalid entries.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600));

    // Credentials cannot be combined with a literal wildcard origin.
    if origins.iter().any(|o| o.trim() == "*") {
        return base.allow_origin(AllowOrigin::mirror_request());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(allowed))
}

/// Full application: routes plus tracing, request ids, CORS and the
/// request-body limit.
///
/// The limit is enforced by the extractors, so an oversize upload still
/// gets the JSON `payload_too_large` error.
pub fn app(state: AppState) -> Router {
    let body_limit =
        (state.papers.max_upload_bytes() as usize).saturating_add(MULTIPART_OVERHEAD_BYTES);
    let cors = cors_layer(&state.config.api.cors_origins);

    router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span::<Body>))
            .layer(CatchPanicLayer::new())
            .layer(cors)
            .layer(DefaultBodyLimit::max(body_limit)),
    )
}
