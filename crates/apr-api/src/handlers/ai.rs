//! Question answering, summarization and model info.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use apr_core::defaults::{ASK_CONTEXT_PAGES, SUMMARY_CONTEXT_PAGES};
use apr_core::logging::{ERROR_MSG, PAPER_ID, PROVIDER, RESPONSE_LEN};
use apr_core::{LlmProvider, TokenUsage};
use apr_inference::prompts::{build_ask_prompt, build_summarize_prompt, SUMMARIZE_SYSTEM_PROMPT};

use crate::error::ApiError;
use crate::state::{blocking, AppState};

const DEFAULT_SUMMARY_QUERY: &str = "Summarize content";

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub query: String,
    /// Caller-supplied context, e.g. selected text.
    pub context: Option<String>,
    /// Paper whose leading pages are added as context.
    pub pdf_id: Option<String>,
    /// Replaces the built system prompt when non-empty.
    pub system_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub success: bool,
    pub query: String,
    pub response: String,
    pub context_used: bool,
    pub model: String,
    pub provider: String,
    pub usage: Option<TokenUsage>,
    pub error: Option<String>,
}

/// Leading text of a paper, or `None` when it cannot be read.
async fn paper_context(state: &AppState, paper_id: &str, max_pages: usize) -> Option<String> {
    let papers = state.papers.clone();
    let id = paper_id.to_string();
    match blocking(move || papers.leading_text(&id, max_pages)).await {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => {
            warn!({ PAPER_ID } = %paper_id, "ai: paper has no extractable text");
            None
        }
        Err(e) => {
            warn!({ PAPER_ID } = %paper_id, { ERROR_MSG } = ?e, "ai: could not fetch paper context");
            None
        }
    }
}

pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query cannot be empty".to_string()));
    }

    let pdf_context = match request.pdf_id.as_deref() {
        Some(id) => paper_context(&state, id, ASK_CONTEXT_PAGES).await,
        None => None,
    };

    let (built_prompt, context_used) =
        build_ask_prompt(request.context.as_deref(), pdf_context.as_deref());
    let system_prompt = request
        .system_prompt
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(built_prompt);

    let completion = state.llm.complete(&system_prompt, &request.query).await?;
    info!(
        { PROVIDER } = state.llm.provider(),
        context_used,
        { RESPONSE_LEN } = completion.text.len(),
        "ai: question answered"
    );

    Ok(Json(AskResponse {
        success: true,
        query: request.query,
        response: completion.text,
        context_used,
        model: state.llm.model_name().to_string(),
        provider: state.llm.provider().to_string(),
        usage: completion.usage,
        error: None,
    }))
}

/// Summarize a paper (`pdf_id`) or the given `context`.
pub async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let pdf_text = match request.pdf_id.as_deref() {
        Some(id) => paper_context(&state, id, SUMMARY_CONTEXT_PAGES).await,
        None => None,
    };
    let text = pdf_text
        .or_else(|| request.context.filter(|c| !c.trim().is_empty()))
        .ok_or_else(|| ApiError::BadRequest("No text or PDF provided to summarize".to_string()))?;

    let completion = state
        .llm
        .complete(SUMMARIZE_SYSTEM_PROMPT, &build_summarize_prompt(&text))
        .await?;
    info!(
        { PROVIDER } = state.llm.provider(),
        input_len = text.len(),
        "ai: summary generated"
    );

    let query = if request.query.trim().is_empty() {
        DEFAULT_SUMMARY_QUERY.to_string()
    } else {
        request.query
    };

    Ok(Json(AskResponse {
        success: true,
        query,
        response: completion.text,
        context_used: true,
        model: state.llm.model_name().to_string(),
        provider: state.llm.provider().to_string(),
        usage: completion.usage,
        error: None,
    }))
}

pub async fn models(State(state): State<AppState>) -> Json<Value> {
    let llm = &state.config.llm;
    let available: Vec<String> = LlmProvider::ALL.iter().map(|p| p.to_string()).collect();
    Json(json!({
        "success": true,
        "provider": llm.provider.to_string(),
        "model": state.llm.model_name(),
        "temperature": llm.temperature,
        "max_tokens": llm.max_tokens,
        "available_providers": available,
    }))
}
