//! Conversational chat, stateless and session-based.
//!
//! Sessions live in memory for the lifetime of the process.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use apr_core::logging::SESSION_ID;
use apr_core::ChatTurn;
use apr_inference::prompts::chat_messages;

use crate::error::ApiError;
use crate::state::{AppState, ChatSession};

const DEFAULT_SESSION_TITLE: &str = "New Chat";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub paper_id: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub sources: Vec<String>,
}

fn default_title() -> String {
    DEFAULT_SESSION_TITLE.to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub paper_id: Option<String>,
    #[serde(default = "default_title")]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

fn session_not_found() -> ApiError {
    ApiError::NotFound("Session not found".to_string())
}

fn require_message(message: &str) -> Result<(), ApiError> {
    if message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message cannot be empty".to_string()));
    }
    Ok(())
}

/// Stateless chat; the client sends the prior turns. Served at `/chat`
/// and `/chat/ask`.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    require_message(&request.message)?;

    let messages = chat_messages(
        request.paper_id.as_deref(),
        &request.history,
        &request.message,
    );
    let completion = state.llm.chat(&messages).await?;
    debug!(history_len = request.history.len(), "chat: answered");

    Ok(Json(ChatResponse {
        success: true,
        response: completion.text,
        sources: Vec::new(),
    }))
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Json<ChatSession> {
    let now = Utc::now();
    let session = ChatSession {
        id: Uuid::now_v7(),
        paper_id: request.paper_id.filter(|p| !p.trim().is_empty()),
        title: request.title,
        created_at: now,
        updated_at: now,
        messages: Vec::new(),
    };

    state.sessions.write().await.insert(session.id, session.clone());
    info!({ SESSION_ID } = %session.id, "chat: session created");
    Json(session)
}

/// All sessions, oldest first.
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<ChatSession>> {
    let mut sessions: Vec<ChatSession> = state.sessions.read().await.values().cloned().collect();
    sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Json(sessions)
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatSession>, ApiError> {
    state
        .sessions
        .read()
        .await
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(session_not_found)
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or_else(session_not_found)?;
    info!({ SESSION_ID } = %id, "chat: session deleted");
    Ok(Json(json!({ "success": true, "message": "Session deleted" })))
}

/// Send a message within a session and return the assistant reply.
///
/// The lock is not held across the provider call; both turns are recorded
/// only if the call succeeds and the session still exists.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ChatTurn>, ApiError> {
    require_message(&request.content)?;

    let (paper_id, history) = {
        let sessions = state.sessions.read().await;
        let session = sessions.get(&id).ok_or_else(session_not_found)?;
        (session.paper_id.clone(), session.messages.clone())
    };

    let messages = chat_messages(paper_id.as_deref(), &history, &request.content);
    let completion = state.llm.chat(&messages).await?;
    let reply = ChatTurn::assistant(completion.text);

    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(session_not_found)?;
    session.messages.push(ChatTurn::user(request.content));
    session.messages.push(reply.clone());
    session.updated_at = Utc::now();
    debug!({ SESSION_ID } = %id, message_count = session.messages.len(), "chat: message recorded");

    Ok(Json(reply))
}
