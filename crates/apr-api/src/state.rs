//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use apr_core::{AppConfig, ChatTurn, GenerationBackend, PdfProcessor};
use apr_store::{NoteStore, PaperStore, Workspace};

use crate::error::ApiError;

/// A chat conversation kept for the lifetime of the process.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub paper_id: Option<String>,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<ChatTurn>,
}

pub type SessionMap = Arc<RwLock<HashMap<Uuid, ChatSession>>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub papers: PaperStore,
    pub notes: NoteStore,
    pub llm: Arc<dyn GenerationBackend>,
    pub sessions: SessionMap,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        pdf: Arc<dyn PdfProcessor>,
        llm: Arc<dyn GenerationBackend>,
    ) -> Self {
        let workspace = Workspace::new(config.storage.workspace_root.clone());
        let papers = PaperStore::new(workspace.clone(), pdf, config.pdf.max_upload_bytes());
        let notes = NoteStore::new(workspace);
        Self {
            config: Arc::new(config),
            papers,
            notes,
            llm,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

/// Run a blocking store operation on the blocking pool.
pub(crate) async fn blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> apr_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))?
        .map_err(ApiError::from)
}
