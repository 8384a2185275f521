//! Markdown note CRUD.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use apr_core::{Note, NoteMetadata};

use crate::error::ApiError;
use crate::state::{blocking, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub paper_id: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteContentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ListNotesQuery {
    pub paper_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NoteWithContentResponse {
    pub success: bool,
    pub note: NoteMetadata,
    pub content: String,
    pub html: String,
}

impl From<Note> for NoteWithContentResponse {
    fn from(note: Note) -> Self {
        Self {
            success: true,
            note: note.metadata,
            content: note.content,
            html: note.html,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListResponse {
    pub success: bool,
    pub notes: Vec<NoteMetadata>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct NoteHtmlResponse {
    pub success: bool,
    pub html: String,
    pub note_id: String,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub success: bool,
    pub note: Option<NoteMetadata>,
    pub message: String,
}

pub async fn create_note(
    State(state): State<AppState>,
    Json(body): Json<CreateNoteRequest>,
) -> Result<Json<NoteWithContentResponse>, ApiError> {
    let notes = state.notes.clone();
    let note = blocking(move || notes.create(&body.paper_id, &body.content)).await?;
    Ok(Json(note.into()))
}

pub async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<ListNotesQuery>,
) -> Result<Json<NoteListResponse>, ApiError> {
    let notes = state.notes.clone();
    let list = blocking(move || notes.list(query.paper_id.as_deref())).await?;
    Ok(Json(NoteListResponse {
        success: true,
        total: list.len(),
        notes: list,
    }))
}

/// Also served at `/notes/paper/:id`.
pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NoteWithContentResponse>, ApiError> {
    let notes = state.notes.clone();
    let note = blocking(move || notes.read(&id)).await?;
    Ok(Json(note.into()))
}

pub async fn get_note_html(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NoteHtmlResponse>, ApiError> {
    let notes = state.notes.clone();
    let note_id = id.clone();
    let html = blocking(move || notes.render_html(&id)).await?;
    Ok(Json(NoteHtmlResponse {
        success: true,
        html,
        note_id,
    }))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<NoteContentRequest>,
) -> Result<Json<NoteWithContentResponse>, ApiError> {
    let notes = state.notes.clone();
    let note = blocking(move || notes.update(&id, &body.content)).await?;
    Ok(Json(note.into()))
}

pub async fn patch_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<NoteContentRequest>,
) -> Result<Json<NoteWithContentResponse>, ApiError> {
    let notes = state.notes.clone();
    let note = blocking(move || notes.patch(&id, &body.content)).await?;
    Ok(Json(note.into()))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NoteResponse>, ApiError> {
    let notes = state.notes.clone();
    blocking(move || notes.delete(&id)).await?;
    Ok(Json(NoteResponse {
        success: true,
        note: None,
        message: "Note deleted successfully".to_string(),
    }))
}
