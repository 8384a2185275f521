//! PDF details, page text extraction and highlighting.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use apr_core::{HighlightRequest, PageText, PdfMetadata};
use apr_pdf::parse_page_range;

use crate::error::ApiError;
use crate::state::{blocking, AppState};

#[derive(Debug, Deserialize)]
pub struct TextQuery {
    /// `a-b`, `a,b,c` or `n` (0-indexed).
    pub pages: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PdfTextResponse {
    pub success: bool,
    pub page_count: u32,
    pub texts: Vec<PageText>,
}

#[derive(Debug, Serialize)]
pub struct HighlightResponse {
    pub success: bool,
    pub message: String,
    pub highlight_id: Option<String>,
    /// File name of the annotated copy.
    pub saved_path: Option<String>,
}

pub async fn get_pdf_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PdfMetadata>, ApiError> {
    let papers = state.papers.clone();
    let details = blocking(move || papers.details(&id)).await?;
    Ok(Json(details))
}

pub async fn extract_text(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TextQuery>,
) -> Result<Json<PdfTextResponse>, ApiError> {
    let pages = match query.pages.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(spec) => Some(parse_page_range(spec)?),
        None => None,
    };

    let papers = state.papers.clone();
    let (page_count, texts) = blocking(move || {
        let page_count = papers.details(&id)?.page_count;
        let texts = papers.page_text(&id, pages.as_deref())?;
        Ok((page_count, texts))
    })
    .await?;

    Ok(Json(PdfTextResponse {
        success: true,
        page_count,
        texts,
    }))
}

pub async fn highlight(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<HighlightRequest>,
) -> Result<Json<HighlightResponse>, ApiError> {
    let papers = state.papers.clone();
    let outcome = blocking(move || papers.highlight(&id, &request)).await?;

    Ok(Json(HighlightResponse {
        success: true,
        message: "Highlight added successfully".to_string(),
        highlight_id: outcome.highlight_ids.last().cloned(),
        saved_path: outcome
            .saved_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
    }))
}
