//! Paper upload, listing, search, download and deletion.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use apr_core::defaults::BYTES_PER_MB;
use apr_core::logging::{PAGE_COUNT, PAPER_ID, SIZE_BYTES};
use apr_core::PaperMetadata;

use crate::error::ApiError;
use crate::state::{blocking, AppState};

#[derive(Debug, Serialize)]
pub struct PaperResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper: Option<PaperMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Map a multipart read failure; a body past the request limit is a 413.
fn multipart_error(e: axum::extract::multipart::MultipartError, max_bytes: u64) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!(
            "File exceeds maximum size of {} MB",
            max_bytes / BYTES_PER_MB
        ))
    } else {
        ApiError::BadRequest(format!("Failed to read upload: {}", e.body_text()))
    }
}

/// Upload a PDF from the multipart field `file`.
pub async fn upload_paper(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let max_bytes = state.papers.max_upload_bytes();
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .ok_or_else(|| ApiError::BadRequest("Uploaded file has no name".to_string()))?;
            let data = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e, max_bytes))?;
            upload = Some((filename, data.to_vec()));
            break;
        }
    }

    let (filename, data) = upload.ok_or_else(|| {
        ApiError::BadRequest("No file uploaded. Use field name 'file'.".to_string())
    })?;
    debug!(filename = %filename, { SIZE_BYTES } = data.len(), "api: upload received");

    let papers = state.papers.clone();
    let paper = blocking(move || papers.upload(&filename, &data)).await?;
    info!({ PAPER_ID } = %paper.id, { PAGE_COUNT } = paper.page_count, "api: paper uploaded");

    Ok(Json(PaperResponse {
        success: true,
        paper: Some(paper),
        message: Some("Paper uploaded successfully".to_string()),
    }))
}

pub async fn list_papers(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaperMetadata>>, ApiError> {
    let papers = state.papers.clone();
    let list = blocking(move || Ok(papers.list())).await?;
    Ok(Json(list))
}

pub async fn search_papers(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<PaperMetadata>>, ApiError> {
    let papers = state.papers.clone();
    let matches = blocking(move || papers.search(&query.q)).await?;
    Ok(Json(matches))
}

pub async fn get_paper(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaperResponse>, ApiError> {
    let papers = state.papers.clone();
    let paper = blocking(move || papers.get(&id)).await?;
    Ok(Json(PaperResponse {
        success: true,
        paper: Some(paper),
        message: None,
    }))
}

/// Raw PDF bytes for the viewer.
pub async fn get_paper_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let papers = state.papers.clone();
    let bytes = blocking(move || {
        let path = papers.pdf_path(&id)?;
        Ok(std::fs::read(path)?)
    })
    .await?;

    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes))
}

pub async fn delete_paper(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaperResponse>, ApiError> {
    let papers = state.papers.clone();
    blocking(move || papers.delete(&id)).await?;
    Ok(Json(PaperResponse {
        success: true,
        paper: None,
        message: Some("Paper deleted successfully".to_string()),
    }))
}
