//! Domain models shared across the store, PDF, inference and API crates.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults;

// =============================================================================
// PAPERS
// =============================================================================

/// Summary of a paper directory and its recognized PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    /// Sanitized identifier (directory name).
    pub id: String,
    /// Display name, identical to the id.
    pub name: String,
    /// Document title, falling back to the id when the PDF carries none.
    pub title: Option<String>,
    pub author: Option<String>,
    /// Zero when metadata extraction failed.
    pub page_count: u32,
    /// Size of the recognized PDF in bytes.
    pub file_size: u64,
}

/// Information read from a PDF's document catalog.
///
/// `Default` is the degraded value used when extraction fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfInfo {
    pub page_count: u32,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

/// Full document metadata for a stored paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub id: String,
    pub filename: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: u32,
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Extracted text of a single page (0-indexed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub page: usize,
    pub text: String,
}

// =============================================================================
// HIGHLIGHTS
// =============================================================================

/// Rectangle in page points, origin at the top-left corner of the page
/// (y grows downward), as a viewer reports selections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl HighlightRect {
    /// Rectangle with corners reordered so that `x0 <= x1` and `y0 <= y1`.
    pub fn normalized(self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }

    /// Smallest rectangle containing both.
    pub fn union(self, other: Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

fn default_highlight_color() -> String {
    defaults::HIGHLIGHT_COLOR.to_string()
}

fn default_highlight_opacity() -> f32 {
    defaults::HIGHLIGHT_OPACITY
}

/// Request to add a highlight annotation to one page.
///
/// Exactly one of `rect` or `text` selects the area; `rect` wins when both
/// are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightRequest {
    /// 0-indexed page number.
    pub page: usize,
    #[serde(default)]
    pub rect: Option<HighlightRect>,
    #[serde(default)]
    pub text: Option<String>,
    /// `#rrggbb`; unparseable values fall back to yellow.
    #[serde(default = "default_highlight_color")]
    pub color: String,
    #[serde(default = "default_highlight_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Result of writing highlight annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightOutcome {
    /// One id per annotation written (`<object>-<generation>`).
    pub highlight_ids: Vec<String>,
    /// Path of the annotated copy.
    pub saved_path: PathBuf,
}

// =============================================================================
// NOTES
// =============================================================================

/// Metadata of a paper's Markdown note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteMetadata {
    /// Note id; equal to the paper id.
    pub id: String,
    pub paper_id: String,
    pub filename: String,
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// A note with its raw Markdown and rendered HTML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub metadata: NoteMetadata,
    pub content: String,
    pub html: String,
}

// =============================================================================
// INFERENCE
// =============================================================================

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Generated text plus optional usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}
