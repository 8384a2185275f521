//! Centralized default constants for the paper reader backend.
//!
//! Every crate references these constants instead of defining its own magic
//! numbers. Configuration structs use them as serde defaults.

// =============================================================================
// APPLICATION
// =============================================================================

/// Human-readable application name.
pub const APP_NAME: &str = "AI Paper Reader";

/// Application version reported by the API.
pub const APP_VERSION: &str = "0.1.0";

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "ai-paper-reader";

// =============================================================================
// STORAGE
// =============================================================================

/// Workspace root when none is configured.
pub const WORKSPACE_ROOT: &str = "./workspaces";

/// File name used for newly created notes.
pub const NOTE_FILE_NAME: &str = "note.md";

/// Suffix appended to a note path to form its lock sidecar.
pub const LOCK_SUFFIX: &str = ".lock";

/// File name of the page-1 thumbnail inside a paper directory.
pub const THUMBNAIL_FILE_NAME: &str = "thumbnail.jpg";

/// Suffix appended to the PDF stem for the annotated copy.
pub const ANNOTATED_SUFFIX: &str = "_annotated";

/// Separator inserted between existing note content and appended content.
pub const NOTE_PATCH_SEPARATOR: &str = "\n\n---\n\n";

// =============================================================================
// PDF
// =============================================================================

/// Maximum upload size in megabytes.
pub const MAX_FILE_SIZE_MB: u64 = 50;

/// Bytes per megabyte used for the upload limit.
pub const BYTES_PER_MB: u64 = 1_048_576;

/// Default highlight color.
pub const HIGHLIGHT_COLOR: &str = "#ffff00";

/// Default highlight opacity (0.0 - 1.0).
pub const HIGHLIGHT_OPACITY: f32 = 0.5;

/// Longest side of the rendered thumbnail in pixels.
pub const THUMBNAIL_SCALE_PX: u32 = 300;

/// Timeout for external poppler commands (pdftoppm, pdftotext).
pub const PDF_CMD_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// LLM
// =============================================================================

/// Default provider.
pub const LLM_PROVIDER: &str = "openai";

/// Default generation model.
pub const LLM_MODEL: &str = "gpt-4o-mini";

/// Default sampling temperature.
pub const LLM_TEMPERATURE: f32 = 0.7;

/// Default completion token cap.
pub const LLM_MAX_TOKENS: u32 = 2000;

/// Default HTTP timeout for provider calls.
pub const LLM_TIMEOUT_SECS: u64 = 120;

/// OpenAI API endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// xAI Grok API endpoint.
pub const GROK_BASE_URL: &str = "https://api.x.ai/v1";

/// MiniMax API endpoint.
pub const MINIMAX_BASE_URL: &str = "https://api.minimax.io/v1";

/// Pages of PDF text used as context for a question.
pub const ASK_CONTEXT_PAGES: usize = 20;

/// Pages of PDF text used as input for a summary.
pub const SUMMARY_CONTEXT_PAGES: usize = 50;

/// Characters of text sent to the model for a summary.
pub const SUMMARY_MAX_CHARS: usize = 15_000;

// =============================================================================
// SERVER
// =============================================================================

/// Bind address.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Listen port.
pub const SERVER_PORT: u16 = 8000;

/// Allowed CORS origin for the web client.
pub const CORS_ORIGIN: &str = "http://localhost:3000";

/// Extra room on top of the upload limit for multipart framing.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1_048_576;

/// Default config file path, overridable with `APR_CONFIG`.
pub const CONFIG_PATH: &str = "conf/app_config.yaml";
