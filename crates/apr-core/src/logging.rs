//! Structured logging schema and field name constants.
//!
//! Log call sites name fields through these constants, as in
//! `info!({ PAPER_ID } = %id, "...")`, so every crate emits the same keys.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (directory entries, word boxes) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the `x-request-id` header.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "create", "patch", "search", "thumbnail", "complete"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Sanitized paper identifier (directory name).
pub const PAPER_ID: &str = "paper_id";

/// Chat session UUID.
pub const SESSION_ID: &str = "session_id";

/// Filesystem path being operated on.
pub const PATH: &str = "path";

/// Search query text.
pub const QUERY: &str = "query";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a list or search.
pub const RESULT_COUNT: &str = "result_count";

/// Size of a payload or file in bytes.
pub const SIZE_BYTES: &str = "size_bytes";

/// Number of PDF pages.
pub const PAGE_COUNT: &str = "page_count";

/// Response length in characters.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Inference fields ──────────────────────────────────────────────────────

/// LLM provider name ("openai", "grok", "minimax").
pub const PROVIDER: &str = "provider";

/// Model slug used for generation.
pub const MODEL: &str = "model";

// ─── Outcome field ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
