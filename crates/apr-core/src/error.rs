//! Error types for the paper reader backend.

use thiserror::Error;

/// Result type alias using the paper reader's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by every crate in the workspace.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found (paper, note, page, session)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (bad name, bad page range, empty query)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upload exceeds the configured size limit
    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// LLM provider call failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// PDF parsing, rendering or annotation failed
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classification of an upstream (LLM provider) failure.
///
/// Providers report failures through free-form messages, so the kind is
/// sniffed from well-known markers in the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// `rate_limit` or `429`
    RateLimited,
    /// `authentication` or `401`
    Unauthorized,
    /// `insufficient_quota`
    QuotaExceeded,
    /// Anything else
    Other,
}

impl UpstreamKind {
    /// Classify an upstream error message. Markers are checked in order, so a
    /// message carrying both a 429 and a quota marker is a rate limit.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("rate_limit") || message.contains("429") {
            Self::RateLimited
        } else if lower.contains("authentication") || message.contains("401") {
            Self::Unauthorized
        } else if lower.contains("insufficient_quota") {
            Self::QuotaExceeded
        } else {
            Self::Other
        }
    }
}

impl Error {
    /// Upstream classification for errors raised by an LLM provider call.
    ///
    /// Returns `None` for errors that did not come from a provider.
    pub fn upstream_kind(&self) -> Option<UpstreamKind> {
        match self {
            Error::Inference(msg) | Error::Request(msg) => Some(UpstreamKind::classify(msg)),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
