//! Provider error classification.

use apr_core::Error;

/// Error codes reported by OpenAI-compatible providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// Invalid authentication credentials.
    AuthenticationError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Account out of credit.
    InsufficientQuota,
    /// Model not found or not available.
    ModelNotFound,
    /// Request too large.
    ContextLengthExceeded,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl OpenAIErrorCode {
    /// Determine error code from HTTP status, error type and code.
    ///
    /// OpenAI reports an exhausted quota as a 429, so the quota check runs
    /// before the status match.
    pub fn from_response(status: u16, error_type: &str, code: Option<&str>) -> Self {
        if error_type == "insufficient_quota" || code == Some("insufficient_quota") {
            return Self::InsufficientQuota;
        }
        match (status, error_type) {
            (401, _) | (403, _) => Self::AuthenticationError,
            (429, _) => Self::RateLimitExceeded,
            (402, _) => Self::InsufficientQuota,
            (404, _) | (_, "model_not_found") => Self::ModelNotFound,
            (400, _) if error_type.contains("context_length") => Self::ContextLengthExceeded,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Marker embedded in the error message, recognized by
    /// [`apr_core::UpstreamKind::classify`].
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            Self::AuthenticationError => Some("authentication"),
            Self::RateLimitExceeded => Some("rate_limit"),
            Self::InsufficientQuota => Some("insufficient_quota"),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::ServerError)
    }
}

/// Convert a provider error into a core inference error.
///
/// Classified errors carry their marker instead of the status code, which
/// could otherwise shadow the marker (a quota error arrives as a 429).
pub fn to_core_error(provider: &str, status: u16, code: OpenAIErrorCode, message: &str) -> Error {
    match code.marker() {
        Some(marker) => Error::Inference(format!(
            "{} request failed ({}): {}",
            provider, marker, message
        )),
        None => Error::Inference(format!("{} returned {}: {}", provider, status, message)),
    }
}
