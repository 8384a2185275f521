//! HTTP error mapping.
//!
//! Every error response has the body `{"error": message, "category": kind}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use apr_core::{Error, UpstreamKind};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    PayloadTooLarge(String),
    /// LLM provider failure, classified from its message.
    Upstream(UpstreamKind, String),
    Internal(String),
}

impl ApiError {
    /// Machine-readable category reported in the response body.
    pub fn category(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_input",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Upstream(UpstreamKind::RateLimited, _) => "rate_limited",
            ApiError::Upstream(UpstreamKind::Unauthorized, _) => "unauthorized",
            ApiError::Upstream(UpstreamKind::QuotaExceeded, _) => "quota_exceeded",
            ApiError::Upstream(UpstreamKind::Other, _) => "upstream_error",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream(UpstreamKind::RateLimited, _) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(UpstreamKind::Unauthorized, _) => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(UpstreamKind::QuotaExceeded, _) => StatusCode::PAYMENT_REQUIRED,
            ApiError::Upstream(UpstreamKind::Other, _) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the client. Classified provider failures get a fixed
    /// explanation; the raw provider message only goes to the log.
    fn message(&self) -> String {
        match self {
            ApiError::Upstream(UpstreamKind::RateLimited, _) => {
                "Rate limit exceeded. Please try again later.".to_string()
            }
            ApiError::Upstream(UpstreamKind::Unauthorized, _) => {
                "Invalid API key. Please check your configuration.".to_string()
            }
            ApiError::Upstream(UpstreamKind::QuotaExceeded, _) => {
                "API quota exceeded. Please check your account.".to_string()
            }
            ApiError::Upstream(UpstreamKind::Other, msg) => {
                format!("Error processing your request: {}", msg)
            }
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::Internal(msg) => msg.clone(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if let Some(kind) = err.upstream_kind() {
            return ApiError::Upstream(kind, err.to_string());
        }
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::PayloadTooLarge { size, limit } => ApiError::PayloadTooLarge(format!(
                "File of {} bytes exceeds maximum size of {} MB",
                size,
                limit / apr_core::defaults::BYTES_PER_MB
            )),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let category = self.category();
        match &self {
            ApiError::Upstream(_, raw) => {
                warn!(status = status.as_u16(), category, error = %raw, "api: upstream failure")
            }
            ApiError::Internal(msg) => {
                error!(status = status.as_u16(), category, error = %msg, "api: internal error")
            }
            _ => {}
        }

        let body = Json(serde_json::json!({
            "error": self.message(),
            "category": category,
        }));

        (status, body).into_response()
    }
}
