//! Liveness and readiness probes.

use axum::Json;
use serde_json::{json, Value};

use apr_core::defaults::SERVICE_NAME;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
    }))
}

pub async fn ready() -> Json<Value> {
    Json(json!({ "status": "ready" }))
}
