//! API route handlers
//!
//! - `health`: liveness, readiness, and Prometheus metrics
//! - `webhook`: the call-event receiver

pub mod health;
pub mod webhook;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// Service info (GET /)
///
/// # Response
///
/// ```json
/// {
///   "name": "leadflow",
///   "version": "0.1.0",
///   "webhook": "/webhook",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let webhook = state.config.webhook_path.clone();
    let mut endpoints = vec![webhook.clone(), "/health".to_string(), "/ready".to_string()];
    if state.metrics.is_some() {
        endpoints.push("/metrics".to_string());
    }

    Ok(Json(json!({
        "name": "leadflow",
        "version": env!("CARGO_PKG_VERSION"),
        "webhook": webhook,
        "store": state.pipeline.store().name(),
        "endpoints": endpoints,
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
