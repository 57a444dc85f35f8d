//! Call-event webhook.

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use leadflow::DispatchOutcome;
use serde::Serialize;
use std::sync::Arc;

/// `200` body for deliveries that were recognized but not written.
#[derive(Debug, Serialize)]
pub struct SkippedResponse {
    pub message: &'static str,
    #[serde(rename = "callId")]
    pub call_id: String,
}

/// Receive one call event.
///
/// The body is taken as raw bytes so that a non-JSON body maps to the same
/// `400 Invalid payload structure` as a JSON body with the wrong shape.
///
/// | Outcome | Response |
/// |---------|----------|
/// | lead created / non-analysis event | `204` |
/// | call id seen recently | `200 {"message":"Already processed","callId":...}` |
/// | same transcript already stored | `200 {"message":"Lead already exists","callId":...}` |
pub async fn receive_webhook(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> ServerResult<Response> {
    let outcome = state.pipeline.handle_body(&body).await?;

    let response = match outcome {
        DispatchOutcome::Acknowledged { .. } | DispatchOutcome::Created { .. } => {
            StatusCode::NO_CONTENT.into_response()
        }
        DispatchOutcome::AlreadyProcessed { call_id } => (
            StatusCode::OK,
            Json(SkippedResponse {
                message: "Already processed",
                call_id,
            }),
        )
            .into_response(),
        DispatchOutcome::LeadExists { call_id, .. } => (
            StatusCode::OK,
            Json(SkippedResponse {
                message: "Lead already exists",
                call_id,
            }),
        )
            .into_response(),
    };

    Ok(response)
}

/// Any method other than POST on the webhook path.
pub async fn method_not_allowed() -> ServerError {
    ServerError::MethodNotAllowed
}
