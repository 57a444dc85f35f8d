use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use intake::IntakeError;
use leadflow::PipelineError;
use serde::{Deserialize, Serialize};

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
///
/// The `Display` text of each variant is the exact `error` string sent to the
/// webhook sender.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Body is not JSON or lacks `event`/`call`. The detail is only logged.
    #[error("Invalid payload structure")]
    InvalidPayload(String),

    #[error("Missing call_id")]
    MissingCallId,

    #[error("Invalid phone number format")]
    InvalidPhone,

    /// The store refused or failed the duplicate check or the insert.
    #[error("Failed to save lead")]
    SaveFailed(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Not found")]
    NotFound,

    #[error("Internal server error")]
    Internal(String),
}

/// Flat error body: `{"error": "...", "details": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidPayload(_)
            | ServerError::MissingCallId
            | ServerError::InvalidPhone => StatusCode::BAD_REQUEST,
            ServerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::SaveFailed(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ServerError::SaveFailed(details) => Some(details.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ServerError::InvalidPayload(detail) => {
                tracing::warn!(detail = %detail, "invalid_webhook_payload");
            }
            ServerError::SaveFailed(detail) => {
                tracing::error!(detail = %detail, "lead_save_failed");
            }
            ServerError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal_error");
            }
            _ => {}
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        });

        (status, body).into_response()
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Intake(IntakeError::MalformedEnvelope(detail)) => {
                ServerError::InvalidPayload(detail)
            }
            PipelineError::Intake(IntakeError::MissingCallId) => ServerError::MissingCallId,
            PipelineError::Intake(intake) if intake.is_phone_error() => ServerError::InvalidPhone,
            PipelineError::Intake(other) => ServerError::InvalidPayload(other.to_string()),
            PipelineError::DuplicateLookup(store) | PipelineError::Write(store) => {
                ServerError::SaveFailed(store.detail().to_string())
            }
            PipelineError::TenantLookup(store) => {
                ServerError::Internal(format!("tenant lookup failed: {store}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::StoreError;

    #[test]
    fn pipeline_errors_map_to_wire_messages() {
        let cases = [
            (
                PipelineError::Intake(IntakeError::MalformedEnvelope("eof".into())),
                StatusCode::BAD_REQUEST,
                "Invalid payload structure",
            ),
            (
                PipelineError::Intake(IntakeError::MissingCallId),
                StatusCode::BAD_REQUEST,
                "Missing call_id",
            ),
            (
                PipelineError::Intake(IntakeError::MissingPhone),
                StatusCode::BAD_REQUEST,
                "Invalid phone number format",
            ),
            (
                PipelineError::Write(StoreError::backend("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save lead",
            ),
            (
                PipelineError::TenantLookup(StoreError::Transport("reset".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ),
        ];

        for (pipeline_err, status, message) in cases {
            let err = ServerError::from(pipeline_err);
            assert_eq!(err.status_code(), status);
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn only_save_failures_carry_details() {
        let err = ServerError::from(PipelineError::DuplicateLookup(StoreError::Rejected {
            status: 503,
            message: "upstream unavailable".into(),
        }));
        assert_eq!(err.details().as_deref(), Some("upstream unavailable"));
        assert!(ServerError::Internal("secret detail".into()).details().is_none());
    }
}
