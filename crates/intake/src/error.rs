//! Error types produced by the intake crate.
//!
//! Intake errors are all client-side: the webhook body is missing something
//! the pipeline cannot do without. Everything else is defaulted.
//!
//! | Error | Meaning |
//! |-------|---------|
//! | [`MalformedEnvelope`](IntakeError::MalformedEnvelope) | Body is not JSON or lacks `event`/`call` |
//! | [`MissingCallId`](IntakeError::MissingCallId) | `call_analyzed` without `call.call_id` |
//! | [`MissingPhone`](IntakeError::MissingPhone) | No phone found in any probed location |
//! | [`InvalidPhone`](IntakeError::InvalidPhone) | Phone found but fails the shape check |
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IntakeError {
    #[error("invalid payload structure: {0}")]
    MalformedEnvelope(String),

    #[error("missing call_id")]
    MissingCallId,

    #[error("missing phone number")]
    MissingPhone,

    #[error("invalid phone number format: {0:?}")]
    InvalidPhone(String),
}

impl IntakeError {
    /// All intake errors stem from the request body.
    pub fn is_client_error(&self) -> bool {
        true
    }

    /// Suggested HTTP status code.
    pub fn http_status_code(&self) -> u16 {
        400
    }

    /// True for both flavours of unusable phone number.
    pub fn is_phone_error(&self) -> bool {
        matches!(self, IntakeError::MissingPhone | IntakeError::InvalidPhone(_))
    }
}
