//! Errors surfaced by the phone call handlers.

use thiserror::Error;

use crate::domain::flow::FlowError;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::tree::CallbackError;
use crate::ports::TransportError;

/// Phone call handler errors.
#[derive(Debug, Error)]
pub enum CallError {
    /// No tree registered under this name.
    #[error("Tree not found: {0}")]
    TreeNotFound(String),

    /// No session for this id or provider call sid.
    #[error("Call not found: {0}")]
    CallNotFound(String),

    #[error("Turn not found: {0}")]
    TurnNotFound(String),

    #[error("Recording not found: {0}")]
    RecordingNotFound(String),

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    /// The tree graph references a prompt that does not exist.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// A lifecycle callback failed.
    #[error("Callback failed: {0}")]
    Callback(#[from] CallbackError),

    /// The telephony provider or media fetch failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Error: {0}")]
    Infrastructure(String),
}

impl CallError {
    pub fn call_not_found(reference: impl Into<String>) -> Self {
        CallError::CallNotFound(reference.into())
    }

    pub fn turn_not_found(reference: impl ToString) -> Self {
        CallError::TurnNotFound(reference.to_string())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CallError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        CallError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CallError::TreeNotFound(_) => ErrorCode::ValidationFailed,
            CallError::CallNotFound(_) => ErrorCode::CallSessionNotFound,
            CallError::TurnNotFound(_) => ErrorCode::TurnNotFound,
            CallError::RecordingNotFound(_) => ErrorCode::RecordingNotFound,
            CallError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            CallError::Flow(_) | CallError::Callback(_) => ErrorCode::InternalError,
            CallError::Transport(_) | CallError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }
}

impl From<DomainError> for CallError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::CallSessionNotFound => CallError::CallNotFound(err.message),
            ErrorCode::TurnNotFound => CallError::TurnNotFound(err.message),
            ErrorCode::RecordingNotFound => CallError::RecordingNotFound(err.message),
            ErrorCode::ValidationFailed => CallError::ValidationFailed {
                field: "unknown".to_string(),
                message: err.message,
            },
            _ => CallError::Infrastructure(err.to_string()),
        }
    }
}
