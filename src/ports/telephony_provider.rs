//! Telephony provider port.
//!
//! The outbound half of the provider integration: placing calls, sending
//! text messages and downloading recording audio. Inbound traffic arrives
//! as webhooks and never goes through this port.

use async_trait::async_trait;
use thiserror::Error;

#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Places a call. Returns the provider's call sid.
    async fn start_call(&self, request: &OutboundCall) -> Result<String, TransportError>;

    /// Sends a text message. Returns the provider's message sid.
    async fn send_message(&self, request: &OutboundMessage) -> Result<String, TransportError>;

    /// Downloads recording audio.
    async fn fetch_recording(&self, url: &str) -> Result<RecordingMedia, TransportError>;
}

/// A call to place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    pub to: String,
    pub from: String,
    /// Absolute URL the provider requests once the call connects.
    pub url: String,
    /// Absolute URL for status callbacks.
    pub status_callback: String,
    pub machine_detection: bool,
}

/// A text message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub from: String,
    pub body: String,
}

/// Downloaded recording audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingMedia {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Provider or network failure. Always propagated, never swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a non-success status. `code` is the
    /// provider's own error code when the body carried one.
    #[error("Provider rejected request with status {status}: {message}")]
    Rejected {
        status: u16,
        code: Option<u32>,
        message: String,
    },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Provider error code for a destination that has opted out of messages.
pub const UNSUBSCRIBED_ERROR_CODE: u32 = 21610;

impl TransportError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        TransportError::Rejected {
            status,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(self, provider_code: u32) -> Self {
        match self {
            TransportError::Rejected {
                status, message, ..
            } => TransportError::Rejected {
                status,
                code: Some(provider_code),
                message,
            },
            other => other,
        }
    }

    /// True when the destination has unsubscribed from messages.
    pub fn is_unsubscribed(&self) -> bool {
        matches!(
            self,
            TransportError::Rejected {
                code: Some(UNSUBSCRIBED_ERROR_CODE),
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_message_includes_status() {
        let err = TransportError::rejected(401, "Authenticate");
        assert_eq!(
            err.to_string(),
            "Provider rejected request with status 401: Authenticate"
        );
        assert!(!err.is_unsubscribed());
        assert!(TransportError::rejected(400, "opted out")
            .with_code(UNSUBSCRIBED_ERROR_CODE)
            .is_unsubscribed());
    }
}
