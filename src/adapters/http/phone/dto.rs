//! Response bodies for the phone webhooks.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::domain::flow::VoiceResponse;

/// Voice markup sent back to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceXml(pub VoiceResponse);

impl VoiceXml {
    /// An empty document, for callbacks whose reply the provider ignores.
    pub fn empty() -> Self {
        Self(VoiceResponse::new())
    }

    pub fn hangup() -> Self {
        Self(VoiceResponse::hangup_only())
    }
}

impl IntoResponse for VoiceXml {
    fn into_response(self) -> Response {
        let xml = self.0.to_xml();
        tracing::debug!(xml = %xml, "Voice response");
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/xml")],
            xml,
        )
            .into_response()
    }
}

/// Standard error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_xml_sets_content_type() {
        let response = VoiceXml::hangup().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/xml"
        );
    }

    #[test]
    fn error_response_serializes_code_and_message() {
        let json = serde_json::to_value(ErrorResponse::new("CALL_NOT_FOUND", "Call not found: CA1"))
            .unwrap();
        assert_eq!(json["error_code"], "CALL_NOT_FOUND");
        assert_eq!(json["message"], "Call not found: CA1");
    }
}
