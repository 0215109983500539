//! Twilio REST client.
//!
//! Implements `TelephonyProvider` against the 2010-04-01 REST API. Requests
//! are form-encoded and authenticated with the account sid and auth token.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::ports::{
    OutboundCall, OutboundMessage, RecordingMedia, TelephonyProvider, TransportError,
};

/// Default API host.
pub const DEFAULT_API_BASE_URL: &str = "https://api.twilio.com";

/// Credentials and endpoint for the REST API.
#[derive(Clone)]
pub struct TwilioConfig {
    account_sid: String,
    auth_token: SecretString,
    api_base_url: String,
}

impl TwilioConfig {
    pub fn new(account_sid: impl Into<String>, auth_token: SecretString) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/{}.json",
            self.api_base_url.trim_end_matches('/'),
            self.account_sid,
            resource
        )
    }
}

/// Resource created by a POST.
#[derive(Debug, Deserialize)]
struct CreatedResource {
    sid: String,
}

/// Error body returned on a non-success status.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<u32>,
    message: Option<String>,
}

pub struct TwilioTelephonyProvider {
    config: TwilioConfig,
    http_client: reqwest::Client,
}

impl TwilioTelephonyProvider {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn create(
        &self,
        resource: &str,
        form: &[(&'static str, String)],
    ) -> Result<String, TransportError> {
        let url = self.config.resource_url(resource);
        let response = self
            .http_client
            .post(&url)
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = rejection(status.as_u16(), &body);
            tracing::error!(resource, status = status.as_u16(), error = %err, "Twilio request failed");
            return Err(err);
        }

        let created: CreatedResource = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        Ok(created.sid)
    }
}

/// Form fields for placing a call.
fn call_form(request: &OutboundCall) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("To", request.to.clone()),
        ("From", request.from.clone()),
        ("Url", request.url.clone()),
        ("Method", "POST".to_string()),
        ("StatusCallback", request.status_callback.clone()),
        ("StatusCallbackMethod", "POST".to_string()),
    ];
    for event in ["initiated", "ringing", "answered", "completed"] {
        form.push(("StatusCallbackEvent", event.to_string()));
    }
    if request.machine_detection {
        form.push(("MachineDetection", "Enable".to_string()));
    }
    form
}

fn message_form(request: &OutboundMessage) -> Vec<(&'static str, String)> {
    vec![
        ("To", request.to.clone()),
        ("From", request.from.clone()),
        ("Body", request.body.clone()),
    ]
}

/// Builds a rejection from an error body, keeping the provider's code.
fn rejection(status: u16, body: &str) -> TransportError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let err = TransportError::rejected(
                status,
                parsed.message.unwrap_or_else(|| body.to_string()),
            );
            match parsed.code {
                Some(code) => err.with_code(code),
                None => err,
            }
        }
        Err(_) => TransportError::rejected(status, body),
    }
}

#[async_trait]
impl TelephonyProvider for TwilioTelephonyProvider {
    async fn start_call(&self, request: &OutboundCall) -> Result<String, TransportError> {
        let sid = self.create("Calls", &call_form(request)).await?;
        tracing::info!(call_sid = %sid, to = %request.to, "Outbound call placed");
        Ok(sid)
    }

    async fn send_message(&self, request: &OutboundMessage) -> Result<String, TransportError> {
        let sid = self.create("Messages", &message_form(request)).await?;
        tracing::info!(message_sid = %sid, to = %request.to, "Message sent");
        Ok(sid)
    }

    async fn fetch_recording(&self, url: &str) -> Result<RecordingMedia, TransportError> {
        let response = self
            .http_client
            .get(url)
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(url, status = status.as_u16(), "Recording download failed");
            return Err(TransportError::rejected(
                status.as_u16(),
                format!("Recording download failed for {}", url),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(RecordingMedia {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}
