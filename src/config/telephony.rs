//! Telephony provider configuration

use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

static OUTGOING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+1[0-9]{10}$").expect("outgoing number regex is valid"));

/// Provider account, public webhook host and outbound defaults
#[derive(Debug, Clone, Deserialize)]
pub struct TelephonyConfig {
    /// Provider account id; every webhook must carry it
    pub account_sid: String,

    /// Provider auth token for REST calls and media downloads
    pub auth_token: SecretString,

    /// Public base URL the provider reaches this server on
    pub public_host: String,

    /// Caller id for outbound calls and messages, `+1XXXXXXXXXX`
    pub default_outgoing_number: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Download recording audio after each recording callback
    #[serde(default = "default_attach_recordings")]
    pub attach_recordings: bool,

    /// Directory recording audio is written to
    #[serde(default = "default_recordings_dir")]
    pub recordings_dir: String,
}

impl TelephonyConfig {
    /// Validate telephony configuration
    ///
    /// `require_https` is set in production, where the public host must
    /// not be plain HTTP.
    pub fn validate(&self, require_https: bool) -> Result<(), ValidationError> {
        if self.account_sid.trim().is_empty() {
            return Err(ValidationError::MissingRequired("TELEPHONY__ACCOUNT_SID"));
        }
        if !self.account_sid.starts_with("AC") {
            return Err(ValidationError::InvalidAccountSid);
        }
        if self.auth_token.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("TELEPHONY__AUTH_TOKEN"));
        }
        if !self.public_host.starts_with("http://") && !self.public_host.starts_with("https://") {
            return Err(ValidationError::InvalidPublicHost);
        }
        if require_https && !self.public_host.starts_with("https://") {
            return Err(ValidationError::PublicHostMustBeHttps);
        }
        if !OUTGOING_NUMBER.is_match(&self.default_outgoing_number) {
            return Err(ValidationError::InvalidOutgoingNumber);
        }
        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_attach_recordings() -> bool {
    true
}

fn default_recordings_dir() -> String {
    "recordings".to_string()
}
