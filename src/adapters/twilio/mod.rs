//! Twilio telephony adapter.
//!
//! - **TwilioTelephonyProvider** - REST client for calls, messages and recordings
//! - **MockTelephonyProvider** - Call-tracking mock for tests
//!
//! # Security
//!
//! The auth token is held as `secrecy::SecretString` and only exposed when
//! building the basic auth header.

mod client;
mod mock;

pub use client::{TwilioConfig, TwilioTelephonyProvider, DEFAULT_API_BASE_URL};
pub use mock::MockTelephonyProvider;
