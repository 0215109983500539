//! HTTP adapter for the phone provider webhooks.
//!
//! Exposes the call flow to the telephony provider:
//! - `/phone/:tree/inbound` - New inbound call
//! - `/phone/:tree/outbound` - Outbound call answered
//! - `/phone/:tree/prompt/:turn` - Play a prompt
//! - `/phone/:tree/prompt_response/:turn` - Caller answered a prompt
//! - `/phone/:tree/timeout/:turn` - Caller gave no input
//! - `/phone/status` - Call status changed
//! - `/phone/receive_recording/:turn` - Recording available
//! - `/phone/transcribe/:turn` - Transcription finished

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ErrorResponse, VoiceXml};
pub use handlers::{PhoneApiError, PhoneAppState};
pub use routes::{phone_router, phone_routes};
