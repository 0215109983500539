//! Mock telephony provider for testing.
//!
//! Records every request and returns configurable sids, media or errors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ports::{
    OutboundCall, OutboundMessage, RecordingMedia, TelephonyProvider, TransportError,
};

/// Mock telephony provider.
///
/// # Example
///
/// ```ignore
/// let mock = MockTelephonyProvider::new();
/// mock.set_error("start_call", TransportError::Network("down".into()));
/// ```
///
/// # Panics
///
/// Methods panic if the internal lock is poisoned.
#[derive(Default, Clone)]
pub struct MockTelephonyProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    calls: Vec<OutboundCall>,
    messages: Vec<OutboundMessage>,
    fetched: Vec<String>,
    media: HashMap<String, RecordingMedia>,
    errors: HashMap<&'static str, TransportError>,
    next_sid: usize,
}

impl MockState {
    fn sid(&mut self, prefix: &str) -> String {
        self.next_sid += 1;
        format!("{}{:032}", prefix, self.next_sid)
    }
}

impl MockTelephonyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner
            .lock()
            .expect("MockTelephonyProvider: state lock poisoned")
    }

    /// Make `method` (`start_call`, `send_message` or `fetch_recording`) fail.
    pub fn set_error(&self, method: &'static str, error: TransportError) {
        self.state().errors.insert(method, error);
    }

    /// Serve `media` for downloads of `url`.
    pub fn set_media(&self, url: impl Into<String>, media: RecordingMedia) {
        self.state().media.insert(url.into(), media);
    }

    pub fn calls(&self) -> Vec<OutboundCall> {
        self.state().calls.clone()
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.state().messages.clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.state().fetched.clone()
    }
}

#[async_trait]
impl TelephonyProvider for MockTelephonyProvider {
    async fn start_call(&self, request: &OutboundCall) -> Result<String, TransportError> {
        let mut state = self.state();
        if let Some(err) = state.errors.get("start_call") {
            return Err(err.clone());
        }
        state.calls.push(request.clone());
        Ok(state.sid("CA"))
    }

    async fn send_message(&self, request: &OutboundMessage) -> Result<String, TransportError> {
        let mut state = self.state();
        if let Some(err) = state.errors.get("send_message") {
            return Err(err.clone());
        }
        state.messages.push(request.clone());
        Ok(state.sid("SM"))
    }

    async fn fetch_recording(&self, url: &str) -> Result<RecordingMedia, TransportError> {
        let mut state = self.state();
        if let Some(err) = state.errors.get("fetch_recording") {
            return Err(err.clone());
        }
        state.fetched.push(url.to_string());
        state
            .media
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::rejected(404, format!("No media at {}", url)))
    }
}
