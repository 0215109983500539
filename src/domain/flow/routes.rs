//! URLs of the webhook entry points.

use crate::domain::foundation::TurnId;

/// Builds the paths the provider is told to call back on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRoutes {
    tree: String,
}

impl WebhookRoutes {
    pub fn new(tree: impl Into<String>) -> Self {
        Self { tree: tree.into() }
    }

    pub fn inbound(&self) -> String {
        format!("/phone/{}/inbound", self.tree)
    }

    pub fn outbound(&self) -> String {
        format!("/phone/{}/outbound", self.tree)
    }

    pub fn prompt(&self, turn: &TurnId) -> String {
        format!("/phone/{}/prompt/{}", self.tree, turn)
    }

    pub fn prompt_response(&self, turn: &TurnId) -> String {
        format!("/phone/{}/prompt_response/{}", self.tree, turn)
    }

    pub fn timeout(&self, turn: &TurnId) -> String {
        format!("/phone/{}/timeout/{}", self.tree, turn)
    }

    pub fn receive_recording(turn: &TurnId) -> String {
        format!("/phone/receive_recording/{}", turn)
    }

    pub fn transcribe(turn: &TurnId) -> String {
        format!("/phone/transcribe/{}", turn)
    }

    pub fn status() -> String {
        "/phone/status".to_string()
    }

    /// Joins a public host and a path, tolerating a trailing slash on the host.
    pub fn absolute(host: &str, path: &str) -> String {
        format!("{}{}", host.trim_end_matches('/'), path)
    }
}
