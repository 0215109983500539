//! Voice recordings captured by voice gathers.

use serde::{Deserialize, Serialize};

use super::params::WebhookParams;
use crate::domain::foundation::{CallSessionId, DomainError, ErrorCode, RecordingId, Timestamp};

/// A provider recording referenced by a call. Audio is fetched later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    id: RecordingId,
    session_id: CallSessionId,
    recording_sid: String,
    url: Option<String>,
    duration_seconds: Option<u32>,
    audio_attached: bool,
    created_at: Timestamp,
}

impl Recording {
    /// Builds a recording from `RecordingSid`, `RecordingUrl` and `RecordingDuration`.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `RecordingSid` is missing
    pub fn from_params(session_id: CallSessionId, params: &WebhookParams) -> Result<Self, DomainError> {
        let recording_sid = params.owned("RecordingSid").ok_or_else(|| {
            DomainError::new(ErrorCode::ValidationFailed, "RecordingSid is required")
        })?;
        Ok(Self {
            id: RecordingId::new(),
            session_id,
            recording_sid,
            url: params.owned("RecordingUrl"),
            duration_seconds: params
                .get("RecordingDuration")
                .and_then(|d| d.parse().ok()),
            audio_attached: false,
            created_at: Timestamp::now(),
        })
    }

    /// Reconstitute a recording from persistence.
    pub fn reconstitute(
        id: RecordingId,
        session_id: CallSessionId,
        recording_sid: String,
        url: Option<String>,
        duration_seconds: Option<u32>,
        audio_attached: bool,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            session_id,
            recording_sid,
            url,
            duration_seconds,
            audio_attached,
            created_at,
        }
    }

    pub fn id(&self) -> &RecordingId {
        &self.id
    }

    pub fn session_id(&self) -> &CallSessionId {
        &self.session_id
    }

    pub fn recording_sid(&self) -> &str {
        &self.recording_sid
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn duration_seconds(&self) -> Option<u32> {
        self.duration_seconds
    }

    pub fn is_audio_attached(&self) -> bool {
        self.audio_attached
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn mark_audio_attached(&mut self) {
        self.audio_attached = true;
    }
}
