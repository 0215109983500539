//! Recording repository port.

use async_trait::async_trait;

use crate::domain::call::Recording;
use crate::domain::foundation::{CallSessionId, DomainError, RecordingId};

#[async_trait]
pub trait RecordingRepository: Send + Sync {
    /// True if this call already has a recording with the provider's sid.
    async fn exists_for_session(
        &self,
        session_id: &CallSessionId,
        recording_sid: &str,
    ) -> Result<bool, DomainError>;

    /// # Errors
    ///
    /// - `DuplicateRecord` if `(session, recording sid)` is already stored
    async fn save(&self, recording: &Recording) -> Result<(), DomainError>;

    async fn update(&self, recording: &Recording) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &RecordingId) -> Result<Option<Recording>, DomainError>;
}
