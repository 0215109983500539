//! Recording audio storage port.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::RecordingId;

use super::RecordingMedia;

/// Where downloaded recording audio is kept.
#[async_trait]
pub trait RecordingStorage: Send + Sync {
    /// Stores audio for a recording, replacing any earlier copy.
    ///
    /// Returns a location string suitable for persistence.
    async fn store(
        &self,
        recording_id: &RecordingId,
        media: &RecordingMedia,
    ) -> Result<String, StorageError>;

    async fn exists(&self, recording_id: &RecordingId) -> Result<bool, StorageError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(String),
}
