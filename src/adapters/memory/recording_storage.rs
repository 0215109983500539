//! In-memory recording audio storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::RecordingId;
use crate::ports::{RecordingMedia, RecordingStorage, StorageError};

/// Keeps recording audio in memory (testing/development).
#[derive(Default)]
pub struct InMemoryRecordingStorage {
    audio: RwLock<HashMap<RecordingId, RecordingMedia>>,
}

impl InMemoryRecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, recording_id: &RecordingId) -> Option<RecordingMedia> {
        self.audio.read().await.get(recording_id).cloned()
    }
}

#[async_trait]
impl RecordingStorage for InMemoryRecordingStorage {
    async fn store(
        &self,
        recording_id: &RecordingId,
        media: &RecordingMedia,
    ) -> Result<String, StorageError> {
        self.audio
            .write()
            .await
            .insert(*recording_id, media.clone());
        Ok(format!("memory://recordings/{}", recording_id))
    }

    async fn exists(&self, recording_id: &RecordingId) -> Result<bool, StorageError> {
        Ok(self.audio.read().await.contains_key(recording_id))
    }
}
