//! File-based recording storage.
//!
//! Writes downloaded audio under a base directory, one file per recording.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::domain::foundation::RecordingId;
use crate::ports::{RecordingMedia, RecordingStorage, StorageError};

/// Stores recording audio as `{base}/{recording_id}.{ext}`.
#[derive(Debug, Clone)]
pub struct FileRecordingStorage {
    base_path: PathBuf,
}

impl FileRecordingStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn file_path(&self, recording_id: &RecordingId, extension: &str) -> PathBuf {
        self.base_path.join(format!("{}.{}", recording_id, extension))
    }

    async fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))
    }
}

/// File extension for a media type; provider recordings default to wav.
fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type.map(|c| c.split(';').next().unwrap_or(c).trim()) {
        Some("audio/mpeg") | Some("audio/mp3") => "mp3",
        _ => "wav",
    }
}

#[async_trait]
impl RecordingStorage for FileRecordingStorage {
    async fn store(
        &self,
        recording_id: &RecordingId,
        media: &RecordingMedia,
    ) -> Result<String, StorageError> {
        self.ensure_dir().await?;
        let path = self.file_path(recording_id, extension_for(media.content_type.as_deref()));

        let tmp = path.with_extension("part");
        fs::write(&tmp, &media.bytes)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(path.to_string_lossy().to_string())
    }

    async fn exists(&self, recording_id: &RecordingId) -> Result<bool, StorageError> {
        for extension in ["wav", "mp3"] {
            if fs::try_exists(self.file_path(recording_id, extension))
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn media(content_type: &str) -> RecordingMedia {
        RecordingMedia {
            content_type: Some(content_type.to_string()),
            bytes: vec![1, 2, 3],
        }
    }

    #[tokio::test]
    async fn stores_audio_under_recording_id() {
        let dir = TempDir::new().unwrap();
        let storage = FileRecordingStorage::new(dir.path().join("recordings"));
        let id = RecordingId::new();

        assert!(!storage.exists(&id).await.unwrap());
        let location = storage.store(&id, &media("audio/x-wav")).await.unwrap();

        assert!(location.ends_with(&format!("{}.wav", id)));
        assert!(storage.exists(&id).await.unwrap());
        assert_eq!(fs::read(&location).await.unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn mp3_content_type_gets_mp3_extension() {
        assert_eq!(extension_for(Some("audio/mpeg")), "mp3");
        assert_eq!(extension_for(Some("audio/mpeg; charset=binary")), "mp3");
        assert_eq!(extension_for(None), "wav");
    }
}
