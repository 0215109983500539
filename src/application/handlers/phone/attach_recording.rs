//! AttachRecordingHandler - Downloads recording audio into storage.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::domain::call::CallError;
use crate::domain::foundation::RecordingId;
use crate::ports::{RecordingRepository, RecordingStorage, TelephonyProvider};

#[derive(Debug, Clone)]
pub struct AttachRecordingCommand {
    pub recording_id: RecordingId,
}

/// Fetches the audio behind a recording URL and stores it.
///
/// Already attached recordings are skipped, so the job may run twice.
pub struct AttachRecordingHandler {
    recordings: Arc<dyn RecordingRepository>,
    provider: Arc<dyn TelephonyProvider>,
    storage: Arc<dyn RecordingStorage>,
}

impl AttachRecordingHandler {
    pub fn new(
        recordings: Arc<dyn RecordingRepository>,
        provider: Arc<dyn TelephonyProvider>,
        storage: Arc<dyn RecordingStorage>,
    ) -> Self {
        Self {
            recordings,
            provider,
            storage,
        }
    }

    pub async fn handle(&self, cmd: AttachRecordingCommand) -> Result<(), CallError> {
        let mut recording = self
            .recordings
            .find_by_id(&cmd.recording_id)
            .await?
            .ok_or_else(|| CallError::RecordingNotFound(cmd.recording_id.to_string()))?;

        if recording.is_audio_attached() {
            debug!(recording_id = %cmd.recording_id, "Recording audio already attached");
            return Ok(());
        }

        let url = recording
            .url()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                CallError::validation(
                    "url",
                    format!("recording {} has no URL", recording.recording_sid()),
                )
            })?
            .to_string();

        let media = self.provider.fetch_recording(&url).await.map_err(|e| {
            error!(
                recording_id = %cmd.recording_id,
                url = %url,
                error = %e,
                "Failed to fetch recording audio"
            );
            e
        })?;

        let location = self
            .storage
            .store(recording.id(), &media)
            .await
            .map_err(|e| CallError::infrastructure(e.to_string()))?;

        recording.mark_audio_attached();
        self.recordings.update(&recording).await?;

        info!(
            recording_id = %cmd.recording_id,
            bytes = media.bytes.len(),
            location = %location,
            "Recording audio attached"
        );
        Ok(())
    }
}
