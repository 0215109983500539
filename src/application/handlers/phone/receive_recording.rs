//! ReceiveRecordingHandler - Stores a recording reference on its turn.

use std::sync::Arc;

use tracing::{info, warn};

use super::support::{find_call_by_sid, find_turn_of_call, TelephonySettings, ATTACH_RECORDING_DELAY};
use crate::domain::call::{CallError, CallSession, Recording, ResponseTurn, WebhookParams};
use crate::domain::foundation::{ErrorCode, TurnId};
use crate::ports::{
    CallSessionRepository, RecordingRepository, ScheduledJob, TaskScheduler, TurnRepository,
};

#[derive(Debug, Clone)]
pub struct ReceiveRecordingCommand {
    pub turn_id: TurnId,
    pub params: WebhookParams,
}

/// Records `RecordingSid` / `RecordingUrl` for a turn.
///
/// A recording sid already stored for the call is logged and ignored. When
/// attaching is enabled the audio download is scheduled.
pub struct ReceiveRecordingHandler {
    sessions: Arc<dyn CallSessionRepository>,
    turns: Arc<dyn TurnRepository>,
    recordings: Arc<dyn RecordingRepository>,
    scheduler: Arc<dyn TaskScheduler>,
    settings: TelephonySettings,
}

impl ReceiveRecordingHandler {
    pub fn new(
        sessions: Arc<dyn CallSessionRepository>,
        turns: Arc<dyn TurnRepository>,
        recordings: Arc<dyn RecordingRepository>,
        scheduler: Arc<dyn TaskScheduler>,
        settings: TelephonySettings,
    ) -> Self {
        Self {
            sessions,
            turns,
            recordings,
            scheduler,
            settings,
        }
    }

    pub async fn handle(&self, cmd: ReceiveRecordingCommand) -> Result<ResponseTurn, CallError> {
        let session = find_call_by_sid(self.sessions.as_ref(), &cmd.params).await?;
        let turn = find_turn_of_call(self.turns.as_ref(), &session, &cmd.turn_id).await?;
        self.receive(&session, turn, &cmd.params).await
    }

    /// Attaches the recording in `params` to `turn` and returns the updated turn.
    pub async fn receive(
        &self,
        session: &CallSession,
        mut turn: ResponseTurn,
        params: &WebhookParams,
    ) -> Result<ResponseTurn, CallError> {
        let recording_sid = params
            .get("RecordingSid")
            .ok_or_else(|| CallError::validation("RecordingSid", "is required"))?;

        if self
            .recordings
            .exists_for_session(session.id(), recording_sid)
            .await?
        {
            warn!(
                call_sid = session.sid(),
                recording_sid, "Recording already received, ignoring"
            );
            return Ok(turn);
        }

        let recording = Recording::from_params(*session.id(), params)?;
        match self.recordings.save(&recording).await {
            Ok(()) => {}
            Err(err) if err.code == ErrorCode::DuplicateRecord => {
                warn!(
                    call_sid = session.sid(),
                    recording_sid, "Recording stored concurrently, ignoring"
                );
                return Ok(turn);
            }
            Err(err) => return Err(err.into()),
        }

        self.turns
            .attach_recording(turn.id(), recording.id())
            .await?;
        if turn.recording_id().is_none() {
            turn.attach_recording(*recording.id());
        }

        info!(
            call_sid = session.sid(),
            turn_id = %turn.id(),
            recording_sid,
            "Recording received"
        );

        if self.settings.attach_recordings {
            self.scheduler
                .schedule(
                    ScheduledJob::AttachRecording(*recording.id()),
                    ATTACH_RECORDING_DELAY,
                )
                .await?;
        }

        Ok(turn)
    }
}
