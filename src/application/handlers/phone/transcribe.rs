//! TranscribeHandler - Asynchronous transcription callback for a turn.

use std::sync::Arc;

use tracing::{debug, info};

use super::receive_recording::ReceiveRecordingHandler;
use super::support::{find_call_by_sid, find_turn_of_call, TelephonySettings};
use crate::domain::call::{CallError, ResponseTurn, TurnInput, WebhookParams};
use crate::domain::foundation::TurnId;
use crate::ports::{CallSessionRepository, RecordingRepository, TaskScheduler, TurnRepository};

#[derive(Debug, Clone)]
pub struct TranscribeCommand {
    pub turn_id: TurnId,
    pub params: WebhookParams,
}

/// Stores a completed transcription on its turn.
///
/// The callback usually repeats the recording fields too; those go through
/// the same duplicate check as a direct recording callback.
pub struct TranscribeHandler {
    sessions: Arc<dyn CallSessionRepository>,
    turns: Arc<dyn TurnRepository>,
    receive_recording: ReceiveRecordingHandler,
}

impl TranscribeHandler {
    pub fn new(
        sessions: Arc<dyn CallSessionRepository>,
        turns: Arc<dyn TurnRepository>,
        recordings: Arc<dyn RecordingRepository>,
        scheduler: Arc<dyn TaskScheduler>,
        settings: TelephonySettings,
    ) -> Self {
        Self {
            receive_recording: ReceiveRecordingHandler::new(
                sessions.clone(),
                turns.clone(),
                recordings,
                scheduler,
                settings,
            ),
            sessions,
            turns,
        }
    }

    pub async fn handle(&self, cmd: TranscribeCommand) -> Result<ResponseTurn, CallError> {
        let session = find_call_by_sid(self.sessions.as_ref(), &cmd.params).await?;
        let mut turn = find_turn_of_call(self.turns.as_ref(), &session, &cmd.turn_id).await?;

        if cmd.params.contains("RecordingSid") {
            turn = self
                .receive_recording
                .receive(&session, turn, &cmd.params)
                .await?;
        }

        let input = turn.acceptable_input(&TurnInput::from_params(&cmd.params));
        if turn.merge_input(&input) {
            self.turns.record_input(turn.id(), &input).await?;
            info!(call_sid = session.sid(), turn_id = %turn.id(), "Transcription stored");
        } else {
            debug!(
                call_sid = session.sid(),
                turn_id = %turn.id(),
                status = ?cmd.params.get("TranscriptionStatus"),
                "Transcription callback carried no new text"
            );
        }

        Ok(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::phone::testing::{call_params, Harness, CALLER};
    use crate::domain::call::{CallDetails, CallSession, Direction};
    use crate::domain::foundation::CallerId;
    use crate::domain::tree::PromptHandle;

    async fn call_with_turn(h: &Harness) -> ResponseTurn {
        let session = CallSession::new(
            "CA500",
            Direction::Inbound,
            "favourite",
            CallerId::new(),
            CallDetails {
                from_number: CALLER.into(),
                ..CallDetails::default()
            },
        )
        .unwrap();
        CallSessionRepository::save(h.store.as_ref(), &session)
            .await
            .unwrap();
        let turn = ResponseTurn::new(*session.id(), PromptHandle::from("reason"));
        TurnRepository::save(h.store.as_ref(), &turn).await.unwrap();
        turn
    }

    fn handler(h: &Harness) -> TranscribeHandler {
        TranscribeHandler::new(
            h.sessions(),
            h.turns(),
            h.recordings(),
            h.scheduler(),
            h.settings.clone(),
        )
    }

    #[tokio::test]
    async fn completed_transcription_is_stored() {
        let h = Harness::new(vec![]);
        let turn = call_with_turn(&h).await;

        let updated = handler(&h)
            .handle(TranscribeCommand {
                turn_id: *turn.id(),
                params: call_params("CA500")
                    .with("TranscriptionText", "my favourite is seven")
                    .with("TranscriptionStatus", "completed")
                    .with("RecordingSid", "RE9"),
            })
            .await
            .unwrap();

        assert_eq!(updated.transcription(), Some("my favourite is seven"));
        assert!(updated.is_transcribed());
        assert!(updated.recording_id().is_some());
        let stored = TurnRepository::find_by_id(h.store.as_ref(), turn.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn failed_transcription_leaves_turn_untouched() {
        let h = Harness::new(vec![]);
        let turn = call_with_turn(&h).await;

        let updated = handler(&h)
            .handle(TranscribeCommand {
                turn_id: *turn.id(),
                params: call_params("CA500")
                    .with("TranscriptionText", "garbled")
                    .with("TranscriptionStatus", "failed"),
            })
            .await
            .unwrap();

        assert!(updated.transcription().is_none());
        assert!(!updated.is_transcribed());
    }
}
