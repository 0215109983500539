//! PromptResponseHandler - Caller input arrived for a turn.

use std::sync::Arc;

use tracing::info;

use super::receive_recording::ReceiveRecordingHandler;
use super::support::{
    find_call_by_sid, find_turn_of_call, load_history, lookup_tree, persist_step,
    TelephonySettings,
};
use super::update_call::UpdateCallHandler;
use crate::domain::call::{CallError, StatusUpdate, TurnInput, WebhookParams};
use crate::domain::flow::{FlowCompiler, StepOutcome, VoiceResponse};
use crate::domain::foundation::TurnId;
use crate::domain::tree::TreeRegistry;
use crate::ports::{CallSessionRepository, RecordingRepository, TaskScheduler, TurnRepository};

#[derive(Debug, Clone)]
pub struct PromptResponseCommand {
    pub tree_name: String,
    pub turn_id: TurnId,
    pub params: WebhookParams,
}

#[derive(Debug, Clone)]
pub struct PromptResponseResult {
    pub response: VoiceResponse,
    pub outcome: StepOutcome,
}

/// Stores the caller's digits, speech or recording and moves to the next prompt.
pub struct PromptResponseHandler {
    registry: TreeRegistry,
    sessions: Arc<dyn CallSessionRepository>,
    turns: Arc<dyn TurnRepository>,
    update_call: UpdateCallHandler,
    receive_recording: ReceiveRecordingHandler,
}

impl PromptResponseHandler {
    pub fn new(
        registry: TreeRegistry,
        sessions: Arc<dyn CallSessionRepository>,
        turns: Arc<dyn TurnRepository>,
        recordings: Arc<dyn RecordingRepository>,
        scheduler: Arc<dyn TaskScheduler>,
        settings: TelephonySettings,
    ) -> Self {
        Self {
            registry,
            update_call: UpdateCallHandler::new(sessions.clone(), scheduler.clone()),
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

    pub async fn handle(
        &self,
        cmd: PromptResponseCommand,
    ) -> Result<PromptResponseResult, CallError> {
        let tree = lookup_tree(&self.registry, &cmd.tree_name)?;
        let session = find_call_by_sid(self.sessions.as_ref(), &cmd.params).await?;
        let session = self
            .update_call
            .apply(session, &StatusUpdate::from_params(&cmd.params))
            .await?;
        let mut turn = find_turn_of_call(self.turns.as_ref(), &session, &cmd.turn_id).await?;

        if cmd.params.contains("RecordingSid") {
            turn = self
                .receive_recording
                .receive(&session, turn, &cmd.params)
                .await?;
        }

        let input = TurnInput::from_params(&cmd.params);
        let history = load_history(self.sessions.as_ref(), self.turns.as_ref(), &session).await?;
        let step = FlowCompiler::new(&tree)
            .with_history(&history)
            .on_input_received(&session, &turn, &input)?;
        persist_step(self.sessions.as_ref(), self.turns.as_ref(), session, &step).await?;

        info!(
            tree = tree.name(),
            turn_id = %cmd.turn_id,
            prompt = %turn.prompt_handle(),
            outcome = ?step.outcome,
            "Prompt answered"
        );

        Ok(PromptResponseResult {
            response: step.response,
            outcome: step.outcome,
        })
    }
}
