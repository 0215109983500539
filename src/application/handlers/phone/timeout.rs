//! TimeoutHandler - The caller gave no input for a turn.

use std::sync::Arc;

use tracing::info;

use super::support::{
    find_call_by_sid, find_turn_of_call, load_history, lookup_tree, persist_step,
};
use super::update_call::UpdateCallHandler;
use crate::domain::call::{CallError, StatusUpdate, WebhookParams};
use crate::domain::flow::{FlowCompiler, StepOutcome, VoiceResponse};
use crate::domain::foundation::TurnId;
use crate::domain::tree::TreeRegistry;
use crate::ports::{CallSessionRepository, TaskScheduler, TurnRepository};

#[derive(Debug, Clone)]
pub struct TimeoutCommand {
    pub tree_name: String,
    pub turn_id: TurnId,
    pub params: WebhookParams,
}

#[derive(Debug, Clone)]
pub struct TimeoutResult {
    pub response: VoiceResponse,
    pub outcome: StepOutcome,
}

/// Marks a turn timed out and either repeats the flow or ends the call.
///
/// The last `final_timeout_attempts` turns on the same prompt decide
/// whether the caller has gone quiet for good.
pub struct TimeoutHandler {
    registry: TreeRegistry,
    sessions: Arc<dyn CallSessionRepository>,
    turns: Arc<dyn TurnRepository>,
    update_call: UpdateCallHandler,
}

impl TimeoutHandler {
    pub fn new(
        registry: TreeRegistry,
        sessions: Arc<dyn CallSessionRepository>,
        turns: Arc<dyn TurnRepository>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Self {
        Self {
            registry,
            update_call: UpdateCallHandler::new(sessions.clone(), scheduler),
            sessions,
            turns,
        }
    }

    pub async fn handle(&self, cmd: TimeoutCommand) -> Result<TimeoutResult, CallError> {
        let tree = lookup_tree(&self.registry, &cmd.tree_name)?;
        let session = find_call_by_sid(self.sessions.as_ref(), &cmd.params).await?;
        let session = self
            .update_call
            .apply(session, &StatusUpdate::from_params(&cmd.params))
            .await?;
        let turn = find_turn_of_call(self.turns.as_ref(), &session, &cmd.turn_id).await?;

        let recent = self
            .turns
            .latest_for_handle(
                session.id(),
                turn.prompt_handle(),
                tree.config().final_timeout_attempts,
            )
            .await?;

        let history = load_history(self.sessions.as_ref(), self.turns.as_ref(), &session).await?;
        let step = FlowCompiler::new(&tree)
            .with_history(&history)
            .on_timeout(&session, &turn, &recent)?;
        persist_step(self.sessions.as_ref(), self.turns.as_ref(), session, &step).await?;

        info!(
            tree = tree.name(),
            turn_id = %cmd.turn_id,
            prompt = %turn.prompt_handle(),
            outcome = ?step.outcome,
            "Prompt timed out"
        );

        Ok(TimeoutResult {
            response: step.response,
            outcome: step.outcome,
        })
    }
}
