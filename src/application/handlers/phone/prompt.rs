//! PromptHandler - Renders the prompt for a turn.

use std::sync::Arc;

use super::support::{find_call_by_sid, find_turn_of_call, load_history, lookup_tree};
use super::update_call::UpdateCallHandler;
use crate::domain::call::{CallError, StatusUpdate, WebhookParams};
use crate::domain::flow::{FlowCompiler, StepOutcome, VoiceResponse};
use crate::domain::foundation::TurnId;
use crate::domain::tree::TreeRegistry;
use crate::ports::{CallSessionRepository, TaskScheduler, TurnRepository};

#[derive(Debug, Clone)]
pub struct PromptCommand {
    pub tree_name: String,
    pub turn_id: TurnId,
    pub params: WebhookParams,
}

#[derive(Debug, Clone)]
pub struct PromptResult {
    pub response: VoiceResponse,
    pub outcome: StepOutcome,
}

/// Plays a prompt's messages and sets up input collection for its turn.
///
/// Nothing is written apart from status changes carried by the webhook.
/// Dynamic messages see the caller's history on the tree.
pub struct PromptHandler {
    registry: TreeRegistry,
    sessions: Arc<dyn CallSessionRepository>,
    turns: Arc<dyn TurnRepository>,
    update_call: UpdateCallHandler,
}

impl PromptHandler {
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

    pub async fn handle(&self, cmd: PromptCommand) -> Result<PromptResult, CallError> {
        let tree = lookup_tree(&self.registry, &cmd.tree_name)?;
        let session = find_call_by_sid(self.sessions.as_ref(), &cmd.params).await?;
        let session = self
            .update_call
            .apply(session, &StatusUpdate::from_params(&cmd.params))
            .await?;
        let turn = find_turn_of_call(self.turns.as_ref(), &session, &cmd.turn_id).await?;

        let history = load_history(self.sessions.as_ref(), self.turns.as_ref(), &session).await?;
        let step = FlowCompiler::new(&tree)
            .with_history(&history)
            .on_prompt_requested(&session, &turn)?;

        Ok(PromptResult {
            response: step.response,
            outcome: step.outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::phone::inbound_call::{InboundCallCommand, InboundCallHandler};
    use crate::application::handlers::phone::testing::{
        call_params, favourite_tree, inbound_params, Harness, CALLER,
    };

    fn handler(h: &Harness) -> PromptHandler {
        PromptHandler::new(h.registry.clone(), h.sessions(), h.turns(), h.scheduler())
    }

    async fn answered_call(h: &Harness, sid: &str) -> TurnId {
        InboundCallHandler::new(
            h.registry.clone(),
            h.sessions(),
            h.turns(),
            h.callers(),
            h.scheduler(),
            h.policy(),
        )
        .handle(InboundCallCommand {
            tree_name: "favourite".into(),
            params: inbound_params(sid, CALLER),
        })
        .await
        .unwrap();
        *h.session(sid).await.turns()[0].id()
    }

    #[tokio::test]
    async fn renders_prompt_with_gather() {
        let h = Harness::new(vec![favourite_tree()]);
        let turn_id = answered_call(&h, "CA10").await;

        let result = handler(&h)
            .handle(PromptCommand {
                tree_name: "favourite".into(),
                turn_id,
                params: call_params("CA10").with("CallStatus", "in-progress"),
            })
            .await
            .unwrap();

        assert_eq!(result.outcome, StepOutcome::Prompt);
        assert_eq!(result.response.verb_names(), vec!["Say", "Gather", "Redirect"]);
        let xml = result.response.to_xml();
        assert!(xml.contains(&format!("/phone/favourite/prompt_response/{}", turn_id)));
        assert!(xml.contains(&format!("/phone/favourite/timeout/{}", turn_id)));
    }

    #[tokio::test]
    async fn turn_from_another_call_is_not_found() {
        let h = Harness::new(vec![favourite_tree()]);
        let foreign = answered_call(&h, "CA11").await;
        answered_call(&h, "CA12").await;

        let result = handler(&h)
            .handle(PromptCommand {
                tree_name: "favourite".into(),
                turn_id: foreign,
                params: call_params("CA12"),
            })
            .await;

        assert!(matches!(result, Err(CallError::TurnNotFound(_))));
    }

    #[tokio::test]
    async fn unknown_turn_is_not_found() {
        let h = Harness::new(vec![favourite_tree()]);
        answered_call(&h, "CA13").await;

        let result = handler(&h)
            .handle(PromptCommand {
                tree_name: "favourite".into(),
                turn_id: TurnId::new(),
                params: call_params("CA13"),
            })
            .await;

        assert!(matches!(result, Err(CallError::TurnNotFound(_))));
    }
}
