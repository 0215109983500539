//! OutboundCallHandler - The callee of an outbound call picked up.

use std::sync::Arc;

use tracing::info;

use super::support::{find_call_by_sid, greet, lookup_tree};
use super::update_call::UpdateCallHandler;
use crate::domain::call::{CallError, StatusUpdate, WebhookParams};
use crate::domain::flow::{StepOutcome, VoiceResponse};
use crate::domain::tree::TreeRegistry;
use crate::ports::{CallSessionRepository, PhoneNumberPolicy, TaskScheduler, TurnRepository};

#[derive(Debug, Clone)]
pub struct OutboundCallCommand {
    pub tree_name: String,
    pub params: WebhookParams,
}

#[derive(Debug, Clone)]
pub struct OutboundCallResult {
    pub response: VoiceResponse,
    pub outcome: StepOutcome,
}

/// Greets the callee of a call created by `StartCallHandler`.
///
/// The session already exists; this records the answered status (and the
/// answering machine verdict, if any) before playing the greeting.
pub struct OutboundCallHandler {
    registry: TreeRegistry,
    sessions: Arc<dyn CallSessionRepository>,
    turns: Arc<dyn TurnRepository>,
    policy: Arc<dyn PhoneNumberPolicy>,
    update_call: UpdateCallHandler,
}

impl OutboundCallHandler {
    pub fn new(
        registry: TreeRegistry,
        sessions: Arc<dyn CallSessionRepository>,
        turns: Arc<dyn TurnRepository>,
        scheduler: Arc<dyn TaskScheduler>,
        policy: Arc<dyn PhoneNumberPolicy>,
    ) -> Self {
        Self {
            registry,
            update_call: UpdateCallHandler::new(sessions.clone(), scheduler),
            sessions,
            turns,
            policy,
        }
    }

    pub async fn handle(&self, cmd: OutboundCallCommand) -> Result<OutboundCallResult, CallError> {
        let tree = lookup_tree(&self.registry, &cmd.tree_name)?;
        let session = find_call_by_sid(self.sessions.as_ref(), &cmd.params).await?;
        let session = self
            .update_call
            .apply(session, &StatusUpdate::from_params(&cmd.params))
            .await?;

        info!(
            call_sid = session.sid(),
            tree = tree.name(),
            answered_by = ?session.answered_by(),
            "Outbound call answered"
        );

        let (_, step) = greet(
            self.sessions.as_ref(),
            self.turns.as_ref(),
            self.policy.as_ref(),
            &tree,
            session,
        )
        .await?;

        Ok(OutboundCallResult {
            response: step.response,
            outcome: step.outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::phone::testing::{call_params, favourite_tree, Harness, CALLER};
    use crate::domain::call::{CallDetails, CallSession, Direction};
    use crate::domain::foundation::CallerId;
    use crate::ports::ScheduledJob;

    async fn started_call(h: &Harness) -> CallSession {
        let session = CallSession::new(
            "CA300",
            Direction::Outbound,
            "favourite",
            CallerId::new(),
            CallDetails {
                from_number: CALLER.into(),
                to_number: Some("+16135559999".into()),
                ..CallDetails::default()
            },
        )
        .unwrap();
        CallSessionRepository::save(h.store.as_ref(), &session)
            .await
            .unwrap();
        session
    }

    fn handler(h: &Harness) -> OutboundCallHandler {
        OutboundCallHandler::new(
            h.registry.clone(),
            h.sessions(),
            h.turns(),
            h.scheduler(),
            h.policy(),
        )
    }

    #[tokio::test]
    async fn human_answer_hears_greeting() {
        let h = Harness::new(vec![favourite_tree()]);
        started_call(&h).await;

        let result = handler(&h)
            .handle(OutboundCallCommand {
                tree_name: "favourite".into(),
                params: call_params("CA300")
                    .with("CallStatus", "in-progress")
                    .with("AnsweredBy", "human"),
            })
            .await
            .unwrap();

        assert_eq!(result.outcome, StepOutcome::Redirect);
        assert_eq!(h.session("CA300").await.turns().len(), 1);
        assert!(h.scheduler.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn machine_answer_schedules_unanswered() {
        let h = Harness::new(vec![favourite_tree()]);
        let session = started_call(&h).await;

        let result = handler(&h)
            .handle(OutboundCallCommand {
                tree_name: "favourite".into(),
                params: call_params("CA300")
                    .with("CallStatus", "in-progress")
                    .with("AnsweredBy", "machine_start"),
            })
            .await
            .unwrap();

        // The prompt entry point is what hangs up on the machine
        assert_eq!(result.outcome, StepOutcome::Redirect);
        assert!(h.session("CA300").await.is_answering_machine());
        assert_eq!(
            h.scheduler.jobs().await,
            vec![ScheduledJob::UnansweredCall(*session.id())]
        );
    }

    #[tokio::test]
    async fn unknown_call_is_not_found() {
        let h = Harness::new(vec![favourite_tree()]);

        let result = handler(&h)
            .handle(OutboundCallCommand {
                tree_name: "favourite".into(),
                params: call_params("CA404"),
            })
            .await;

        assert!(matches!(result, Err(CallError::CallNotFound(_))));
    }
}
