//! UnansweredCallHandler - Runs the tree's unanswered hook for an outbound call.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::support::{lookup_tree, update_session};
use crate::domain::call::CallError;
use crate::domain::foundation::CallSessionId;
use crate::domain::tree::TreeRegistry;
use crate::ports::CallSessionRepository;

#[derive(Debug, Clone)]
pub struct UnansweredCallCommand {
    pub session_id: CallSessionId,
}

/// Flags an outbound call unanswered and runs `unanswered_call` once.
///
/// Only outbound calls can be unanswered; an inbound session here means a
/// job was scheduled wrongly and is logged without effect.
pub struct UnansweredCallHandler {
    registry: TreeRegistry,
    sessions: Arc<dyn CallSessionRepository>,
}

impl UnansweredCallHandler {
    pub fn new(registry: TreeRegistry, sessions: Arc<dyn CallSessionRepository>) -> Self {
        Self { registry, sessions }
    }

    pub async fn handle(&self, cmd: UnansweredCallCommand) -> Result<(), CallError> {
        let session = self
            .sessions
            .find_by_id(&cmd.session_id)
            .await?
            .ok_or_else(|| CallError::call_not_found(cmd.session_id.to_string()))?;

        if !session.is_outbound() {
            error!(call_sid = session.sid(), "Unanswered job ran for an inbound call");
            return Ok(());
        }

        let (session, flipped) =
            update_session(self.sessions.as_ref(), session, |s| s.mark_unanswered().then_some(()))
                .await?;
        if flipped.is_none() {
            warn!(call_sid = session.sid(), "Call already handled as unanswered");
            return Ok(());
        }

        let tree = lookup_tree(&self.registry, session.tree_name())?;
        info!(
            call_sid = session.sid(),
            tree = tree.name(),
            status = ?session.call_status(),
            answered_by = ?session.answered_by(),
            "Outbound call unanswered"
        );
        if let Some(callback) = tree.unanswered_call() {
            callback(session.clone()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::phone::testing::{Harness, CALLER};
    use crate::domain::call::{CallDetails, CallSession, Direction};
    use crate::domain::foundation::CallerId;
    use crate::domain::tree::{CallbackError, Transition, TreeDefinition};
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_tree(count: Arc<AtomicUsize>, fail: bool) -> TreeDefinition {
        TreeDefinition::builder("reminder")
            .greeting(Transition::hangup().with_message("Reminder"))
            .on_unanswered(move |_session| {
                count.fetch_add(1, Ordering::SeqCst);
                async move {
                    if fail {
                        Err(CallbackError::new("crm unavailable"))
                    } else {
                        Ok(())
                    }
                }
                .boxed()
            })
            .build()
            .unwrap()
    }

    async fn stored(h: &Harness, direction: Direction) -> CallSession {
        let session = CallSession::new(
            "CA600",
            direction,
            "reminder",
            CallerId::new(),
            CallDetails {
                from_number: CALLER.into(),
                ..CallDetails::default()
            },
        )
        .unwrap();
        h.store.save(&session).await.unwrap();
        session
    }

    fn handler(h: &Harness) -> UnansweredCallHandler {
        UnansweredCallHandler::new(h.registry.clone(), h.sessions())
    }

    #[tokio::test]
    async fn runs_callback_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let h = Harness::new(vec![counting_tree(count.clone(), false)]);
        let session = stored(&h, Direction::Outbound).await;
        let cmd = UnansweredCallCommand {
            session_id: *session.id(),
        };

        handler(&h).handle(cmd.clone()).await.unwrap();
        handler(&h).handle(cmd).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(h.session("CA600").await.is_unanswered());
    }

    #[tokio::test]
    async fn inbound_call_is_ignored() {
        let count = Arc::new(AtomicUsize::new(0));
        let h = Harness::new(vec![counting_tree(count.clone(), false)]);
        let session = stored(&h, Direction::Inbound).await;

        handler(&h)
            .handle(UnansweredCallCommand {
                session_id: *session.id(),
            })
            .await
            .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!h.session("CA600").await.is_unanswered());
    }

    #[tokio::test]
    async fn callback_failure_propagates() {
        let count = Arc::new(AtomicUsize::new(0));
        let h = Harness::new(vec![counting_tree(count, true)]);
        let session = stored(&h, Direction::Outbound).await;

        let result = handler(&h)
            .handle(UnansweredCallCommand {
                session_id: *session.id(),
            })
            .await;

        assert!(matches!(result, Err(CallError::Callback(_))));
    }
}
