//! UpdateCallHandler - Applies status webhooks to a call session.

use std::sync::Arc;

use tracing::{info, warn};

use super::support::{find_call_by_sid, update_session, SETTLE_DELAY};
use crate::domain::call::{CallError, CallSession, StatusUpdate, WebhookParams};
use crate::ports::{CallSessionRepository, ScheduledJob, TaskScheduler};

#[derive(Debug, Clone)]
pub struct UpdateCallCommand {
    pub params: WebhookParams,
}

/// Records `CallStatus` / `AnsweredBy` changes.
///
/// Every webhook carries the current status, so every entry point runs
/// through `apply`. The unanswered and finished jobs are scheduled only on
/// the update that flipped the classification.
pub struct UpdateCallHandler {
    sessions: Arc<dyn CallSessionRepository>,
    scheduler: Arc<dyn TaskScheduler>,
}

impl UpdateCallHandler {
    pub fn new(sessions: Arc<dyn CallSessionRepository>, scheduler: Arc<dyn TaskScheduler>) -> Self {
        Self {
            sessions,
            scheduler,
        }
    }

    pub async fn handle(&self, cmd: UpdateCallCommand) -> Result<CallSession, CallError> {
        let session = find_call_by_sid(self.sessions.as_ref(), &cmd.params).await?;
        self.apply(session, &StatusUpdate::from_params(&cmd.params))
            .await
    }

    /// Applies `update` to an already loaded session.
    pub async fn apply(
        &self,
        session: CallSession,
        update: &StatusUpdate,
    ) -> Result<CallSession, CallError> {
        if update.is_empty() {
            return Ok(session);
        }

        let update = *update;
        let (session, change) = update_session(self.sessions.as_ref(), session, move |s| {
            let change = s.apply_status_update(&update);
            change.changed().then_some(change)
        })
        .await?;

        let Some(change) = change else {
            return Ok(session);
        };

        if change.out_of_order {
            warn!(
                call_sid = session.sid(),
                status = ?session.call_status(),
                "Call status arrived out of order"
            );
        }
        info!(
            call_sid = session.sid(),
            status = ?session.call_status(),
            answered_by = ?session.answered_by(),
            "Call status updated"
        );

        if change.became_unanswered {
            self.scheduler
                .schedule(ScheduledJob::UnansweredCall(*session.id()), SETTLE_DELAY)
                .await?;
        }
        if change.became_finished {
            self.scheduler
                .schedule(ScheduledJob::FinishedCall(*session.id()), SETTLE_DELAY)
                .await?;
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::phone::testing::{call_params, Harness, CALLER};
    use crate::domain::call::{AnsweredBy, CallDetails, CallStatus, Direction};
    use crate::domain::foundation::CallerId;

    async fn outbound_call(h: &Harness) -> CallSession {
        let session = CallSession::new(
            "CA200",
            Direction::Outbound,
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
        session
    }

    fn handler(h: &Harness) -> UpdateCallHandler {
        UpdateCallHandler::new(h.sessions(), h.scheduler())
    }

    fn status(s: &str) -> UpdateCallCommand {
        UpdateCallCommand {
            params: call_params("CA200").with("CallStatus", s),
        }
    }

    #[tokio::test]
    async fn stores_new_status() {
        let h = Harness::new(vec![]);
        outbound_call(&h).await;

        let session = handler(&h).handle(status("in-progress")).await.unwrap();

        assert_eq!(session.call_status(), Some(CallStatus::InProgress));
        assert_eq!(h.session("CA200").await.call_status(), Some(CallStatus::InProgress));
        assert!(h.scheduler.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn no_answer_schedules_unanswered_and_finished_once() {
        let h = Harness::new(vec![]);
        let session = outbound_call(&h).await;

        handler(&h).handle(status("no-answer")).await.unwrap();
        handler(&h).handle(status("no-answer")).await.unwrap();

        let scheduled = h.scheduler.scheduled().await;
        assert_eq!(
            scheduled,
            vec![
                (ScheduledJob::UnansweredCall(*session.id()), SETTLE_DELAY),
                (ScheduledJob::FinishedCall(*session.id()), SETTLE_DELAY),
            ]
        );
    }

    #[tokio::test]
    async fn racing_no_answer_webhooks_schedule_side_effects_once() {
        let h = Harness::new(vec![]);
        let session = outbound_call(&h).await;
        let first_copy = h.session("CA200").await;
        let second_copy = h.session("CA200").await;
        assert_eq!(first_copy.version(), second_copy.version());
        let no_answer = StatusUpdate::from_params(&call_params("CA200").with("CallStatus", "no-answer"));

        let first = handler(&h).apply(first_copy, &no_answer).await.unwrap();
        let second = handler(&h).apply(second_copy, &no_answer).await.unwrap();

        assert!(first.is_no_answer());
        assert!(second.is_no_answer());
        assert_eq!(
            h.scheduler.jobs().await,
            vec![
                ScheduledJob::UnansweredCall(*session.id()),
                ScheduledJob::FinishedCall(*session.id()),
            ]
        );
        assert_eq!(h.session("CA200").await.version(), 1);
    }

    #[tokio::test]
    async fn concurrent_no_answer_webhooks_schedule_side_effects_once() {
        let h = Harness::new(vec![]);
        let session = outbound_call(&h).await;
        let first = handler(&h);
        let second = handler(&h);

        let (a, b) = tokio::join!(
            first.handle(status("no-answer")),
            second.handle(status("no-answer"))
        );
        a.unwrap();
        b.unwrap();

        let jobs = h.scheduler.jobs().await;
        let unanswered = jobs
            .iter()
            .filter(|j| **j == ScheduledJob::UnansweredCall(*session.id()))
            .count();
        let finished = jobs
            .iter()
            .filter(|j| **j == ScheduledJob::FinishedCall(*session.id()))
            .count();
        assert_eq!((unanswered, finished), (1, 1));
    }

    #[tokio::test]
    async fn machine_answer_schedules_unanswered() {
        let h = Harness::new(vec![]);
        let session = outbound_call(&h).await;

        let updated = handler(&h)
            .handle(UpdateCallCommand {
                params: call_params("CA200")
                    .with("CallStatus", "in-progress")
                    .with("AnsweredBy", "machine_start"),
            })
            .await
            .unwrap();

        assert_eq!(updated.answered_by(), Some(AnsweredBy::MachineStart));
        assert_eq!(
            h.scheduler.jobs().await,
            vec![ScheduledJob::UnansweredCall(*session.id())]
        );
    }

    #[tokio::test]
    async fn out_of_order_status_is_still_applied() {
        let h = Harness::new(vec![]);
        outbound_call(&h).await;

        handler(&h).handle(status("completed")).await.unwrap();
        let session = handler(&h).handle(status("ringing")).await.unwrap();

        assert_eq!(session.call_status(), Some(CallStatus::Ringing));
        assert_eq!(h.scheduler.jobs().await.len(), 1);
    }

    #[tokio::test]
    async fn conflicting_writer_is_retried() {
        let h = Harness::new(vec![]);
        outbound_call(&h).await;
        h.store.inject_conflicts(1).await;

        let session = handler(&h).handle(status("completed")).await.unwrap();

        assert!(session.is_completed());
        assert_eq!(h.scheduler.jobs().await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_call_is_not_found() {
        let h = Harness::new(vec![]);
        let result = handler(&h).handle(status("ringing")).await;
        assert!(matches!(result, Err(CallError::CallNotFound(_))));
    }
}
