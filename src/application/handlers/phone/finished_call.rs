//! FinishedCallHandler - Runs the tree's finished hook once per call.

use std::sync::Arc;

use tracing::{info, warn};

use super::support::{lookup_tree, update_session};
use crate::domain::call::CallError;
use crate::domain::foundation::CallSessionId;
use crate::domain::tree::TreeRegistry;
use crate::ports::CallSessionRepository;

#[derive(Debug, Clone)]
pub struct FinishedCallCommand {
    pub session_id: CallSessionId,
}

pub struct FinishedCallHandler {
    registry: TreeRegistry,
    sessions: Arc<dyn CallSessionRepository>,
}

impl FinishedCallHandler {
    pub fn new(registry: TreeRegistry, sessions: Arc<dyn CallSessionRepository>) -> Self {
        Self { registry, sessions }
    }

    pub async fn handle(&self, cmd: FinishedCallCommand) -> Result<(), CallError> {
        let session = self
            .sessions
            .find_by_id(&cmd.session_id)
            .await?
            .ok_or_else(|| CallError::call_not_found(cmd.session_id.to_string()))?;

        let (session, flipped) =
            update_session(self.sessions.as_ref(), session, |s| s.mark_finished().then_some(()))
                .await?;
        if flipped.is_none() {
            warn!(call_sid = session.sid(), "Call already handled as finished");
            return Ok(());
        }

        let tree = lookup_tree(&self.registry, session.tree_name())?;
        info!(
            call_sid = session.sid(),
            tree = tree.name(),
            status = ?session.call_status(),
            length_seconds = session.length_seconds(),
            "Call finished"
        );
        if let Some(callback) = tree.finished_call() {
            callback(session.clone()).await?;
        }
        Ok(())
    }
}
