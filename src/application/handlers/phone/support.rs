//! Helpers shared by the phone handlers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::domain::call::{
    CallError, CallSession, CallerHistory, Direction, ResponseTurn, TurnChange, WebhookParams,
};
use crate::domain::flow::{FlowCompiler, FlowStep};
use crate::domain::foundation::TurnId;
use crate::domain::tree::{TreeDefinition, TreeRegistry};
use crate::ports::{CallSessionRepository, PhoneNumberPolicy, TurnRepository};

/// Wait before running lifecycle callbacks so late status webhooks settle.
pub const SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Wait before downloading recording audio so the provider has it ready.
pub const ATTACH_RECORDING_DELAY: Duration = Duration::from_secs(5);

const MAX_UPDATE_ATTEMPTS: usize = 3;

/// Deployment settings needed to talk to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelephonySettings {
    /// Scheme and host the provider calls back on, e.g. `https://ivr.example.com`.
    pub public_host: String,
    /// Sender for outbound calls and messages when none is given.
    pub default_outgoing_number: String,
    /// Download recording audio after it is received.
    pub attach_recordings: bool,
}

pub(crate) fn lookup_tree(
    registry: &TreeRegistry,
    name: &str,
) -> Result<Arc<TreeDefinition>, CallError> {
    registry
        .get(name)
        .ok_or_else(|| CallError::TreeNotFound(name.to_string()))
}

/// Loads the session named by the webhook's `CallSid`.
pub(crate) async fn find_call_by_sid(
    sessions: &dyn CallSessionRepository,
    params: &WebhookParams,
) -> Result<CallSession, CallError> {
    let sid = params
        .call_sid()
        .ok_or_else(|| CallError::validation("CallSid", "is required"))?;
    sessions
        .find_by_sid(sid)
        .await?
        .ok_or_else(|| CallError::call_not_found(sid))
}

/// Loads a turn and checks it belongs to `session`.
pub(crate) async fn find_turn_of_call(
    turns: &dyn TurnRepository,
    session: &CallSession,
    turn_id: &TurnId,
) -> Result<ResponseTurn, CallError> {
    match turns.find_by_id(turn_id).await? {
        Some(turn) if turn.session_id() == session.id() => Ok(turn),
        Some(_) => {
            debug!(turn_id = %turn_id, call_sid = session.sid(), "Turn belongs to another call");
            Err(CallError::turn_not_found(turn_id))
        }
        None => Err(CallError::turn_not_found(turn_id)),
    }
}

/// Applies `change` and writes the session, reloading and re-applying on a
/// version conflict.
///
/// `change` returns `None` when it left the session untouched, in which case
/// nothing is written.
pub(crate) async fn update_session<T, F>(
    sessions: &dyn CallSessionRepository,
    mut session: CallSession,
    mut change: F,
) -> Result<(CallSession, Option<T>), CallError>
where
    F: FnMut(&mut CallSession) -> Option<T> + Send,
    T: Send,
{
    let mut attempt = 1;
    loop {
        let Some(outcome) = change(&mut session) else {
            return Ok((session, None));
        };

        match sessions.update(&mut session).await {
            Ok(()) => return Ok((session, Some(outcome))),
            Err(err) if err.is_conflict() && attempt < MAX_UPDATE_ATTEMPTS => {
                debug!(call_sid = session.sid(), attempt, "Reloading call after version conflict");
                attempt += 1;
                session = sessions
                    .find_by_id(session.id())
                    .await?
                    .ok_or_else(|| CallError::call_not_found(session.id().to_string()))?;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Writes the turns a flow step produced and refreshes the call length.
pub(crate) async fn persist_step(
    sessions: &dyn CallSessionRepository,
    turns: &dyn TurnRepository,
    session: CallSession,
    step: &FlowStep,
) -> Result<CallSession, CallError> {
    if let (Some(turn), Some(change)) = (&step.updated_turn, &step.turn_change) {
        match change {
            TurnChange::Input(input) => turns.record_input(turn.id(), input).await?,
            TurnChange::TimedOut => turns.mark_timed_out(turn.id()).await?,
        }
    }
    if let Some(turn) = &step.next_turn {
        turns.save(turn).await?;
    }

    let touched: Vec<ResponseTurn> = step
        .updated_turn
        .iter()
        .chain(step.next_turn.iter())
        .cloned()
        .collect();
    if touched.is_empty() {
        return Ok(session);
    }

    let (session, _) = update_session(sessions, session, |s| {
        let before = s.length_seconds();
        for turn in &touched {
            s.record_turn(turn.clone());
        }
        (s.length_seconds() != before).then_some(())
    })
    .await?;
    Ok(session)
}

/// Loads the caller's calls and turns on the session's tree.
pub(crate) async fn load_history(
    sessions: &dyn CallSessionRepository,
    turns: &dyn TurnRepository,
    session: &CallSession,
) -> Result<CallerHistory, CallError> {
    let caller = session.caller_id();
    let tree = session.tree_name();
    let inbound = sessions
        .count_for_caller(caller, tree, Direction::Inbound)
        .await?;
    let outbound = sessions
        .count_for_caller(caller, tree, Direction::Outbound)
        .await?;
    let turns = turns.history_for_caller(caller, tree).await?;
    Ok(CallerHistory::new(inbound, outbound, turns))
}

/// Plays the greeting and stores the first turn.
pub(crate) async fn greet(
    sessions: &dyn CallSessionRepository,
    turns: &dyn TurnRepository,
    policy: &dyn PhoneNumberPolicy,
    tree: &TreeDefinition,
    session: CallSession,
) -> Result<(CallSession, FlowStep), CallError> {
    let caller_valid = policy.is_valid(session.from_number());
    if !caller_valid {
        info!(
            call_sid = session.sid(),
            tree = tree.name(),
            "Caller number failed validation"
        );
    }
    let history = load_history(sessions, turns, &session).await?;
    let step = FlowCompiler::new(tree)
        .with_history(&history)
        .on_greeting(&session, caller_valid)?;
    let session = persist_step(sessions, turns, session, &step).await?;
    Ok((session, step))
}
