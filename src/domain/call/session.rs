//! Call session aggregate.
//!
//! One phone call plus its ordered turns. Created when an inbound call
//! arrives or an outbound call is started, mutated by every later webhook,
//! never deleted.
//!
//! # Classification
//!
//! Answering-machine and no-answer are recomputed from the current fields
//! on every read. `apply_status_update` reports which side effects became
//! due so callers schedule them only when a field actually flipped.

use serde::{Deserialize, Serialize};

use super::params::WebhookParams;
use super::status::{AnsweredBy, CallStatus, Direction};
use super::turn::ResponseTurn;
use crate::domain::foundation::{
    CallSessionId, CallerId, DomainError, ErrorCode, StateMachine, Timestamp, TurnId,
};
use crate::domain::tree::PromptHandle;

/// Added to the first-to-last turn span to estimate call length.
pub const LENGTH_BUFFER_SECONDS: i64 = 5;

/// Caller and callee details captured when the session is created.
///
/// `from_number` is always the remote party, including on outbound calls
/// where it holds the number that was dialed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDetails {
    pub from_number: String,
    pub to_number: Option<String>,
    pub from_city: Option<String>,
    pub from_province: Option<String>,
    pub from_country: Option<String>,
}

impl CallDetails {
    /// Reads caller/callee fields, preferring the `Caller*` / `Called` variants.
    pub fn from_params(params: &WebhookParams) -> Self {
        Self {
            from_number: params
                .first_of(&["Caller", "From"])
                .unwrap_or_default()
                .to_string(),
            to_number: params.first_of(&["Called", "To"]).map(str::to_string),
            from_city: params.first_of(&["CallerCity", "FromCity"]).map(str::to_string),
            from_province: params
                .first_of(&["CallerState", "FromState"])
                .map(str::to_string),
            from_country: params
                .first_of(&["CallerCountry", "FromCountry"])
                .map(str::to_string),
        }
    }

    /// "City, Province, Country" with missing parts skipped.
    pub fn location(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.from_city, &self.from_province, &self.from_country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

/// Status fields carried by a webhook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub call_status: Option<CallStatus>,
    pub answered_by: Option<AnsweredBy>,
}

impl StatusUpdate {
    /// Reads `CallStatus` and `AnsweredBy`. Unknown statuses are dropped.
    pub fn from_params(params: &WebhookParams) -> Self {
        let call_status = params.get("CallStatus").and_then(|s| match s.parse::<CallStatus>() {
            Ok(status) => Some(status),
            Err(err) => {
                tracing::warn!(value = s, error = %err, "Ignoring unknown call status");
                None
            }
        });
        Self {
            call_status,
            answered_by: params.get("AnsweredBy").map(AnsweredBy::from_param),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.call_status.is_none() && self.answered_by.is_none()
    }
}

/// What changed when a status update was applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusChange {
    pub status_changed: bool,
    pub answered_by_changed: bool,
    /// The new status is not reachable from the previous one.
    pub out_of_order: bool,
    /// A field flipped and the call is now unanswered or a machine.
    pub became_unanswered: bool,
    /// The status moved into a terminal value.
    pub became_finished: bool,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.status_changed || self.answered_by_changed
    }
}

/// Call session aggregate.
///
/// # Invariants
///
/// - `sid` is non-empty
/// - `turns` are ordered by creation
/// - `length_seconds` is recomputed whenever a turn is recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSession {
    id: CallSessionId,
    sid: String,
    direction: Direction,
    tree_name: String,
    caller_id: CallerId,
    details: CallDetails,
    call_status: Option<CallStatus>,
    answered_by: Option<AnsweredBy>,
    finished: bool,
    unanswered: bool,
    length_seconds: i64,
    version: i64,
    turns: Vec<ResponseTurn>,
    created_at: Timestamp,
}

impl CallSession {
    /// Creates a session for a call the provider has assigned `sid` to.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `sid` or `tree_name` is blank
    pub fn new(
        sid: impl Into<String>,
        direction: Direction,
        tree_name: impl Into<String>,
        caller_id: CallerId,
        details: CallDetails,
    ) -> Result<Self, DomainError> {
        let sid = sid.into();
        let tree_name = tree_name.into();
        if sid.trim().is_empty() {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "Call sid cannot be empty",
            ));
        }
        if tree_name.trim().is_empty() {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "Tree name cannot be empty",
            ));
        }

        Ok(Self {
            id: CallSessionId::new(),
            sid,
            direction,
            tree_name,
            caller_id,
            details,
            call_status: None,
            answered_by: None,
            finished: false,
            unanswered: false,
            length_seconds: 0,
            version: 0,
            turns: Vec::new(),
            created_at: Timestamp::now(),
        })
    }

    pub fn with_status(mut self, status: Option<CallStatus>) -> Self {
        self.call_status = status;
        self
    }

    /// Reconstitute a session from persistence.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: CallSessionId,
        sid: String,
        direction: Direction,
        tree_name: String,
        caller_id: CallerId,
        details: CallDetails,
        call_status: Option<CallStatus>,
        answered_by: Option<AnsweredBy>,
        finished: bool,
        unanswered: bool,
        length_seconds: i64,
        version: i64,
        turns: Vec<ResponseTurn>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            sid,
            direction,
            tree_name,
            caller_id,
            details,
            call_status,
            answered_by,
            finished,
            unanswered,
            length_seconds,
            version,
            turns,
            created_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &CallSessionId {
        &self.id
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn tree_name(&self) -> &str {
        &self.tree_name
    }

    pub fn caller_id(&self) -> &CallerId {
        &self.caller_id
    }

    pub fn details(&self) -> &CallDetails {
        &self.details
    }

    pub fn from_number(&self) -> &str {
        &self.details.from_number
    }

    pub fn call_status(&self) -> Option<CallStatus> {
        self.call_status
    }

    pub fn answered_by(&self) -> Option<AnsweredBy> {
        self.answered_by
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_unanswered(&self) -> bool {
        self.unanswered
    }

    pub fn length_seconds(&self) -> i64 {
        self.length_seconds
    }

    /// Optimistic lock version, bumped by the repository on every update.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn turns(&self) -> &[ResponseTurn] {
        &self.turns
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Classification
    // ─────────────────────────────────────────────────────────────────────────

    pub fn is_outbound(&self) -> bool {
        self.direction == Direction::Outbound
    }

    pub fn is_answering_machine(&self) -> bool {
        self.is_outbound() && self.answered_by == Some(AnsweredBy::MachineStart)
    }

    pub fn is_no_answer(&self) -> bool {
        self.is_outbound() && self.call_status.is_some_and(|s| s.is_no_answer())
    }

    pub fn is_completed(&self) -> bool {
        self.call_status == Some(CallStatus::Completed)
    }

    pub fn is_in_progress(&self) -> bool {
        self.call_status.map_or(true, |s| s.is_in_progress())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Applies status fields from a webhook.
    ///
    /// `answered_by` is only taken for outbound calls. A field changes only
    /// when the new value is present and differs from the stored one, so a
    /// redelivered webhook reports no change.
    pub fn apply_status_update(&mut self, update: &StatusUpdate) -> StatusChange {
        let mut change = StatusChange::default();

        if self.is_outbound() {
            if let Some(answered_by) = update.answered_by {
                if self.answered_by != Some(answered_by) {
                    self.answered_by = Some(answered_by);
                    change.answered_by_changed = true;
                }
            }
        }

        if let Some(status) = update.call_status {
            if self.call_status != Some(status) {
                let was_terminal = self.call_status.is_some_and(|s| s.is_terminal());
                if let Some(current) = self.call_status {
                    change.out_of_order = !current.can_transition_to(&status);
                }
                self.call_status = Some(status);
                change.status_changed = true;
                change.became_finished = status.is_terminal() && !was_terminal;
            }
        }

        change.became_unanswered = (change.status_changed && self.is_no_answer())
            || (change.answered_by_changed && self.is_answering_machine());

        change
    }

    /// Appends a turn (or refreshes it if already present) and recomputes the call length.
    pub fn record_turn(&mut self, turn: ResponseTurn) {
        if !self.replace_turn(turn.clone()) {
            self.turns.push(turn);
        }
        self.recalculate_length();
    }

    /// Called by repositories after a successful versioned update.
    pub fn advance_version(&mut self) {
        self.version += 1;
    }

    /// Replaces a stored turn with an updated copy. Returns false if unknown.
    pub fn replace_turn(&mut self, turn: ResponseTurn) -> bool {
        match self.turns.iter_mut().find(|t| t.id() == turn.id()) {
            Some(existing) => {
                *existing = turn;
                true
            }
            None => false,
        }
    }

    /// (last turn - first turn) + buffer, or zero without turns.
    pub fn recalculate_length(&mut self) -> i64 {
        let first = self.turns.iter().map(|t| *t.created_at()).min();
        let last = self.turns.iter().map(|t| *t.created_at()).max();
        self.length_seconds = match (first, last) {
            (Some(first), Some(last)) => {
                last.duration_since(&first).num_seconds() + LENGTH_BUFFER_SECONDS
            }
            _ => 0,
        };
        self.length_seconds
    }

    /// Flags the call unanswered. Returns false if it already was.
    pub fn mark_unanswered(&mut self) -> bool {
        !std::mem::replace(&mut self.unanswered, true)
    }

    /// Flags the call finished. Returns false if it already was.
    pub fn mark_finished(&mut self) -> bool {
        !std::mem::replace(&mut self.finished, true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Turn queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn turn(&self, id: &TurnId) -> Option<&ResponseTurn> {
        self.turns.iter().find(|t| t.id() == id)
    }

    /// The earliest turn on `handle`, timed out or not.
    pub fn first_turn_for(&self, handle: &PromptHandle) -> Option<&ResponseTurn> {
        self.turns.iter().find(|t| t.prompt_handle() == handle)
    }

    /// The most recent turn on `handle` that did not time out.
    pub fn completed_turn_for(&self, handle: &PromptHandle) -> Option<&ResponseTurn> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.prompt_handle() == handle && !t.is_timeout())
    }

    /// Up to `limit` turns on `handle`, most recent first.
    pub fn recent_turns_for(&self, handle: &PromptHandle, limit: usize) -> Vec<&ResponseTurn> {
        self.turns
            .iter()
            .rev()
            .filter(|t| t.prompt_handle() == handle)
            .take(limit)
            .collect()
    }
}
