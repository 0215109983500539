//! In-memory call store.
//!
//! Implements every call persistence port over one lock so tests and local
//! development can run the full webhook flow without a database. Session
//! updates honour the version check exactly like the PostgreSQL adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::call::{CallSession, Caller, Direction, Recording, ResponseTurn, TurnInput};
use crate::domain::foundation::{
    CallSessionId, CallerId, DomainError, ErrorCode, RecordingId, TurnId,
};
use crate::domain::tree::PromptHandle;
use crate::ports::{CallSessionRepository, CallerRepository, RecordingRepository, TurnRepository};

#[derive(Default)]
struct StoreState {
    sessions: HashMap<CallSessionId, CallSession>,
    /// Creation order across all sessions.
    turns: Vec<ResponseTurn>,
    recordings: HashMap<RecordingId, Recording>,
    callers: HashMap<String, Caller>,
    /// Number of upcoming session updates to reject as stale.
    injected_conflicts: usize,
}

impl StoreState {
    fn turns_of(&self, session_id: &CallSessionId) -> Vec<ResponseTurn> {
        self.turns
            .iter()
            .filter(|t| t.session_id() == session_id)
            .cloned()
            .collect()
    }

    fn stored_turn(&mut self, id: &TurnId) -> Result<&mut ResponseTurn, DomainError> {
        self.turns
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| DomainError::new(ErrorCode::TurnNotFound, format!("Turn {} not found", id)))
    }

    fn load(&self, stored: &CallSession) -> CallSession {
        CallSession::reconstitute(
            *stored.id(),
            stored.sid().to_string(),
            stored.direction(),
            stored.tree_name().to_string(),
            *stored.caller_id(),
            stored.details().clone(),
            stored.call_status(),
            stored.answered_by(),
            stored.is_finished(),
            stored.is_unanswered(),
            stored.length_seconds(),
            stored.version(),
            self.turns_of(stored.id()),
            *stored.created_at(),
        )
    }
}

/// In-memory implementation of the session, turn, recording and caller ports.
#[derive(Default)]
pub struct InMemoryCallStore {
    state: RwLock<StoreState>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Rejects the next `count` session updates with `ConcurrencyConflict`,
    /// as if another request had written first.
    pub async fn inject_conflicts(&self, count: usize) {
        self.state.write().await.injected_conflicts = count;
    }

    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    pub async fn turns_for(&self, session_id: &CallSessionId) -> Vec<ResponseTurn> {
        self.state.read().await.turns_of(session_id)
    }

    pub async fn recordings_for(&self, session_id: &CallSessionId) -> Vec<Recording> {
        self.state
            .read()
            .await
            .recordings
            .values()
            .filter(|r| r.session_id() == session_id)
            .cloned()
            .collect()
    }

    pub async fn caller_count(&self) -> usize {
        self.state.read().await.callers.len()
    }
}

#[async_trait]
impl CallSessionRepository for InMemoryCallStore {
    async fn save(&self, session: &CallSession) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state.sessions.values().any(|s| s.sid() == session.sid()) {
            return Err(DomainError::new(
                ErrorCode::DuplicateRecord,
                format!("Call {} already exists", session.sid()),
            ));
        }
        state.sessions.insert(*session.id(), session.clone());
        Ok(())
    }

    async fn update(&self, session: &mut CallSession) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state.injected_conflicts > 0 {
            state.injected_conflicts -= 1;
            return Err(DomainError::conflict(format!(
                "Call {} was modified concurrently",
                session.sid()
            )));
        }

        let stored = state.sessions.get(session.id()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::CallSessionNotFound,
                format!("Call session {} not found", session.id()),
            )
        })?;
        if stored.version() != session.version() {
            return Err(DomainError::conflict(format!(
                "Call {} is at version {}, update was based on {}",
                session.sid(),
                stored.version(),
                session.version()
            )));
        }

        session.advance_version();
        state.sessions.insert(*session.id(), session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &CallSessionId) -> Result<Option<CallSession>, DomainError> {
        let state = self.state.read().await;
        Ok(state.sessions.get(id).map(|s| state.load(s)))
    }

    async fn find_by_sid(&self, sid: &str) -> Result<Option<CallSession>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .values()
            .find(|s| s.sid() == sid)
            .map(|s| state.load(s)))
    }

    async fn count_for_caller(
        &self,
        caller_id: &CallerId,
        tree_name: &str,
        direction: Direction,
    ) -> Result<usize, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .values()
            .filter(|s| {
                s.caller_id() == caller_id
                    && s.tree_name() == tree_name
                    && s.direction() == direction
            })
            .count())
    }
}

#[async_trait]
impl TurnRepository for InMemoryCallStore {
    async fn save(&self, turn: &ResponseTurn) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state.turns.iter().any(|t| t.id() == turn.id()) {
            return Err(DomainError::new(
                ErrorCode::DuplicateRecord,
                format!("Turn {} already exists", turn.id()),
            ));
        }
        state.turns.push(turn.clone());
        Ok(())
    }

    async fn record_input(&self, id: &TurnId, input: &TurnInput) -> Result<(), DomainError> {
        self.state.write().await.stored_turn(id)?.merge_input(input);
        Ok(())
    }

    async fn mark_timed_out(&self, id: &TurnId) -> Result<(), DomainError> {
        self.state.write().await.stored_turn(id)?.mark_timed_out();
        Ok(())
    }

    async fn attach_recording(
        &self,
        id: &TurnId,
        recording_id: &RecordingId,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let turn = state.stored_turn(id)?;
        if turn.recording_id().is_none() {
            turn.attach_recording(*recording_id);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &TurnId) -> Result<Option<ResponseTurn>, DomainError> {
        let state = self.state.read().await;
        Ok(state.turns.iter().find(|t| t.id() == id).cloned())
    }

    async fn latest_for_handle(
        &self,
        session_id: &CallSessionId,
        handle: &PromptHandle,
        limit: usize,
    ) -> Result<Vec<ResponseTurn>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .turns
            .iter()
            .rev()
            .filter(|t| t.session_id() == session_id && t.prompt_handle() == handle)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn history_for_caller(
        &self,
        caller_id: &CallerId,
        tree_name: &str,
    ) -> Result<Vec<ResponseTurn>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .turns
            .iter()
            .filter(|t| {
                state.sessions.get(t.session_id()).is_some_and(|s| {
                    s.caller_id() == caller_id && s.tree_name() == tree_name
                })
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RecordingRepository for InMemoryCallStore {
    async fn exists_for_session(
        &self,
        session_id: &CallSessionId,
        recording_sid: &str,
    ) -> Result<bool, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .recordings
            .values()
            .any(|r| r.session_id() == session_id && r.recording_sid() == recording_sid))
    }

    async fn save(&self, recording: &Recording) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let duplicate = state.recordings.values().any(|r| {
            r.session_id() == recording.session_id()
                && r.recording_sid() == recording.recording_sid()
        });
        if duplicate {
            return Err(DomainError::new(
                ErrorCode::DuplicateRecord,
                format!("Recording {} already stored", recording.recording_sid()),
            ));
        }
        state.recordings.insert(*recording.id(), recording.clone());
        Ok(())
    }

    async fn update(&self, recording: &Recording) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        match state.recordings.get_mut(recording.id()) {
            Some(stored) => {
                *stored = recording.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::RecordingNotFound,
                format!("Recording {} not found", recording.id()),
            )),
        }
    }

    async fn find_by_id(&self, id: &RecordingId) -> Result<Option<Recording>, DomainError> {
        Ok(self.state.read().await.recordings.get(id).cloned())
    }
}

#[async_trait]
impl CallerRepository for InMemoryCallStore {
    async fn find_by_number(&self, phone_number: &str) -> Result<Option<Caller>, DomainError> {
        Ok(self.state.read().await.callers.get(phone_number).cloned())
    }

    async fn save(&self, caller: &Caller) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state.callers.contains_key(caller.phone_number()) {
            return Err(DomainError::new(
                ErrorCode::DuplicateRecord,
                format!("Caller {} already exists", caller.phone_number()),
            ));
        }
        state
            .callers
            .insert(caller.phone_number().to_string(), caller.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::{CallDetails, Direction, WebhookParams};
    use crate::domain::foundation::CallerId;

    fn session(sid: &str) -> CallSession {
        CallSession::new(
            sid,
            Direction::Inbound,
            "survey",
            CallerId::new(),
            CallDetails::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sessions_load_with_their_turns_in_order() {
        let store = InMemoryCallStore::new();
        let s = session("CA1");
        CallSessionRepository::save(&store, &s).await.unwrap();

        let first = ResponseTurn::new(*s.id(), PromptHandle::from("a"));
        let second = ResponseTurn::new(*s.id(), PromptHandle::from("b"));
        TurnRepository::save(&store, &first).await.unwrap();
        TurnRepository::save(&store, &second).await.unwrap();

        let loaded = store.find_by_sid("CA1").await.unwrap().unwrap();
        let ids: Vec<_> = loaded.turns().iter().map(|t| *t.id()).collect();
        assert_eq!(ids, vec![*first.id(), *second.id()]);
    }

    #[tokio::test]
    async fn duplicate_sid_is_rejected() {
        let store = InMemoryCallStore::new();
        CallSessionRepository::save(&store, &session("CA1")).await.unwrap();
        let err = CallSessionRepository::save(&store, &session("CA1"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateRecord);
    }

    #[tokio::test]
    async fn stale_update_is_a_conflict() {
        let store = InMemoryCallStore::new();
        let s = session("CA1");
        CallSessionRepository::save(&store, &s).await.unwrap();

        let mut first = CallSessionRepository::find_by_id(&store, s.id())
            .await
            .unwrap()
            .unwrap();
        let mut second = first.clone();

        first.mark_finished();
        CallSessionRepository::update(&store, &mut first).await.unwrap();
        assert_eq!(first.version(), 1);

        second.mark_unanswered();
        let err = CallSessionRepository::update(&store, &mut second)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(second.version(), 0);
    }

    #[tokio::test]
    async fn injected_conflicts_are_consumed() {
        let store = InMemoryCallStore::new();
        let s = session("CA1");
        CallSessionRepository::save(&store, &s).await.unwrap();
        store.inject_conflicts(1).await;

        let mut loaded = CallSessionRepository::find_by_id(&store, s.id())
            .await
            .unwrap()
            .unwrap();
        assert!(CallSessionRepository::update(&store, &mut loaded)
            .await
            .unwrap_err()
            .is_conflict());
        CallSessionRepository::update(&store, &mut loaded)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn latest_for_handle_is_scoped_and_most_recent_first() {
        let store = InMemoryCallStore::new();
        let s = session("CA1");
        let other = session("CA2");
        let menu = PromptHandle::from("menu");

        let older = ResponseTurn::new(*s.id(), menu.clone());
        let unrelated = ResponseTurn::new(*s.id(), PromptHandle::from("other"));
        let newer = ResponseTurn::new(*s.id(), menu.clone());
        let foreign = ResponseTurn::new(*other.id(), menu.clone());
        for t in [&older, &unrelated, &newer, &foreign] {
            TurnRepository::save(&store, t).await.unwrap();
        }

        let latest = store.latest_for_handle(s.id(), &menu, 5).await.unwrap();
        let ids: Vec<_> = latest.iter().map(|t| *t.id()).collect();
        assert_eq!(ids, vec![*newer.id(), *older.id()]);
        assert_eq!(store.latest_for_handle(s.id(), &menu, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn turn_writes_only_fill_their_own_empty_fields() {
        let store = InMemoryCallStore::new();
        let turn = ResponseTurn::new(CallSessionId::new(), PromptHandle::from("menu"));
        TurnRepository::save(&store, &turn).await.unwrap();
        let first_recording = RecordingId::new();

        store.mark_timed_out(turn.id()).await.unwrap();
        store
            .attach_recording(turn.id(), &first_recording)
            .await
            .unwrap();
        store
            .record_input(
                turn.id(),
                &TurnInput {
                    digits: Some("7".into()),
                    transcription: None,
                },
            )
            .await
            .unwrap();
        store
            .record_input(
                turn.id(),
                &TurnInput {
                    digits: Some("8".into()),
                    transcription: Some("eight".into()),
                },
            )
            .await
            .unwrap();
        store
            .attach_recording(turn.id(), &RecordingId::new())
            .await
            .unwrap();

        let stored = TurnRepository::find_by_id(&store, turn.id())
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_timeout());
        assert_eq!(stored.digits(), Some("7"));
        assert_eq!(stored.transcription(), Some("eight"));
        assert_eq!(stored.recording_id(), Some(&first_recording));
    }

    #[tokio::test]
    async fn writes_to_unknown_turn_are_not_found() {
        let store = InMemoryCallStore::new();
        let err = store.mark_timed_out(&TurnId::new()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TurnNotFound);
    }

    #[tokio::test]
    async fn calls_are_counted_per_caller_tree_and_direction() {
        let store = InMemoryCallStore::new();
        let caller = CallerId::new();
        for (sid, direction, tree) in [
            ("CA1", Direction::Inbound, "survey"),
            ("CA2", Direction::Inbound, "survey"),
            ("CA3", Direction::Outbound, "survey"),
            ("CA4", Direction::Inbound, "other"),
        ] {
            let s = CallSession::new(sid, direction, tree, caller, CallDetails::default()).unwrap();
            CallSessionRepository::save(&store, &s).await.unwrap();
        }
        CallSessionRepository::save(&store, &session("CA5")).await.unwrap();

        let inbound = store
            .count_for_caller(&caller, "survey", Direction::Inbound)
            .await
            .unwrap();
        let outbound = store
            .count_for_caller(&caller, "survey", Direction::Outbound)
            .await
            .unwrap();
        assert_eq!((inbound, outbound), (2, 1));
    }

    #[tokio::test]
    async fn recordings_are_unique_per_call_and_sid() {
        let store = InMemoryCallStore::new();
        let s = session("CA1");
        let params = WebhookParams::default().with("RecordingSid", "RE1");
        let first = Recording::from_params(*s.id(), &params).unwrap();
        let again = Recording::from_params(*s.id(), &params).unwrap();

        RecordingRepository::save(&store, &first).await.unwrap();
        assert!(store.exists_for_session(s.id(), "RE1").await.unwrap());
        let err = RecordingRepository::save(&store, &again).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateRecord);
        assert_eq!(store.recordings_for(s.id()).await.len(), 1);
    }
}
