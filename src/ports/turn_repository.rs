//! Response turn repository port.
//!
//! # Concurrency
//!
//! The input, timeout and recording callbacks for one turn can arrive
//! together. Each write touches only the columns its callback owns and
//! only fills values that are still empty, so racing writers never erase
//! each other's fields.

use async_trait::async_trait;

use crate::domain::call::{ResponseTurn, TurnInput};
use crate::domain::foundation::{CallSessionId, CallerId, DomainError, RecordingId, TurnId};
use crate::domain::tree::PromptHandle;

/// Persistence for turns, including the recency window used by timeouts.
#[async_trait]
pub trait TurnRepository: Send + Sync {
    async fn save(&self, turn: &ResponseTurn) -> Result<(), DomainError>;

    /// Fill digits and transcription where the stored turn has none.
    ///
    /// # Errors
    ///
    /// - `TurnNotFound` if the turn does not exist
    async fn record_input(&self, id: &TurnId, input: &TurnInput) -> Result<(), DomainError>;

    /// Set the timeout flag.
    ///
    /// # Errors
    ///
    /// - `TurnNotFound` if the turn does not exist
    async fn mark_timed_out(&self, id: &TurnId) -> Result<(), DomainError>;

    /// Set the recording reference unless one is already stored.
    ///
    /// # Errors
    ///
    /// - `TurnNotFound` if the turn does not exist
    async fn attach_recording(
        &self,
        id: &TurnId,
        recording_id: &RecordingId,
    ) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &TurnId) -> Result<Option<ResponseTurn>, DomainError>;

    /// Up to `limit` turns on `handle` within one session, most recent first.
    async fn latest_for_handle(
        &self,
        session_id: &CallSessionId,
        handle: &PromptHandle,
        limit: usize,
    ) -> Result<Vec<ResponseTurn>, DomainError>;

    /// Every turn of a caller's calls on a tree, oldest first.
    async fn history_for_caller(
        &self,
        caller_id: &CallerId,
        tree_name: &str,
    ) -> Result<Vec<ResponseTurn>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn TurnRepository) {}
    }
}
