//! Call session repository port.
//!
//! Sessions are loaded together with their turns. Turns themselves are
//! written through `TurnRepository`; `update` only touches the session row.
//!
//! # Concurrency
//!
//! Provider webhooks for one call can race. `update` is a compare-and-set on
//! the session version: it fails with `ConcurrencyConflict` when another
//! writer got there first, and callers reload and re-apply their change.

use async_trait::async_trait;

use crate::domain::call::{CallSession, Direction};
use crate::domain::foundation::{CallSessionId, CallerId, DomainError};

#[async_trait]
pub trait CallSessionRepository: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// - `DuplicateRecord` if a session with the same call sid exists
    /// - `DatabaseError` on persistence failure
    async fn save(&self, session: &CallSession) -> Result<(), DomainError>;

    /// Write status, flags and length if the stored version still matches.
    ///
    /// Advances `session`'s version on success.
    ///
    /// # Errors
    ///
    /// - `CallSessionNotFound` if the session does not exist
    /// - `ConcurrencyConflict` if the stored version moved on
    /// - `DatabaseError` on persistence failure
    async fn update(&self, session: &mut CallSession) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &CallSessionId) -> Result<Option<CallSession>, DomainError>;

    /// Find a session by the provider's call sid.
    async fn find_by_sid(&self, sid: &str) -> Result<Option<CallSession>, DomainError>;

    /// Number of `direction` calls a caller has on a tree.
    async fn count_for_caller(
        &self,
        caller_id: &CallerId,
        tree_name: &str,
        direction: Direction,
    ) -> Result<usize, DomainError>;
}
