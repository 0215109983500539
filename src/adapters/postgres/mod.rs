//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresCallSessionRepository` - Sessions with versioned updates, loaded with their turns
//! - `PostgresTurnRepository` - Turns and the per-prompt recency window
//! - `PostgresRecordingRepository` - Recording references
//! - `PostgresCallerRepository` - Caller identities
//!
//! The schema lives in `migrations/` and is applied at startup.

mod call_session_repository;
mod caller_repository;
mod recording_repository;
mod rows;
mod turn_repository;

pub use call_session_repository::PostgresCallSessionRepository;
pub use caller_repository::PostgresCallerRepository;
pub use recording_repository::PostgresRecordingRepository;
pub use turn_repository::PostgresTurnRepository;
