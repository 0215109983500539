//! In-memory adapters for tests and local development.
//!
//! - **InMemoryCallStore** - Sessions, turns, recordings and callers
//! - **InMemoryRecordingStorage** - Recording audio
//! - **RecordingTaskScheduler** - Captures scheduled jobs without running them

mod call_store;
mod recording_storage;
mod scheduler;

pub use call_store::InMemoryCallStore;
pub use recording_storage::InMemoryRecordingStorage;
pub use scheduler::RecordingTaskScheduler;
