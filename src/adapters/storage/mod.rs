//! Recording storage adapters.
//!
//! - **FileRecordingStorage** - Stores recording audio as files on disk
//!
//! The in-memory counterpart lives in `adapters::memory`.

mod file_recording_storage;

pub use file_recording_storage::FileRecordingStorage;
