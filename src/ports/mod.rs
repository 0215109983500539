//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `CallSessionRepository` - Sessions, with versioned updates
//! - `TurnRepository` - Turns and the per-prompt recency window
//! - `RecordingRepository` - Recording references, unique per call
//! - `CallerRepository` - Caller identities keyed by number
//! - `RecordingStorage` - Downloaded recording audio
//!
//! ## Provider Ports
//!
//! - `TelephonyProvider` - Outbound calls, messages and media downloads
//! - `PhoneNumberPolicy` - Caller number normalization
//!
//! ## Job Ports
//!
//! - `TaskScheduler` - Deferred, at-least-once side effects
//! - `JobExecutor` - Runs a deferred job when it comes due

mod call_session_repository;
mod caller_repository;
mod phone_number_policy;
mod recording_repository;
mod recording_storage;
mod task_scheduler;
mod telephony_provider;
mod turn_repository;

pub use call_session_repository::CallSessionRepository;
pub use caller_repository::CallerRepository;
pub use phone_number_policy::PhoneNumberPolicy;
pub use recording_repository::RecordingRepository;
pub use recording_storage::{RecordingStorage, StorageError};
pub use task_scheduler::{JobExecutor, ScheduledJob, TaskScheduler};
pub use telephony_provider::{
    OutboundCall, OutboundMessage, RecordingMedia, TelephonyProvider, TransportError,
    UNSUBSCRIBED_ERROR_CODE,
};
pub use turn_repository::TurnRepository;
