//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum routes for the provider webhooks
//! - `memory` - In-memory stores for tests and development
//! - `phone_number` - Caller number normalization
//! - `postgres` - PostgreSQL repositories
//! - `scheduler` - Delayed job runner
//! - `storage` - Recording audio on disk
//! - `twilio` - Telephony provider REST client

pub mod http;
pub mod memory;
pub mod phone_number;
pub mod postgres;
pub mod scheduler;
pub mod storage;
pub mod twilio;

pub use http::{phone_router, PhoneAppState};
pub use scheduler::TokioTaskScheduler;
