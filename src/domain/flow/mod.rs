//! Call flow evaluation.
//!
//! Turns a tree plus a call session into voice response markup, one webhook
//! at a time.
//!
//! # Module Organization
//!
//! - `compiler` - The per-event state machine
//! - `context` - Read-only view passed to dynamic tree values
//! - `markup` - Voice response verbs and XML rendering
//! - `routes` - Webhook callback paths

mod compiler;
mod context;
mod errors;
mod markup;
mod routes;

pub use compiler::{FlowCompiler, FlowStep, StepOutcome};
pub use context::FlowContext;
pub use errors::FlowError;
pub use markup::{Verb, VoiceResponse};
pub use routes::WebhookRoutes;
