//! Phone handlers.
//!
//! Handlers for provider webhooks, outbound operations and deferred jobs.
//!
//! ## Webhooks
//! - Inbound and outbound call answer (greeting)
//! - Prompt, prompt response and timeout for a turn
//! - Call status updates, recordings and transcriptions
//!
//! ## Outbound
//! - Starting a call into a tree
//! - Sending text messages
//!
//! ## Jobs
//! - Unanswered and finished call hooks
//! - Recording audio download

mod attach_recording;
mod find_or_create_caller;
mod finished_call;
mod inbound_call;
mod jobs;
mod outbound_call;
mod prompt;
mod prompt_response;
mod receive_recording;
mod send_message;
mod start_call;
mod support;
mod timeout;
mod transcribe;
mod unanswered_call;
mod update_call;

#[cfg(test)]
pub(crate) mod testing;

// Webhooks
pub use inbound_call::{InboundCallCommand, InboundCallHandler, InboundCallResult};
pub use outbound_call::{OutboundCallCommand, OutboundCallHandler, OutboundCallResult};
pub use prompt::{PromptCommand, PromptHandler, PromptResult};
pub use prompt_response::{PromptResponseCommand, PromptResponseHandler, PromptResponseResult};
pub use receive_recording::{ReceiveRecordingCommand, ReceiveRecordingHandler};
pub use timeout::{TimeoutCommand, TimeoutHandler, TimeoutResult};
pub use transcribe::{TranscribeCommand, TranscribeHandler};
pub use update_call::{UpdateCallCommand, UpdateCallHandler};

// Outbound
pub use find_or_create_caller::{FindOrCreateCallerCommand, FindOrCreateCallerHandler};
pub use send_message::{SendMessageCommand, SendMessageHandler, SendMessageResult};
pub use start_call::{StartCallCommand, StartCallHandler};

// Jobs
pub use attach_recording::{AttachRecordingCommand, AttachRecordingHandler};
pub use finished_call::{FinishedCallCommand, FinishedCallHandler};
pub use jobs::PhoneJobExecutor;
pub use unanswered_call::{UnansweredCallCommand, UnansweredCallHandler};

pub use support::{TelephonySettings, ATTACH_RECORDING_DELAY, SETTLE_DELAY};
