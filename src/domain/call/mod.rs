//! Call sessions, turns and recordings.
//!
//! # Module Organization
//!
//! - `session` - Call session aggregate and status classification
//! - `turn` - Response turns and captured input
//! - `status` - Provider call status, direction and answering machine result
//! - `timeout` - Consecutive-timeout policy
//! - `recording` / `caller` - Recording references and caller identities
//! - `history` - A caller's earlier turns on one tree
//! - `params` - Opaque webhook field map

mod caller;
mod errors;
mod history;
mod params;
mod recording;
mod session;
mod status;
mod timeout;
mod turn;

pub use caller::Caller;
pub use errors::CallError;
pub use history::CallerHistory;
pub use params::WebhookParams;
pub use recording::Recording;
pub use session::{CallDetails, CallSession, StatusChange, StatusUpdate, LENGTH_BUFFER_SECONDS};
pub use status::{AnsweredBy, CallStatus, Direction};
pub use timeout::TimeoutPolicy;
pub use turn::{AnswerVocabulary, ResponseTurn, TurnChange, TurnInput, NO_ANSWERS, YES_ANSWERS};
