//! Domain layer containing call flow logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, errors, state machines)
//! - `tree` - Phone tree definitions, documents and the registry
//! - `call` - Call sessions, turns, recordings and callers
//! - `flow` - Per-webhook evaluation of a tree into voice markup

pub mod call;
pub mod flow;
pub mod foundation;
pub mod tree;
