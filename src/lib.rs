//! Callflow - webhook-driven phone tree engine
//!
//! Answers a telephony provider's webhooks for inbound and outbound calls,
//! walks a declared phone tree one prompt at a time, and records every
//! answer, timeout and recording against the call.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
