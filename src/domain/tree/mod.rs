//! Phone tree model.
//!
//! Trees are declared once, either through `TreeBuilder` or a YAML/JSON
//! `TreeSpec`, validated eagerly, and registered into a frozen
//! `TreeRegistry` before the server accepts calls.
//!
//! # Module Organization
//!
//! - `message` - Say / play / pause messages and ordered message sets
//! - `gather` - Digits, voice and speech input directives
//! - `after` - Transitions to another prompt or hangup
//! - `prompt` - Prompt nodes and handles
//! - `definition` - The compiled tree and its builder
//! - `document` - Declarative tree documents
//! - `registry` - Name-keyed lookup of compiled trees
//! - `macros` - Shortcuts for common fragments

mod after;
mod definition;
mod document;
mod errors;
mod gather;
pub mod macros;
mod message;
mod prompt;
mod registry;

pub use after::{AfterRule, Target, Transition, TransitionFn};
pub use definition::{
    LifecycleCallback, TreeBuilder, TreeConfig, TreeDefinition, DEFAULT_FINAL_TIMEOUT_ATTEMPTS,
    DEFAULT_FINAL_TIMEOUT_MESSAGE, DEFAULT_VOICE,
};
pub use document::{
    load_tree_dir, AfterFields, AfterSpec, MessageFields, MessageSpec, PromptSpec, TreeSpec,
};
pub use errors::{CallbackError, ConfigurationError};
pub use gather::{DigitsGather, GatherSpec, SpeechGather, VoiceGather};
pub use message::{Content, Message, MessageEntry, MessageSet, MessageSetFn, TextFn};
pub use prompt::{PromptHandle, PromptNode};
pub use registry::{TreeRegistry, TreeRegistryBuilder};
