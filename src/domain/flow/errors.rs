//! Errors raised while evaluating a flow step.

use thiserror::Error;

use crate::domain::tree::CallbackError;

/// Failure computing the next step of a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The tree graph references a prompt that does not exist. Never retried.
    #[error("Tree '{tree}' cannot find prompt '{handle}'")]
    FlowIntegrity { tree: String, handle: String },

    /// A dynamic message or after rule failed.
    #[error("Dynamic tree value failed: {0}")]
    Callback(#[from] CallbackError),
}

impl FlowError {
    pub fn integrity(tree: impl Into<String>, handle: impl Into<String>) -> Self {
        FlowError::FlowIntegrity {
            tree: tree.into(),
            handle: handle.into(),
        }
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, FlowError::FlowIntegrity { .. })
    }
}
