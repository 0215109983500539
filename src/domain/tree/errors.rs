//! Error types raised while building and evaluating phone trees.

use thiserror::Error;

use crate::domain::foundation::DomainError;

/// A tree that cannot be built. Raised at boot, never per call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Tree name cannot be empty")]
    EmptyTreeName,

    #[error("Tree name '{0}' must only contain lowercase letters, digits, '-' and '_'")]
    InvalidTreeName(String),

    #[error("Tree '{0}' has no greeting")]
    MissingGreeting(String),

    #[error("Tree '{tree}' has a prompt with an empty handle")]
    EmptyPromptHandle { tree: String },

    #[error("Tree '{tree}' declares prompt '{handle}' more than once")]
    DuplicatePrompt { tree: String, handle: String },

    #[error("Tree '{tree}' {source_of} refers to unknown prompt '{handle}'")]
    UnknownPrompt {
        tree: String,
        source_of: String,
        handle: String,
    },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid gather: {0}")]
    InvalidGather(String),

    #[error("Invalid after: {0}")]
    InvalidAfter(String),

    #[error("Invalid tree config: {0}")]
    InvalidConfig(String),

    #[error("Tree '{0}' is already registered")]
    DuplicateTree(String),

    #[error("Invalid macro argument: {0}")]
    InvalidMacroArgument(String),

    #[error("Cannot parse tree spec: {0}")]
    Parse(String),

    #[error("Cannot read tree spec '{path}': {message}")]
    Io { path: String, message: String },
}

impl ConfigurationError {
    pub fn unknown_prompt(
        tree: impl Into<String>,
        source_of: impl Into<String>,
        handle: impl Into<String>,
    ) -> Self {
        ConfigurationError::UnknownPrompt {
            tree: tree.into(),
            source_of: source_of.into(),
            handle: handle.into(),
        }
    }
}

/// Failure raised inside a dynamic message, after rule, or lifecycle callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CallbackError(String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<ConfigurationError> for CallbackError {
    fn from(err: ConfigurationError) -> Self {
        Self(err.to_string())
    }
}

impl From<DomainError> for CallbackError {
    fn from(err: DomainError) -> Self {
        Self(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_prompt_names_tree_source_and_handle() {
        let err = ConfigurationError::unknown_prompt("survey", "greeting", "missing");
        assert_eq!(
            err.to_string(),
            "Tree 'survey' greeting refers to unknown prompt 'missing'"
        );
    }

    #[test]
    fn configuration_error_converts_to_callback_error() {
        let err: CallbackError = ConfigurationError::InvalidMacroArgument("empty".into()).into();
        assert_eq!(err.message(), "Invalid macro argument: empty");
    }
}
