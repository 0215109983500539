//! Declarative tree documents (YAML or JSON).
//!
//! Documents cover everything except dynamic callables, which can only be
//! attached through `TreeBuilder`. Loose shapes (a bare string, a map, a
//! list) are resolved here into the closed variants of the tree model.

use std::path::Path;

use serde::Deserialize;

use super::after::{AfterRule, Transition};
use super::definition::{
    TreeBuilder, TreeDefinition, DEFAULT_FINAL_TIMEOUT_ATTEMPTS, DEFAULT_VOICE,
};
use super::errors::ConfigurationError;
use super::gather::GatherSpec;
use super::message::{Content, Message, MessageSet};
use super::prompt::PromptNode;
use crate::domain::call::AnswerVocabulary;

/// Serialized form of a whole tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeSpec {
    pub name: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default)]
    pub final_timeout_message: Option<MessageSpec>,
    #[serde(default = "default_final_timeout_attempts")]
    pub final_timeout_attempts: usize,
    #[serde(default)]
    pub invalid_phone_number: Option<MessageSpec>,
    /// Replaces the default "yes" words.
    #[serde(default)]
    pub yes_answers: Option<Vec<String>>,
    /// Replaces the default "no" words.
    #[serde(default)]
    pub no_answers: Option<Vec<String>>,
    pub greeting: AfterSpec,
    #[serde(default)]
    pub prompts: Vec<PromptSpec>,
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_final_timeout_attempts() -> usize {
    DEFAULT_FINAL_TIMEOUT_ATTEMPTS
}

/// Serialized prompt.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptSpec {
    pub name: String,
    #[serde(default)]
    pub message: Option<MessageSpec>,
    #[serde(default)]
    pub gather: Option<GatherSpec>,
    pub after: AfterSpec,
}

/// A message in any of its accepted shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageSpec {
    Text(String),
    List(Vec<MessageSpec>),
    Fields(MessageFields),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageFields {
    pub say: Option<String>,
    pub play: Option<String>,
    pub pause: Option<u32>,
    pub voice: Option<String>,
}

/// A transition in any of its accepted shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AfterSpec {
    Handle(String),
    Fields(AfterFields),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AfterFields {
    pub message: Option<MessageSpec>,
    pub prompt: Option<String>,
    pub hangup: Option<bool>,
}

impl TreeSpec {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigurationError> {
        serde_yaml::from_str(source).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(source).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    /// Reads a document from disk. `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&source)
        } else {
            Self::from_yaml_str(&source)
        }
    }

    /// Converts the document into a builder so callables can still be attached.
    pub fn into_builder(self) -> Result<TreeBuilder, ConfigurationError> {
        let mut builder = TreeDefinition::builder(self.name)
            .voice(self.voice)
            .final_timeout_attempts(self.final_timeout_attempts)
            .greeting(self.greeting.compile()?);

        if let Some(message) = self.final_timeout_message {
            builder = builder.final_timeout_message(message.compile()?);
        }
        if let Some(message) = self.invalid_phone_number {
            builder = builder.invalid_phone_number(message.compile()?);
        }
        if self.yes_answers.is_some() || self.no_answers.is_some() {
            let defaults = AnswerVocabulary::default();
            builder = builder.answers(AnswerVocabulary::new(
                self.yes_answers.unwrap_or(defaults.yes),
                self.no_answers.unwrap_or(defaults.no),
            ));
        }
        for prompt in self.prompts {
            builder = builder.prompt(prompt.compile()?);
        }
        Ok(builder)
    }

    /// Compiles and validates the document.
    pub fn compile(self) -> Result<TreeDefinition, ConfigurationError> {
        self.into_builder()?.build()
    }
}

impl PromptSpec {
    fn compile(self) -> Result<PromptNode, ConfigurationError> {
        let messages = match self.message {
            Some(message) => message.compile()?,
            None => MessageSet::new(),
        };
        let node = PromptNode::new(self.name, messages, self.after.compile()?);
        Ok(match self.gather {
            Some(gather) => node.with_gather(gather),
            None => node,
        })
    }
}

impl MessageSpec {
    /// Resolves the shape into a message set.
    pub fn compile(self) -> Result<MessageSet, ConfigurationError> {
        let mut set = MessageSet::new();
        self.append_to(&mut set)?;
        Ok(set)
    }

    fn append_to(self, set: &mut MessageSet) -> Result<(), ConfigurationError> {
        match self {
            MessageSpec::Text(text) => set.push(Message::say(text)),
            MessageSpec::List(items) => {
                for item in items {
                    item.append_to(set)?;
                }
            }
            MessageSpec::Fields(fields) => set.push(fields.compile()?),
        }
        Ok(())
    }
}

impl MessageFields {
    fn compile(self) -> Result<Message, ConfigurationError> {
        let message = match (self.say, self.play, self.pause) {
            (Some(text), None, None) => Message::Say {
                text: Content::Static(text),
                voice: self.voice,
            },
            (None, Some(url), None) if self.voice.is_none() => Message::play(url),
            (None, None, Some(seconds)) if self.voice.is_none() => Message::pause(seconds),
            (None, None, None) => {
                return Err(ConfigurationError::InvalidMessage(
                    "message needs one of say, play or pause".to_string(),
                ))
            }
            (_, _, _) if self.voice.is_some() => {
                return Err(ConfigurationError::InvalidMessage(
                    "voice only applies to say messages".to_string(),
                ))
            }
            _ => {
                return Err(ConfigurationError::InvalidMessage(
                    "message must have exactly one of say, play or pause".to_string(),
                ))
            }
        };
        message.validate()?;
        Ok(message)
    }
}

impl AfterSpec {
    /// Resolves the shape into a static after rule.
    pub fn compile(self) -> Result<AfterRule, ConfigurationError> {
        match self {
            AfterSpec::Handle(handle) => {
                if handle.trim().is_empty() {
                    return Err(ConfigurationError::InvalidAfter(
                        "prompt handle cannot be blank".to_string(),
                    ));
                }
                Ok(AfterRule::goto(handle))
            }
            AfterSpec::Fields(fields) => {
                let transition = match (fields.prompt, fields.hangup.unwrap_or(false)) {
                    (Some(handle), false) => Transition::goto(handle),
                    (None, true) => Transition::hangup(),
                    (Some(_), true) => {
                        return Err(ConfigurationError::InvalidAfter(
                            "after cannot have both prompt and hangup".to_string(),
                        ))
                    }
                    (None, false) => {
                        return Err(ConfigurationError::InvalidAfter(
                            "after needs either prompt or hangup".to_string(),
                        ))
                    }
                };
                let transition = match fields.message {
                    Some(message) => transition.with_message(message.compile()?),
                    None => transition,
                };
                Ok(AfterRule::Static(transition))
            }
        }
    }
}

/// Loads every `.yaml`, `.yml` and `.json` document in a directory, in name order.
pub fn load_tree_dir(dir: &Path) -> Result<Vec<TreeDefinition>, ConfigurationError> {
    let io_error = |e: std::io::Error| ConfigurationError::Io {
        path: dir.display().to_string(),
        message: e.to_string(),
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_tree = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "yaml" | "yml" | "json"));
        if path.is_file() && is_tree {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .iter()
        .map(|path| TreeSpec::from_file(path)?.compile())
        .collect()
}
