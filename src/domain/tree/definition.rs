//! Compiled, immutable phone tree.
//!
//! A `TreeDefinition` is produced once by `TreeBuilder::build` and never
//! mutated afterwards. Building validates every static value: message
//! payloads, gather parameters, and goto targets known at build time.
//! Targets produced by dynamic after rules can only be checked when the
//! call reaches them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::after::{AfterRule, Target, Transition};
use super::errors::{CallbackError, ConfigurationError};
use super::message::MessageSet;
use super::prompt::{PromptHandle, PromptNode};
use crate::domain::call::{AnswerVocabulary, CallSession};

/// Asynchronous hook run after a call is classified as unanswered or finished.
pub type LifecycleCallback =
    Arc<dyn Fn(CallSession) -> BoxFuture<'static, Result<(), CallbackError>> + Send + Sync>;

/// Default voice for say messages.
pub const DEFAULT_VOICE: &str = "male";

/// Default message played when the caller stops responding.
pub const DEFAULT_FINAL_TIMEOUT_MESSAGE: &str = "Goodbye.";

/// Default number of consecutive timeouts on one prompt before hanging up.
pub const DEFAULT_FINAL_TIMEOUT_ATTEMPTS: usize = 3;

/// Tree-wide settings.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub voice: String,
    pub final_timeout_message: MessageSet,
    pub final_timeout_attempts: usize,
    pub invalid_phone_number: Option<MessageSet>,
    pub answers: AnswerVocabulary,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            voice: DEFAULT_VOICE.to_string(),
            final_timeout_message: MessageSet::from(DEFAULT_FINAL_TIMEOUT_MESSAGE),
            final_timeout_attempts: DEFAULT_FINAL_TIMEOUT_ATTEMPTS,
            invalid_phone_number: None,
            answers: AnswerVocabulary::default(),
        }
    }
}

/// Immutable call flow: greeting, prompts, config and lifecycle hooks.
#[derive(Clone)]
pub struct TreeDefinition {
    name: String,
    config: TreeConfig,
    greeting: AfterRule,
    prompts: HashMap<PromptHandle, PromptNode>,
    unanswered_call: Option<LifecycleCallback>,
    finished_call: Option<LifecycleCallback>,
}

impl TreeDefinition {
    pub fn builder(name: impl Into<String>) -> TreeBuilder {
        TreeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn greeting(&self) -> &AfterRule {
        &self.greeting
    }

    pub fn prompt(&self, handle: &PromptHandle) -> Option<&PromptNode> {
        self.prompts.get(handle)
    }

    pub fn prompts(&self) -> impl Iterator<Item = &PromptNode> {
        self.prompts.values()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }

    pub fn unanswered_call(&self) -> Option<&LifecycleCallback> {
        self.unanswered_call.as_ref()
    }

    pub fn finished_call(&self) -> Option<&LifecycleCallback> {
        self.finished_call.as_ref()
    }
}

impl fmt::Debug for TreeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handles: Vec<&str> = self.prompts.keys().map(|h| h.as_str()).collect();
        handles.sort_unstable();
        f.debug_struct("TreeDefinition")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("greeting", &self.greeting)
            .field("prompts", &handles)
            .field("unanswered_call", &self.unanswered_call.is_some())
            .field("finished_call", &self.finished_call.is_some())
            .finish()
    }
}

/// Accumulates a tree declaration, then validates it in one step.
pub struct TreeBuilder {
    name: String,
    config: TreeConfig,
    greeting: Option<AfterRule>,
    prompts: Vec<PromptNode>,
    unanswered_call: Option<LifecycleCallback>,
    finished_call: Option<LifecycleCallback>,
}

impl TreeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: TreeConfig::default(),
            greeting: None,
            prompts: Vec::new(),
            unanswered_call: None,
            finished_call: None,
        }
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.config.voice = voice.into();
        self
    }

    pub fn final_timeout_message(mut self, messages: impl Into<MessageSet>) -> Self {
        self.config.final_timeout_message = messages.into();
        self
    }

    pub fn final_timeout_attempts(mut self, attempts: usize) -> Self {
        self.config.final_timeout_attempts = attempts;
        self
    }

    pub fn invalid_phone_number(mut self, messages: impl Into<MessageSet>) -> Self {
        self.config.invalid_phone_number = Some(messages.into());
        self
    }

    /// Words matched by `answer_yes` / `answer_no` on this tree.
    pub fn answers(mut self, answers: AnswerVocabulary) -> Self {
        self.config.answers = answers;
        self
    }

    pub fn greeting(mut self, after: impl Into<AfterRule>) -> Self {
        self.greeting = Some(after.into());
        self
    }

    pub fn prompt(mut self, node: PromptNode) -> Self {
        self.prompts.push(node);
        self
    }

    pub fn on_unanswered<F>(mut self, f: F) -> Self
    where
        F: Fn(CallSession) -> BoxFuture<'static, Result<(), CallbackError>> + Send + Sync + 'static,
    {
        self.unanswered_call = Some(Arc::new(f));
        self
    }

    pub fn on_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(CallSession) -> BoxFuture<'static, Result<(), CallbackError>> + Send + Sync + 'static,
    {
        self.finished_call = Some(Arc::new(f));
        self
    }

    /// Validates the declaration and freezes it.
    ///
    /// # Errors
    ///
    /// - `EmptyTreeName` / `InvalidTreeName` if the name is not URL safe
    /// - `MissingGreeting` if no greeting was declared
    /// - `DuplicatePrompt` / `EmptyPromptHandle` for bad prompt handles
    /// - `UnknownPrompt` if a static goto names a prompt that does not exist
    /// - `InvalidMessage` / `InvalidGather` / `InvalidConfig` for bad values
    pub fn build(self) -> Result<TreeDefinition, ConfigurationError> {
        validate_tree_name(&self.name)?;

        let greeting = self
            .greeting
            .ok_or_else(|| ConfigurationError::MissingGreeting(self.name.clone()))?;

        if self.config.final_timeout_attempts == 0 {
            return Err(ConfigurationError::InvalidConfig(
                "final_timeout_attempts must be at least 1".to_string(),
            ));
        }
        if self.config.voice.trim().is_empty() {
            return Err(ConfigurationError::InvalidConfig(
                "voice cannot be blank".to_string(),
            ));
        }
        let answers = &self.config.answers;
        if answers.yes.iter().chain(&answers.no).any(|w| w.trim().is_empty()) {
            return Err(ConfigurationError::InvalidConfig(
                "answer words cannot be blank".to_string(),
            ));
        }
        self.config.final_timeout_message.validate()?;
        if let Some(invalid) = &self.config.invalid_phone_number {
            invalid.validate()?;
        }

        let mut prompts = HashMap::with_capacity(self.prompts.len());
        for node in self.prompts {
            if node.handle().is_blank() {
                return Err(ConfigurationError::EmptyPromptHandle {
                    tree: self.name.clone(),
                });
            }
            node.messages().validate()?;
            if let Some(gather) = node.gather() {
                gather.validate()?;
            }
            if let Some(previous) = prompts.insert(node.handle().clone(), node) {
                return Err(ConfigurationError::DuplicatePrompt {
                    tree: self.name.clone(),
                    handle: previous.handle().to_string(),
                });
            }
        }

        check_transition(&self.name, "greeting", &greeting, &prompts)?;
        for node in prompts.values() {
            let source = format!("prompt '{}'", node.handle());
            check_transition(&self.name, &source, node.after(), &prompts)?;
        }

        Ok(TreeDefinition {
            name: self.name,
            config: self.config,
            greeting,
            prompts,
            unanswered_call: self.unanswered_call,
            finished_call: self.finished_call,
        })
    }
}

fn validate_tree_name(name: &str) -> Result<(), ConfigurationError> {
    if name.is_empty() {
        return Err(ConfigurationError::EmptyTreeName);
    }
    let url_safe = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !url_safe {
        return Err(ConfigurationError::InvalidTreeName(name.to_string()));
    }
    Ok(())
}

fn check_transition(
    tree: &str,
    source: &str,
    rule: &AfterRule,
    prompts: &HashMap<PromptHandle, PromptNode>,
) -> Result<(), ConfigurationError> {
    let Some(transition) = rule.as_static() else {
        return Ok(());
    };
    transition.messages().validate()?;
    check_target(tree, source, transition, prompts)
}

fn check_target(
    tree: &str,
    source: &str,
    transition: &Transition,
    prompts: &HashMap<PromptHandle, PromptNode>,
) -> Result<(), ConfigurationError> {
    match transition.target() {
        Target::Hangup => Ok(()),
        Target::Prompt(handle) if prompts.contains_key(handle) => Ok(()),
        Target::Prompt(handle) => Err(ConfigurationError::unknown_prompt(
            tree,
            source,
            handle.as_str(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tree::{GatherSpec, Message};

    fn menu() -> PromptNode {
        PromptNode::new("menu", "Pick a number", Transition::hangup())
            .with_gather(GatherSpec::digits(1, 10))
    }

    #[test]
    fn builds_minimal_tree_with_defaults() {
        let tree = TreeDefinition::builder("survey")
            .greeting(Transition::goto("menu"))
            .prompt(menu())
            .build()
            .unwrap();

        assert_eq!(tree.name(), "survey");
        assert_eq!(tree.config().voice, "male");
        assert_eq!(tree.config().final_timeout_attempts, 3);
        assert!(tree.config().invalid_phone_number.is_none());
        assert!(tree.prompt(&PromptHandle::from("menu")).is_some());
        assert_eq!(tree.prompt_count(), 1);
    }

    #[test]
    fn rejects_duplicate_prompt() {
        let result = TreeDefinition::builder("survey")
            .greeting(Transition::goto("menu"))
            .prompt(menu())
            .prompt(menu())
            .build();

        assert!(matches!(
            result,
            Err(ConfigurationError::DuplicatePrompt { handle, .. }) if handle == "menu"
        ));
    }

    #[test]
    fn rejects_missing_greeting() {
        let result = TreeDefinition::builder("survey").prompt(menu()).build();
        assert!(matches!(result, Err(ConfigurationError::MissingGreeting(_))));
    }

    #[test]
    fn rejects_unsafe_names() {
        for name in ["", "Survey", "my tree", "a/b"] {
            let result = TreeDefinition::builder(name)
                .greeting(Transition::hangup())
                .build();
            assert!(result.is_err(), "name {:?} should be rejected", name);
        }
        assert!(TreeDefinition::builder("tone-rating_2")
            .greeting(Transition::hangup())
            .build()
            .is_ok());
    }

    #[test]
    fn rejects_static_goto_to_unknown_prompt() {
        let result = TreeDefinition::builder("survey")
            .greeting(Transition::goto("menu"))
            .prompt(PromptNode::new("menu", "Hi", Transition::goto("nowhere")))
            .build();

        assert!(matches!(
            result,
            Err(ConfigurationError::UnknownPrompt { handle, .. }) if handle == "nowhere"
        ));
    }

    #[test]
    fn dynamic_goto_is_not_checked_at_build_time() {
        let result = TreeDefinition::builder("survey")
            .greeting(AfterRule::dynamic(|_| Ok(Transition::goto("nowhere"))))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_blank_answer_words() {
        let result = TreeDefinition::builder("answers")
            .answers(AnswerVocabulary::new(vec!["yes".into(), " ".into()], vec![]))
            .greeting(Transition::hangup())
            .build();
        assert!(matches!(result, Err(ConfigurationError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_timeout_attempts() {
        let result = TreeDefinition::builder("survey")
            .greeting(Transition::hangup())
            .final_timeout_attempts(0)
            .build();
        assert!(matches!(result, Err(ConfigurationError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_invalid_static_messages() {
        let result = TreeDefinition::builder("survey")
            .greeting(Transition::hangup().with_message(Message::play("not-a-url")))
            .build();
        assert!(matches!(result, Err(ConfigurationError::InvalidMessage(_))));
    }

    #[test]
    fn stores_lifecycle_callbacks() {
        let tree = TreeDefinition::builder("survey")
            .greeting(Transition::hangup())
            .on_finished(|_session| Box::pin(async { Ok(()) }))
            .build()
            .unwrap();
        assert!(tree.finished_call().is_some());
        assert!(tree.unanswered_call().is_none());
    }
}
