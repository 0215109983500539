//! Transitions out of the greeting or a prompt.

use std::fmt;
use std::sync::Arc;

use super::errors::CallbackError;
use super::message::MessageSet;
use super::prompt::PromptHandle;
use crate::domain::flow::FlowContext;

/// Computes a transition from the live call.
pub type TransitionFn =
    Arc<dyn Fn(&FlowContext<'_>) -> Result<Transition, CallbackError> + Send + Sync>;

/// Where the call goes next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Prompt(PromptHandle),
    Hangup,
}

/// Messages to play followed by exactly one target.
#[derive(Debug, Clone)]
pub struct Transition {
    messages: MessageSet,
    target: Target,
}

impl Transition {
    pub fn goto(handle: impl Into<PromptHandle>) -> Self {
        Self {
            messages: MessageSet::new(),
            target: Target::Prompt(handle.into()),
        }
    }

    pub fn hangup() -> Self {
        Self {
            messages: MessageSet::new(),
            target: Target::Hangup,
        }
    }

    /// Replaces the messages played before the transition.
    pub fn with_message(mut self, messages: impl Into<MessageSet>) -> Self {
        self.messages = messages.into();
        self
    }

    pub fn messages(&self) -> &MessageSet {
        &self.messages
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn is_hangup(&self) -> bool {
        self.target == Target::Hangup
    }
}

/// A transition known at build time or computed per call.
#[derive(Clone)]
pub enum AfterRule {
    Static(Transition),
    Dynamic(TransitionFn),
}

impl AfterRule {
    pub fn goto(handle: impl Into<PromptHandle>) -> Self {
        AfterRule::Static(Transition::goto(handle))
    }

    pub fn hangup() -> Self {
        AfterRule::Static(Transition::hangup())
    }

    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&FlowContext<'_>) -> Result<Transition, CallbackError> + Send + Sync + 'static,
    {
        AfterRule::Dynamic(Arc::new(f))
    }

    /// Resolves the rule to a concrete transition.
    pub fn resolve(&self, ctx: &FlowContext<'_>) -> Result<Transition, CallbackError> {
        match self {
            AfterRule::Static(transition) => Ok(transition.clone()),
            AfterRule::Dynamic(f) => f(ctx),
        }
    }

    /// The static transition, if the rule has one.
    pub fn as_static(&self) -> Option<&Transition> {
        match self {
            AfterRule::Static(transition) => Some(transition),
            AfterRule::Dynamic(_) => None,
        }
    }
}

impl From<Transition> for AfterRule {
    fn from(transition: Transition) -> Self {
        AfterRule::Static(transition)
    }
}

impl fmt::Debug for AfterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AfterRule::Static(transition) => f.debug_tuple("Static").field(transition).finish(),
            AfterRule::Dynamic(_) => f.write_str("Dynamic(<fn>)"),
        }
    }
}
