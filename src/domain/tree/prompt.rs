//! Prompt nodes and their handles.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::after::AfterRule;
use super::gather::GatherSpec;
use super::message::MessageSet;

/// Name of a prompt, unique within its tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptHandle(String);

impl PromptHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for PromptHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PromptHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&PromptHandle> for PromptHandle {
    fn from(h: &PromptHandle) -> Self {
        h.clone()
    }
}

impl fmt::Display for PromptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One node of a tree: messages, an optional gather, and where to go next.
#[derive(Debug, Clone)]
pub struct PromptNode {
    handle: PromptHandle,
    messages: MessageSet,
    gather: Option<GatherSpec>,
    after: AfterRule,
}

impl PromptNode {
    pub fn new(
        handle: impl Into<PromptHandle>,
        messages: impl Into<MessageSet>,
        after: impl Into<AfterRule>,
    ) -> Self {
        Self {
            handle: handle.into(),
            messages: messages.into(),
            gather: None,
            after: after.into(),
        }
    }

    pub fn with_gather(mut self, gather: GatherSpec) -> Self {
        self.gather = Some(gather);
        self
    }

    pub fn handle(&self) -> &PromptHandle {
        &self.handle
    }

    pub fn messages(&self) -> &MessageSet {
        &self.messages
    }

    pub fn gather(&self) -> Option<&GatherSpec> {
        self.gather.as_ref()
    }

    pub fn after(&self) -> &AfterRule {
        &self.after
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tree::Transition;

    #[test]
    fn builds_node_without_gather() {
        let node = PromptNode::new("thanks", "Thank you.", Transition::hangup());
        assert_eq!(node.handle().as_str(), "thanks");
        assert!(node.gather().is_none());
        assert_eq!(node.messages().len(), 1);
    }

    #[test]
    fn with_gather_attaches_spec() {
        let node = PromptNode::new("pick", "Pick a number", AfterRule::hangup())
            .with_gather(GatherSpec::digits(1, 10));
        assert_eq!(node.gather().map(|g| g.kind()), Some("digits"));
    }

    #[test]
    fn blank_handle_is_detected() {
        assert!(PromptHandle::from("  ").is_blank());
        assert!(!PromptHandle::from("menu").is_blank());
    }
}
