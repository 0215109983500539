//! What a caller did on one tree across all of their calls.

use super::turn::ResponseTurn;
use crate::domain::tree::PromptHandle;

/// A caller's turns and call counts on one tree, loaded before a step runs.
///
/// `turns` spans every call the caller made or received on the tree,
/// the current one included, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerHistory {
    inbound_calls: usize,
    outbound_calls: usize,
    turns: Vec<ResponseTurn>,
}

impl CallerHistory {
    pub fn new(inbound_calls: usize, outbound_calls: usize, turns: Vec<ResponseTurn>) -> Self {
        Self {
            inbound_calls,
            outbound_calls,
            turns,
        }
    }

    pub fn inbound_calls(&self) -> usize {
        self.inbound_calls
    }

    pub fn outbound_calls(&self) -> usize {
        self.outbound_calls
    }

    pub fn turns(&self) -> &[ResponseTurn] {
        &self.turns
    }

    /// Turns on `handle`, oldest first.
    pub fn turns_for<'a>(
        &'a self,
        handle: &PromptHandle,
    ) -> impl DoubleEndedIterator<Item = &'a ResponseTurn> + 'a {
        let handle = handle.clone();
        self.turns.iter().filter(move |t| t.prompt_handle() == &handle)
    }
}
