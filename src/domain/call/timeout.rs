//! Consecutive-timeout detection for a single prompt.

use super::turn::ResponseTurn;

/// Decides when repeated silence on one prompt should end the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    attempts: usize,
}

impl TimeoutPolicy {
    pub fn new(attempts: usize) -> Self {
        Self { attempts }
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// `recent` holds turns for one (session, prompt) pair, most recent first.
    ///
    /// Exhausted iff the window holds exactly `attempts` turns and all timed
    /// out. Turns on other prompts never reach this window, so they neither
    /// count nor reset the streak.
    pub fn is_exhausted<'a, I>(&self, recent: I) -> bool
    where
        I: IntoIterator<Item = &'a ResponseTurn>,
    {
        let window: Vec<&ResponseTurn> = recent.into_iter().take(self.attempts).collect();
        self.attempts > 0 && window.len() == self.attempts && window.iter().all(|t| t.is_timeout())
    }
}
