//! Read-only view handed to dynamic tree values.

use once_cell::sync::Lazy;

use crate::domain::call::{AnswerVocabulary, CallSession, CallerHistory, ResponseTurn};
use crate::domain::tree::PromptHandle;

static DEFAULT_ANSWERS: Lazy<AnswerVocabulary> = Lazy::new(AnswerVocabulary::default);

/// The call as seen by a dynamic message or after rule.
///
/// `turn` is the turn being played or answered. It is `None` while the
/// greeting is evaluated because no prompt has been entered yet.
///
/// `history` is the caller's record on this tree across calls. Without one
/// the caller-history queries answer as if the caller were new.
#[derive(Debug, Clone, Copy)]
pub struct FlowContext<'a> {
    session: &'a CallSession,
    turn: Option<&'a ResponseTurn>,
    history: Option<&'a CallerHistory>,
    answers: &'a AnswerVocabulary,
}

impl<'a> FlowContext<'a> {
    pub fn new(session: &'a CallSession, turn: Option<&'a ResponseTurn>) -> Self {
        Self {
            session,
            turn,
            history: None,
            answers: &*DEFAULT_ANSWERS,
        }
    }

    pub fn with_history(mut self, history: Option<&'a CallerHistory>) -> Self {
        self.history = history;
        self
    }

    pub fn with_answers(mut self, answers: &'a AnswerVocabulary) -> Self {
        self.answers = answers;
        self
    }

    pub fn session(&self) -> &'a CallSession {
        self.session
    }

    pub fn turn(&self) -> Option<&'a ResponseTurn> {
        self.turn
    }

    /// Digits on the current turn.
    pub fn digits(&self) -> Option<&'a str> {
        self.turn.and_then(|t| t.digits())
    }

    /// Transcription on the current turn.
    pub fn transcription(&self) -> Option<&'a str> {
        self.turn.and_then(|t| t.transcription())
    }

    /// The current turn's transcription contains one of the tree's yes words.
    pub fn answer_yes(&self) -> bool {
        self.turn.is_some_and(|t| t.answer_yes(self.answers))
    }

    /// The current turn's transcription contains one of the tree's no words.
    pub fn answer_no(&self) -> bool {
        self.turn.is_some_and(|t| t.answer_no(self.answers))
    }

    /// The most recent answered turn on another prompt of this call.
    pub fn completed_turn_for(&self, handle: &str) -> Option<&'a ResponseTurn> {
        self.session.completed_turn_for(&PromptHandle::from(handle))
    }

    pub fn first_turn_for(&self, handle: &str) -> Option<&'a ResponseTurn> {
        self.session.first_turn_for(&PromptHandle::from(handle))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Caller history
    // ─────────────────────────────────────────────────────────────────────────

    /// Inbound calls the caller has made on this tree, this one included.
    pub fn call_count(&self) -> usize {
        self.history.map_or(0, CallerHistory::inbound_calls)
    }

    pub fn outbound_call_count(&self) -> usize {
        self.history.map_or(0, CallerHistory::outbound_calls)
    }

    /// The caller's most recent turn on `handle` in any call on this tree.
    pub fn response_for(&self, handle: &str) -> Option<&'a ResponseTurn> {
        let handle = PromptHandle::from(handle);
        self.caller_turns(&handle).into_iter().last()
    }

    /// The caller has reached `handle` in some call on this tree.
    pub fn response_reached(&self, handle: &str) -> bool {
        self.response_for(handle).is_some()
    }

    /// Numeric digits of the caller's latest turn on `handle` that did not time out.
    pub fn response_digits(&self, handle: &str) -> Option<u64> {
        let handle = PromptHandle::from(handle);
        self.caller_turns(&handle)
            .into_iter()
            .rev()
            .find(|t| !t.is_timeout())
            .and_then(ResponseTurn::integer_digits)
    }

    /// The current turn is the caller's first on its prompt in any call.
    pub fn first_for_caller(&self, include_timeouts: bool) -> bool {
        let Some(turn) = self.turn else {
            return false;
        };
        self.caller_turns(turn.prompt_handle())
            .into_iter()
            .find(|t| include_timeouts || !t.is_timeout())
            .is_some_and(|first| first.id() == turn.id())
    }

    /// History turns on `handle`, oldest first, with the stored copy of the
    /// current turn swapped for the in-flight one.
    fn caller_turns(&self, handle: &PromptHandle) -> Vec<&'a ResponseTurn> {
        let Some(history) = self.history else {
            return self
                .turn
                .filter(|t| t.prompt_handle() == handle)
                .into_iter()
                .collect();
        };
        history
            .turns_for(handle)
            .map(|t| match self.turn {
                Some(current) if current.id() == t.id() => current,
                _ => t,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::{CallDetails, Direction, TurnInput};
    use crate::domain::foundation::CallerId;

    fn session(sid: &str) -> CallSession {
        CallSession::new(
            sid,
            Direction::Inbound,
            "survey",
            CallerId::new(),
            CallDetails::default(),
        )
        .unwrap()
    }

    fn answered(session: &CallSession, handle: &str, digits: &str) -> ResponseTurn {
        let mut turn = ResponseTurn::new(*session.id(), PromptHandle::from(handle));
        turn.merge_input(&TurnInput {
            digits: Some(digits.into()),
            transcription: None,
        });
        turn
    }

    #[test]
    fn earlier_call_answers_are_visible() {
        let earlier = session("CA1");
        let current = session("CA2");
        let history = CallerHistory::new(
            2,
            1,
            vec![answered(&earlier, "menu", "4"), answered(&earlier, "age", "30")],
        );
        let ctx = FlowContext::new(&current, None).with_history(Some(&history));

        assert_eq!(ctx.call_count(), 2);
        assert_eq!(ctx.outbound_call_count(), 1);
        assert!(ctx.response_reached("menu"));
        assert!(!ctx.response_reached("goodbye"));
        assert_eq!(ctx.response_digits("age"), Some(30));
    }

    #[test]
    fn response_digits_skip_timeouts() {
        let earlier = session("CA1");
        let mut quiet = ResponseTurn::new(*earlier.id(), PromptHandle::from("menu"));
        quiet.mark_timed_out();
        let history = CallerHistory::new(1, 0, vec![answered(&earlier, "menu", "2"), quiet]);
        let ctx = FlowContext::new(&earlier, None).with_history(Some(&history));

        assert!(ctx.response_for("menu").unwrap().is_timeout());
        assert_eq!(ctx.response_digits("menu"), Some(2));
    }

    #[test]
    fn in_flight_turn_replaces_its_stored_copy() {
        let current = session("CA2");
        let stored = ResponseTurn::new(*current.id(), PromptHandle::from("menu"));
        let mut answering = stored.clone();
        answering.merge_input(&TurnInput {
            digits: Some("9".into()),
            transcription: None,
        });
        let history = CallerHistory::new(1, 0, vec![stored]);
        let ctx = FlowContext::new(&current, Some(&answering)).with_history(Some(&history));

        assert_eq!(ctx.response_digits("menu"), Some(9));
        assert!(ctx.first_for_caller(true));
    }

    #[test]
    fn first_for_caller_is_false_after_an_earlier_call() {
        let earlier = session("CA1");
        let current = session("CA2");
        let turn = answered(&current, "menu", "1");
        let history = CallerHistory::new(2, 0, vec![answered(&earlier, "menu", "3"), turn.clone()]);
        let ctx = FlowContext::new(&current, Some(&turn)).with_history(Some(&history));

        assert!(!ctx.first_for_caller(true));
    }

    #[test]
    fn without_history_the_caller_looks_new() {
        let current = session("CA1");
        let ctx = FlowContext::new(&current, None);

        assert_eq!(ctx.call_count(), 0);
        assert!(!ctx.response_reached("menu"));
        assert!(!ctx.first_for_caller(true));
    }

    #[test]
    fn answers_follow_the_configured_vocabulary() {
        let current = session("CA1");
        let mut turn = ResponseTurn::new(*current.id(), PromptHandle::from("confirm"));
        turn.merge_input(&TurnInput {
            digits: None,
            transcription: Some("oui".into()),
        });
        let answers = AnswerVocabulary::new(vec!["oui".into()], vec!["non".into()]);

        assert!(!FlowContext::new(&current, Some(&turn)).answer_yes());
        assert!(FlowContext::new(&current, Some(&turn))
            .with_answers(&answers)
            .answer_yes());
    }
}
