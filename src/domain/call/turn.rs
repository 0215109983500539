//! Response turns: one visit to a prompt within a call.
//!
//! A turn is created the moment a prompt is entered, before any input
//! exists, and is filled in later by the input or timeout webhook. After
//! that only a recording attachment may change it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::params::WebhookParams;
use crate::domain::foundation::{CallSessionId, RecordingId, Timestamp, TurnId};
use crate::domain::tree::PromptHandle;

/// Default words that make a transcription count as "yes".
pub const YES_ANSWERS: &[&str] = &["yes", "accept", "ya", "yeah", "true", "ok", "okay"];

/// Default words that make a transcription count as "no".
pub const NO_ANSWERS: &[&str] = &[
    "no", "naw", "nah", "reject", "decline", "negative", "not", "false",
];

static ONLY_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("digits regex is valid"));
static ONLY_POUND_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[#*]+$").expect("pound star regex is valid"));

/// Input captured from one webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnInput {
    pub digits: Option<String>,
    pub transcription: Option<String>,
}

impl TurnInput {
    /// Reads digits, a completed asynchronous transcription, or a speech result.
    ///
    /// A speech result wins over a transcription when both are present.
    pub fn from_params(params: &WebhookParams) -> Self {
        let transcription_completed = params.get("TranscriptionStatus") == Some("completed");
        let transcription = params
            .owned("SpeechResult")
            .or_else(|| {
                transcription_completed
                    .then(|| params.owned("TranscriptionText"))
                    .flatten()
            });

        Self {
            digits: params.owned("Digits"),
            transcription,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_none() && self.transcription.is_none()
    }
}

/// Words a tree treats as yes or no when matching transcriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerVocabulary {
    pub yes: Vec<String>,
    pub no: Vec<String>,
}

impl AnswerVocabulary {
    pub fn new(yes: Vec<String>, no: Vec<String>) -> Self {
        Self { yes, no }
    }
}

impl Default for AnswerVocabulary {
    fn default() -> Self {
        Self {
            yes: YES_ANSWERS.iter().map(|w| w.to_string()).collect(),
            no: NO_ANSWERS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// A write to a stored turn that touches only the columns it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnChange {
    /// Fill digits and transcription that are still empty.
    Input(TurnInput),
    /// Set the timeout flag.
    TimedOut,
}

/// One visit to a prompt and whatever the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTurn {
    id: TurnId,
    session_id: CallSessionId,
    prompt_handle: PromptHandle,
    digits: Option<String>,
    transcription: Option<String>,
    transcribed: bool,
    timeout: bool,
    recording_id: Option<RecordingId>,
    created_at: Timestamp,
}

impl ResponseTurn {
    /// Creates an unfilled turn for a prompt that is about to be played.
    pub fn new(session_id: CallSessionId, prompt_handle: PromptHandle) -> Self {
        Self {
            id: TurnId::new(),
            session_id,
            prompt_handle,
            digits: None,
            transcription: None,
            transcribed: false,
            timeout: false,
            recording_id: None,
            created_at: Timestamp::now(),
        }
    }

    /// Reconstitute a turn from persistence.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: TurnId,
        session_id: CallSessionId,
        prompt_handle: PromptHandle,
        digits: Option<String>,
        transcription: Option<String>,
        transcribed: bool,
        timeout: bool,
        recording_id: Option<RecordingId>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            session_id,
            prompt_handle,
            digits,
            transcription,
            transcribed,
            timeout,
            recording_id,
            created_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &TurnId {
        &self.id
    }

    pub fn session_id(&self) -> &CallSessionId {
        &self.session_id
    }

    pub fn prompt_handle(&self) -> &PromptHandle {
        &self.prompt_handle
    }

    pub fn digits(&self) -> Option<&str> {
        self.digits.as_deref()
    }

    pub fn transcription(&self) -> Option<&str> {
        self.transcription.as_deref()
    }

    pub fn is_transcribed(&self) -> bool {
        self.transcribed
    }

    pub fn is_timeout(&self) -> bool {
        self.timeout
    }

    pub fn recording_id(&self) -> Option<&RecordingId> {
        self.recording_id.as_ref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Fills input fields that are still empty. Returns true if anything changed.
    ///
    /// Stored digits and transcriptions are never replaced.
    pub fn merge_input(&mut self, input: &TurnInput) -> bool {
        let mut changed = false;
        if self.digits.is_none() {
            if let Some(digits) = &input.digits {
                self.digits = Some(digits.clone());
                changed = true;
            }
        }
        if self.transcription.is_none() {
            if let Some(text) = &input.transcription {
                self.transcription = Some(text.clone());
                self.transcribed = true;
                changed = true;
            }
        }
        changed
    }

    /// Sets the timeout flag. Returns false if it was already set.
    pub fn mark_timed_out(&mut self) -> bool {
        !std::mem::replace(&mut self.timeout, true)
    }

    pub fn attach_recording(&mut self, recording_id: RecordingId) {
        self.recording_id = Some(recording_id);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Digits or a transcription are stored.
    pub fn has_input(&self) -> bool {
        self.digits.is_some() || self.transcription.is_some()
    }

    /// Input or a timeout is stored. A settled turn is final apart from its
    /// recording.
    pub fn is_settled(&self) -> bool {
        self.has_input() || self.timeout
    }

    /// The part of `input` this turn still takes.
    ///
    /// Everything while unsettled. Once settled, only the first
    /// transcription of an attached recording.
    pub fn acceptable_input(&self, input: &TurnInput) -> TurnInput {
        if !self.is_settled() {
            return input.clone();
        }
        let transcribes_recording = self.recording_id.is_some() && self.transcription.is_none();
        TurnInput {
            digits: None,
            transcription: input
                .transcription
                .clone()
                .filter(|_| transcribes_recording),
        }
    }

    /// Digits as a number, if they are all 0-9.
    pub fn integer_digits(&self) -> Option<u64> {
        self.digits
            .as_deref()
            .filter(|d| ONLY_DIGITS.is_match(d))
            .and_then(|d| d.parse().ok())
    }

    /// True when only `#` and `*` were pressed.
    pub fn pound_star(&self) -> bool {
        self.digits
            .as_deref()
            .is_some_and(|d| ONLY_POUND_STAR.is_match(d))
    }

    /// Case-insensitive substring match of the transcription against any pattern.
    pub fn transcription_matches(&self, patterns: &[&str]) -> bool {
        let Some(text) = self.transcription.as_deref() else {
            return false;
        };
        let text = text.to_lowercase();
        patterns
            .iter()
            .any(|p| !p.is_empty() && text.contains(&p.to_lowercase()))
    }

    /// Regex match of the transcription.
    pub fn transcription_matches_regex(&self, pattern: &Regex) -> bool {
        self.transcription
            .as_deref()
            .is_some_and(|t| pattern.is_match(t))
    }

    pub fn answer_yes(&self, answers: &AnswerVocabulary) -> bool {
        self.transcription_matches_any(&answers.yes)
    }

    pub fn answer_no(&self, answers: &AnswerVocabulary) -> bool {
        self.transcription_matches_any(&answers.no)
    }

    fn transcription_matches_any(&self, words: &[String]) -> bool {
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        self.transcription_matches(&words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn() -> ResponseTurn {
        ResponseTurn::new(CallSessionId::new(), PromptHandle::from("menu"))
    }

    fn with_digits(digits: &str) -> ResponseTurn {
        let mut t = turn();
        t.merge_input(&TurnInput {
            digits: Some(digits.to_string()),
            transcription: None,
        });
        t
    }

    fn with_transcription(text: &str) -> ResponseTurn {
        let mut t = turn();
        t.merge_input(&TurnInput {
            digits: None,
            transcription: Some(text.to_string()),
        });
        t
    }

    #[test]
    fn new_turn_is_unfilled() {
        let t = turn();
        assert!(t.digits().is_none());
        assert!(t.transcription().is_none());
        assert!(!t.is_timeout());
        assert!(!t.is_transcribed());
        assert!(t.recording_id().is_none());
    }

    #[test]
    fn input_from_params_reads_digits() {
        let params = WebhookParams::default().with("Digits", "42");
        let input = TurnInput::from_params(&params);
        assert_eq!(input.digits.as_deref(), Some("42"));
        assert!(input.transcription.is_none());
    }

    #[test]
    fn transcription_requires_completed_status() {
        let pending = WebhookParams::default()
            .with("TranscriptionText", "hello")
            .with("TranscriptionStatus", "in-progress");
        assert!(TurnInput::from_params(&pending).transcription.is_none());

        let done = WebhookParams::default()
            .with("TranscriptionText", "hello")
            .with("TranscriptionStatus", "completed");
        assert_eq!(
            TurnInput::from_params(&done).transcription.as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn speech_result_sets_transcription() {
        let params = WebhookParams::default().with("SpeechResult", "seven");
        let mut t = turn();
        assert!(t.merge_input(&TurnInput::from_params(&params)));
        assert_eq!(t.transcription(), Some("seven"));
        assert!(t.is_transcribed());
    }

    #[test]
    fn merging_same_input_twice_reports_no_change() {
        let input = TurnInput {
            digits: Some("1".into()),
            transcription: None,
        };
        let mut t = turn();
        assert!(t.merge_input(&input));
        assert!(!t.merge_input(&input));
        assert!(!t.merge_input(&TurnInput::default()));
    }

    #[test]
    fn integer_digits_only_for_numeric_input() {
        assert_eq!(with_digits("123").integer_digits(), Some(123));
        assert_eq!(with_digits("12#").integer_digits(), None);
        assert_eq!(turn().integer_digits(), None);
    }

    #[test]
    fn pound_star_detection() {
        assert!(with_digits("#").pound_star());
        assert!(with_digits("*#*").pound_star());
        assert!(!with_digits("1#").pound_star());
        assert!(!turn().pound_star());
    }

    #[test]
    fn transcription_matching_is_case_insensitive() {
        let t = with_transcription("Yeah I think SO");
        assert!(t.transcription_matches(&["so"]));
        assert!(!t.transcription_matches(&["maybe"]));
        assert!(!t.transcription_matches(&[]));
        assert!(!turn().transcription_matches(&["so"]));
    }

    #[test]
    fn transcription_matches_regex() {
        let re = Regex::new(r"\b[0-9]+\b").unwrap();
        assert!(with_transcription("it is 7").transcription_matches_regex(&re));
        assert!(!with_transcription("seven").transcription_matches_regex(&re));
    }

    #[test]
    fn yes_and_no_answers() {
        let answers = AnswerVocabulary::default();
        assert!(with_transcription("Okay sure").answer_yes(&answers));
        assert!(with_transcription("nah").answer_no(&answers));
        assert!(!with_transcription("purple").answer_yes(&answers));
        assert!(!with_transcription("purple").answer_no(&answers));
    }

    #[test]
    fn custom_vocabulary_replaces_defaults() {
        let answers = AnswerVocabulary::new(vec!["oui".into()], vec!["non".into()]);
        assert!(with_transcription("Oui merci").answer_yes(&answers));
        assert!(with_transcription("non").answer_no(&answers));
        assert!(!with_transcription("yes").answer_yes(&answers));
    }

    #[test]
    fn stored_digits_are_never_replaced() {
        let mut t = with_digits("7");
        let changed = t.merge_input(&TurnInput {
            digits: Some("8".into()),
            transcription: None,
        });
        assert!(!changed);
        assert_eq!(t.digits(), Some("7"));
    }

    #[test]
    fn settled_turn_accepts_nothing_new() {
        let input = TurnInput {
            digits: Some("8".into()),
            transcription: Some("eight".into()),
        };

        assert_eq!(turn().acceptable_input(&input), input);
        assert!(with_digits("7").acceptable_input(&input).is_empty());

        let mut timed_out = turn();
        timed_out.mark_timed_out();
        assert!(timed_out.is_settled());
        assert!(timed_out.acceptable_input(&input).is_empty());
    }

    #[test]
    fn recorded_turn_still_takes_its_first_transcription() {
        let mut t = with_digits("hangup");
        t.attach_recording(RecordingId::new());
        let input = TurnInput {
            digits: Some("1".into()),
            transcription: Some("call me back".into()),
        };

        let accepted = t.acceptable_input(&input);
        assert_eq!(accepted.digits, None);
        assert_eq!(accepted.transcription.as_deref(), Some("call me back"));

        t.merge_input(&accepted);
        assert!(t.acceptable_input(&input).is_empty());
    }

    #[test]
    fn mark_timed_out_reports_first_change_only() {
        let mut t = turn();
        assert!(t.mark_timed_out());
        assert!(!t.mark_timed_out());
        assert!(t.is_timeout());
    }

    #[test]
    fn attach_recording_sets_reference() {
        let mut t = turn();
        let recording = RecordingId::new();
        t.attach_recording(recording);
        assert_eq!(t.recording_id(), Some(&recording));
    }
}
