//! Messages spoken or played to the caller.
//!
//! A `MessageSet` is an ordered list of entries. Each entry is either a
//! static `Message` or a callable producing a further `MessageSet` at call
//! time. The shape of every value is decided when the tree is built; the
//! compiler never inspects types while a call is in progress.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::errors::{CallbackError, ConfigurationError};
use crate::domain::flow::FlowContext;

static PLAYABLE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://.+").expect("playable url regex is valid"));

/// Produces text (or a URL) from the live call.
pub type TextFn = Arc<dyn Fn(&FlowContext<'_>) -> Result<String, CallbackError> + Send + Sync>;

/// Produces a whole message set from the live call.
pub type MessageSetFn =
    Arc<dyn Fn(&FlowContext<'_>) -> Result<MessageSet, CallbackError> + Send + Sync>;

/// Text payload of a say or play message.
#[derive(Clone)]
pub enum Content {
    Static(String),
    Dynamic(TextFn),
}

impl Content {
    /// Resolves the payload against the current call.
    pub fn resolve(&self, ctx: &FlowContext<'_>) -> Result<String, CallbackError> {
        match self {
            Content::Static(value) => Ok(value.clone()),
            Content::Dynamic(f) => f(ctx),
        }
    }

    fn as_static(&self) -> Option<&str> {
        match self {
            Content::Static(value) => Some(value),
            Content::Dynamic(_) => None,
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Content::Dynamic(_) => f.write_str("Dynamic(<fn>)"),
        }
    }
}

/// A single audible instruction. Exactly one payload kind per message.
#[derive(Debug, Clone)]
pub enum Message {
    Say { text: Content, voice: Option<String> },
    Play { url: Content },
    Pause { seconds: u32 },
}

impl Message {
    pub fn say(text: impl Into<String>) -> Self {
        Message::Say {
            text: Content::Static(text.into()),
            voice: None,
        }
    }

    pub fn say_with_voice(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Message::Say {
            text: Content::Static(text.into()),
            voice: Some(voice.into()),
        }
    }

    pub fn say_dynamic<F>(f: F) -> Self
    where
        F: Fn(&FlowContext<'_>) -> Result<String, CallbackError> + Send + Sync + 'static,
    {
        Message::Say {
            text: Content::Dynamic(Arc::new(f)),
            voice: None,
        }
    }

    pub fn play(url: impl Into<String>) -> Self {
        Message::Play {
            url: Content::Static(url.into()),
        }
    }

    pub fn play_dynamic<F>(f: F) -> Self
    where
        F: Fn(&FlowContext<'_>) -> Result<String, CallbackError> + Send + Sync + 'static,
    {
        Message::Play {
            url: Content::Dynamic(Arc::new(f)),
        }
    }

    pub fn pause(seconds: u32) -> Self {
        Message::Pause { seconds }
    }

    /// Checks the static parts of the message.
    ///
    /// # Errors
    ///
    /// - `InvalidMessage` for blank say text, a non-http play URL, or a zero pause
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Message::Say { text, voice } => {
                if let Some(text) = text.as_static() {
                    if text.trim().is_empty() {
                        return Err(ConfigurationError::InvalidMessage(
                            "say text cannot be blank".to_string(),
                        ));
                    }
                }
                if matches!(voice, Some(v) if v.trim().is_empty()) {
                    return Err(ConfigurationError::InvalidMessage(
                        "voice cannot be blank".to_string(),
                    ));
                }
                Ok(())
            }
            Message::Play { url } => match url.as_static() {
                Some(url) if !PLAYABLE_URL.is_match(url) => Err(ConfigurationError::InvalidMessage(
                    format!("play url '{}' must start with http:// or https://", url),
                )),
                _ => Ok(()),
            },
            Message::Pause { seconds } => {
                if *seconds == 0 {
                    Err(ConfigurationError::InvalidMessage(
                        "pause must be at least one second".to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// One position in a `MessageSet`.
#[derive(Clone)]
pub enum MessageEntry {
    Static(Message),
    Dynamic(MessageSetFn),
}

impl fmt::Debug for MessageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageEntry::Static(message) => f.debug_tuple("Static").field(message).finish(),
            MessageEntry::Dynamic(_) => f.write_str("Dynamic(<fn>)"),
        }
    }
}

/// Ordered messages played before a gather or a transition.
#[derive(Debug, Clone, Default)]
pub struct MessageSet {
    entries: Vec<MessageEntry>,
}

impl MessageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set whose whole content is computed at call time.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&FlowContext<'_>) -> Result<MessageSet, CallbackError> + Send + Sync + 'static,
    {
        Self {
            entries: vec![MessageEntry::Dynamic(Arc::new(f))],
        }
    }

    /// Appends a message. Blank say text is dropped.
    pub fn push(&mut self, message: Message) {
        if let Message::Say {
            text: Content::Static(text),
            ..
        } = &message
        {
            if text.trim().is_empty() {
                return;
            }
        }
        self.entries.push(MessageEntry::Static(message));
    }

    pub fn with(mut self, message: Message) -> Self {
        self.push(message);
        self
    }

    /// Appends every entry of another set.
    pub fn extend(&mut self, other: MessageSet) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Validates every static message in the set.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.entries.iter().try_for_each(|entry| match entry {
            MessageEntry::Static(message) => message.validate(),
            MessageEntry::Dynamic(_) => Ok(()),
        })
    }
}

impl From<&str> for MessageSet {
    fn from(text: &str) -> Self {
        MessageSet::new().with(Message::say(text))
    }
}

impl From<String> for MessageSet {
    fn from(text: String) -> Self {
        MessageSet::new().with(Message::say(text))
    }
}

impl From<Message> for MessageSet {
    fn from(message: Message) -> Self {
        MessageSet::new().with(message)
    }
}

impl From<Vec<Message>> for MessageSet {
    fn from(messages: Vec<Message>) -> Self {
        let mut set = MessageSet::new();
        for message in messages {
            set.push(message);
        }
        set
    }
}

impl From<Vec<&str>> for MessageSet {
    fn from(lines: Vec<&str>) -> Self {
        lines.into_iter().map(Message::say).collect::<Vec<_>>().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_produce_no_entries() {
        assert!(MessageSet::from("   ").is_empty());
        assert_eq!(MessageSet::from(vec!["Hello", "", "there"]).len(), 2);
    }

    #[test]
    fn play_requires_http_url() {
        assert!(Message::play("https://example.com/a.mp3").validate().is_ok());
        assert!(Message::play("http://example.com/a.mp3").validate().is_ok());
        assert!(matches!(
            Message::play("ftp://example.com/a.mp3").validate(),
            Err(ConfigurationError::InvalidMessage(_))
        ));
    }

    #[test]
    fn pause_must_be_positive() {
        assert!(Message::pause(1).validate().is_ok());
        assert!(Message::pause(0).validate().is_err());
    }

    #[test]
    fn say_rejects_blank_voice() {
        assert!(Message::say_with_voice("Hi", " ").validate().is_err());
        assert!(Message::say_with_voice("Hi", "Polly.Joanna").validate().is_ok());
    }

    #[test]
    fn dynamic_entries_are_not_validated_at_build_time() {
        let set = MessageSet::new()
            .with(Message::play_dynamic(|_| Ok("not a url".to_string())))
            .with(Message::say_dynamic(|_| Ok(String::new())));
        assert!(set.validate().is_ok());
    }

    #[test]
    fn set_validation_reports_first_bad_message() {
        let set = MessageSet::from(vec![Message::say("ok"), Message::pause(0)]);
        assert!(set.validate().is_err());
    }
}
