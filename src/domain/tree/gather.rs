//! Input collection directives attached to a prompt.

use serde::{Deserialize, Serialize};

use super::errors::ConfigurationError;

/// How a prompt collects input. Each kind carries its own defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GatherSpec {
    Digits(DigitsGather),
    Voice(VoiceGather),
    Speech(SpeechGather),
}

/// Keypad collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitsGather {
    pub timeout: u32,
    pub number: u32,
    pub finish_on_key: Option<String>,
    pub interrupt: bool,
}

impl Default for DigitsGather {
    fn default() -> Self {
        Self {
            timeout: 5,
            number: 1,
            finish_on_key: None,
            interrupt: false,
        }
    }
}

/// Recording of the caller's voice, optionally transcribed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceGather {
    pub length: u32,
    pub timeout: Option<u32>,
    pub beep: bool,
    pub transcribe: bool,
    pub profanity_filter: bool,
}

impl Default for VoiceGather {
    fn default() -> Self {
        Self {
            length: 10,
            timeout: None,
            beep: true,
            transcribe: false,
            profanity_filter: false,
        }
    }
}

/// Speech recognition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechGather {
    pub language: String,
    pub timeout: Option<u32>,
    pub speech_timeout: Option<String>,
    pub speech_model: Option<String>,
    pub enhanced: bool,
    pub profanity_filter: bool,
}

impl Default for SpeechGather {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            timeout: None,
            speech_timeout: None,
            speech_model: None,
            enhanced: false,
            profanity_filter: false,
        }
    }
}

impl GatherSpec {
    /// Digits gather with the given count and timeout.
    pub fn digits(number: u32, timeout: u32) -> Self {
        GatherSpec::Digits(DigitsGather {
            number,
            timeout,
            ..DigitsGather::default()
        })
    }

    /// Voice gather recording at most `length` seconds.
    pub fn voice(length: u32) -> Self {
        GatherSpec::Voice(VoiceGather {
            length,
            ..VoiceGather::default()
        })
    }

    /// Speech gather in the given language.
    pub fn speech(language: impl Into<String>) -> Self {
        GatherSpec::Speech(SpeechGather {
            language: language.into(),
            ..SpeechGather::default()
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatherSpec::Digits(_) => "digits",
            GatherSpec::Voice(_) => "voice",
            GatherSpec::Speech(_) => "speech",
        }
    }

    /// Only digit gathers can interrupt the messages that precede them.
    pub fn interrupt(&self) -> bool {
        matches!(self, GatherSpec::Digits(d) if d.interrupt)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            GatherSpec::Digits(d) => {
                if d.number == 0 {
                    return Err(ConfigurationError::InvalidGather(
                        "digits number must be at least 1".to_string(),
                    ));
                }
                if d.timeout == 0 {
                    return Err(ConfigurationError::InvalidGather(
                        "digits timeout must be at least 1".to_string(),
                    ));
                }
                Ok(())
            }
            GatherSpec::Voice(v) => {
                if v.length == 0 {
                    return Err(ConfigurationError::InvalidGather(
                        "voice length must be at least 1".to_string(),
                    ));
                }
                Ok(())
            }
            GatherSpec::Speech(s) => {
                if s.language.trim().is_empty() {
                    return Err(ConfigurationError::InvalidGather(
                        "speech language cannot be blank".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_defaults() {
        let d = DigitsGather::default();
        assert_eq!(d.timeout, 5);
        assert_eq!(d.number, 1);
        assert!(!d.interrupt);
        assert!(d.finish_on_key.is_none());
    }

    #[test]
    fn voice_and_speech_defaults() {
        let v = VoiceGather::default();
        assert_eq!(v.length, 10);
        assert!(v.beep);
        assert!(!v.transcribe);
        assert_eq!(SpeechGather::default().language, "en-US");
    }

    #[test]
    fn only_digits_can_interrupt() {
        let digits = GatherSpec::Digits(DigitsGather {
            interrupt: true,
            ..DigitsGather::default()
        });
        assert!(digits.interrupt());
        assert!(!GatherSpec::voice(5).interrupt());
        assert!(!GatherSpec::speech("en-CA").interrupt());
    }

    #[test]
    fn deserializes_tagged_shape_with_defaults() {
        let gather: GatherSpec = serde_yaml::from_str("type: digits\ntimeout: 10").unwrap();
        assert_eq!(gather, GatherSpec::digits(1, 10));

        let gather: GatherSpec = serde_yaml::from_str("type: voice\ntranscribe: true").unwrap();
        match gather {
            GatherSpec::Voice(v) => {
                assert!(v.transcribe);
                assert_eq!(v.length, 10);
            }
            other => panic!("expected voice gather, got {:?}", other),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(serde_yaml::from_str::<GatherSpec>("type: telepathy").is_err());
    }

    #[test]
    fn validate_rejects_zero_values() {
        assert!(GatherSpec::digits(0, 5).validate().is_err());
        assert!(GatherSpec::digits(1, 0).validate().is_err());
        assert!(GatherSpec::voice(0).validate().is_err());
        assert!(GatherSpec::speech("").validate().is_err());
        assert!(GatherSpec::digits(4, 5).validate().is_ok());
    }
}
