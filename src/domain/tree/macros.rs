//! Shortcuts for common tree fragments.

use super::errors::ConfigurationError;
use super::gather::{DigitsGather, GatherSpec};
use super::message::Message;
use crate::domain::call::ResponseTurn;

/// Largest menu a single keypad digit can address.
pub const MAX_NUMBERED_CHOICES: usize = 9;

const DEFAULT_INTERRUPTIBLE_TIMEOUT: u32 = 6;

/// Formats a keypad menu, e.g. "For sales, press 1. For support, press 2."
///
/// `prefix` defaults to "For".
pub fn numbered_choices(choices: &[&str], prefix: Option<&str>) -> Result<String, ConfigurationError> {
    check_choice_count(choices.len())?;
    let prefix = prefix.unwrap_or("For");
    Ok(choices
        .iter()
        .enumerate()
        .map(|(i, choice)| format!("{} {}, press {}.", prefix, choice, i + 1))
        .collect::<Vec<_>>()
        .join(" "))
}

/// True when the turn's digits pick one of `choice_count` numbered choices.
pub fn numbered_choice_selected(
    choice_count: usize,
    turn: &ResponseTurn,
) -> Result<bool, ConfigurationError> {
    check_choice_count(choice_count)?;
    Ok(matches!(turn.integer_digits(), Some(n) if n > 0 && n as usize <= choice_count))
}

fn check_choice_count(count: usize) -> Result<(), ConfigurationError> {
    if count == 0 {
        return Err(ConfigurationError::InvalidMacroArgument(
            "numbered choices cannot be empty".to_string(),
        ));
    }
    if count > MAX_NUMBERED_CHOICES {
        return Err(ConfigurationError::InvalidMacroArgument(format!(
            "numbered choices cannot be more than {}",
            MAX_NUMBERED_CHOICES
        )));
    }
    Ok(())
}

/// Separates digits with commas so they are read one at a time: "1, 2, 3".
pub fn spell_digits(number: &str) -> String {
    number
        .trim()
        .chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single-digit gather that interrupts the prompt's messages.
///
/// A zero timeout falls back to six seconds.
pub fn interruptible_digits(timeout: Option<u32>) -> GatherSpec {
    let timeout = match timeout {
        Some(t) if t >= 1 => t,
        _ => DEFAULT_INTERRUPTIBLE_TIMEOUT,
    };
    GatherSpec::Digits(DigitsGather {
        timeout,
        number: 1,
        interrupt: true,
        finish_on_key: Some(String::new()),
    })
}

/// Silence between segments of speech, one second by default.
pub fn pause(seconds: Option<u32>) -> Message {
    Message::pause(seconds.filter(|s| *s > 0).unwrap_or(1))
}
