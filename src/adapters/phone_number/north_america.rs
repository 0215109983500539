//! North American phone number policy.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ports::PhoneNumberPolicy;

static NORTH_AMERICAN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+1[0-9]{10}$").expect("north american number regex is valid"));

static NON_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9]").expect("non digit regex is valid"));

static SEGMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+1([0-9]{3})([0-9]{3})([0-9]{4})$").expect("number segments regex is valid")
});

/// Accepts only ten digit North American numbers, formatted `+1XXXXXXXXXX`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NorthAmericaPolicy;

impl NorthAmericaPolicy {
    pub fn new() -> Self {
        Self
    }

    /// `(613) 555 0000` style, or the raw input if it cannot be normalized.
    pub fn display(&self, raw: &str) -> String {
        self.normalize(raw)
            .and_then(|number| {
                SEGMENTS
                    .captures(&number)
                    .map(|c| format!("({}) {} {}", &c[1], &c[2], &c[3]))
            })
            .unwrap_or_else(|| raw.to_string())
    }
}

impl PhoneNumberPolicy for NorthAmericaPolicy {
    fn normalize(&self, raw: &str) -> Option<String> {
        let digits = NON_DIGIT.replace_all(raw.trim(), "");
        if digits.is_empty() {
            return None;
        }
        let number = if digits.starts_with('1') {
            format!("+{}", digits)
        } else {
            format!("+1{}", digits)
        };
        NORTH_AMERICAN_NUMBER.is_match(&number).then_some(number)
    }
}
