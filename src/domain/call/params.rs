//! Opaque webhook field map.

use std::collections::HashMap;

/// Fields posted by the provider. Blank values read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookParams(HashMap<String, String>);

impl WebhookParams {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self(fields)
    }

    /// Returns the value for `key` unless it is missing or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Returns the first present value among `keys`.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn owned(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn account_sid(&self) -> Option<&str> {
        self.get("AccountSid")
    }

    pub fn call_sid(&self) -> Option<&str> {
        self.get("CallSid")
    }
}

impl From<HashMap<String, String>> for WebhookParams {
    fn from(fields: HashMap<String, String>) -> Self {
        Self(fields)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for WebhookParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_absent() {
        let params: WebhookParams = [("Digits", "  "), ("CallSid", "CA123")].into_iter().collect();
        assert_eq!(params.get("Digits"), None);
        assert_eq!(params.call_sid(), Some("CA123"));
        assert!(!params.contains("Missing"));
    }

    #[test]
    fn first_of_skips_blank_candidates() {
        let params = WebhookParams::default()
            .with("Called", "")
            .with("To", "+16135550000");
        assert_eq!(params.first_of(&["Called", "To"]), Some("+16135550000"));
        assert_eq!(params.first_of(&["Nope"]), None);
    }
}
