//! Phone number normalization and validation port.

/// Decides which caller numbers a tree will talk to.
pub trait PhoneNumberPolicy: Send + Sync {
    /// Canonical form of `raw`, or `None` if it cannot be normalized.
    fn normalize(&self, raw: &str) -> Option<String>;

    /// True if `raw` normalizes to an acceptable number.
    fn is_valid(&self, raw: &str) -> bool {
        self.normalize(raw).is_some()
    }
}
