//! Caller identity repository port.

use async_trait::async_trait;

use crate::domain::call::Caller;
use crate::domain::foundation::DomainError;

/// Callers are shared by voice calls and text messages, keyed by number.
#[async_trait]
pub trait CallerRepository: Send + Sync {
    async fn find_by_number(&self, phone_number: &str) -> Result<Option<Caller>, DomainError>;

    /// # Errors
    ///
    /// - `DuplicateRecord` if the number is already registered
    async fn save(&self, caller: &Caller) -> Result<(), DomainError>;
}
