//! FindOrCreateCallerHandler - Resolves a phone number to a caller identity.

use std::sync::Arc;

use tracing::debug;

use crate::domain::call::{CallError, Caller};
use crate::domain::foundation::ErrorCode;
use crate::ports::{CallerRepository, PhoneNumberPolicy};

#[derive(Debug, Clone)]
pub struct FindOrCreateCallerCommand {
    pub phone_number: String,
}

/// Finds the caller for a number, creating one on first contact.
///
/// Numbers are normalized first. A number the policy rejects is kept as
/// received so foreign callers still get an identity.
pub struct FindOrCreateCallerHandler {
    callers: Arc<dyn CallerRepository>,
    policy: Arc<dyn PhoneNumberPolicy>,
}

impl FindOrCreateCallerHandler {
    pub fn new(callers: Arc<dyn CallerRepository>, policy: Arc<dyn PhoneNumberPolicy>) -> Self {
        Self { callers, policy }
    }

    pub async fn handle(&self, cmd: FindOrCreateCallerCommand) -> Result<Caller, CallError> {
        let raw = cmd.phone_number.trim();
        if raw.is_empty() {
            return Err(CallError::validation("phone_number", "cannot be empty"));
        }
        let number = self
            .policy
            .normalize(raw)
            .unwrap_or_else(|| raw.to_string());

        if let Some(existing) = self.callers.find_by_number(&number).await? {
            return Ok(existing);
        }

        let caller = Caller::new(number);
        match self.callers.save(&caller).await {
            Ok(()) => {
                debug!(caller_id = %caller.id(), "Created caller");
                Ok(caller)
            }
            // Another webhook created it first
            Err(err) if err.code == ErrorCode::DuplicateRecord => self
                .callers
                .find_by_number(caller.phone_number())
                .await?
                .ok_or_else(|| CallError::infrastructure(err.to_string())),
            Err(err) => Err(err.into()),
        }
    }
}
