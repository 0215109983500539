//! Caller identity shared by voice calls and messages.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CallerId, Timestamp};

/// A phone number that has called or been called. Keyed by normalized number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    id: CallerId,
    phone_number: String,
    created_at: Timestamp,
}

impl Caller {
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            id: CallerId::new(),
            phone_number: phone_number.into(),
            created_at: Timestamp::now(),
        }
    }

    pub fn reconstitute(id: CallerId, phone_number: String, created_at: Timestamp) -> Self {
        Self {
            id,
            phone_number,
            created_at,
        }
    }

    pub fn id(&self) -> &CallerId {
        &self.id
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }
}
