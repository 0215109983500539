//! Shared fixtures for the phone handler tests.

use std::sync::Arc;

use crate::adapters::memory::{InMemoryCallStore, InMemoryRecordingStorage, RecordingTaskScheduler};
use crate::adapters::phone_number::NorthAmericaPolicy;
use crate::adapters::twilio::MockTelephonyProvider;
use crate::domain::call::{CallSession, WebhookParams};
use crate::domain::tree::{GatherSpec, PromptNode, Transition, TreeDefinition, TreeRegistry};
use crate::ports::{
    CallSessionRepository, CallerRepository, PhoneNumberPolicy, RecordingRepository,
    RecordingStorage, TaskScheduler, TelephonyProvider, TurnRepository,
};

use super::TelephonySettings;

pub(crate) const CALLER: &str = "+16135550000";

/// Two-prompt tree: pick a digit, then thank the caller and hang up.
pub(crate) fn favourite_tree() -> TreeDefinition {
    TreeDefinition::builder("favourite")
        .greeting(Transition::goto("pick").with_message("Welcome."))
        .invalid_phone_number("Sorry, we only take calls from North America.")
        .final_timeout_message("Sorry we have lost you.")
        .prompt(
            PromptNode::new("pick", "Pick a number", Transition::goto("thanks"))
                .with_gather(GatherSpec::digits(1, 10)),
        )
        .prompt(PromptNode::new("thanks", "Thanks!", Transition::hangup()))
        .build()
        .unwrap()
}

pub(crate) struct Harness {
    pub store: Arc<InMemoryCallStore>,
    pub scheduler: Arc<RecordingTaskScheduler>,
    pub provider: MockTelephonyProvider,
    pub storage: Arc<InMemoryRecordingStorage>,
    pub registry: TreeRegistry,
    pub settings: TelephonySettings,
}

impl Harness {
    pub fn new(trees: Vec<TreeDefinition>) -> Self {
        let mut builder = TreeRegistry::builder();
        builder.register_all(trees).unwrap();
        Self {
            store: Arc::new(InMemoryCallStore::new()),
            scheduler: Arc::new(RecordingTaskScheduler::new()),
            provider: MockTelephonyProvider::new(),
            storage: Arc::new(InMemoryRecordingStorage::new()),
            registry: builder.build(),
            settings: TelephonySettings {
                public_host: "https://ivr.example.com".to_string(),
                default_outgoing_number: "+16135559999".to_string(),
                attach_recordings: true,
            },
        }
    }

    pub fn sessions(&self) -> Arc<dyn CallSessionRepository> {
        self.store.clone()
    }

    pub fn turns(&self) -> Arc<dyn TurnRepository> {
        self.store.clone()
    }

    pub fn recordings(&self) -> Arc<dyn RecordingRepository> {
        self.store.clone()
    }

    pub fn callers(&self) -> Arc<dyn CallerRepository> {
        self.store.clone()
    }

    pub fn scheduler(&self) -> Arc<dyn TaskScheduler> {
        self.scheduler.clone()
    }

    pub fn provider(&self) -> Arc<dyn TelephonyProvider> {
        Arc::new(self.provider.clone())
    }

    pub fn storage(&self) -> Arc<dyn RecordingStorage> {
        self.storage.clone()
    }

    pub fn policy(&self) -> Arc<dyn PhoneNumberPolicy> {
        Arc::new(NorthAmericaPolicy::new())
    }

    pub async fn session(&self, sid: &str) -> CallSession {
        self.store.find_by_sid(sid).await.unwrap().unwrap()
    }
}

/// Fields of an inbound webhook for `sid` from `from`.
pub(crate) fn inbound_params(sid: &str, from: &str) -> WebhookParams {
    WebhookParams::default()
        .with("AccountSid", "AC123")
        .with("CallSid", sid)
        .with("From", from)
        .with("To", "+16135551234")
        .with("FromCity", "Ottawa")
        .with("FromState", "ON")
        .with("CallStatus", "ringing")
        .with("Direction", "inbound")
}

pub(crate) fn call_params(sid: &str) -> WebhookParams {
    WebhookParams::default()
        .with("AccountSid", "AC123")
        .with("CallSid", sid)
}
