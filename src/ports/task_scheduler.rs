//! Delayed job ports.
//!
//! Side effects that must not block a webhook response are handed to a
//! `TaskScheduler`, which later hands them to a `JobExecutor`. Delivery is
//! at-least-once, so every job must tolerate running twice.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::call::CallError;
use crate::domain::foundation::{CallSessionId, DomainError, RecordingId};

/// Work deferred past the webhook response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "job", content = "id", rename_all = "snake_case")]
pub enum ScheduledJob {
    /// Run the tree's unanswered callback.
    UnansweredCall(CallSessionId),
    /// Run the tree's finished callback.
    FinishedCall(CallSessionId),
    /// Download recording audio and store it.
    AttachRecording(RecordingId),
}

impl ScheduledJob {
    pub fn name(&self) -> &'static str {
        match self {
            ScheduledJob::UnansweredCall(_) => "unanswered_call",
            ScheduledJob::FinishedCall(_) => "finished_call",
            ScheduledJob::AttachRecording(_) => "attach_recording",
        }
    }
}

impl fmt::Display for ScheduledJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduledJob::UnansweredCall(id) | ScheduledJob::FinishedCall(id) => {
                write!(f, "{}({})", self.name(), id)
            }
            ScheduledJob::AttachRecording(id) => write!(f, "{}({})", self.name(), id),
        }
    }
}

/// Runs `job` no sooner than `delay` from now.
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    /// Enqueue a job. Must return without waiting for the job.
    async fn schedule(&self, job: ScheduledJob, delay: Duration) -> Result<(), DomainError>;
}

/// Performs a scheduled job.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: ScheduledJob) -> Result<(), CallError>;
}
