//! Scheduler that records jobs instead of running them.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::{ScheduledJob, TaskScheduler};

/// Captures scheduled jobs for assertions. Jobs are run only when a test
/// drains them explicitly.
#[derive(Default)]
pub struct RecordingTaskScheduler {
    scheduled: Mutex<Vec<(ScheduledJob, Duration)>>,
}

impl RecordingTaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn scheduled(&self) -> Vec<(ScheduledJob, Duration)> {
        self.scheduled.lock().await.clone()
    }

    pub async fn jobs(&self) -> Vec<ScheduledJob> {
        self.scheduled
            .lock()
            .await
            .iter()
            .map(|(job, _)| *job)
            .collect()
    }

    /// Removes and returns every captured job.
    pub async fn drain(&self) -> Vec<ScheduledJob> {
        self.scheduled
            .lock()
            .await
            .drain(..)
            .map(|(job, _)| job)
            .collect()
    }
}

#[async_trait]
impl TaskScheduler for RecordingTaskScheduler {
    async fn schedule(&self, job: ScheduledJob, delay: Duration) -> Result<(), DomainError> {
        self.scheduled.lock().await.push((job, delay));
        Ok(())
    }
}
