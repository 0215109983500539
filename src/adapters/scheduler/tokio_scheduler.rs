//! Delayed job runner on the tokio runtime.
//!
//! Each job gets its own task that sleeps for the delay and then hands the
//! job to the executor. Failures are retried with a fixed backoff so a job
//! runs at least once unless every attempt fails or the process exits.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{JobExecutor, ScheduledJob, TaskScheduler};

/// Retry settings for failed jobs.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(30),
        }
    }
}

/// In-process scheduler.
///
/// The executor is bound after construction because the job handlers
/// themselves need a scheduler.
pub struct TokioTaskScheduler {
    executor: OnceLock<Arc<dyn JobExecutor>>,
    retry: RetryPolicy,
}

impl TokioTaskScheduler {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            executor: OnceLock::new(),
            retry,
        }
    }

    /// Binds the executor. Returns false if one was already bound.
    pub fn bind(&self, executor: Arc<dyn JobExecutor>) -> bool {
        self.executor.set(executor).is_ok()
    }
}

impl Default for TokioTaskScheduler {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

async fn run_job(executor: Arc<dyn JobExecutor>, job: ScheduledJob, delay: Duration, retry: RetryPolicy) {
    tokio::time::sleep(delay).await;

    for attempt in 1..=retry.max_attempts {
        match executor.execute(job).await {
            Ok(()) => {
                info!(job = %job, attempt, "Job completed");
                return;
            }
            Err(e) if attempt < retry.max_attempts => {
                warn!(job = %job, attempt, error = %e, "Job failed, retrying");
                tokio::time::sleep(retry.backoff).await;
            }
            Err(e) => {
                error!(job = %job, attempt, error = %e, "Job failed, giving up");
            }
        }
    }
}

#[async_trait]
impl TaskScheduler for TokioTaskScheduler {
    async fn schedule(&self, job: ScheduledJob, delay: Duration) -> Result<(), DomainError> {
        let executor = self.executor.get().cloned().ok_or_else(|| {
            DomainError::new(ErrorCode::SchedulerError, "No job executor bound")
        })?;

        info!(job = %job, delay_secs = delay.as_secs(), "Job scheduled");
        tokio::spawn(run_job(executor, job, delay, self.retry));
        Ok(())
    }
}
