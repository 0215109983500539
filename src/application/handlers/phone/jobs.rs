//! PhoneJobExecutor - Dispatches deferred jobs to their handlers.

use std::sync::Arc;

use async_trait::async_trait;

use super::attach_recording::{AttachRecordingCommand, AttachRecordingHandler};
use super::finished_call::{FinishedCallCommand, FinishedCallHandler};
use super::unanswered_call::{UnansweredCallCommand, UnansweredCallHandler};
use crate::domain::call::CallError;
use crate::domain::tree::TreeRegistry;
use crate::ports::{
    CallSessionRepository, JobExecutor, RecordingRepository, RecordingStorage, ScheduledJob,
    TelephonyProvider,
};

pub struct PhoneJobExecutor {
    unanswered: UnansweredCallHandler,
    finished: FinishedCallHandler,
    attach: AttachRecordingHandler,
}

impl PhoneJobExecutor {
    pub fn new(
        registry: TreeRegistry,
        sessions: Arc<dyn CallSessionRepository>,
        recordings: Arc<dyn RecordingRepository>,
        provider: Arc<dyn TelephonyProvider>,
        storage: Arc<dyn RecordingStorage>,
    ) -> Self {
        Self {
            unanswered: UnansweredCallHandler::new(registry.clone(), sessions.clone()),
            finished: FinishedCallHandler::new(registry, sessions),
            attach: AttachRecordingHandler::new(recordings, provider, storage),
        }
    }
}

#[async_trait]
impl JobExecutor for PhoneJobExecutor {
    async fn execute(&self, job: ScheduledJob) -> Result<(), CallError> {
        match job {
            ScheduledJob::UnansweredCall(session_id) => {
                self.unanswered
                    .handle(UnansweredCallCommand { session_id })
                    .await
            }
            ScheduledJob::FinishedCall(session_id) => {
                self.finished.handle(FinishedCallCommand { session_id }).await
            }
            ScheduledJob::AttachRecording(recording_id) => {
                self.attach
                    .handle(AttachRecordingCommand { recording_id })
                    .await
            }
        }
    }
}
