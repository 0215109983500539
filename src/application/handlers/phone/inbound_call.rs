//! InboundCallHandler - First webhook of a call the caller placed.

use std::sync::Arc;

use tracing::{info, warn};

use super::find_or_create_caller::{FindOrCreateCallerCommand, FindOrCreateCallerHandler};
use super::support::{greet, lookup_tree};
use super::update_call::UpdateCallHandler;
use crate::domain::call::{
    CallDetails, CallError, CallSession, Direction, StatusUpdate, WebhookParams,
};
use crate::domain::flow::{StepOutcome, VoiceResponse};
use crate::domain::foundation::ErrorCode;
use crate::domain::tree::TreeRegistry;
use crate::ports::{
    CallSessionRepository, CallerRepository, PhoneNumberPolicy, TaskScheduler, TurnRepository,
};

#[derive(Debug, Clone)]
pub struct InboundCallCommand {
    pub tree_name: String,
    pub params: WebhookParams,
}

#[derive(Debug, Clone)]
pub struct InboundCallResult {
    pub session: CallSession,
    pub response: VoiceResponse,
    pub outcome: StepOutcome,
}

/// Creates the session for a new inbound call and plays the greeting.
///
/// A redelivered inbound webhook finds the existing session by `CallSid`
/// and greets again rather than creating a second session.
pub struct InboundCallHandler {
    registry: TreeRegistry,
    sessions: Arc<dyn CallSessionRepository>,
    turns: Arc<dyn TurnRepository>,
    policy: Arc<dyn PhoneNumberPolicy>,
    callers: FindOrCreateCallerHandler,
    update_call: UpdateCallHandler,
}

impl InboundCallHandler {
    pub fn new(
        registry: TreeRegistry,
        sessions: Arc<dyn CallSessionRepository>,
        turns: Arc<dyn TurnRepository>,
        callers: Arc<dyn CallerRepository>,
        scheduler: Arc<dyn TaskScheduler>,
        policy: Arc<dyn PhoneNumberPolicy>,
    ) -> Self {
        Self {
            registry,
            callers: FindOrCreateCallerHandler::new(callers, policy.clone()),
            update_call: UpdateCallHandler::new(sessions.clone(), scheduler),
            sessions,
            turns,
            policy,
        }
    }

    pub async fn handle(&self, cmd: InboundCallCommand) -> Result<InboundCallResult, CallError> {
        let tree = lookup_tree(&self.registry, &cmd.tree_name)?;
        let sid = cmd
            .params
            .call_sid()
            .ok_or_else(|| CallError::validation("CallSid", "is required"))?;

        let session = match self.sessions.find_by_sid(sid).await? {
            Some(existing) => {
                warn!(call_sid = sid, "Inbound call webhook redelivered");
                self.update_call
                    .apply(existing, &StatusUpdate::from_params(&cmd.params))
                    .await?
            }
            None => self.create_session(sid, tree.name(), &cmd.params).await?,
        };

        let (session, step) = greet(
            self.sessions.as_ref(),
            self.turns.as_ref(),
            self.policy.as_ref(),
            &tree,
            session,
        )
        .await?;

        Ok(InboundCallResult {
            session,
            response: step.response,
            outcome: step.outcome,
        })
    }

    async fn create_session(
        &self,
        sid: &str,
        tree_name: &str,
        params: &WebhookParams,
    ) -> Result<CallSession, CallError> {
        let details = CallDetails::from_params(params);
        let caller = self
            .callers
            .handle(FindOrCreateCallerCommand {
                phone_number: details.from_number.clone(),
            })
            .await?;

        let session = CallSession::new(
            sid,
            Direction::from_param(params.get("Direction")),
            tree_name,
            *caller.id(),
            details,
        )?
        .with_status(StatusUpdate::from_params(params).call_status);

        match self.sessions.save(&session).await {
            Ok(()) => {
                info!(
                    call_sid = sid,
                    tree = tree_name,
                    location = ?session.details().location(),
                    "Inbound call started"
                );
                Ok(session)
            }
            // A concurrent delivery of the same webhook won
            Err(err) if err.code == ErrorCode::DuplicateRecord => self
                .sessions
                .find_by_sid(sid)
                .await?
                .ok_or_else(|| CallError::call_not_found(sid)),
            Err(err) => Err(err.into()),
        }
    }
}
