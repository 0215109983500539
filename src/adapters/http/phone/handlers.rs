//! HTTP handlers for the phone webhooks.
//!
//! These handlers connect Axum routes to the phone command handlers. Every
//! request is checked against the configured provider account before any
//! work happens.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Form, Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::application::handlers::phone::{
    InboundCallCommand, InboundCallHandler, OutboundCallCommand, OutboundCallHandler,
    PromptCommand, PromptHandler, PromptResponseCommand, PromptResponseHandler,
    ReceiveRecordingCommand, ReceiveRecordingHandler, TelephonySettings, TimeoutCommand,
    TimeoutHandler, TranscribeCommand, TranscribeHandler, UpdateCallCommand, UpdateCallHandler,
};
use crate::domain::call::{CallError, WebhookParams};
use crate::domain::foundation::TurnId;
use crate::domain::tree::TreeRegistry;
use crate::ports::{
    CallSessionRepository, CallerRepository, PhoneNumberPolicy, RecordingRepository,
    TaskScheduler, TurnRepository,
};

use super::dto::{ErrorResponse, VoiceXml};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the phone routes.
///
/// Cloned per request; handlers are built on demand from the shared ports.
#[derive(Clone)]
pub struct PhoneAppState {
    pub registry: TreeRegistry,
    pub sessions: Arc<dyn CallSessionRepository>,
    pub turns: Arc<dyn TurnRepository>,
    pub recordings: Arc<dyn RecordingRepository>,
    pub callers: Arc<dyn CallerRepository>,
    pub scheduler: Arc<dyn TaskScheduler>,
    pub policy: Arc<dyn PhoneNumberPolicy>,
    pub settings: TelephonySettings,
    /// Provider account every webhook must carry as `AccountSid`.
    pub account_sid: Arc<str>,
}

impl PhoneAppState {
    pub fn inbound_call_handler(&self) -> InboundCallHandler {
        InboundCallHandler::new(
            self.registry.clone(),
            self.sessions.clone(),
            self.turns.clone(),
            self.callers.clone(),
            self.scheduler.clone(),
            self.policy.clone(),
        )
    }

    pub fn outbound_call_handler(&self) -> OutboundCallHandler {
        OutboundCallHandler::new(
            self.registry.clone(),
            self.sessions.clone(),
            self.turns.clone(),
            self.scheduler.clone(),
            self.policy.clone(),
        )
    }

    pub fn prompt_handler(&self) -> PromptHandler {
        PromptHandler::new(
            self.registry.clone(),
            self.sessions.clone(),
            self.turns.clone(),
            self.scheduler.clone(),
        )
    }

    pub fn prompt_response_handler(&self) -> PromptResponseHandler {
        PromptResponseHandler::new(
            self.registry.clone(),
            self.sessions.clone(),
            self.turns.clone(),
            self.recordings.clone(),
            self.scheduler.clone(),
            self.settings.clone(),
        )
    }

    pub fn timeout_handler(&self) -> TimeoutHandler {
        TimeoutHandler::new(
            self.registry.clone(),
            self.sessions.clone(),
            self.turns.clone(),
            self.scheduler.clone(),
        )
    }

    pub fn update_call_handler(&self) -> UpdateCallHandler {
        UpdateCallHandler::new(self.sessions.clone(), self.scheduler.clone())
    }

    pub fn receive_recording_handler(&self) -> ReceiveRecordingHandler {
        ReceiveRecordingHandler::new(
            self.sessions.clone(),
            self.turns.clone(),
            self.recordings.clone(),
            self.scheduler.clone(),
            self.settings.clone(),
        )
    }

    pub fn transcribe_handler(&self) -> TranscribeHandler {
        TranscribeHandler::new(
            self.sessions.clone(),
            self.turns.clone(),
            self.recordings.clone(),
            self.scheduler.clone(),
            self.settings.clone(),
        )
    }

    /// Wraps the posted fields, rejecting requests for another account.
    fn authorize(&self, fields: HashMap<String, String>) -> Result<WebhookParams, PhoneApiError> {
        let params = WebhookParams::from(fields);
        let presented = params.account_sid().unwrap_or_default();
        if bool::from(self.account_sid.as_bytes().ct_eq(presented.as_bytes())) {
            Ok(params)
        } else {
            warn!(
                call_sid = ?params.call_sid(),
                "Webhook rejected: account id mismatch"
            );
            Err(PhoneApiError::AccountMismatch)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Call flow webhooks
// ════════════════════════════════════════════════════════════════════════════════

/// /phone/:tree/inbound - New inbound call
pub async fn inbound_call(
    State(state): State<PhoneAppState>,
    Path(tree): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<VoiceXml, PhoneApiError> {
    let params = state.authorize(fields)?;
    info!(tree = %tree, call_sid = ?params.call_sid(), "Inbound call webhook");

    let result = state
        .inbound_call_handler()
        .handle(InboundCallCommand {
            tree_name: tree,
            params,
        })
        .await?;
    Ok(VoiceXml(result.response))
}

/// /phone/:tree/outbound - Outbound call answered
pub async fn outbound_call(
    State(state): State<PhoneAppState>,
    Path(tree): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<VoiceXml, PhoneApiError> {
    let params = state.authorize(fields)?;
    info!(tree = %tree, call_sid = ?params.call_sid(), "Outbound call webhook");

    let result = state
        .outbound_call_handler()
        .handle(OutboundCallCommand {
            tree_name: tree,
            params,
        })
        .await?;
    Ok(VoiceXml(result.response))
}

/// /phone/:tree/prompt/:turn - Play a prompt
pub async fn prompt(
    State(state): State<PhoneAppState>,
    Path((tree, turn_id)): Path<(String, TurnId)>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<VoiceXml, PhoneApiError> {
    let params = state.authorize(fields)?;

    let result = state
        .prompt_handler()
        .handle(PromptCommand {
            tree_name: tree,
            turn_id,
            params,
        })
        .await?;
    Ok(VoiceXml(result.response))
}

/// /phone/:tree/prompt_response/:turn - Caller answered a prompt
pub async fn prompt_response(
    State(state): State<PhoneAppState>,
    Path((tree, turn_id)): Path<(String, TurnId)>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<VoiceXml, PhoneApiError> {
    let params = state.authorize(fields)?;

    let result = state
        .prompt_response_handler()
        .handle(PromptResponseCommand {
            tree_name: tree,
            turn_id,
            params,
        })
        .await?;
    Ok(VoiceXml(result.response))
}

/// /phone/:tree/timeout/:turn - Caller gave no input
pub async fn timeout(
    State(state): State<PhoneAppState>,
    Path((tree, turn_id)): Path<(String, TurnId)>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<VoiceXml, PhoneApiError> {
    let params = state.authorize(fields)?;

    let result = state
        .timeout_handler()
        .handle(TimeoutCommand {
            tree_name: tree,
            turn_id,
            params,
        })
        .await?;
    Ok(VoiceXml(result.response))
}

// ════════════════════════════════════════════════════════════════════════════════
// Asynchronous callbacks
// ════════════════════════════════════════════════════════════════════════════════

/// /phone/status - Call status changed
pub async fn call_status(
    State(state): State<PhoneAppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<VoiceXml, PhoneApiError> {
    let params = state.authorize(fields)?;

    state
        .update_call_handler()
        .handle(UpdateCallCommand { params })
        .await?;
    Ok(VoiceXml::empty())
}

/// /phone/receive_recording/:turn - Recording is available
pub async fn receive_recording(
    State(state): State<PhoneAppState>,
    Path(turn_id): Path<TurnId>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<VoiceXml, PhoneApiError> {
    let params = state.authorize(fields)?;

    state
        .receive_recording_handler()
        .handle(ReceiveRecordingCommand { turn_id, params })
        .await?;
    Ok(VoiceXml::empty())
}

/// /phone/transcribe/:turn - Transcription finished
pub async fn transcribe(
    State(state): State<PhoneAppState>,
    Path(turn_id): Path<TurnId>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<VoiceXml, PhoneApiError> {
    let params = state.authorize(fields)?;

    state
        .transcribe_handler()
        .handle(TranscribeCommand { turn_id, params })
        .await?;
    Ok(VoiceXml::empty())
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Error type for the phone routes.
#[derive(Debug)]
pub enum PhoneApiError {
    /// The webhook named a different provider account.
    AccountMismatch,
    Call(CallError),
}

impl From<CallError> for PhoneApiError {
    fn from(err: CallError) -> Self {
        Self::Call(err)
    }
}

impl IntoResponse for PhoneApiError {
    fn into_response(self) -> Response {
        let err = match self {
            PhoneApiError::AccountMismatch => return VoiceXml::hangup().into_response(),
            PhoneApiError::Call(err) => err,
        };

        let (status, error_code) = match &err {
            CallError::TreeNotFound(_) => (StatusCode::NOT_FOUND, "TREE_NOT_FOUND"),
            CallError::CallNotFound(_) => (StatusCode::NOT_FOUND, "CALL_NOT_FOUND"),
            CallError::TurnNotFound(_) => (StatusCode::NOT_FOUND, "TURN_NOT_FOUND"),
            CallError::RecordingNotFound(_) => (StatusCode::NOT_FOUND, "RECORDING_NOT_FOUND"),
            CallError::ValidationFailed { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            CallError::Flow(_) => (StatusCode::INTERNAL_SERVER_ERROR, "FLOW_INTEGRITY"),
            CallError::Callback(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CALLBACK_FAILED"),
            CallError::Transport(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
            CallError::Infrastructure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %err, error_code, "Phone webhook failed");
        } else {
            warn!(error = %err, error_code, "Phone webhook rejected");
        }

        (status, Json(ErrorResponse::new(error_code, err.to_string()))).into_response()
    }
}
