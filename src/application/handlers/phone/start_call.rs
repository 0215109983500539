//! StartCallHandler - Places an outbound call into a tree.

use std::sync::Arc;

use tracing::{error, info};

use super::find_or_create_caller::{FindOrCreateCallerCommand, FindOrCreateCallerHandler};
use super::support::{lookup_tree, TelephonySettings};
use crate::domain::call::{CallDetails, CallError, CallSession, Direction};
use crate::domain::flow::WebhookRoutes;
use crate::domain::tree::TreeRegistry;
use crate::ports::{
    CallSessionRepository, CallerRepository, OutboundCall, PhoneNumberPolicy, TelephonyProvider,
};

#[derive(Debug, Clone)]
pub struct StartCallCommand {
    pub tree_name: String,
    pub to: String,
    /// Defaults to the configured outgoing number.
    pub from: Option<String>,
    pub answering_machine_detection: bool,
}

/// Asks the provider to dial `to` and stores the outbound session.
///
/// The provider calls back on the tree's outbound URL once the callee
/// answers; status changes arrive on the shared status URL.
pub struct StartCallHandler {
    registry: TreeRegistry,
    sessions: Arc<dyn CallSessionRepository>,
    provider: Arc<dyn TelephonyProvider>,
    policy: Arc<dyn PhoneNumberPolicy>,
    callers: FindOrCreateCallerHandler,
    settings: TelephonySettings,
}

impl StartCallHandler {
    pub fn new(
        registry: TreeRegistry,
        sessions: Arc<dyn CallSessionRepository>,
        callers: Arc<dyn CallerRepository>,
        provider: Arc<dyn TelephonyProvider>,
        policy: Arc<dyn PhoneNumberPolicy>,
        settings: TelephonySettings,
    ) -> Self {
        Self {
            registry,
            sessions,
            provider,
            callers: FindOrCreateCallerHandler::new(callers, policy.clone()),
            policy,
            settings,
        }
    }

    pub async fn handle(&self, cmd: StartCallCommand) -> Result<CallSession, CallError> {
        let tree = lookup_tree(&self.registry, &cmd.tree_name)?;
        let to = self.require_valid("to", &cmd.to)?;
        let from = match cmd.from.as_deref() {
            Some(from) => self.require_valid("from", from)?,
            None => self.settings.default_outgoing_number.clone(),
        };

        let routes = WebhookRoutes::new(tree.name());
        let request = OutboundCall {
            to: to.clone(),
            from: from.clone(),
            url: WebhookRoutes::absolute(&self.settings.public_host, &routes.outbound()),
            status_callback: WebhookRoutes::absolute(
                &self.settings.public_host,
                &WebhookRoutes::status(),
            ),
            machine_detection: cmd.answering_machine_detection,
        };

        let sid = self.provider.start_call(&request).await.map_err(|e| {
            error!(tree = tree.name(), error = %e, "Failed to start outbound call");
            e
        })?;

        let caller = self
            .callers
            .handle(FindOrCreateCallerCommand {
                phone_number: to.clone(),
            })
            .await?;

        // The remote party sits in `from_number` whichever side dialed
        let session = CallSession::new(
            sid,
            Direction::Outbound,
            tree.name(),
            *caller.id(),
            CallDetails {
                from_number: to,
                to_number: Some(from),
                ..CallDetails::default()
            },
        )?;
        self.sessions.save(&session).await?;

        info!(call_sid = session.sid(), tree = tree.name(), "Outbound call started");
        Ok(session)
    }

    fn require_valid(&self, field: &str, number: &str) -> Result<String, CallError> {
        self.policy
            .normalize(number)
            .ok_or_else(|| CallError::validation(field, format!("'{}' is not a valid phone number", number)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::phone::testing::{favourite_tree, Harness};
    use crate::ports::TransportError;

    fn handler(h: &Harness) -> StartCallHandler {
        StartCallHandler::new(
            h.registry.clone(),
            h.sessions(),
            h.callers(),
            h.provider(),
            h.policy(),
            h.settings.clone(),
        )
    }

    fn command(to: &str) -> StartCallCommand {
        StartCallCommand {
            tree_name: "favourite".into(),
            to: to.into(),
            from: None,
            answering_machine_detection: true,
        }
    }

    #[tokio::test]
    async fn dials_and_stores_outbound_session() {
        let h = Harness::new(vec![favourite_tree()]);

        let session = handler(&h).handle(command("613-555-0000")).await.unwrap();

        let calls = h.provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to, "+16135550000");
        assert_eq!(calls[0].from, "+16135559999");
        assert_eq!(calls[0].url, "https://ivr.example.com/phone/favourite/outbound");
        assert_eq!(calls[0].status_callback, "https://ivr.example.com/phone/status");
        assert!(calls[0].machine_detection);

        let stored = h.session(session.sid()).await;
        assert!(stored.is_outbound());
        assert_eq!(stored.from_number(), "+16135550000");
        assert_eq!(stored.details().to_number.as_deref(), Some("+16135559999"));
    }

    #[tokio::test]
    async fn invalid_destination_is_rejected_before_dialing() {
        let h = Harness::new(vec![favourite_tree()]);

        let result = handler(&h).handle(command("12345")).await;

        assert!(matches!(result, Err(CallError::ValidationFailed { .. })));
        assert!(h.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_propagates_without_session() {
        let h = Harness::new(vec![favourite_tree()]);
        h.provider
            .set_error("start_call", TransportError::Network("connection reset".into()));

        let result = handler(&h).handle(command("+16135550000")).await;

        assert!(matches!(result, Err(CallError::Transport(_))));
        assert_eq!(h.store.session_count().await, 0);
    }
}
