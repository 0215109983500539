//! SendMessageHandler - Sends text messages to a caller.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::find_or_create_caller::{FindOrCreateCallerCommand, FindOrCreateCallerHandler};
use super::support::TelephonySettings;
use crate::domain::call::{CallError, Caller};
use crate::ports::{CallerRepository, OutboundMessage, PhoneNumberPolicy, TelephonyProvider};

#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub to: String,
    /// Defaults to the configured outgoing number.
    pub from: Option<String>,
    /// Sent in order, one provider message each. Blank bodies are skipped.
    pub messages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SendMessageResult {
    pub caller: Caller,
    /// Provider sids of the messages that were accepted.
    pub sids: Vec<String>,
}

/// Sends messages to a caller identity shared with voice calls.
///
/// A recipient who unsubscribed is logged and skipped; any other provider
/// error stops the batch.
pub struct SendMessageHandler {
    provider: Arc<dyn TelephonyProvider>,
    policy: Arc<dyn PhoneNumberPolicy>,
    callers: FindOrCreateCallerHandler,
    settings: TelephonySettings,
}

impl SendMessageHandler {
    pub fn new(
        callers: Arc<dyn CallerRepository>,
        provider: Arc<dyn TelephonyProvider>,
        policy: Arc<dyn PhoneNumberPolicy>,
        settings: TelephonySettings,
    ) -> Self {
        Self {
            provider,
            callers: FindOrCreateCallerHandler::new(callers, policy.clone()),
            policy,
            settings,
        }
    }

    pub async fn handle(&self, cmd: SendMessageCommand) -> Result<SendMessageResult, CallError> {
        let from = match cmd.from.as_deref() {
            Some(from) => self.policy.normalize(from).ok_or_else(|| {
                CallError::validation("from", format!("'{}' is not a valid phone number", from))
            })?,
            None => self.settings.default_outgoing_number.clone(),
        };
        let caller = self
            .callers
            .handle(FindOrCreateCallerCommand {
                phone_number: cmd.to.clone(),
            })
            .await?;

        let mut sids = Vec::new();
        for body in cmd.messages.iter().filter(|m| !m.trim().is_empty()) {
            let request = OutboundMessage {
                to: caller.phone_number().to_string(),
                from: from.clone(),
                body: body.clone(),
            };
            match self.provider.send_message(&request).await {
                Ok(sid) => sids.push(sid),
                Err(err) if err.is_unsubscribed() => {
                    warn!(
                        caller_id = %caller.id(),
                        error = %err,
                        "Recipient unsubscribed, message not sent"
                    );
                }
                Err(err) => {
                    error!(caller_id = %caller.id(), error = %err, "Failed to send message");
                    return Err(err.into());
                }
            }
        }

        info!(caller_id = %caller.id(), sent = sids.len(), "Messages sent");
        Ok(SendMessageResult { caller, sids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::phone::testing::Harness;
    use crate::ports::{TransportError, UNSUBSCRIBED_ERROR_CODE};

    fn handler(h: &Harness) -> SendMessageHandler {
        SendMessageHandler::new(h.callers(), h.provider(), h.policy(), h.settings.clone())
    }

    fn command(messages: &[&str]) -> SendMessageCommand {
        SendMessageCommand {
            to: "(613) 555-0000".into(),
            from: None,
            messages: messages.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn sends_each_non_blank_message() {
        let h = Harness::new(vec![]);

        let result = handler(&h)
            .handle(command(&["Thanks for calling", " ", "Bye"]))
            .await
            .unwrap();

        assert_eq!(result.sids.len(), 2);
        assert_eq!(result.caller.phone_number(), "+16135550000");
        let sent = h.provider.messages();
        assert_eq!(sent[0].body, "Thanks for calling");
        assert_eq!(sent[1].body, "Bye");
        assert!(sent.iter().all(|m| m.from == "+16135559999"));
    }

    #[tokio::test]
    async fn unsubscribed_recipient_is_skipped() {
        let h = Harness::new(vec![]);
        h.provider.set_error(
            "send_message",
            TransportError::rejected(400, "unsubscribed").with_code(UNSUBSCRIBED_ERROR_CODE),
        );

        let result = handler(&h).handle(command(&["Hello"])).await.unwrap();

        assert!(result.sids.is_empty());
    }

    #[tokio::test]
    async fn other_rejections_propagate() {
        let h = Harness::new(vec![]);
        h.provider
            .set_error("send_message", TransportError::rejected(401, "bad credentials"));

        let result = handler(&h).handle(command(&["Hello"])).await;

        assert!(matches!(result, Err(CallError::Transport(_))));
    }

    #[tokio::test]
    async fn invalid_sender_is_rejected() {
        let h = Harness::new(vec![]);
        let mut cmd = command(&["Hello"]);
        cmd.from = Some("not a number".into());

        let result = handler(&h).handle(cmd).await;

        assert!(matches!(result, Err(CallError::ValidationFailed { .. })));
        assert!(h.provider.messages().is_empty());
    }
}
