//! The call flow state machine.
//!
//! Each webhook event maps to one entry point. An entry point reads the
//! tree and the session, decides what happens next, and returns the markup
//! together with any turn that must be persisted. The compiler never
//! touches storage itself.
//!
//! ```text
//! Greeting ──after──▶ AwaitingInput(h) ──input──▶ after(h) ──▶ AwaitingInput(h') | Hangup
//!                          │
//!                          └──timeout──▶ TimedOut(h) ──exhausted──▶ final message + Hangup
//!                                                   └─otherwise──▶ after(h)
//! ```

use tracing::{error, warn};

use super::context::FlowContext;
use super::errors::FlowError;
use super::markup::{Verb, VoiceResponse};
use super::routes::WebhookRoutes;
use crate::domain::call::{
    CallSession, CallerHistory, ResponseTurn, TimeoutPolicy, TurnChange, TurnInput,
};
use crate::domain::tree::{
    GatherSpec, Message, MessageEntry, MessageSet, PromptHandle, PromptNode, Target, Transition,
    TreeDefinition,
};

/// What kind of response a step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Redirected to the prompt entry point for a new turn.
    Redirect,
    /// Rendered a prompt and its gather.
    Prompt,
    /// Played the transition messages and hung up.
    Hangup,
    /// Caller number failed validation.
    InvalidPhoneNumber,
    /// Outbound call reached an answering machine.
    AnsweringMachine,
    /// Too many consecutive timeouts on one prompt.
    FinalTimeout,
}

/// Result of one entry point.
#[derive(Debug, Clone)]
pub struct FlowStep {
    pub response: VoiceResponse,
    /// The current turn as the step saw it, after any input or timeout.
    pub updated_turn: Option<ResponseTurn>,
    /// The write that brings the stored copy of `updated_turn` up to date.
    /// `None` when the event changed nothing.
    pub turn_change: Option<TurnChange>,
    /// A freshly created, unfilled turn for the next prompt.
    pub next_turn: Option<ResponseTurn>,
    pub outcome: StepOutcome,
}

impl FlowStep {
    fn new(response: VoiceResponse, outcome: StepOutcome) -> Self {
        Self {
            response,
            updated_turn: None,
            turn_change: None,
            next_turn: None,
            outcome,
        }
    }
}

/// Evaluates one tree against one call.
pub struct FlowCompiler<'t> {
    tree: &'t TreeDefinition,
    history: Option<&'t CallerHistory>,
    routes: WebhookRoutes,
    timeout_policy: TimeoutPolicy,
}

impl<'t> FlowCompiler<'t> {
    pub fn new(tree: &'t TreeDefinition) -> Self {
        Self {
            tree,
            history: None,
            routes: WebhookRoutes::new(tree.name()),
            timeout_policy: TimeoutPolicy::new(tree.config().final_timeout_attempts),
        }
    }

    /// Exposes the caller's record on this tree to dynamic values.
    pub fn with_history(mut self, history: &'t CallerHistory) -> Self {
        self.history = Some(history);
        self
    }

    pub fn routes(&self) -> &WebhookRoutes {
        &self.routes
    }

    // ════════════════════════════════════════════════════════════════════════
    // Entry points
    // ════════════════════════════════════════════════════════════════════════

    /// First response of a call.
    ///
    /// A caller whose number fails validation hears the tree's invalid
    /// number message, if it has one, and is hung up on without a turn.
    pub fn on_greeting(
        &self,
        session: &CallSession,
        caller_number_valid: bool,
    ) -> Result<FlowStep, FlowError> {
        let ctx = self.context(session, None);

        if !caller_number_valid {
            if let Some(messages) = &self.tree.config().invalid_phone_number {
                let mut response = VoiceResponse::new();
                response.extend(self.render_messages(messages, &ctx)?);
                response.push(Verb::hangup());
                return Ok(FlowStep::new(response, StepOutcome::InvalidPhoneNumber));
            }
        }

        let transition = self.tree.greeting().resolve(&ctx)?;
        self.emit_after(session, &transition, &ctx)
    }

    /// Renders the prompt recorded on `turn` and its gather directive.
    pub fn on_prompt_requested(
        &self,
        session: &CallSession,
        turn: &ResponseTurn,
    ) -> Result<FlowStep, FlowError> {
        if session.is_answering_machine() {
            return Ok(self.answering_machine_hangup());
        }

        let node = self.node_for(session, turn)?;
        let ctx = self.context(session, Some(turn));
        let messages = self.render_messages(node.messages(), &ctx)?;

        let mut response = VoiceResponse::new();
        let interrupt = node.gather().is_some_and(GatherSpec::interrupt);
        let (before, inside) = if interrupt {
            (Vec::new(), messages)
        } else {
            (messages, Vec::new())
        };
        response.extend(before);

        let action = self.routes.prompt_response(turn.id());
        match node.gather() {
            None => response.push(Verb::redirect(action)),
            Some(GatherSpec::Digits(digits)) => {
                response.push(
                    Verb::gather()
                        .attr("action", action)
                        .attr("input", "dtmf")
                        .attr("numDigits", digits.number.to_string())
                        .attr("timeout", digits.timeout.to_string())
                        .flag("actionOnEmptyResult", false)
                        .attr_opt("finishOnKey", digits.finish_on_key.as_deref())
                        .children(inside),
                );
                response.push(Verb::redirect(self.routes.timeout(turn.id())));
            }
            Some(GatherSpec::Voice(voice)) => {
                let mut record = Verb::record()
                    .attr("maxLength", voice.length.to_string())
                    .attr_opt("timeout", voice.timeout)
                    .flag("playBeep", voice.beep)
                    .attr("action", action)
                    .attr(
                        "recordingStatusCallback",
                        WebhookRoutes::receive_recording(turn.id()),
                    );
                if voice.transcribe {
                    record = record
                        .flag("transcribe", true)
                        .attr("transcribeCallback", WebhookRoutes::transcribe(turn.id()));
                }
                if voice.profanity_filter {
                    record = record.flag("profanityFilter", true);
                }
                response.push(record);
            }
            Some(GatherSpec::Speech(speech)) => {
                let mut gather = Verb::gather()
                    .attr("action", action)
                    .attr("input", "speech")
                    .attr_opt("timeout", speech.timeout)
                    .flag("actionOnEmptyResult", true)
                    .attr("language", speech.language.as_str())
                    .flag("enhanced", speech.enhanced)
                    .attr_opt("speechTimeout", speech.speech_timeout.as_deref())
                    .attr_opt("speechModel", speech.speech_model.as_deref());
                if speech.profanity_filter {
                    gather = gather.flag("profanityFilter", true);
                }
                response.push(gather);
            }
        }

        Ok(FlowStep::new(response, StepOutcome::Prompt))
    }

    /// Merges input into `turn` and follows the prompt's after rule.
    ///
    /// A settled turn keeps its stored input; a redelivered answer is
    /// logged and the transition is rendered from what was stored.
    pub fn on_input_received(
        &self,
        session: &CallSession,
        turn: &ResponseTurn,
        input: &TurnInput,
    ) -> Result<FlowStep, FlowError> {
        if session.is_answering_machine() {
            return Ok(self.answering_machine_hangup());
        }

        let accepted = turn.acceptable_input(input);
        if accepted != *input {
            warn!(
                tree = self.tree.name(),
                call_sid = session.sid(),
                turn_id = %turn.id(),
                "Input for a settled turn, keeping stored values"
            );
        }

        let mut updated = turn.clone();
        let turn_change = updated
            .merge_input(&accepted)
            .then_some(TurnChange::Input(accepted));

        let node = self.node_for(session, &updated)?;
        let view = with_turn(session, &updated);
        let ctx = self.context(&view, Some(&updated));
        let transition = node.after().resolve(&ctx)?;
        let mut step = self.emit_after(&view, &transition, &ctx)?;

        step.updated_turn = Some(updated);
        step.turn_change = turn_change;
        Ok(step)
    }

    /// Marks `turn` timed out and either ends the call or follows the after rule.
    ///
    /// `recent` holds the latest turns on the same prompt, most recent first.
    /// The stored copy of `turn` in it is replaced by the timed-out copy. A
    /// turn that already has input is not marked.
    pub fn on_timeout(
        &self,
        session: &CallSession,
        turn: &ResponseTurn,
        recent: &[ResponseTurn],
    ) -> Result<FlowStep, FlowError> {
        if session.is_answering_machine() {
            return Ok(self.answering_machine_hangup());
        }

        let mut updated = turn.clone();
        let turn_change = if turn.has_input() {
            warn!(
                tree = self.tree.name(),
                call_sid = session.sid(),
                turn_id = %turn.id(),
                "Timeout for an answered turn, keeping stored input"
            );
            None
        } else {
            updated.mark_timed_out().then_some(TurnChange::TimedOut)
        };

        let mut window: Vec<&ResponseTurn> = std::iter::once(&updated)
            .chain(recent.iter().filter(|t| {
                t.id() != updated.id() && t.prompt_handle() == updated.prompt_handle()
            }))
            .collect();
        window.sort_by(|a, b| b.created_at().cmp(a.created_at()));

        let view = with_turn(session, &updated);
        let ctx = self.context(&view, Some(&updated));

        let mut step = if self.timeout_policy.is_exhausted(window) {
            tracing::info!(
                tree = self.tree.name(),
                call_sid = session.sid(),
                prompt = %updated.prompt_handle(),
                "Final timeout"
            );
            let mut response = VoiceResponse::new();
            response.extend(self.render_messages(&self.tree.config().final_timeout_message, &ctx)?);
            response.push(Verb::hangup());
            FlowStep::new(response, StepOutcome::FinalTimeout)
        } else {
            let node = self.node_for(session, &updated)?;
            let transition = node.after().resolve(&ctx)?;
            self.emit_after(&view, &transition, &ctx)?
        };

        step.updated_turn = Some(updated);
        step.turn_change = turn_change;
        Ok(step)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Transitions
    // ════════════════════════════════════════════════════════════════════════

    /// Plays the transition messages, then hangs up or redirects to a new turn.
    pub fn emit_after(
        &self,
        session: &CallSession,
        transition: &Transition,
        ctx: &FlowContext<'_>,
    ) -> Result<FlowStep, FlowError> {
        let next_turn = match transition.target() {
            Target::Hangup => None,
            Target::Prompt(handle) => {
                if self.tree.prompt(handle).is_none() {
                    return Err(self.integrity_error(session, handle, ctx.turn()));
                }
                Some(ResponseTurn::new(*session.id(), handle.clone()))
            }
        };

        let mut response = VoiceResponse::new();
        response.extend(self.render_messages(transition.messages(), ctx)?);

        let step = match next_turn {
            None => {
                response.push(Verb::hangup());
                FlowStep::new(response, StepOutcome::Hangup)
            }
            Some(next) => {
                response.push(Verb::redirect(self.routes.prompt(next.id())));
                FlowStep {
                    next_turn: Some(next),
                    ..FlowStep::new(response, StepOutcome::Redirect)
                }
            }
        };
        Ok(step)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Rendering
    // ════════════════════════════════════════════════════════════════════════

    /// Resolves a message set into verbs. Blank dynamic text is skipped.
    pub fn render_messages(
        &self,
        messages: &MessageSet,
        ctx: &FlowContext<'_>,
    ) -> Result<Vec<Verb>, FlowError> {
        let mut verbs = Vec::with_capacity(messages.len());
        self.append_messages(messages, ctx, &mut verbs)?;
        Ok(verbs)
    }

    fn append_messages(
        &self,
        messages: &MessageSet,
        ctx: &FlowContext<'_>,
        verbs: &mut Vec<Verb>,
    ) -> Result<(), FlowError> {
        for entry in messages.entries() {
            match entry {
                MessageEntry::Static(message) => {
                    if let Some(verb) = self.render_message(message, ctx)? {
                        verbs.push(verb);
                    }
                }
                MessageEntry::Dynamic(f) => {
                    let produced = f(ctx)?;
                    self.append_messages(&produced, ctx, verbs)?;
                }
            }
        }
        Ok(())
    }

    fn render_message(
        &self,
        message: &Message,
        ctx: &FlowContext<'_>,
    ) -> Result<Option<Verb>, FlowError> {
        let verb = match message {
            Message::Say { text, voice } => {
                let text = text.resolve(ctx)?;
                if text.trim().is_empty() {
                    return Ok(None);
                }
                let voice = voice.as_deref().unwrap_or(&self.tree.config().voice);
                Verb::say(text, voice)
            }
            Message::Play { url } => {
                let url = url.resolve(ctx)?;
                if url.trim().is_empty() {
                    return Ok(None);
                }
                Verb::play(url)
            }
            Message::Pause { seconds } => Verb::pause(*seconds),
        };
        Ok(Some(verb))
    }

    // ════════════════════════════════════════════════════════════════════════
    // Helpers
    // ════════════════════════════════════════════════════════════════════════

    fn context<'a>(
        &'a self,
        session: &'a CallSession,
        turn: Option<&'a ResponseTurn>,
    ) -> FlowContext<'a> {
        FlowContext::new(session, turn)
            .with_history(self.history)
            .with_answers(&self.tree.config().answers)
    }

    fn node_for(
        &self,
        session: &CallSession,
        turn: &ResponseTurn,
    ) -> Result<&'t PromptNode, FlowError> {
        self.tree
            .prompt(turn.prompt_handle())
            .ok_or_else(|| self.integrity_error(session, turn.prompt_handle(), Some(turn)))
    }

    fn integrity_error(
        &self,
        session: &CallSession,
        handle: &PromptHandle,
        turn: Option<&ResponseTurn>,
    ) -> FlowError {
        error!(
            tree = self.tree.name(),
            prompt = %handle,
            call_sid = session.sid(),
            session_id = %session.id(),
            turn_id = ?turn.map(|t| *t.id()),
            "Tree references an unknown prompt"
        );
        FlowError::integrity(self.tree.name(), handle.as_str())
    }

    fn answering_machine_hangup(&self) -> FlowStep {
        FlowStep::new(VoiceResponse::hangup_only(), StepOutcome::AnsweringMachine)
    }
}

/// A copy of the session whose stored turn reflects the latest mutation.
fn with_turn(session: &CallSession, turn: &ResponseTurn) -> CallSession {
    let mut view = session.clone();
    view.record_turn(turn.clone());
    view
}
