//! Aggregate client state and its reducer.
//!
//! `ChatState` never talks to the host. Inbound events and user actions
//! mutate it synchronously and return [`Effect`]s; the caller runs those
//! against a [`HostOps`] implementation after releasing any lock, so event
//! ingestion never waits on an outbound round-trip.

use std::collections::{HashMap, HashSet};

use agent_events::{
    AvailableCommand, ChatMessage, HostError, HostEvent, HostOps, InteractionResponse, PlanEntry,
    Session, SessionStatus, SessionStatusEvent,
};
use tracing::{debug, warn};

use crate::error::ActionError;
use crate::interaction::InteractionCorrelator;
use crate::registry::{Activity, SessionRegistry};
use crate::timeline::{ChunkOutcome, Timeline};

/// Outbound RPC requested by a user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundAction {
    SendMessage { session_id: String, content: String },
    InteractionResponse(InteractionResponse),
    CancelGeneration { session_id: String },
    TerminateSession { session_id: String, cleanup: bool },
    ResumeSession { session_id: String },
    SetSessionMode { session_id: String, mode_id: String },
    SetSessionModel { session_id: String, model_id: String },
}

impl OutboundAction {
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::SendMessage { session_id, .. }
            | Self::CancelGeneration { session_id }
            | Self::TerminateSession { session_id, .. }
            | Self::ResumeSession { session_id }
            | Self::SetSessionMode { session_id, .. }
            | Self::SetSessionModel { session_id, .. } => session_id,
            Self::InteractionResponse(response) => &response.session_id,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => "send_message",
            Self::InteractionResponse(_) => "send_interaction_response",
            Self::CancelGeneration { .. } => "cancel_generation",
            Self::TerminateSession { .. } => "terminate_session",
            Self::ResumeSession { .. } => "resume_session",
            Self::SetSessionMode { .. } => "set_session_mode",
            Self::SetSessionModel { .. } => "set_session_model",
        }
    }

    pub fn invoke(&self, host: &dyn HostOps) -> Result<(), HostError> {
        match self {
            Self::SendMessage {
                session_id,
                content,
            } => host.send_message(session_id, content),
            Self::InteractionResponse(response) => host.send_interaction_response(response),
            Self::CancelGeneration { session_id } => host.cancel_generation(session_id),
            Self::TerminateSession {
                session_id,
                cleanup,
            } => host.terminate_session(session_id, *cleanup),
            Self::ResumeSession { session_id } => host.resume_session(session_id),
            Self::SetSessionMode {
                session_id,
                mode_id,
            } => host.set_session_mode(session_id, mode_id),
            Self::SetSessionModel {
                session_id,
                model_id,
            } => host.set_session_model(session_id, model_id),
        }
    }
}

/// Work produced by the reducer for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Persist a finalized message.
    SaveMessage(ChatMessage),
    Outbound(OutboundAction),
}

impl Effect {
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::SaveMessage(message) => &message.session_id,
            Self::Outbound(action) => action.session_id(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SaveMessage(_) => "save_message",
            Self::Outbound(action) => action.name(),
        }
    }

    pub fn run(&self, host: &dyn HostOps) -> Result<(), HostError> {
        match self {
            Self::SaveMessage(message) => host.save_message(message),
            Self::Outbound(action) => action.invoke(host),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    timeline: Timeline,
    registry: SessionRegistry,
    prompts: InteractionCorrelator,
    plans: HashMap<String, HashMap<String, Vec<PlanEntry>>>,
    commands: HashMap<String, Vec<AvailableCommand>>,
    removed: HashSet<String>,
}

impl ChatState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn prompts(&self) -> &InteractionCorrelator {
        &self.prompts
    }

    pub(crate) fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub(crate) fn registry_mut(&mut self) -> &mut SessionRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn messages(&self, session_id: &str) -> &[ChatMessage] {
        self.timeline.messages(session_id)
    }

    #[must_use]
    pub fn plan(&self, session_id: &str, message_id: &str) -> Option<&[PlanEntry]> {
        self.plans
            .get(session_id)?
            .get(message_id)
            .map(Vec::as_slice)
    }

    #[must_use]
    pub fn commands(&self, session_id: &str) -> &[AvailableCommand] {
        self.commands
            .get(session_id)
            .map_or(&[][..], Vec::as_slice)
    }

    pub fn register_session(&mut self, session: Session) {
        self.removed.remove(&session.id);
        self.registry.upsert(session);
    }

    /// Loads persisted history for a session; restored messages are final.
    pub fn restore_messages(&mut self, session_id: &str, messages: Vec<ChatMessage>) {
        self.timeline.restore(session_id, messages);
    }

    /// Applies one inbound event. Events for sessions removed with cleanup
    /// are dropped.
    pub fn apply_event(&mut self, event: HostEvent) -> Vec<Effect> {
        if self.removed.contains(event.session_id()) {
            debug!(
                session_id = %event.session_id(),
                event = event.kind().name(),
                "dropping event for removed session"
            );
            return Vec::new();
        }

        match event {
            HostEvent::StreamChunk(chunk) => {
                let session_id = chunk.session_id.clone();
                let outcome = self.timeline.apply_chunk(chunk);
                match outcome {
                    ChunkOutcome::Started { .. } => {
                        self.registry.mark(&session_id, Activity::Streaming);
                    }
                    ChunkOutcome::Completed(_)
                        if self.timeline.streaming_message(&session_id).is_none() =>
                    {
                        self.registry.clear_activity(&session_id, Activity::Streaming);
                    }
                    _ => {}
                }

                outcome
                    .into_finalized()
                    .into_iter()
                    .map(Effect::SaveMessage)
                    .collect()
            }
            HostEvent::InteractionPrompt(prompt) => {
                self.prompts.set_prompt(prompt);
                Vec::new()
            }
            HostEvent::SessionStatusChanged(event) => {
                self.registry.apply_status(event);
                Vec::new()
            }
            HostEvent::AvailableCommandsUpdate(event) => {
                self.commands.insert(event.session_id, event.commands);
                Vec::new()
            }
            HostEvent::PlanUpdate(event) => {
                self.plans
                    .entry(event.session_id)
                    .or_default()
                    .insert(event.message_id, event.entries);
                Vec::new()
            }
        }
    }

    /// Routes user input: answers the pending prompt if there is one,
    /// otherwise sends a normal message.
    pub fn submit(&mut self, session_id: &str, text: &str) -> Result<Vec<Effect>, ActionError> {
        if self.prompts.has_pending(session_id) {
            return self.resolve_prompt(session_id, text);
        }
        self.send_message(session_id, text)
    }

    pub fn send_message(
        &mut self,
        session_id: &str,
        content: &str,
    ) -> Result<Vec<Effect>, ActionError> {
        self.require_session(session_id)?;
        if self.prompts.has_pending(session_id) {
            return Err(ActionError::PromptPending {
                session_id: session_id.to_string(),
            });
        }
        if content.trim().is_empty() {
            return Err(ActionError::EmptyMessage);
        }
        self.require_input_enabled(session_id)?;

        let message = ChatMessage::user(session_id, content);
        let mut effects: Vec<Effect> = self
            .timeline
            .push_message(message.clone())
            .into_iter()
            .map(Effect::SaveMessage)
            .collect();
        self.registry.mark(session_id, Activity::Streaming);
        self.registry.clear_error(session_id);

        effects.push(Effect::SaveMessage(message));
        effects.push(Effect::Outbound(OutboundAction::SendMessage {
            session_id: session_id.to_string(),
            content: content.to_string(),
        }));
        Ok(effects)
    }

    /// Answers the pending prompt. The prompt is cleared before the response
    /// is sent, so a failed send never leaves the session locked.
    pub fn resolve_prompt(
        &mut self,
        session_id: &str,
        text: &str,
    ) -> Result<Vec<Effect>, ActionError> {
        let response =
            self.prompts
                .resolve(session_id, text)
                .ok_or_else(|| ActionError::NoPendingPrompt {
                    session_id: session_id.to_string(),
                })?;

        Ok(vec![Effect::Outbound(OutboundAction::InteractionResponse(
            response,
        ))])
    }

    /// Requests cancellation; the timeline only changes once events arrive.
    pub fn stop(&mut self, session_id: &str) -> Result<Vec<Effect>, ActionError> {
        self.require_session(session_id)?;
        Ok(vec![Effect::Outbound(OutboundAction::CancelGeneration {
            session_id: session_id.to_string(),
        })])
    }

    pub fn resume(&mut self, session_id: &str) -> Result<Vec<Effect>, ActionError> {
        let resumable = self.require_session(session_id)?.is_resumable();
        if !resumable {
            return Err(ActionError::NotResumable {
                session_id: session_id.to_string(),
            });
        }
        self.require_input_enabled(session_id)?;

        self.registry.mark(session_id, Activity::Resuming);
        self.registry.clear_error(session_id);
        Ok(vec![Effect::Outbound(OutboundAction::ResumeSession {
            session_id: session_id.to_string(),
        })])
    }

    /// With `cleanup` the session disappears from every collection at once;
    /// without it only the status flips to terminated.
    pub fn terminate(
        &mut self,
        session_id: &str,
        cleanup: bool,
    ) -> Result<Vec<Effect>, ActionError> {
        self.require_session(session_id)?;

        if cleanup {
            self.remove_session(session_id);
        } else {
            self.registry.apply_status(SessionStatusEvent {
                session_id: session_id.to_string(),
                status: SessionStatus::Terminated,
                session: None,
                error: None,
            });
        }

        Ok(vec![Effect::Outbound(OutboundAction::TerminateSession {
            session_id: session_id.to_string(),
            cleanup,
        })])
    }

    pub fn set_mode(
        &mut self,
        session_id: &str,
        mode_id: &str,
    ) -> Result<Vec<Effect>, ActionError> {
        self.require_session(session_id)?;
        if let Some(session) = self.registry.get_mut(session_id) {
            session.current_mode_id = Some(mode_id.to_string());
        }

        Ok(vec![Effect::Outbound(OutboundAction::SetSessionMode {
            session_id: session_id.to_string(),
            mode_id: mode_id.to_string(),
        })])
    }

    pub fn set_model(
        &mut self,
        session_id: &str,
        model_id: &str,
    ) -> Result<Vec<Effect>, ActionError> {
        self.require_session(session_id)?;
        if let Some(session) = self.registry.get_mut(session_id) {
            session.current_model_id = Some(model_id.to_string());
        }

        Ok(vec![Effect::Outbound(OutboundAction::SetSessionModel {
            session_id: session_id.to_string(),
            model_id: model_id.to_string(),
        })])
    }

    /// Surfaces a failed effect as the session's error banner.
    ///
    /// Applied state is kept; only the activity the effect started is undone.
    pub fn record_failure(&mut self, effect: &Effect, error: &HostError) {
        let session_id = effect.session_id();
        warn!(%session_id, effect = effect.name(), error = %error, "host call failed");
        if !self.registry.contains(session_id) {
            debug!(%session_id, "dropping failure for removed session");
            return;
        }

        match effect {
            Effect::Outbound(OutboundAction::SendMessage { .. })
                if self.timeline.streaming_message(session_id).is_none() =>
            {
                self.registry.clear_activity(session_id, Activity::Streaming);
            }
            Effect::Outbound(OutboundAction::ResumeSession { .. }) => {
                self.registry.clear_activity(session_id, Activity::Resuming);
            }
            _ => {}
        }

        self.registry
            .record_error(session_id, format!("{} failed: {error}", effect.name()));
    }

    fn remove_session(&mut self, session_id: &str) {
        self.timeline.remove_session(session_id);
        self.registry.remove(session_id);
        self.prompts.clear(session_id);
        self.plans.remove(session_id);
        self.commands.remove(session_id);
        self.removed.insert(session_id.to_string());
    }

    fn require_session(&self, session_id: &str) -> Result<&Session, ActionError> {
        self.registry
            .get(session_id)
            .ok_or_else(|| ActionError::UnknownSession {
                session_id: session_id.to_string(),
            })
    }

    fn require_input_enabled(&self, session_id: &str) -> Result<(), ActionError> {
        match self.registry.activity(session_id) {
            Some(activity) => Err(ActionError::InputDisabled {
                session_id: session_id.to_string(),
                activity: activity.as_str(),
            }),
            None => Ok(()),
        }
    }
}
