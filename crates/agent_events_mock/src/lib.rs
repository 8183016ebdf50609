//! Deterministic test doubles for the shared `agent_events` contract.
//!
//! [`RecordingHost`] records every outbound call and can be told to fail a
//! given kind of call. [`ScriptedTurn`] produces the event sequence a host
//! would push for one assistant turn.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use agent_events::{
    ChatMessage, HostError, HostEvent, HostOps, InteractionResponse, PlanEntry, PlanUpdateEvent,
    StreamChunk, ToolCallContent, ToolCallStatus, ToolCallUpdate, ToolKind,
};
use serde_json::Value;

/// Kind of outbound call, used to configure failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCallKind {
    SendMessage,
    InteractionResponse,
    SaveMessage,
    CancelGeneration,
    TerminateSession,
    ResumeSession,
    SetSessionMode,
    SetSessionModel,
}

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    SendMessage { session_id: String, content: String },
    InteractionResponse(InteractionResponse),
    SaveMessage(ChatMessage),
    CancelGeneration { session_id: String },
    TerminateSession { session_id: String, cleanup: bool },
    ResumeSession { session_id: String },
    SetSessionMode { session_id: String, mode_id: String },
    SetSessionModel { session_id: String, model_id: String },
}

impl HostCall {
    #[must_use]
    pub fn kind(&self) -> HostCallKind {
        match self {
            Self::SendMessage { .. } => HostCallKind::SendMessage,
            Self::InteractionResponse(_) => HostCallKind::InteractionResponse,
            Self::SaveMessage(_) => HostCallKind::SaveMessage,
            Self::CancelGeneration { .. } => HostCallKind::CancelGeneration,
            Self::TerminateSession { .. } => HostCallKind::TerminateSession,
            Self::ResumeSession { .. } => HostCallKind::ResumeSession,
            Self::SetSessionMode { .. } => HostCallKind::SetSessionMode,
            Self::SetSessionModel { .. } => HostCallKind::SetSessionModel,
        }
    }
}

/// Host double that records calls; failing calls are recorded too.
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    failing: Mutex<HashSet<HostCallKind>>,
}

impl RecordingHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `kind` return an error.
    pub fn fail(&self, kind: HostCallKind) {
        lock_unpoisoned(&self.failing).insert(kind);
    }

    pub fn recover(&self, kind: HostCallKind) {
        lock_unpoisoned(&self.failing).remove(&kind);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<HostCall> {
        lock_unpoisoned(&self.calls).clone()
    }

    #[must_use]
    pub fn count(&self, kind: HostCallKind) -> usize {
        lock_unpoisoned(&self.calls)
            .iter()
            .filter(|call| call.kind() == kind)
            .count()
    }

    #[must_use]
    pub fn saved_messages(&self) -> Vec<ChatMessage> {
        lock_unpoisoned(&self.calls)
            .iter()
            .filter_map(|call| match call {
                HostCall::SaveMessage(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: HostCall) -> Result<(), HostError> {
        let kind = call.kind();
        lock_unpoisoned(&self.calls).push(call);
        if lock_unpoisoned(&self.failing).contains(&kind) {
            return Err(HostError::new(format!("mock host rejected {kind:?}")));
        }
        Ok(())
    }
}

impl HostOps for RecordingHost {
    fn send_message(&self, session_id: &str, content: &str) -> Result<(), HostError> {
        self.record(HostCall::SendMessage {
            session_id: session_id.to_string(),
            content: content.to_string(),
        })
    }

    fn send_interaction_response(&self, response: &InteractionResponse) -> Result<(), HostError> {
        self.record(HostCall::InteractionResponse(response.clone()))
    }

    fn save_message(&self, message: &ChatMessage) -> Result<(), HostError> {
        self.record(HostCall::SaveMessage(message.clone()))
    }

    fn cancel_generation(&self, session_id: &str) -> Result<(), HostError> {
        self.record(HostCall::CancelGeneration {
            session_id: session_id.to_string(),
        })
    }

    fn terminate_session(&self, session_id: &str, cleanup: bool) -> Result<(), HostError> {
        self.record(HostCall::TerminateSession {
            session_id: session_id.to_string(),
            cleanup,
        })
    }

    fn resume_session(&self, session_id: &str) -> Result<(), HostError> {
        self.record(HostCall::ResumeSession {
            session_id: session_id.to_string(),
        })
    }

    fn set_session_mode(&self, session_id: &str, mode_id: &str) -> Result<(), HostError> {
        self.record(HostCall::SetSessionMode {
            session_id: session_id.to_string(),
            mode_id: mode_id.to_string(),
        })
    }

    fn set_session_model(&self, session_id: &str, model_id: &str) -> Result<(), HostError> {
        self.record(HostCall::SetSessionModel {
            session_id: session_id.to_string(),
            model_id: model_id.to_string(),
        })
    }
}

/// Builder for the events of one assistant turn.
///
/// Text is streamed token by token, splitting after every space and newline.
#[derive(Debug, Clone)]
pub struct ScriptedTurn {
    session_id: String,
    message_id: String,
    events: Vec<HostEvent>,
}

impl ScriptedTurn {
    #[must_use]
    pub fn new(session_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message_id: message_id.into(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        for token in tokens(text) {
            self.events.push(HostEvent::StreamChunk(StreamChunk::text(
                self.session_id.clone(),
                self.message_id.clone(),
                token,
            )));
        }
        self
    }

    #[must_use]
    pub fn thinking(mut self, text: &str) -> Self {
        self.events.push(HostEvent::StreamChunk(StreamChunk::thinking(
            self.session_id.clone(),
            self.message_id.clone(),
            text,
        )));
        self
    }

    #[must_use]
    pub fn tool_update(mut self, update: ToolCallUpdate) -> Self {
        self.events.push(HostEvent::StreamChunk(StreamChunk::tool_call(
            self.session_id.clone(),
            self.message_id.clone(),
            update,
        )));
        self
    }

    /// Starts a tool call as `running` with a title and kind.
    #[must_use]
    pub fn tool_started(self, tool_call_id: &str, title: &str, kind: ToolKind) -> Self {
        self.tool_update(
            ToolCallUpdate::new(tool_call_id)
                .with_status(ToolCallStatus::Running)
                .with_title(title)
                .with_kind(kind),
        )
    }

    /// Finishes a tool call with plain-text output.
    #[must_use]
    pub fn tool_finished(self, tool_call_id: &str, output: &str) -> Self {
        self.tool_update(
            ToolCallUpdate::new(tool_call_id)
                .with_status(ToolCallStatus::Completed)
                .with_content(vec![ToolCallContent::text(output)]),
        )
    }

    #[must_use]
    pub fn plan(mut self, entries: Vec<PlanEntry>) -> Self {
        self.events.push(HostEvent::PlanUpdate(PlanUpdateEvent {
            session_id: self.session_id.clone(),
            message_id: self.message_id.clone(),
            entries,
        }));
        self
    }

    #[must_use]
    pub fn complete(mut self) -> Self {
        self.events.push(HostEvent::StreamChunk(StreamChunk::complete(
            self.session_id.clone(),
            self.message_id.clone(),
        )));
        self
    }

    #[must_use]
    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<HostEvent> {
        self.events
    }

    /// The script as `(channel name, payload)` pairs.
    pub fn into_payloads(self) -> Result<Vec<(&'static str, Value)>, serde_json::Error> {
        self.events
            .iter()
            .map(|event| {
                let (kind, payload) = event.to_payload()?;
                Ok((kind.name(), payload))
            })
            .collect()
    }
}

fn tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending_token = String::new();
    for ch in text.chars() {
        pending_token.push(ch);
        if matches!(ch, ' ' | '\n') {
            tokens.push(std::mem::take(&mut pending_token));
        }
    }
    if !pending_token.is_empty() {
        tokens.push(pending_token);
    }
    tokens
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
