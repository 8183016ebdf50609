//! Event channel adapter.
//!
//! Normalizes named host payloads into [`HostEvent`] records and routes them
//! to exactly one owned subscriber per event kind. Subscriptions live until
//! they are explicitly removed; a second subscriber for the same kind is
//! refused rather than stacked.

use std::collections::BTreeMap;

use agent_events::{
    AvailableCommandsEvent, EventKind, HostEvent, InteractionPrompt, PlanUpdateEvent,
    SessionStatusEvent, StreamChunk,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{EventDecodeError, SubscribeError};

/// Decodes a payload received on the channel called `name`.
pub fn decode_event(name: &str, payload: Value) -> Result<HostEvent, EventDecodeError> {
    let kind = EventKind::from_name(name).ok_or_else(|| EventDecodeError::UnknownKind {
        name: name.to_string(),
    })?;
    decode_kind(kind, payload)
}

pub fn decode_kind(kind: EventKind, payload: Value) -> Result<HostEvent, EventDecodeError> {
    let event = match kind {
        EventKind::StreamChunk => HostEvent::StreamChunk(decode::<StreamChunk>(kind, payload)?),
        EventKind::InteractionPrompt => {
            HostEvent::InteractionPrompt(decode::<InteractionPrompt>(kind, payload)?)
        }
        EventKind::SessionStatusChanged => {
            HostEvent::SessionStatusChanged(decode::<SessionStatusEvent>(kind, payload)?)
        }
        EventKind::AvailableCommandsUpdate => {
            HostEvent::AvailableCommandsUpdate(decode::<AvailableCommandsEvent>(kind, payload)?)
        }
        EventKind::PlanUpdate => HostEvent::PlanUpdate(decode::<PlanUpdateEvent>(kind, payload)?),
    };

    Ok(event)
}

fn decode<T: DeserializeOwned>(kind: EventKind, payload: Value) -> Result<T, EventDecodeError> {
    serde_json::from_value(payload).map_err(|source| EventDecodeError::Payload { kind, source })
}

pub type EventHandler = Box<dyn FnMut(HostEvent) + Send>;

/// Process-wide event channel with one owned handler per event kind.
#[derive(Default)]
pub struct EventChannel {
    handlers: BTreeMap<EventKind, EventHandler>,
}

impl EventChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: EventHandler,
    ) -> Result<(), SubscribeError> {
        if self.handlers.contains_key(&kind) {
            return Err(SubscribeError::AlreadySubscribed { kind });
        }

        self.handlers.insert(kind, handler);
        Ok(())
    }

    /// Removes the subscriber for `kind`, returning whether one existed.
    pub fn unsubscribe(&mut self, kind: EventKind) -> bool {
        self.handlers.remove(&kind).is_some()
    }

    #[must_use]
    pub fn is_subscribed(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }

    /// Drops every subscriber; returns how many were removed.
    pub fn teardown(&mut self) -> usize {
        let removed = self.handlers.len();
        self.handlers.clear();
        removed
    }

    /// Decodes and delivers one payload.
    ///
    /// Returns `Ok(false)` when the payload was valid but no subscriber for its
    /// kind is registered.
    pub fn dispatch(&mut self, name: &str, payload: Value) -> Result<bool, EventDecodeError> {
        let event = decode_event(name, payload)?;
        Ok(self.deliver(event))
    }

    /// Delivers an already-typed event.
    pub fn deliver(&mut self, event: HostEvent) -> bool {
        let kind = event.kind();
        match self.handlers.get_mut(&kind) {
            Some(handler) => {
                trace!(event = kind.name(), session_id = %event.session_id(), "delivering event");
                handler(event);
                true
            }
            None => {
                debug!(event = kind.name(), "no subscriber for event");
                false
            }
        }
    }
}
