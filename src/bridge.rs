use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use agent_events::{EventKind, HostError, HostEvent, HostOps};
use serde_json::Value;
use tracing::debug;

use crate::adapter::EventChannel;
use crate::error::{ActionError, EventDecodeError, SubscribeError};
use crate::state::{ChatState, Effect};
use crate::teardown::{FlushReport, TeardownGuard};

/// A host call that failed while running an effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectFailure {
    pub effect: &'static str,
    pub session_id: String,
    pub error: HostError,
}

/// Connects the event channel, the shared [`ChatState`] and the host.
///
/// Inbound events are queued by the channel subscribers and applied by
/// [`HostBridge::drain_pending_events`]. Host calls produced by events or
/// actions always run after the state lock is released.
pub struct HostBridge {
    state: Arc<Mutex<ChatState>>,
    host: Arc<dyn HostOps>,
    pending_events: Arc<Mutex<VecDeque<HostEvent>>>,
    channel: Mutex<EventChannel>,
    teardown: TeardownGuard,
}

impl HostBridge {
    pub fn new(state: ChatState, host: Arc<dyn HostOps>) -> Result<Self, SubscribeError> {
        let state = Arc::new(Mutex::new(state));
        let pending_events = Arc::new(Mutex::new(VecDeque::new()));

        let mut channel = EventChannel::new();
        for kind in EventKind::ALL {
            let queue = Arc::clone(&pending_events);
            channel.subscribe(
                kind,
                Box::new(move |event| lock_unpoisoned(&queue).push_back(event)),
            )?;
        }

        Ok(Self {
            teardown: TeardownGuard::new(Arc::clone(&state), Arc::clone(&host)),
            state,
            host,
            pending_events,
            channel: Mutex::new(channel),
        })
    }

    /// Decodes and queues one named payload from the host.
    ///
    /// Returns `Ok(false)` after shutdown, when no subscriber is left.
    pub fn push_event(&self, name: &str, payload: Value) -> Result<bool, EventDecodeError> {
        lock_unpoisoned(&self.channel).dispatch(name, payload)
    }

    pub fn push_host_event(&self, event: HostEvent) -> bool {
        lock_unpoisoned(&self.channel).deliver(event)
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        lock_unpoisoned(&self.pending_events).len()
    }

    /// Applies every queued event in arrival order and runs resulting effects.
    pub fn drain_pending_events(&self) -> usize {
        let mut drained = 0usize;

        loop {
            let event = {
                let mut pending_events = lock_unpoisoned(&self.pending_events);
                pending_events.pop_front()
            };

            let Some(event) = event else {
                break;
            };
            let effects = lock_unpoisoned(&self.state).apply_event(event);
            self.run_effects(effects);
            drained += 1;
        }

        drained
    }

    pub fn submit(&self, session_id: &str, text: &str) -> Result<Vec<EffectFailure>, ActionError> {
        self.act(|state| state.submit(session_id, text))
    }

    pub fn send_message(
        &self,
        session_id: &str,
        content: &str,
    ) -> Result<Vec<EffectFailure>, ActionError> {
        self.act(|state| state.send_message(session_id, content))
    }

    pub fn resolve_prompt(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<Vec<EffectFailure>, ActionError> {
        self.act(|state| state.resolve_prompt(session_id, text))
    }

    pub fn stop(&self, session_id: &str) -> Result<Vec<EffectFailure>, ActionError> {
        self.act(|state| state.stop(session_id))
    }

    pub fn resume(&self, session_id: &str) -> Result<Vec<EffectFailure>, ActionError> {
        self.act(|state| state.resume(session_id))
    }

    pub fn terminate(
        &self,
        session_id: &str,
        cleanup: bool,
    ) -> Result<Vec<EffectFailure>, ActionError> {
        self.act(|state| state.terminate(session_id, cleanup))
    }

    pub fn set_mode(
        &self,
        session_id: &str,
        mode_id: &str,
    ) -> Result<Vec<EffectFailure>, ActionError> {
        self.act(|state| state.set_mode(session_id, mode_id))
    }

    pub fn set_model(
        &self,
        session_id: &str,
        model_id: &str,
    ) -> Result<Vec<EffectFailure>, ActionError> {
        self.act(|state| state.set_model(session_id, model_id))
    }

    pub fn with_state<R>(&self, read: impl FnOnce(&ChatState) -> R) -> R {
        let state = lock_unpoisoned(&self.state);
        read(&state)
    }

    pub fn with_state_mut<R>(&self, update: impl FnOnce(&mut ChatState) -> R) -> R {
        let mut state = lock_unpoisoned(&self.state);
        update(&mut state)
    }

    #[must_use]
    pub fn teardown_guard(&self) -> &TeardownGuard {
        &self.teardown
    }

    /// Drops every subscription, applies what is still queued, then flushes.
    ///
    /// Returns `None` when the flush already ran.
    pub fn shutdown(&self) -> Option<FlushReport> {
        let removed = lock_unpoisoned(&self.channel).teardown();
        debug!(subscribers = removed, "event channel torn down");
        self.drain_pending_events();
        self.teardown.flush()
    }

    fn act(
        &self,
        action: impl FnOnce(&mut ChatState) -> Result<Vec<Effect>, ActionError>,
    ) -> Result<Vec<EffectFailure>, ActionError> {
        let effects = {
            let mut state = lock_unpoisoned(&self.state);
            action(&mut state)?
        };
        Ok(self.run_effects(effects))
    }

    fn run_effects(&self, effects: Vec<Effect>) -> Vec<EffectFailure> {
        let mut failures = Vec::new();
        for effect in effects {
            if let Err(error) = effect.run(self.host.as_ref()) {
                lock_unpoisoned(&self.state).record_failure(&effect, &error);
                failures.push(EffectFailure {
                    effect: effect.name(),
                    session_id: effect.session_id().to_string(),
                    error,
                });
            }
        }
        failures
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
