use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use agent_events::{ChatMessage, HostError, HostOps, InteractionResponse};
use message_store::MessageStore;
use serde::Serialize;
use tracing::debug;

/// One outbound RPC as written to the outbound sink.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "rpc", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OutboundRecord<'a> {
    SendMessage {
        session_id: &'a str,
        content: &'a str,
    },
    SendInteractionResponse(&'a InteractionResponse),
    CancelGeneration {
        session_id: &'a str,
    },
    TerminateSession {
        session_id: &'a str,
        cleanup: bool,
    },
    ResumeSession {
        session_id: &'a str,
    },
    SetSessionMode {
        session_id: &'a str,
        mode_id: &'a str,
    },
    SetSessionModel {
        session_id: &'a str,
        model_id: &'a str,
    },
}

/// Host backed by a [`MessageStore`] for persistence.
///
/// Every other RPC is written as one JSON line to the outbound sink.
pub struct StoreHost {
    store: Arc<MessageStore>,
    outbound: Mutex<Box<dyn Write + Send>>,
}

impl StoreHost {
    pub fn new(store: Arc<MessageStore>, outbound: Box<dyn Write + Send>) -> Self {
        Self {
            store,
            outbound: Mutex::new(outbound),
        }
    }

    #[must_use]
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    fn emit(&self, record: &OutboundRecord<'_>) -> Result<(), HostError> {
        let line = serde_json::to_string(record)
            .map_err(|error| HostError::new(format!("failed to encode outbound rpc: {error}")))?;
        let mut outbound = lock_unpoisoned(&self.outbound);
        writeln!(outbound, "{line}")
            .and_then(|()| outbound.flush())
            .map_err(|error| HostError::new(format!("failed to write outbound rpc: {error}")))
    }
}

impl HostOps for StoreHost {
    fn send_message(&self, session_id: &str, content: &str) -> Result<(), HostError> {
        self.emit(&OutboundRecord::SendMessage {
            session_id,
            content,
        })
    }

    fn send_interaction_response(&self, response: &InteractionResponse) -> Result<(), HostError> {
        self.emit(&OutboundRecord::SendInteractionResponse(response))
    }

    fn save_message(&self, message: &ChatMessage) -> Result<(), HostError> {
        debug!(
            session_id = %message.session_id,
            message_id = %message.id,
            "persisting message"
        );
        self.store
            .save_message(message)
            .map_err(|error| HostError::new(error.to_string()))
    }

    fn cancel_generation(&self, session_id: &str) -> Result<(), HostError> {
        self.emit(&OutboundRecord::CancelGeneration { session_id })
    }

    fn terminate_session(&self, session_id: &str, cleanup: bool) -> Result<(), HostError> {
        if cleanup {
            self.store
                .remove_session(session_id)
                .map_err(|error| HostError::new(error.to_string()))?;
        }
        self.emit(&OutboundRecord::TerminateSession {
            session_id,
            cleanup,
        })
    }

    fn resume_session(&self, session_id: &str) -> Result<(), HostError> {
        self.emit(&OutboundRecord::ResumeSession { session_id })
    }

    fn set_session_mode(&self, session_id: &str, mode_id: &str) -> Result<(), HostError> {
        self.emit(&OutboundRecord::SetSessionMode {
            session_id,
            mode_id,
        })
    }

    fn set_session_model(&self, session_id: &str, model_id: &str) -> Result<(), HostError> {
        self.emit(&OutboundRecord::SetSessionModel {
            session_id,
            model_id,
        })
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
