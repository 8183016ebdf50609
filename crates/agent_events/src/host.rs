use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::ChatMessage;

/// Failure reported by an outbound host RPC.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostError {
    message: String,
}

impl HostError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HostError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HostError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// User answer to an interaction prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResponse {
    pub session_id: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_id: Option<String>,
}

/// Outbound RPCs invoked on the host process.
///
/// Return values report transport failures only; callers must not derive
/// timeline state from them. State changes arrive as inbound events.
pub trait HostOps: Send + Sync {
    fn send_message(&self, session_id: &str, content: &str) -> Result<(), HostError>;

    fn send_interaction_response(&self, response: &InteractionResponse) -> Result<(), HostError>;

    /// Persists a finalized message.
    fn save_message(&self, message: &ChatMessage) -> Result<(), HostError>;

    /// Requests that the agent stops generating for the session.
    fn cancel_generation(&self, session_id: &str) -> Result<(), HostError>;

    fn terminate_session(&self, session_id: &str, cleanup: bool) -> Result<(), HostError>;

    fn resume_session(&self, session_id: &str) -> Result<(), HostError>;

    fn set_session_mode(&self, session_id: &str, mode_id: &str) -> Result<(), HostError>;

    fn set_session_model(&self, session_id: &str, model_id: &str) -> Result<(), HostError>;
}
