use agent_events::EventKind;
use thiserror::Error;

/// Precondition failure of a user-initiated action.
///
/// These are returned before anything is sent to the host; a failed host RPC
/// is never reported through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown session '{session_id}'")]
    UnknownSession { session_id: String },

    #[error("session '{session_id}' has a pending prompt; answer it instead of sending")]
    PromptPending { session_id: String },

    #[error("input is disabled for session '{session_id}' while it is {activity}")]
    InputDisabled {
        session_id: String,
        activity: &'static str,
    },

    #[error("session '{session_id}' has no pending prompt")]
    NoPendingPrompt { session_id: String },

    #[error("message is empty")]
    EmptyMessage,

    #[error("session '{session_id}' has no backend session to resume")]
    NotResumable { session_id: String },
}

/// Inbound payload could not be normalized into a typed event.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("unknown event kind '{name}'")]
    UnknownKind { name: String },

    #[error("malformed {} payload: {source}", kind.name())]
    Payload {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("event kind '{}' already has a subscriber", kind.name())]
    AlreadySubscribed { kind: EventKind },
}
