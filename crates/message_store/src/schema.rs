use agent_events::ChatMessage;
use serde::{Deserialize, Serialize};

pub const LOG_VERSION: u32 = 1;

/// First line of every log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogHeader {
    pub version: u32,
    pub session_id: String,
    pub created_at: String,
}

impl LogHeader {
    #[must_use]
    pub fn v1(session_id: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            version: LOG_VERSION,
            session_id: session_id.into(),
            created_at: created_at.into(),
        }
    }
}

/// One persisted snapshot of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub ts: String,
    pub message: ChatMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum LogLine {
    Session(LogHeader),
    Message(MessageRecord),
}
