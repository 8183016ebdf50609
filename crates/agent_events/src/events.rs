use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::ImageContent;
use crate::session::{Session, SessionStatus};
use crate::tool_call::ToolCallUpdate;

/// Payload discriminator of a stream chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Text,
    Thinking,
    ToolCall,
    Image,
    /// Any tag this client does not know; reconciled as text.
    #[serde(other)]
    Unknown,
}

/// One inbound unit of streamed content for a single message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunk {
    pub session_id: String,
    pub message_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_type: Option<ChunkType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallUpdate>,
    #[serde(default, alias = "imageContent", skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageContent>,
}

impl StreamChunk {
    #[must_use]
    pub fn text(
        session_id: impl Into<String>,
        message_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            message_id: message_id.into(),
            content: content.into(),
            is_complete: false,
            chunk_type: Some(ChunkType::Text),
            tool_call: None,
            image: None,
        }
    }

    #[must_use]
    pub fn thinking(
        session_id: impl Into<String>,
        message_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            chunk_type: Some(ChunkType::Thinking),
            ..Self::text(session_id, message_id, content)
        }
    }

    #[must_use]
    pub fn tool_call(
        session_id: impl Into<String>,
        message_id: impl Into<String>,
        update: ToolCallUpdate,
    ) -> Self {
        Self {
            chunk_type: Some(ChunkType::ToolCall),
            tool_call: Some(update),
            ..Self::text(session_id, message_id, "")
        }
    }

    #[must_use]
    pub fn image(
        session_id: impl Into<String>,
        message_id: impl Into<String>,
        image: ImageContent,
    ) -> Self {
        Self {
            chunk_type: Some(ChunkType::Image),
            image: Some(image),
            ..Self::text(session_id, message_id, "")
        }
    }

    /// End-of-message marker with no content.
    #[must_use]
    pub fn complete(session_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            chunk_type: None,
            is_complete: true,
            ..Self::text(session_id, message_id, "")
        }
    }

    #[must_use]
    pub fn completing(mut self) -> Self {
        self.is_complete = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    Confirm,
    Input,
    Permission,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionOption {
    pub kind: String,
    pub name: String,
    pub option_id: String,
}

/// A pending question from the agent to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionPrompt {
    pub session_id: String,
    pub prompt_type: PromptType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<PermissionOption>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusEvent {
    pub session_id: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableCommandInput {
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableCommand {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<AvailableCommandInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableCommandsEvent {
    pub session_id: String,
    #[serde(default, alias = "availableCommands")]
    pub commands: Vec<AvailableCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanEntryStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanEntryPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub content: String,
    pub status: PlanEntryStatus,
    pub priority: PlanEntryPriority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanUpdateEvent {
    pub session_id: String,
    pub message_id: String,
    #[serde(default)]
    pub entries: Vec<PlanEntry>,
}

/// The five event kinds pushed by the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    StreamChunk,
    InteractionPrompt,
    SessionStatusChanged,
    AvailableCommandsUpdate,
    PlanUpdate,
}

impl EventKind {
    pub const ALL: [Self; 5] = [
        Self::StreamChunk,
        Self::InteractionPrompt,
        Self::SessionStatusChanged,
        Self::AvailableCommandsUpdate,
        Self::PlanUpdate,
    ];

    /// Channel name used by the host process.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::StreamChunk => "stream-chunk",
            Self::InteractionPrompt => "interaction-prompt",
            Self::SessionStatusChanged => "session-status-changed",
            Self::AvailableCommandsUpdate => "available-commands-update",
            Self::PlanUpdate => "plan-update",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Typed record of one inbound host event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    StreamChunk(StreamChunk),
    InteractionPrompt(InteractionPrompt),
    SessionStatusChanged(SessionStatusEvent),
    AvailableCommandsUpdate(AvailableCommandsEvent),
    PlanUpdate(PlanUpdateEvent),
}

impl HostEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StreamChunk(_) => EventKind::StreamChunk,
            Self::InteractionPrompt(_) => EventKind::InteractionPrompt,
            Self::SessionStatusChanged(_) => EventKind::SessionStatusChanged,
            Self::AvailableCommandsUpdate(_) => EventKind::AvailableCommandsUpdate,
            Self::PlanUpdate(_) => EventKind::PlanUpdate,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::StreamChunk(chunk) => &chunk.session_id,
            Self::InteractionPrompt(prompt) => &prompt.session_id,
            Self::SessionStatusChanged(event) => &event.session_id,
            Self::AvailableCommandsUpdate(event) => &event.session_id,
            Self::PlanUpdate(event) => &event.session_id,
        }
    }

    /// Serializes the payload back into its channel form.
    pub fn to_payload(&self) -> Result<(EventKind, Value), serde_json::Error> {
        let payload = match self {
            Self::StreamChunk(chunk) => serde_json::to_value(chunk)?,
            Self::InteractionPrompt(prompt) => serde_json::to_value(prompt)?,
            Self::SessionStatusChanged(event) => serde_json::to_value(event)?,
            Self::AvailableCommandsUpdate(event) => serde_json::to_value(event)?,
            Self::PlanUpdate(event) => serde_json::to_value(event)?,
        };

        Ok((self.kind(), payload))
    }
}
