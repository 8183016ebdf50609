use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::tool_call::ToolCallInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Inline binary content carried by an image chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    pub data: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// One ordered fragment of a message.
///
/// `ToolCall` only references a record in [`ChatMessage::tool_calls`] so that
/// repeated updates for the same call mutate one record without reordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Thinking {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
    },
    ToolCall {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
    },
}

impl MessagePart {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn tool_call(tool_call_id: impl Into<String>) -> Self {
        Self::ToolCall {
            tool_call_id: tool_call_id.into(),
        }
    }

    #[must_use]
    pub fn image(image: ImageContent) -> Self {
        Self::Image {
            data: image.data,
            mime_type: image.mime_type,
            uri: image.uri,
        }
    }
}

/// One turn of a session timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    /// Plain-text projection of every text fragment, in arrival order.
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
    /// Tool-call records in first-seen order; parts reference them by id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallInfo>,
    pub timestamp: String,
    pub is_streaming: bool,
}

impl ChatMessage {
    /// Creates a final user message with a fresh id.
    #[must_use]
    pub fn user(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: new_message_id(),
            session_id: session_id.into(),
            role: Role::User,
            parts: vec![MessagePart::text(content.clone())],
            content,
            tool_calls: Vec::new(),
            timestamp: now_rfc3339(),
            is_streaming: false,
        }
    }

    /// Creates an empty streaming assistant message keyed by the host's id.
    #[must_use]
    pub fn assistant_streaming(session_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            role: Role::Assistant,
            content: String::new(),
            parts: Vec::new(),
            tool_calls: Vec::new(),
            timestamp: now_rfc3339(),
            is_streaming: true,
        }
    }

    #[must_use]
    pub fn tool_call(&self, tool_call_id: &str) -> Option<&ToolCallInfo> {
        self.tool_calls
            .iter()
            .find(|call| call.tool_call_id == tool_call_id)
    }

    pub fn tool_call_mut(&mut self, tool_call_id: &str) -> Option<&mut ToolCallInfo> {
        self.tool_calls
            .iter_mut()
            .find(|call| call.tool_call_id == tool_call_id)
    }
}

#[must_use]
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current UTC time as RFC3339; empty only if the clock is out of range.
#[must_use]
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
