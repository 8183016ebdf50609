use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::patch::Patch;

/// Lifecycle state of one tool invocation.
///
/// Inbound payloads may use the protocol spellings `in_progress` and `failed`;
/// both are folded into the canonical states on decode. Any other spelling
/// decodes as `Unknown`, which never replaces a known status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    #[serde(alias = "in_progress")]
    Running,
    Completed,
    #[serde(alias = "failed")]
    Error,
    Interrupted,
    #[serde(other)]
    Unknown,
}

impl ToolCallStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Interrupted)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Interrupted => "interrupted",
            Self::Unknown => "unknown",
        }
    }
}

/// Agent-declared category of a tool, used only as a display fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Read,
    Edit,
    Delete,
    Move,
    Search,
    Execute,
    Think,
    Fetch,
    SwitchMode,
    #[serde(other)]
    Other,
}

/// One structured content item produced by a tool call.
///
/// `Content` is the protocol's wrapper around a nested content block.
/// Unrecognized item types decode as `Unsupported` instead of failing the
/// whole chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolCallContent {
    Content {
        content: Box<ToolCallContent>,
    },
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    ResourceLink {
        uri: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Diff {
        path: String,
        #[serde(rename = "oldText", default)]
        old_text: Option<String>,
        #[serde(rename = "newText")]
        new_text: String,
    },
    Terminal {
        #[serde(rename = "terminalId")]
        terminal_id: String,
    },
    #[serde(other)]
    Unsupported,
}

impl ToolCallContent {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// A file location touched by a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolLocation {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// Reconciled record of one tool invocation inside a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallInfo {
    pub tool_call_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ToolKind>,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ToolCallContent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ToolLocation>,
}

impl ToolCallInfo {
    /// Creates a pending record with no metadata.
    #[must_use]
    pub fn new(tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: None,
            title: None,
            kind: None,
            status: ToolCallStatus::Pending,
            raw_input: None,
            content: Vec::new(),
            locations: Vec::new(),
        }
    }
}

/// Partial tool-call record as delivered by one stream chunk.
///
/// `status` can be advanced but never cleared, so it is a plain option; every
/// other field distinguishes "not mentioned" from "explicitly cleared".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallUpdate {
    pub tool_call_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolCallStatus>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub tool_name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub title: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub kind: Patch<ToolKind>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub raw_input: Patch<Value>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub content: Patch<Vec<ToolCallContent>>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub locations: Patch<Vec<ToolLocation>>,
}

impl ToolCallUpdate {
    /// Creates an update that mentions no field besides the id.
    #[must_use]
    pub fn new(tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            status: None,
            tool_name: Patch::Keep,
            title: Patch::Keep,
            kind: Patch::Keep,
            raw_input: Patch::Keep,
            content: Patch::Keep,
            locations: Patch::Keep,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: ToolCallStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Patch::Set(tool_name.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Patch::Set(title.into());
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ToolKind) -> Self {
        self.kind = Patch::Set(kind);
        self
    }

    #[must_use]
    pub fn with_raw_input(mut self, raw_input: Value) -> Self {
        self.raw_input = Patch::Set(raw_input);
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: Vec<ToolCallContent>) -> Self {
        self.content = Patch::Set(content);
        self
    }

    #[must_use]
    pub fn with_locations(mut self, locations: Vec<ToolLocation>) -> Self {
        self.locations = Patch::Set(locations);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ToolCallContent, ToolCallStatus, ToolCallUpdate, ToolKind};
    use crate::patch::Patch;

    #[test]
    fn status_aliases_fold_into_canonical_states() {
        let running: ToolCallStatus = serde_json::from_value(json!("in_progress")).expect("alias");
        let error: ToolCallStatus = serde_json::from_value(json!("failed")).expect("alias");

        assert_eq!(running, ToolCallStatus::Running);
        assert_eq!(error, ToolCallStatus::Error);
        assert!(!ToolCallStatus::Running.is_terminal());
        assert!(ToolCallStatus::Interrupted.is_terminal());
    }

    #[test]
    fn unrecognized_status_and_content_degrade() {
        let status: ToolCallStatus = serde_json::from_value(json!("cancelled")).expect("fallback");
        assert_eq!(status, ToolCallStatus::Unknown);
        assert!(!status.is_terminal());

        let content: Vec<ToolCallContent> = serde_json::from_value(json!([
            { "type": "content", "content": { "type": "text", "text": "ok" } },
            { "type": "audio", "data": "AAAA", "mimeType": "audio/wav" }
        ]))
        .expect("content decodes");
        assert_eq!(
            content,
            vec![
                ToolCallContent::Content {
                    content: Box::new(ToolCallContent::text("ok")),
                },
                ToolCallContent::Unsupported,
            ]
        );
    }

    #[test]
    fn unknown_kind_decodes_as_other() {
        let kind: ToolKind = serde_json::from_value(json!("teleport")).expect("fallback");
        assert_eq!(kind, ToolKind::Other);
    }

    #[test]
    fn update_payload_keeps_absent_fields_distinct_from_null() {
        let update: ToolCallUpdate = serde_json::from_value(json!({
            "toolCallId": "call-1",
            "status": "completed",
            "title": null,
            "content": [
                { "type": "text", "text": "done" },
                { "type": "diff", "path": "src/lib.rs", "oldText": "a", "newText": "b" }
            ]
        }))
        .expect("update decodes");

        assert_eq!(update.status, Some(ToolCallStatus::Completed));
        assert_eq!(update.title, Patch::Clear);
        assert_eq!(update.tool_name, Patch::Keep);
        assert_eq!(
            update.content,
            Patch::Set(vec![
                ToolCallContent::text("done"),
                ToolCallContent::Diff {
                    path: "src/lib.rs".to_string(),
                    old_text: Some("a".to_string()),
                    new_text: "b".to_string(),
                },
            ])
        );
    }
}
