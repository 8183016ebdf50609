//! Ordered render sequence for a message.
//!
//! Messages recorded before parts existed carry only `tool_calls` and
//! `content`; they render as every tool call followed by the text.

use agent_events::{ChatMessage, MessagePart, ToolCallInfo};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderItem<'a> {
    Text(&'a str),
    Thinking(&'a str),
    Image { data: &'a str, mime_type: &'a str },
    ToolCall(&'a ToolCallInfo),
}

#[must_use]
pub fn render_sequence(message: &ChatMessage) -> Vec<RenderItem<'_>> {
    if message.parts.is_empty() {
        return legacy_sequence(message);
    }

    message
        .parts
        .iter()
        .filter_map(|part| match part {
            MessagePart::Text { text } => Some(RenderItem::Text(text)),
            MessagePart::Thinking { text } => Some(RenderItem::Thinking(text)),
            MessagePart::Image {
                data, mime_type, ..
            } => Some(RenderItem::Image { data, mime_type }),
            MessagePart::ToolCall { tool_call_id } => {
                let call = message.tool_call(tool_call_id);
                if call.is_none() {
                    debug!(
                        message_id = %message.id,
                        %tool_call_id,
                        "part references a missing tool call"
                    );
                }
                call.map(RenderItem::ToolCall)
            }
        })
        .collect()
}

fn legacy_sequence(message: &ChatMessage) -> Vec<RenderItem<'_>> {
    let mut items: Vec<RenderItem<'_>> =
        message.tool_calls.iter().map(RenderItem::ToolCall).collect();
    if !message.content.is_empty() {
        items.push(RenderItem::Text(&message.content));
    }
    items
}
