//! Per-session message timeline.
//!
//! Chunks are applied in arrival order. For every session at most one message
//! is streaming and it is always the last one; completion flips a message to
//! final exactly once and hands back a snapshot for persistence.

use std::collections::HashMap;

use agent_events::{
    ChatMessage, ChunkType, ImageContent, MessagePart, StreamChunk, ToolCallUpdate,
};
use tracing::{debug, warn};

use crate::tool_call::{self, MergeOutcome};

/// What applying one chunk did to the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// A new streaming message was appended. An older message that was still
    /// streaming in the same session is returned finalized.
    Started { superseded: Option<ChatMessage> },
    /// Content was applied to the streaming message.
    Appended,
    /// Content arrived for a message that is already final; applied in memory.
    LateAppend,
    /// The message was finalized by this chunk.
    Completed(ChatMessage),
    /// Completion for a message this timeline never saw.
    UnknownCompletion,
    /// Completion for a message that is already final.
    RepeatedCompletion,
}

impl ChunkOutcome {
    /// Messages that became final and must be persisted.
    #[must_use]
    pub fn into_finalized(self) -> Vec<ChatMessage> {
        match self {
            Self::Started {
                superseded: Some(message),
            }
            | Self::Completed(message) => vec![message],
            _ => Vec::new(),
        }
    }
}

/// Normalized body of a chunk after degrading unexpected shapes to text.
enum ChunkBody {
    Text(String),
    Thinking(String),
    Image(ImageContent),
    ToolCall(ToolCallUpdate),
}

impl ChunkBody {
    fn from_chunk(chunk: StreamChunk) -> Self {
        let StreamChunk {
            session_id,
            message_id,
            content,
            chunk_type,
            tool_call,
            image,
            ..
        } = chunk;

        match chunk_type.unwrap_or(ChunkType::Text) {
            ChunkType::Text => Self::Text(content),
            ChunkType::Thinking => Self::Thinking(content),
            ChunkType::ToolCall => match tool_call {
                Some(update) => Self::ToolCall(update),
                None => {
                    debug!(%session_id, %message_id, "tool_call chunk without payload");
                    Self::Text(content)
                }
            },
            ChunkType::Image => match image {
                Some(image) => Self::Image(image),
                None => {
                    debug!(%session_id, %message_id, "image chunk without payload");
                    Self::Text(content)
                }
            },
            ChunkType::Unknown => {
                debug!(%session_id, %message_id, "unknown chunk type; treating as text");
                Self::Text(content)
            }
        }
    }

    fn apply_to(self, message: &mut ChatMessage) {
        match self {
            Self::Text(text) => append_text(message, &text),
            Self::Thinking(text) => append_thinking(message, &text),
            Self::Image(image) => message.parts.push(MessagePart::image(image)),
            Self::ToolCall(update) => merge_tool_call(message, update),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    sessions: HashMap<String, Vec<ChatMessage>>,
}

impl Timeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self, session_id: &str) -> &[ChatMessage] {
        self.sessions
            .get(session_id)
            .map_or(&[][..], |messages| messages.as_slice())
    }

    #[must_use]
    pub fn message(&self, session_id: &str, message_id: &str) -> Option<&ChatMessage> {
        self.messages(session_id)
            .iter()
            .rev()
            .find(|message| message.id == message_id)
    }

    #[must_use]
    pub fn streaming_message(&self, session_id: &str) -> Option<&ChatMessage> {
        self.messages(session_id)
            .last()
            .filter(|message| message.is_streaming)
    }

    /// Sessions that currently hold a streaming message, sorted.
    #[must_use]
    pub fn sessions_with_streaming(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, messages)| messages.iter().any(|message| message.is_streaming))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Appends a message created locally (for example a user turn).
    ///
    /// A message that is still streaming is finalized first and returned.
    pub fn push_message(&mut self, message: ChatMessage) -> Option<ChatMessage> {
        let messages = self.sessions.entry(message.session_id.clone()).or_default();
        let superseded = finalize_streaming_tail(messages);
        messages.push(message);
        superseded
    }

    /// Replaces a session's history with previously persisted messages.
    ///
    /// Restored messages are always final.
    pub fn restore(&mut self, session_id: &str, mut messages: Vec<ChatMessage>) {
        for message in &mut messages {
            message.is_streaming = false;
        }
        self.sessions.insert(session_id.to_string(), messages);
    }

    pub fn remove_session(&mut self, session_id: &str) -> Vec<ChatMessage> {
        self.sessions.remove(session_id).unwrap_or_default()
    }

    pub fn apply_chunk(&mut self, chunk: StreamChunk) -> ChunkOutcome {
        let is_complete = chunk.is_complete;
        let messages = self.sessions.entry(chunk.session_id.clone()).or_default();
        let position = messages
            .iter()
            .rposition(|message| message.id == chunk.message_id);

        let Some(index) = position else {
            if is_complete {
                debug!(
                    session_id = %chunk.session_id,
                    message_id = %chunk.message_id,
                    "ignoring completion for unknown message"
                );
                return ChunkOutcome::UnknownCompletion;
            }

            let superseded = finalize_streaming_tail(messages);
            if let Some(previous) = superseded.as_ref() {
                warn!(
                    session_id = %previous.session_id,
                    message_id = %previous.id,
                    "finalizing message superseded by a new stream"
                );
            }

            let mut message = ChatMessage::assistant_streaming(
                chunk.session_id.clone(),
                chunk.message_id.clone(),
            );
            ChunkBody::from_chunk(chunk).apply_to(&mut message);
            messages.push(message);
            return ChunkOutcome::Started { superseded };
        };

        let message = &mut messages[index];
        if !message.is_streaming {
            if is_complete {
                return ChunkOutcome::RepeatedCompletion;
            }

            debug!(
                session_id = %message.session_id,
                message_id = %message.id,
                "applying late chunk to a final message"
            );
            ChunkBody::from_chunk(chunk).apply_to(message);
            return ChunkOutcome::LateAppend;
        }

        ChunkBody::from_chunk(chunk).apply_to(message);
        if !is_complete {
            return ChunkOutcome::Appended;
        }

        message.is_streaming = false;
        ChunkOutcome::Completed(message.clone())
    }

    /// Finalizes every streaming message of a session for shutdown.
    ///
    /// Non-terminal tool calls in those messages are forced to `interrupted`.
    /// Returns the finalized messages and the number of interrupted calls.
    pub fn finalize_for_teardown(&mut self, session_id: &str) -> (Vec<ChatMessage>, usize) {
        let Some(messages) = self.sessions.get_mut(session_id) else {
            return (Vec::new(), 0);
        };

        let mut finalized = Vec::new();
        let mut interrupted = 0;
        for message in messages.iter_mut().filter(|message| message.is_streaming) {
            for call in &mut message.tool_calls {
                if tool_call::interrupt(call) {
                    interrupted += 1;
                }
            }
            message.is_streaming = false;
            finalized.push(message.clone());
        }

        (finalized, interrupted)
    }
}

fn finalize_streaming_tail(messages: &mut [ChatMessage]) -> Option<ChatMessage> {
    let last = messages.last_mut()?;
    if !last.is_streaming {
        return None;
    }

    last.is_streaming = false;
    Some(last.clone())
}

fn append_text(message: &mut ChatMessage, text: &str) {
    if text.is_empty() {
        return;
    }

    message.content.push_str(text);
    match message.parts.last_mut() {
        Some(MessagePart::Text { text: tail }) => tail.push_str(text),
        _ => message.parts.push(MessagePart::text(text)),
    }
}

fn append_thinking(message: &mut ChatMessage, text: &str) {
    if text.is_empty() {
        return;
    }

    match message.parts.last_mut() {
        Some(MessagePart::Thinking { text: tail }) => tail.push_str(text),
        _ => message.parts.push(MessagePart::Thinking {
            text: text.to_string(),
        }),
    }
}

fn merge_tool_call(message: &mut ChatMessage, update: ToolCallUpdate) {
    if let Some(existing) = message.tool_call_mut(&update.tool_call_id) {
        if let MergeOutcome::TransitionRejected { from, to } = tool_call::merge(existing, update) {
            debug!(
                session_id = %message.session_id,
                message_id = %message.id,
                from = from.as_str(),
                to = to.as_str(),
                "kept terminal tool call status"
            );
        }
        return;
    }

    let info = tool_call::create(update);
    message
        .parts
        .push(MessagePart::tool_call(info.tool_call_id.clone()));
    message.tool_calls.push(info);
}
