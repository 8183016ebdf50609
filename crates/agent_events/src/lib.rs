//! Provider-neutral contract between an agent host process and its clients.
//!
//! This crate defines the typed records for the five inbound event kinds, the
//! conversation data model they are reconciled into, and the outbound RPC
//! surface (`HostOps`). It contains no reconciliation logic and no transport.

mod events;
mod host;
mod message;
mod patch;
mod session;
mod tool_call;

pub use events::{
    AvailableCommand, AvailableCommandInput, AvailableCommandsEvent, ChunkType, EventKind,
    HostEvent, InteractionPrompt, PermissionOption, PlanEntry, PlanEntryPriority,
    PlanEntryStatus, PlanUpdateEvent, PromptType, SessionStatusEvent, StreamChunk,
};
pub use host::{HostError, HostOps, InteractionResponse};
pub use message::{new_message_id, now_rfc3339, ChatMessage, ImageContent, MessagePart, Role};
pub use patch::Patch;
pub use session::{ModeOption, ModelOption, Session, SessionStatus};
pub use tool_call::{
    ToolCallContent, ToolCallInfo, ToolCallStatus, ToolCallUpdate, ToolKind, ToolLocation,
};
