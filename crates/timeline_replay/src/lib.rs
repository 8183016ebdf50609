//! Replays a recorded host event log through the timeline engine.
//!
//! Finalized messages are persisted into a [`message_store::MessageStore`];
//! other outbound RPCs are written as JSON lines to a caller-provided sink.

mod host;
mod replay;

pub use host::{OutboundRecord, StoreHost};
pub use replay::{restore_from_store, replay_reader, ReplayError, ReplayLine, ReplaySummary};
