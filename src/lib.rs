//! Client-side reconciliation of multi-session agent conversations.
//!
//! Events pushed by an agent host are decoded by the [`adapter`], folded into
//! per-session timelines by [`ChatState`], and turned into host calls
//! ([`Effect`]) that a [`HostBridge`] runs outside the state lock.
//!
//! Invariant: per session, at most one message is streaming and it is the
//! last one in the timeline.
//!
//! # Public API Overview
//! - Feed raw named payloads into [`HostBridge::push_event`] and apply them with
//!   [`HostBridge::drain_pending_events`].
//! - Drive user actions (send, answer prompt, stop, resume, terminate) through
//!   the bridge or directly on [`ChatState`].
//! - Build the ordered render sequence of a message with [`render_sequence`].
//! - Flush in-flight messages at exit with [`TeardownGuard`].

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod error;
pub mod interaction;
pub mod logging;
pub mod registry;
pub mod render;
pub mod state;
pub mod teardown;
pub mod timeline;
pub mod tool_call;

pub use crate::adapter::{decode_event, decode_kind, EventChannel, EventHandler};
pub use crate::bridge::{EffectFailure, HostBridge};
pub use crate::config::EnvConfig;
pub use crate::error::{ActionError, EventDecodeError, SubscribeError};
pub use crate::interaction::InteractionCorrelator;
pub use crate::logging::{init_logging, LoggingInitError};
pub use crate::registry::{Activity, Banner, SessionRegistry};
pub use crate::render::{render_sequence, RenderItem};
pub use crate::state::{ChatState, Effect, OutboundAction};
pub use crate::teardown::{
    collect_unflushed, persist_unflushed, FlushReport, TeardownGuard, Unflushed,
};
pub use crate::timeline::{ChunkOutcome, Timeline};
pub use crate::tool_call::{icon_for, MergeOutcome, ToolIcon};
