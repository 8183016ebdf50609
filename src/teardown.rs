//! Flush-on-teardown.
//!
//! At exit every message still marked streaming is finalized, its open tool
//! calls are forced to `interrupted`, and it is handed to persistence once.
//! Persistence failures are logged and counted, never retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use agent_events::{ChatMessage, HostOps};
use tracing::{info, warn};

use crate::bridge::lock_unpoisoned;
use crate::registry::Activity;
use crate::state::ChatState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub sessions: usize,
    pub messages: usize,
    pub interrupted_tool_calls: usize,
    pub persist_failures: usize,
}

/// Messages finalized by [`collect_unflushed`], not yet persisted.
#[derive(Debug, Clone, Default)]
pub struct Unflushed {
    pub sessions: usize,
    pub messages: Vec<ChatMessage>,
    pub interrupted_tool_calls: usize,
}

/// Finalizes every streaming message in `state`.
///
/// Sessions in the streaming set are visited along with any session that
/// still holds a streaming message without being in that set.
pub fn collect_unflushed(state: &mut ChatState) -> Unflushed {
    let mut session_ids = state.registry().members(Activity::Streaming);
    session_ids.extend(state.timeline().sessions_with_streaming());
    session_ids.sort();
    session_ids.dedup();

    let mut unflushed = Unflushed::default();
    for session_id in session_ids {
        state
            .registry_mut()
            .clear_activity(&session_id, Activity::Streaming);

        let (messages, interrupted) = state.timeline_mut().finalize_for_teardown(&session_id);
        if messages.is_empty() {
            continue;
        }

        unflushed.sessions += 1;
        unflushed.interrupted_tool_calls += interrupted;
        unflushed.messages.extend(messages);
    }

    unflushed
}

/// Hands collected messages to persistence; returns the summary.
pub fn persist_unflushed(unflushed: Unflushed, host: &dyn HostOps) -> FlushReport {
    let mut report = FlushReport {
        sessions: unflushed.sessions,
        messages: unflushed.messages.len(),
        interrupted_tool_calls: unflushed.interrupted_tool_calls,
        persist_failures: 0,
    };

    for message in &unflushed.messages {
        if let Err(error) = host.save_message(message) {
            report.persist_failures += 1;
            warn!(
                session_id = %message.session_id,
                message_id = %message.id,
                error = %error,
                "failed to persist message during teardown"
            );
        }
    }

    info!(
        sessions = report.sessions,
        messages = report.messages,
        interrupted_tool_calls = report.interrupted_tool_calls,
        persist_failures = report.persist_failures,
        "teardown flush finished"
    );
    report
}

/// Runs the flush exactly once, on demand or when dropped.
pub struct TeardownGuard {
    state: Arc<Mutex<ChatState>>,
    host: Arc<dyn HostOps>,
    fired: AtomicBool,
}

impl TeardownGuard {
    pub fn new(state: Arc<Mutex<ChatState>>, host: Arc<dyn HostOps>) -> Self {
        Self {
            state,
            host,
            fired: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Returns `None` if the flush already ran.
    pub fn flush(&self) -> Option<FlushReport> {
        if self.fired.swap(true, Ordering::SeqCst) {
            return None;
        }

        let unflushed = {
            let mut state = lock_unpoisoned(&self.state);
            collect_unflushed(&mut state)
        };
        Some(persist_unflushed(unflushed, self.host.as_ref()))
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
