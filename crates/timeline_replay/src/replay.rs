use std::io::BufRead;

use acp_timeline::{FlushReport, HostBridge};
use message_store::{MessageStore, MessageStoreError};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

/// One line of a recorded host event log.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayLine {
    pub event: String,
    pub payload: Value,
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error while reading replay line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("replay line {line} is not a valid event record: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] MessageStoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: usize,
    pub rejected_events: usize,
    pub flush: Option<FlushReport>,
}

/// Loads every persisted session into the bridge's state.
pub fn restore_from_store(
    bridge: &HostBridge,
    store: &MessageStore,
) -> Result<usize, ReplayError> {
    let session_ids = store.list_sessions()?;
    for session_id in &session_ids {
        let messages = store.load_messages(session_id)?;
        bridge.with_state_mut(|state| state.restore_messages(session_id, messages));
    }
    Ok(session_ids.len())
}

/// Feeds every line of `reader` through the bridge, then shuts it down.
///
/// Lines that fail to decode into a known event are counted and skipped.
pub fn replay_reader<R: BufRead>(
    bridge: &HostBridge,
    reader: R,
) -> Result<ReplaySummary, ReplayError> {
    let mut summary = ReplaySummary::default();

    for (line_index, line_result) in reader.lines().enumerate() {
        let line_number = line_index + 1;
        let line = line_result.map_err(|source| ReplayError::Io {
            line: line_number,
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let record: ReplayLine =
            serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
                line: line_number,
                source,
            })?;

        match bridge.push_event(&record.event, record.payload) {
            Ok(_) => summary.events += 1,
            Err(error) => {
                summary.rejected_events += 1;
                warn!(line = line_number, error = %error, "skipping undecodable event");
            }
        }
        bridge.drain_pending_events();
    }

    summary.flush = bridge.shutdown();
    info!(
        events = summary.events,
        rejected_events = summary.rejected_events,
        "replay finished"
    );
    Ok(summary)
}
