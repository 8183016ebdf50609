use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;

use acp_timeline::{init_logging, ChatState, EnvConfig, HostBridge};
use message_store::MessageStore;
use timeline_replay::{replay_reader, restore_from_store, StoreHost};
use tracing::info;

fn main() -> io::Result<()> {
    let config = EnvConfig::from_env();
    init_logging(&config).map_err(io::Error::other)?;

    let store = Arc::new(MessageStore::new(config.store_dir_or_default()?));
    let host = Arc::new(StoreHost::new(Arc::clone(&store), Box::new(io::stdout())));
    let bridge = HostBridge::new(ChatState::new(), host).map_err(io::Error::other)?;

    let restored = restore_from_store(&bridge, &store).map_err(io::Error::other)?;
    info!(sessions = restored, root = %store.root().display(), "restored message history");

    let reader: Box<dyn BufRead> = match std::env::args_os().nth(1) {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    let summary = replay_reader(&bridge, reader).map_err(io::Error::other)?;
    if let Some(flush) = summary.flush {
        info!(
            messages = flush.messages,
            interrupted_tool_calls = flush.interrupted_tool_calls,
            persist_failures = flush.persist_failures,
            "flushed in-flight messages"
        );
    }

    Ok(())
}
