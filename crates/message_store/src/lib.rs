//! Append-only JSONL message log, one file per session.
//!
//! Line 1 is a version 1 session header; every later line is a message
//! record. A message may be written more than once; on load the last record
//! for an id wins while the id keeps the position where it first appeared.

mod error;
mod paths;
mod schema;
mod store;

pub use error::MessageStoreError;
pub use paths::{message_file_name, message_root, MESSAGE_DIR};
pub use schema::{LogHeader, MessageRecord};
pub use store::MessageStore;
