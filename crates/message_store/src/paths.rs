use std::path::{Path, PathBuf};

pub const MESSAGE_DIR: [&str; 2] = [".acp", "messages"];

#[must_use]
pub fn message_root(cwd: &Path) -> PathBuf {
    cwd.join(MESSAGE_DIR[0]).join(MESSAGE_DIR[1])
}

/// File name for a session's log.
///
/// ASCII letters, digits, `-` and `_` are kept; every other byte is written
/// as `%XX`, so distinct ids never share a file.
#[must_use]
pub fn message_file_name(session_id: &str) -> String {
    let mut encoded = String::with_capacity(session_id.len() + ".jsonl".len());
    for byte in session_id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded.push_str(".jsonl");
    encoded
}
