use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use agent_events::ChatMessage;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::MessageStoreError;
use crate::paths::message_file_name;
use crate::schema::{LogHeader, LogLine, MessageRecord, LOG_VERSION};

/// Message logs under one root directory.
///
/// Appends are serialized through an internal lock so concurrent writers
/// never interleave partial lines.
#[derive(Debug)]
pub struct MessageStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl MessageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.root.join(message_file_name(session_id))
    }

    /// Appends a snapshot of `message`, writing the header first for a new log.
    pub fn save_message(&self, message: &ChatMessage) -> Result<(), MessageStoreError> {
        let _guard = lock_unpoisoned(&self.write_lock);
        let path = self.session_path(&message.session_id);
        fs::create_dir_all(&self.root)
            .map_err(|source| MessageStoreError::io("creating message root", &self.root, source))?;

        let needs_header = match fs::metadata(&path) {
            Ok(metadata) => metadata.len() == 0,
            Err(error) if error.kind() == ErrorKind::NotFound => true,
            Err(source) => {
                return Err(MessageStoreError::io("inspecting message log", &path, source));
            }
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| {
                MessageStoreError::io("opening message log for append", &path, source)
            })?;

        let mut buffer = String::new();
        if needs_header {
            let header =
                LogLine::Session(LogHeader::v1(message.session_id.clone(), now_rfc3339()?));
            push_line(&mut buffer, &path, &header)?;
        }
        let record = LogLine::Message(MessageRecord {
            ts: now_rfc3339()?,
            message: message.clone(),
        });
        push_line(&mut buffer, &path, &record)?;

        file.write_all(buffer.as_bytes())
            .map_err(|source| MessageStoreError::io("appending to message log", &path, source))
    }

    /// Loads a session's messages; a missing log yields an empty history.
    pub fn load_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, MessageStoreError> {
        let path = self.session_path(session_id);
        let read_file = match File::open(&path) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(MessageStoreError::io("opening message log", &path, source));
            }
        };

        let (header, records) = read_log(&path, read_file)?;
        let mut messages: Vec<ChatMessage> = Vec::new();
        let mut index_by_id: HashMap<String, usize> = HashMap::new();

        for (line_number, record) in records {
            if record.message.session_id != header.session_id {
                return Err(MessageStoreError::SessionMismatch {
                    path,
                    line: line_number,
                    expected: header.session_id,
                    found: record.message.session_id,
                });
            }

            match index_by_id.get(&record.message.id) {
                Some(&index) => messages[index] = record.message,
                None => {
                    index_by_id.insert(record.message.id.clone(), messages.len());
                    messages.push(record.message);
                }
            }
        }

        Ok(messages)
    }

    /// Session ids with a log under the root, sorted.
    pub fn list_sessions(&self) -> Result<Vec<String>, MessageStoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(MessageStoreError::io("listing message root", &self.root, source));
            }
        };

        let mut session_ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| {
                MessageStoreError::io("listing message root", &self.root, source)
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
                continue;
            }

            let file = File::open(&path)
                .map_err(|source| MessageStoreError::io("opening message log", &path, source))?;
            let header = read_header(&path, &mut BufReader::new(file).lines())?;
            session_ids.push(header.session_id);
        }

        session_ids.sort();
        Ok(session_ids)
    }

    /// Deletes a session's log; returns whether one existed.
    pub fn remove_session(&self, session_id: &str) -> Result<bool, MessageStoreError> {
        let _guard = lock_unpoisoned(&self.write_lock);
        let path = self.session_path(session_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(MessageStoreError::io("removing message log", &path, source)),
        }
    }
}

type Lines = std::io::Lines<BufReader<File>>;

fn read_log(
    path: &Path,
    file: File,
) -> Result<(LogHeader, Vec<(usize, MessageRecord)>), MessageStoreError> {
    let mut lines = BufReader::new(file).lines();
    let header = read_header(path, &mut lines)?;

    let mut records = Vec::new();
    for (line_index, line_result) in lines.enumerate() {
        let line_number = line_index + 2;
        let line =
            line_result.map_err(|source| MessageStoreError::io_line(path, line_number, source))?;
        if line.trim().is_empty() {
            continue;
        }

        match parse_json_line(path, line_number, &line)? {
            LogLine::Message(record) => {
                validate_rfc3339(path, line_number, "ts", &record.ts)?;
                records.push((line_number, record));
            }
            LogLine::Session(_) => {
                return Err(MessageStoreError::InvalidMessageRecord {
                    path: path.to_path_buf(),
                    line: line_number,
                });
            }
        }
    }

    Ok((header, records))
}

fn read_header(path: &Path, lines: &mut Lines) -> Result<LogHeader, MessageStoreError> {
    let line = match lines.next() {
        Some(line_result) => {
            line_result.map_err(|source| MessageStoreError::io_line(path, 1, source))?
        }
        None => {
            return Err(MessageStoreError::MissingHeader {
                path: path.to_path_buf(),
            });
        }
    };

    match parse_json_line(path, 1, &line)? {
        LogLine::Session(header) => {
            validate_header_line(path, 1, &header)?;
            Ok(header)
        }
        LogLine::Message(_) => Err(MessageStoreError::InvalidHeaderRecord {
            path: path.to_path_buf(),
            line: 1,
        }),
    }
}

fn parse_json_line(
    path: &Path,
    line_number: usize,
    line: &str,
) -> Result<LogLine, MessageStoreError> {
    serde_json::from_str::<LogLine>(line)
        .map_err(|source| MessageStoreError::json_line(path, line_number, source))
}

fn validate_header_line(
    path: &Path,
    line_number: usize,
    header: &LogHeader,
) -> Result<(), MessageStoreError> {
    if header.version != LOG_VERSION {
        return Err(MessageStoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            line: line_number,
            found: header.version,
        });
    }

    validate_rfc3339(path, line_number, "created_at", &header.created_at)
}

fn validate_rfc3339(
    path: &Path,
    line_number: usize,
    field: &'static str,
    value: &str,
) -> Result<(), MessageStoreError> {
    if OffsetDateTime::parse(value, &Rfc3339).is_err() {
        return Err(MessageStoreError::InvalidTimestamp {
            path: path.to_path_buf(),
            line: line_number,
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}

fn push_line(buffer: &mut String, path: &Path, line: &LogLine) -> Result<(), MessageStoreError> {
    let encoded = serde_json::to_string(line)
        .map_err(|source| MessageStoreError::json_serialize(path, source))?;
    buffer.push_str(&encoded);
    buffer.push('\n');
    Ok(())
}

fn now_rfc3339() -> Result<String, MessageStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(MessageStoreError::ClockFormat)
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
