//! Environment configuration.

use std::env;
use std::path::PathBuf;

pub const LOG_FILTER_VAR: &str = "ACP_TIMELINE_LOG";
pub const LOG_JSON_VAR: &str = "ACP_TIMELINE_LOG_JSON";
pub const STORE_DIR_VAR: &str = "ACP_TIMELINE_STORE_DIR";

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub log_filter: String,
    pub log_json: bool,
    pub store_dir: Option<PathBuf>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            log_filter: env_string_opt(LOG_FILTER_VAR)
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            log_json: env_flag(LOG_JSON_VAR),
            store_dir: env_string_opt(STORE_DIR_VAR).map(PathBuf::from),
        }
    }

    /// Message store root: the override, or `<cwd>/.acp/messages`.
    pub fn store_dir_or_default(&self) -> std::io::Result<PathBuf> {
        match &self.store_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(env::current_dir()?.join(".acp").join("messages")),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_json: false,
            store_dir: None,
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
