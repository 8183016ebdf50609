//! Tracing subscriber setup for binaries.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the process entry point.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::EnvConfig;

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("failed to install global subscriber: {0}")]
    Install(String),
}

/// Builds the filter from `config.log_filter`, preferring `RUST_LOG` when set.
pub fn env_filter(config: &EnvConfig) -> Result<EnvFilter, LoggingInitError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.log_filter).map_err(|source| LoggingInitError::Filter {
        filter: config.log_filter.clone(),
        source,
    })
}

/// Installs a global fmt subscriber writing to stderr.
pub fn init_logging(config: &EnvConfig) -> Result<(), LoggingInitError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|error| LoggingInitError::Install(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{env_filter, LoggingInitError};
    use crate::config::EnvConfig;

    #[test]
    fn invalid_filter_is_reported() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }

        let config = EnvConfig {
            log_filter: "acp_timeline=loud".to_string(),
            ..EnvConfig::default()
        };
        let error = env_filter(&config).expect_err("filter must not parse");
        assert!(matches!(error, LoggingInitError::Filter { .. }));
    }

    #[test]
    fn valid_filter_parses() {
        let config = EnvConfig {
            log_filter: "acp_timeline=debug,warn".to_string(),
            ..EnvConfig::default()
        };
        assert!(env_filter(&config).is_ok());
    }
}
