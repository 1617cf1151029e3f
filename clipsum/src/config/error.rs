//! Configuration errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, writing or validating `config.ini`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid value '{value}' for [{section}] {key}: expected {expected}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        expected: String,
    },

    #[error("invalid tile range: first ({first}) is greater than last ({last})")]
    InvalidRange { first: u32, last: u32 },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

impl ConfigError {
    pub(crate) fn invalid_value(
        section: &str,
        key: &str,
        value: &str,
        expected: &str,
    ) -> Self {
        ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }
}
