//! Logging setup.
//!
//! Installs a global `tracing` subscriber:
//!
//! - `RUST_LOG` when set, otherwise the configured level (`debug` with
//!   `--verbose`)
//! - a stderr layer with local RFC 3339 timestamps
//! - an optional non-blocking file layer when `[logging] file` is set
//!
//! Keep the returned [`LogGuard`] alive until exit so buffered file output is
//! flushed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;

/// Errors installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {message}")]
    Filter { filter: String, message: String },

    #[error("failed to open log file {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install logger: {0}")]
    Install(String),
}

/// Flushes the file writer on drop.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber.
pub fn init_logging(settings: &LoggingSettings, verbose: bool) -> Result<LogGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter_for(&settings.level, verbose)?,
    };

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_timer(LocalTime::new(Rfc3339));

    let (file_layer, file_guard) = match &settings.file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::new(Rfc3339));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Filter for the configured level, ignoring the environment.
pub fn filter_for(level: &str, verbose: bool) -> Result<EnvFilter, LoggingError> {
    let level = if verbose { "debug" } else { level };
    EnvFilter::try_new(level).map_err(|e| LoggingError::Filter {
        filter: level.to_string(),
        message: e.to_string(),
    })
}

fn file_writer(
    path: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), LoggingError> {
    let file_err = |source| LoggingError::File {
        path: path.to_path_buf(),
        source,
    };

    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        file_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "log file path has no file name",
        ))
    })?;
    fs::create_dir_all(directory).map_err(file_err)?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_configured_level() {
        let filter = filter_for("warn", false).unwrap();
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn test_verbose_forces_debug() {
        let filter = filter_for("error", true).unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn test_file_writer_creates_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("clipsum.log");

        let (_writer, _guard) = file_writer(&path).unwrap();

        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn test_file_writer_rejects_directory_only_path() {
        assert!(matches!(
            file_writer(Path::new("/")),
            Err(LoggingError::File { .. })
        ));
    }
}
