//! CLI error types.

use std::fmt;

use clipsum::config::ConfigError;
use clipsum::logging::LoggingError;
use clipsum::workspace::WorkspaceError;
use clipsum::PipelineError;

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Invalid or unreadable configuration.
    Config(String),

    /// The run could not start or finish.
    Pipeline(PipelineError),

    /// The run report could not be written.
    Report(String),

    /// Every tile was empty or failed.
    NoTilesSucceeded { processed: usize, failed: usize },
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) => 2,
            CliError::NoTilesSucceeded { .. } => 3,
            CliError::Pipeline(_) | CliError::Report(_) => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Pipeline(e) => write!(f, "Run failed: {}", e),
            CliError::Report(msg) => write!(f, "Failed to write report: {}", msg),
            CliError::NoTilesSucceeded { processed, failed } => write!(
                f,
                "No tiles succeeded ({} processed, {} failed)",
                processed, failed
            ),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Pipeline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Config(e) => CliError::Config(e.to_string()),
            other => CliError::Pipeline(other),
        }
    }
}

impl From<WorkspaceError> for CliError {
    fn from(e: WorkspaceError) -> Self {
        CliError::Pipeline(PipelineError::Workspace(e))
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Pipeline(PipelineError::Logging(e))
    }
}
