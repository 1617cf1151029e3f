//! Run-level errors.

use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::workspace::WorkspaceError;

/// Errors that abort a run.
///
/// Per-tile failures are not here: they end up in the batch report as
/// [`TileOutcome::Failed`](crate::tile::TileOutcome::Failed).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
}
