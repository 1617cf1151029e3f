//! Configuration.
//!
//! Two layers:
//!
//! - [`ConfigFile`]: the user-facing `config.ini`, read and written with
//!   `rust-ini`, addressable key by key through [`ConfigKey`].
//! - [`PipelineConfig`]: the runtime settings the pipeline components take
//!   at construction, derived from a `ConfigFile` or built directly.

mod error;
mod file;
mod keys;
mod pipeline;

use std::path::PathBuf;

pub use error::ConfigError;
pub use file::{
    BatchSettings, ConfigFile, FieldSettings, LayerSettings, LoggingSettings, OutputSettings,
    TileSettings, WorkspaceSettings,
};
pub use keys::ConfigKey;
pub use pipeline::{
    FieldNames, LayerNames, OutputNames, PipelineConfig, ProcessingConfig, TileRange, TileSource,
    BOUNDARY_LAYER, BUFFER_LAYER, POLYLINE_LAYER,
};

/// Directory name under the platform config directory.
const APP_DIR: &str = "clipsum";

/// Default config file location: `<config_dir>/clipsum/config.ini`.
///
/// Falls back to the current directory when the platform has no config
/// directory.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.ini")
}
