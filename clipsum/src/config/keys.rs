//! Typed configuration keys for `config get`, `config set` and `config list`.

use std::path::PathBuf;
use std::str::FromStr;

use super::error::ConfigError;
use super::file::ConfigFile;

/// Log levels accepted by `[logging] level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Every key the config file understands, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    WorkspaceDirectory,
    WorkspaceOverwriteOutput,
    LayersBoundary,
    LayersBuffer,
    LayersPolyline,
    FieldsTile,
    FieldsClassification,
    FieldsArea,
    FieldsLength,
    TilesFirst,
    TilesLast,
    TilesDiscover,
    BatchParallel,
    OutputMasterBuffer,
    OutputMasterPolyline,
    OutputSummaryBuffer,
    OutputSummaryPolyline,
    LoggingLevel,
    LoggingFile,
}

impl ConfigKey {
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            WorkspaceDirectory,
            WorkspaceOverwriteOutput,
            LayersBoundary,
            LayersBuffer,
            LayersPolyline,
            FieldsTile,
            FieldsClassification,
            FieldsArea,
            FieldsLength,
            TilesFirst,
            TilesLast,
            TilesDiscover,
            BatchParallel,
            OutputMasterBuffer,
            OutputMasterPolyline,
            OutputSummaryBuffer,
            OutputSummaryPolyline,
            LoggingLevel,
            LoggingFile,
        ]
    }

    /// INI section this key lives in.
    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            WorkspaceDirectory | WorkspaceOverwriteOutput => "workspace",
            LayersBoundary | LayersBuffer | LayersPolyline => "layers",
            FieldsTile | FieldsClassification | FieldsArea | FieldsLength => "fields",
            TilesFirst | TilesLast | TilesDiscover => "tiles",
            BatchParallel => "batch",
            OutputMasterBuffer | OutputMasterPolyline | OutputSummaryBuffer
            | OutputSummaryPolyline => "output",
            LoggingLevel | LoggingFile => "logging",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            WorkspaceDirectory => "directory",
            WorkspaceOverwriteOutput => "overwrite_output",
            LayersBoundary => "boundary",
            LayersBuffer => "buffer",
            LayersPolyline => "polyline",
            FieldsTile => "tile",
            FieldsClassification => "classification",
            FieldsArea => "area",
            FieldsLength => "length",
            TilesFirst => "first",
            TilesLast => "last",
            TilesDiscover => "discover",
            BatchParallel => "parallel",
            OutputMasterBuffer => "master_buffer",
            OutputMasterPolyline => "master_polyline",
            OutputSummaryBuffer => "summary_buffer",
            OutputSummaryPolyline => "summary_polyline",
            LoggingLevel => "level",
            LoggingFile => "file",
        }
    }

    /// Dotted name, e.g. `tiles.first`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as it would be written to the file.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        match self {
            WorkspaceDirectory => config.workspace.directory.display().to_string(),
            WorkspaceOverwriteOutput => config.workspace.overwrite_output.to_string(),
            LayersBoundary => config.layers.boundary.display().to_string(),
            LayersBuffer => config.layers.buffer.display().to_string(),
            LayersPolyline => config.layers.polyline.display().to_string(),
            FieldsTile => config.fields.tile.clone(),
            FieldsClassification => config.fields.classification.clone(),
            FieldsArea => config.fields.area.clone(),
            FieldsLength => config.fields.length.clone(),
            TilesFirst => config.tiles.first.to_string(),
            TilesLast => config.tiles.last.to_string(),
            TilesDiscover => config.tiles.discover.to_string(),
            BatchParallel => config.batch.parallel.to_string(),
            OutputMasterBuffer => config.output.master_buffer.clone(),
            OutputMasterPolyline => config.output.master_polyline.clone(),
            OutputSummaryBuffer => config.output.summary_buffer.clone(),
            OutputSummaryPolyline => config.output.summary_polyline.clone(),
            LoggingLevel => config.logging.level.clone(),
            LoggingFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse `value` and store it in `config`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let value = value.trim();
        match self {
            WorkspaceDirectory => config.workspace.directory = self.parse_path(value)?,
            WorkspaceOverwriteOutput => config.workspace.overwrite_output = self.parse_bool(value)?,
            LayersBoundary => config.layers.boundary = self.parse_path(value)?,
            LayersBuffer => config.layers.buffer = self.parse_path(value)?,
            LayersPolyline => config.layers.polyline = self.parse_path(value)?,
            FieldsTile => config.fields.tile = self.parse_name(value)?,
            FieldsClassification => config.fields.classification = self.parse_name(value)?,
            FieldsArea => config.fields.area = self.parse_name(value)?,
            FieldsLength => config.fields.length = self.parse_name(value)?,
            TilesFirst => config.tiles.first = self.parse_u32(value)?,
            TilesLast => config.tiles.last = self.parse_u32(value)?,
            TilesDiscover => config.tiles.discover = self.parse_bool(value)?,
            BatchParallel => config.batch.parallel = self.parse_bool(value)?,
            OutputMasterBuffer => config.output.master_buffer = self.parse_name(value)?,
            OutputMasterPolyline => config.output.master_polyline = self.parse_name(value)?,
            OutputSummaryBuffer => config.output.summary_buffer = self.parse_name(value)?,
            OutputSummaryPolyline => config.output.summary_polyline = self.parse_name(value)?,
            LoggingLevel => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(self.invalid(value, "one of trace, debug, info, warn, error"));
                }
                config.logging.level = level;
            }
            LoggingFile => {
                config.logging.file = (!value.is_empty()).then(|| PathBuf::from(value));
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, expected: &str) -> ConfigError {
        ConfigError::invalid_value(self.section(), self.key_name(), value, expected)
    }

    fn parse_bool(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(self.invalid(value, "true or false")),
        }
    }

    fn parse_u32(&self, value: &str) -> Result<u32, ConfigError> {
        value
            .parse()
            .map_err(|_| self.invalid(value, "a non-negative integer"))
    }

    fn parse_name(&self, value: &str) -> Result<String, ConfigError> {
        if value.is_empty() {
            return Err(self.invalid(value, "a non-empty name"));
        }
        Ok(value.to_string())
    }

    fn parse_path(&self, value: &str) -> Result<PathBuf, ConfigError> {
        if value.is_empty() {
            return Err(self.invalid(value, "a path"));
        }
        Ok(PathBuf::from(value))
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
