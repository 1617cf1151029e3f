//! INI-backed configuration file.
//!
//! The file mirrors the sections below. Every key is optional; anything left
//! out keeps its default, and a missing file is the same as an empty one.
//!
//! ```ini
//! [workspace]
//! directory = .
//! overwrite_output = true
//!
//! [layers]
//! boundary = boundary.geojson
//! buffer = wetland_buffer.geojson
//! polyline = wetland_polyline.geojson
//!
//! [fields]
//! tile = SeqId
//! classification = Cowardin_Aggregate
//! area = Calc_Area
//! length = Calc_Length
//!
//! [tiles]
//! first = 1
//! last = 20
//! discover = false
//!
//! [batch]
//! parallel = false
//!
//! [output]
//! master_buffer = Master_Joined_Buffer
//! master_polyline = Master_Joined_Polyline
//! summary_buffer = Buffer_Summary_Master
//! summary_polyline = Polyline_Summary_Master
//!
//! [logging]
//! level = info
//! file =
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;

use super::error::ConfigError;
use super::keys::ConfigKey;
use super::config_file_path;

/// Parsed contents of `config.ini`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigFile {
    pub workspace: WorkspaceSettings,
    pub layers: LayerSettings,
    pub fields: FieldSettings,
    pub tiles: TileSettings,
    pub batch: BatchSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

/// `[workspace]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSettings {
    /// Directory the source layers are read from and the outputs written to.
    pub directory: PathBuf,
    /// Replace per-tile outputs left over from an earlier run.
    pub overwrite_output: bool,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            overwrite_output: true,
        }
    }
}

/// `[layers]`: GeoJSON source files, relative to the workspace directory
/// unless absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSettings {
    pub boundary: PathBuf,
    pub buffer: PathBuf,
    pub polyline: PathBuf,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            boundary: PathBuf::from("boundary.geojson"),
            buffer: PathBuf::from("wetland_buffer.geojson"),
            polyline: PathBuf::from("wetland_polyline.geojson"),
        }
    }
}

/// `[fields]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSettings {
    pub tile: String,
    pub classification: String,
    pub area: String,
    pub length: String,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            tile: "SeqId".to_string(),
            classification: "Cowardin_Aggregate".to_string(),
            area: "Calc_Area".to_string(),
            length: "Calc_Length".to_string(),
        }
    }
}

/// `[tiles]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSettings {
    pub first: u32,
    pub last: u32,
    /// Use the distinct tile values on the boundary layer instead of the range.
    pub discover: bool,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            first: 1,
            last: 20,
            discover: false,
        }
    }
}

/// `[batch]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSettings {
    pub parallel: bool,
}

/// `[output]`: dataset names of the run artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub master_buffer: String,
    pub master_polyline: String,
    pub summary_buffer: String,
    pub summary_polyline: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            master_buffer: "Master_Joined_Buffer".to_string(),
            master_polyline: "Master_Joined_Polyline".to_string(),
            summary_buffer: "Buffer_Summary_Master".to_string(),
            summary_polyline: "Polyline_Summary_Master".to_string(),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter level when `RUST_LOG` is not set.
    pub level: String,
    /// Optional log file, written in addition to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl ConfigFile {
    /// Load from the default location, see [`config_file_path`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })?;

        Self::from_ini(&ini)
    }

    /// Build from parsed INI contents.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Render every key, defaults included.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini
    }

    /// Save to the default location, creating its directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating its directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        self.to_ini().write_to_file(path).map_err(io_err)
    }

    /// Check cross-key constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiles.first > self.tiles.last {
            return Err(ConfigError::InvalidRange {
                first: self.tiles.first,
                last: self.tiles.last,
            });
        }
        Ok(())
    }

    /// Resolve a source path against the workspace directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.directory.join(path)
        }
    }
}
