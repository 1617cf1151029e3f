//! Runtime configuration handed to the pipeline components.
//!
//! These types are what the processor, coordinator and aggregator receive at
//! construction. They are built from a [`ConfigFile`] but can also be
//! assembled directly, which is how the tests drive the pipeline.

use super::file::ConfigFile;
use crate::tile::TileId;

/// Dataset name the boundary tiles are loaded under.
pub const BOUNDARY_LAYER: &str = "boundary";

/// Dataset name the wetland buffer polygons are loaded under.
pub const BUFFER_LAYER: &str = "wetland_buffer";

/// Dataset name the wetland intersect polylines are loaded under.
pub const POLYLINE_LAYER: &str = "wetland_polyline";

/// Names of the read-only source datasets in the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerNames {
    pub boundary: String,
    pub buffer: String,
    pub polyline: String,
}

impl Default for LayerNames {
    fn default() -> Self {
        Self {
            boundary: BOUNDARY_LAYER.to_string(),
            buffer: BUFFER_LAYER.to_string(),
            polyline: POLYLINE_LAYER.to_string(),
        }
    }
}

/// Attribute fields the pipeline reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    /// Tile identifier on the boundary layer.
    pub tile: String,
    /// Wetland classification used as the first grouping key.
    pub classification: String,
    /// Computed area in acres.
    pub area: String,
    /// Computed length in feet.
    pub length: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            tile: "SeqId".to_string(),
            classification: "Cowardin_Aggregate".to_string(),
            area: "Calc_Area".to_string(),
            length: "Calc_Length".to_string(),
        }
    }
}

/// Names of the run artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNames {
    pub master_buffer: String,
    pub master_polyline: String,
    pub summary_buffer: String,
    pub summary_polyline: String,
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            master_buffer: "Master_Joined_Buffer".to_string(),
            master_polyline: "Master_Joined_Polyline".to_string(),
            summary_buffer: "Buffer_Summary_Master".to_string(),
            summary_polyline: "Polyline_Summary_Master".to_string(),
        }
    }
}

/// Settings for [`TileProcessor`](crate::tile::TileProcessor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingConfig {
    pub layers: LayerNames,
    pub fields: FieldNames,
    /// Delete stale per-tile outputs before writing them again.
    pub overwrite_output: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            layers: LayerNames::default(),
            fields: FieldNames::default(),
            overwrite_output: true,
        }
    }
}

/// Inclusive range of tile ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub first: u32,
    pub last: u32,
}

impl TileRange {
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    /// Tile ids in ascending order.
    pub fn tiles(&self) -> Vec<TileId> {
        (self.first..=self.last).map(TileId).collect()
    }
}

impl Default for TileRange {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// Where the list of tiles to process comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSource {
    /// An explicit configured range.
    Range(TileRange),
    /// Distinct tile-field values found on the boundary layer.
    Discover,
}

impl Default for TileSource {
    fn default() -> Self {
        TileSource::Range(TileRange::default())
    }
}

/// Everything [`Pipeline`](crate::pipeline::Pipeline) needs for one run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineConfig {
    pub processing: ProcessingConfig,
    pub outputs: OutputNames,
    pub tiles: TileSource,
    /// Process tiles on a thread pool.
    pub parallel: bool,
}

impl PipelineConfig {
    /// Build the runtime configuration from a loaded config file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        let tiles = if config.tiles.discover {
            TileSource::Discover
        } else {
            TileSource::Range(TileRange::new(config.tiles.first, config.tiles.last))
        };

        Self {
            processing: ProcessingConfig {
                layers: LayerNames::default(),
                fields: FieldNames {
                    tile: config.fields.tile.clone(),
                    classification: config.fields.classification.clone(),
                    area: config.fields.area.clone(),
                    length: config.fields.length.clone(),
                },
                overwrite_output: config.workspace.overwrite_output,
            },
            outputs: OutputNames {
                master_buffer: config.output.master_buffer.clone(),
                master_polyline: config.output.master_polyline.clone(),
                summary_buffer: config.output.summary_buffer.clone(),
                summary_polyline: config.output.summary_polyline.clone(),
            },
            tiles,
            parallel: config.batch.parallel,
        }
    }

    /// Set the tile source.
    pub fn with_tiles(mut self, tiles: TileSource) -> Self {
        self.tiles = tiles;
        self
    }

    /// Enable or disable parallel tile processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
