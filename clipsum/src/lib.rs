//! Clipsum - per-tile wetland clip and summary
//!
//! This library clips wetland buffer polygons and intersect polylines to each
//! tile of a boundary layer, measures them geodesically (acres and feet),
//! tags every clipped feature with its tile through a spatial join, then
//! merges the per-tile results into master layers and sums the measures per
//! classification and tile.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌───────────────┐   ┌────────────┐
//! │ GeoJSON      │──►│ BatchCoordinator │──►│ TileProcessor │──►│ Geoprocess-│
//! │ workspace    │   │ (seq. or rayon)  │   │ select, clip, │   │ ingBackend │
//! └──────────────┘   └────────┬─────────┘   │ measure, join │   │ (trait)    │
//!        ▲                    │             └───────────────┘   └────────────┘
//!        │                    ▼                                        ▲
//!        │            ┌──────────────┐                                 │
//!        └────────────│  Aggregator  │─────────────────────────────────┘
//!      persist        │ merge + stats│
//!                     └──────────────┘
//! ```
//!
//! Geoprocessing goes through the [`backend::GeoprocessingBackend`] trait.
//! [`backend::MemoryBackend`] implements it over `geo` geometries.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use clipsum::backend::MemoryBackend;
//! use clipsum::config::{ConfigFile, LayerNames, PipelineConfig};
//! use clipsum::pipeline::Pipeline;
//! use clipsum::workspace::GeoJsonWorkspace;
//!
//! let config = ConfigFile::load()?;
//! let workspace = GeoJsonWorkspace::new(&config.workspace.directory);
//! let backend = Arc::new(MemoryBackend::new());
//! workspace.load_sources(&backend, &config.layers, &LayerNames::default())?;
//!
//! let pipeline_config = PipelineConfig::from_config_file(&config);
//! let summary = Pipeline::new(backend.clone(), pipeline_config.clone()).run()?;
//! workspace.persist_outputs(&backend, &pipeline_config.outputs)?;
//! ```

pub mod aggregate;
pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod fields;
pub mod logging;
pub mod pipeline;
pub mod tile;
pub mod units;
pub mod workspace;

#[cfg(test)]
mod test_support;

pub use error::PipelineError;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
