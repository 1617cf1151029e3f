//! Per-tile processing.
//!
//! A tile is one rectangle of the map series, identified by the integer
//! stored in the boundary layer's tile field. Each tile runs through a fixed
//! sequence of backend calls:
//!
//! ```text
//! Selecting ──► (no boundary match) ──► Empty
//!     │
//!     ▼
//! Clipping ──► Measuring ──► Joining ──► Success
//!
//! any backend error ──► Failed
//! ```
//!
//! Outcomes are a tagged [`TileOutcome`]; only `Success` contributes layers
//! to the master merge.

mod processor;

pub use processor::TileProcessor;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;

/// Identifier of one boundary tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TileId(pub u32);

impl TileId {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TileId {
    fn from(v: u32) -> Self {
        TileId(v)
    }
}

/// Deterministic per-tile output names, unique across tiles in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayerNames {
    pub clip_buffer: String,
    pub clip_polyline: String,
    pub joined_buffer: String,
    pub joined_polyline: String,
}

impl TileLayerNames {
    pub fn for_tile(tile: TileId) -> Self {
        Self {
            clip_buffer: format!("clip_buffer_fc_{}", tile),
            clip_polyline: format!("clip_polyline_fc_{}", tile),
            joined_buffer: format!("joined_clip_buffer_fc_{}", tile),
            joined_polyline: format!("joined_clip_polyline_fc_{}", tile),
        }
    }
}

/// Stage of the per-tile sequence, reported with failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileStage {
    Selecting,
    Clipping,
    Measuring,
    Joining,
}

impl fmt::Display for TileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileStage::Selecting => write!(f, "selecting boundary features"),
            TileStage::Clipping => write!(f, "clipping"),
            TileStage::Measuring => write!(f, "measuring"),
            TileStage::Joining => write!(f, "joining"),
        }
    }
}

/// A backend failure, tagged with the tile and stage it happened in.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("tile {tile} failed while {stage}: {source}")]
pub struct TileError {
    pub tile: TileId,
    pub stage: TileStage,
    #[source]
    pub source: BackendError,
}

/// Joined layers produced by one successful tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileOutputs {
    /// Joined buffer polygons.
    pub buffer: String,
    /// Joined intersect polylines.
    pub polyline: String,
    pub buffer_features: usize,
    pub polyline_features: usize,
}

/// Result of processing one tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TileOutcome {
    /// Every stage succeeded.
    Success(TileOutputs),
    /// No boundary feature carries this tile id.
    Empty,
    /// A backend call failed; nothing from this tile is published.
    Failed(TileError),
}

impl TileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TileOutcome::Success(_))
    }

    pub fn outputs(&self) -> Option<&TileOutputs> {
        match self {
            TileOutcome::Success(outputs) => Some(outputs),
            _ => None,
        }
    }
}
