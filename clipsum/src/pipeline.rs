//! End-to-end run: tiles, batch, then one aggregation per output kind.
//!
//! ```text
//! resolve tiles ──► BatchCoordinator ──► buffer layers ──► Aggregator ──► Master_Joined_Buffer
//!                                   │                                └─► Buffer_Summary_Master
//!                                   └──► polyline layers ─► Aggregator ──► Master_Joined_Polyline
//!                                                                    └─► Polyline_Summary_Master
//! ```
//!
//! An aggregation failure is recorded in the [`RunSummary`] and does not
//! stop the other kind from being built.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::aggregate::{AggregateOutcome, AggregationSpec, Aggregator};
use crate::backend::GeoprocessingBackend;
use crate::batch::{BatchCoordinator, BatchReport};
use crate::config::{ConfigError, PipelineConfig, TileSource};
use crate::error::PipelineError;
use crate::tile::{TileId, TileOutcome, TileProcessor};

/// How one output kind fared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AggregateReport {
    Built {
        master: String,
        summary: String,
        master_rows: usize,
        summary_rows: usize,
    },
    Skipped,
    Failed {
        error: String,
    },
}

impl From<AggregateOutcome> for AggregateReport {
    fn from(outcome: AggregateOutcome) -> Self {
        match outcome {
            AggregateOutcome::Built {
                master,
                summary,
                master_rows,
                summary_rows,
            } => AggregateReport::Built {
                master,
                summary,
                master_rows,
                summary_rows,
            },
            AggregateOutcome::Skipped => AggregateReport::Skipped,
        }
    }
}

/// Everything a run produced, suitable for `--report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub tiles: BatchReport,
    pub buffer: AggregateReport,
    pub polyline: AggregateReport,
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// At least one tile made it through.
    pub fn any_succeeded(&self) -> bool {
        self.tiles.succeeded > 0
    }
}

/// The configured batch over one backend.
pub struct Pipeline {
    backend: Arc<dyn GeoprocessingBackend>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(backend: Arc<dyn GeoprocessingBackend>, config: PipelineConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Tiles to process, ascending.
    pub fn resolve_tiles(&self) -> Result<Vec<TileId>, PipelineError> {
        match self.config.tiles {
            TileSource::Range(range) => {
                if range.first > range.last {
                    return Err(ConfigError::InvalidRange {
                        first: range.first,
                        last: range.last,
                    }
                    .into());
                }
                Ok(range.tiles())
            }
            TileSource::Discover => self.discover_tiles(),
        }
    }

    fn discover_tiles(&self) -> Result<Vec<TileId>, PipelineError> {
        let layer = &self.config.processing.layers.boundary;
        let field = &self.config.processing.fields.tile;

        let mut tiles = Vec::new();
        for value in self.backend.distinct_values(layer, field)? {
            match value.as_i64().and_then(|v| u32::try_from(v).ok()) {
                Some(id) => tiles.push(TileId(id)),
                None => warn!(%value, field = %field, "Skipping non-integer tile value"),
            }
        }
        tiles.sort_unstable();
        tiles.dedup();

        info!(tiles = tiles.len(), field = %field, "Discovered tiles on boundary layer");
        Ok(tiles)
    }

    /// Resolve the tiles and run them.
    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        self.run_with_progress(|_, _| {})
    }

    /// [`run`](Self::run) with a callback per finished tile.
    pub fn run_with_progress<F>(&self, on_tile: F) -> Result<RunSummary, PipelineError>
    where
        F: Fn(TileId, &TileOutcome) + Sync,
    {
        let tiles = self.resolve_tiles()?;
        Ok(self.run_tiles(&tiles, on_tile))
    }

    /// Process `tiles`, then build both master layers and summaries.
    pub fn run_tiles<F>(&self, tiles: &[TileId], on_tile: F) -> RunSummary
    where
        F: Fn(TileId, &TileOutcome) + Sync,
    {
        let started = Instant::now();

        let processor = TileProcessor::new(self.backend.clone(), self.config.processing.clone());
        let batch = BatchCoordinator::new(processor)
            .with_parallel(self.config.parallel)
            .run_batch_with_progress(tiles, on_tile);

        let fields = &self.config.processing.fields;
        let outputs = &self.config.outputs;
        let group_fields = vec![fields.classification.clone(), fields.tile.clone()];
        let aggregator = Aggregator::new(self.backend.clone());

        let buffer = self.aggregate(
            &aggregator,
            AggregationSpec {
                layers: batch.buffer_layers,
                master_name: outputs.master_buffer.clone(),
                measure_field: fields.area.clone(),
                group_fields: group_fields.clone(),
                summary_name: outputs.summary_buffer.clone(),
            },
        );
        let polyline = self.aggregate(
            &aggregator,
            AggregationSpec {
                layers: batch.polyline_layers,
                master_name: outputs.master_polyline.clone(),
                measure_field: fields.length.clone(),
                group_fields,
                summary_name: outputs.summary_polyline.clone(),
            },
        );

        let summary = RunSummary {
            tiles: batch.report,
            buffer,
            polyline,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            succeeded = summary.tiles.succeeded,
            empty = summary.tiles.empty,
            failed = summary.tiles.failed,
            elapsed_ms = summary.elapsed_ms,
            "Run complete"
        );
        summary
    }

    fn aggregate(&self, aggregator: &Aggregator, spec: AggregationSpec) -> AggregateReport {
        match aggregator.build_master_and_summary(&spec) {
            Ok(outcome) => outcome.into(),
            Err(e) => {
                error!(master = %spec.master_name, error = %e, "Aggregation failed");
                AggregateReport::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Feature, FeatureLayer, FieldType, GeometryKind, MemoryBackend};
    use crate::config::{TileRange, BOUNDARY_LAYER};
    use crate::test_support::{rect, tiled_backend};

    fn pipeline(backend: Arc<MemoryBackend>, tiles: TileSource) -> Pipeline {
        Pipeline::new(backend, PipelineConfig::default().with_tiles(tiles))
    }

    #[test]
    fn test_run_over_range() {
        let backend = tiled_backend(&[(1, 2, 1), (3, 3, 2)]);
        let summary = pipeline(backend.clone(), TileSource::Range(TileRange::new(1, 3)))
            .run()
            .unwrap();

        assert!(summary.any_succeeded());
        assert_eq!(summary.tiles.processed, 3);
        assert_eq!(summary.tiles.empty, 1);
        match summary.buffer {
            AggregateReport::Built { master_rows, .. } => assert_eq!(master_rows, 5),
            other => panic!("expected built buffer master, got {:?}", other),
        }
        match summary.polyline {
            AggregateReport::Built { master_rows, .. } => assert_eq!(master_rows, 3),
            other => panic!("expected built polyline master, got {:?}", other),
        }
    }

    #[test]
    fn test_no_tiles_skips_both_kinds() {
        let backend = tiled_backend(&[(1, 2, 1)]);
        let summary = pipeline(backend.clone(), TileSource::Range(TileRange::new(5, 6)))
            .run()
            .unwrap();

        assert!(!summary.any_succeeded());
        assert_eq!(summary.buffer, AggregateReport::Skipped);
        assert_eq!(summary.polyline, AggregateReport::Skipped);
        assert!(!backend.exists("Master_Joined_Buffer"));
    }

    #[test]
    fn test_inverted_range_is_fatal() {
        let backend = tiled_backend(&[(1, 1, 1)]);
        let result = pipeline(backend, TileSource::Range(TileRange::new(4, 2))).resolve_tiles();
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::InvalidRange { .. }))
        ));
    }

    #[test]
    fn test_discover_uses_boundary_values() {
        let backend = tiled_backend(&[(2, 1, 1), (7, 1, 1), (4, 1, 1)]);
        let tiles = pipeline(backend, TileSource::Discover).resolve_tiles().unwrap();
        assert_eq!(tiles, vec![TileId(2), TileId(4), TileId(7)]);
    }

    #[test]
    fn test_discover_skips_non_integer_values() {
        let backend = MemoryBackend::new();
        let boundary = FeatureLayer::new(GeometryKind::Polygon)
            .with_field("SeqId", FieldType::Text)
            .with_feature(Feature::new(rect(0.0, 0.0, 1.0, 1.0)).with_attr("SeqId", 3))
            .with_feature(Feature::new(rect(1.0, 0.0, 2.0, 1.0)).with_attr("SeqId", "north"))
            .with_feature(Feature::new(rect(2.0, 0.0, 3.0, 1.0)).with_attr("SeqId", -1))
            .with_feature(Feature::new(rect(3.0, 0.0, 4.0, 1.0)).with_attr("SeqId", 1.5));
        backend.insert_layer(BOUNDARY_LAYER, boundary).unwrap();

        let tiles = pipeline(Arc::new(backend), TileSource::Discover)
            .resolve_tiles()
            .unwrap();
        assert_eq!(tiles, vec![TileId(3)]);
    }

    #[test]
    fn test_summary_serializes_statuses() {
        let backend = tiled_backend(&[(1, 1, 0)]);
        let summary = pipeline(backend, TileSource::Range(TileRange::new(1, 2)))
            .run()
            .unwrap();

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["buffer"]["status"], "built");
        assert_eq!(json["buffer"]["master_rows"], 1);
        assert_eq!(json["tiles"]["succeeded"], 1);
        assert_eq!(json["tiles"]["empty"], 1);
    }
}
