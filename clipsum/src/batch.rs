//! Batch coordination across tiles.
//!
//! The coordinator runs [`TileProcessor::process_tile`] for every requested
//! tile and folds the outcomes into the joined-layer lists the aggregator
//! merges. A failing tile never stops the batch.
//!
//! ```text
//! tiles ──► process_tile (sequential or rayon) ──► (tile, outcome)*
//!                                                        │ sort by tile
//!                                                        ▼
//!                                     fold Success ──► buffer_layers
//!                                                 └──► polyline_layers
//! ```
//!
//! Outcomes are sorted by tile id before folding, so the master layers come
//! out in the same order whether tiles ran in parallel or not.

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::tile::{TileId, TileOutcome, TileProcessor, TileStage};

/// Final status of one tile in the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileStatus {
    Success,
    Empty,
    Failed,
}

/// Per-tile line of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileReport {
    pub tile: TileId,
    pub status: TileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_features: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polyline_features: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<TileStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TileReport {
    fn from_outcome(tile: TileId, outcome: &TileOutcome) -> Self {
        let mut report = Self {
            tile,
            status: TileStatus::Empty,
            buffer_features: None,
            polyline_features: None,
            stage: None,
            error: None,
        };
        match outcome {
            TileOutcome::Success(outputs) => {
                report.status = TileStatus::Success;
                report.buffer_features = Some(outputs.buffer_features);
                report.polyline_features = Some(outputs.polyline_features);
            }
            TileOutcome::Empty => {}
            TileOutcome::Failed(err) => {
                report.status = TileStatus::Failed;
                report.stage = Some(err.stage);
                report.error = Some(err.source.to_string());
            }
        }
        report
    }
}

/// Counts and per-tile detail for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub succeeded: usize,
    pub empty: usize,
    pub failed: usize,
    pub tiles: Vec<TileReport>,
}

/// Result of a batch: joined layers of the successful tiles, in tile order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchResult {
    pub buffer_layers: Vec<String>,
    pub polyline_layers: Vec<String>,
    pub report: BatchReport,
}

/// Drives a [`TileProcessor`] over a list of tiles.
pub struct BatchCoordinator {
    processor: TileProcessor,
    parallel: bool,
}

impl BatchCoordinator {
    /// Create a sequential coordinator.
    pub fn new(processor: TileProcessor) -> Self {
        Self {
            processor,
            parallel: false,
        }
    }

    /// Process tiles on the rayon thread pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn processor(&self) -> &TileProcessor {
        &self.processor
    }

    /// Process every tile and collect the successful joined layers.
    pub fn run_batch(&self, tiles: &[TileId]) -> BatchResult {
        self.run_batch_with_progress(tiles, |_, _| {})
    }

    /// Like [`run_batch`](Self::run_batch), calling `on_tile` as each tile
    /// finishes. With `parallel` set the callback runs on worker threads in
    /// completion order.
    pub fn run_batch_with_progress<F>(&self, tiles: &[TileId], on_tile: F) -> BatchResult
    where
        F: Fn(TileId, &TileOutcome) + Sync,
    {
        let mut tiles = tiles.to_vec();
        tiles.sort_unstable();
        tiles.dedup();

        info!(
            tiles = tiles.len(),
            parallel = self.parallel,
            "Starting tile batch"
        );

        let process = |tile: TileId| {
            let outcome = self.processor.process_tile(tile);
            on_tile(tile, &outcome);
            (tile, outcome)
        };

        let outcomes: Vec<(TileId, TileOutcome)> = if self.parallel {
            tiles.par_iter().map(|&tile| process(tile)).collect()
        } else {
            tiles.iter().map(|&tile| process(tile)).collect()
        };

        let result = fold_outcomes(outcomes);
        info!(
            processed = result.report.processed,
            succeeded = result.report.succeeded,
            empty = result.report.empty,
            failed = result.report.failed,
            "Tile batch complete"
        );
        result
    }
}

/// Fold per-tile outcomes in tile order. Only `Success` contributes layers.
pub fn fold_outcomes(mut outcomes: Vec<(TileId, TileOutcome)>) -> BatchResult {
    outcomes.sort_by_key(|(tile, _)| *tile);

    let mut result = BatchResult::default();
    for (tile, outcome) in &outcomes {
        result.report.processed += 1;
        match outcome {
            TileOutcome::Success(outputs) => {
                result.report.succeeded += 1;
                result.buffer_layers.push(outputs.buffer.clone());
                result.polyline_layers.push(outputs.polyline.clone());
            }
            TileOutcome::Empty => result.report.empty += 1,
            TileOutcome::Failed(_) => result.report.failed += 1,
        }
        result.report.tiles.push(TileReport::from_outcome(*tile, outcome));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::config::ProcessingConfig;
    use crate::test_support::tiled_backend;
    use crate::tile::{TileError, TileLayerNames, TileOutputs};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn outcome_for(tile: u32) -> TileOutcome {
        match tile % 3 {
            0 => TileOutcome::Empty,
            1 => {
                let names = TileLayerNames::for_tile(TileId(tile));
                TileOutcome::Success(TileOutputs {
                    buffer: names.joined_buffer,
                    polyline: names.joined_polyline,
                    buffer_features: tile as usize,
                    polyline_features: 1,
                })
            }
            _ => TileOutcome::Failed(TileError {
                tile: TileId(tile),
                stage: TileStage::Clipping,
                source: BackendError::Engine("boom".to_string()),
            }),
        }
    }

    fn coordinator(tiles: &[(u32, usize, usize)]) -> BatchCoordinator {
        BatchCoordinator::new(TileProcessor::new(
            tiled_backend(tiles),
            ProcessingConfig::default(),
        ))
    }

    #[test]
    fn test_fold_counts_and_layers() {
        let outcomes = (1..=6).map(|t| (TileId(t), outcome_for(t))).collect();
        let result = fold_outcomes(outcomes);

        assert_eq!(result.report.processed, 6);
        assert_eq!(result.report.succeeded, 2);
        assert_eq!(result.report.empty, 2);
        assert_eq!(result.report.failed, 2);
        assert_eq!(
            result.buffer_layers,
            vec!["joined_clip_buffer_fc_1", "joined_clip_buffer_fc_4"]
        );
        assert_eq!(result.report.tiles[1].stage, Some(TileStage::Clipping));
        assert_eq!(
            result.report.tiles[1].error.as_deref(),
            Some("geoprocessing failed: boom")
        );
    }

    #[test]
    fn test_empty_batch() {
        let result = fold_outcomes(Vec::new());
        assert_eq!(result, BatchResult::default());
    }

    #[test]
    fn test_run_batch_skips_missing_tiles() {
        let coordinator = coordinator(&[(1, 2, 1), (3, 3, 2)]);
        let result = coordinator.run_batch(&[TileId(1), TileId(2), TileId(3)]);

        assert_eq!(result.report.succeeded, 2);
        assert_eq!(result.report.empty, 1);
        assert_eq!(
            result.polyline_layers,
            vec!["joined_clip_polyline_fc_1", "joined_clip_polyline_fc_3"]
        );
        assert_eq!(result.report.tiles[2].buffer_features, Some(3));
    }

    #[test]
    fn test_duplicate_tiles_run_once() {
        let coordinator = coordinator(&[(1, 1, 1)]);
        let calls = AtomicUsize::new(0);

        let result = coordinator.run_batch_with_progress(&[TileId(1), TileId(1)], |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.report.processed, 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let tiles = [(1, 2, 1), (2, 4, 3), (4, 1, 0), (5, 3, 2)];
        let ids: Vec<TileId> = (1..=6).map(TileId).collect();

        let sequential = coordinator(&tiles).run_batch(&ids);
        let parallel = coordinator(&tiles).with_parallel(true).run_batch(&ids);

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_report_serializes_without_empty_fields() {
        let result = fold_outcomes(vec![(TileId(3), TileOutcome::Empty)]);
        let json = serde_json::to_value(&result.report).unwrap();

        assert_eq!(json["tiles"][0]["tile"], 3);
        assert_eq!(json["tiles"][0]["status"], "empty");
        assert!(json["tiles"][0].get("error").is_none());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn tile_lists() -> impl Strategy<Value = (Vec<u32>, Vec<u32>)> {
            prop::collection::btree_set(1u32..500, 0..30)
                .prop_map(|set| set.into_iter().collect::<Vec<_>>())
                .prop_flat_map(|sorted| (Just(sorted.clone()), Just(sorted).prop_shuffle()))
        }

        proptest! {
            #[test]
            fn test_fold_ignores_completion_order((sorted, shuffled) in tile_lists()) {
                let ordered = fold_outcomes(
                    sorted.iter().map(|&t| (TileId(t), outcome_for(t))).collect(),
                );
                let unordered = fold_outcomes(
                    shuffled.iter().map(|&t| (TileId(t), outcome_for(t))).collect(),
                );
                prop_assert_eq!(&ordered, &unordered);

                let tiles: Vec<TileId> = ordered.report.tiles.iter().map(|r| r.tile).collect();
                let mut expected = tiles.clone();
                expected.sort();
                prop_assert_eq!(tiles, expected);
            }

            #[test]
            fn test_only_successes_contribute(tiles in prop::collection::btree_set(1u32..500, 0..30)) {
                let result = fold_outcomes(
                    tiles.iter().map(|&t| (TileId(t), outcome_for(t))).collect(),
                );
                let successes = tiles.iter().filter(|&&t| t % 3 == 1).count();
                prop_assert_eq!(result.buffer_layers.len(), successes);
                prop_assert_eq!(result.polyline_layers.len(), successes);
                prop_assert_eq!(
                    result.report.succeeded + result.report.empty + result.report.failed,
                    tiles.len()
                );
            }
        }
    }
}
