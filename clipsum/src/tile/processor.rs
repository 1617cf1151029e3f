//! Clip, measure and join for a single tile.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{TileError, TileId, TileLayerNames, TileOutcome, TileOutputs, TileStage};
use crate::backend::{
    delete_if_exists, BackendError, BackendResult, GeoprocessingBackend, JoinPolicy,
    LayerSelection, MeasureKind, Predicate,
};
use crate::config::ProcessingConfig;
use crate::fields::ensure_fields;
use crate::units::{AREA_TO_ACRES, LENGTH_TO_FEET};

/// Runs the per-tile sequence against a backend.
///
/// Failures never escape [`process_tile`](Self::process_tile): they are
/// logged and turned into [`TileOutcome::Failed`], and any outputs the tile
/// already wrote are removed again.
pub struct TileProcessor {
    backend: Arc<dyn GeoprocessingBackend>,
    config: ProcessingConfig,
}

impl TileProcessor {
    pub fn new(backend: Arc<dyn GeoprocessingBackend>, config: ProcessingConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Process one tile.
    pub fn process_tile(&self, tile: TileId) -> TileOutcome {
        let names = TileLayerNames::for_tile(tile);
        let mut created = Vec::new();

        match self.run(tile, &names, &mut created) {
            Ok(Some(outputs)) => {
                info!(
                    tile = %tile,
                    buffer_features = outputs.buffer_features,
                    polyline_features = outputs.polyline_features,
                    "Clipping and spatial join complete"
                );
                TileOutcome::Success(outputs)
            }
            Ok(None) => TileOutcome::Empty,
            Err(err) => {
                error!(
                    tile = %tile,
                    stage = %err.stage,
                    error = %err.source,
                    "Tile processing failed"
                );
                self.discard(tile, &created);
                TileOutcome::Failed(err)
            }
        }
    }

    fn run(
        &self,
        tile: TileId,
        names: &TileLayerNames,
        created: &mut Vec<String>,
    ) -> Result<Option<TileOutputs>, TileError> {
        let fail = move |stage: TileStage| {
            move |source: BackendError| TileError {
                tile,
                stage,
                source,
            }
        };
        let layers = &self.config.layers;
        let fields = &self.config.fields;

        let selection = LayerSelection::filtered(
            layers.boundary.clone(),
            Predicate::equals(fields.tile.clone(), tile.value()),
        );
        let selected = self
            .backend
            .count_matching(&layers.boundary, selection.predicate.as_ref())
            .map_err(fail(TileStage::Selecting))?;
        if selected == 0 {
            warn!(tile = %tile, field = %fields.tile, "No boundary features selected, skipping");
            return Ok(None);
        }
        debug!(tile = %tile, selected, "Selected boundary features");

        // Buffer polygons: clip, then acres
        self.write_output(&names.clip_buffer, created, |out| {
            self.backend.clip(&layers.buffer, &selection, out)
        })
        .map_err(fail(TileStage::Clipping))?;
        self.measure(&names.clip_buffer, MeasureKind::GeodesicArea)
            .map_err(fail(TileStage::Measuring))?;

        // Intersect polylines: clip, then feet
        self.write_output(&names.clip_polyline, created, |out| {
            self.backend.clip(&layers.polyline, &selection, out)
        })
        .map_err(fail(TileStage::Clipping))?;
        self.measure(&names.clip_polyline, MeasureKind::GeodesicLength)
            .map_err(fail(TileStage::Measuring))?;

        // Clipping drops or blurs the tile id, take it back from the boundary
        for (input, output) in [
            (&names.clip_buffer, &names.joined_buffer),
            (&names.clip_polyline, &names.joined_polyline),
        ] {
            self.write_output(output, created, |out| {
                self.backend
                    .spatial_join(input, &layers.boundary, JoinPolicy::KeepMatchingOnly, out)
            })
            .map_err(fail(TileStage::Joining))?;
        }

        let buffer_features = self
            .backend
            .feature_count(&names.joined_buffer)
            .map_err(fail(TileStage::Joining))?;
        let polyline_features = self
            .backend
            .feature_count(&names.joined_polyline)
            .map_err(fail(TileStage::Joining))?;

        Ok(Some(TileOutputs {
            buffer: names.joined_buffer.clone(),
            polyline: names.joined_polyline.clone(),
            buffer_features,
            polyline_features,
        }))
    }

    /// Ensure the measure fields, compute the geodesic measure and convert units.
    fn measure(&self, layer: &str, measure: MeasureKind) -> BackendResult<()> {
        let fields = &self.config.fields;
        ensure_fields(self.backend.as_ref(), layer, &fields.area, &fields.length)?;

        let (field, conversion) = match measure {
            MeasureKind::GeodesicArea => (&fields.area, AREA_TO_ACRES),
            MeasureKind::GeodesicLength => (&fields.length, LENGTH_TO_FEET),
        };
        self.backend.compute_geometry_measure(layer, field, measure)?;
        self.backend.recompute_field(layer, field, conversion)
    }

    /// Write one output dataset, clearing a stale copy first when allowed.
    fn write_output(
        &self,
        name: &str,
        created: &mut Vec<String>,
        write: impl FnOnce(&str) -> BackendResult<String>,
    ) -> BackendResult<()> {
        if self.config.overwrite_output && delete_if_exists(self.backend.as_ref(), name)? {
            debug!(layer = name, "Replaced existing output");
        }
        let written = write(name)?;
        created.push(written);
        Ok(())
    }

    /// Remove the outputs a failed tile managed to write.
    fn discard(&self, tile: TileId, created: &[String]) {
        for name in created {
            if let Err(e) = delete_if_exists(self.backend.as_ref(), name) {
                warn!(tile = %tile, layer = %name, error = %e, "Failed to remove partial output");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        AttrValue, Feature, FeatureLayer, FieldType, GeometryKind, MemoryBackend,
    };
    use geo::{Coord, Geometry, LineString, Rect};

    fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Geometry<f64> {
        Geometry::Rect(Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        ))
    }

    /// Tiles 1 and 2 side by side, each 0.01 degrees wide.
    fn setup() -> Arc<MemoryBackend> {
        let backend = MemoryBackend::new();
        let boundary = FeatureLayer::new(GeometryKind::Polygon)
            .with_field("SeqId", FieldType::Long)
            .with_feature(Feature::new(rect(0.0, 0.0, 0.01, 0.01)).with_attr("SeqId", 1))
            .with_feature(Feature::new(rect(0.01, 0.0, 0.02, 0.01)).with_attr("SeqId", 2));
        let buffer = FeatureLayer::new(GeometryKind::Polygon)
            .with_field("Cowardin_Aggregate", FieldType::Text)
            .with_feature(
                Feature::new(rect(0.002, 0.002, 0.004, 0.004))
                    .with_attr("Cowardin_Aggregate", "PEM"),
            )
            .with_feature(
                Feature::new(rect(0.012, 0.002, 0.014, 0.004))
                    .with_attr("Cowardin_Aggregate", "PFO"),
            );
        let polyline = FeatureLayer::new(GeometryKind::Polyline)
            .with_field("Cowardin_Aggregate", FieldType::Text)
            .with_feature(
                Feature::new(LineString::from(vec![(0.002, 0.005), (0.018, 0.005)]))
                    .with_attr("Cowardin_Aggregate", "R2UB"),
            );
        backend.insert_layer("boundary", boundary).unwrap();
        backend.insert_layer("wetland_buffer", buffer).unwrap();
        backend.insert_layer("wetland_polyline", polyline).unwrap();
        Arc::new(backend)
    }

    fn processor(backend: &Arc<MemoryBackend>) -> TileProcessor {
        TileProcessor::new(backend.clone(), ProcessingConfig::default())
    }

    #[test]
    fn test_success_produces_joined_layers() {
        let backend = setup();
        let outcome = processor(&backend).process_tile(TileId(1));

        let outputs = outcome.outputs().expect("tile 1 should succeed").clone();
        assert_eq!(outputs.buffer, "joined_clip_buffer_fc_1");
        assert_eq!(outputs.polyline, "joined_clip_polyline_fc_1");
        assert_eq!(outputs.buffer_features, 1);
        assert_eq!(outputs.polyline_features, 1);

        let joined = backend.layer(&outputs.buffer).unwrap();
        assert_eq!(joined.features[0].attr("SeqId"), &AttrValue::Int(1));
        let acres = joined.features[0].attr("Calc_Area").as_f64().unwrap();
        // 0.002 x 0.002 degrees at the equator is roughly 12.2 acres
        assert!(acres > 11.0 && acres < 13.5, "acres was {}", acres);

        let lines = backend.layer(&outputs.polyline).unwrap();
        let feet = lines.features[0].attr("Calc_Length").as_f64().unwrap();
        // Clipped to x in [0.002, 0.01]: about 890 m
        assert!(feet > 2850.0 && feet < 2990.0, "feet was {}", feet);
    }

    #[test]
    fn test_empty_tile_creates_nothing() {
        let backend = setup();
        let before = backend.dataset_names();

        let outcome = processor(&backend).process_tile(TileId(9));

        assert_eq!(outcome, TileOutcome::Empty);
        assert_eq!(backend.dataset_names(), before);
    }

    #[test]
    fn test_failure_is_contained_and_cleaned_up() {
        let backend = setup();
        backend.delete("wetland_polyline").unwrap();
        let before = backend.dataset_names();

        let outcome = processor(&backend).process_tile(TileId(1));

        match outcome {
            TileOutcome::Failed(err) => {
                assert_eq!(err.tile, TileId(1));
                assert_eq!(err.stage, TileStage::Clipping);
                assert_eq!(
                    err.source,
                    BackendError::NotFound("wetland_polyline".to_string())
                );
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(backend.dataset_names(), before);
    }

    #[test]
    fn test_missing_tile_field_fails_while_selecting() {
        let backend = setup();
        let mut config = ProcessingConfig::default();
        config.fields.tile = "TileNo".to_string();

        let outcome = TileProcessor::new(backend.clone(), config).process_tile(TileId(1));

        match outcome {
            TileOutcome::Failed(err) => assert_eq!(err.stage, TileStage::Selecting),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_rerun_overwrites_intermediates() {
        let backend = setup();
        let processor = processor(&backend);

        let first = processor.process_tile(TileId(2));
        let second = processor.process_tile(TileId(2));

        assert!(first.is_success());
        assert_eq!(first, second);
    }

    #[test]
    fn test_rerun_without_overwrite_fails_and_keeps_prior_outputs() {
        let backend = setup();
        let mut config = ProcessingConfig::default();
        config.overwrite_output = false;
        let processor = TileProcessor::new(backend.clone(), config);

        assert!(processor.process_tile(TileId(2)).is_success());
        let outcome = processor.process_tile(TileId(2));

        match outcome {
            TileOutcome::Failed(err) => {
                assert_eq!(err.stage, TileStage::Clipping);
                assert_eq!(
                    err.source,
                    BackendError::OutputExists("clip_buffer_fc_2".to_string())
                );
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(backend.exists("joined_clip_buffer_fc_2"));
    }
}
