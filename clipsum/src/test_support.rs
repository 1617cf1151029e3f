//! Shared fixtures for unit tests.

use std::sync::Arc;

use geo::{Coord, Geometry, LineString, Rect};

use crate::backend::{Feature, FeatureLayer, FieldType, GeometryKind, MemoryBackend};
use crate::config::{BOUNDARY_LAYER, BUFFER_LAYER, POLYLINE_LAYER};

/// Width of one fixture tile in degrees.
pub const TILE_WIDTH: f64 = 0.01;

pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Geometry<f64> {
    Geometry::Rect(Rect::new(
        Coord { x: min_x, y: min_y },
        Coord { x: max_x, y: max_y },
    ))
}

/// Boundary and wetland layers for the given `(tile, buffers, polylines)`.
///
/// Tile `t` covers x in `[(t - 1) * TILE_WIDTH, t * TILE_WIDTH]`. Each tile
/// gets the requested number of small buffer squares and horizontal
/// polylines, all strictly inside it, alternating between two
/// classifications.
pub fn tiled_backend(tiles: &[(u32, usize, usize)]) -> Arc<MemoryBackend> {
    let mut boundary = FeatureLayer::new(GeometryKind::Polygon).with_field("SeqId", FieldType::Long);
    let mut buffer = FeatureLayer::new(GeometryKind::Polygon)
        .with_field("Cowardin_Aggregate", FieldType::Text);
    let mut polyline = FeatureLayer::new(GeometryKind::Polyline)
        .with_field("Cowardin_Aggregate", FieldType::Text);

    for &(tile, buffers, polylines) in tiles {
        let x0 = f64::from(tile - 1) * TILE_WIDTH;
        boundary = boundary.with_feature(
            Feature::new(rect(x0, 0.0, x0 + TILE_WIDTH, TILE_WIDTH)).with_attr("SeqId", tile),
        );

        for k in 0..buffers {
            let x = x0 + 0.001 + k as f64 * 0.0008;
            let class = if k % 2 == 0 { "PEM" } else { "PFO" };
            buffer = buffer.with_feature(
                Feature::new(rect(x, 0.002, x + 0.0005, 0.0025))
                    .with_attr("Cowardin_Aggregate", class),
            );
        }

        for k in 0..polylines {
            let y = 0.004 + k as f64 * 0.0005;
            let class = if k % 2 == 0 { "R2UB" } else { "PEM" };
            polyline = polyline.with_feature(
                Feature::new(LineString::from(vec![(x0 + 0.002, y), (x0 + 0.008, y)]))
                    .with_attr("Cowardin_Aggregate", class),
            );
        }
    }

    let backend = MemoryBackend::new();
    for (name, layer) in [
        (BOUNDARY_LAYER, boundary),
        (BUFFER_LAYER, buffer),
        (POLYLINE_LAYER, polyline),
    ] {
        if let Err(e) = backend.insert_layer(name, layer) {
            panic!("fixture layer {}: {}", name, e);
        }
    }
    Arc::new(backend)
}
