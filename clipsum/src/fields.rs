//! Measure-field provisioning.

use tracing::debug;

use crate::backend::{BackendResult, FieldType, GeoprocessingBackend};

/// Make sure `layer` carries the numeric area and length fields.
///
/// Missing fields are added as `Double`; fields that already exist are left
/// alone, so repeated calls are safe.
pub fn ensure_fields<B: GeoprocessingBackend + ?Sized>(
    backend: &B,
    layer: &str,
    area_field: &str,
    length_field: &str,
) -> BackendResult<()> {
    debug!(layer, "Checking geometry fields");
    let existing = backend.list_fields(layer)?;

    for field in [area_field, length_field] {
        if !existing.iter().any(|f| f == field) {
            backend.add_field(layer, field, FieldType::Double)?;
            debug!(layer, field, "Added geometry field");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Feature, FeatureLayer, GeometryKind, MemoryBackend};
    use geo::{Coord, Geometry, Rect};

    fn backend_with_layer(fields: &[&str]) -> MemoryBackend {
        let mut layer = FeatureLayer::new(GeometryKind::Polygon).with_feature(Feature::new(
            Geometry::Rect(Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 })),
        ));
        for field in fields {
            layer = layer.with_field(*field, FieldType::Double);
        }
        let backend = MemoryBackend::new();
        backend.insert_layer("clip", layer).unwrap();
        backend
    }

    fn count(fields: &[String], name: &str) -> usize {
        fields.iter().filter(|f| f.as_str() == name).count()
    }

    #[test]
    fn test_adds_missing_fields() {
        let backend = backend_with_layer(&[]);
        ensure_fields(&backend, "clip", "Calc_Area", "Calc_Length").unwrap();

        let fields = backend.list_fields("clip").unwrap();
        assert_eq!(count(&fields, "Calc_Area"), 1);
        assert_eq!(count(&fields, "Calc_Length"), 1);
    }

    #[test]
    fn test_twice_leaves_one_of_each() {
        let backend = backend_with_layer(&[]);
        ensure_fields(&backend, "clip", "Calc_Area", "Calc_Length").unwrap();
        ensure_fields(&backend, "clip", "Calc_Area", "Calc_Length").unwrap();

        let fields = backend.list_fields("clip").unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(count(&fields, "Calc_Area"), 1);
        assert_eq!(count(&fields, "Calc_Length"), 1);
    }

    #[test]
    fn test_only_adds_the_absent_field() {
        let backend = backend_with_layer(&["Calc_Area"]);
        ensure_fields(&backend, "clip", "Calc_Area", "Calc_Length").unwrap();

        let fields = backend.list_fields("clip").unwrap();
        assert_eq!(fields, vec!["Calc_Area".to_string(), "Calc_Length".to_string()]);
    }

    #[test]
    fn test_missing_layer_is_an_error() {
        let backend = MemoryBackend::new();
        assert!(ensure_fields(&backend, "nope", "Calc_Area", "Calc_Length").is_err());
    }
}
