//! GeoJSON workspace on disk.
//!
//! Source layers are read from GeoJSON files into a [`MemoryBackend`], and
//! the run artifacts are written back next to them:
//!
//! ```text
//! <directory>/
//! ├── boundary.geojson            (source)
//! ├── wetland_buffer.geojson      (source)
//! ├── wetland_polyline.geojson    (source)
//! ├── Master_Joined_Buffer.geojson
//! ├── Master_Joined_Polyline.geojson
//! ├── Buffer_Summary_Master.json
//! └── Polyline_Summary_Master.json
//! ```
//!
//! Per-tile intermediates stay in memory and are never written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use geo::Geometry;
use geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{
    AttrValue, BackendError, Feature, FeatureLayer, FieldDef, FieldType, GeometryKind,
    GeoprocessingBackend, MemoryBackend, Table,
};
use crate::config::{LayerNames, LayerSettings, OutputNames};

/// Errors reading or writing workspace files.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid GeoJSON in {}: {message}", .path.display())]
    GeoJson { path: PathBuf, message: String },

    #[error("failed to write {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: expected {expected:?} features, found {found}", .path.display())]
    GeometryKind {
        path: PathBuf,
        expected: GeometryKind,
        found: String,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Artifacts touched by [`GeoJsonWorkspace::persist_outputs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedOutputs {
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

/// A directory of GeoJSON sources and run artifacts.
#[derive(Debug, Clone)]
pub struct GeoJsonWorkspace {
    directory: PathBuf,
}

impl GeoJsonWorkspace {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Resolve a source path; relative paths are taken from the workspace.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.directory.join(path)
        }
    }

    /// Where a master layer named `name` is written.
    pub fn layer_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.geojson", name))
    }

    /// Where a summary table named `name` is written.
    pub fn table_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.json", name))
    }

    /// Load the three source layers into `backend` under `names`.
    pub fn load_sources(
        &self,
        backend: &MemoryBackend,
        sources: &LayerSettings,
        names: &LayerNames,
    ) -> Result<(), WorkspaceError> {
        for (name, path, kind) in [
            (&names.boundary, &sources.boundary, GeometryKind::Polygon),
            (&names.buffer, &sources.buffer, GeometryKind::Polygon),
            (&names.polyline, &sources.polyline, GeometryKind::Polyline),
        ] {
            let path = self.resolve(path);
            let layer = read_layer(&path, kind)?;
            info!(
                layer = %name,
                path = %path.display(),
                features = layer.len(),
                "Loaded source layer"
            );
            backend.insert_layer(name, layer)?;
        }
        Ok(())
    }

    /// Write a feature layer to `<name>.geojson`.
    pub fn save_layer(&self, name: &str, layer: &FeatureLayer) -> Result<PathBuf, WorkspaceError> {
        let path = self.layer_path(name);
        write_layer(&path, layer)?;
        debug!(path = %path.display(), features = layer.len(), "Wrote layer");
        Ok(path)
    }

    /// Write a table's rows to `<name>.json`.
    pub fn save_table(&self, name: &str, table: &Table) -> Result<PathBuf, WorkspaceError> {
        let path = self.table_path(name);
        let json = serde_json::to_string_pretty(&table.rows).map_err(|source| {
            WorkspaceError::Json {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(|source| WorkspaceError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), rows = table.len(), "Wrote table");
        Ok(path)
    }

    /// Remove a file if present. Returns whether anything was removed.
    pub fn remove_artifact(&self, path: &Path) -> Result<bool, WorkspaceError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(WorkspaceError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Write the master layers and summary tables that exist in `backend`.
    ///
    /// An artifact whose dataset is absent (its kind was skipped or failed)
    /// has any stale file from an earlier run removed.
    pub fn persist_outputs(
        &self,
        backend: &MemoryBackend,
        outputs: &OutputNames,
    ) -> Result<PersistedOutputs, WorkspaceError> {
        fs::create_dir_all(&self.directory).map_err(|source| WorkspaceError::Io {
            path: self.directory.clone(),
            source,
        })?;

        let mut persisted = PersistedOutputs::default();

        for name in [&outputs.master_buffer, &outputs.master_polyline] {
            if backend.exists(name) {
                let layer = backend.layer(name)?;
                persisted.written.push(self.save_layer(name, &layer)?);
            } else {
                let path = self.layer_path(name);
                if self.remove_artifact(&path)? {
                    persisted.removed.push(path);
                }
            }
        }

        for name in [&outputs.summary_buffer, &outputs.summary_polyline] {
            if backend.exists(name) {
                let table = backend.table(name)?;
                persisted.written.push(self.save_table(name, &table)?);
            } else {
                let path = self.table_path(name);
                if self.remove_artifact(&path)? {
                    persisted.removed.push(path);
                }
            }
        }

        for path in &persisted.removed {
            info!(path = %path.display(), "Removed stale artifact");
        }
        Ok(persisted)
    }
}

/// Read a GeoJSON file whose features must all be of `kind`.
///
/// Features without a geometry are skipped. Field types are inferred from
/// the property values: integers only give `Long`, any other number gives
/// `Double`, anything else `Text`.
pub fn read_layer(path: &Path, kind: GeometryKind) -> Result<FeatureLayer, WorkspaceError> {
    let contents = fs::read_to_string(path).map_err(|source| WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let geojson: GeoJson = contents.parse().map_err(|e: geojson::Error| {
        WorkspaceError::GeoJson {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![geojson::Feature::from(g)],
    };

    let mut layer = FeatureLayer::new(kind);
    let mut skipped = 0;
    for feature in features {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        let geometry =
            Geometry::<f64>::try_from(geometry).map_err(|e| WorkspaceError::GeoJson {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        match GeometryKind::of(&geometry) {
            Some(found) if found == kind => {}
            found => {
                return Err(WorkspaceError::GeometryKind {
                    path: path.to_path_buf(),
                    expected: kind,
                    found: found
                        .map(|k| format!("{:?}", k))
                        .unwrap_or_else(|| "GeometryCollection".to_string()),
                })
            }
        }

        let mut out = Feature::new(geometry);
        for (name, value) in feature.properties.unwrap_or_default() {
            out.attributes.insert(name, json_to_attr(value));
        }
        layer.features.push(out);
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "Skipped features without geometry");
    }

    layer.fields = infer_fields(&layer.features);
    Ok(layer)
}

/// Write a feature layer as a GeoJSON feature collection.
pub fn write_layer(path: &Path, layer: &FeatureLayer) -> Result<(), WorkspaceError> {
    let features = layer
        .features
        .iter()
        .map(|f| geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&f.geometry))),
            id: None,
            properties: Some(attrs_to_json(&layer.fields, f)),
            foreign_members: None,
        })
        .collect();

    let collection = GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    });

    fs::write(path, collection.to_string()).map_err(|source| WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn json_to_attr(value: JsonValue) -> AttrValue {
    match value {
        JsonValue::Null => AttrValue::Null,
        JsonValue::Bool(b) => AttrValue::Int(i64::from(b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttrValue::Int(i),
            None => n.as_f64().map(AttrValue::Float).unwrap_or(AttrValue::Null),
        },
        JsonValue::String(s) => AttrValue::Text(s),
        other => AttrValue::Text(other.to_string()),
    }
}

fn attr_to_json(value: &AttrValue) -> JsonValue {
    match value {
        AttrValue::Null => JsonValue::Null,
        AttrValue::Int(i) => JsonValue::from(*i),
        AttrValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttrValue::Text(s) => JsonValue::String(s.clone()),
    }
}

/// Properties for one feature; every schema field is present.
fn attrs_to_json(fields: &[FieldDef], feature: &Feature) -> JsonObject {
    let mut properties = JsonObject::new();
    for field in fields {
        properties.insert(field.name.clone(), attr_to_json(feature.attr(&field.name)));
    }
    for (name, value) in &feature.attributes {
        if !properties.contains_key(name) {
            properties.insert(name.clone(), attr_to_json(value));
        }
    }
    properties
}

fn infer_fields(features: &[Feature]) -> Vec<FieldDef> {
    let mut fields: Vec<FieldDef> = Vec::new();
    let mut seen: Vec<(String, Option<FieldType>)> = Vec::new();

    for feature in features {
        for (name, value) in &feature.attributes {
            let observed = match value {
                AttrValue::Null => None,
                AttrValue::Int(_) => Some(FieldType::Long),
                AttrValue::Float(_) => Some(FieldType::Double),
                AttrValue::Text(_) => Some(FieldType::Text),
            };
            match seen.iter_mut().find(|(n, _)| n == name) {
                Some((_, current)) => *current = widen(*current, observed),
                None => seen.push((name.clone(), observed)),
            }
        }
    }

    for (name, field_type) in seen {
        fields.push(FieldDef::new(name, field_type.unwrap_or(FieldType::Text)));
    }
    fields
}

fn widen(current: Option<FieldType>, observed: Option<FieldType>) -> Option<FieldType> {
    use FieldType::*;
    match (current, observed) {
        (a, None) => a,
        (None, b) => b,
        (Some(Text), _) | (_, Some(Text)) => Some(Text),
        (Some(Long), Some(Long)) => Some(Long),
        _ => Some(Double),
    }
}
