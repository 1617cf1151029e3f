//! Geoprocessing capability interface.
//!
//! The pipeline never touches geometry directly. Every clip, measurement,
//! join, merge and statistics call goes through the [`GeoprocessingBackend`]
//! trait so the orchestration can run against any engine that exposes
//! named vector layers and tables.
//!
//! # Implementations
//!
//! - [`MemoryBackend`] - In-memory feature lists with geometry delegated to `geo`
//!
//! # Example
//!
//! ```ignore
//! use clipsum::backend::{GeoprocessingBackend, MemoryBackend, Predicate};
//!
//! let backend = MemoryBackend::new();
//! backend.insert_layer("boundary", boundary_layer)?;
//!
//! let count = backend.count_matching("boundary", Some(&Predicate::equals("SeqId", 3)))?;
//! ```

mod error;
mod memory;
mod types;

pub use error::{BackendError, BackendResult};
pub use memory::{
    sum_field_name, Feature, FeatureLayer, GeometryKind, MemoryBackend, Table, FREQUENCY_FIELD,
    JOIN_COUNT_FIELD,
};
pub use types::{
    AttrValue, FieldDef, FieldExpression, FieldType, JoinPolicy, LayerSelection, MeasureKind,
    Predicate,
};

/// Capabilities the pipeline needs from a geoprocessing engine.
///
/// All operations address datasets by name within a single workspace.
/// Operations that produce a dataset take the output name explicitly and
/// return it; writing to a name that already exists is an error, callers
/// delete stale outputs first when overwriting is allowed.
///
/// Implementations must be `Send + Sync` so tiles can be processed from a
/// thread pool.
pub trait GeoprocessingBackend: Send + Sync {
    /// Count features of `layer` matching `predicate` (all features if `None`).
    fn count_matching(&self, layer: &str, predicate: Option<&Predicate>) -> BackendResult<usize>;

    /// Distinct values of `field` across all features of `layer`, sorted.
    fn distinct_values(&self, layer: &str, field: &str) -> BackendResult<Vec<AttrValue>>;

    /// Clip `input` against the features picked by `clip`, writing `output`.
    fn clip(&self, input: &str, clip: &LayerSelection, output: &str) -> BackendResult<String>;

    /// Names of the attribute fields currently on `layer`.
    fn list_fields(&self, layer: &str) -> BackendResult<Vec<String>>;

    /// Add an attribute field to `layer`.
    fn add_field(&self, layer: &str, field: &str, field_type: FieldType) -> BackendResult<()>;

    /// Write a geometry measure of every feature into `field`.
    fn compute_geometry_measure(
        &self,
        layer: &str,
        field: &str,
        measure: MeasureKind,
    ) -> BackendResult<()>;

    /// Rewrite `field` on every feature by applying `expression` to its value.
    fn recompute_field(
        &self,
        layer: &str,
        field: &str,
        expression: FieldExpression,
    ) -> BackendResult<()>;

    /// Transfer attributes from `join` onto `input` features by spatial overlap.
    fn spatial_join(
        &self,
        input: &str,
        join: &str,
        policy: JoinPolicy,
        output: &str,
    ) -> BackendResult<String>;

    /// Concatenate the features of `inputs` into a new layer `output`.
    fn merge(&self, inputs: &[String], output: &str) -> BackendResult<String>;

    /// Sum `sum_field` grouped by `group_by` into a new table `output`.
    fn grouped_statistics(
        &self,
        input: &str,
        sum_field: &str,
        group_by: &[String],
        output: &str,
    ) -> BackendResult<String>;

    /// Number of rows or features in a layer or table.
    fn feature_count(&self, name: &str) -> BackendResult<usize> {
        self.count_matching(name, None)
    }

    /// Whether a layer or table named `name` exists.
    fn exists(&self, name: &str) -> bool;

    /// Delete the layer or table named `name`.
    fn delete(&self, name: &str) -> BackendResult<()>;
}

/// Delete `name` if it exists.
///
/// Returns `true` when something was deleted.
pub fn delete_if_exists<B: GeoprocessingBackend + ?Sized>(
    backend: &B,
    name: &str,
) -> BackendResult<bool> {
    if backend.exists(name) {
        backend.delete(name)?;
        Ok(true)
    } else {
        Ok(false)
    }
}
