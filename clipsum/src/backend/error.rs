//! Backend error types.

use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors raised by a geoprocessing backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
    /// No layer or table with this name exists.
    #[error("dataset not found: {0}")]
    NotFound(String),

    /// The output name is already taken.
    #[error("output already exists: {0}")]
    OutputExists(String),

    /// The dataset exists but is a table where a layer is required.
    #[error("{0} is a table, not a feature layer")]
    NotALayer(String),

    /// The field is not part of the dataset schema.
    #[error("field {field} not found on {dataset}")]
    FieldNotFound { dataset: String, field: String },

    /// The field is already part of the dataset schema.
    #[error("field {field} already exists on {dataset}")]
    FieldExists { dataset: String, field: String },

    /// A field holds a value of the wrong type for the requested operation.
    #[error("field {field} on {dataset} is not numeric")]
    NotNumeric { dataset: String, field: String },

    /// The measure does not apply to the geometry type of the layer.
    #[error("cannot compute {measure} on {dataset}: {reason}")]
    InvalidMeasure {
        dataset: String,
        measure: String,
        reason: String,
    },

    /// Merge inputs do not share a geometry type.
    #[error("geometry type mismatch in merge: {0}")]
    GeometryMismatch(String),

    /// Merge was called without inputs.
    #[error("merge requires at least one input")]
    EmptyInput,

    /// Engine-specific failure.
    #[error("geoprocessing failed: {0}")]
    Engine(String),
}
