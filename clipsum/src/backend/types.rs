//! Value and parameter types shared by backend operations.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An attribute value on a feature or table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of the value.
    ///
    /// Floats convert only when they carry no fractional part, so a tile
    /// field stored as `3.0` still reads as tile 3.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            AttrValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Equality that treats `Int(3)` and `Float(3.0)` as the same value.
    pub fn loosely_eq(&self, other: &AttrValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Total order used for grouping and sorting.
    ///
    /// Nulls sort first, then numbers (ints and floats compared together),
    /// then text.
    pub fn total_cmp(&self, other: &AttrValue) -> Ordering {
        fn rank(v: &AttrValue) -> u8 {
            match v {
                AttrValue::Null => 0,
                AttrValue::Int(_) | AttrValue::Float(_) => 1,
                AttrValue::Text(_) => 2,
            }
        }

        match (self, other) {
            (AttrValue::Text(a), AttrValue::Text(b)) => a.cmp(b),
            (AttrValue::Int(a), AttrValue::Int(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => rank(self).cmp(&rank(other)),
            },
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => write!(f, "<null>"),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Text(v) => write!(f, "'{}'", v),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

/// Storage type of an attribute field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// 64-bit floating point.
    Double,
    /// 64-bit integer.
    Long,
    /// Free text.
    Text,
}

/// A named, typed attribute field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Geometry measure written by [`compute_geometry_measure`].
///
/// Geodesic measures are computed on the ellipsoid and come out in square
/// meters and meters respectively.
///
/// [`compute_geometry_measure`]: super::GeoprocessingBackend::compute_geometry_measure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureKind {
    GeodesicArea,
    GeodesicLength,
}

impl fmt::Display for MeasureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureKind::GeodesicArea => write!(f, "geodesic area"),
            MeasureKind::GeodesicLength => write!(f, "geodesic length"),
        }
    }
}

/// Which input features survive a spatial join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Keep every input feature; unmatched ones get null join attributes.
    KeepAll,
    /// Drop input features that overlap no join feature.
    KeepMatchingOnly,
}

/// Arithmetic applied to a numeric field in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldExpression {
    DivideBy(f64),
    MultiplyBy(f64),
}

impl FieldExpression {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            FieldExpression::DivideBy(d) => value / d,
            FieldExpression::MultiplyBy(m) => value * m,
        }
    }
}

impl fmt::Display for FieldExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldExpression::DivideBy(d) => write!(f, "value / {}", d),
            FieldExpression::MultiplyBy(m) => write!(f, "value * {}", m),
        }
    }
}

/// Attribute filter over features.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field = value`, numerically loose.
    Equals { field: String, value: AttrValue },
}

impl Predicate {
    pub fn equals(field: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Predicate::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Field the predicate reads.
    pub fn field(&self) -> &str {
        match self {
            Predicate::Equals { field, .. } => field,
        }
    }

    /// Evaluate against a feature's attributes. Missing fields never match.
    pub fn matches(&self, attributes: &BTreeMap<String, AttrValue>) -> bool {
        match self {
            Predicate::Equals { field, value } => attributes
                .get(field)
                .map(|v| v.loosely_eq(value))
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals { field, value } => write!(f, "{} = {}", field, value),
        }
    }
}

/// A layer, optionally narrowed to the features matching a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSelection {
    pub layer: String,
    pub predicate: Option<Predicate>,
}

impl LayerSelection {
    /// Every feature of `layer`.
    pub fn all(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            predicate: None,
        }
    }

    /// Features of `layer` matching `predicate`.
    pub fn filtered(layer: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            layer: layer.into(),
            predicate: Some(predicate),
        }
    }
}

impl fmt::Display for LayerSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.predicate {
            Some(p) => write!(f, "{} where {}", self.layer, p),
            None => write!(f, "{}", self.layer),
        }
    }
}
