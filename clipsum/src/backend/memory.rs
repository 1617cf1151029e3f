//! In-memory geoprocessing backend.
//!
//! Layers are plain feature lists held in a name-indexed catalog. Geometry
//! work is delegated to the `geo` crate:
//!
//! - Clip: polygon boolean intersection, line clipping against the clip area
//! - Geodesic area / length: ellipsoidal measures (coordinates are lon/lat)
//! - Spatial join: interiors-intersect test via the DE-9IM relate matrix
//!
//! The catalog sits behind a `parking_lot::RwLock`, so one backend can be
//! shared by tiles processed on several threads.

use std::collections::{BTreeMap, HashMap};

use geo::orient::Direction;
use geo::{
    Area, BooleanOps, Contains, Geodesic, GeodesicArea, Geometry, Intersects, Length, LineString,
    MultiLineString, MultiPoint, MultiPolygon, Orient, Relate,
};
use parking_lot::RwLock;

use super::error::{BackendError, BackendResult};
use super::types::{
    AttrValue, FieldDef, FieldExpression, FieldType, JoinPolicy, LayerSelection, MeasureKind,
    Predicate,
};
use super::GeoprocessingBackend;

/// Name of the row-count column written by grouped statistics.
pub const FREQUENCY_FIELD: &str = "FREQUENCY";

/// Name of the match-count column added by spatial joins.
pub const JOIN_COUNT_FIELD: &str = "Join_Count";

/// Name of the sum column grouped statistics writes for `field`.
pub fn sum_field_name(field: &str) -> String {
    format!("SUM_{}", field)
}

/// Broad geometry type shared by every feature of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    Polyline,
    Polygon,
}

impl GeometryKind {
    /// Classify a geometry, `None` for collections and other mixed types.
    pub fn of(geometry: &Geometry<f64>) -> Option<Self> {
        match geometry {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Some(GeometryKind::Point),
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                Some(GeometryKind::Polyline)
            }
            Geometry::Polygon(_)
            | Geometry::MultiPolygon(_)
            | Geometry::Rect(_)
            | Geometry::Triangle(_) => Some(GeometryKind::Polygon),
            Geometry::GeometryCollection(_) => None,
        }
    }
}

/// One feature: a geometry plus its attribute values.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Set an attribute value.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Attribute value, `Null` when absent.
    pub fn attr(&self, name: &str) -> &AttrValue {
        self.attributes.get(name).unwrap_or(&AttrValue::Null)
    }
}

/// A vector layer: schema, geometry kind and features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayer {
    pub kind: GeometryKind,
    pub fields: Vec<FieldDef>,
    pub features: Vec<Feature>,
}

impl FeatureLayer {
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
            features: Vec::new(),
        }
    }

    /// Add a field to the schema (no-op if already present).
    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        if !self.has_field(&name) {
            self.fields.push(FieldDef::new(name, field_type));
        }
        self
    }

    /// Append a feature.
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// An attribute-only table, as written by grouped statistics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub fields: Vec<FieldDef>,
    pub rows: Vec<BTreeMap<String, AttrValue>>,
}

impl Table {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Dataset {
    Layer(FeatureLayer),
    Table(Table),
}

impl Dataset {
    fn has_field(&self, name: &str) -> bool {
        match self {
            Dataset::Layer(l) => l.has_field(name),
            Dataset::Table(t) => t.has_field(name),
        }
    }

    fn fields(&self) -> &[FieldDef] {
        match self {
            Dataset::Layer(l) => &l.fields,
            Dataset::Table(t) => &t.fields,
        }
    }

    fn records(&self) -> Box<dyn Iterator<Item = &BTreeMap<String, AttrValue>> + '_> {
        match self {
            Dataset::Layer(l) => Box::new(l.features.iter().map(|f| &f.attributes)),
            Dataset::Table(t) => Box::new(t.rows.iter()),
        }
    }
}

/// Geoprocessing backend over in-memory feature lists.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    datasets: RwLock<HashMap<String, Dataset>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer under `name`.
    pub fn insert_layer(&self, name: &str, layer: FeatureLayer) -> BackendResult<()> {
        let mut datasets = self.datasets.write();
        if datasets.contains_key(name) {
            return Err(BackendError::OutputExists(name.to_string()));
        }
        datasets.insert(name.to_string(), Dataset::Layer(layer));
        Ok(())
    }

    /// Copy of the layer registered under `name`.
    pub fn layer(&self, name: &str) -> BackendResult<FeatureLayer> {
        let datasets = self.datasets.read();
        Ok(layer_ref(&datasets, name)?.clone())
    }

    /// Copy of the table registered under `name`.
    pub fn table(&self, name: &str) -> BackendResult<Table> {
        match self.datasets.read().get(name) {
            Some(Dataset::Table(t)) => Ok(t.clone()),
            Some(Dataset::Layer(_)) => Err(BackendError::Engine(format!(
                "{} is a feature layer, not a table",
                name
            ))),
            None => Err(BackendError::NotFound(name.to_string())),
        }
    }

    /// Names of every registered dataset, sorted.
    pub fn dataset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.datasets.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn with_layer_mut<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut FeatureLayer) -> BackendResult<T>,
    ) -> BackendResult<T> {
        let mut datasets = self.datasets.write();
        match datasets.get_mut(name) {
            Some(Dataset::Layer(layer)) => f(layer),
            Some(Dataset::Table(_)) => Err(BackendError::NotALayer(name.to_string())),
            None => Err(BackendError::NotFound(name.to_string())),
        }
    }

    fn store(&self, name: &str, dataset: Dataset) -> BackendResult<String> {
        let mut datasets = self.datasets.write();
        if datasets.contains_key(name) {
            return Err(BackendError::OutputExists(name.to_string()));
        }
        datasets.insert(name.to_string(), dataset);
        Ok(name.to_string())
    }
}

fn dataset_ref<'a>(
    datasets: &'a HashMap<String, Dataset>,
    name: &str,
) -> BackendResult<&'a Dataset> {
    datasets
        .get(name)
        .ok_or_else(|| BackendError::NotFound(name.to_string()))
}

fn layer_ref<'a>(
    datasets: &'a HashMap<String, Dataset>,
    name: &str,
) -> BackendResult<&'a FeatureLayer> {
    match dataset_ref(datasets, name)? {
        Dataset::Layer(layer) => Ok(layer),
        Dataset::Table(_) => Err(BackendError::NotALayer(name.to_string())),
    }
}

fn require_field(dataset: &Dataset, name: &str, field: &str) -> BackendResult<()> {
    if dataset.has_field(field) {
        Ok(())
    } else {
        Err(BackendError::FieldNotFound {
            dataset: name.to_string(),
            field: field.to_string(),
        })
    }
}

fn to_multi_polygon(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        _ => None,
    }
}

fn to_multi_line_string(geometry: &Geometry<f64>) -> Option<MultiLineString<f64>> {
    match geometry {
        Geometry::Line(l) => Some(MultiLineString::new(vec![LineString::from(vec![
            l.start, l.end,
        ])])),
        Geometry::LineString(ls) => Some(MultiLineString::new(vec![ls.clone()])),
        Geometry::MultiLineString(mls) => Some(mls.clone()),
        _ => None,
    }
}

/// Collapse single-part results back to their simple geometry type.
fn simplify_polygons(mut mp: MultiPolygon<f64>) -> Geometry<f64> {
    if mp.0.len() == 1 {
        if let Some(polygon) = mp.0.pop() {
            return Geometry::Polygon(polygon);
        }
    }
    Geometry::MultiPolygon(mp)
}

fn simplify_lines(mut mls: MultiLineString<f64>) -> Geometry<f64> {
    if mls.0.len() == 1 {
        if let Some(ls) = mls.0.pop() {
            return Geometry::LineString(ls);
        }
    }
    Geometry::MultiLineString(mls)
}

/// Intersect one feature geometry with the clip area.
///
/// Returns `None` when nothing of the feature lies inside.
fn clip_geometry(geometry: &Geometry<f64>, area: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    match GeometryKind::of(geometry)? {
        GeometryKind::Polygon => {
            let mp = to_multi_polygon(geometry)?;
            let mut clipped = mp.intersection(area).orient(Direction::Default);
            clipped.0.retain(|p| p.unsigned_area() > 0.0);
            (!clipped.0.is_empty()).then(|| simplify_polygons(clipped))
        }
        GeometryKind::Polyline => {
            let mls = to_multi_line_string(geometry)?;
            let mut clipped = area.clip(&mls, false);
            clipped.0.retain(|ls| ls.0.len() >= 2);
            (!clipped.0.is_empty()).then(|| simplify_lines(clipped))
        }
        GeometryKind::Point => match geometry {
            Geometry::Point(p) => area.contains(p).then(|| Geometry::Point(*p)),
            Geometry::MultiPoint(mp) => {
                let inside: Vec<_> = mp.0.iter().filter(|p| area.contains(*p)).copied().collect();
                (!inside.is_empty()).then(|| Geometry::MultiPoint(MultiPoint::new(inside)))
            }
            _ => None,
        },
    }
}

fn polygon_perimeter(mp: &MultiPolygon<f64>) -> f64 {
    mp.0.iter()
        .map(|p| {
            p.exterior().length::<Geodesic>()
                + p.interiors()
                    .iter()
                    .map(|r| r.length::<Geodesic>())
                    .sum::<f64>()
        })
        .sum()
}

/// Geodesic area in square meters, whatever the ring winding.
///
/// Exterior rings are oriented counter-clockwise first: the unsigned geodesic
/// area of a clockwise ring is the rest of the ellipsoid.
fn geodesic_area(geometry: &Geometry<f64>) -> f64 {
    to_multi_polygon(geometry)
        .map(|mp| mp.orient(Direction::Default).geodesic_area_signed().abs())
        .unwrap_or(0.0)
}

/// Geodesic length in meters; perimeter for polygons.
fn geodesic_length(geometry: &Geometry<f64>) -> f64 {
    if let Some(mp) = to_multi_polygon(geometry) {
        return polygon_perimeter(&mp);
    }
    to_multi_line_string(geometry)
        .map(|mls| mls.0.iter().map(|ls| ls.length::<Geodesic>()).sum())
        .unwrap_or(0.0)
}

/// True when the interiors of the two geometries share at least one point.
///
/// Features that merely touch a neighbouring tile along its edge do not match.
fn interiors_intersect(a: &Geometry<f64>, b: &Geometry<f64>) -> bool {
    let matrix = a.relate(b);
    matrix.is_intersects() && !matrix.is_touches()
}

/// Join features matching `geometry`.
///
/// Interior overlap wins, so a feature clipped to one tile is not also
/// matched to the neighbour it touches. A feature lying only on boundaries
/// (a line along a tile edge) falls back to every feature it intersects.
fn matching_features<'a>(geometry: &Geometry<f64>, join: &'a FeatureLayer) -> Vec<&'a Feature> {
    let interior: Vec<&Feature> = join
        .features
        .iter()
        .filter(|j| interiors_intersect(geometry, &j.geometry))
        .collect();
    if !interior.is_empty() {
        return interior;
    }
    join.features
        .iter()
        .filter(|j| geometry.intersects(&j.geometry))
        .collect()
}

/// Pick a name for a joined field that does not collide with `taken`.
fn unique_field_name(name: &str, taken: &[FieldDef]) -> String {
    if !taken.iter().any(|f| f.name == name) {
        return name.to_string();
    }
    let mut suffix = 1;
    loop {
        let candidate = format!("{}_{}", name, suffix);
        if !taken.iter().any(|f| f.name == candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Composite grouping key ordered by [`AttrValue::total_cmp`].
#[derive(Debug, Clone)]
struct GroupKey(Vec<AttrValue>);

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| self.0.len().cmp(&other.0.len()))
    }
}

impl GeoprocessingBackend for MemoryBackend {
    fn count_matching(&self, layer: &str, predicate: Option<&Predicate>) -> BackendResult<usize> {
        let datasets = self.datasets.read();
        let dataset = dataset_ref(&datasets, layer)?;
        match predicate {
            None => Ok(dataset.records().count()),
            Some(p) => {
                require_field(dataset, layer, p.field())?;
                Ok(dataset.records().filter(|attrs| p.matches(attrs)).count())
            }
        }
    }

    fn distinct_values(&self, layer: &str, field: &str) -> BackendResult<Vec<AttrValue>> {
        let datasets = self.datasets.read();
        let dataset = dataset_ref(&datasets, layer)?;
        require_field(dataset, layer, field)?;

        let mut values: Vec<AttrValue> = dataset
            .records()
            .filter_map(|attrs| attrs.get(field))
            .filter(|v| !v.is_null())
            .cloned()
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup_by(|a, b| a.loosely_eq(b));
        Ok(values)
    }

    fn clip(&self, input: &str, clip: &LayerSelection, output: &str) -> BackendResult<String> {
        let result = {
            let datasets = self.datasets.read();
            let source = layer_ref(&datasets, input)?;
            let boundary = layer_ref(&datasets, &clip.layer)?;
            if boundary.kind != GeometryKind::Polygon {
                return Err(BackendError::Engine(format!(
                    "clip features in {} must be polygons",
                    clip.layer
                )));
            }
            if let Some(p) = &clip.predicate {
                if !boundary.has_field(p.field()) {
                    return Err(BackendError::FieldNotFound {
                        dataset: clip.layer.clone(),
                        field: p.field().to_string(),
                    });
                }
            }

            let area = boundary
                .features
                .iter()
                .filter(|f| clip.predicate.as_ref().map_or(true, |p| p.matches(&f.attributes)))
                .filter_map(|f| to_multi_polygon(&f.geometry))
                .fold(MultiPolygon::new(vec![]), |acc, mp| acc.union(&mp));

            let features = source
                .features
                .iter()
                .filter_map(|f| {
                    clip_geometry(&f.geometry, &area).map(|geometry| Feature {
                        geometry,
                        attributes: f.attributes.clone(),
                    })
                })
                .collect();

            FeatureLayer {
                kind: source.kind,
                fields: source.fields.clone(),
                features,
            }
        };

        self.store(output, Dataset::Layer(result))
    }

    fn list_fields(&self, layer: &str) -> BackendResult<Vec<String>> {
        let datasets = self.datasets.read();
        let dataset = dataset_ref(&datasets, layer)?;
        Ok(dataset.fields().iter().map(|f| f.name.clone()).collect())
    }

    fn add_field(&self, layer: &str, field: &str, field_type: FieldType) -> BackendResult<()> {
        self.with_layer_mut(layer, |l| {
            if l.has_field(field) {
                return Err(BackendError::FieldExists {
                    dataset: layer.to_string(),
                    field: field.to_string(),
                });
            }
            l.fields.push(FieldDef::new(field, field_type));
            for feature in &mut l.features {
                feature.attributes.insert(field.to_string(), AttrValue::Null);
            }
            Ok(())
        })
    }

    fn compute_geometry_measure(
        &self,
        layer: &str,
        field: &str,
        measure: MeasureKind,
    ) -> BackendResult<()> {
        self.with_layer_mut(layer, |l| {
            if !l.has_field(field) {
                return Err(BackendError::FieldNotFound {
                    dataset: layer.to_string(),
                    field: field.to_string(),
                });
            }
            let invalid = |reason: &str| BackendError::InvalidMeasure {
                dataset: layer.to_string(),
                measure: measure.to_string(),
                reason: reason.to_string(),
            };
            match (measure, l.kind) {
                (MeasureKind::GeodesicArea, GeometryKind::Polygon) => {}
                (MeasureKind::GeodesicArea, _) => return Err(invalid("layer is not polygonal")),
                (MeasureKind::GeodesicLength, GeometryKind::Point) => {
                    return Err(invalid("points have no length"))
                }
                (MeasureKind::GeodesicLength, _) => {}
            }

            for feature in &mut l.features {
                let value = match measure {
                    MeasureKind::GeodesicArea => geodesic_area(&feature.geometry),
                    MeasureKind::GeodesicLength => geodesic_length(&feature.geometry),
                };
                feature
                    .attributes
                    .insert(field.to_string(), AttrValue::Float(value));
            }
            Ok(())
        })
    }

    fn recompute_field(
        &self,
        layer: &str,
        field: &str,
        expression: FieldExpression,
    ) -> BackendResult<()> {
        self.with_layer_mut(layer, |l| {
            if !l.has_field(field) {
                return Err(BackendError::FieldNotFound {
                    dataset: layer.to_string(),
                    field: field.to_string(),
                });
            }
            // All values are converted before any is written
            let updated = l
                .features
                .iter()
                .map(|feature| match feature.attr(field) {
                    AttrValue::Null => Ok(AttrValue::Null),
                    v => v
                        .as_f64()
                        .map(|x| AttrValue::Float(expression.apply(x)))
                        .ok_or_else(|| BackendError::NotNumeric {
                            dataset: layer.to_string(),
                            field: field.to_string(),
                        }),
                })
                .collect::<BackendResult<Vec<_>>>()?;

            for (feature, value) in l.features.iter_mut().zip(updated) {
                feature.attributes.insert(field.to_string(), value);
            }
            Ok(())
        })
    }

    fn spatial_join(
        &self,
        input: &str,
        join: &str,
        policy: JoinPolicy,
        output: &str,
    ) -> BackendResult<String> {
        let result = {
            let datasets = self.datasets.read();
            let target = layer_ref(&datasets, input)?;
            let join_layer = layer_ref(&datasets, join)?;

            let mut fields = target.fields.clone();
            fields.push(FieldDef::new(
                unique_field_name(JOIN_COUNT_FIELD, &fields),
                FieldType::Long,
            ));
            let join_count_name = fields[fields.len() - 1].name.clone();

            // (source name, output name) for every joined attribute
            let mut renames = Vec::with_capacity(join_layer.fields.len());
            for field in &join_layer.fields {
                let out_name = unique_field_name(&field.name, &fields);
                fields.push(FieldDef::new(out_name.clone(), field.field_type));
                renames.push((field.name.clone(), out_name));
            }

            let mut features = Vec::with_capacity(target.features.len());
            for feature in &target.features {
                let matches = matching_features(&feature.geometry, join_layer);

                if matches.is_empty() && policy == JoinPolicy::KeepMatchingOnly {
                    continue;
                }

                let mut attributes = feature.attributes.clone();
                attributes.insert(
                    join_count_name.clone(),
                    AttrValue::Int(matches.len() as i64),
                );
                for (source, out_name) in &renames {
                    let value = matches
                        .first()
                        .map(|m| m.attr(source).clone())
                        .unwrap_or(AttrValue::Null);
                    attributes.insert(out_name.clone(), value);
                }
                features.push(Feature {
                    geometry: feature.geometry.clone(),
                    attributes,
                });
            }

            FeatureLayer {
                kind: target.kind,
                fields,
                features,
            }
        };

        self.store(output, Dataset::Layer(result))
    }

    fn merge(&self, inputs: &[String], output: &str) -> BackendResult<String> {
        let result = {
            let datasets = self.datasets.read();
            let first = inputs.first().ok_or(BackendError::EmptyInput)?;
            let kind = layer_ref(&datasets, first)?.kind;

            let mut fields: Vec<FieldDef> = Vec::new();
            let mut features = Vec::new();
            for name in inputs {
                let layer = layer_ref(&datasets, name)?;
                if layer.kind != kind {
                    return Err(BackendError::GeometryMismatch(format!(
                        "{} is {:?}, expected {:?}",
                        name, layer.kind, kind
                    )));
                }
                for field in &layer.fields {
                    if !fields.iter().any(|f| f.name == field.name) {
                        fields.push(field.clone());
                    }
                }
                features.extend(layer.features.iter().cloned());
            }

            for feature in &mut features {
                for field in &fields {
                    feature
                        .attributes
                        .entry(field.name.clone())
                        .or_insert(AttrValue::Null);
                }
            }

            FeatureLayer {
                kind,
                fields,
                features,
            }
        };

        self.store(output, Dataset::Layer(result))
    }

    fn grouped_statistics(
        &self,
        input: &str,
        sum_field: &str,
        group_by: &[String],
        output: &str,
    ) -> BackendResult<String> {
        let table = {
            let datasets = self.datasets.read();
            let dataset = dataset_ref(&datasets, input)?;
            require_field(dataset, input, sum_field)?;
            for field in group_by {
                require_field(dataset, input, field)?;
            }

            let mut groups: BTreeMap<GroupKey, (i64, f64)> = BTreeMap::new();
            for attrs in dataset.records() {
                let key = GroupKey(
                    group_by
                        .iter()
                        .map(|f| attrs.get(f).cloned().unwrap_or(AttrValue::Null))
                        .collect(),
                );
                let value = attrs.get(sum_field).unwrap_or(&AttrValue::Null);
                let addend = match value {
                    AttrValue::Null => 0.0,
                    v => v.as_f64().ok_or_else(|| BackendError::NotNumeric {
                        dataset: input.to_string(),
                        field: sum_field.to_string(),
                    })?,
                };
                let entry = groups.entry(key).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += addend;
            }

            let sum_name = sum_field_name(sum_field);
            let mut fields: Vec<FieldDef> = group_by
                .iter()
                .map(|name| {
                    let field_type = dataset
                        .fields()
                        .iter()
                        .find(|f| &f.name == name)
                        .map(|f| f.field_type)
                        .unwrap_or(FieldType::Text);
                    FieldDef::new(name.clone(), field_type)
                })
                .collect();
            fields.push(FieldDef::new(FREQUENCY_FIELD, FieldType::Long));
            fields.push(FieldDef::new(sum_name.clone(), FieldType::Double));

            let rows = groups
                .into_iter()
                .map(|(key, (count, sum))| {
                    let mut row: BTreeMap<String, AttrValue> =
                        group_by.iter().cloned().zip(key.0).collect();
                    row.insert(FREQUENCY_FIELD.to_string(), AttrValue::Int(count));
                    row.insert(sum_name.clone(), AttrValue::Float(sum));
                    row
                })
                .collect();

            Table { fields, rows }
        };

        self.store(output, Dataset::Table(table))
    }

    fn exists(&self, name: &str) -> bool {
        self.datasets.read().contains_key(name)
    }

    fn delete(&self, name: &str) -> BackendResult<()> {
        self.datasets
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }
}
