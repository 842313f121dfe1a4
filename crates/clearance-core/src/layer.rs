//! Feature layers: geometry plus a flat attribute record per feature.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, MeasurementError, Result};
use crate::geometry::FeatureGeometry;

/// Attribute value. `Null` marks a field that has not been computed yet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Null | AttributeValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => f.write_str("<null>"),
            AttributeValue::Int(v) => write!(f, "{v}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        AttributeValue::Int(i64::from(v))
    }
}

impl From<u64> for AttributeValue {
    fn from(v: u64) -> Self {
        AttributeValue::Int(v as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

pub type Record = BTreeMap<String, AttributeValue>;

static NULL: AttributeValue = AttributeValue::Null;

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: i64,
    pub geometry: FeatureGeometry,
    pub attributes: Record,
}

impl Feature {
    pub fn new(id: i64, geometry: FeatureGeometry) -> Self {
        Self { id, geometry, attributes: Record::new() }
    }

    pub fn with_attribute(mut self, field: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> &AttributeValue {
        self.attributes.get(field).unwrap_or(&NULL)
    }

    pub fn is_null(&self, field: &str) -> bool {
        self.get(field).is_null()
    }

    /// Numeric value of `field`; null and text values are measurement errors.
    pub fn numeric(&self, field: &str) -> std::result::Result<f64, MeasurementError> {
        match self.get(field) {
            AttributeValue::Null => Err(MeasurementError::MissingValue { field: field.to_string() }),
            AttributeValue::Text(s) => Err(MeasurementError::InvalidValue {
                field: field.to_string(),
                value: s.clone(),
            }),
            v => v.as_f64().ok_or_else(|| MeasurementError::InvalidValue {
                field: field.to_string(),
                value: v.to_string(),
            }),
        }
    }
}

/// A named collection of features sharing one attribute schema.
#[derive(Debug, Clone, Default)]
pub struct FeatureLayer {
    pub name: String,
    /// Opaque spatial reference definition, compared by exact string match.
    pub spatial_reference: Option<String>,
    pub fields: BTreeSet<String>,
    pub features: Vec<Feature>,
}

impl FeatureLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn with_spatial_reference(mut self, srs: impl Into<String>) -> Self {
        self.spatial_reference = Some(srs.into());
        self
    }

    pub fn with_fields<'a>(mut self, fields: impl IntoIterator<Item = &'a str>) -> Self {
        self.fields.extend(fields.into_iter().map(str::to_string));
        self
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// First id carried by more than one feature, if any.
    pub fn duplicate_id(&self) -> Option<i64> {
        let mut seen = BTreeSet::new();
        self.features.iter().map(|f| f.id).find(|&id| !seen.insert(id))
    }

    pub fn feature(&self, id: i64) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Read `fields` of one feature. Absent attributes come back as `Null`.
    pub fn read_attributes(&self, id: i64, fields: &[&str]) -> Result<Record> {
        let feature = self.feature(id).ok_or(Error::FeatureNotFound { id })?;
        for field in fields {
            self.require_field(field)?;
        }
        Ok(fields
            .iter()
            .map(|&f| (f.to_string(), feature.get(f).clone()))
            .collect())
    }

    /// Apply all `updates` to one feature, or none of them if any field is
    /// missing from the schema.
    pub fn write_attributes(&mut self, id: i64, updates: Record) -> Result<()> {
        for field in updates.keys() {
            self.require_field(field)?;
        }
        let feature = self
            .features
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(Error::FeatureNotFound { id })?;
        feature.attributes.extend(updates);
        Ok(())
    }

    fn require_field(&self, field: &str) -> Result<()> {
        if self.has_field(field) {
            Ok(())
        } else {
            Err(Error::MissingRequiredField {
                layer: self.name.clone(),
                field: field.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;

    fn layer() -> FeatureLayer {
        let mut l = FeatureLayer::new("dha").with_fields(["SCORE", "RANKING"]);
        l.push(
            Feature::new(1, FeatureGeometry::Point(point!(x: 0.0, y: 0.0)))
                .with_attribute("SCORE", 4i64),
        );
        l
    }

    #[test]
    fn read_returns_nulls_for_unset_fields() {
        let rec = layer().read_attributes(1, &["SCORE", "RANKING"]).unwrap();
        assert_eq!(rec["SCORE"], AttributeValue::Int(4));
        assert!(rec["RANKING"].is_null());
    }

    #[test]
    fn write_is_all_or_nothing() {
        let mut l = layer();
        let mut updates = Record::new();
        updates.insert("SCORE".into(), 9i64.into());
        updates.insert("BOGUS".into(), 1i64.into());
        assert!(matches!(
            l.write_attributes(1, updates),
            Err(Error::MissingRequiredField { .. })
        ));
        assert_eq!(l.feature(1).unwrap().get("SCORE"), &AttributeValue::Int(4));
    }

    #[test]
    fn unknown_feature_is_an_error() {
        assert!(matches!(
            layer().read_attributes(7, &["SCORE"]),
            Err(Error::FeatureNotFound { id: 7 })
        ));
    }

    #[test]
    fn duplicate_ids_detected() {
        let mut l = layer();
        assert_eq!(l.duplicate_id(), None);
        l.push(Feature::new(2, FeatureGeometry::Point(point!(x: 1.0, y: 1.0))));
        l.push(Feature::new(1, FeatureGeometry::Point(point!(x: 2.0, y: 2.0))));
        assert_eq!(l.duplicate_id(), Some(1));
    }

    #[test]
    fn numeric_rejects_text_and_null() {
        let f = Feature::new(1, FeatureGeometry::Point(point!(x: 0.0, y: 0.0)))
            .with_attribute("A", "High")
            .with_attribute("B", 2.5);
        assert!(f.numeric("A").is_err());
        assert!(matches!(f.numeric("C"), Err(MeasurementError::MissingValue { .. })));
        assert_eq!(f.numeric("B").unwrap(), 2.5);
    }

    #[test]
    fn untagged_values_round_trip_through_json() {
        let v: AttributeValue = serde_json::from_str("null").unwrap();
        assert!(v.is_null());
        let v: AttributeValue = serde_json::from_str("12").unwrap();
        assert_eq!(v, AttributeValue::Int(12));
        let v: AttributeValue = serde_json::from_str("12.5").unwrap();
        assert_eq!(v, AttributeValue::Float(12.5));
    }
}
