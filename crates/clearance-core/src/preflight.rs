//! Pre-run validation. Every check here runs before the first feature is
//! modified; any failure aborts the whole run.

use crate::error::{Error, Result};
use crate::layer::FeatureLayer;

/// Geometry types a run accepts from a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryRequirement {
    PolygonOnly,
    PointOrPolygon,
}

pub fn require_features(layer: &FeatureLayer) -> Result<()> {
    if layer.is_empty() {
        tracing::error!(layer = %layer.name, "layer has no features");
        return Err(Error::EmptyInputCollection { layer: layer.name.clone() });
    }
    Ok(())
}

/// Feature ids must be unique: results are written back by id.
pub fn require_unique_ids(layer: &FeatureLayer) -> Result<()> {
    if let Some(id) = layer.duplicate_id() {
        tracing::error!(layer = %layer.name, feature = id, "duplicate feature id");
        return Err(Error::DuplicateFeatureId { layer: layer.name.clone(), id });
    }
    Ok(())
}

pub fn require_fields<'a>(layer: &FeatureLayer, fields: impl IntoIterator<Item = &'a str>) -> Result<()> {
    for field in fields {
        tracing::debug!(layer = %layer.name, field, "checking for field");
        if !layer.has_field(field) {
            tracing::error!(layer = %layer.name, field, "required field does not exist");
            return Err(Error::MissingRequiredField {
                layer: layer.name.clone(),
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

pub fn require_geometry(layer: &FeatureLayer, requirement: GeometryRequirement) -> Result<()> {
    if requirement == GeometryRequirement::PointOrPolygon {
        // Layers only ever hold points and polygons.
        return Ok(());
    }
    if let Some(f) = layer.features.iter().find(|f| !f.geometry.has_extent()) {
        tracing::error!(layer = %layer.name, feature = f.id, "unsupported geometry type");
        return Err(Error::UnsupportedGeometryType {
            layer: layer.name.clone(),
            feature_id: f.id,
            found: f.geometry.kind(),
            expected: "polygon",
        });
    }
    Ok(())
}

/// Compare every spatial reference against the first one by exact string
/// match. A missing reference never matches.
pub fn check_spatial_references(references: &[(&str, Option<&str>)]) -> Result<()> {
    let Some(&(first_layer, first)) = references.first() else {
        return Ok(());
    };
    let expected = first.ok_or_else(|| Error::SpatialReferenceMismatch {
        layer: first_layer.to_string(),
        expected: "a defined spatial reference".to_string(),
        found: "none".to_string(),
    })?;
    for &(layer, srs) in &references[1..] {
        if srs != Some(expected) {
            tracing::error!(layer, "spatial reference mismatch between inputs");
            return Err(Error::SpatialReferenceMismatch {
                layer: layer.to_string(),
                expected: expected.to_string(),
                found: srs.unwrap_or("none").to_string(),
            });
        }
        tracing::debug!(layer, "spatial reference matches");
    }
    tracing::info!(count = references.len(), "spatial references of all inputs match");
    Ok(())
}

/// `(name, spatial reference)` pair for `check_spatial_references`.
pub fn srs_of(layer: &FeatureLayer) -> (&str, Option<&str>) {
    (layer.name.as_str(), layer.spatial_reference.as_deref())
}
