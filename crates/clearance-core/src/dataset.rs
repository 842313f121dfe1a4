//! JSON persistence for feature layers and raster grids.
//!
//! A layer file looks like
//!
//! ```json
//! {
//!   "name": "dha",
//!   "spatial_reference": "EPSG:32642",
//!   "fields": ["SW", "S", "SE"],
//!   "features": [
//!     { "id": 1,
//!       "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 0]]] },
//!       "attributes": { "SW": null } }
//!   ]
//! }
//! ```
//!
//! Only `Point` and `Polygon` geometries are accepted.

use std::fs;
use std::path::Path;

use geo::{Coord, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::geometry::FeatureGeometry;
use crate::layer::{Feature, FeatureLayer, Record};
use crate::spatial::RasterGrid;

#[derive(Serialize, Deserialize)]
struct LayerFile {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spatial_reference: Option<String>,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    features: Vec<FeatureEntry>,
}

#[derive(Serialize, Deserialize)]
struct FeatureEntry {
    id: i64,
    geometry: GeometryEntry,
    #[serde(default)]
    attributes: Record,
}

#[derive(Serialize, Deserialize)]
struct GeometryEntry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Value,
}

type Ring = Vec<[f64; 2]>;

fn ring_to_line(ring: Ring) -> LineString<f64> {
    LineString::from(ring.into_iter().map(|[x, y]| Coord { x, y }).collect::<Vec<_>>())
}

fn line_to_ring(line: &LineString<f64>) -> Ring {
    line.coords().map(|c| [c.x, c.y]).collect()
}

fn geometry_kind_name(kind: &str) -> &'static str {
    match kind {
        "LineString" => "linestring",
        "MultiPoint" => "multipoint",
        "MultiLineString" => "multilinestring",
        "MultiPolygon" => "multipolygon",
        "GeometryCollection" => "geometry collection",
        _ => "unknown geometry",
    }
}

fn decode_geometry(layer: &str, id: i64, entry: GeometryEntry) -> Result<FeatureGeometry> {
    match entry.kind.as_str() {
        "Point" => {
            let [x, y]: [f64; 2] = serde_json::from_value(entry.coordinates)?;
            Ok(FeatureGeometry::Point(Point::new(x, y)))
        }
        "Polygon" => {
            let mut rings: Vec<Ring> = serde_json::from_value(entry.coordinates)?;
            if rings.is_empty() {
                return Err(Error::Config(format!("feature {id} in layer '{layer}' has an empty polygon")));
            }
            let exterior = ring_to_line(rings.remove(0));
            let interiors = rings.into_iter().map(ring_to_line).collect();
            Ok(FeatureGeometry::Polygon(Polygon::new(exterior, interiors)))
        }
        other => Err(Error::UnsupportedGeometryType {
            layer: layer.to_string(),
            feature_id: id,
            found: geometry_kind_name(other),
            expected: "point or polygon",
        }),
    }
}

fn encode_geometry(geometry: &FeatureGeometry) -> GeometryEntry {
    match geometry {
        FeatureGeometry::Point(p) => GeometryEntry {
            kind: "Point".to_string(),
            coordinates: serde_json::json!([p.x(), p.y()]),
        },
        FeatureGeometry::Polygon(poly) => {
            let rings: Vec<Ring> = std::iter::once(poly.exterior())
                .chain(poly.interiors())
                .map(line_to_ring)
                .collect();
            GeometryEntry { kind: "Polygon".to_string(), coordinates: serde_json::json!(rings) }
        }
    }
}

/// Parse a layer from its JSON text.
pub fn layer_from_json(json: &str) -> Result<FeatureLayer> {
    let file: LayerFile = serde_json::from_str(json)?;
    let mut layer = FeatureLayer::new(file.name);
    layer.spatial_reference = file.spatial_reference;
    layer.fields = file.fields.into_iter().collect();
    for entry in file.features {
        if let Some(field) = entry.attributes.keys().find(|k| !layer.has_field(k)) {
            return Err(Error::MissingRequiredField { layer: layer.name.clone(), field: field.clone() });
        }
        let geometry = decode_geometry(&layer.name, entry.id, entry.geometry)?;
        layer.push(Feature { id: entry.id, geometry, attributes: entry.attributes });
    }
    if let Some(id) = layer.duplicate_id() {
        return Err(Error::DuplicateFeatureId { layer: layer.name, id });
    }
    tracing::debug!(layer = %layer.name, features = layer.len(), fields = layer.fields.len(), "layer parsed");
    Ok(layer)
}

pub fn layer_to_json(layer: &FeatureLayer) -> Result<String> {
    let file = LayerFile {
        name: layer.name.clone(),
        spatial_reference: layer.spatial_reference.clone(),
        fields: layer.fields.iter().cloned().collect(),
        features: layer
            .features
            .iter()
            .map(|f| FeatureEntry {
                id: f.id,
                geometry: encode_geometry(&f.geometry),
                attributes: f.attributes.clone(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

pub fn load_layer(path: &Path) -> Result<FeatureLayer> {
    tracing::info!(path = %path.display(), "loading layer");
    layer_from_json(&fs::read_to_string(path)?)
}

pub fn save_layer(layer: &FeatureLayer, path: &Path) -> Result<()> {
    fs::write(path, layer_to_json(layer)?)?;
    tracing::info!(path = %path.display(), layer = %layer.name, "layer written");
    Ok(())
}

pub fn raster_from_json(json: &str) -> Result<RasterGrid> {
    let raster: RasterGrid = serde_json::from_str(json)?;
    if !raster.is_consistent() {
        return Err(Error::Config(format!(
            "raster declares {}x{} cells but holds {} values",
            raster.width,
            raster.height,
            raster.data.len()
        )));
    }
    if !(raster.cell_size > 0.0) {
        return Err(Error::Config(format!("raster cell size must be positive, got {}", raster.cell_size)));
    }
    Ok(raster)
}

pub fn load_raster(path: &Path) -> Result<RasterGrid> {
    tracing::info!(path = %path.display(), "loading raster");
    raster_from_json(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::AttributeValue;

    const LAYER: &str = r#"{
        "name": "dha",
        "spatial_reference": "EPSG:32642",
        "fields": ["SW", "SCORE", "RANKING"],
        "features": [
            { "id": 1,
              "geometry": { "type": "Polygon",
                            "coordinates": [[[0, 0], [9, 0], [9, 9], [0, 9], [0, 0]],
                                            [[3, 3], [6, 3], [6, 6], [3, 3]]] },
              "attributes": { "SW": null, "SCORE": 4, "RANKING": "Low" } },
            { "id": 2, "geometry": { "type": "Point", "coordinates": [1.5, 2.5] } }
        ]
    }"#;

    #[test]
    fn parses_points_polygons_and_attributes() {
        let layer = layer_from_json(LAYER).unwrap();
        assert_eq!(layer.name, "dha");
        assert_eq!(layer.spatial_reference.as_deref(), Some("EPSG:32642"));
        assert!(layer.has_field("RANKING"));

        let area = layer.feature(1).unwrap();
        let poly = area.geometry.as_polygon().unwrap();
        assert_eq!(poly.interiors().len(), 1);
        assert!(area.is_null("SW"));
        assert_eq!(area.get("SCORE"), &AttributeValue::Int(4));
        assert_eq!(area.get("RANKING").as_str(), Some("Low"));

        let point = layer.feature(2).unwrap();
        assert_eq!(point.geometry, FeatureGeometry::Point(Point::new(1.5, 2.5)));
        assert!(point.attributes.is_empty());
    }

    #[test]
    fn written_layer_reads_back_identically() {
        let layer = layer_from_json(LAYER).unwrap();
        let again = layer_from_json(&layer_to_json(&layer).unwrap()).unwrap();
        assert_eq!(again.fields, layer.fields);
        assert_eq!(again.features, layer.features);
    }

    #[test]
    fn unsupported_geometry_named_in_error() {
        let json = r#"{ "name": "roads", "features": [
            { "id": 7, "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 1]] } } ] }"#;
        match layer_from_json(json) {
            Err(Error::UnsupportedGeometryType { feature_id, found, .. }) => {
                assert_eq!(feature_id, 7);
                assert_eq!(found, "linestring");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_rejected_on_load() {
        let json = r#"{ "name": "dha", "features": [
            { "id": 3, "geometry": { "type": "Point", "coordinates": [0, 0] } },
            { "id": 3, "geometry": { "type": "Point", "coordinates": [5, 5] } } ] }"#;
        assert!(matches!(layer_from_json(json), Err(Error::DuplicateFeatureId { id: 3, .. })));
    }

    #[test]
    fn attribute_outside_schema_rejected() {
        let json = r#"{ "name": "dha", "fields": [], "features": [
            { "id": 1, "geometry": { "type": "Point", "coordinates": [0, 0] },
              "attributes": { "SCORE": 1 } } ] }"#;
        assert!(matches!(layer_from_json(json), Err(Error::MissingRequiredField { .. })));
    }

    #[test]
    fn raster_dimensions_checked() {
        let ok = r#"{ "origin_x": 0, "origin_y": 20, "cell_size": 10, "width": 2, "height": 1,
                      "nodata": -9999, "data": [1, 2] }"#;
        let r = raster_from_json(ok).unwrap();
        assert_eq!(r.nodata, Some(-9999.0));
        assert_eq!(r.get(0, 1), 2.0);

        let short = r#"{ "origin_x": 0, "origin_y": 20, "cell_size": 10, "width": 2, "height": 2, "data": [1, 2] }"#;
        assert!(matches!(raster_from_json(short), Err(Error::Config(_))));
    }
}
