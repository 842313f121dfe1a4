//! Clustering run: per-cell hazard counts and dominant cluster location for
//! every hazard area.

#[cfg(feature = "threading")]
use rayon::prelude::*;

use super::{RunContext, RunReport};
use crate::cluster::{cluster_histogram, dominant_clusters, hazard_total, CellLabel, ClusterHistogram, DominantClusters};
use crate::config::RunConfig;
use crate::error::{Error, MeasurementError, Result};
use crate::layer::{AttributeValue, Feature, FeatureLayer, Record};
use crate::preflight::{self, GeometryRequirement};
use crate::spatial::SpatialQuery;

pub const RUN_STAMP: &str = "HazardCluster";
pub const HAZARD_COUNT_FIELD: &str = "HAZARD_COUNT";
pub const PRIMARY_LOCATION_FIELD: &str = "PRIMARYCLUSTERLOC";
pub const PRIMARY_COUNT_FIELD: &str = "PRIMARYCLUSTERCOUNT";
pub const SECONDARY_LOCATION_FIELD: &str = "SECONDARYCLUSTERLOC";
pub const SECONDARY_COUNT_FIELD: &str = "SECONDARYCLUSTERCOUNT";

/// Cell counts and summary of one hazard area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaClusters {
    pub histogram: ClusterHistogram,
    pub hazard_count: u64,
    pub dominant: DominantClusters,
}

/// Count the hazards of `hazard_layers` over the 3×3 grid of one area.
pub fn evaluate_area(
    feature: &Feature,
    hazard_layers: &[&dyn SpatialQuery],
) -> std::result::Result<AreaClusters, MeasurementError> {
    let area = feature.geometry.as_polygon().ok_or_else(|| MeasurementError::InvalidValue {
        field: "geometry".to_string(),
        value: feature.geometry.kind().to_string(),
    })?;
    let histogram = cluster_histogram(area, hazard_layers)?;
    let hazard_count = hazard_total(area, hazard_layers)?;
    Ok(AreaClusters { histogram, hazard_count, dominant: dominant_clusters(&histogram) })
}

fn updates_for(layer: &FeatureLayer, clusters: &AreaClusters) -> Record {
    let mut updates = Record::new();
    for (label, count) in clusters.histogram.iter() {
        updates.insert(label.as_str().to_string(), count.into());
    }
    let d = &clusters.dominant;
    let optional: [(&str, AttributeValue); 5] = [
        (HAZARD_COUNT_FIELD, clusters.hazard_count.into()),
        (PRIMARY_LOCATION_FIELD, d.primary.as_str().into()),
        (PRIMARY_COUNT_FIELD, d.primary_count.into()),
        (SECONDARY_LOCATION_FIELD, d.secondary.as_str().into()),
        (SECONDARY_COUNT_FIELD, d.secondary_count.into()),
    ];
    for (field, value) in optional {
        if layer.has_field(field) {
            updates.insert(field.to_string(), value);
        }
    }
    updates
}

/// Fill the nine cell fields of every hazard area in `layer` from the
/// hazards in `hazards`.
///
/// Hazard layers are counted independently and summed. With
/// `update_only`, areas whose `SW` field already holds a value are left
/// alone.
pub fn cluster_layer(layer: &mut FeatureLayer, hazards: &[&FeatureLayer], config: &RunConfig) -> Result<RunReport> {
    let ctx = RunContext::start(RUN_STAMP, layer.len());

    ctx.in_scope(|| -> Result<()> {
        if hazards.is_empty() {
            return Err(Error::Config("at least one hazard layer is required".to_string()));
        }
        preflight::require_features(layer)?;
        preflight::require_unique_ids(layer)?;
        preflight::require_geometry(layer, GeometryRequirement::PolygonOnly)?;
        preflight::require_fields(layer, CellLabel::ALL.iter().map(|c| c.as_str()))?;
        for hazard_layer in hazards {
            preflight::require_features(hazard_layer)?;
            preflight::require_geometry(hazard_layer, GeometryRequirement::PointOrPolygon)?;
        }
        if config.check_spatial_reference {
            let mut references = vec![preflight::srs_of(layer)];
            references.extend(hazards.iter().map(|&h| preflight::srs_of(h)));
            preflight::check_spatial_references(&references)?;
        }
        tracing::info!(areas = layer.len(), hazard_layers = hazards.len(), "starting hazard clustering");
        Ok(())
    })?;

    let queries: Vec<&dyn SpatialQuery> = hazards.iter().map(|&h| h as &dyn SpatialQuery).collect();
    let pending: Vec<&Feature> = layer
        .features
        .iter()
        .filter(|f| !config.update_only || f.is_null(CellLabel::SouthWest.as_str()))
        .collect();
    let skipped = layer.len() - pending.len();

    #[cfg(feature = "threading")]
    let outcomes: Vec<(i64, std::result::Result<AreaClusters, MeasurementError>)> =
        pending.par_iter().map(|f| (f.id, evaluate_area(f, &queries))).collect();
    #[cfg(not(feature = "threading"))]
    let outcomes: Vec<(i64, std::result::Result<AreaClusters, MeasurementError>)> =
        pending.iter().map(|f| (f.id, evaluate_area(f, &queries))).collect();

    let mut report = RunReport::new(&ctx);
    report.skipped = skipped;

    for (n, (id, outcome)) in outcomes.into_iter().enumerate() {
        ctx.progress(n + 1, id);
        let clusters = match outcome {
            Ok(c) => c,
            Err(e) => {
                report.fail(&ctx, id, e);
                continue;
            }
        };
        ctx.in_scope(|| {
            tracing::info!(feature = id, hazards = clusters.hazard_count, "cluster counts: {}", clusters.histogram);
            tracing::debug!(
                feature = id,
                primary = %clusters.dominant.primary,
                primary_count = clusters.dominant.primary_count,
                secondary = %clusters.dominant.secondary,
                secondary_count = clusters.dominant.secondary_count,
                "dominant clusters"
            );
        });
        let updates = updates_for(layer, &clusters);
        layer.write_attributes(id, updates)?;
        report.processed += 1;
    }

    Ok(ctx.finish(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::FeatureGeometry;
    use geo::{point, polygon};

    const UTM: &str = "EPSG:32642";

    fn areas(extra: &[&'static str]) -> FeatureLayer {
        let mut layer = FeatureLayer::new("dha")
            .with_spatial_reference(UTM)
            .with_fields(CellLabel::ALL.iter().map(|c| c.as_str()))
            .with_fields(extra.iter().copied());
        layer.push(Feature::new(
            1,
            FeatureGeometry::Polygon(polygon![
                (x: 0.0, y: 0.0), (x: 90.0, y: 0.0), (x: 90.0, y: 90.0), (x: 0.0, y: 90.0),
            ]),
        ));
        layer.push(Feature::new(
            2,
            FeatureGeometry::Polygon(polygon![
                (x: 100.0, y: 0.0), (x: 130.0, y: 0.0), (x: 130.0, y: 30.0), (x: 100.0, y: 30.0),
            ]),
        ));
        layer
    }

    fn hazards(name: &str, points: &[(f64, f64)]) -> FeatureLayer {
        let mut l = FeatureLayer::new(name).with_spatial_reference(UTM);
        for (i, &(x, y)) in points.iter().enumerate() {
            l.push(Feature::new(i as i64, FeatureGeometry::Point(point!(x: x, y: y))));
        }
        l
    }

    #[test]
    fn writes_cells_and_optional_summary() {
        let mut layer = areas(&[HAZARD_COUNT_FIELD, PRIMARY_LOCATION_FIELD, PRIMARY_COUNT_FIELD]);
        let mines = hazards("mines", &[(45.0, 45.0), (50.0, 40.0), (10.0, 10.0), (115.0, 15.0)]);
        let report = cluster_layer(&mut layer, &[&mines], &RunConfig::default()).unwrap();
        assert_eq!(report.processed, 2);

        let f = layer.feature(1).unwrap();
        assert_eq!(f.get("CENTER"), &AttributeValue::Int(2));
        assert_eq!(f.get("SW"), &AttributeValue::Int(1));
        assert_eq!(f.get("NE"), &AttributeValue::Int(0));
        assert_eq!(f.get(HAZARD_COUNT_FIELD), &AttributeValue::Int(3));
        assert_eq!(f.get(PRIMARY_LOCATION_FIELD).as_str(), Some("CENTER"));
        assert_eq!(f.get(PRIMARY_COUNT_FIELD), &AttributeValue::Int(2));
        // Not in the schema, so not written.
        assert!(f.is_null(SECONDARY_LOCATION_FIELD));

        assert_eq!(layer.feature(2).unwrap().get("CENTER"), &AttributeValue::Int(1));
    }

    #[test]
    fn hazard_layers_are_summed() {
        let mut layer = areas(&[HAZARD_COUNT_FIELD]);
        let mines = hazards("mines", &[(45.0, 45.0)]);
        let uxo = hazards("uxo", &[(45.0, 45.0), (80.0, 80.0)]);
        cluster_layer(&mut layer, &[&mines, &uxo], &RunConfig::default()).unwrap();
        let f = layer.feature(1).unwrap();
        assert_eq!(f.get("CENTER"), &AttributeValue::Int(2));
        assert_eq!(f.get("NE"), &AttributeValue::Int(1));
        assert_eq!(f.get(HAZARD_COUNT_FIELD), &AttributeValue::Int(3));
    }

    #[test]
    fn update_only_skips_counted_areas() {
        let mut layer = areas(&[]);
        layer.features[0].attributes.insert("SW".into(), AttributeValue::Int(0));
        let mines = hazards("mines", &[(45.0, 45.0), (115.0, 15.0)]);
        let cfg = RunConfig { update_only: true, ..RunConfig::default() };
        let report = cluster_layer(&mut layer, &[&mines], &cfg).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.processed, 1);
        assert!(layer.feature(1).unwrap().is_null("CENTER"));
        assert_eq!(layer.feature(2).unwrap().get("CENTER"), &AttributeValue::Int(1));
    }

    #[test]
    fn point_areas_are_rejected_before_any_update() {
        let mut layer = areas(&[]);
        layer.push(Feature::new(3, FeatureGeometry::Point(point!(x: 5.0, y: 5.0))));
        let mines = hazards("mines", &[(45.0, 45.0)]);
        assert!(matches!(
            cluster_layer(&mut layer, &[&mines], &RunConfig::default()),
            Err(Error::UnsupportedGeometryType { feature_id: 3, .. })
        ));
        assert!(layer.feature(1).unwrap().is_null("CENTER"));
    }

    #[test]
    fn shared_feature_id_aborts_before_any_update() {
        let mut layer = areas(&[]);
        layer.features[1].id = 1;
        let mines = hazards("mines", &[(45.0, 45.0), (115.0, 15.0)]);
        assert!(matches!(
            cluster_layer(&mut layer, &[&mines], &RunConfig::default()),
            Err(Error::DuplicateFeatureId { id: 1, .. })
        ));
        assert!(layer.features.iter().all(|f| f.is_null("CENTER")));
    }

    #[test]
    fn missing_cell_field_aborts() {
        let mut layer = areas(&[]);
        layer.fields.remove("NE");
        let mines = hazards("mines", &[(45.0, 45.0)]);
        match cluster_layer(&mut layer, &[&mines], &RunConfig::default()) {
            Err(Error::MissingRequiredField { field, .. }) => assert_eq!(field, "NE"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_hazard_layer_aborts() {
        let mut layer = areas(&[]);
        let empty = hazards("mines", &[]);
        assert!(matches!(
            cluster_layer(&mut layer, &[&empty], &RunConfig::default()),
            Err(Error::EmptyInputCollection { .. })
        ));
    }

    #[test]
    fn spatial_reference_mismatch_aborts() {
        let mut layer = areas(&[]);
        let mut mines = hazards("mines", &[(45.0, 45.0)]);
        mines.spatial_reference = Some("EPSG:4326".to_string());
        assert!(matches!(
            cluster_layer(&mut layer, &[&mines], &RunConfig::default()),
            Err(Error::SpatialReferenceMismatch { .. })
        ));
        let cfg = RunConfig { check_spatial_reference: false, ..RunConfig::default() };
        assert!(cluster_layer(&mut layer, &[&mines], &cfg).is_ok());
    }
}
