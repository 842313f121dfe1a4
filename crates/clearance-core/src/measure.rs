//! Raw factor measurement for a single feature.
//!
//! Raster factors sample the cell under a point inside the feature;
//! proximity factors count source features inside a buffer, summed over
//! every source layer. Failures come
//! back as `MeasurementError` and are never replaced by placeholder values
//! here; substitution is a run-level decision.

use crate::error::{MeasurementError, SampleError};
use crate::factors::{Factor, MeasurementKind};
use crate::geometry::FeatureGeometry;
use crate::spatial::{RasterSampler, SpatialQuery};

/// Where a factor's value comes from.
pub enum MeasurementSource<'a> {
    Raster(&'a dyn RasterSampler),
    Proximity { layers: &'a [&'a dyn SpatialQuery], distance: f64 },
}

impl MeasurementSource<'_> {
    pub fn kind(&self) -> MeasurementKind {
        match self {
            MeasurementSource::Raster(_) => MeasurementKind::RasterSample,
            MeasurementSource::Proximity { .. } => MeasurementKind::ProximityCount,
        }
    }
}

pub fn sample_raster(
    factor: Factor,
    geometry: &FeatureGeometry,
    raster: &dyn RasterSampler,
) -> Result<f64, MeasurementError> {
    let at = geometry.representative_point().ok_or_else(|| MeasurementError::Unavailable {
        factor,
        reason: format!("{} has no representative point", geometry.kind()),
    })?;
    raster.sample(at).map_err(|e| match e {
        SampleError::NoData { .. } => MeasurementError::NoData { factor },
        other => MeasurementError::Unavailable { factor, reason: other.to_string() },
    })
}

/// Features within `distance` of `geometry`, summed over `layers`. A
/// feature present in two layers counts twice.
pub fn count_nearby(
    factor: Factor,
    geometry: &FeatureGeometry,
    layers: &[&dyn SpatialQuery],
    distance: f64,
) -> Result<u64, MeasurementError> {
    layers.iter().try_fold(0u64, |total, layer| {
        let n = layer
            .count_within_distance(geometry, distance)
            .map_err(|e| MeasurementError::Unavailable { factor, reason: e.to_string() })?;
        Ok(total + n)
    })
}

/// Measure one factor for one feature, returning the raw value as stored
/// in the factor's attribute field.
pub fn measure(
    factor: Factor,
    geometry: &FeatureGeometry,
    source: &MeasurementSource<'_>,
) -> Result<f64, MeasurementError> {
    match *source {
        MeasurementSource::Raster(raster) => sample_raster(factor, geometry, raster),
        MeasurementSource::Proximity { layers, distance } => {
            count_nearby(factor, geometry, layers, distance).map(|n| n as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Feature, FeatureLayer};
    use crate::spatial::RasterGrid;
    use geo::{point, polygon};

    fn dha() -> FeatureGeometry {
        FeatureGeometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 20.0, y: 0.0),
            (x: 20.0, y: 20.0),
            (x: 0.0, y: 20.0),
        ])
    }

    #[test]
    fn raster_sampled_inside_polygon() {
        let r = RasterGrid::new(0.0, 20.0, 10.0, 2, 2, 45.0);
        let v = sample_raster(Factor::Aspect, &dha(), &r).unwrap();
        assert_eq!(v, 45.0);
    }

    #[test]
    fn concave_polygon_not_sampled_in_its_notch() {
        let c = FeatureGeometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 90.0, y: 0.0), (x: 90.0, y: 30.0), (x: 30.0, y: 30.0),
            (x: 30.0, y: 60.0), (x: 90.0, y: 60.0), (x: 90.0, y: 90.0), (x: 0.0, y: 90.0),
        ]);
        let mut r = RasterGrid::new(0.0, 90.0, 30.0, 3, 3, 5.0);
        // Middle row, east of the spine: outside the polygon, under its centroid.
        r.set(1, 1, 99.0);
        r.set(1, 2, 99.0);
        assert_eq!(sample_raster(Factor::Slope, &c, &r).unwrap(), 5.0);
    }

    #[test]
    fn nodata_reported_not_substituted() {
        let mut r = RasterGrid::new(0.0, 20.0, 10.0, 2, 2, f64::NAN);
        r.nodata = Some(-9999.0);
        assert_eq!(
            sample_raster(Factor::Slope, &dha(), &r),
            Err(MeasurementError::NoData { factor: Factor::Slope })
        );
    }

    #[test]
    fn out_of_bounds_is_unavailable() {
        let r = RasterGrid::new(100.0, 200.0, 10.0, 2, 2, 1.0);
        assert!(matches!(
            sample_raster(Factor::LandCover, &dha(), &r),
            Err(MeasurementError::Unavailable { factor: Factor::LandCover, .. })
        ));
    }

    #[test]
    fn proximity_counts_through_source() {
        let mut roads = FeatureLayer::new("roads");
        roads.push(Feature::new(1, FeatureGeometry::Point(point!(x: 25.0, y: 10.0))));
        roads.push(Feature::new(2, FeatureGeometry::Point(point!(x: 60.0, y: 10.0))));
        let layers: [&dyn SpatialQuery; 1] = [&roads];
        let near = MeasurementSource::Proximity { layers: &layers, distance: 10.0 };
        let far = MeasurementSource::Proximity { layers: &layers, distance: 50.0 };
        assert_eq!(measure(Factor::Infrastructure, &dha(), &near).unwrap(), 1.0);
        assert_eq!(measure(Factor::Infrastructure, &dha(), &far).unwrap(), 2.0);
        assert_eq!(near.kind(), MeasurementKind::ProximityCount);
    }

    #[test]
    fn counts_summed_across_source_layers() {
        let mut roads = FeatureLayer::new("roads");
        roads.push(Feature::new(1, FeatureGeometry::Point(point!(x: 25.0, y: 10.0))));
        let mut tracks = FeatureLayer::new("tracks");
        tracks.push(Feature::new(1, FeatureGeometry::Point(point!(x: 25.0, y: 10.0))));
        tracks.push(Feature::new(2, FeatureGeometry::Point(point!(x: 10.0, y: 28.0))));
        let layers: [&dyn SpatialQuery; 2] = [&roads, &tracks];
        assert_eq!(count_nearby(Factor::Infrastructure, &dha(), &layers, 10.0).unwrap(), 3);
        assert_eq!(count_nearby(Factor::Infrastructure, &dha(), &[], 10.0).unwrap(), 0);
    }
}
