//! Geospatial collaborator interfaces and their in-memory implementations.
//!
//! The engine never inspects source layers directly; it asks counting and
//! sampling questions through `SpatialQuery` and `RasterSampler`. Both
//! calls are synchronous and carry no retry or timeout policy.

use geo::{Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::{MeasurementError, SampleError};
use crate::geometry::FeatureGeometry;
use crate::layer::FeatureLayer;

pub trait SpatialQuery: Sync {
    /// Layer name used in logs and error reports.
    fn name(&self) -> &str;

    /// Number of features lying strictly within every polygon in `regions`
    /// (that is, within their intersection).
    fn count_within(&self, regions: &[&Polygon<f64>]) -> Result<u64, MeasurementError>;

    /// Number of features within `distance` of `geometry`, edges included.
    fn count_within_distance(
        &self,
        geometry: &FeatureGeometry,
        distance: f64,
    ) -> Result<u64, MeasurementError>;
}

pub trait RasterSampler: Sync {
    /// Cell value at `at`.
    fn sample(&self, at: Point<f64>) -> Result<f64, SampleError>;
}

impl SpatialQuery for FeatureLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn count_within(&self, regions: &[&Polygon<f64>]) -> Result<u64, MeasurementError> {
        let n = self
            .features
            .iter()
            .filter(|f| regions.iter().all(|r| f.geometry.is_within(r)))
            .count();
        Ok(n as u64)
    }

    fn count_within_distance(
        &self,
        geometry: &FeatureGeometry,
        distance: f64,
    ) -> Result<u64, MeasurementError> {
        if !(distance >= 0.0) {
            return Err(MeasurementError::QueryFailed {
                layer: self.name.clone(),
                reason: format!("invalid buffer distance {distance}"),
            });
        }
        let n = self
            .features
            .iter()
            .filter(|f| f.geometry.distance_to(geometry) <= distance)
            .count();
        Ok(n as u64)
    }
}

// ── Raster grid ───────────────────────────────────────────────────────────────

/// North-up raster with square cells, row-major, row 0 = northernmost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterGrid {
    /// X of the western edge.
    pub origin_x: f64,
    /// Y of the northern edge.
    pub origin_y: f64,
    pub cell_size: f64,
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub nodata: Option<f64>,
    #[serde(default)]
    pub spatial_reference: Option<String>,
    pub data: Vec<f64>,
}

impl RasterGrid {
    pub fn new(origin_x: f64, origin_y: f64, cell_size: f64, width: usize, height: usize, fill: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            cell_size,
            width,
            height,
            nodata: None,
            spatial_reference: None,
            data: vec![fill; width * height],
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f64) {
        self.data[row * self.width + col] = val;
    }

    /// Row and column of the cell containing (x, y). Points on the
    /// east/south outer edge belong to the last column/row.
    pub fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if self.cell_size <= 0.0 || self.width == 0 || self.height == 0 {
            return None;
        }
        let fx = (x - self.origin_x) / self.cell_size;
        let fy = (self.origin_y - y) / self.cell_size;
        if !(fx >= 0.0 && fy >= 0.0 && fx <= self.width as f64 && fy <= self.height as f64) {
            return None;
        }
        let col = (fx.floor() as usize).min(self.width - 1);
        let row = (fy.floor() as usize).min(self.height - 1);
        Some((row, col))
    }

    /// True when the grid's dimensions match its data buffer.
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.width * self.height
    }

    /// True when at least one cell holds a value other than NaN or nodata.
    pub fn has_data(&self) -> bool {
        self.data.iter().any(|&v| !(v.is_nan() || self.nodata.is_some_and(|nd| v == nd)))
    }
}

impl RasterSampler for RasterGrid {
    fn sample(&self, at: Point<f64>) -> Result<f64, SampleError> {
        let (x, y) = (at.x(), at.y());
        if !self.is_consistent() {
            return Err(SampleError::Unavailable(format!(
                "{}x{} grid holds {} values",
                self.width,
                self.height,
                self.data.len()
            )));
        }
        let (row, col) = self.cell_of(x, y).ok_or(SampleError::OutOfBounds { x, y })?;
        let v = self.get(row, col);
        let is_nodata = v.is_nan() || self.nodata.is_some_and(|nd| v == nd);
        if is_nodata {
            return Err(SampleError::NoData { x, y });
        }
        Ok(v)
    }
}
