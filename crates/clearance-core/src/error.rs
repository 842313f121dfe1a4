//! Error types for pre-flight validation and per-feature measurement.
//!
//! `Error` variants abort a run before any feature is touched. A
//! `MeasurementError` only concerns one factor of one feature and is
//! surfaced in the run report instead of aborting the sweep.

use thiserror::Error;

use crate::factors::Factor;

/// Run-level error. Every variant is raised before the first feature update.
#[derive(Error, Debug)]
pub enum Error {
    #[error("at least {required} distinct factor weights are required, found {distinct}")]
    InvalidWeightConfiguration { distinct: usize, required: usize },

    #[error("weight for {factor} must be a positive integer, got {weight}")]
    InvalidWeight { factor: Factor, weight: u32 },

    #[error("expected {expected} factor weights, got {actual}")]
    InvalidWeightCount { expected: usize, actual: usize },

    #[error("low breakpoint ({low}) must be below the medium breakpoint ({medium})")]
    InvalidBreakpoints { low: i32, medium: i32 },

    #[error("layer '{layer}' has no field '{field}'")]
    MissingRequiredField { layer: String, field: String },

    #[error("layer '{layer}' has no features")]
    EmptyInputCollection { layer: String },

    #[error("feature {feature_id} in layer '{layer}' is a {found}, expected {expected}")]
    UnsupportedGeometryType {
        layer: String,
        feature_id: i64,
        found: &'static str,
        expected: &'static str,
    },

    #[error("spatial reference of layer '{layer}' ({found}) does not match {expected}")]
    SpatialReferenceMismatch {
        layer: String,
        expected: String,
        found: String,
    },

    #[error("layer '{layer}' holds more than one feature with id {id}")]
    DuplicateFeatureId { layer: String, id: i64 },

    #[error("feature {id} not found")]
    FeatureNotFound { id: i64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure to obtain or interpret one factor value for one feature.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasurementError {
    #[error("{factor} measurement unavailable: {reason}")]
    Unavailable { factor: Factor, reason: String },

    #[error("{factor} sample fell on a NoData cell")]
    NoData { factor: Factor },

    #[error("field '{field}' has no value")]
    MissingValue { field: String },

    #[error("field '{field}' holds an unusable value: {value}")]
    InvalidValue { field: String, value: String },

    #[error("query against layer '{layer}' failed: {reason}")]
    QueryFailed { layer: String, reason: String },
}

/// Failure to read a raster cell.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("({x}, {y}) lies outside the raster")]
    OutOfBounds { x: f64, y: f64 },

    #[error("cell at ({x}, {y}) holds NoData")]
    NoData { x: f64, y: f64 },

    #[error("raster read failed: {0}")]
    Unavailable(String),
}
