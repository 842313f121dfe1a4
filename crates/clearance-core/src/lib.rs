//! Clearance prioritization for suspected hazard areas.
//!
//! Each hazard area carries nine factor measurements. The scoring run grades
//! every factor on a 0..=3 scale, sums the grades into a priority score and
//! ranks the area Low, Medium or High. The clustering run lays a 3×3 grid
//! over each area, counts hazards per cell and records where they
//! concentrate. Measurement runs fill the factor fields from rasters and
//! proximity counts.

pub mod classify;
pub mod cluster;
pub mod config;
pub mod dataset;
pub mod error;
pub mod factors;
pub mod geometry;
pub mod layer;
pub mod measure;
pub mod preflight;
pub mod run;
pub mod score;
pub mod spatial;
pub mod weights;

pub use cluster::{CellLabel, ClusterHistogram, DominantClusters};
pub use config::{BufferDistances, RunConfig};
pub use error::{Error, MeasurementError, Result, SampleError};
pub use factors::{Factor, FactorSet, Grade, MeasurementKind};
pub use geometry::{Extent, FeatureGeometry};
pub use layer::{AttributeValue, Feature, FeatureLayer, Record};
pub use run::measurement::FactorInput;
pub use run::{cluster_layer, measure_layer, score_layer, RunContext, RunReport};
pub use score::{Breakpoints, Ranking, ScoreResult};
pub use spatial::{RasterGrid, RasterSampler, SpatialQuery};
pub use weights::Weights;
