//! Run configuration, loaded from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::factors::Factor;
use crate::score::Breakpoints;
use crate::weights::Weights;

/// Proximity buffer distances in layer units (metres for projected inputs).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferDistances {
    pub infrastructure: f64,
    pub key_features: f64,
    pub accidents: f64,
    pub poi: f64,
    pub rivers: f64,
    pub population: f64,
}

impl BufferDistances {
    /// Distance for a proximity factor; `None` for raster factors.
    pub fn get(&self, factor: Factor) -> Option<f64> {
        match factor {
            Factor::Infrastructure => Some(self.infrastructure),
            Factor::KeyFeatures => Some(self.key_features),
            Factor::Accidents => Some(self.accidents),
            Factor::Poi => Some(self.poi),
            Factor::Rivers => Some(self.rivers),
            Factor::Population => Some(self.population),
            Factor::LandCover | Factor::Aspect | Factor::Slope => None,
        }
    }

    pub fn set(&mut self, factor: Factor, distance: f64) {
        match factor {
            Factor::Infrastructure => self.infrastructure = distance,
            Factor::KeyFeatures => self.key_features = distance,
            Factor::Accidents => self.accidents = distance,
            Factor::Poi => self.poi = distance,
            Factor::Rivers => self.rivers = distance,
            Factor::Population => self.population = distance,
            Factor::LandCover | Factor::Aspect | Factor::Slope => {}
        }
    }
}

impl Default for BufferDistances {
    fn default() -> Self {
        Self {
            infrastructure: 1000.0,
            key_features: 1000.0,
            accidents: 1000.0,
            poi: 1000.0,
            rivers: 1000.0,
            population: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Nine weights in factor order.
    pub weights: Weights,
    pub low_breakpoint: i32,
    pub medium_breakpoint: i32,
    /// Abort when input layers disagree on spatial reference.
    pub check_spatial_reference: bool,
    /// Only process features whose target field is still null.
    pub update_only: bool,
    /// Value written when a measurement fails. Without it, failed features
    /// are reported and left untouched.
    pub measurement_sentinel: Option<f64>,
    pub buffer_distances: BufferDistances,
}

impl Default for RunConfig {
    fn default() -> Self {
        let bp = Breakpoints::default();
        Self {
            weights: Weights::default(),
            low_breakpoint: bp.low,
            medium_breakpoint: bp.medium,
            check_spatial_reference: true,
            update_only: false,
            measurement_sentinel: None,
            buffer_distances: BufferDistances::default(),
        }
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn breakpoints(&self) -> Breakpoints {
        Breakpoints::new(self.low_breakpoint, self.medium_breakpoint)
    }

    /// Structural checks that do not depend on the input data. Weight
    /// distinctness and breakpoint order are checked by the scoring run.
    pub fn check(&self) -> Result<()> {
        for factor in Factor::ALL {
            if let Some(d) = self.buffer_distances.get(factor) {
                if !(d.is_finite() && d >= 0.0) {
                    return Err(Error::Config(format!("buffer distance for {factor} must be non-negative, got {d}")));
                }
            }
        }
        if let Some(s) = self.measurement_sentinel {
            if !s.is_finite() {
                return Err(Error::Config(format!("measurement sentinel must be finite, got {s}")));
            }
        }
        Ok(())
    }
}
