//! The nine location factors and per-factor storage.
//!
//! Factor order is fixed: LandCover, Aspect, Infrastructure, KeyFeatures,
//! Accidents, POI, Rivers, Slope, Population. Weight vectors supplied as
//! plain lists are interpreted in this order.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const FACTOR_COUNT: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Factor {
    LandCover,
    Aspect,
    Infrastructure,
    KeyFeatures,
    Accidents,
    Poi,
    Rivers,
    Slope,
    Population,
}

/// How a factor's raw value is obtained by a measurement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementKind {
    /// Cell value of a raster at the feature's representative point.
    RasterSample,
    /// Number of source features within a buffer distance of the feature.
    ProximityCount,
}

impl Factor {
    pub const ALL: [Factor; FACTOR_COUNT] = [
        Factor::LandCover,
        Factor::Aspect,
        Factor::Infrastructure,
        Factor::KeyFeatures,
        Factor::Accidents,
        Factor::Poi,
        Factor::Rivers,
        Factor::Slope,
        Factor::Population,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Attribute field holding the raw measurement.
    pub fn field(self) -> &'static str {
        match self {
            Factor::LandCover => "LANDCOVER",
            Factor::Aspect => "ASPECT",
            Factor::Infrastructure => "INFRASTRUCTURE",
            Factor::KeyFeatures => "KEYFEATURES",
            Factor::Accidents => "ACCIDENTS",
            Factor::Poi => "POI",
            Factor::Rivers => "RIVERS",
            Factor::Slope => "SLOPE",
            Factor::Population => "POPULATION",
        }
    }

    /// Attribute field recording the weight used in the last scoring run.
    pub fn weight_field(self) -> &'static str {
        match self {
            Factor::LandCover => "LANDCOVERWEIGHT",
            Factor::Aspect => "ASPECTWEIGHT",
            Factor::Infrastructure => "INFRASTRUCTUREWEIGHT",
            Factor::KeyFeatures => "KEYFEATURESWEIGHT",
            Factor::Accidents => "ACCIDENTSWEIGHT",
            Factor::Poi => "POIWEIGHT",
            Factor::Rivers => "RIVERSWEIGHT",
            Factor::Slope => "SLOPEWEIGHT",
            Factor::Population => "POPULATIONWEIGHT",
        }
    }

    /// Optional attribute field recording the grade of the last scoring run.
    pub fn grade_field(self) -> &'static str {
        match self {
            Factor::LandCover => "LANDCOVER_GRADE",
            Factor::Aspect => "ASPECT_GRADE",
            Factor::Infrastructure => "INFRASTRUCTURE_GRADE",
            Factor::KeyFeatures => "KEYFEATURES_GRADE",
            Factor::Accidents => "ACCIDENTS_GRADE",
            Factor::Poi => "POI_GRADE",
            Factor::Rivers => "RIVERS_GRADE",
            Factor::Slope => "SLOPE_GRADE",
            Factor::Population => "POPULATION_GRADE",
        }
    }

    /// Field recording the buffer distance, for proximity factors only.
    pub fn buffer_field(self) -> Option<&'static str> {
        match self {
            Factor::Infrastructure => Some("INFRA_BUFFER_DIST"),
            Factor::KeyFeatures => Some("KEYFEATURES_BUFFER_DIST"),
            Factor::Accidents => Some("ACCIDENTS_BUFFER_DIST"),
            Factor::Poi => Some("POI_BUFFER_DIST"),
            Factor::Rivers => Some("RIVERS_BUFFER_DIST"),
            Factor::Population => Some("POPULATION_BUFFER_DIST"),
            Factor::LandCover | Factor::Aspect | Factor::Slope => None,
        }
    }

    pub fn measurement_kind(self) -> MeasurementKind {
        match self {
            Factor::LandCover | Factor::Aspect | Factor::Slope => MeasurementKind::RasterSample,
            _ => MeasurementKind::ProximityCount,
        }
    }

    /// Name used in run stamps and log output.
    pub fn name(self) -> &'static str {
        match self {
            Factor::LandCover => "LandCover",
            Factor::Aspect => "Aspect",
            Factor::Infrastructure => "Infrastructure",
            Factor::KeyFeatures => "KeyFeatures",
            Factor::Accidents => "Accidents",
            Factor::Poi => "POI",
            Factor::Rivers => "Rivers",
            Factor::Slope => "Slope",
            Factor::Population => "Population",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Factor {
    type Err = String;

    /// Accepts the display name or the attribute field name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        Factor::ALL
            .into_iter()
            .find(|f| {
                f.name().to_ascii_lowercase() == wanted || f.field().to_ascii_lowercase() == wanted
            })
            .ok_or_else(|| format!("unknown factor '{s}'"))
    }
}

// ── Grade ─────────────────────────────────────────────────────────────────────

/// Ordinal classification of a factor value, 0 (lowest priority) to 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Grade(u8);

impl Grade {
    pub const ZERO: Grade = Grade(0);
    pub const ONE: Grade = Grade(1);
    pub const TWO: Grade = Grade(2);
    pub const THREE: Grade = Grade(3);
    pub const MAX: u8 = 3;

    pub fn new(value: u8) -> Option<Grade> {
        (value <= Self::MAX).then_some(Grade(value))
    }

    #[inline]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Grade {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Grade::new(value).ok_or_else(|| format!("grade {value} is outside 0..={}", Grade::MAX))
    }
}

impl From<Grade> for u8 {
    fn from(g: Grade) -> u8 {
        g.0
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── FactorSet ─────────────────────────────────────────────────────────────────

/// One value per factor, indexed by `Factor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactorSet<T>(pub [T; FACTOR_COUNT]);

impl<T> FactorSet<T> {
    pub fn from_fn(mut f: impl FnMut(Factor) -> T) -> Self {
        FactorSet(std::array::from_fn(|i| f(Factor::ALL[i])))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, &T)> {
        Factor::ALL.into_iter().zip(self.0.iter())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(Factor, &T) -> U) -> FactorSet<U> {
        FactorSet::from_fn(|factor| f(factor, &self[factor]))
    }
}

impl<T: Clone> FactorSet<T> {
    /// Build from a list in factor order. Returns `None` unless exactly nine
    /// values are given.
    pub fn from_slice(values: &[T]) -> Option<Self> {
        if values.len() != FACTOR_COUNT {
            return None;
        }
        Some(FactorSet::from_fn(|f| values[f.index()].clone()))
    }
}

impl<T> Index<Factor> for FactorSet<T> {
    type Output = T;

    fn index(&self, factor: Factor) -> &T {
        &self.0[factor.index()]
    }
}

impl<T> IndexMut<Factor> for FactorSet<T> {
    fn index_mut(&mut self, factor: Factor) -> &mut T {
        &mut self.0[factor.index()]
    }
}
