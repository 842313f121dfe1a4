//! Unweighted score, weighted score and three-tier ranking.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::factors::{FactorSet, Grade};
use crate::weights::Weights;

/// Highest possible unweighted score: nine factors at grade 3.
pub const MAX_SCORE: u32 = 27;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ranking {
    Low,
    Medium,
    High,
}

impl Ranking {
    pub fn as_str(self) -> &'static str {
        match self {
            Ranking::Low => "Low",
            Ranking::Medium => "Medium",
            Ranking::High => "High",
        }
    }
}

impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score thresholds: below `low` is Low, below `medium` is Medium, else High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoints {
    pub low: i32,
    pub medium: i32,
}

impl Breakpoints {
    pub fn new(low: i32, medium: i32) -> Self {
        Self { low, medium }
    }

    /// `rank` does not require ordered breakpoints; runs call this first.
    pub fn validate(&self) -> Result<()> {
        if self.low < self.medium {
            Ok(())
        } else {
            Err(Error::InvalidBreakpoints { low: self.low, medium: self.medium })
        }
    }

    pub fn rank(&self, score: u32) -> Ranking {
        let score = i64::from(score);
        if score < i64::from(self.low) {
            Ranking::Low
        } else if score < i64::from(self.medium) {
            Ranking::Medium
        } else {
            Ranking::High
        }
    }
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self { low: 6, medium: 9 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Sum of the nine grades, 0..=27.
    pub score: u32,
    /// Sum of grade × weight.
    pub weighted_score: u64,
    pub ranking: Ranking,
}

/// Aggregate one feature's grades.
///
///   score          = Σ grade_i
///   weighted_score = Σ grade_i · weight_i
///
/// Pure and order-independent; re-running on the same inputs yields the
/// same result.
pub fn score(grades: &FactorSet<Grade>, weights: &Weights, breakpoints: Breakpoints) -> ScoreResult {
    let score: u32 = grades.values().map(|g| u32::from(g.value())).sum();
    let weighted_score: u64 = grades
        .iter()
        .map(|(factor, g)| u64::from(g.value()) * u64::from(weights.get(factor)))
        .sum();

    ScoreResult {
        score,
        weighted_score,
        ranking: breakpoints.rank(score),
    }
}
