//! User-assigned factor weights.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::factors::{Factor, FactorSet, FACTOR_COUNT};

/// Minimum number of distinct values a weight vector must contain.
pub const MIN_DISTINCT_WEIGHTS: usize = 5;

/// One positive integer weight per factor, constant across a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weights(pub FactorSet<u32>);

impl Weights {
    /// Build from a list in factor order.
    pub fn from_slice(values: &[u32]) -> Result<Self> {
        FactorSet::from_slice(values)
            .map(Weights)
            .ok_or(Error::InvalidWeightCount { expected: FACTOR_COUNT, actual: values.len() })
    }

    #[inline]
    pub fn get(&self, factor: Factor) -> u32 {
        self.0[factor]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0 .0
    }

    pub fn distinct_count(&self) -> usize {
        distinct_count(self.as_slice())
    }

    /// Fail with `InvalidWeight` on a zero weight, or with
    /// `InvalidWeightConfiguration` unless enough distinct weights were
    /// assigned.
    pub fn validate(&self) -> Result<()> {
        if let Some((factor, &weight)) = self.0.iter().find(|&(_, &w)| w == 0) {
            tracing::error!(%factor, "factor weight must be positive");
            return Err(Error::InvalidWeight { factor, weight });
        }
        let distinct = self.distinct_count();
        if distinct < MIN_DISTINCT_WEIGHTS {
            tracing::error!(distinct, "too few distinct factor weights");
            return Err(Error::InvalidWeightConfiguration {
                distinct,
                required: MIN_DISTINCT_WEIGHTS,
            });
        }
        tracing::debug!(distinct, "factor weights accepted");
        Ok(())
    }
}

impl Default for Weights {
    /// All ones. Rejected by `validate` until the user assigns real weights.
    fn default() -> Self {
        Weights(FactorSet([1; FACTOR_COUNT]))
    }
}

pub fn distinct_count(weights: &[u32]) -> usize {
    weights.iter().collect::<BTreeSet<_>>().len()
}

/// True iff the weights contain more than four distinct values.
pub fn validate_weights(weights: &[u32]) -> bool {
    distinct_count(weights) >= MIN_DISTINCT_WEIGHTS
}
