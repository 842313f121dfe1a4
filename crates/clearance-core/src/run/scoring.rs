//! Scoring run: grade every factor, aggregate, rank, and record the weights.

#[cfg(feature = "threading")]
use rayon::prelude::*;

use super::{RunContext, RunReport};
use crate::classify::classify_all;
use crate::config::RunConfig;
use crate::error::{MeasurementError, Result};
use crate::factors::{Factor, FactorSet, Grade};
use crate::layer::{AttributeValue, Feature, FeatureLayer, Record};
use crate::preflight;
use crate::score::{score, Breakpoints, ScoreResult};
use crate::weights::Weights;

pub const RUN_STAMP: &str = "CalcScore";
pub const SCORE_FIELD: &str = "SCORE";
pub const RANKING_FIELD: &str = "RANKING";
pub const WEIGHTED_SCORE_FIELD: &str = "WEIGHTEDSCORE";

/// Grades and aggregate scores of one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureScore {
    pub grades: FactorSet<Grade>,
    pub result: ScoreResult,
}

/// Fields a layer must carry before it can be scored.
pub fn required_fields() -> Vec<&'static str> {
    let mut fields: Vec<&'static str> = Factor::ALL.iter().map(|f| f.field()).collect();
    fields.extend([SCORE_FIELD, RANKING_FIELD]);
    fields.extend(Factor::ALL.iter().map(|f| f.weight_field()));
    fields.push(WEIGHTED_SCORE_FIELD);
    fields
}

/// Read the nine raw values of `feature` and score them.
pub fn evaluate_feature(
    feature: &Feature,
    weights: &Weights,
    breakpoints: Breakpoints,
) -> std::result::Result<FeatureScore, MeasurementError> {
    let mut values = FactorSet::<f64>::default();
    for factor in Factor::ALL {
        values[factor] = feature.numeric(factor.field())?;
    }
    let grades = classify_all(&values)?;
    Ok(FeatureScore { grades, result: score(&grades, weights, breakpoints) })
}

fn updates_for(layer: &FeatureLayer, scored: &FeatureScore, weights: &Weights) -> Record {
    let mut updates = Record::new();
    updates.insert(SCORE_FIELD.to_string(), scored.result.score.into());
    updates.insert(RANKING_FIELD.to_string(), scored.result.ranking.as_str().into());
    updates.insert(WEIGHTED_SCORE_FIELD.to_string(), scored.result.weighted_score.into());
    for factor in Factor::ALL {
        updates.insert(factor.weight_field().to_string(), weights.get(factor).into());
        // Grade fields are optional in the schema.
        if layer.has_field(factor.grade_field()) {
            updates.insert(
                factor.grade_field().to_string(),
                AttributeValue::Int(i64::from(scored.grades[factor].value())),
            );
        }
    }
    updates
}

/// Score every feature of `layer` in place.
///
/// Aborts before touching any feature if the weights have too few distinct
/// values, the breakpoints are unordered, a required field is missing or
/// the layer is empty. A feature whose factor values cannot be read or
/// graded is reported and left unchanged.
pub fn score_layer(layer: &mut FeatureLayer, config: &RunConfig) -> Result<RunReport> {
    let ctx = RunContext::start(RUN_STAMP, layer.len());
    let weights = config.weights;
    let breakpoints = config.breakpoints();

    ctx.in_scope(|| -> Result<()> {
        weights.validate()?;
        breakpoints.validate()?;
        preflight::require_fields(layer, required_fields())?;
        preflight::require_features(layer)?;
        preflight::require_unique_ids(layer)?;
        tracing::info!(total = layer.len(), "starting the priority ranking analysis");
        Ok(())
    })?;

    // Pure per-feature computation first; results are applied afterwards.
    #[cfg(feature = "threading")]
    let outcomes: Vec<(i64, std::result::Result<FeatureScore, MeasurementError>)> = layer
        .features
        .par_iter()
        .map(|f| (f.id, evaluate_feature(f, &weights, breakpoints)))
        .collect();
    #[cfg(not(feature = "threading"))]
    let outcomes: Vec<(i64, std::result::Result<FeatureScore, MeasurementError>)> = layer
        .features
        .iter()
        .map(|f| (f.id, evaluate_feature(f, &weights, breakpoints)))
        .collect();

    let mut report = RunReport::new(&ctx);
    for (n, (id, outcome)) in outcomes.into_iter().enumerate() {
        ctx.progress(n + 1, id);
        let scored = match outcome {
            Ok(s) => s,
            Err(e) => {
                report.fail(&ctx, id, e);
                continue;
            }
        };
        ctx.in_scope(|| {
            for (factor, grade) in scored.grades.iter() {
                tracing::debug!(feature = id, "{factor} grading: {grade}");
            }
            tracing::info!(
                feature = id,
                score = scored.result.score,
                ranking = %scored.result.ranking,
                weighted_score = scored.result.weighted_score,
                "feature scored"
            );
        });
        let updates = updates_for(layer, &scored, &weights);
        layer.write_attributes(id, updates)?;
        report.processed += 1;
    }

    Ok(ctx.finish(report))
}
