//! Batch runs over a hazard-area layer: measurement, scoring, clustering.
//!
//! Each run validates its inputs up front, then sweeps the layer one feature
//! at a time. A feature's new attribute values are computed in full before
//! any of them is written, so an aborted run never leaves a half-updated
//! feature behind.
//!
//! Logging goes through a `RunContext` created at run start and finished at
//! run end. It carries the run's span and progress state; nothing is kept
//! between runs.

pub mod clustering;
pub mod measurement;
pub mod scoring;

use std::fmt;
use std::time::{Duration, Instant};

use tracing::Span;

use crate::error::MeasurementError;

pub use clustering::cluster_layer;
pub use measurement::measure_layer;
pub use scoring::{evaluate_feature, score_layer, FeatureScore};

/// Run-scoped logging and progress context.
pub struct RunContext {
    stamp: String,
    span: Span,
    started: Instant,
    total: usize,
}

impl RunContext {
    /// Open a run named `stamp` over `total` features.
    pub fn start(stamp: impl Into<String>, total: usize) -> Self {
        let stamp = stamp.into();
        let span = tracing::info_span!("run", stamp = %stamp);
        span.in_scope(|| tracing::debug!(total, "------- run started -------"));
        Self { stamp, span, started: Instant::now(), total }
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Run `f` inside the run's span.
    pub fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        self.span.in_scope(f)
    }

    /// Log that the `n`-th feature (1-based) is being processed.
    pub fn progress(&self, n: usize, feature_id: i64) {
        let pct = if self.total == 0 { 100.0 } else { n as f64 / self.total as f64 * 100.0 };
        self.span.in_scope(|| {
            tracing::info!(feature = feature_id, "processing feature {n} of {} ({pct:.2} %)", self.total)
        });
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Close the run, logging its execution time into `report`.
    pub fn finish(self, mut report: RunReport) -> RunReport {
        report.elapsed = self.elapsed();
        self.span.in_scope(|| {
            tracing::info!(
                processed = report.processed,
                skipped = report.skipped,
                failed = report.failed.len(),
                substituted = report.substituted,
                "total execution time {:.3} s",
                report.elapsed.as_secs_f64()
            );
            tracing::debug!("------- run finished -------");
        });
        report
    }
}

/// A feature the run could not update.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFailure {
    pub feature_id: i64,
    pub error: MeasurementError,
}

/// Outcome of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub run: String,
    /// Features in the input layer.
    pub total: usize,
    /// Features updated.
    pub processed: usize,
    /// Features left alone by the update-only filter.
    pub skipped: usize,
    /// Features updated with the configured sentinel after a failure.
    pub substituted: usize,
    pub failed: Vec<FeatureFailure>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn new(ctx: &RunContext) -> Self {
        Self { run: ctx.stamp().to_string(), total: ctx.total(), ..Self::default() }
    }

    pub fn fail(&mut self, ctx: &RunContext, feature_id: i64, error: MeasurementError) {
        ctx.in_scope(|| tracing::warn!(feature = feature_id, %error, "feature not updated"));
        self.failed.push(FeatureFailure { feature_id, error });
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} of {} features updated, {} skipped, {} substituted, {} failed ({:.3} s)",
            self.run,
            self.processed,
            self.total,
            self.skipped,
            self.substituted,
            self.failed.len(),
            self.elapsed.as_secs_f64()
        )?;
        for failure in &self.failed {
            write!(f, "\n  feature {}: {}", failure.feature_id, failure.error)?;
        }
        Ok(())
    }
}
