//! Measurement run: fill one factor field across the hazard-area layer.

use super::{RunContext, RunReport};
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::factors::{Factor, MeasurementKind};
use crate::layer::{AttributeValue, FeatureLayer, Record};
use crate::measure::{measure, MeasurementSource};
use crate::preflight;
use crate::spatial::{RasterGrid, SpatialQuery};

/// Input data a factor is measured from.
#[derive(Debug, Clone, Copy)]
pub enum FactorInput<'a> {
    Raster(&'a RasterGrid),
    /// Proximity sources; counts are summed across them.
    Layers(&'a [&'a FeatureLayer]),
}

impl FactorInput<'_> {
    pub fn kind(&self) -> MeasurementKind {
        match self {
            FactorInput::Raster(_) => MeasurementKind::RasterSample,
            FactorInput::Layers(_) => MeasurementKind::ProximityCount,
        }
    }

    fn srs(&self) -> Vec<(&str, Option<&str>)> {
        match self {
            FactorInput::Raster(r) => vec![("raster", r.spatial_reference.as_deref())],
            FactorInput::Layers(ls) => ls.iter().map(|&l| preflight::srs_of(l)).collect(),
        }
    }
}

pub fn run_stamp(factor: Factor) -> String {
    format!("Measure{}", factor.name())
}

/// Fields `factor` writes to.
pub fn required_fields(factor: Factor) -> Vec<&'static str> {
    let mut fields = vec![factor.field()];
    fields.extend(factor.buffer_field());
    fields
}

/// Buffer distance configured for a proximity factor.
pub fn proximity_distance(config: &RunConfig, factor: Factor) -> Result<f64> {
    config
        .buffer_distances
        .get(factor)
        .ok_or_else(|| Error::Config(format!("{factor} has no buffer distance; it is not a proximity factor")))
}

/// Measure `factor` for every feature of `layer` and store the raw value.
///
/// Proximity factors also store the buffer distance used. A feature whose
/// measurement fails gets the configured sentinel, or is reported and left
/// untouched when no sentinel is configured.
pub fn measure_layer(
    layer: &mut FeatureLayer,
    factor: Factor,
    input: FactorInput<'_>,
    config: &RunConfig,
) -> Result<RunReport> {
    let ctx = RunContext::start(run_stamp(factor), layer.len());
    let distance = config.buffer_distances.get(factor);

    ctx.in_scope(|| -> Result<()> {
        if input.kind() != factor.measurement_kind() {
            tracing::error!(%factor, "factor cannot be measured from this input");
            return Err(Error::Config(format!(
                "{factor} is measured by {:?}, not {:?}",
                factor.measurement_kind(),
                input.kind()
            )));
        }
        match input {
            FactorInput::Raster(r) => {
                if !r.is_consistent() {
                    return Err(Error::Config(format!(
                        "raster declares {}x{} cells but holds {} values",
                        r.width,
                        r.height,
                        r.data.len()
                    )));
                }
                if !r.has_data() {
                    tracing::error!(%factor, "raster holds no data cells");
                    return Err(Error::EmptyInputCollection { layer: "raster".to_string() });
                }
            }
            FactorInput::Layers(sources) => {
                if sources.is_empty() {
                    return Err(Error::Config(format!("{factor} needs at least one source layer")));
                }
                for source in sources {
                    preflight::require_features(source)?;
                }
            }
        }
        config.check()?;
        preflight::require_fields(layer, required_fields(factor))?;
        preflight::require_features(layer)?;
        preflight::require_unique_ids(layer)?;
        if config.check_spatial_reference {
            let mut references = vec![preflight::srs_of(layer)];
            references.extend(input.srs());
            preflight::check_spatial_references(&references)?;
        }
        tracing::info!(%factor, total = layer.len(), "starting measurement");
        Ok(())
    })?;

    let queries: Vec<&dyn SpatialQuery> = match input {
        FactorInput::Raster(_) => Vec::new(),
        FactorInput::Layers(ls) => ls.iter().map(|&l| l as &dyn SpatialQuery).collect(),
    };
    let source = match input {
        FactorInput::Raster(r) => MeasurementSource::Raster(r),
        FactorInput::Layers(_) => MeasurementSource::Proximity {
            layers: &queries,
            distance: ctx.in_scope(|| proximity_distance(config, factor))?,
        },
    };

    let pending: Vec<(i64, std::result::Result<f64, _>)> = layer
        .features
        .iter()
        .filter(|f| !config.update_only || f.is_null(factor.field()))
        .map(|f| (f.id, measure(factor, &f.geometry, &source)))
        .collect();

    let mut report = RunReport::new(&ctx);
    report.skipped = layer.len() - pending.len();
    if report.skipped > 0 {
        ctx.in_scope(|| tracing::info!(skipped = report.skipped, "features already measured"));
    }

    for (n, (id, outcome)) in pending.into_iter().enumerate() {
        ctx.progress(n + 1, id);
        let value = match (outcome, config.measurement_sentinel) {
            (Ok(v), _) => v,
            (Err(e), Some(sentinel)) => {
                ctx.in_scope(|| tracing::warn!(feature = id, error = %e, sentinel, "writing sentinel"));
                report.substituted += 1;
                sentinel
            }
            (Err(e), None) => {
                report.fail(&ctx, id, e);
                continue;
            }
        };
        ctx.in_scope(|| tracing::debug!(feature = id, %factor, value, "measured"));

        let mut updates = Record::new();
        updates.insert(factor.field().to_string(), stored_value(factor, value));
        if let (Some(field), Some(d)) = (factor.buffer_field(), distance) {
            updates.insert(field.to_string(), AttributeValue::Float(d));
        }
        layer.write_attributes(id, updates)?;
        report.processed += 1;
    }

    Ok(ctx.finish(report))
}

/// Counts and land cover codes are stored as integers, angles and slopes as
/// floats.
fn stored_value(factor: Factor, value: f64) -> AttributeValue {
    let integral = matches!(factor.measurement_kind(), MeasurementKind::ProximityCount)
        || factor == Factor::LandCover;
    if integral && value.fract() == 0.0 {
        AttributeValue::Int(value as i64)
    } else {
        AttributeValue::Float(value)
    }
}
