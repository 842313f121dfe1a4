//! Command-line driver for the clearance prioritization runs.
//! Reads layers and rasters from JSON, runs one pass, writes the updated
//! hazard-area layer back out and prints the run report on stderr.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use clearance_core::{
    cluster_layer, dataset, measure_layer, score_layer, Factor, FactorInput, FeatureLayer, RunConfig, RunReport,
    Weights,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mcda", about = "Prioritize suspected hazard areas for clearance")]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. info, debug, clearance_core=trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit structured JSON logs instead of coloured text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Common {
    /// Hazard-area layer (JSON dataset).
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the updated layer.
    #[arg(short, long)]
    output: PathBuf,

    /// Run configuration JSON. Command-line flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the spatial reference comparison between inputs.
    #[arg(long)]
    no_check_srs: bool,

    /// Only process features whose target fields are still null.
    #[arg(long)]
    update_only: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Grade the nine factors, compute scores and rank every area.
    Score {
        #[command(flatten)]
        common: Common,

        #[arg(long)]
        low_breakpoint: Option<i32>,

        #[arg(long)]
        medium_breakpoint: Option<i32>,

        /// Nine comma-separated weights in factor order.
        #[arg(long, value_delimiter = ',')]
        weights: Option<Vec<u32>>,
    },
    /// Count hazards per 3×3 grid cell of every area.
    Cluster {
        #[command(flatten)]
        common: Common,

        /// Hazard layers; counts are summed across them.
        #[arg(long, required = true, num_args = 1..)]
        hazards: Vec<PathBuf>,
    },
    /// Fill one factor field from a raster or a proximity source layer.
    Measure {
        #[command(flatten)]
        common: Common,

        /// Factor to measure (e.g. slope, infrastructure).
        #[arg(short, long)]
        factor: Factor,

        /// Raster grid for land cover, aspect or slope.
        #[arg(long, conflicts_with = "source", required_unless_present = "source")]
        raster: Option<PathBuf>,

        /// Source layers for proximity counts; counts are summed across them.
        #[arg(long, num_args = 1..)]
        source: Vec<PathBuf>,

        /// Buffer distance for proximity counts, in layer units.
        #[arg(long)]
        buffer: Option<f64>,

        /// Value written when a measurement fails.
        #[arg(long)]
        sentinel: Option<f64>,
    },
}

// ── Logging ───────────────────────────────────────────────────────────────────

fn init_logging(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_ansi(true).with_writer(std::io::stderr))
            .init();
    }
}

// ── Runs ──────────────────────────────────────────────────────────────────────

fn load_config(common: &Common) -> Result<RunConfig> {
    let mut config = match &common.config {
        Some(path) => RunConfig::load(path).with_context(|| format!("reading config {}", path.display()))?,
        None => RunConfig::default(),
    };
    if common.no_check_srs {
        config.check_spatial_reference = false;
    }
    if common.update_only {
        config.update_only = true;
    }
    Ok(config)
}

fn apply_score_overrides(
    config: &mut RunConfig,
    low_breakpoint: Option<i32>,
    medium_breakpoint: Option<i32>,
    weights: Option<Vec<u32>>,
) -> Result<()> {
    if let Some(low) = low_breakpoint {
        config.low_breakpoint = low;
    }
    if let Some(medium) = medium_breakpoint {
        config.medium_breakpoint = medium;
    }
    if let Some(w) = weights {
        config.weights = Weights::from_slice(&w)?;
    }
    Ok(())
}

fn load_layer(path: &Path) -> Result<FeatureLayer> {
    dataset::load_layer(path).with_context(|| format!("reading layer {}", path.display()))
}

fn finish(layer: &FeatureLayer, output: &Path, report: &RunReport) -> Result<()> {
    dataset::save_layer(layer, output).with_context(|| format!("writing {}", output.display()))?;
    eprintln!("{report}");
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Score { common, low_breakpoint, medium_breakpoint, weights } => {
            let mut config = load_config(&common)?;
            apply_score_overrides(&mut config, low_breakpoint, medium_breakpoint, weights)?;
            let mut layer = load_layer(&common.input)?;
            let report = score_layer(&mut layer, &config)?;
            finish(&layer, &common.output, &report)
        }
        Command::Cluster { common, hazards } => {
            let config = load_config(&common)?;
            let mut layer = load_layer(&common.input)?;
            let hazard_layers = hazards.iter().map(|p| load_layer(p)).collect::<Result<Vec<_>>>()?;
            let refs: Vec<&FeatureLayer> = hazard_layers.iter().collect();
            let report = cluster_layer(&mut layer, &refs, &config)?;
            finish(&layer, &common.output, &report)
        }
        Command::Measure { common, factor, raster, source, buffer, sentinel } => {
            let mut config = load_config(&common)?;
            if let Some(d) = buffer {
                if factor.buffer_field().is_none() {
                    bail!("--buffer only applies to proximity factors, not {factor}");
                }
                config.buffer_distances.set(factor, d);
            }
            if sentinel.is_some() {
                config.measurement_sentinel = sentinel;
            }
            let mut layer = load_layer(&common.input)?;
            let report = match raster {
                Some(path) => {
                    let grid = dataset::load_raster(&path)
                        .with_context(|| format!("reading raster {}", path.display()))?;
                    measure_layer(&mut layer, factor, FactorInput::Raster(&grid), &config)?
                }
                None if source.is_empty() => bail!("either --raster or --source is required"),
                None => {
                    let sources = source.iter().map(|p| load_layer(p)).collect::<Result<Vec<_>>>()?;
                    let refs: Vec<&FeatureLayer> = sources.iter().collect();
                    measure_layer(&mut layer, factor, FactorInput::Layers(&refs), &config)?
                }
            };
            finish(&layer, &common.output, &report)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json);
    tracing::debug!(command = ?cli.command, "arguments parsed");
    run(cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "mcda", "score", "-i", "in.json", "-o", "out.json", "--no-check-srs", "--update-only",
            "--low-breakpoint", "8", "--weights", "1,2,3,4,5,6,7,8,9",
        ])
        .unwrap();
        let Command::Score { common, low_breakpoint, medium_breakpoint, weights } = cli.command else {
            panic!("expected the score command");
        };
        let mut config = load_config(&common).unwrap();
        assert!(!config.check_spatial_reference);
        assert!(config.update_only);
        apply_score_overrides(&mut config, low_breakpoint, medium_breakpoint, weights).unwrap();
        assert_eq!(config.low_breakpoint, 8);
        assert_eq!(config.medium_breakpoint, RunConfig::default().medium_breakpoint);
        assert_eq!(config.weights.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn wrong_weight_count_rejected() {
        let mut config = RunConfig::default();
        assert!(apply_score_overrides(&mut config, None, None, Some(vec![1, 2, 3])).is_err());
    }

    #[test]
    fn measure_takes_several_sources_or_one_raster() {
        let cli = Cli::try_parse_from([
            "mcda", "measure", "-i", "in.json", "-o", "out.json", "-f", "infrastructure",
            "--source", "roads.json", "tracks.json",
        ])
        .unwrap();
        match cli.command {
            Command::Measure { source, raster, .. } => {
                assert_eq!(source, [PathBuf::from("roads.json"), PathBuf::from("tracks.json")]);
                assert!(raster.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }

        let both = Cli::try_parse_from([
            "mcda", "measure", "-i", "in.json", "-o", "out.json", "-f", "slope",
            "--raster", "slope.json", "--source", "roads.json",
        ]);
        assert!(both.is_err());
        let neither = Cli::try_parse_from(["mcda", "measure", "-i", "in.json", "-o", "out.json", "-f", "slope"]);
        assert!(neither.is_err());
    }
}
