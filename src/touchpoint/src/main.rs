//! Touchpoint: multi-touch marketing attribution over weekly event logs.
//!
//! Entry point that loads the input tables, runs the requested attribution
//! model and writes the resulting table to stdout.

mod loader;
mod output;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use touchpoint_core::config::AppConfig;
use touchpoint_core::{OutputFormat, TieBreak};
use touchpoint_reporting::{AttributionEngine, AttributionModel, RoiCalculator};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "touchpoint")]
#[command(about = "Multi-touch marketing attribution and channel ROI")]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "TOUCHPOINT_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(long, global = true, value_enum)]
    format: Option<FormatArg>,

    /// Tie-break inside the extremal week (overrides config)
    #[arg(long, global = true, value_enum)]
    tie_break: Option<TieBreakArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Attribute purchase gmv to channels
    Attribute {
        /// Event log CSV: week,user_id,channel,is_purchased,gmv
        #[arg(long)]
        events: PathBuf,

        #[arg(long, value_enum, default_value_t = ModelArg::LastTouch)]
        model: ModelArg,
    },
    /// Per-channel ROI of attributed gmv against ad spend
    Roi {
        /// Event log CSV: week,user_id,channel,is_purchased,gmv
        #[arg(long)]
        events: PathBuf,

        /// Cost table CSV: channel,costs
        #[arg(long)]
        costs: PathBuf,

        #[arg(long, value_enum, default_value_t = ModelArg::LastTouch)]
        model: ModelArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModelArg {
    LastTouch,
    FirstTouch,
    Linear,
    UShaped,
}

impl From<ModelArg> for AttributionModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::LastTouch => AttributionModel::LastTouch,
            ModelArg::FirstTouch => AttributionModel::FirstTouch,
            ModelArg::Linear => AttributionModel::Linear,
            ModelArg::UShaped => AttributionModel::UShaped,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Csv,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TieBreakArg {
    LastSeen,
    FirstSeen,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the table.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "touchpoint=info,touchpoint_reporting=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if cli.config.is_none() => {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }
        Err(e) => return Err(e).context("loading config file"),
    };

    // Apply CLI overrides
    if let Some(format) = cli.format {
        config.output.format = match format {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        };
    }
    if let Some(tie_break) = cli.tie_break {
        config.engine.tie_break = match tie_break {
            TieBreakArg::LastSeen => TieBreak::LastSeen,
            TieBreakArg::FirstSeen => TieBreak::FirstSeen,
        };
    }

    info!(
        tie_break = ?config.engine.tie_break,
        linear_decimals = config.engine.linear_decimals,
        format = ?config.output.format,
        "Configuration loaded"
    );

    let engine = AttributionEngine::new(config.engine.clone());
    let stdout = std::io::stdout();

    match cli.command {
        Command::Attribute { events, model } => {
            let log = loader::load_events(&events)
                .with_context(|| format!("loading events from {}", events.display()))?;
            let result = engine.attribute(&log, model.into());
            output::write_attribution(&result, config.output.format, stdout.lock())?;
        }
        Command::Roi {
            events,
            costs,
            model,
        } => {
            if model == ModelArg::UShaped {
                anyhow::bail!("ROI needs a purchase-windowed model; u-shaped has no total_gmv");
            }
            let log = loader::load_events(&events)
                .with_context(|| format!("loading events from {}", events.display()))?;
            let costs = loader::load_costs(&costs)
                .with_context(|| format!("loading costs from {}", costs.display()))?;

            let result = engine.attribute(&log, model.into());
            let matrix = result
                .as_matrix()
                .context("windowed model produced no attribution matrix")?;
            let report = RoiCalculator::compute(matrix, &costs)?;
            output::write_roi(&report, config.output.format, stdout.lock())?;
        }
    }

    Ok(())
}
