use anyhow::{Context, Result};
use clap::Parser;
use fleet_charge_optimizer::config::Config;
use fleet_charge_optimizer::telemetry::init_tracing;
use fleet_charge_optimizer::{ChargePlanner, PlanRequest};
use std::path::PathBuf;
use tracing::info;

/// Plan EV fleet charging setpoints for one horizon
#[derive(Debug, Parser)]
#[command(name = "fleet-charge-optimizer", version)]
struct Cli {
    /// Plan request (JSON)
    #[arg(long)]
    request: PathBuf,

    /// Configuration file (defaults to config/default.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the solver backend (microlp, cbc, highs)
    #[arg(long)]
    solver: Option<String>,

    /// Forward the solver's own trace output
    #[arg(long)]
    verbose: bool,

    /// Write the plan here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(solver) = cli.solver {
        cfg.solver.backend = solver;
    }
    if cli.verbose {
        cfg.solver.verbose = true;
    }

    let planner = ChargePlanner::from_config(&cfg)?;

    let raw = std::fs::read_to_string(&cli.request)
        .with_context(|| format!("reading plan request {}", cli.request.display()))?;
    let request = PlanRequest::from_json(&raw)?;

    let plan = planner.plan(&request).context("charging plan failed")?;
    let json = serde_json::to_string_pretty(&plan)?;

    match cli.output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("writing plan to {}", path.display()))?;
            info!(path = %path.display(), "plan written");
        }
        None => println!("{json}"),
    }

    Ok(())
}
