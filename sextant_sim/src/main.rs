// sextant_sim/src/main.rs

use clap::Parser;
use sextant_sim::cli::{Cli, Mode};
use sextant_sim::config::load_scenario;
use sextant_sim::error::SimError;
use sextant_sim::run::{run_absolute, run_relative};
use tracing::info;

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sextant_sim=info,sextant_core=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let scenario = load_scenario(&cli.scenario)?;
    let seed = cli.seed.or(scenario.simulation.seed).unwrap_or_default();

    let report = match cli.mode {
        Mode::Absolute => run_absolute(&scenario, seed)?,
        Mode::Relative => run_relative(&scenario, seed)?,
    };

    info!(
        variant = %report.variant,
        poses = report.poses,
        position_error_m = ?report.final_position_error,
        attitude_error_deg = ?report.final_attitude_error.map(f64::to_degrees),
        "scenario finished"
    );
    Ok(())
}
