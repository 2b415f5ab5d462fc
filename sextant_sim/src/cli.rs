// sextant_sim/src/cli.rs

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which estimator a run exercises.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Earth-referenced poses in ECEF.
    #[default]
    Absolute,
    /// Poses relative to where tracking started.
    Relative,
}

/// Sextant: replays a synthetic trajectory through the pose estimators.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/stationary.toml")]
    pub scenario: PathBuf,

    #[arg(short, long, value_enum, default_value_t = Mode::Absolute)]
    pub mode: Mode,

    /// Overrides the scenario's noise seed.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["sextant_sim"]);
        assert_eq!(cli.scenario, PathBuf::from("assets/scenarios/stationary.toml"));
        assert_eq!(cli.mode, Mode::Absolute);
        assert_eq!(cli.seed, None);
    }

    #[test]
    fn test_relative_mode_with_seed() {
        let cli = Cli::parse_from([
            "sextant_sim",
            "--scenario",
            "assets/scenarios/driving.toml",
            "--mode",
            "relative",
            "--seed",
            "3",
        ]);
        assert_eq!(cli.mode, Mode::Relative);
        assert_eq!(cli.seed, Some(3));
    }
}
