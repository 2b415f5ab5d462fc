// sextant_sim/src/config.rs

//! Scenario files: what trajectory to fly, how noisy the sensors are and how
//! the estimators are configured.

use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use sextant_core::estimation::{AbsolutePoseEstimatorConfig, RelativePoseEstimatorConfig};
use tracing::info;

use crate::error::SimError;

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

/// The root of a `scenario.toml` file. Every section may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: Simulation,

    #[serde(default)]
    pub trajectory: TrajectoryConfig,

    #[serde(default)]
    pub sensors: SensorNoiseConfig,

    /// Estimator settings used by absolute runs. Initial location and
    /// velocity are taken from the trajectory.
    #[serde(default)]
    pub absolute: AbsolutePoseEstimatorConfig,

    #[serde(default)]
    pub relative: RelativePoseEstimatorConfig,
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Simulation {
    /// Seed for the noise generator; a fixed default keeps runs reproducible.
    #[serde(default)]
    pub seed: Option<u64>,
    pub duration_seconds: f64,
    /// Synchronized measurement rate.
    pub rate_hz: f64,
    /// Timestamp of the first measurement (ns).
    #[serde(default)]
    pub start_timestamp: i64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: None,
            duration_seconds: 10.0,
            rate_hz: 100.0,
            start_timestamp: 0,
        }
    }
}

/// Ground-truth motion on a level plane tangent to the start location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrajectoryConfig {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub height: f64,
    /// Heading at the start, clockwise from true north (deg).
    pub initial_yaw_deg: f64,
    /// Forward speed at the start (m/s).
    pub initial_speed: f64,
    pub forward_acceleration: f64,
    pub yaw_rate_deg: f64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            latitude_deg: 41.3874,
            longitude_deg: 2.1686,
            height: 12.0,
            initial_yaw_deg: 0.0,
            initial_speed: 0.0,
            forward_acceleration: 0.0,
            yaw_rate_deg: 0.0,
        }
    }
}

/// White noise standard deviations and biases of the simulated sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorNoiseConfig {
    /// m/s^2
    pub accelerometer_std: f64,
    /// rad/s
    pub gyroscope_std: f64,
    /// Constant gyroscope bias (rad/s), body axes.
    pub gyroscope_bias: [f64; 3],
    /// T
    pub magnetometer_std: f64,
    /// m/s^2
    pub gravity_std: f64,
    /// Per-axis rotation noise of the attitude sensor (rad).
    pub attitude_std: f64,
}

impl Default for SensorNoiseConfig {
    fn default() -> Self {
        Self {
            accelerometer_std: 0.02,
            gyroscope_std: 0.001,
            gyroscope_bias: [0.0; 3],
            magnetometer_std: 2.0e-7,
            gravity_std: 0.005,
            attitude_std: 0.002,
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.simulation.duration_seconds > 0.0) {
            return Err(SimError::InvalidScenario(format!(
                "duration must be positive, got {}",
                self.simulation.duration_seconds
            )));
        }
        if !(self.simulation.rate_hz > 0.0) {
            return Err(SimError::InvalidScenario(format!(
                "rate must be positive, got {}",
                self.simulation.rate_hz
            )));
        }
        self.sensors.validate()?;
        self.absolute.fusion.validate()?;
        self.relative.fusion.validate()?;
        Ok(())
    }
}

impl SensorNoiseConfig {
    /// Standard deviations must be finite and non-negative, biases finite.
    pub fn validate(&self) -> Result<(), SimError> {
        let deviations = [
            ("accelerometer_std", self.accelerometer_std),
            ("gyroscope_std", self.gyroscope_std),
            ("magnetometer_std", self.magnetometer_std),
            ("gravity_std", self.gravity_std),
            ("attitude_std", self.attitude_std),
        ];
        for (name, value) in deviations {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimError::InvalidScenario(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.gyroscope_bias.iter().any(|bias| !bias.is_finite()) {
            return Err(SimError::InvalidScenario(format!(
                "gyroscope_bias must be finite, got {:?}",
                self.gyroscope_bias
            )));
        }
        Ok(())
    }
}

/// Loads a scenario file, letting `SEXTANT_`-prefixed environment variables
/// override it (`SEXTANT_SIMULATION__SEED=7`).
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, SimError> {
    info!("Loading scenario from: {}", path.display());
    let scenario: ScenarioConfig = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("SEXTANT_").split("__"))
        .extract()?;
    scenario.validate()?;
    Ok(scenario)
}

/// Parses a scenario from TOML text, without environment overrides.
pub fn parse_scenario(toml: &str) -> Result<ScenarioConfig, SimError> {
    let scenario: ScenarioConfig = Figment::new().merge(Toml::string(toml)).extract()?;
    scenario.validate()?;
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sextant_core::config::InterpolationMode;

    #[test]
    fn test_empty_scenario_uses_defaults() {
        let scenario = parse_scenario("").unwrap();
        assert_eq!(scenario, ScenarioConfig::default());
    }

    #[test]
    fn test_sections_override_defaults() {
        let scenario = parse_scenario(
            r#"
            [simulation]
            seed = 7
            duration_seconds = 2.0
            rate_hz = 50.0

            [trajectory]
            yaw_rate_deg = 10.0

            [absolute]
            use_attitude_sensor = false

            [absolute.fusion]
            interpolation_mode = "direct"
            "#,
        )
        .unwrap();
        assert_eq!(scenario.simulation.seed, Some(7));
        assert_eq!(scenario.trajectory.yaw_rate_deg, 10.0);
        assert_eq!(scenario.trajectory.height, TrajectoryConfig::default().height);
        assert!(!scenario.absolute.use_attitude_sensor);
        assert_eq!(scenario.absolute.fusion.interpolation_mode, InterpolationMode::Direct);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(matches!(
            parse_scenario("[trajectory]\nspeed = 3.0\n"),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn test_negative_noise_is_rejected() {
        assert!(matches!(
            parse_scenario("[sensors]\ngyroscope_std = -1.0\n"),
            Err(SimError::InvalidScenario(message)) if message.contains("gyroscope_std")
        ));
        assert!(SensorNoiseConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_rate_is_rejected() {
        assert!(matches!(
            parse_scenario("[simulation]\nduration_seconds = 1.0\nrate_hz = 0.0\n"),
            Err(SimError::InvalidScenario(_))
        ));
    }
}
