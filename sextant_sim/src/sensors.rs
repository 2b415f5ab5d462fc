// sextant_sim/src/sensors.rs

//! Noisy sensor readings generated from ground truth.

use nalgebra::{UnitQuaternion, Vector3};
use rand_distr::{Distribution, Normal};
use sextant_core::geodesy::gravity_ned;
use sextant_core::magnetic::MagneticModel;
use sextant_core::measurements::{
    AngularRate, Attitude, GravityVector, MagneticField, SpecificForce, SyncedMeasurement,
};
use sextant_core::types::Timestamp;

use crate::config::SensorNoiseConfig;
use crate::error::SimError;
use crate::prng::SimulationRng;
use crate::trajectory::TruthSample;

/// Isotropic white noise on a three-axis sensor.
#[derive(Debug, Clone, Copy)]
struct TriadNoise(Normal<f64>);

impl TriadNoise {
    fn new(std_dev: f64) -> Result<Self, SimError> {
        Ok(Self(Normal::new(0.0, std_dev)?))
    }

    fn sample(&self, rng: &mut SimulationRng) -> Vector3<f64> {
        Vector3::new(
            self.0.sample(&mut rng.0),
            self.0.sample(&mut rng.0),
            self.0.sample(&mut rng.0),
        )
    }
}

/// Turns truth samples into synchronized measurements carrying every sensor.
pub struct SensorSimulator {
    rng: SimulationRng,
    accelerometer: TriadNoise,
    gyroscope: TriadNoise,
    gyroscope_bias: Vector3<f64>,
    magnetometer: TriadNoise,
    gravity: TriadNoise,
    attitude: TriadNoise,
    magnetic_model: MagneticModel,
    magnetic_year: f64,
}

impl SensorSimulator {
    pub fn new(
        noise: &SensorNoiseConfig,
        magnetic_model: MagneticModel,
        magnetic_year: Option<f64>,
        rng: SimulationRng,
    ) -> Result<Self, SimError> {
        noise.validate()?;
        Ok(Self {
            rng,
            accelerometer: TriadNoise::new(noise.accelerometer_std)?,
            gyroscope: TriadNoise::new(noise.gyroscope_std)?,
            gyroscope_bias: Vector3::from(noise.gyroscope_bias),
            magnetometer: TriadNoise::new(noise.magnetometer_std)?,
            gravity: TriadNoise::new(noise.gravity_std)?,
            attitude: TriadNoise::new(noise.attitude_std)?,
            magnetic_model,
            magnetic_year: magnetic_year.unwrap_or(magnetic_model.epoch),
        })
    }

    pub fn measure(&mut self, truth: &TruthSample, timestamp: Timestamp) -> SyncedMeasurement {
        let to_body = truth.attitude.inverse();

        let force = truth.specific_force + self.accelerometer.sample(&mut self.rng);
        let rate = truth.angular_rate + self.gyroscope_bias + self.gyroscope.sample(&mut self.rng);
        let field = to_body
            * self
                .magnetic_model
                .field_ned(&truth.location, self.magnetic_year)
            + self.magnetometer.sample(&mut self.rng);
        let gravity = to_body * -gravity_ned(&truth.location) + self.gravity.sample(&mut self.rng);
        let attitude_error = UnitQuaternion::from_scaled_axis(self.attitude.sample(&mut self.rng));

        SyncedMeasurement::new(timestamp)
            .with_attitude(Attitude::new(truth.attitude * attitude_error))
            .with_accelerometer(SpecificForce(force))
            .with_gravity(GravityVector(gravity))
            .with_gyroscope(AngularRate(rate))
            .with_magnetometer(MagneticField(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrajectoryConfig;
    use crate::trajectory::Trajectory;
    use approx::assert_abs_diff_eq;

    fn simulator(noise: &SensorNoiseConfig, seed: u64) -> SensorSimulator {
        SensorSimulator::new(noise, MagneticModel::default(), None, SimulationRng::seeded(seed)).unwrap()
    }

    #[test]
    fn test_noiseless_sensors_report_truth() {
        let noise = SensorNoiseConfig {
            accelerometer_std: 0.0,
            gyroscope_std: 0.0,
            gyroscope_bias: [0.0, 0.0, 0.01],
            magnetometer_std: 0.0,
            gravity_std: 0.0,
            attitude_std: 0.0,
        };
        let truth = Trajectory::new(&TrajectoryConfig::default()).sample(1.0);
        let measurement = simulator(&noise, 1).measure(&truth, 42);

        assert_eq!(measurement.timestamp, 42);
        assert_abs_diff_eq!(measurement.accelerometer().unwrap().0, truth.specific_force, epsilon = 1e-12);
        assert_abs_diff_eq!(measurement.gyroscope().unwrap().0.z, 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(
            measurement.attitude().unwrap().orientation.angle_to(&truth.attitude),
            0.0,
            epsilon = 1e-12
        );
        assert!(measurement.magnetometer().unwrap().norm() > 1e-5);
    }

    #[test]
    fn test_same_seed_same_noise() {
        let truth = Trajectory::new(&TrajectoryConfig::default()).sample(0.0);
        let noise = SensorNoiseConfig::default();
        let a = simulator(&noise, 9).measure(&truth, 0);
        let b = simulator(&noise, 9).measure(&truth, 0);
        let c = simulator(&noise, 10).measure(&truth, 0);
        assert_eq!(a, b);
        assert_ne!(a.accelerometer(), c.accelerometer());
    }

    #[test]
    fn test_negative_std_is_rejected() {
        let noise = SensorNoiseConfig {
            gyroscope_std: -1.0,
            ..SensorNoiseConfig::default()
        };
        assert!(matches!(
            SensorSimulator::new(&noise, MagneticModel::default(), None, SimulationRng::seeded(0)),
            Err(SimError::InvalidScenario(_))
        ));
    }
}
