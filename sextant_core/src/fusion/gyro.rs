// sextant_core/src/fusion/gyro.rs

use nalgebra::{UnitQuaternion, Vector3};

/// Turns successive gyroscope rates into body-frame attitude increments.
///
/// The fast integrator treats the current rate as constant over the interval.
/// The accurate one uses the trapezoidal mean of the previous and current
/// rates and adds the second-order coning correction between consecutive
/// increments.
#[derive(Debug, Clone, Default)]
pub struct GyroIntegrator {
    accurate: bool,
    previous_rate: Option<Vector3<f64>>,
    previous_increment: Option<Vector3<f64>>,
}

impl GyroIntegrator {
    pub fn new(accurate: bool) -> Self {
        Self {
            accurate,
            ..Default::default()
        }
    }

    pub fn is_accurate(&self) -> bool {
        self.accurate
    }

    pub fn set_accurate(&mut self, accurate: bool) {
        self.accurate = accurate;
    }

    pub fn reset(&mut self) {
        self.previous_rate = None;
        self.previous_increment = None;
    }

    /// Records a rate without producing an increment (first sample of a session).
    pub fn prime(&mut self, rate: &Vector3<f64>) {
        self.previous_rate = Some(*rate);
        self.previous_increment = None;
    }

    /// Rotation vector accumulated over `dt` seconds ending at `rate`.
    pub fn rotation_vector(&mut self, rate: &Vector3<f64>, dt: f64) -> Vector3<f64> {
        let increment = if self.accurate {
            let mean_rate = match self.previous_rate {
                Some(previous) => (previous + rate) * 0.5,
                None => *rate,
            };
            let alpha = mean_rate * dt;
            match self.previous_increment {
                Some(previous) => alpha + previous.cross(&alpha) / 12.0,
                None => alpha,
            }
        } else {
            rate * dt
        };

        self.previous_rate = Some(*rate);
        self.previous_increment = Some(increment);
        increment
    }

    /// Body-frame attitude increment over `dt` seconds ending at `rate`.
    pub fn increment(&mut self, rate: &Vector3<f64>, dt: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_scaled_axis(self.rotation_vector(rate, dt))
    }
}
