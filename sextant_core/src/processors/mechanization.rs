// sextant_core/src/processors/mechanization.rs

//! Translational integration of specific force between consecutive frames.

use nalgebra::{UnitQuaternion, Vector3};

use crate::frames::{EcefFrame, LocalFrame};
use crate::geodesy::{earth_rotation_ecef, gravity_ecef};
use crate::types::{elapsed_seconds, Timestamp};

/// Rescales specific force so its long-run magnitude matches modelled gravity.
///
/// Keeps the cumulative mean of the measured norm since the last reset.
#[derive(Debug, Clone, Default)]
pub struct GravityNormAdjuster {
    norm_sum: f64,
    samples: u64,
}

impl GravityNormAdjuster {
    pub fn reset(&mut self) {
        self.norm_sum = 0.0;
        self.samples = 0;
    }

    pub fn mean_norm(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.norm_sum / self.samples as f64)
    }

    pub fn adjust(&mut self, force: &Vector3<f64>, expected_gravity: f64) -> Vector3<f64> {
        self.norm_sum += force.norm();
        self.samples += 1;
        match self.mean_norm() {
            Some(mean) if mean > f64::EPSILON => force * (expected_gravity / mean),
            _ => *force,
        }
    }
}

/// Advances an ECEF frame to `timestamp` with the new body-to-ECEF orientation.
///
/// Specific force is resolved with the mean of both orientations, gravity and
/// Coriolis are taken at the previous state, position uses trapezoidal velocity.
pub fn ecef_step(
    previous: &EcefFrame,
    orientation: UnitQuaternion<f64>,
    force: &Vector3<f64>,
    timestamp: Timestamp,
) -> EcefFrame {
    let dt = elapsed_seconds(previous.timestamp, timestamp);
    let force_ecef = (previous.orientation * force + orientation * force) * 0.5;
    let coriolis = 2.0 * earth_rotation_ecef().cross(&previous.velocity);
    let velocity = previous.velocity + (force_ecef + gravity_ecef(&previous.position) - coriolis) * dt;

    EcefFrame {
        position: previous.position + (previous.velocity + velocity) * 0.5 * dt,
        velocity,
        orientation,
        timestamp,
    }
}

/// Advances a local leveled frame, with gravity of magnitude `gravity` along +z (down).
pub fn local_step(
    previous: &LocalFrame,
    orientation: UnitQuaternion<f64>,
    force: &Vector3<f64>,
    gravity: f64,
    timestamp: Timestamp,
) -> LocalFrame {
    let dt = elapsed_seconds(previous.timestamp, timestamp);
    let force_local = (previous.orientation * force + orientation * force) * 0.5;
    let velocity = previous.velocity + (force_local + Vector3::new(0.0, 0.0, gravity)) * dt;

    LocalFrame {
        position: previous.position + (previous.velocity + velocity) * 0.5 * dt,
        velocity,
        orientation,
        timestamp,
    }
}
