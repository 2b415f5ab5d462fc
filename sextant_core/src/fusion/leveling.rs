// sextant_core/src/fusion/leveling.rs

//! Roll and pitch from measured specific force.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Which sensor feeds the leveling step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelingSource {
    /// The platform's gravity estimate (already low-pass filtered).
    Gravity,
    /// Raw accelerometer specific force.
    Accelerometer,
}

/// Roll and pitch of the body with respect to the local level (rad).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tilt {
    pub roll: f64,
    pub pitch: f64,
}

impl Tilt {
    pub fn from_attitude(attitude: &UnitQuaternion<f64>) -> Self {
        let (roll, pitch, _) = attitude.euler_angles();
        Self { roll, pitch }
    }

    /// Body-to-level attitude with the given yaw.
    pub fn with_yaw(&self, yaw: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(self.roll, self.pitch, yaw)
    }
}

const MIN_FORCE_NORM: f64 = 1e-6;

/// Closed-form leveling assuming gravity is exactly along local down.
pub fn fast_level(force: &Vector3<f64>) -> Option<Tilt> {
    if force.norm() < MIN_FORCE_NORM {
        return None;
    }
    Some(Tilt {
        roll: (-force.y).atan2(-force.z),
        pitch: force.x.atan2(force.y.hypot(force.z)),
    })
}

/// Leveling against a modelled gravity vector resolved in NED.
///
/// Finds the smallest rotation aligning the measured specific force with the
/// force a body at rest would sense under `gravity_ned`, then keeps its tilt.
pub fn accurate_level(force: &Vector3<f64>, gravity_ned: &Vector3<f64>) -> Option<Tilt> {
    if force.norm() < MIN_FORCE_NORM || gravity_ned.norm() < MIN_FORCE_NORM {
        return None;
    }
    match UnitQuaternion::rotation_between(force, &(-gravity_ned)) {
        Some(alignment) => Some(Tilt::from_attitude(&alignment)),
        // Antiparallel vectors: the body is upside down relative to the model.
        None => fast_level(force),
    }
}

/// Levels with the configured algorithm. Accurate leveling without a gravity
/// model falls back to the closed form.
pub fn level(force: &Vector3<f64>, gravity_ned: Option<&Vector3<f64>>, accurate: bool) -> Option<Tilt> {
    match (accurate, gravity_ned) {
        (true, Some(gravity)) => accurate_level(force, gravity),
        _ => fast_level(force),
    }
}
