// sextant_sim/src/trajectory.rs

//! Closed-form ground truth: a body driving on the plane tangent to its start
//! location with constant forward acceleration and constant yaw rate.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use sextant_core::geodesy::{
    earth_rotation_ecef, ecef_to_geodetic, geodetic_to_ecef, gravity_ecef, ned_to_ecef_rotation,
    NedLocation, NedVelocity,
};

use crate::config::TrajectoryConfig;

/// Below this yaw rate (rad/s) the straight-line solution is used.
const STRAIGHT_LINE_YAW_RATE: f64 = 1e-9;

/// The true kinematic state of the body at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruthSample {
    pub location: NedLocation,
    pub ecef_position: Vector3<f64>,
    pub ecef_velocity: Vector3<f64>,
    /// Body-to-ECEF rotation.
    pub ecef_orientation: UnitQuaternion<f64>,
    /// Body-to-NED rotation at `location`.
    pub attitude: UnitQuaternion<f64>,
    /// Specific force sensed by an ideal accelerometer (body axes).
    pub specific_force: Vector3<f64>,
    /// Rotation rate of the body with respect to the Earth (body axes).
    pub angular_rate: Vector3<f64>,
    /// Pose on the start tangent plane (north-east-down from the start point).
    pub tangent_pose: Isometry3<f64>,
}

#[derive(Debug, Clone)]
pub struct Trajectory {
    start: NedLocation,
    start_ecef: Vector3<f64>,
    tangent_to_ecef: UnitQuaternion<f64>,
    initial_yaw: f64,
    initial_speed: f64,
    acceleration: f64,
    yaw_rate: f64,
}

impl Trajectory {
    pub fn new(config: &TrajectoryConfig) -> Self {
        let start = NedLocation::from_degrees(config.latitude_deg, config.longitude_deg, config.height);
        Self {
            start,
            start_ecef: geodetic_to_ecef(&start),
            tangent_to_ecef: ned_to_ecef_rotation(start.latitude, start.longitude),
            initial_yaw: config.initial_yaw_deg.to_radians(),
            initial_speed: config.initial_speed,
            acceleration: config.forward_acceleration,
            yaw_rate: config.yaw_rate_deg.to_radians(),
        }
    }

    pub fn start_location(&self) -> NedLocation {
        self.start
    }

    pub fn start_velocity(&self) -> NedVelocity {
        let (sin_yaw, cos_yaw) = self.initial_yaw.sin_cos();
        NedVelocity::new(self.initial_speed * cos_yaw, self.initial_speed * sin_yaw, 0.0)
    }

    fn yaw(&self, t: f64) -> f64 {
        self.initial_yaw + self.yaw_rate * t
    }

    fn speed(&self, t: f64) -> f64 {
        self.initial_speed + self.acceleration * t
    }

    /// North-east displacement from the start after `t` seconds.
    fn displacement(&self, t: f64) -> Vector3<f64> {
        let (v0, a, w) = (self.initial_speed, self.acceleration, self.yaw_rate);
        // Integral of speed * (cos, sin)(yaw) in the heading frame at the start.
        let (along, across) = if w.abs() < STRAIGHT_LINE_YAW_RATE {
            (v0 * t + 0.5 * a * t * t, 0.0)
        } else {
            let (s, c) = (w * t).sin_cos();
            let v = self.speed(t);
            (
                v * s / w + a * (c - 1.0) / (w * w),
                (v0 - v * c) / w + a * s / (w * w),
            )
        };
        let (sin_yaw, cos_yaw) = self.initial_yaw.sin_cos();
        Vector3::new(
            along * cos_yaw - across * sin_yaw,
            along * sin_yaw + across * cos_yaw,
            0.0,
        )
    }

    fn tangent_velocity(&self, t: f64) -> Vector3<f64> {
        let (sin_yaw, cos_yaw) = self.yaw(t).sin_cos();
        Vector3::new(cos_yaw, sin_yaw, 0.0) * self.speed(t)
    }

    /// Acceleration in the tangent frame: forward plus centripetal.
    fn tangent_acceleration(&self, t: f64) -> Vector3<f64> {
        let (sin_yaw, cos_yaw) = self.yaw(t).sin_cos();
        let forward = Vector3::new(cos_yaw, sin_yaw, 0.0);
        let right = Vector3::new(-sin_yaw, cos_yaw, 0.0);
        forward * self.acceleration + right * (self.speed(t) * self.yaw_rate)
    }

    pub fn sample(&self, t: f64) -> TruthSample {
        let tangent_position = self.displacement(t);
        let tangent_attitude = UnitQuaternion::from_euler_angles(0.0, 0.0, self.yaw(t));

        let ecef_position = self.start_ecef + self.tangent_to_ecef * tangent_position;
        let ecef_velocity = self.tangent_to_ecef * self.tangent_velocity(t);
        let ecef_orientation = self.tangent_to_ecef * tangent_attitude;
        let location = ecef_to_geodetic(&ecef_position);
        let attitude =
            ned_to_ecef_rotation(location.latitude, location.longitude).inverse() * ecef_orientation;

        // f = a - g + 2 Omega x v, all in ECEF.
        let acceleration = self.tangent_to_ecef * self.tangent_acceleration(t);
        let coriolis = 2.0 * earth_rotation_ecef().cross(&ecef_velocity);
        let force_ecef = acceleration - gravity_ecef(&ecef_position) + coriolis;

        TruthSample {
            location,
            ecef_position,
            ecef_velocity,
            ecef_orientation,
            attitude,
            specific_force: ecef_orientation.inverse() * force_ecef,
            angular_rate: Vector3::new(0.0, 0.0, self.yaw_rate),
            tangent_pose: Isometry3::from_parts(Translation3::from(tangent_position), tangent_attitude),
        }
    }
}
