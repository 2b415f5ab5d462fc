// sextant_core/src/frames.rs

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use crate::geodesy::{self, NedLocation, NedVelocity};
use crate::types::{PoseTransformation, Timestamp};

/// A timestamped rigid body pose a processor keeps history of.
pub trait PoseFrame: Copy {
    fn timestamp(&self) -> Timestamp;

    /// Body pose as a rigid transform into the frame's navigation axes.
    fn isometry(&self) -> Isometry3<f64>;

    /// The rigid transform taking `initial` onto `self`, in the initial body frame.
    fn transformation_from(&self, initial: &Self) -> PoseTransformation {
        initial.isometry().inverse() * self.isometry()
    }
}

/// The full kinematic state of the body at one instant, resolved in ECEF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EcefFrame {
    /// Body origin in ECEF (m).
    pub position: Vector3<f64>,
    /// Body velocity resolved along ECEF axes (m/s).
    pub velocity: Vector3<f64>,
    /// Body-to-ECEF rotation.
    pub orientation: UnitQuaternion<f64>,
    pub timestamp: Timestamp,
}

impl EcefFrame {
    /// Builds a frame from a geodetic location, a NED velocity and a body-to-NED attitude.
    pub fn from_ned(
        location: &NedLocation,
        velocity: &NedVelocity,
        attitude: &UnitQuaternion<f64>,
        timestamp: Timestamp,
    ) -> Self {
        let c_n_e = geodesy::ned_to_ecef_rotation(location.latitude, location.longitude);
        Self {
            position: geodesy::geodetic_to_ecef(location),
            velocity: c_n_e * velocity.as_vector(),
            orientation: c_n_e * attitude,
            timestamp,
        }
    }

    pub fn location(&self) -> NedLocation {
        geodesy::ecef_to_geodetic(&self.position)
    }

    /// Body-to-NED attitude at the frame's own location.
    pub fn ned_attitude(&self) -> UnitQuaternion<f64> {
        let location = self.location();
        geodesy::ned_to_ecef_rotation(location.latitude, location.longitude).inverse()
            * self.orientation
    }

    pub fn ned_velocity(&self) -> NedVelocity {
        let location = self.location();
        let v = geodesy::ned_to_ecef_rotation(location.latitude, location.longitude).inverse()
            * self.velocity;
        NedVelocity::new(v.x, v.y, v.z)
    }
}

impl PoseFrame for EcefFrame {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position), self.orientation)
    }
}

/// A body state resolved in a leveled frame anchored at the start of tracking.
///
/// The frame's axes are North-East-Down when heading is absolute, or
/// start-heading-aligned forward-right-down for the relative processors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    /// Body-to-local rotation.
    pub orientation: UnitQuaternion<f64>,
    pub timestamp: Timestamp,
}

impl LocalFrame {
    pub fn at_origin(orientation: UnitQuaternion<f64>, velocity: Vector3<f64>, timestamp: Timestamp) -> Self {
        Self {
            position: Vector3::zeros(),
            velocity,
            orientation,
            timestamp,
        }
    }
}

impl PoseFrame for LocalFrame {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position), self.orientation)
    }
}
