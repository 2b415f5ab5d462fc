// sextant_core/src/measurements.rs

use nalgebra::{UnitQuaternion, Vector3};

use crate::types::Timestamp;

// =========================================================================
// == Sensor Triads ==
// =========================================================================
// All triads are resolved along the body axes (forward, right, down).

/// Angular rate measured by a gyroscope (rad/s).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngularRate(pub Vector3<f64>);

/// Specific force measured by an accelerometer (m/s^2).
/// A level body at rest measures `(0, 0, -g)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpecificForce(pub Vector3<f64>);

/// The platform's estimate of the gravity part of the specific force (m/s^2).
/// Same sign convention as [`SpecificForce`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GravityVector(pub Vector3<f64>);

/// Magnetic flux density measured by a magnetometer (T).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MagneticField(pub Vector3<f64>);

macro_rules! impl_triad {
    ($($triad:ident),*) => {
        $(
            impl $triad {
                pub fn new(x: f64, y: f64, z: f64) -> Self {
                    Self(Vector3::new(x, y, z))
                }

                pub fn norm(&self) -> f64 {
                    self.0.norm()
                }
            }

            impl From<Vector3<f64>> for $triad {
                fn from(v: Vector3<f64>) -> Self {
                    Self(v)
                }
            }
        )*
    };
}

impl_triad!(AngularRate, SpecificForce, GravityVector, MagneticField);

/// An attitude reported by the platform's own fusion (e.g. a rotation-vector sensor).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    /// Body-to-NED rotation.
    pub orientation: UnitQuaternion<f64>,
}

impl Attitude {
    pub fn new(orientation: UnitQuaternion<f64>) -> Self {
        Self { orientation }
    }
}

// =========================================================================
// == Synchronized Measurements ==
// =========================================================================

/// One sensor sample as delivered by the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample<T> {
    pub value: T,
    /// Timestamp the sensor itself reported for the sample.
    pub timestamp: Timestamp,
    /// False when the synchronizer had to fill the slot without fresh data.
    pub valid: bool,
}

impl<T> SensorSample<T> {
    pub fn new(value: T, timestamp: Timestamp) -> Self {
        Self {
            value,
            timestamp,
            valid: true,
        }
    }

    pub fn invalid(value: T, timestamp: Timestamp) -> Self {
        Self {
            value,
            timestamp,
            valid: false,
        }
    }
}

/// A batch of heterogeneous samples grouped under a single timestamp.
///
/// Each processor family reads the subset it needs; a missing or invalid
/// required sample makes the whole measurement unusable for that processor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncedMeasurement {
    pub timestamp: Timestamp,
    pub attitude: Option<SensorSample<Attitude>>,
    pub accelerometer: Option<SensorSample<SpecificForce>>,
    pub gravity: Option<SensorSample<GravityVector>>,
    pub gyroscope: Option<SensorSample<AngularRate>>,
    pub magnetometer: Option<SensorSample<MagneticField>>,
}

fn usable<T>(sample: &Option<SensorSample<T>>) -> Option<&T> {
    sample.as_ref().filter(|s| s.valid).map(|s| &s.value)
}

impl SyncedMeasurement {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    pub fn with_attitude(mut self, attitude: Attitude) -> Self {
        self.attitude = Some(SensorSample::new(attitude, self.timestamp));
        self
    }

    pub fn with_accelerometer(mut self, force: SpecificForce) -> Self {
        self.accelerometer = Some(SensorSample::new(force, self.timestamp));
        self
    }

    pub fn with_gravity(mut self, gravity: GravityVector) -> Self {
        self.gravity = Some(SensorSample::new(gravity, self.timestamp));
        self
    }

    pub fn with_gyroscope(mut self, rate: AngularRate) -> Self {
        self.gyroscope = Some(SensorSample::new(rate, self.timestamp));
        self
    }

    pub fn with_magnetometer(mut self, field: MagneticField) -> Self {
        self.magnetometer = Some(SensorSample::new(field, self.timestamp));
        self
    }

    // --- Accessors returning only valid samples ---

    pub fn attitude(&self) -> Option<&Attitude> {
        usable(&self.attitude)
    }

    pub fn accelerometer(&self) -> Option<&SpecificForce> {
        usable(&self.accelerometer)
    }

    pub fn gravity(&self) -> Option<&GravityVector> {
        usable(&self.gravity)
    }

    pub fn gyroscope(&self) -> Option<&AngularRate> {
        usable(&self.gyroscope)
    }

    pub fn magnetometer(&self) -> Option<&MagneticField> {
        usable(&self.magnetometer)
    }
}
