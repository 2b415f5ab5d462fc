// sextant_core/src/geodesy.rs

//! WGS-84 geodesy primitives shared by the absolute pose processors.
//!
//! Frames follow the usual navigation conventions: ECEF is Earth-centred,
//! Earth-fixed; NED is the local North-East-Down tangent frame at a geodetic
//! location. Angles are in radians, distances in metres.

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// WGS-84 semi-major axis (m).
pub const EARTH_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
/// WGS-84 flattening.
pub const EARTH_FLATTENING: f64 = 1.0 / 298.257_223_563;
/// WGS-84 first eccentricity squared.
pub const EARTH_ECCENTRICITY_SQUARED: f64 = EARTH_FLATTENING * (2.0 - EARTH_FLATTENING);
/// WGS-84 semi-minor axis (m).
pub const EARTH_SEMI_MINOR_AXIS: f64 = EARTH_SEMI_MAJOR_AXIS * (1.0 - EARTH_FLATTENING);
/// Earth rotation rate (rad/s).
pub const EARTH_ROTATION_RATE: f64 = 7.292_115e-5;
/// WGS-84 gravitational constant (m^3/s^2).
pub const EARTH_GRAVITATIONAL_CONSTANT: f64 = 3.986_004_418e14;
/// Standard gravity (m/s^2), used when no location is known.
pub const STANDARD_GRAVITY: f64 = 9.806_65;

// Somigliana normal gravity parameters.
const EQUATORIAL_GRAVITY: f64 = 9.780_325_335_9;
const SOMIGLIANA_K: f64 = 0.001_931_853;

/// A geodetic position on the WGS-84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NedLocation {
    /// Geodetic latitude (rad).
    pub latitude: f64,
    /// Longitude (rad).
    pub longitude: f64,
    /// Height above the ellipsoid (m).
    pub height: f64,
}

impl NedLocation {
    pub fn new(latitude: f64, longitude: f64, height: f64) -> Self {
        Self {
            latitude,
            longitude,
            height,
        }
    }

    pub fn from_degrees(latitude_deg: f64, longitude_deg: f64, height: f64) -> Self {
        Self::new(latitude_deg.to_radians(), longitude_deg.to_radians(), height)
    }
}

/// Velocity resolved along local North, East and Down axes (m/s).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NedVelocity {
    pub north: f64,
    pub east: f64,
    pub down: f64,
}

impl NedVelocity {
    pub fn new(north: f64, east: f64, down: f64) -> Self {
        Self { north, east, down }
    }

    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.north, self.east, self.down)
    }
}

/// Radius of curvature in the prime vertical.
fn transverse_radius(latitude: f64) -> f64 {
    let sin_lat = latitude.sin();
    EARTH_SEMI_MAJOR_AXIS / (1.0 - EARTH_ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt()
}

/// Converts a geodetic location into ECEF cartesian coordinates.
pub fn geodetic_to_ecef(location: &NedLocation) -> Vector3<f64> {
    let n = transverse_radius(location.latitude);
    let (sin_lat, cos_lat) = location.latitude.sin_cos();
    let (sin_lon, cos_lon) = location.longitude.sin_cos();
    Vector3::new(
        (n + location.height) * cos_lat * cos_lon,
        (n + location.height) * cos_lat * sin_lon,
        (n * (1.0 - EARTH_ECCENTRICITY_SQUARED) + location.height) * sin_lat,
    )
}

/// Converts ECEF cartesian coordinates into a geodetic location.
///
/// Fixed-point iteration on latitude; the height expression used is well
/// conditioned at the poles as well as at the equator.
pub fn ecef_to_geodetic(position: &Vector3<f64>) -> NedLocation {
    let p = position.x.hypot(position.y);
    let longitude = position.y.atan2(position.x);

    let mut latitude = position.z.atan2(p * (1.0 - EARTH_ECCENTRICITY_SQUARED));
    let mut height = 0.0;
    for _ in 0..8 {
        let n = transverse_radius(latitude);
        let (sin_lat, cos_lat) = latitude.sin_cos();
        height = p * cos_lat + position.z * sin_lat - EARTH_SEMI_MAJOR_AXIS * EARTH_SEMI_MAJOR_AXIS / n;
        let next = position
            .z
            .atan2(p * (1.0 - EARTH_ECCENTRICITY_SQUARED * n / (n + height)));
        let converged = (next - latitude).abs() < 1e-14;
        latitude = next;
        if converged {
            break;
        }
    }

    NedLocation::new(latitude, longitude, height)
}

/// The rotation taking NED-resolved vectors at the given location into ECEF.
pub fn ned_to_ecef_rotation(latitude: f64, longitude: f64) -> UnitQuaternion<f64> {
    let (sin_lat, cos_lat) = latitude.sin_cos();
    let (sin_lon, cos_lon) = longitude.sin_cos();

    let north = Vector3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
    let east = Vector3::new(-sin_lon, cos_lon, 0.0);
    let down = Vector3::new(-cos_lat * cos_lon, -cos_lat * sin_lon, -sin_lat);

    let matrix = Matrix3::from_columns(&[north, east, down]);
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(matrix))
}

/// Resolves a NED velocity at the given location into ECEF axes.
pub fn ned_velocity_to_ecef(location: &NedLocation, velocity: &NedVelocity) -> Vector3<f64> {
    ned_to_ecef_rotation(location.latitude, location.longitude) * velocity.as_vector()
}

/// Normal gravity magnitude (Somigliana) with the second-order free-air height correction.
pub fn normal_gravity(latitude: f64, height: f64) -> f64 {
    let sin2 = latitude.sin().powi(2);
    let surface =
        EQUATORIAL_GRAVITY * (1.0 + SOMIGLIANA_K * sin2) / (1.0 - EARTH_ECCENTRICITY_SQUARED * sin2).sqrt();

    let m = EARTH_ROTATION_RATE.powi(2) * EARTH_SEMI_MAJOR_AXIS.powi(2) * EARTH_SEMI_MINOR_AXIS
        / EARTH_GRAVITATIONAL_CONSTANT;
    let r0 = EARTH_SEMI_MAJOR_AXIS;
    surface
        * (1.0 - 2.0 / r0 * (1.0 + EARTH_FLATTENING + m - 2.0 * EARTH_FLATTENING * sin2) * height
            + 3.0 * height * height / (r0 * r0))
}

/// Gravity (gravitation plus centrifugal) resolved along NED at a location.
///
/// The small north component models the deflection of the normal-gravity
/// vector from the ellipsoidal normal above the surface.
pub fn gravity_ned(location: &NedLocation) -> Vector3<f64> {
    let north = -8.08e-9 * location.height * (2.0 * location.latitude).sin();
    Vector3::new(north, 0.0, normal_gravity(location.latitude, location.height))
}

/// Gravity at an ECEF position, resolved along ECEF axes.
pub fn gravity_ecef(position: &Vector3<f64>) -> Vector3<f64> {
    let location = ecef_to_geodetic(position);
    ned_to_ecef_rotation(location.latitude, location.longitude) * gravity_ned(&location)
}

/// The Earth rotation vector in ECEF.
pub fn earth_rotation_ecef() -> Vector3<f64> {
    Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE)
}
