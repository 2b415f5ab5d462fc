// sextant_core/src/magnetic.rs

//! A centred, tilted-dipole approximation of the geomagnetic field.
//!
//! Heading fusion only needs the declination at the tracking location; the
//! full field vector is exposed as well so simulators can synthesize
//! magnetometer readings consistent with the declination the estimator uses.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::geodesy::NedLocation;

/// Mean equatorial field strength of the dipole (T).
const DEFAULT_EQUATORIAL_FIELD: f64 = 2.94e-5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MagneticModel {
    /// Geomagnetic north pole latitude at `epoch` (deg).
    pub pole_latitude_deg: f64,
    /// Geomagnetic north pole longitude at `epoch` (deg).
    pub pole_longitude_deg: f64,
    /// Secular drift of the pole latitude (deg/year).
    #[serde(default)]
    pub pole_latitude_rate_deg: f64,
    /// Secular drift of the pole longitude (deg/year).
    #[serde(default)]
    pub pole_longitude_rate_deg: f64,
    /// Decimal year the pole position refers to.
    pub epoch: f64,
    /// Field strength at the geomagnetic equator (T).
    #[serde(default = "default_equatorial_field")]
    pub equatorial_field: f64,
}

fn default_equatorial_field() -> f64 {
    DEFAULT_EQUATORIAL_FIELD
}

impl Default for MagneticModel {
    /// Dipole terms of the 2020 reference field.
    fn default() -> Self {
        Self {
            pole_latitude_deg: 80.65,
            pole_longitude_deg: -72.68,
            pole_latitude_rate_deg: 0.04,
            pole_longitude_rate_deg: 0.05,
            epoch: 2020.0,
            equatorial_field: DEFAULT_EQUATORIAL_FIELD,
        }
    }
}

impl MagneticModel {
    /// Pole (latitude, longitude) in radians at the given decimal year.
    fn pole_at(&self, year: f64) -> (f64, f64) {
        let years = year - self.epoch;
        (
            (self.pole_latitude_deg + self.pole_latitude_rate_deg * years).to_radians(),
            (self.pole_longitude_deg + self.pole_longitude_rate_deg * years).to_radians(),
        )
    }

    /// Angle from true north to magnetic north, positive eastwards (rad).
    pub fn declination(&self, location: &NedLocation, year: f64) -> f64 {
        let (pole_lat, pole_lon) = self.pole_at(year);
        let delta_lon = pole_lon - location.longitude;
        let (sin_lat, cos_lat) = location.latitude.sin_cos();
        (delta_lon.sin() * pole_lat.cos())
            .atan2(cos_lat * pole_lat.sin() - sin_lat * pole_lat.cos() * delta_lon.cos())
    }

    /// Geomagnetic latitude of a location (rad).
    fn geomagnetic_latitude(&self, location: &NedLocation, year: f64) -> f64 {
        let (pole_lat, pole_lon) = self.pole_at(year);
        let (sin_lat, cos_lat) = location.latitude.sin_cos();
        (sin_lat * pole_lat.sin() + cos_lat * pole_lat.cos() * (location.longitude - pole_lon).cos())
            .clamp(-1.0, 1.0)
            .asin()
    }

    /// Angle of the field below the horizontal, positive downwards (rad).
    pub fn inclination(&self, location: &NedLocation, year: f64) -> f64 {
        (2.0 * self.geomagnetic_latitude(location, year).tan()).atan()
    }

    /// The field vector resolved along local NED axes (T).
    pub fn field_ned(&self, location: &NedLocation, year: f64) -> Vector3<f64> {
        let magnetic_latitude = self.geomagnetic_latitude(location, year);
        let intensity =
            self.equatorial_field * (1.0 + 3.0 * magnetic_latitude.sin().powi(2)).sqrt();
        let declination = self.declination(location, year);
        let inclination = self.inclination(location, year);
        let horizontal = intensity * inclination.cos();
        Vector3::new(
            horizontal * declination.cos(),
            horizontal * declination.sin(),
            intensity * inclination.sin(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_declination_is_zero_on_pole_meridian() {
        let model = MagneticModel {
            pole_latitude_rate_deg: 0.0,
            pole_longitude_rate_deg: 0.0,
            ..MagneticModel::default()
        };
        let location = NedLocation::from_degrees(10.0, model.pole_longitude_deg, 0.0);
        assert_abs_diff_eq!(model.declination(&location, 2020.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_declination_sign_follows_pole_bearing() {
        let model = MagneticModel::default();
        // East of the pole meridian the pole lies to the west: negative declination.
        let europe = NedLocation::from_degrees(45.0, 0.0, 0.0);
        assert!(model.declination(&europe, 2020.0) < 0.0);
        let alaska = NedLocation::from_degrees(60.0, -150.0, 0.0);
        assert!(model.declination(&alaska, 2020.0) > 0.0);
    }

    #[test]
    fn test_field_vector_matches_declination_and_inclination() {
        let model = MagneticModel::default();
        let location = NedLocation::from_degrees(41.0, 2.0, 0.0);
        let field = model.field_ned(&location, 2024.5);
        assert_abs_diff_eq!(
            field.y.atan2(field.x),
            model.declination(&location, 2024.5),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            field.z.atan2(field.xy().norm()),
            model.inclination(&location, 2024.5),
            epsilon = 1e-12
        );
        // Northern hemisphere: the field dips downwards.
        assert!(field.z > 0.0);
    }
}
