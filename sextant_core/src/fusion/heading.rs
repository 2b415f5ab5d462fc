// sextant_core/src/fusion/heading.rs

use nalgebra::Vector3;
use std::f64::consts::PI;

use super::leveling::Tilt;

/// Tilt-compensated magnetic heading (rad), or `None` when the field has no
/// usable horizontal component.
pub fn magnetic_heading(field: &Vector3<f64>, tilt: &Tilt) -> Option<f64> {
    let (sin_roll, cos_roll) = tilt.roll.sin_cos();
    let (sin_pitch, cos_pitch) = tilt.pitch.sin_cos();

    let east = -field.y * cos_roll + field.z * sin_roll;
    let north = field.x * cos_pitch + field.y * sin_roll * sin_pitch + field.z * cos_roll * sin_pitch;
    if east.hypot(north) <= f64::EPSILON * field.norm().max(f64::MIN_POSITIVE) {
        return None;
    }
    Some(east.atan2(north))
}

/// Heading with respect to true north, wrapped to `(-pi, pi]`.
pub fn true_heading(field: &Vector3<f64>, tilt: &Tilt, declination: f64) -> Option<f64> {
    magnetic_heading(field, tilt).map(|heading| wrap_to_pi(heading + declination))
}

pub fn wrap_to_pi(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::UnitQuaternion;

    fn body_field(roll: f64, pitch: f64, yaw: f64) -> Vector3<f64> {
        // 60 degrees of inclination, no declination.
        let field_ned = Vector3::new(0.5, 0.0, 0.866) * 4.5e-5;
        UnitQuaternion::from_euler_angles(roll, pitch, yaw).inverse() * field_ned
    }

    #[test]
    fn test_heading_of_level_body() {
        for yaw in [-2.5, -0.3, 0.0, 1.2, 3.0] {
            let heading = magnetic_heading(&body_field(0.0, 0.0, yaw), &Tilt::default()).unwrap();
            assert_abs_diff_eq!(heading, yaw, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_heading_is_tilt_compensated() {
        let tilt = Tilt {
            roll: 0.4,
            pitch: -0.3,
        };
        let heading = magnetic_heading(&body_field(0.4, -0.3, 0.9), &tilt).unwrap();
        assert_abs_diff_eq!(heading, 0.9, epsilon = 1e-9);
    }

    #[test]
    fn test_declination_is_added_and_wrapped() {
        let heading = true_heading(&body_field(0.0, 0.0, 3.0), &Tilt::default(), 0.3).unwrap();
        assert_abs_diff_eq!(heading, 3.3 - 2.0 * PI, epsilon = 1e-9);
    }

    #[test]
    fn test_vertical_field_has_no_heading() {
        assert!(magnetic_heading(&Vector3::new(0.0, 0.0, 5e-5), &Tilt::default()).is_none());
    }
}
