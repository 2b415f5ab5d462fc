// sextant_core/src/processors/fused.rs

use nalgebra::Vector3;
use tracing::trace;

use super::{AbsolutePoseProcessor, AbsoluteTrack};
use crate::config::{ConfigChange, FusionConfig};
use crate::frames::EcefFrame;
use crate::fusion::attitude::AbsoluteAttitudeEstimator;
use crate::fusion::leveling::LevelingSource;
use crate::fusion::FusionState;
use crate::geodesy::{NedLocation, NedVelocity};
use crate::measurements::SyncedMeasurement;
use crate::types::PoseTransformation;

/// Absolute processor fusing leveling, gyroscope and magnetometer.
///
/// Covers four of the absolute variants: gravity or accelerometer leveling,
/// each with a single or double fusion stage.
#[derive(Debug, Clone)]
pub struct FusedAbsolutePoseProcessor {
    leveling: LevelingSource,
    estimator: AbsoluteAttitudeEstimator,
    track: AbsoluteTrack,
}

impl FusedAbsolutePoseProcessor {
    pub fn new(leveling: LevelingSource, double_fused: bool, config: FusionConfig) -> Self {
        let estimator = if double_fused {
            AbsoluteAttitudeEstimator::double()
        } else {
            AbsoluteAttitudeEstimator::single()
        };
        Self {
            leveling,
            estimator,
            track: AbsoluteTrack::new(config),
        }
    }

    pub fn leveling_source(&self) -> LevelingSource {
        self.leveling
    }

    pub fn is_double_fused(&self) -> bool {
        self.estimator.is_double()
    }

    fn leveling_force(&self, measurement: &SyncedMeasurement) -> Option<Vector3<f64>> {
        match self.leveling {
            LevelingSource::Gravity => measurement.gravity().map(|gravity| gravity.0),
            LevelingSource::Accelerometer => measurement.accelerometer().map(|force| force.0),
        }
    }
}

impl AbsolutePoseProcessor for FusedAbsolutePoseProcessor {
    fn process(&mut self, measurement: &SyncedMeasurement) -> bool {
        let timestamp = measurement.timestamp;
        if !self.track.history.accepts(timestamp) {
            trace!(timestamp, "dropping out-of-order measurement");
            return false;
        }
        let (Some(force), Some(rate), Some(field), Some(leveling_force)) = (
            measurement.accelerometer(),
            measurement.gyroscope(),
            measurement.magnetometer(),
            self.leveling_force(measurement),
        ) else {
            return false;
        };

        let dt = self.track.elapsed(timestamp);
        let location = self.track.location();
        let Some(attitude) = self.estimator.update(
            &leveling_force,
            &rate.0,
            &field.0,
            dt,
            &location,
            &self.track.config,
        ) else {
            return false;
        };

        self.track.record(&attitude, &force.0, timestamp)
    }

    fn reset(&mut self) {
        self.estimator.reset();
        self.track.reset();
    }

    fn initial_frame(&self) -> Option<&EcefFrame> {
        self.track.history.initial()
    }

    fn previous_frame(&self) -> Option<&EcefFrame> {
        self.track.history.previous()
    }

    fn current_frame(&self) -> Option<&EcefFrame> {
        self.track.history.current()
    }

    fn pose_transformation(&mut self) -> Option<PoseTransformation> {
        self.track.history.transformation()
    }

    fn initial_location(&self) -> &NedLocation {
        &self.track.initial_location
    }

    fn set_initial_location(&mut self, location: NedLocation) {
        self.track.initial_location = location;
    }

    fn initial_velocity(&self) -> &NedVelocity {
        &self.track.initial_velocity
    }

    fn set_initial_velocity(&mut self, velocity: NedVelocity) {
        self.track.initial_velocity = velocity;
    }

    fn config(&self) -> &FusionConfig {
        &self.track.config
    }

    fn configure(&mut self, change: &ConfigChange) {
        change.apply(&mut self.track.config);
    }

    fn fusion_state(&self) -> FusionState {
        self.estimator.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::gravity_ned;
    use crate::measurements::{AngularRate, GravityVector, MagneticField, SpecificForce};
    use approx::assert_abs_diff_eq;
    use nalgebra::UnitQuaternion;

    const STEP: i64 = 10_000_000;

    fn location() -> NedLocation {
        NedLocation::from_degrees(35.68, 139.69, 40.0)
    }

    fn static_measurement(attitude: &UnitQuaternion<f64>, timestamp: i64) -> SyncedMeasurement {
        let force = attitude.inverse() * -gravity_ned(&location());
        let field = attitude.inverse() * Vector3::new(3.0e-5, 0.0, 3.5e-5);
        SyncedMeasurement::new(timestamp)
            .with_accelerometer(SpecificForce(force))
            .with_gravity(GravityVector(force))
            .with_gyroscope(AngularRate::default())
            .with_magnetometer(MagneticField(field))
    }

    fn fused_processor(leveling: LevelingSource, double_fused: bool) -> FusedAbsolutePoseProcessor {
        let mut processor = FusedAbsolutePoseProcessor::new(leveling, double_fused, FusionConfig::default());
        processor.set_initial_location(location());
        processor
    }

    #[test]
    fn test_first_sample_starts_session_without_pose() {
        let mut processor = fused_processor(LevelingSource::Gravity, false);
        assert!(!processor.process(&static_measurement(&UnitQuaternion::identity(), 0)));
        assert!(processor.initial_frame().is_some());
        assert!(processor.previous_frame().is_none());
        assert!(processor.process(&static_measurement(&UnitQuaternion::identity(), STEP)));
        assert_eq!(processor.previous_frame(), processor.initial_frame());
    }

    #[test]
    fn test_incomplete_measurement_is_rejected() {
        let mut processor = fused_processor(LevelingSource::Gravity, false);
        let mut measurement = static_measurement(&UnitQuaternion::identity(), 0);
        measurement.gravity = None;
        assert!(!processor.process(&measurement));
        assert!(processor.initial_frame().is_none());

        // The accelerometer variant has no use for the gravity sample.
        let mut processor = processor_with_accelerometer();
        assert!(!processor.process(&measurement));
        assert!(processor.initial_frame().is_some());
    }

    fn processor_with_accelerometer() -> FusedAbsolutePoseProcessor {
        fused_processor(LevelingSource::Accelerometer, true)
    }

    #[test]
    fn test_stationary_body_holds_pose() {
        for (leveling, double_fused) in [
            (LevelingSource::Gravity, false),
            (LevelingSource::Accelerometer, false),
            (LevelingSource::Gravity, true),
            (LevelingSource::Accelerometer, true),
        ] {
            let attitude = UnitQuaternion::from_euler_angles(0.02, -0.05, 0.9);
            let mut processor = fused_processor(leveling, double_fused);
            for step in 0..200 {
                processor.process(&static_measurement(&attitude, step * STEP));
            }

            let current = processor.current_frame().unwrap();
            assert_abs_diff_eq!(current.ned_attitude().angle_to(&attitude), 0.0, epsilon = 1e-5);
            let transformation = processor.pose_transformation().unwrap();
            assert_abs_diff_eq!(transformation.translation.vector.norm(), 0.0, epsilon = 1e-2);
            assert_eq!(processor.fusion_state(), FusionState::Normal);
        }
    }

    #[test]
    fn test_reset_clears_frames() {
        let mut processor = fused_processor(LevelingSource::Gravity, true);
        processor.process(&static_measurement(&UnitQuaternion::identity(), 0));
        processor.process(&static_measurement(&UnitQuaternion::identity(), STEP));
        processor.reset();
        assert!(processor.initial_frame().is_none());
        assert!(processor.current_frame().is_none());
        assert!(processor.pose_transformation().is_none());
    }

    #[test]
    fn test_stale_measurement_is_dropped() {
        let mut processor = fused_processor(LevelingSource::Gravity, false);
        processor.process(&static_measurement(&UnitQuaternion::identity(), 5 * STEP));
        assert!(!processor.process(&static_measurement(&UnitQuaternion::identity(), 5 * STEP)));
        assert!(!processor.process(&static_measurement(&UnitQuaternion::identity(), STEP)));
        assert_eq!(processor.current_frame().unwrap().timestamp, 5 * STEP);
    }

    #[test]
    fn test_configure_updates_config() {
        let mut processor = fused_processor(LevelingSource::Gravity, false);
        processor.configure(&ConfigChange::AdjustGravityNorm(false));
        processor.configure(&ConfigChange::MagneticModelYear(Some(2024.5)));
        assert!(!processor.config().adjust_gravity_norm);
        assert_eq!(processor.config().magnetic_model_year, Some(2024.5));
    }
}
