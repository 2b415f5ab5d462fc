// sextant_core/src/processors/leveled.rs

use nalgebra::Vector3;
use tracing::trace;

use super::{RelativePoseProcessor, RelativeTrack};
use crate::config::{ConfigChange, FusionConfig};
use crate::frames::LocalFrame;
use crate::fusion::attitude::LeveledAttitudeEstimator;
use crate::fusion::leveling::LevelingSource;
use crate::fusion::FusionState;
use crate::geodesy::NedLocation;
use crate::measurements::SyncedMeasurement;
use crate::types::PoseTransformation;

/// Relative processor fusing gyroscope propagation with leveling only.
/// Heading is measured from the body heading at the first sample.
#[derive(Debug, Clone)]
pub struct LeveledRelativePoseProcessor {
    leveling: LevelingSource,
    estimator: LeveledAttitudeEstimator,
    track: RelativeTrack,
}

impl LeveledRelativePoseProcessor {
    pub fn new(leveling: LevelingSource, config: FusionConfig) -> Self {
        Self {
            leveling,
            estimator: LeveledAttitudeEstimator::new(),
            track: RelativeTrack::new(config),
        }
    }

    pub fn leveling_source(&self) -> LevelingSource {
        self.leveling
    }

    fn leveling_force(&self, measurement: &SyncedMeasurement) -> Option<Vector3<f64>> {
        match self.leveling {
            LevelingSource::Gravity => measurement.gravity().map(|gravity| gravity.0),
            LevelingSource::Accelerometer => measurement.accelerometer().map(|force| force.0),
        }
    }
}

impl RelativePoseProcessor for LeveledRelativePoseProcessor {
    fn process(&mut self, measurement: &SyncedMeasurement) -> bool {
        let timestamp = measurement.timestamp;
        if !self.track.history.accepts(timestamp) {
            trace!(timestamp, "dropping out-of-order measurement");
            return false;
        }
        let (Some(force), Some(rate), Some(leveling_force)) = (
            measurement.accelerometer(),
            measurement.gyroscope(),
            self.leveling_force(measurement),
        ) else {
            return false;
        };

        let dt = self.track.elapsed(timestamp);
        let gravity = self.track.gravity_ned();
        let Some(attitude) = self.estimator.update(
            &leveling_force,
            &rate.0,
            dt,
            gravity.as_ref(),
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

    fn initial_frame(&self) -> Option<&LocalFrame> {
        self.track.history.initial()
    }

    fn previous_frame(&self) -> Option<&LocalFrame> {
        self.track.history.previous()
    }

    fn current_frame(&self) -> Option<&LocalFrame> {
        self.track.history.current()
    }

    fn pose_transformation(&mut self) -> Option<PoseTransformation> {
        self.track.history.transformation()
    }

    fn location(&self) -> Option<&NedLocation> {
        self.track.location.as_ref()
    }

    fn set_location(&mut self, location: Option<NedLocation>) {
        self.track.location = location;
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
    use crate::geodesy::STANDARD_GRAVITY;
    use crate::measurements::{AngularRate, GravityVector, SpecificForce};
    use approx::assert_abs_diff_eq;

    const STEP: i64 = 10_000_000;

    fn measurement(force: Vector3<f64>, rate: Vector3<f64>, timestamp: i64) -> SyncedMeasurement {
        SyncedMeasurement::new(timestamp)
            .with_accelerometer(SpecificForce(force))
            .with_gravity(GravityVector(Vector3::new(0.0, 0.0, -STANDARD_GRAVITY)))
            .with_gyroscope(AngularRate(rate))
    }

    #[test]
    fn test_turning_in_place_rotates_without_translating() {
        for leveling in [LevelingSource::Gravity, LevelingSource::Accelerometer] {
            let mut processor = LeveledRelativePoseProcessor::new(leveling, FusionConfig::default());
            assert_eq!(processor.leveling_source(), leveling);
            let force = Vector3::new(0.0, 0.0, -STANDARD_GRAVITY);
            let rate = Vector3::new(0.0, 0.0, 0.3);

            assert!(!processor.process(&measurement(force, rate, 0)));
            for step in 1..=100 {
                assert!(processor.process(&measurement(force, rate, step * STEP)));
            }

            let transformation = processor.pose_transformation().unwrap();
            assert_abs_diff_eq!(transformation.rotation.euler_angles().2, 0.3, epsilon = 1e-6);
            assert_abs_diff_eq!(transformation.translation.vector.norm(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_forward_acceleration_moves_forward() {
        let config = FusionConfig {
            adjust_gravity_norm: false,
            ..FusionConfig::default()
        };
        let mut processor = LeveledRelativePoseProcessor::new(LevelingSource::Gravity, config);
        let force = Vector3::new(0.5, 0.0, -STANDARD_GRAVITY);

        for step in 0..=100 {
            processor.process(&measurement(force, Vector3::zeros(), step * STEP));
        }
        let current = processor.current_frame().unwrap();
        assert_abs_diff_eq!(current.velocity.x, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(current.position.x, 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_location_refines_gravity() {
        let mut processor = LeveledRelativePoseProcessor::new(LevelingSource::Gravity, FusionConfig::default());
        let location = NedLocation::from_degrees(60.0, 25.0, 0.0);
        processor.set_location(Some(location));
        assert_eq!(processor.location(), Some(&location));
        processor.configure(&ConfigChange::UseAccurateLeveling(false));
        assert!(!processor.config().use_accurate_leveling);
    }
}
