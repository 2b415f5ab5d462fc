// sextant_core/src/processors/attitude_sensor.rs

//! Processors trusting the platform's own attitude estimate.

use tracing::trace;

use super::{AbsolutePoseProcessor, AbsoluteTrack, RelativePoseProcessor, RelativeTrack};
use crate::config::{ConfigChange, FusionConfig};
use crate::frames::{EcefFrame, LocalFrame};
use crate::fusion::FusionState;
use crate::geodesy::{NedLocation, NedVelocity};
use crate::measurements::{Attitude, SpecificForce, SyncedMeasurement};
use crate::types::PoseTransformation;

/// Attitude, specific force and the presence of a gyroscope sample.
fn attitude_inputs(measurement: &SyncedMeasurement) -> Option<(&Attitude, &SpecificForce)> {
    match (
        measurement.attitude(),
        measurement.accelerometer(),
        measurement.gyroscope(),
    ) {
        (Some(attitude), Some(force), Some(_)) => Some((attitude, force)),
        _ => None,
    }
}

/// Absolute processor taking orientation from an attitude sensor.
#[derive(Debug, Clone)]
pub struct AttitudeSensorAbsolutePoseProcessor {
    track: AbsoluteTrack,
}

impl AttitudeSensorAbsolutePoseProcessor {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            track: AbsoluteTrack::new(config),
        }
    }
}

impl AbsolutePoseProcessor for AttitudeSensorAbsolutePoseProcessor {
    fn process(&mut self, measurement: &SyncedMeasurement) -> bool {
        if !self.track.history.accepts(measurement.timestamp) {
            trace!(timestamp = measurement.timestamp, "dropping out-of-order measurement");
            return false;
        }
        let Some((attitude, force)) = attitude_inputs(measurement) else {
            return false;
        };
        self.track
            .record(&attitude.orientation, &force.0, measurement.timestamp)
    }

    fn reset(&mut self) {
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
        // No magnetometer here, so the magnetic model does not apply.
        if !change.is_magnetic() {
            change.apply(&mut self.track.config);
        }
    }

    fn fusion_state(&self) -> FusionState {
        FusionState::Normal
    }
}

/// Relative processor taking orientation from an attitude sensor.
#[derive(Debug, Clone)]
pub struct AttitudeSensorRelativePoseProcessor {
    track: RelativeTrack,
}

impl AttitudeSensorRelativePoseProcessor {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            track: RelativeTrack::new(config),
        }
    }
}

impl RelativePoseProcessor for AttitudeSensorRelativePoseProcessor {
    fn process(&mut self, measurement: &SyncedMeasurement) -> bool {
        if !self.track.history.accepts(measurement.timestamp) {
            trace!(timestamp = measurement.timestamp, "dropping out-of-order measurement");
            return false;
        }
        let Some((attitude, force)) = attitude_inputs(measurement) else {
            return false;
        };
        self.track
            .record(&attitude.orientation, &force.0, measurement.timestamp)
    }

    fn reset(&mut self) {
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
        if !change.is_magnetic() {
            change.apply(&mut self.track.config);
        }
    }

    fn fusion_state(&self) -> FusionState {
        FusionState::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::STANDARD_GRAVITY;
    use crate::measurements::AngularRate;
    use crate::magnetic::MagneticModel;
    use approx::assert_abs_diff_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    const STEP: i64 = 20_000_000;

    fn measurement(attitude: UnitQuaternion<f64>, force: Vector3<f64>, timestamp: i64) -> SyncedMeasurement {
        SyncedMeasurement::new(timestamp)
            .with_attitude(Attitude::new(attitude))
            .with_accelerometer(SpecificForce(force))
            .with_gyroscope(AngularRate::default())
    }

    #[test]
    fn test_absolute_frames_follow_attitude_sensor() {
        let attitude = UnitQuaternion::from_euler_angles(0.0, 0.0, -1.1);
        let location = NedLocation::from_degrees(-33.9, 151.2, 10.0);
        let mut processor = AttitudeSensorAbsolutePoseProcessor::new(FusionConfig::default());
        processor.set_initial_location(location);

        let force = attitude.inverse() * -crate::geodesy::gravity_ned(&location);
        assert!(!processor.process(&measurement(attitude, force, 0)));
        assert!(processor.process(&measurement(attitude, force, STEP)));
        assert_abs_diff_eq!(
            processor.current_frame().unwrap().ned_attitude().angle_to(&attitude),
            0.0,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(processor.initial_location().latitude, location.latitude);
    }

    #[test]
    fn test_missing_gyroscope_is_incomplete() {
        let mut processor = AttitudeSensorAbsolutePoseProcessor::new(FusionConfig::default());
        let mut sample = measurement(UnitQuaternion::identity(), Vector3::new(0.0, 0.0, -9.8), 0);
        sample.gyroscope = None;
        assert!(!processor.process(&sample));
        assert!(processor.initial_frame().is_none());
    }

    #[test]
    fn test_magnetic_changes_are_ignored() {
        let mut processor = AttitudeSensorAbsolutePoseProcessor::new(FusionConfig::default());
        processor.configure(&ConfigChange::MagneticModel(Some(MagneticModel::default())));
        processor.configure(&ConfigChange::UseLeveledRelativeAttitudeRespectStart(true));
        assert!(processor.config().magnetic_model.is_none());
        assert!(processor.config().use_leveled_relative_attitude_respect_start);
    }

    #[test]
    fn test_relative_respect_start_removes_heading() {
        let config = FusionConfig {
            use_leveled_relative_attitude_respect_start: true,
            adjust_gravity_norm: false,
            ..FusionConfig::default()
        };
        let mut processor = AttitudeSensorRelativePoseProcessor::new(config);
        let start = UnitQuaternion::from_euler_angles(0.0, 0.0, 2.0);
        let turned = UnitQuaternion::from_euler_angles(0.0, 0.0, 2.5);
        let force = Vector3::new(0.0, 0.0, -STANDARD_GRAVITY);

        processor.process(&measurement(start, force, 0));
        assert_abs_diff_eq!(processor.initial_frame().unwrap().orientation.angle(), 0.0, epsilon = 1e-9);

        assert!(processor.process(&measurement(turned, force, STEP)));
        let transformation = processor.pose_transformation().unwrap();
        assert_abs_diff_eq!(transformation.rotation.euler_angles().2, 0.5, epsilon = 1e-9);
        assert!(processor.location().is_none());
    }
}
