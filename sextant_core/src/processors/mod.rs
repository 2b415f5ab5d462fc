// sextant_core/src/processors/mod.rs

//! Pose processors: one attitude strategy plus translational mechanization
//! behind a uniform `process`/`reset`/frame-query contract.

pub mod attitude_sensor;
pub mod fused;
pub mod leveled;
pub mod mechanization;

use nalgebra::{UnitQuaternion, Vector3};
use tracing::debug;

use crate::config::{ConfigChange, FusionConfig};
use crate::frames::{EcefFrame, LocalFrame, PoseFrame};
use crate::fusion::attitude::StartHeading;
use crate::fusion::FusionState;
use crate::geodesy::{
    gravity_ned, ned_to_ecef_rotation, normal_gravity, NedLocation, NedVelocity, STANDARD_GRAVITY,
};
use crate::measurements::SyncedMeasurement;
use crate::types::{elapsed_seconds, PoseTransformation, Timestamp};
use mechanization::{ecef_step, local_step, GravityNormAdjuster};

pub use attitude_sensor::{AttitudeSensorAbsolutePoseProcessor, AttitudeSensorRelativePoseProcessor};
pub use fused::FusedAbsolutePoseProcessor;
pub use leveled::LeveledRelativePoseProcessor;

/// A processor producing poses anchored to the Earth (ECEF frames).
pub trait AbsolutePoseProcessor: Send {
    /// Consumes one synchronized measurement. Returns `true` only when a new
    /// `current` frame was produced and a `previous` one exists.
    fn process(&mut self, measurement: &SyncedMeasurement) -> bool;

    /// Clears every frame and all fusion state for a new tracking session.
    fn reset(&mut self);

    fn initial_frame(&self) -> Option<&EcefFrame>;
    fn previous_frame(&self) -> Option<&EcefFrame>;
    fn current_frame(&self) -> Option<&EcefFrame>;

    /// Transform from `initial` to `current`, computed on first request after
    /// each update.
    fn pose_transformation(&mut self) -> Option<PoseTransformation>;

    fn initial_location(&self) -> &NedLocation;
    fn set_initial_location(&mut self, location: NedLocation);
    fn initial_velocity(&self) -> &NedVelocity;
    fn set_initial_velocity(&mut self, velocity: NedVelocity);

    fn config(&self) -> &FusionConfig;

    /// Applies a configuration change if the processor declares that field.
    fn configure(&mut self, change: &ConfigChange);

    fn fusion_state(&self) -> FusionState;
}

/// A processor producing poses relative to the start of tracking.
pub trait RelativePoseProcessor: Send {
    fn process(&mut self, measurement: &SyncedMeasurement) -> bool;
    fn reset(&mut self);

    fn initial_frame(&self) -> Option<&LocalFrame>;
    fn previous_frame(&self) -> Option<&LocalFrame>;
    fn current_frame(&self) -> Option<&LocalFrame>;

    fn pose_transformation(&mut self) -> Option<PoseTransformation>;

    /// Optional location refining the gravity model.
    fn location(&self) -> Option<&NedLocation>;
    fn set_location(&mut self, location: Option<NedLocation>);

    fn config(&self) -> &FusionConfig;
    fn configure(&mut self, change: &ConfigChange);
    fn fusion_state(&self) -> FusionState;
}

/// The `initial`/`previous`/`current` frame triple of a tracking session,
/// with the lazily computed transformation between `initial` and `current`.
#[derive(Debug, Clone)]
pub struct FrameHistory<F> {
    initial: Option<F>,
    previous: Option<F>,
    current: Option<F>,
    transformation: Option<PoseTransformation>,
}

impl<F> Default for FrameHistory<F> {
    fn default() -> Self {
        Self {
            initial: None,
            previous: None,
            current: None,
            transformation: None,
        }
    }
}

impl<F: PoseFrame> FrameHistory<F> {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_started(&self) -> bool {
        self.initial.is_some()
    }

    /// Opens a session: the frame becomes both `initial` and `current`.
    pub fn start(&mut self, frame: F) {
        self.initial = Some(frame);
        self.previous = None;
        self.current = Some(frame);
        self.transformation = None;
    }

    /// Shifts `current` into `previous` and stores the new frame.
    pub fn advance(&mut self, frame: F) {
        self.previous = self.current.replace(frame);
        self.transformation = None;
    }

    pub fn initial(&self) -> Option<&F> {
        self.initial.as_ref()
    }

    pub fn previous(&self) -> Option<&F> {
        self.previous.as_ref()
    }

    pub fn current(&self) -> Option<&F> {
        self.current.as_ref()
    }

    /// Whether a measurement at `timestamp` would move the session forward.
    pub fn accepts(&self, timestamp: Timestamp) -> bool {
        self.current
            .as_ref()
            .map_or(true, |current| timestamp > current.timestamp())
    }

    pub fn transformation(&mut self) -> Option<PoseTransformation> {
        if self.transformation.is_none() {
            if let (Some(initial), Some(current)) = (&self.initial, &self.current) {
                self.transformation = Some(current.transformation_from(initial));
            }
        }
        self.transformation
    }
}

/// Session state shared by every absolute processor: the frame history and
/// the steps applied after the attitude strategy has produced an attitude.
#[derive(Debug, Clone)]
pub struct AbsoluteTrack {
    pub config: FusionConfig,
    pub initial_location: NedLocation,
    pub initial_velocity: NedVelocity,
    pub history: FrameHistory<EcefFrame>,
    gravity_norm: GravityNormAdjuster,
    start_heading: StartHeading,
}

impl AbsoluteTrack {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            initial_location: NedLocation::default(),
            initial_velocity: NedVelocity::default(),
            history: FrameHistory::default(),
            gravity_norm: GravityNormAdjuster::default(),
            start_heading: StartHeading::default(),
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.gravity_norm.reset();
        self.start_heading.reset();
    }

    /// Where the body currently is: the latest frame, or the initial location
    /// before the session has started.
    pub fn location(&self) -> NedLocation {
        self.history
            .current()
            .map_or(self.initial_location, EcefFrame::location)
    }

    /// Seconds since the latest frame, zero before the session has started.
    pub fn elapsed(&self, timestamp: Timestamp) -> f64 {
        self.history
            .current()
            .map_or(0.0, |current| elapsed_seconds(current.timestamp, timestamp))
    }

    /// Records a body-to-NED attitude and the specific force measured with it.
    /// Returns `true` when a new frame follows an existing one.
    pub fn record(&mut self, attitude: &UnitQuaternion<f64>, force: &Vector3<f64>, timestamp: Timestamp) -> bool {
        let attitude = self
            .start_heading
            .apply(attitude, self.config.use_leveled_relative_attitude_respect_start);
        let location = self.location();
        let force = if self.config.adjust_gravity_norm {
            self.gravity_norm
                .adjust(force, normal_gravity(location.latitude, location.height))
        } else {
            *force
        };

        match self.history.current().copied() {
            Some(previous) => {
                let orientation = ned_to_ecef_rotation(location.latitude, location.longitude) * attitude;
                self.history
                    .advance(ecef_step(&previous, orientation, &force, timestamp));
                true
            }
            None => {
                let frame = EcefFrame::from_ned(
                    &self.initial_location,
                    &self.initial_velocity,
                    &attitude,
                    timestamp,
                );
                self.history.start(frame);
                debug!(timestamp, "absolute pose session started");
                false
            }
        }
    }
}

/// Session state shared by every relative processor.
#[derive(Debug, Clone)]
pub struct RelativeTrack {
    pub config: FusionConfig,
    pub location: Option<NedLocation>,
    pub history: FrameHistory<LocalFrame>,
    gravity_norm: GravityNormAdjuster,
    start_heading: StartHeading,
}

impl RelativeTrack {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            location: None,
            history: FrameHistory::default(),
            gravity_norm: GravityNormAdjuster::default(),
            start_heading: StartHeading::default(),
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.gravity_norm.reset();
        self.start_heading.reset();
    }

    pub fn gravity_ned(&self) -> Option<Vector3<f64>> {
        self.location.as_ref().map(gravity_ned)
    }

    /// Modelled gravity magnitude, standard gravity without a location.
    pub fn gravity(&self) -> f64 {
        self.location
            .as_ref()
            .map_or(STANDARD_GRAVITY, |location| normal_gravity(location.latitude, location.height))
    }

    pub fn elapsed(&self, timestamp: Timestamp) -> f64 {
        self.history
            .current()
            .map_or(0.0, |current| elapsed_seconds(current.timestamp, timestamp))
    }

    pub fn record(&mut self, attitude: &UnitQuaternion<f64>, force: &Vector3<f64>, timestamp: Timestamp) -> bool {
        let attitude = self
            .start_heading
            .apply(attitude, self.config.use_leveled_relative_attitude_respect_start);
        let gravity = self.gravity();
        let force = if self.config.adjust_gravity_norm {
            self.gravity_norm.adjust(force, gravity)
        } else {
            *force
        };

        match self.history.current().copied() {
            Some(previous) => {
                self.history
                    .advance(local_step(&previous, attitude, &force, gravity, timestamp));
                true
            }
            None => {
                self.history
                    .start(LocalFrame::at_origin(attitude, Vector3::zeros(), timestamp));
                debug!(timestamp, "relative pose session started");
                false
            }
        }
    }
}
