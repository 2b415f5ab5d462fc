// sextant_core/src/estimation/absolute.rs

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::{AccuracyChangedListener, BufferFilledListener};
use crate::config::{ConfigChange, FusionConfig, InterpolationMode};
use crate::error::{PoseError, Result};
use crate::frames::EcefFrame;
use crate::fusion::leveling::LevelingSource;
use crate::geodesy::{NedLocation, NedVelocity};
use crate::magnetic::MagneticModel;
use crate::measurements::SyncedMeasurement;
use crate::processors::{
    AbsolutePoseProcessor, AttitudeSensorAbsolutePoseProcessor, FusedAbsolutePoseProcessor,
};
use crate::source::{SourceEvent, SourceKind, SourceSet};
use crate::types::{PoseTransformation, Timestamp};

/// Receives `(estimator, current, previous, initial, timestamp, transformation)`
/// for every new absolute pose. The transformation is only present when the
/// estimator was asked to estimate it.
pub type AbsolutePoseListener = Box<
    dyn FnMut(
            &AbsolutePoseEstimator,
            &EcefFrame,
            &EcefFrame,
            &EcefFrame,
            Timestamp,
            Option<&PoseTransformation>,
        ) + Send,
>;

/// The five absolute processing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbsoluteVariant {
    AttitudeSensor,
    Fused,
    AccelerometerFused,
    DoubleFused,
    AccelerometerDoubleFused,
}

impl AbsoluteVariant {
    pub const ALL: [AbsoluteVariant; 5] = [
        AbsoluteVariant::AttitudeSensor,
        AbsoluteVariant::Fused,
        AbsoluteVariant::AccelerometerFused,
        AbsoluteVariant::DoubleFused,
        AbsoluteVariant::AccelerometerDoubleFused,
    ];

    /// The attitude sensor flag wins, then the double flag picks the family
    /// and the accelerometer flag picks the leveling source within it.
    pub fn select(use_attitude_sensor: bool, use_double_fused: bool, use_accelerometer: bool) -> Self {
        match (use_attitude_sensor, use_double_fused, use_accelerometer) {
            (true, _, _) => Self::AttitudeSensor,
            (false, true, true) => Self::AccelerometerDoubleFused,
            (false, true, false) => Self::DoubleFused,
            (false, false, true) => Self::AccelerometerFused,
            (false, false, false) => Self::Fused,
        }
    }

    pub fn source_kind(self) -> SourceKind {
        match self {
            Self::AttitudeSensor => SourceKind::Attitude,
            Self::Fused | Self::DoubleFused => SourceKind::Gravity,
            Self::AccelerometerFused | Self::AccelerometerDoubleFused => SourceKind::Accelerometer,
        }
    }

    pub fn reads_magnetometer(self) -> bool {
        self != Self::AttitudeSensor
    }
}

/// Every absolute processor, one per [`AbsoluteVariant`].
pub struct AbsoluteProcessorBank {
    pub attitude_sensor: Box<dyn AbsolutePoseProcessor>,
    pub fused: Box<dyn AbsolutePoseProcessor>,
    pub accelerometer_fused: Box<dyn AbsolutePoseProcessor>,
    pub double_fused: Box<dyn AbsolutePoseProcessor>,
    pub accelerometer_double_fused: Box<dyn AbsolutePoseProcessor>,
}

impl AbsoluteProcessorBank {
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            attitude_sensor: Box::new(AttitudeSensorAbsolutePoseProcessor::new(config.clone())),
            fused: Box::new(FusedAbsolutePoseProcessor::new(
                LevelingSource::Gravity,
                false,
                config.clone(),
            )),
            accelerometer_fused: Box::new(FusedAbsolutePoseProcessor::new(
                LevelingSource::Accelerometer,
                false,
                config.clone(),
            )),
            double_fused: Box::new(FusedAbsolutePoseProcessor::new(
                LevelingSource::Gravity,
                true,
                config.clone(),
            )),
            accelerometer_double_fused: Box::new(FusedAbsolutePoseProcessor::new(
                LevelingSource::Accelerometer,
                true,
                config.clone(),
            )),
        }
    }

    pub fn get(&self, variant: AbsoluteVariant) -> &dyn AbsolutePoseProcessor {
        match variant {
            AbsoluteVariant::AttitudeSensor => self.attitude_sensor.as_ref(),
            AbsoluteVariant::Fused => self.fused.as_ref(),
            AbsoluteVariant::AccelerometerFused => self.accelerometer_fused.as_ref(),
            AbsoluteVariant::DoubleFused => self.double_fused.as_ref(),
            AbsoluteVariant::AccelerometerDoubleFused => self.accelerometer_double_fused.as_ref(),
        }
    }

    pub fn get_mut(&mut self, variant: AbsoluteVariant) -> &mut dyn AbsolutePoseProcessor {
        match variant {
            AbsoluteVariant::AttitudeSensor => self.attitude_sensor.as_mut(),
            AbsoluteVariant::Fused => self.fused.as_mut(),
            AbsoluteVariant::AccelerometerFused => self.accelerometer_fused.as_mut(),
            AbsoluteVariant::DoubleFused => self.double_fused.as_mut(),
            AbsoluteVariant::AccelerometerDoubleFused => self.accelerometer_double_fused.as_mut(),
        }
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(AbsoluteVariant, &mut dyn AbsolutePoseProcessor)) {
        f(AbsoluteVariant::AttitudeSensor, self.attitude_sensor.as_mut());
        f(AbsoluteVariant::Fused, self.fused.as_mut());
        f(AbsoluteVariant::AccelerometerFused, self.accelerometer_fused.as_mut());
        f(AbsoluteVariant::DoubleFused, self.double_fused.as_mut());
        f(
            AbsoluteVariant::AccelerometerDoubleFused,
            self.accelerometer_double_fused.as_mut(),
        );
    }
}

/// Construction parameters of an [`AbsolutePoseEstimator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AbsolutePoseEstimatorConfig {
    pub use_attitude_sensor: bool,
    pub use_double_fused_attitude_processor: bool,
    pub use_accelerometer_for_attitude_estimation: bool,
    /// Whether listeners receive the initial-to-current transformation.
    pub estimate_pose_transformation: bool,
    pub initial_location: NedLocation,
    pub initial_velocity: NedVelocity,
    pub fusion: FusionConfig,
}

impl Default for AbsolutePoseEstimatorConfig {
    fn default() -> Self {
        Self {
            use_attitude_sensor: true,
            use_double_fused_attitude_processor: true,
            use_accelerometer_for_attitude_estimation: false,
            estimate_pose_transformation: false,
            initial_location: NedLocation::default(),
            initial_velocity: NedVelocity::default(),
            fusion: FusionConfig::default(),
        }
    }
}

impl AbsolutePoseEstimatorConfig {
    pub fn variant(&self) -> AbsoluteVariant {
        AbsoluteVariant::select(
            self.use_attitude_sensor,
            self.use_double_fused_attitude_processor,
            self.use_accelerometer_for_attitude_estimation,
        )
    }
}

/// Estimates poses anchored to the Earth from one of five processors, chosen
/// once at construction.
///
/// Configuration changes reach every processor; location, velocity, resets
/// and measurements only reach the active one.
pub struct AbsolutePoseEstimator {
    config: AbsolutePoseEstimatorConfig,
    variant: AbsoluteVariant,
    processors: AbsoluteProcessorBank,
    sources: SourceSet,
    running: bool,
    pose_listener: Option<AbsolutePoseListener>,
    accuracy_changed_listener: Option<AccuracyChangedListener<AbsolutePoseEstimator>>,
    buffer_filled_listener: Option<BufferFilledListener<AbsolutePoseEstimator>>,
}

impl AbsolutePoseEstimator {
    pub fn new(config: AbsolutePoseEstimatorConfig, sources: SourceSet) -> Result<Self> {
        let processors = AbsoluteProcessorBank::new(&config.fusion);
        Self::with_processors(config, processors, sources)
    }

    /// Builds an estimator around an existing processor bank.
    pub fn with_processors(
        config: AbsolutePoseEstimatorConfig,
        processors: AbsoluteProcessorBank,
        sources: SourceSet,
    ) -> Result<Self> {
        config.fusion.validate()?;
        let variant = config.variant();
        let mut estimator = Self {
            config,
            variant,
            processors,
            sources,
            running: false,
            pose_listener: None,
            accuracy_changed_listener: None,
            buffer_filled_listener: None,
        };

        let active = estimator.processors.get_mut(variant);
        active.set_initial_location(estimator.config.initial_location);
        active.set_initial_velocity(estimator.config.initial_velocity);
        debug!(?variant, "absolute pose estimator created");
        Ok(estimator)
    }

    // --- Lifecycle ---

    /// Resets the active processor and starts its source. Returns whether the
    /// source started; the estimator only counts as running if it did.
    pub fn start(&mut self, timestamp: Timestamp) -> Result<bool> {
        if self.running {
            return Err(PoseError::AlreadyRunning);
        }

        self.processors.get_mut(self.variant).reset();
        let kind = self.variant.source_kind();
        let started = self.sources.get_mut(kind).start(timestamp);
        if started {
            self.running = true;
            info!(variant = ?self.variant, timestamp, "absolute pose estimation started");
        } else {
            warn!(source = ?kind, timestamp, "measurement source failed to start");
        }
        Ok(started)
    }

    /// Stops every source, whether or not it was started.
    pub fn stop(&mut self) {
        self.sources.stop_all();
        if self.running {
            info!(variant = ?self.variant, "absolute pose estimation stopped");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // --- Events ---

    pub fn handle_event(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::Measurement {
                source,
                measurement,
            } => {
                if !self.running || source != self.variant.source_kind() {
                    trace!(?source, running = self.running, "ignoring measurement");
                    return;
                }
                self.on_measurement(&measurement);
            }
            SourceEvent::AccuracyChanged {
                sensor, accuracy, ..
            } => {
                if let Some(mut listener) = self.accuracy_changed_listener.take() {
                    listener(self, sensor.into(), accuracy.into());
                    self.accuracy_changed_listener = Some(listener);
                }
            }
            SourceEvent::BufferFilled { sensor, .. } => {
                if let Some(mut listener) = self.buffer_filled_listener.take() {
                    listener(self, sensor.into());
                    self.buffer_filled_listener = Some(listener);
                }
            }
        }
    }

    fn on_measurement(&mut self, measurement: &SyncedMeasurement) {
        let processor = self.processors.get_mut(self.variant);
        if !processor.process(measurement) {
            return;
        }

        let transformation = if self.config.estimate_pose_transformation {
            processor.pose_transformation()
        } else {
            None
        };

        let Some(mut listener) = self.pose_listener.take() else {
            return;
        };
        let processor = self.processors.get(self.variant);
        if let (Some(current), Some(previous), Some(initial)) = (
            processor.current_frame(),
            processor.previous_frame(),
            processor.initial_frame(),
        ) {
            listener(
                self,
                current,
                previous,
                initial,
                measurement.timestamp,
                transformation.as_ref(),
            );
        }
        self.pose_listener = Some(listener);
    }

    pub fn set_pose_listener(&mut self, listener: Option<AbsolutePoseListener>) {
        self.pose_listener = listener;
    }

    pub fn set_accuracy_changed_listener(
        &mut self,
        listener: Option<AccuracyChangedListener<AbsolutePoseEstimator>>,
    ) {
        self.accuracy_changed_listener = listener;
    }

    pub fn set_buffer_filled_listener(&mut self, listener: Option<BufferFilledListener<AbsolutePoseEstimator>>) {
        self.buffer_filled_listener = listener;
    }

    // --- Accessors ---

    pub fn variant(&self) -> AbsoluteVariant {
        self.variant
    }

    pub fn config(&self) -> &AbsolutePoseEstimatorConfig {
        &self.config
    }

    pub fn fusion_config(&self) -> &FusionConfig {
        &self.config.fusion
    }

    pub fn processor(&self, variant: AbsoluteVariant) -> &dyn AbsolutePoseProcessor {
        self.processors.get(variant)
    }

    pub fn active_processor(&self) -> &dyn AbsolutePoseProcessor {
        self.processors.get(self.variant)
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn estimate_pose_transformation(&self) -> bool {
        self.config.estimate_pose_transformation
    }

    pub fn set_estimate_pose_transformation(&mut self, estimate: bool) {
        self.config.estimate_pose_transformation = estimate;
    }

    pub fn initial_location(&self) -> &NedLocation {
        self.active_processor().initial_location()
    }

    pub fn set_initial_location(&mut self, location: NedLocation) {
        self.config.initial_location = location;
        self.processors
            .get_mut(self.variant)
            .set_initial_location(location);
    }

    pub fn initial_velocity(&self) -> &NedVelocity {
        self.active_processor().initial_velocity()
    }

    pub fn set_initial_velocity(&mut self, velocity: NedVelocity) {
        self.config.initial_velocity = velocity;
        self.processors
            .get_mut(self.variant)
            .set_initial_velocity(velocity);
    }

    // --- Configuration ---

    fusion_config_setters! {
        set_interpolation_mode(InterpolationMode) => InterpolationMode;
        set_interpolation_value(f64) => InterpolationValue;
        set_indirect_interpolation_weight(f64) => IndirectInterpolationWeight;
        set_outlier_threshold(f64) => OutlierThreshold;
        set_outlier_panic_threshold(f64) => OutlierPanicThreshold;
        set_panic_counter_threshold(u32) => PanicCounterThreshold;
        set_use_accurate_leveling(bool) => UseAccurateLeveling;
        set_use_accurate_relative_gyroscope(bool) => UseAccurateRelativeGyroscope;
        /// Only reaches the processors that read a magnetometer.
        set_magnetic_model(Option<MagneticModel>) => MagneticModel;
        /// Decimal year to evaluate the magnetic model at.
        set_magnetic_model_year(Option<f64>) => MagneticModelYear;
        set_use_leveled_relative_attitude_respect_start(bool) => UseLeveledRelativeAttitudeRespectStart;
    }

    /// Fails while running: the norm is averaged over the whole session.
    pub fn set_adjust_gravity_norm(&mut self, adjust: bool) -> Result<()> {
        if self.running {
            return Err(PoseError::ChangeWhileRunning {
                field: "adjust_gravity_norm",
            });
        }
        self.apply_change(ConfigChange::AdjustGravityNorm(adjust))
    }

    fn apply_change(&mut self, change: ConfigChange) -> Result<()> {
        let mut tentative = self.config.fusion.clone();
        change.apply(&mut tentative);
        tentative.validate()?;
        self.config.fusion = tentative;

        self.processors.for_each_mut(|variant, processor| {
            if change.is_magnetic() && !variant.reads_magnetometer() {
                return;
            }
            processor.configure(&change);
        });
        Ok(())
    }
}
