// sextant_core/src/estimation/relative.rs

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::{AccuracyChangedListener, BufferFilledListener};
use crate::config::{ConfigChange, FusionConfig, InterpolationMode};
use crate::error::{PoseError, Result};
use crate::fusion::leveling::LevelingSource;
use crate::geodesy::NedLocation;
use crate::measurements::SyncedMeasurement;
use crate::processors::{
    AttitudeSensorRelativePoseProcessor, LeveledRelativePoseProcessor, RelativePoseProcessor,
};
use crate::source::{SourceEvent, SourceKind, SourceSet};
use crate::types::{PoseTransformation, Timestamp};

/// Receives `(estimator, timestamp, transformation)` for every new relative pose.
pub type RelativePoseListener =
    Box<dyn FnMut(&RelativePoseEstimator, Timestamp, &PoseTransformation) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelativeVariant {
    AttitudeSensor,
    Leveled,
    AccelerometerLeveled,
}

impl RelativeVariant {
    pub const ALL: [RelativeVariant; 3] = [
        RelativeVariant::AttitudeSensor,
        RelativeVariant::Leveled,
        RelativeVariant::AccelerometerLeveled,
    ];

    pub fn select(use_attitude_sensor: bool, use_accelerometer: bool) -> Self {
        match (use_attitude_sensor, use_accelerometer) {
            (true, _) => Self::AttitudeSensor,
            (false, true) => Self::AccelerometerLeveled,
            (false, false) => Self::Leveled,
        }
    }

    pub fn source_kind(self) -> SourceKind {
        match self {
            Self::AttitudeSensor => SourceKind::Attitude,
            Self::Leveled => SourceKind::Gravity,
            Self::AccelerometerLeveled => SourceKind::Accelerometer,
        }
    }
}

/// Every relative processor, one per [`RelativeVariant`].
pub struct RelativeProcessorBank {
    pub attitude_sensor: Box<dyn RelativePoseProcessor>,
    pub leveled: Box<dyn RelativePoseProcessor>,
    pub accelerometer_leveled: Box<dyn RelativePoseProcessor>,
}

impl RelativeProcessorBank {
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            attitude_sensor: Box::new(AttitudeSensorRelativePoseProcessor::new(config.clone())),
            leveled: Box::new(LeveledRelativePoseProcessor::new(
                LevelingSource::Gravity,
                config.clone(),
            )),
            accelerometer_leveled: Box::new(LeveledRelativePoseProcessor::new(
                LevelingSource::Accelerometer,
                config.clone(),
            )),
        }
    }

    pub fn get(&self, variant: RelativeVariant) -> &dyn RelativePoseProcessor {
        match variant {
            RelativeVariant::AttitudeSensor => self.attitude_sensor.as_ref(),
            RelativeVariant::Leveled => self.leveled.as_ref(),
            RelativeVariant::AccelerometerLeveled => self.accelerometer_leveled.as_ref(),
        }
    }

    pub fn get_mut(&mut self, variant: RelativeVariant) -> &mut dyn RelativePoseProcessor {
        match variant {
            RelativeVariant::AttitudeSensor => self.attitude_sensor.as_mut(),
            RelativeVariant::Leveled => self.leveled.as_mut(),
            RelativeVariant::AccelerometerLeveled => self.accelerometer_leveled.as_mut(),
        }
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(RelativeVariant, &mut dyn RelativePoseProcessor)) {
        f(RelativeVariant::AttitudeSensor, self.attitude_sensor.as_mut());
        f(RelativeVariant::Leveled, self.leveled.as_mut());
        f(RelativeVariant::AccelerometerLeveled, self.accelerometer_leveled.as_mut());
    }
}

/// Construction parameters of a [`RelativePoseEstimator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelativePoseEstimatorConfig {
    pub use_attitude_sensor: bool,
    pub use_accelerometer_for_attitude_estimation: bool,
    /// Refines the gravity model when known.
    pub location: Option<NedLocation>,
    pub fusion: FusionConfig,
}

impl Default for RelativePoseEstimatorConfig {
    fn default() -> Self {
        Self {
            use_attitude_sensor: true,
            use_accelerometer_for_attitude_estimation: false,
            location: None,
            fusion: FusionConfig::default(),
        }
    }
}

impl RelativePoseEstimatorConfig {
    pub fn variant(&self) -> RelativeVariant {
        RelativeVariant::select(
            self.use_attitude_sensor,
            self.use_accelerometer_for_attitude_estimation,
        )
    }
}

/// Estimates the pose change since tracking started, without an Earth anchor.
///
/// Unlike the absolute estimator, the transformation is computed on every
/// pose and always handed to the listener.
pub struct RelativePoseEstimator {
    config: RelativePoseEstimatorConfig,
    variant: RelativeVariant,
    processors: RelativeProcessorBank,
    sources: SourceSet,
    running: bool,
    pose_listener: Option<RelativePoseListener>,
    accuracy_changed_listener: Option<AccuracyChangedListener<RelativePoseEstimator>>,
    buffer_filled_listener: Option<BufferFilledListener<RelativePoseEstimator>>,
}

impl RelativePoseEstimator {
    pub fn new(config: RelativePoseEstimatorConfig, sources: SourceSet) -> Result<Self> {
        let processors = RelativeProcessorBank::new(&config.fusion);
        Self::with_processors(config, processors, sources)
    }

    pub fn with_processors(
        config: RelativePoseEstimatorConfig,
        processors: RelativeProcessorBank,
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

        if estimator.config.location.is_some() {
            estimator
                .processors
                .get_mut(variant)
                .set_location(estimator.config.location);
        }
        debug!(?variant, "relative pose estimator created");
        Ok(estimator)
    }

    // --- Lifecycle ---

    pub fn start(&mut self, timestamp: Timestamp) -> Result<bool> {
        if self.running {
            return Err(PoseError::AlreadyRunning);
        }

        self.processors.get_mut(self.variant).reset();
        let kind = self.variant.source_kind();
        let started = self.sources.get_mut(kind).start(timestamp);
        if started {
            self.running = true;
            info!(variant = ?self.variant, timestamp, "relative pose estimation started");
        } else {
            warn!(source = ?kind, timestamp, "measurement source failed to start");
        }
        Ok(started)
    }

    pub fn stop(&mut self) {
        self.sources.stop_all();
        if self.running {
            info!(variant = ?self.variant, "relative pose estimation stopped");
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
        let Some(transformation) = processor.pose_transformation() else {
            return;
        };

        if let Some(mut listener) = self.pose_listener.take() {
            listener(self, measurement.timestamp, &transformation);
            self.pose_listener = Some(listener);
        }
    }

    pub fn set_pose_listener(&mut self, listener: Option<RelativePoseListener>) {
        self.pose_listener = listener;
    }

    pub fn set_accuracy_changed_listener(
        &mut self,
        listener: Option<AccuracyChangedListener<RelativePoseEstimator>>,
    ) {
        self.accuracy_changed_listener = listener;
    }

    pub fn set_buffer_filled_listener(&mut self, listener: Option<BufferFilledListener<RelativePoseEstimator>>) {
        self.buffer_filled_listener = listener;
    }

    // --- Accessors ---

    pub fn variant(&self) -> RelativeVariant {
        self.variant
    }

    pub fn config(&self) -> &RelativePoseEstimatorConfig {
        &self.config
    }

    pub fn fusion_config(&self) -> &FusionConfig {
        &self.config.fusion
    }

    pub fn processor(&self, variant: RelativeVariant) -> &dyn RelativePoseProcessor {
        self.processors.get(variant)
    }

    pub fn active_processor(&self) -> &dyn RelativePoseProcessor {
        self.processors.get(self.variant)
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn location(&self) -> Option<&NedLocation> {
        self.active_processor().location()
    }

    pub fn set_location(&mut self, location: Option<NedLocation>) {
        self.config.location = location;
        self.processors.get_mut(self.variant).set_location(location);
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
        set_use_leveled_relative_attitude_respect_start(bool) => UseLeveledRelativeAttitudeRespectStart;
    }

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

        self.processors
            .for_each_mut(|_, processor| processor.configure(&change));
        Ok(())
    }
}
