// sextant_core/src/config.rs

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{PoseError, Result};
use crate::magnetic::MagneticModel;

pub const DEFAULT_INTERPOLATION_VALUE: f64 = 0.01;
pub const DEFAULT_INDIRECT_INTERPOLATION_WEIGHT: f64 = 1.0;
/// ~63.6 degrees of disagreement between propagated and reference attitude.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 1.11;
/// ~82.8 degrees of disagreement between propagated and reference attitude.
pub const DEFAULT_OUTLIER_PANIC_THRESHOLD: f64 = 1.45;
pub const DEFAULT_PANIC_COUNTER_THRESHOLD: u32 = 60;

/// How the reference attitude is blended into the gyro-propagated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMode {
    /// Fixed slerp factor.
    Direct,
    /// Slerp factor shrinks as the two attitudes diverge.
    #[default]
    Indirect,
}

/// Tuning shared by every pose processor.
///
/// Held once by an estimator and mirrored into each processor it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FusionConfig {
    pub interpolation_mode: InterpolationMode,
    /// Slerp factor in `[0, 1]` towards the reference attitude.
    pub interpolation_value: f64,
    /// Per-radian attenuation of the slerp factor in indirect mode.
    pub indirect_interpolation_weight: f64,
    /// Disagreement (rad) above which a reference sample is trusted less.
    pub outlier_threshold: f64,
    /// Disagreement (rad) above which a reference sample is discarded.
    pub outlier_panic_threshold: f64,
    /// Consecutive panic-level samples after which the reference is adopted.
    pub panic_counter_threshold: u32,
    pub use_accurate_leveling: bool,
    pub use_accurate_relative_gyroscope: bool,
    /// Geomagnetic model for declination; `None` assumes zero declination.
    pub magnetic_model: Option<MagneticModel>,
    /// Decimal year to evaluate the model at; `None` uses the model epoch.
    pub magnetic_model_year: Option<f64>,
    pub adjust_gravity_norm: bool,
    pub use_leveled_relative_attitude_respect_start: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            interpolation_mode: InterpolationMode::Indirect,
            interpolation_value: DEFAULT_INTERPOLATION_VALUE,
            indirect_interpolation_weight: DEFAULT_INDIRECT_INTERPOLATION_WEIGHT,
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            outlier_panic_threshold: DEFAULT_OUTLIER_PANIC_THRESHOLD,
            panic_counter_threshold: DEFAULT_PANIC_COUNTER_THRESHOLD,
            use_accurate_leveling: true,
            use_accurate_relative_gyroscope: true,
            magnetic_model: None,
            magnetic_model_year: None,
            adjust_gravity_norm: true,
            use_leveled_relative_attitude_respect_start: false,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.interpolation_value) {
            return Err(PoseError::InvalidConfig(format!(
                "interpolation value must be in [0, 1], got {}",
                self.interpolation_value
            )));
        }
        if !(self.indirect_interpolation_weight >= 0.0
            && self.indirect_interpolation_weight.is_finite())
        {
            return Err(PoseError::InvalidConfig(format!(
                "indirect interpolation weight must be finite and non-negative, got {}",
                self.indirect_interpolation_weight
            )));
        }
        if !(self.outlier_threshold > 0.0) {
            return Err(PoseError::InvalidConfig(format!(
                "outlier threshold must be positive, got {}",
                self.outlier_threshold
            )));
        }
        if !(self.outlier_panic_threshold <= PI) {
            return Err(PoseError::InvalidConfig(format!(
                "outlier panic threshold must not exceed pi, got {}",
                self.outlier_panic_threshold
            )));
        }
        if self.outlier_threshold > self.outlier_panic_threshold {
            return Err(PoseError::InvalidConfig(format!(
                "outlier threshold {} exceeds panic threshold {}",
                self.outlier_threshold, self.outlier_panic_threshold
            )));
        }
        if self.panic_counter_threshold == 0 {
            return Err(PoseError::InvalidConfig(
                "panic counter threshold must be at least 1".to_string(),
            ));
        }
        if let Some(year) = self.magnetic_model_year {
            if !year.is_finite() {
                return Err(PoseError::InvalidConfig(format!(
                    "magnetic model year must be finite, got {year}"
                )));
            }
        }
        Ok(())
    }

    /// Declination to apply at a location under the current magnetic settings.
    pub fn declination(&self, location: &crate::geodesy::NedLocation) -> f64 {
        match &self.magnetic_model {
            Some(model) => {
                model.declination(location, self.magnetic_model_year.unwrap_or(model.epoch))
            }
            None => 0.0,
        }
    }
}

/// A single mutation of a [`FusionConfig`] field, fanned out by the estimators
/// to every processor that declares the field.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigChange {
    InterpolationMode(InterpolationMode),
    InterpolationValue(f64),
    IndirectInterpolationWeight(f64),
    OutlierThreshold(f64),
    OutlierPanicThreshold(f64),
    PanicCounterThreshold(u32),
    UseAccurateLeveling(bool),
    UseAccurateRelativeGyroscope(bool),
    MagneticModel(Option<MagneticModel>),
    MagneticModelYear(Option<f64>),
    AdjustGravityNorm(bool),
    UseLeveledRelativeAttitudeRespectStart(bool),
}

impl ConfigChange {
    /// Whether the change only concerns processors that read a magnetometer.
    pub fn is_magnetic(&self) -> bool {
        matches!(
            self,
            ConfigChange::MagneticModel(_) | ConfigChange::MagneticModelYear(_)
        )
    }

    pub fn apply(&self, config: &mut FusionConfig) {
        match self {
            ConfigChange::InterpolationMode(v) => config.interpolation_mode = *v,
            ConfigChange::InterpolationValue(v) => config.interpolation_value = *v,
            ConfigChange::IndirectInterpolationWeight(v) => {
                config.indirect_interpolation_weight = *v
            }
            ConfigChange::OutlierThreshold(v) => config.outlier_threshold = *v,
            ConfigChange::OutlierPanicThreshold(v) => config.outlier_panic_threshold = *v,
            ConfigChange::PanicCounterThreshold(v) => config.panic_counter_threshold = *v,
            ConfigChange::UseAccurateLeveling(v) => config.use_accurate_leveling = *v,
            ConfigChange::UseAccurateRelativeGyroscope(v) => {
                config.use_accurate_relative_gyroscope = *v
            }
            ConfigChange::MagneticModel(v) => config.magnetic_model = *v,
            ConfigChange::MagneticModelYear(v) => config.magnetic_model_year = *v,
            ConfigChange::AdjustGravityNorm(v) => config.adjust_gravity_norm = *v,
            ConfigChange::UseLeveledRelativeAttitudeRespectStart(v) => {
                config.use_leveled_relative_attitude_respect_start = *v
            }
        }
    }
}
