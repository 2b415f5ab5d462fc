// sextant_core/src/estimation/mod.rs

//! The public entry points: estimators that own the processors and sources,
//! pick the active pair once at construction and report poses to listeners.

/// Generates estimator setters that validate and fan out one `FusionConfig` field.
macro_rules! fusion_config_setters {
    ($($(#[$meta:meta])* $setter:ident($ty:ty) => $change:ident;)*) => {
        $(
            $(#[$meta])*
            pub fn $setter(&mut self, value: $ty) -> Result<()> {
                self.apply_change(ConfigChange::$change(value))
            }
        )*
    };
}

pub mod absolute;
pub mod relative;

pub use absolute::{AbsolutePoseEstimator, AbsolutePoseEstimatorConfig, AbsoluteVariant};
pub use relative::{RelativePoseEstimator, RelativePoseEstimatorConfig, RelativeVariant};

use crate::source::{SourceAccuracy, SourceSensorType};

/// Sensor types reported to accuracy and buffer listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    Accelerometer,
    AccelerometerUncalibrated,
    Gyroscope,
    GyroscopeUncalibrated,
    Magnetometer,
    MagnetometerUncalibrated,
    Gravity,
    /// Platform attitude referenced to magnetic or true north.
    AbsoluteAttitude,
    /// Platform attitude with arbitrary heading.
    RelativeAttitude,
}

impl From<SourceSensorType> for SensorType {
    fn from(sensor: SourceSensorType) -> Self {
        match sensor {
            SourceSensorType::Accelerometer => Self::Accelerometer,
            SourceSensorType::AccelerometerUncalibrated => Self::AccelerometerUncalibrated,
            SourceSensorType::Gyroscope => Self::Gyroscope,
            SourceSensorType::GyroscopeUncalibrated => Self::GyroscopeUncalibrated,
            SourceSensorType::Magnetometer => Self::Magnetometer,
            SourceSensorType::MagnetometerUncalibrated => Self::MagnetometerUncalibrated,
            SourceSensorType::Gravity => Self::Gravity,
            SourceSensorType::RotationVector | SourceSensorType::GeomagneticRotationVector => {
                Self::AbsoluteAttitude
            }
            SourceSensorType::GameRotationVector => Self::RelativeAttitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SensorAccuracy {
    NoContact,
    Unreliable,
    Low,
    Medium,
    High,
}

impl From<SourceAccuracy> for SensorAccuracy {
    fn from(accuracy: SourceAccuracy) -> Self {
        match accuracy {
            SourceAccuracy::NoContact => Self::NoContact,
            SourceAccuracy::Unreliable => Self::Unreliable,
            SourceAccuracy::Low => Self::Low,
            SourceAccuracy::Medium => Self::Medium,
            SourceAccuracy::High => Self::High,
        }
    }
}

/// Called when a source reports a change of sensor accuracy.
pub type AccuracyChangedListener<E> = Box<dyn FnMut(&E, SensorType, SensorAccuracy) + Send>;

/// Called when a source's internal buffer overflowed and samples were lost.
pub type BufferFilledListener<E> = Box<dyn FnMut(&E, SensorType) + Send>;
