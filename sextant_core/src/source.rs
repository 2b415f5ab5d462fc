// sextant_core/src/source.rs

//! The boundary with whatever groups raw sensor samples into synchronized
//! measurements. Sources push [`SourceEvent`]s into an estimator.

use crate::measurements::SyncedMeasurement;
use crate::types::Timestamp;

/// Which synchronized stream a source produces, matching the processor families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Attitude + accelerometer + gyroscope.
    Attitude,
    /// Accelerometer + gravity + gyroscope (+ magnetometer for absolute poses).
    Gravity,
    /// Accelerometer + gyroscope (+ magnetometer for absolute poses).
    Accelerometer,
}

/// Individual sensors a source reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceSensorType {
    Accelerometer,
    AccelerometerUncalibrated,
    Gyroscope,
    GyroscopeUncalibrated,
    Magnetometer,
    MagnetometerUncalibrated,
    Gravity,
    RotationVector,
    GeomagneticRotationVector,
    GameRotationVector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceAccuracy {
    NoContact,
    Unreliable,
    Low,
    Medium,
    High,
}

/// Everything a source can report.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Measurement {
        source: SourceKind,
        measurement: SyncedMeasurement,
    },
    AccuracyChanged {
        source: SourceKind,
        sensor: SourceSensorType,
        accuracy: SourceAccuracy,
    },
    BufferFilled {
        source: SourceKind,
        sensor: SourceSensorType,
    },
}

impl SourceEvent {
    pub fn source(&self) -> SourceKind {
        match self {
            Self::Measurement { source, .. }
            | Self::AccuracyChanged { source, .. }
            | Self::BufferFilled { source, .. } => *source,
        }
    }
}

/// Control side of a synchronized measurement source.
pub trait MeasurementSource: Send {
    /// Starts delivering measurements stamped from `timestamp` on.
    /// Returns `false` when the source could not start.
    fn start(&mut self, timestamp: Timestamp) -> bool;

    /// Stops delivery. Must be safe to call on a source that never started.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// One source per [`SourceKind`], owned by an estimator.
pub struct SourceSet {
    pub attitude: Box<dyn MeasurementSource>,
    pub gravity: Box<dyn MeasurementSource>,
    pub accelerometer: Box<dyn MeasurementSource>,
}

impl SourceSet {
    pub fn new(
        attitude: Box<dyn MeasurementSource>,
        gravity: Box<dyn MeasurementSource>,
        accelerometer: Box<dyn MeasurementSource>,
    ) -> Self {
        Self {
            attitude,
            gravity,
            accelerometer,
        }
    }

    pub fn get(&self, kind: SourceKind) -> &dyn MeasurementSource {
        match kind {
            SourceKind::Attitude => self.attitude.as_ref(),
            SourceKind::Gravity => self.gravity.as_ref(),
            SourceKind::Accelerometer => self.accelerometer.as_ref(),
        }
    }

    pub fn get_mut(&mut self, kind: SourceKind) -> &mut dyn MeasurementSource {
        match kind {
            SourceKind::Attitude => self.attitude.as_mut(),
            SourceKind::Gravity => self.gravity.as_mut(),
            SourceKind::Accelerometer => self.accelerometer.as_mut(),
        }
    }

    pub fn stop_all(&mut self) {
        self.attitude.stop();
        self.gravity.stop();
        self.accelerometer.stop();
    }
}

/// A source with no sensors behind it. It refuses to start.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedSource;

impl MeasurementSource for DisconnectedSource {
    fn start(&mut self, _timestamp: Timestamp) -> bool {
        false
    }

    fn stop(&mut self) {}

    fn is_running(&self) -> bool {
        false
    }
}

impl Default for SourceSet {
    fn default() -> Self {
        Self::new(
            Box::new(DisconnectedSource),
            Box::new(DisconnectedSource),
            Box::new(DisconnectedSource),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_sources_never_start() {
        let mut sources = SourceSet::default();
        assert!(!sources.get_mut(SourceKind::Gravity).start(0));
        sources.stop_all();
        assert!(!sources.get(SourceKind::Gravity).is_running());
    }

    #[test]
    fn test_event_reports_its_source() {
        let event = SourceEvent::BufferFilled {
            source: SourceKind::Attitude,
            sensor: SourceSensorType::RotationVector,
        };
        assert_eq!(event.source(), SourceKind::Attitude);
    }
}
