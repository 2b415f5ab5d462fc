// sextant_core/src/types.rs

use nalgebra::Isometry3;

// --- Core Type Aliases ---

/// Sensor and event timestamps, in nanoseconds on the source's monotonic clock.
pub type Timestamp = i64;

/// The rigid transform from the `initial` frame of a tracking session to the
/// `current` one, expressed in the initial body frame.
pub type PoseTransformation = Isometry3<f64>;

pub const NANOS_PER_SECOND: f64 = 1.0e9;

/// Elapsed time between two timestamps, in seconds.
pub fn elapsed_seconds(from: Timestamp, to: Timestamp) -> f64 {
    (to - from) as f64 / NANOS_PER_SECOND
}

pub fn seconds_to_nanos(seconds: f64) -> Timestamp {
    (seconds * NANOS_PER_SECOND).round() as Timestamp
}
