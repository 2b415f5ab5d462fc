// sextant_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::frames::PoseFrame;
pub use crate::processors::{AbsolutePoseProcessor, RelativePoseProcessor};
pub use crate::source::{MeasurementSource, SourceEvent, SourceKind, SourceSet};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::config::{ConfigChange, FusionConfig, InterpolationMode};
pub use crate::error::PoseError;
pub use crate::frames::{EcefFrame, LocalFrame};
pub use crate::geodesy::{NedLocation, NedVelocity};
pub use crate::measurements::{
    AngularRate, Attitude, GravityVector, MagneticField, SensorSample, SpecificForce,
    SyncedMeasurement,
};
pub use crate::types::{PoseTransformation, Timestamp};

// --- Estimators ---
pub use crate::estimation::{
    AbsolutePoseEstimator, AbsolutePoseEstimatorConfig, AbsoluteVariant, RelativePoseEstimator,
    RelativePoseEstimatorConfig, RelativeVariant, SensorAccuracy, SensorType,
};
pub use crate::fusion::FusionState;
pub use crate::magnetic::MagneticModel;
