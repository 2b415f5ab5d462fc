// sextant_core/src/error.rs

use thiserror::Error;

/// Programmer and state errors raised by the pose estimators.
///
/// Data problems (an incomplete or out-of-order measurement) are never errors:
/// the processors report them by returning `false` from `process`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("estimator is already running")]
    AlreadyRunning,

    #[error("'{field}' cannot be changed while the estimator is running")]
    ChangeWhileRunning { field: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PoseError>;
