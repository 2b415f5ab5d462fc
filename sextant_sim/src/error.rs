// sextant_sim/src/error.rs

use sextant_core::error::PoseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("failed to load scenario: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("invalid noise model: {0}")]
    Noise(#[from] rand_distr::NormalError),

    #[error(transparent)]
    Pose(#[from] PoseError),

    #[error("the {0:?} measurement source did not start")]
    SourceNotStarted(sextant_core::source::SourceKind),
}

impl From<figment::Error> for SimError {
    fn from(error: figment::Error) -> Self {
        Self::Config(Box::new(error))
    }
}
