// sextant_core/src/fusion/mod.rs

//! Attitude fusion: gyroscope propagation corrected towards a leveling and
//! heading reference, guarded by the outlier/panic state machine.

pub mod attitude;
pub mod gyro;
pub mod heading;
pub mod leveling;
pub mod outlier;

use nalgebra::UnitQuaternion;
use tracing::debug;

use crate::config::FusionConfig;
pub use outlier::{Correction, FusionState, PanicMonitor};

const SLERP_EPSILON: f64 = 1e-9;

/// Result of one fusion step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionOutcome {
    pub attitude: UnitQuaternion<f64>,
    pub state: FusionState,
    /// Angle (rad) between the propagated and the reference attitude.
    pub disagreement: f64,
}

/// One fusion stage: holds the fused attitude and its panic monitor.
#[derive(Debug, Clone, Default)]
pub struct AttitudeFusionCore {
    attitude: Option<UnitQuaternion<f64>>,
    monitor: PanicMonitor,
}

impl AttitudeFusionCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.attitude = None;
        self.monitor.reset();
    }

    pub fn is_initialized(&self) -> bool {
        self.attitude.is_some()
    }

    pub fn attitude(&self) -> Option<UnitQuaternion<f64>> {
        self.attitude
    }

    pub fn state(&self) -> FusionState {
        self.monitor.state()
    }

    pub fn panic_counter(&self) -> u32 {
        self.monitor.counter()
    }

    pub fn initialize(&mut self, attitude: UnitQuaternion<f64>) {
        let mut attitude = attitude;
        attitude.renormalize();
        self.attitude = Some(attitude);
        self.monitor.reset();
    }

    /// Applies a body-frame increment to the current attitude without storing it.
    pub fn propagate(&self, delta: &UnitQuaternion<f64>) -> Option<UnitQuaternion<f64>> {
        self.attitude.map(|attitude| {
            let mut propagated = attitude * delta;
            propagated.renormalize();
            propagated
        })
    }

    /// Corrects `propagated` towards `reference` and stores the result.
    pub fn fuse(
        &mut self,
        propagated: UnitQuaternion<f64>,
        reference: &UnitQuaternion<f64>,
        config: &FusionConfig,
    ) -> FusionOutcome {
        let disagreement = propagated.angle_to(reference);
        let mut attitude = match self.monitor.assess(disagreement, config) {
            Correction::Blend(factor) => propagated
                .try_slerp(reference, factor, SLERP_EPSILON)
                .unwrap_or(propagated),
            Correction::Reject => propagated,
            Correction::Adopt => {
                debug!(
                    disagreement,
                    threshold = config.panic_counter_threshold,
                    "attitude fusion panicked, adopting reference attitude"
                );
                *reference
            }
        };
        attitude.renormalize();
        self.attitude = Some(attitude);

        FusionOutcome {
            attitude,
            state: self.monitor.state(),
            disagreement,
        }
    }

    /// Full step. The first reference seen initializes the stage; `delta` is
    /// ignored until then. Without a reference the stage only propagates.
    pub fn update(
        &mut self,
        delta: &UnitQuaternion<f64>,
        reference: Option<&UnitQuaternion<f64>>,
        config: &FusionConfig,
    ) -> Option<FusionOutcome> {
        match (self.propagate(delta), reference) {
            (Some(propagated), Some(reference)) => Some(self.fuse(propagated, reference, config)),
            (Some(propagated), None) => {
                self.attitude = Some(propagated);
                Some(FusionOutcome {
                    attitude: propagated,
                    state: self.monitor.state(),
                    disagreement: 0.0,
                })
            }
            (None, Some(reference)) => {
                self.initialize(*reference);
                debug!("attitude fusion initialized from reference");
                Some(FusionOutcome {
                    attitude: *reference,
                    state: FusionState::Normal,
                    disagreement: 0.0,
                })
            }
            (None, None) => None,
        }
    }
}
