// sextant_core/src/fusion/outlier.rs

use crate::config::{FusionConfig, InterpolationMode};

/// Where the fusion stands with respect to its reference attitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FusionState {
    /// Reference and propagation agree; full correction applied.
    #[default]
    Normal,
    /// The last reference sample disagreed enough to be attenuated or ignored.
    Outlier,
    /// Too many consecutive rejections: the propagated attitude was dropped.
    Panicked,
}

/// What to do with the reference sample of one update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Slerp towards the reference by this factor.
    Blend(f64),
    /// Keep the propagated attitude.
    Reject,
    /// Replace the propagated attitude with the reference.
    Adopt,
}

/// Slerp factor for a given disagreement under the configured interpolation mode.
pub fn interpolation_factor(config: &FusionConfig, disagreement: f64) -> f64 {
    let factor = match config.interpolation_mode {
        InterpolationMode::Direct => config.interpolation_value,
        InterpolationMode::Indirect => {
            config.interpolation_value
                / (1.0 + config.indirect_interpolation_weight * disagreement.abs())
        }
    };
    factor.clamp(0.0, 1.0)
}

/// The outlier/panic state machine guarding every attitude fusion stage.
#[derive(Debug, Clone, Default)]
pub struct PanicMonitor {
    state: FusionState,
    counter: u32,
}

impl PanicMonitor {
    pub fn state(&self) -> FusionState {
        self.state
    }

    /// Consecutive panic-level samples seen since the last normal one or recovery.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn reset(&mut self) {
        self.state = FusionState::Normal;
        self.counter = 0;
    }

    pub fn assess(&mut self, disagreement: f64, config: &FusionConfig) -> Correction {
        let factor = interpolation_factor(config, disagreement);

        if disagreement > config.outlier_panic_threshold {
            self.counter += 1;
            if self.counter >= config.panic_counter_threshold {
                self.counter = 0;
                self.state = FusionState::Panicked;
                Correction::Adopt
            } else {
                self.state = FusionState::Outlier;
                Correction::Reject
            }
        } else if disagreement > config.outlier_threshold {
            // Weight fades linearly to zero across the outlier band.
            let band = config.outlier_panic_threshold - config.outlier_threshold;
            let attenuation = (config.outlier_panic_threshold - disagreement) / band;
            self.state = FusionState::Outlier;
            Correction::Blend(factor * attenuation)
        } else {
            self.counter = 0;
            self.state = FusionState::Normal;
            Correction::Blend(factor)
        }
    }
}
