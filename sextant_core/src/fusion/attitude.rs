// sextant_core/src/fusion/attitude.rs

//! Attitude estimators assembled from leveling, gyroscope integration and
//! magnetometer heading around one or two [`AttitudeFusionCore`] stages.

use nalgebra::{UnitQuaternion, Vector3};

use super::gyro::GyroIntegrator;
use super::heading::true_heading;
use super::leveling::{level, Tilt};
use super::{AttitudeFusionCore, FusionState};
use crate::config::FusionConfig;
use crate::geodesy::{gravity_ned, NedLocation};

/// Increment since the previous sample, priming the integrator on the first one.
fn gyro_increment(
    gyro: &mut GyroIntegrator,
    core: &AttitudeFusionCore,
    rate: &Vector3<f64>,
    dt: f64,
    config: &FusionConfig,
) -> UnitQuaternion<f64> {
    gyro.set_accurate(config.use_accurate_relative_gyroscope);
    if core.is_initialized() {
        gyro.increment(rate, dt)
    } else {
        gyro.prime(rate);
        UnitQuaternion::identity()
    }
}

/// Gyro propagation corrected towards the leveled tilt only. Yaw is free and
/// starts at zero, so the result is a body-to-level attitude relative to the
/// heading at the first sample.
#[derive(Debug, Clone, Default)]
pub struct LeveledAttitudeEstimator {
    core: AttitudeFusionCore,
    gyro: GyroIntegrator,
}

impl LeveledAttitudeEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.core.reset();
        self.gyro.reset();
    }

    pub fn attitude(&self) -> Option<UnitQuaternion<f64>> {
        self.core.attitude()
    }

    pub fn state(&self) -> FusionState {
        self.core.state()
    }

    pub fn update(
        &mut self,
        force: &Vector3<f64>,
        rate: &Vector3<f64>,
        dt: f64,
        gravity_ned: Option<&Vector3<f64>>,
        config: &FusionConfig,
    ) -> Option<UnitQuaternion<f64>> {
        let delta = gyro_increment(&mut self.gyro, &self.core, rate, dt, config);
        let tilt = level(force, gravity_ned, config.use_accurate_leveling);

        let reference = match (tilt, self.core.propagate(&delta)) {
            (Some(tilt), Some(propagated)) => Some(tilt.with_yaw(propagated.euler_angles().2)),
            (Some(tilt), None) => Some(tilt.with_yaw(0.0)),
            (None, _) => None,
        };

        self.core
            .update(&delta, reference.as_ref(), config)
            .map(|outcome| outcome.attitude)
    }
}

/// Absolute leveling + magnetometer heading reference for a location.
fn geomagnetic_reference(
    tilt: Tilt,
    field: &Vector3<f64>,
    location: &NedLocation,
    config: &FusionConfig,
) -> Option<UnitQuaternion<f64>> {
    true_heading(field, &tilt, config.declination(location)).map(|heading| tilt.with_yaw(heading))
}

/// Single-stage absolute estimator: gyro propagation corrected towards the
/// leveled tilt combined with the magnetometer heading.
#[derive(Debug, Clone, Default)]
pub struct GeomagneticAttitudeEstimator {
    core: AttitudeFusionCore,
    gyro: GyroIntegrator,
}

impl GeomagneticAttitudeEstimator {
    pub fn reset(&mut self) {
        self.core.reset();
        self.gyro.reset();
    }

    pub fn state(&self) -> FusionState {
        self.core.state()
    }

    pub fn update(
        &mut self,
        force: &Vector3<f64>,
        rate: &Vector3<f64>,
        field: &Vector3<f64>,
        dt: f64,
        location: &NedLocation,
        config: &FusionConfig,
    ) -> Option<UnitQuaternion<f64>> {
        let delta = gyro_increment(&mut self.gyro, &self.core, rate, dt, config);
        let gravity = gravity_ned(location);
        let reference = level(force, Some(&gravity), config.use_accurate_leveling)
            .and_then(|tilt| geomagnetic_reference(tilt, field, location, config));

        self.core
            .update(&delta, reference.as_ref(), config)
            .map(|outcome| outcome.attitude)
    }
}

/// Two-stage absolute estimator. The first stage is a [`LeveledAttitudeEstimator`];
/// the second propagates with the first stage's increments and corrects
/// towards the first stage's tilt combined with the magnetometer heading.
#[derive(Debug, Clone, Default)]
pub struct DoubleFusedAttitudeEstimator {
    leveled: LeveledAttitudeEstimator,
    core: AttitudeFusionCore,
    last_leveled: Option<UnitQuaternion<f64>>,
}

impl DoubleFusedAttitudeEstimator {
    pub fn reset(&mut self) {
        self.leveled.reset();
        self.core.reset();
        self.last_leveled = None;
    }

    pub fn state(&self) -> FusionState {
        self.core.state()
    }

    pub fn leveled_state(&self) -> FusionState {
        self.leveled.state()
    }

    pub fn update(
        &mut self,
        force: &Vector3<f64>,
        rate: &Vector3<f64>,
        field: &Vector3<f64>,
        dt: f64,
        location: &NedLocation,
        config: &FusionConfig,
    ) -> Option<UnitQuaternion<f64>> {
        let gravity = gravity_ned(location);
        let leveled = self.leveled.update(force, rate, dt, Some(&gravity), config)?;

        let delta = match self.last_leveled {
            Some(last) => {
                let mut delta = last.inverse() * leveled;
                delta.renormalize();
                delta
            }
            None => UnitQuaternion::identity(),
        };
        self.last_leveled = Some(leveled);

        let reference = geomagnetic_reference(Tilt::from_attitude(&leveled), field, location, config);
        self.core
            .update(&delta, reference.as_ref(), config)
            .map(|outcome| outcome.attitude)
    }
}

/// The fusion strategy of an absolute fused processor.
#[derive(Debug, Clone)]
pub enum AbsoluteAttitudeEstimator {
    Single(GeomagneticAttitudeEstimator),
    Double(DoubleFusedAttitudeEstimator),
}

impl AbsoluteAttitudeEstimator {
    pub fn single() -> Self {
        Self::Single(GeomagneticAttitudeEstimator::default())
    }

    pub fn double() -> Self {
        Self::Double(DoubleFusedAttitudeEstimator::default())
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Self::Double(_))
    }

    pub fn reset(&mut self) {
        match self {
            Self::Single(estimator) => estimator.reset(),
            Self::Double(estimator) => estimator.reset(),
        }
    }

    pub fn state(&self) -> FusionState {
        match self {
            Self::Single(estimator) => estimator.state(),
            Self::Double(estimator) => estimator.state(),
        }
    }

    pub fn update(
        &mut self,
        force: &Vector3<f64>,
        rate: &Vector3<f64>,
        field: &Vector3<f64>,
        dt: f64,
        location: &NedLocation,
        config: &FusionConfig,
    ) -> Option<UnitQuaternion<f64>> {
        match self {
            Self::Single(estimator) => estimator.update(force, rate, field, dt, location, config),
            Self::Double(estimator) => estimator.update(force, rate, field, dt, location, config),
        }
    }
}

/// Removes the heading of the first reported attitude of a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartHeading {
    yaw: Option<f64>,
}

impl StartHeading {
    pub fn reset(&mut self) {
        self.yaw = None;
    }

    pub fn yaw(&self) -> Option<f64> {
        self.yaw
    }

    pub fn apply(&mut self, attitude: &UnitQuaternion<f64>, enabled: bool) -> UnitQuaternion<f64> {
        if !enabled {
            return *attitude;
        }
        let yaw = *self.yaw.get_or_insert_with(|| attitude.euler_angles().2);
        let mut aligned = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -yaw) * attitude;
        aligned.renormalize();
        aligned
    }
}
