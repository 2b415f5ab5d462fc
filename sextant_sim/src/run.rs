// sextant_sim/src/run.rs

//! Drives an estimator through a simulated scenario and scores its output
//! against ground truth.

use std::sync::{Arc, Mutex, PoisonError};

use sextant_core::config::FusionConfig;
use sextant_core::estimation::{AbsolutePoseEstimator, RelativePoseEstimator};
use sextant_core::frames::EcefFrame;
use sextant_core::source::{SourceEvent, SourceSet};
use sextant_core::types::{elapsed_seconds, seconds_to_nanos, PoseTransformation, Timestamp};
use tracing::{debug, info};

use crate::config::ScenarioConfig;
use crate::error::SimError;
use crate::prng::SimulationRng;
use crate::replay::{replay_sources, ReplayHandle};
use crate::sensors::SensorSimulator;
use crate::trajectory::Trajectory;

/// How an estimator did over one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub variant: String,
    /// Poses delivered to the listener.
    pub poses: usize,
    /// Distance between the last estimated pose and the truth (m).
    pub final_position_error: Option<f64>,
    /// Rotation angle between the last estimated attitude and the truth (rad).
    pub final_attitude_error: Option<f64>,
}

/// The sample clock of a scenario.
struct Clock {
    start: Timestamp,
    steps: u64,
    dt: f64,
    steps_per_second: u64,
}

impl Clock {
    fn new(scenario: &ScenarioConfig) -> Self {
        let simulation = &scenario.simulation;
        Self {
            start: simulation.start_timestamp,
            steps: (simulation.duration_seconds * simulation.rate_hz).round() as u64,
            dt: 1.0 / simulation.rate_hz,
            steps_per_second: simulation.rate_hz.round().max(1.0) as u64,
        }
    }

    fn ticks(&self) -> impl Iterator<Item = (u64, f64, Timestamp)> + '_ {
        (0..=self.steps).map(move |k| {
            let t = k as f64 * self.dt;
            (k, t, self.start + seconds_to_nanos(t))
        })
    }

    fn seconds_since_start(&self, timestamp: Timestamp) -> f64 {
        elapsed_seconds(self.start, timestamp)
    }
}

fn sensor_simulator(
    scenario: &ScenarioConfig,
    fusion: &FusionConfig,
    seed: u64,
) -> Result<SensorSimulator, SimError> {
    SensorSimulator::new(
        &scenario.sensors,
        fusion.magnetic_model.unwrap_or_default(),
        fusion.magnetic_model_year,
        SimulationRng::seeded(seed),
    )
}

pub fn run_absolute(scenario: &ScenarioConfig, seed: u64) -> Result<RunReport, SimError> {
    let (sources, handles) = replay_sources();
    run_absolute_with(scenario, seed, sources, handles)
}

/// Runs the absolute estimator on caller-provided sources.
pub fn run_absolute_with(
    scenario: &ScenarioConfig,
    seed: u64,
    sources: SourceSet,
    handles: Vec<ReplayHandle>,
) -> Result<RunReport, SimError> {
    scenario.validate()?;
    let trajectory = Trajectory::new(&scenario.trajectory);
    let clock = Clock::new(scenario);

    let mut config = scenario.absolute.clone();
    config.initial_location = trajectory.start_location();
    config.initial_velocity = trajectory.start_velocity();
    let mut sensors = sensor_simulator(scenario, &config.fusion, seed)?;
    let mut estimator = AbsolutePoseEstimator::new(config, sources)?;

    let poses: Arc<Mutex<Vec<EcefFrame>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&poses);
    estimator.set_pose_listener(Some(Box::new(
        move |_: &AbsolutePoseEstimator,
              current: &EcefFrame,
              _: &EcefFrame,
              _: &EcefFrame,
              _: Timestamp,
              _: Option<&PoseTransformation>| {
            sink.lock().unwrap_or_else(PoisonError::into_inner).push(*current);
        },
    )));

    let variant = estimator.variant();
    if !estimator.start(clock.start)? {
        return Err(SimError::SourceNotStarted(variant.source_kind()));
    }
    info!(?variant, seed, steps = clock.steps, "running absolute scenario");

    for (k, t, timestamp) in clock.ticks() {
        let measurement = sensors.measure(&trajectory.sample(t), timestamp);
        for handle in handles.iter().filter(|handle| handle.is_running()) {
            estimator.handle_event(SourceEvent::Measurement {
                source: handle.kind(),
                measurement: measurement.clone(),
            });
        }
        if k % clock.steps_per_second == 0 {
            debug!(t, state = ?estimator.active_processor().fusion_state(), "absolute step");
        }
    }
    estimator.stop();

    let poses = std::mem::take(&mut *poses.lock().unwrap_or_else(PoisonError::into_inner));
    let last = poses.last().map(|frame| {
        let truth = trajectory.sample(clock.seconds_since_start(frame.timestamp));
        (
            (frame.position - truth.ecef_position).norm(),
            frame.ned_attitude().angle_to(&truth.attitude),
        )
    });

    Ok(RunReport {
        variant: format!("{variant:?}"),
        poses: poses.len(),
        final_position_error: last.map(|(position, _)| position),
        final_attitude_error: last.map(|(_, attitude)| attitude),
    })
}

pub fn run_relative(scenario: &ScenarioConfig, seed: u64) -> Result<RunReport, SimError> {
    let (sources, handles) = replay_sources();
    run_relative_with(scenario, seed, sources, handles)
}

/// Runs the relative estimator on caller-provided sources.
pub fn run_relative_with(
    scenario: &ScenarioConfig,
    seed: u64,
    sources: SourceSet,
    handles: Vec<ReplayHandle>,
) -> Result<RunReport, SimError> {
    scenario.validate()?;
    let trajectory = Trajectory::new(&scenario.trajectory);
    let clock = Clock::new(scenario);

    let mut config = scenario.relative.clone();
    config.location = Some(trajectory.start_location());
    let mut sensors = sensor_simulator(scenario, &config.fusion, seed)?;
    let mut estimator = RelativePoseEstimator::new(config, sources)?;

    let poses: Arc<Mutex<Vec<(Timestamp, PoseTransformation)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&poses);
    estimator.set_pose_listener(Some(Box::new(
        move |_: &RelativePoseEstimator, timestamp: Timestamp, transformation: &PoseTransformation| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((timestamp, *transformation));
        },
    )));

    let variant = estimator.variant();
    if !estimator.start(clock.start)? {
        return Err(SimError::SourceNotStarted(variant.source_kind()));
    }
    info!(?variant, seed, steps = clock.steps, "running relative scenario");

    for (k, t, timestamp) in clock.ticks() {
        let measurement = sensors.measure(&trajectory.sample(t), timestamp);
        for handle in handles.iter().filter(|handle| handle.is_running()) {
            estimator.handle_event(SourceEvent::Measurement {
                source: handle.kind(),
                measurement: measurement.clone(),
            });
        }
        if k % clock.steps_per_second == 0 {
            debug!(t, state = ?estimator.active_processor().fusion_state(), "relative step");
        }
    }
    estimator.stop();

    let poses = std::mem::take(&mut *poses.lock().unwrap_or_else(PoisonError::into_inner));
    let initial = trajectory.sample(0.0).tangent_pose;
    let last = poses.last().map(|(timestamp, transformation)| {
        let truth = initial.inverse() * trajectory.sample(clock.seconds_since_start(*timestamp)).tangent_pose;
        (
            (transformation.translation.vector - truth.translation.vector).norm(),
            transformation.rotation.angle_to(&truth.rotation),
        )
    });

    Ok(RunReport {
        variant: format!("{variant:?}"),
        poses: poses.len(),
        final_position_error: last.map(|(position, _)| position),
        final_attitude_error: last.map(|(_, attitude)| attitude),
    })
}
