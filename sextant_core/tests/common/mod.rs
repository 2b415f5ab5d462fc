// sextant_core/tests/common/mod.rs

//! Recording doubles for the processors and sources an estimator owns.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use sextant_core::config::{ConfigChange, FusionConfig};
use sextant_core::estimation::absolute::AbsoluteProcessorBank;
use sextant_core::estimation::relative::RelativeProcessorBank;
use sextant_core::frames::{EcefFrame, LocalFrame};
use sextant_core::fusion::FusionState;
use sextant_core::geodesy::{NedLocation, NedVelocity};
use sextant_core::measurements::SyncedMeasurement;
use sextant_core::processors::{AbsolutePoseProcessor, RelativePoseProcessor};
use sextant_core::source::{MeasurementSource, SourceSet};
use sextant_core::types::{PoseTransformation, Timestamp};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Process(Timestamp),
    Reset,
    SetInitialLocation(NedLocation),
    SetInitialVelocity(NedVelocity),
    SetLocation(Option<NedLocation>),
    PoseTransformation,
    Configure(ConfigChange),
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.calls().is_empty()
    }
}

/// A frame `offset` metres along the ECEF z axis from a fixed reference point.
pub fn ecef_frame(offset: f64, timestamp: Timestamp) -> EcefFrame {
    let mut frame = EcefFrame::from_ned(
        &NedLocation::from_degrees(45.0, 7.0, 200.0),
        &NedVelocity::default(),
        &UnitQuaternion::identity(),
        timestamp,
    );
    frame.position += Vector3::new(0.0, 0.0, offset);
    frame
}

// =========================================================================
// == Processors ==
// =========================================================================

/// Scripted frames a mock reports once `process` succeeds.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedFrames<F> {
    pub current: F,
    pub previous: F,
    pub initial: F,
}

pub struct MockAbsoluteProcessor {
    pub log: CallLog,
    pub process_result: bool,
    script: Option<ScriptedFrames<EcefFrame>>,
    frames: Option<ScriptedFrames<EcefFrame>>,
    config: FusionConfig,
    initial_location: NedLocation,
    initial_velocity: NedVelocity,
}

impl MockAbsoluteProcessor {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            process_result: false,
            script: None,
            frames: None,
            config: FusionConfig::default(),
            initial_location: NedLocation::default(),
            initial_velocity: NedVelocity::default(),
        }
    }

    pub fn succeeding_with(mut self, script: ScriptedFrames<EcefFrame>) -> Self {
        self.process_result = true;
        self.script = Some(script);
        self
    }
}

impl AbsolutePoseProcessor for MockAbsoluteProcessor {
    fn process(&mut self, measurement: &SyncedMeasurement) -> bool {
        self.log.push(Call::Process(measurement.timestamp));
        if self.process_result {
            self.frames = self.script;
        }
        self.process_result
    }

    fn reset(&mut self) {
        self.log.push(Call::Reset);
        self.frames = None;
    }

    fn initial_frame(&self) -> Option<&EcefFrame> {
        self.frames.as_ref().map(|frames| &frames.initial)
    }

    fn previous_frame(&self) -> Option<&EcefFrame> {
        self.frames.as_ref().map(|frames| &frames.previous)
    }

    fn current_frame(&self) -> Option<&EcefFrame> {
        self.frames.as_ref().map(|frames| &frames.current)
    }

    fn pose_transformation(&mut self) -> Option<PoseTransformation> {
        self.log.push(Call::PoseTransformation);
        Some(Isometry3::translation(1.0, 2.0, 3.0))
    }

    fn initial_location(&self) -> &NedLocation {
        &self.initial_location
    }

    fn set_initial_location(&mut self, location: NedLocation) {
        self.log.push(Call::SetInitialLocation(location));
        self.initial_location = location;
    }

    fn initial_velocity(&self) -> &NedVelocity {
        &self.initial_velocity
    }

    fn set_initial_velocity(&mut self, velocity: NedVelocity) {
        self.log.push(Call::SetInitialVelocity(velocity));
        self.initial_velocity = velocity;
    }

    fn config(&self) -> &FusionConfig {
        &self.config
    }

    fn configure(&mut self, change: &ConfigChange) {
        self.log.push(Call::Configure(change.clone()));
        change.apply(&mut self.config);
    }

    fn fusion_state(&self) -> FusionState {
        FusionState::Normal
    }
}

pub struct MockRelativeProcessor {
    pub log: CallLog,
    pub process_result: bool,
    frames: Option<ScriptedFrames<LocalFrame>>,
    config: FusionConfig,
    location: Option<NedLocation>,
}

impl MockRelativeProcessor {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            process_result: false,
            frames: None,
            config: FusionConfig::default(),
            location: None,
        }
    }
}

impl RelativePoseProcessor for MockRelativeProcessor {
    fn process(&mut self, measurement: &SyncedMeasurement) -> bool {
        self.log.push(Call::Process(measurement.timestamp));
        if self.process_result {
            let frame = LocalFrame::at_origin(UnitQuaternion::identity(), Vector3::zeros(), measurement.timestamp);
            self.frames = Some(ScriptedFrames {
                current: frame,
                previous: frame,
                initial: frame,
            });
        }
        self.process_result
    }

    fn reset(&mut self) {
        self.log.push(Call::Reset);
        self.frames = None;
    }

    fn initial_frame(&self) -> Option<&LocalFrame> {
        self.frames.as_ref().map(|frames| &frames.initial)
    }

    fn previous_frame(&self) -> Option<&LocalFrame> {
        self.frames.as_ref().map(|frames| &frames.previous)
    }

    fn current_frame(&self) -> Option<&LocalFrame> {
        self.frames.as_ref().map(|frames| &frames.current)
    }

    fn pose_transformation(&mut self) -> Option<PoseTransformation> {
        self.log.push(Call::PoseTransformation);
        Some(Isometry3::translation(0.5, 0.0, 0.0))
    }

    fn location(&self) -> Option<&NedLocation> {
        self.location.as_ref()
    }

    fn set_location(&mut self, location: Option<NedLocation>) {
        self.log.push(Call::SetLocation(location));
        self.location = location;
    }

    fn config(&self) -> &FusionConfig {
        &self.config
    }

    fn configure(&mut self, change: &ConfigChange) {
        self.log.push(Call::Configure(change.clone()));
        change.apply(&mut self.config);
    }

    fn fusion_state(&self) -> FusionState {
        FusionState::Normal
    }
}

/// Logs in bank order: attitude sensor, fused, accelerometer fused, double
/// fused, accelerometer double fused.
pub fn absolute_bank(
    customize: impl Fn(usize, MockAbsoluteProcessor) -> MockAbsoluteProcessor,
) -> (AbsoluteProcessorBank, Vec<CallLog>) {
    let logs: Vec<CallLog> = (0..5).map(|_| CallLog::default()).collect();
    let mock = |index: usize| -> Box<dyn AbsolutePoseProcessor> {
        Box::new(customize(index, MockAbsoluteProcessor::new(logs[index].clone())))
    };
    let bank = AbsoluteProcessorBank {
        attitude_sensor: mock(0),
        fused: mock(1),
        accelerometer_fused: mock(2),
        double_fused: mock(3),
        accelerometer_double_fused: mock(4),
    };
    (bank, logs)
}

/// Logs in bank order: attitude sensor, leveled, accelerometer leveled.
pub fn relative_bank(process_result: bool) -> (RelativeProcessorBank, Vec<CallLog>) {
    let logs: Vec<CallLog> = (0..3).map(|_| CallLog::default()).collect();
    let mock = |index: usize| -> Box<dyn RelativePoseProcessor> {
        let mut processor = MockRelativeProcessor::new(logs[index].clone());
        processor.process_result = process_result;
        Box::new(processor)
    };
    let bank = RelativeProcessorBank {
        attitude_sensor: mock(0),
        leveled: mock(1),
        accelerometer_leveled: mock(2),
    };
    (bank, logs)
}

// =========================================================================
// == Sources ==
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SourceCall {
    Start(Timestamp),
    Stop,
}

#[derive(Debug, Clone, Default)]
pub struct SourceLog(Arc<Mutex<Vec<SourceCall>>>);

impl SourceLog {
    pub fn calls(&self) -> Vec<SourceCall> {
        self.0.lock().unwrap().clone()
    }
}

pub struct MockSource {
    log: SourceLog,
    start_result: bool,
    running: bool,
}

impl MeasurementSource for MockSource {
    fn start(&mut self, timestamp: Timestamp) -> bool {
        self.record(SourceCall::Start(timestamp));
        self.running = self.start_result;
        self.start_result
    }

    fn stop(&mut self) {
        self.record(SourceCall::Stop);
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

impl MockSource {
    fn record(&self, call: SourceCall) {
        self.log.0.lock().unwrap().push(call);
    }
}

/// Logs in order: attitude, gravity, accelerometer.
pub fn sources(start_result: bool) -> (SourceSet, Vec<SourceLog>) {
    let logs: Vec<SourceLog> = (0..3).map(|_| SourceLog::default()).collect();
    let source = |index: usize| -> Box<dyn MeasurementSource> {
        Box::new(MockSource {
            log: logs[index].clone(),
            start_result,
            running: false,
        })
    };
    (SourceSet::new(source(0), source(1), source(2)), logs)
}
