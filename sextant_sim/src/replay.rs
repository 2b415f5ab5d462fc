// sextant_sim/src/replay.rs

//! Measurement sources driven by the simulation loop instead of hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sextant_core::source::{MeasurementSource, SourceKind, SourceSet};
use sextant_core::types::Timestamp;
use tracing::debug;

/// A source the harness pushes simulated measurements through.
///
/// The estimator owns the source; the harness keeps a [`ReplayHandle`] to see
/// whether it should currently be fed.
#[derive(Debug)]
pub struct ReplaySource {
    kind: SourceKind,
    available: bool,
    running: Arc<AtomicBool>,
}

/// Observer side of a [`ReplaySource`].
#[derive(Debug, Clone)]
pub struct ReplayHandle {
    kind: SourceKind,
    running: Arc<AtomicBool>,
}

impl ReplaySource {
    pub fn new(kind: SourceKind) -> (Self, ReplayHandle) {
        let running = Arc::new(AtomicBool::new(false));
        let handle = ReplayHandle {
            kind,
            running: Arc::clone(&running),
        };
        let source = Self {
            kind,
            available: true,
            running,
        };
        (source, handle)
    }

    /// A source whose sensors are missing. It never starts.
    pub fn unavailable(kind: SourceKind) -> (Self, ReplayHandle) {
        let (mut source, handle) = Self::new(kind);
        source.available = false;
        (source, handle)
    }
}

impl MeasurementSource for ReplaySource {
    fn start(&mut self, timestamp: Timestamp) -> bool {
        if !self.available {
            return false;
        }
        debug!(source = ?self.kind, timestamp, "replay source started");
        self.running.store(true, Ordering::SeqCst);
        true
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl ReplayHandle {
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// One replay source per kind, plus the handles to watch them.
pub fn replay_sources() -> (SourceSet, Vec<ReplayHandle>) {
    let (attitude, attitude_handle) = ReplaySource::new(SourceKind::Attitude);
    let (gravity, gravity_handle) = ReplaySource::new(SourceKind::Gravity);
    let (accelerometer, accelerometer_handle) = ReplaySource::new(SourceKind::Accelerometer);
    (
        SourceSet::new(Box::new(attitude), Box::new(gravity), Box::new(accelerometer)),
        vec![attitude_handle, gravity_handle, accelerometer_handle],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_follows_source() {
        let (mut source, handle) = ReplaySource::new(SourceKind::Gravity);
        assert!(!handle.is_running());
        assert!(source.start(10));
        assert!(handle.is_running());
        assert!(source.is_running());
        source.stop();
        assert!(!handle.is_running());
        assert_eq!(handle.kind(), SourceKind::Gravity);
    }

    #[test]
    fn test_unavailable_source_never_runs() {
        let (mut source, handle) = ReplaySource::unavailable(SourceKind::Attitude);
        assert!(!source.start(0));
        assert!(!handle.is_running());
        source.stop();
        assert!(!source.is_running());
    }

    #[test]
    fn test_stop_all_stops_every_replay_source() {
        let (mut sources, handles) = replay_sources();
        assert!(sources.get_mut(SourceKind::Accelerometer).start(0));
        assert!(handles[2].is_running());
        sources.stop_all();
        assert!(handles.iter().all(|handle| !handle.is_running()));
    }
}
