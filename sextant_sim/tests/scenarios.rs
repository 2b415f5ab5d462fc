// sextant_sim/tests/scenarios.rs

use std::path::PathBuf;

use sextant_core::magnetic::MagneticModel;
use sextant_core::source::{SourceKind, SourceSet};
use sextant_sim::config::{load_scenario, ScenarioConfig};
use sextant_sim::error::SimError;
use sextant_sim::replay::ReplaySource;
use sextant_sim::run::{run_absolute, run_absolute_with, run_relative};

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../assets/scenarios")
        .join(name)
}

fn stationary() -> ScenarioConfig {
    load_scenario(&scenario_path("stationary.toml")).unwrap()
}

#[test]
fn test_bundled_scenarios_load() {
    let stationary = stationary();
    assert_eq!(stationary.simulation.seed, Some(42));
    assert!(stationary.absolute.estimate_pose_transformation);

    let driving = load_scenario(&scenario_path("driving.toml")).unwrap();
    assert!(!driving.absolute.use_attitude_sensor);
    assert_eq!(driving.absolute.fusion.magnetic_model, Some(MagneticModel::default()));
}

#[test]
fn test_stationary_attitude_sensor_absolute() {
    let report = run_absolute(&stationary(), 42).unwrap();
    assert_eq!(report.variant, "AttitudeSensor");
    // The first sample only anchors the session.
    assert_eq!(report.poses, 1000);
    assert!(report.final_position_error.unwrap() < 2.0);
    assert!(report.final_attitude_error.unwrap() < 0.02);
}

#[test]
fn test_stationary_attitude_sensor_relative() {
    let report = run_relative(&stationary(), 42).unwrap();
    assert_eq!(report.variant, "AttitudeSensor");
    assert_eq!(report.poses, 1000);
    assert!(report.final_position_error.unwrap() < 2.0);
    assert!(report.final_attitude_error.unwrap() < 0.02);
}

#[test]
fn test_stationary_fused_absolute_with_known_declination() {
    let mut scenario = stationary();
    scenario.absolute.use_attitude_sensor = false;
    scenario.absolute.use_double_fused_attitude_processor = false;
    scenario.absolute.fusion.magnetic_model = Some(MagneticModel::default());

    let report = run_absolute(&scenario, 1).unwrap();
    assert_eq!(report.variant, "Fused");
    assert_eq!(report.poses, 1000);
    assert!(report.final_position_error.unwrap() < 5.0);
    assert!(report.final_attitude_error.unwrap() < 0.05);
}

#[test]
fn test_stationary_leveled_relative() {
    let mut scenario = stationary();
    scenario.relative.use_attitude_sensor = false;

    let report = run_relative(&scenario, 5).unwrap();
    assert_eq!(report.variant, "Leveled");
    assert_eq!(report.poses, 1000);
    assert!(report.final_position_error.unwrap() < 5.0);
    assert!(report.final_attitude_error.unwrap() < 0.05);
}

#[test]
fn test_same_seed_reproduces_run() {
    let scenario = stationary();
    assert_eq!(run_absolute(&scenario, 9).unwrap(), run_absolute(&scenario, 9).unwrap());
}

#[test]
fn test_driving_double_fused_tracks_truth() {
    let scenario = load_scenario(&scenario_path("driving.toml")).unwrap();
    let report = run_absolute(&scenario, 7).unwrap();
    assert_eq!(report.variant, "DoubleFused");
    assert_eq!(report.poses, 2000);
    assert!(report.final_position_error.unwrap() < 50.0);
    assert!(report.final_attitude_error.unwrap() < 0.1);
}

#[test]
fn test_missing_source_is_reported() {
    let (attitude, attitude_handle) = ReplaySource::unavailable(SourceKind::Attitude);
    let (gravity, gravity_handle) = ReplaySource::new(SourceKind::Gravity);
    let (accelerometer, accelerometer_handle) = ReplaySource::new(SourceKind::Accelerometer);
    let sources = SourceSet::new(Box::new(attitude), Box::new(gravity), Box::new(accelerometer));

    let result = run_absolute_with(
        &stationary(),
        0,
        sources,
        vec![attitude_handle, gravity_handle, accelerometer_handle],
    );
    assert!(matches!(
        result,
        Err(SimError::SourceNotStarted(SourceKind::Attitude))
    ));
}

#[test]
fn test_invalid_scenario_is_rejected() {
    let mut scenario = stationary();
    scenario.simulation.rate_hz = 0.0;
    assert!(matches!(
        run_relative(&scenario, 0),
        Err(SimError::InvalidScenario(_))
    ));
}
