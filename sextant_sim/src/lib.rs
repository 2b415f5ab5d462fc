// sextant_sim/src/lib.rs

// Simulation harness for the sextant_core estimators.
pub mod cli;
pub mod config;
pub mod error;
pub mod prng;
pub mod replay;
pub mod run;
pub mod sensors;
pub mod trajectory;
