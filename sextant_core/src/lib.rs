// sextant_core/src/lib.rs

// This file defines the public modules of the library.
pub mod config;
pub mod error;
pub mod estimation;
pub mod frames;
pub mod fusion;
pub mod geodesy;
pub mod magnetic;
pub mod measurements;
pub mod prelude;
pub mod processors;
pub mod source;
pub mod types;
