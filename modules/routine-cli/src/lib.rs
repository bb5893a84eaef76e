//! Runs JSON-described routines against a set of demo controls.

pub mod config;
pub mod controls;
pub mod runner;

pub use config::Config;
pub use controls::demo_controls;
pub use runner::{load_script, read_source, run_script, RunReport, RunResult};
