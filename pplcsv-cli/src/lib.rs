//! Support library for the pplcsv CLI binary.
//!
//! Exposes the command pipeline, configuration loading, and logging setup so
//! doctests and integration tests can drive a run without spawning a process.

pub mod cli;
pub mod logging;
pub mod settings;
