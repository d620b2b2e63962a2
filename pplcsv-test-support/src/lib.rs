//! Shared test utilities used across pplcsv crates.

pub mod scorers;
pub mod tracing;
