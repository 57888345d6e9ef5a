//! Shared test utilities used across geoflow crates.

pub mod fixtures;
pub mod tracing;
