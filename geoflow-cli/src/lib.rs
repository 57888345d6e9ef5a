//! Support library for the geoflow CLI binary.
//!
//! Exposes the command pipeline and logging setup so integration tests can
//! drive the CLI without forking a subprocess.

pub mod cli;
pub mod logging;
