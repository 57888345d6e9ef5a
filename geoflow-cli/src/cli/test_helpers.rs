//! Small helpers shared across CLI tests.
//!
//! The CLI unit tests write cluster sets to temporary files and assert on
//! the resulting graphs or errors. These helpers keep the cases concise.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use flate2::{Compression, write::GzEncoder};
use geoflow_core::Cluster;
use geoflow_test_support::fixtures::{ClusterBuilder, clusters_json};
use tempfile::TempDir;
use xz2::write::XzEncoder;

use super::commands::run_command;
use super::{Cli, CliError, Command, run_cli};

pub(super) fn temp_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

pub(super) fn create_text_file(dir: &TempDir, name: &str, contents: &str) -> io::Result<PathBuf> {
    let path = dir.path().join(name);
    let mut file = File::create(&path)?;
    file.write_all(contents.as_bytes())?;
    Ok(path)
}

pub(super) fn create_cluster_file(
    dir: &TempDir,
    name: &str,
    clusters: &[Cluster],
) -> io::Result<PathBuf> {
    create_text_file(dir, name, &clusters_json(clusters))
}

pub(super) fn create_gzip_cluster_file(
    dir: &TempDir,
    name: &str,
    clusters: &[Cluster],
) -> io::Result<PathBuf> {
    let path = dir.path().join(name);
    let mut encoder = GzEncoder::new(File::create(&path)?, Compression::default());
    encoder.write_all(clusters_json(clusters).as_bytes())?;
    encoder.finish()?;
    Ok(path)
}

pub(super) fn create_xz_cluster_file(
    dir: &TempDir,
    name: &str,
    clusters: &[Cluster],
) -> io::Result<PathBuf> {
    let path = dir.path().join(name);
    let mut encoder = XzEncoder::new(File::create(&path)?, 6);
    encoder.write_all(clusters_json(clusters).as_bytes())?;
    encoder.finish()?;
    Ok(path)
}

/// Two lineages: Mexico exports to the USA in `A.1`, Canada exports to
/// Mexico and the USA in `B.1`.
pub(super) fn two_lineages() -> Vec<Cluster> {
    vec![
        ClusterBuilder::new("A.1")
            .node("M1", &["Mexico"])
            .node("U1", &["USA"])
            .edge("M1", "U1")
            .build(),
        ClusterBuilder::new("B.1")
            .node("C1", &["Canada"])
            .node("M2", &["Mexico"])
            .node("U2", &["USA"])
            .edge("C1", "M2")
            .edge("C1", "U2")
            .build(),
    ]
}

pub(super) fn run_cli_expecting_error(cli: Cli, panic_msg: &str) -> CliError {
    match run_cli(cli) {
        Ok(_) => panic!("{panic_msg}"),
        Err(err) => err,
    }
}

pub(super) fn run_command_expecting_error(cmd: Command, panic_msg: &str) -> CliError {
    match run_command(cmd) {
        Ok(_) => panic!("{panic_msg}"),
        Err(err) => err,
    }
}
