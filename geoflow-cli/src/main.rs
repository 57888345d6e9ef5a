//! `geoflow` binary.
//!
//! Loads a cluster set, aggregates the lineage or country view, and prints
//! the coloured Sankey graph as a single JSON document on stdout. Any failure
//! exits with status 1 after one `error` event on stderr naming the stage
//! that failed (`input`, `aggregation` or `output`) and, for aggregation
//! failures, the stable error codes.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use geoflow_cli::{
    cli::{Cli, CliError, render_summary, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let summary = run_cli(cli).context("failed to build Sankey graph")?;
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    render_summary(&summary, &mut writer).context("failed to write graph JSON")?;
    writer.flush().context("failed to flush stdout")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main() {
        report_failure(&err);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Logs `err` with the failing stage; rendering errors carry no `CliError`.
fn report_failure(err: &anyhow::Error) {
    let cli_error = err.downcast_ref::<CliError>();
    let stage = cli_error.map_or("output", CliError::stage);
    let code = cli_error
        .and_then(CliError::code)
        .map(|code| field::display(code.as_str()));
    let cluster_data_code = cli_error
        .and_then(CliError::cluster_data_code)
        .map(|code| field::display(code.as_str()));

    error!(
        error = %err,
        stage,
        code,
        cluster_data_code,
        "geoflow failed"
    );
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
