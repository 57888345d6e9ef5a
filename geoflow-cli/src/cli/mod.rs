//! Command-line interface orchestration for geoflow.
//!
//! Two commands share one pipeline: load a cluster set from JSON, fold its
//! edges for the requested view, colour the nodes, and render the Sankey
//! graph as JSON.

mod commands;

pub use commands::{
    Cli, CliError, Command, CountryArgs, ExecutionSummary, FilterArgs, InputEncoding, LineageArgs,
    OutputArgs, load_clusters, render_summary, run_cli,
};

#[cfg(test)]
mod test_helpers;
#[cfg(test)]
mod tests;
