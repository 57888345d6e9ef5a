//! Command implementations and argument parsing for the geoflow CLI.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use flate2::read::GzDecoder;
use geoflow_core::{
    AggregationStats, Cluster, ClusterDataErrorCode, FilterOptions, FilterOptionsBuilder,
    GeoflowError, GeoflowErrorCode, SankeyGraph, View, build_graph,
};
use thiserror::Error;
use tracing::{Span, field, info, instrument};
use xz2::read::XzDecoder;

const DEFAULT_NODE_COLOR: &str = "#808080";

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "geoflow",
    about = "Aggregate cluster transmission edges into Sankey graph JSON."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build the flow graph for a single lineage.
    Lineage(LineageArgs),
    /// Build the flow graph touching one country across every lineage.
    Country(CountryArgs),
}

/// Options accepted by the `lineage` command.
#[derive(Debug, Args, Clone)]
pub struct LineageArgs {
    /// JSON array of clusters, optionally gzip (`.gz`) or xz (`.xz`) compressed.
    pub input: PathBuf,

    /// Lineage whose edges are aggregated.
    #[arg(long)]
    pub lineage: String,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Options accepted by the `country` command.
#[derive(Debug, Args, Clone)]
pub struct CountryArgs {
    /// JSON array of clusters, optionally gzip (`.gz`) or xz (`.xz`) compressed.
    pub input: PathBuf,

    /// Country every link must touch.
    #[arg(long)]
    pub country: String,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Edge filters shared by both commands.
#[derive(Debug, Args, Clone, Default)]
pub struct FilterArgs {
    /// Keep edges touching unsampled nodes.
    #[arg(long)]
    pub include_unsampled: bool,

    /// Drop links whose source and target share a country.
    #[arg(long)]
    pub exclude_community_transmission: bool,

    /// Accept source nodes backed by more than one sequence.
    #[arg(long)]
    pub allow_multiple_sources: bool,
}

impl FilterArgs {
    fn builder(&self) -> FilterOptionsBuilder {
        FilterOptions::builder()
            .with_include_unsampled(self.include_unsampled)
            .with_community_transmission(!self.exclude_community_transmission)
            .with_multiple_sources(self.allow_multiple_sources)
    }
}

/// Output options shared by both commands.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Colour applied to every node.
    #[arg(long, default_value = DEFAULT_NODE_COLOR)]
    pub node_color: String,

    /// Pretty-print the JSON graph.
    #[arg(long)]
    pub pretty: bool,
}

impl Default for OutputArgs {
    fn default() -> Self {
        Self {
            node_color: DEFAULT_NODE_COLOR.to_owned(),
            pretty: false,
        }
    }
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// File I/O failed while loading the cluster set.
    #[error("failed to open `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The cluster set was not valid JSON of the expected shape.
    #[error("failed to parse clusters from `{path}`: {source}")]
    Json {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
    /// Aggregation failed.
    #[error(transparent)]
    Core(#[from] GeoflowError),
}

impl CliError {
    /// Pipeline stage that failed: `input` while loading clusters,
    /// `aggregation` while building the graph.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Io { .. } | Self::Json { .. } => "input",
            Self::Core(_) => "aggregation",
        }
    }

    /// Stable code of an aggregation failure.
    #[must_use]
    pub const fn code(&self) -> Option<GeoflowErrorCode> {
        match self {
            Self::Core(core) => Some(core.code()),
            _ => None,
        }
    }

    /// Stable code of the cluster inconsistency behind an aggregation
    /// failure.
    #[must_use]
    pub const fn cluster_data_code(&self) -> Option<ClusterDataErrorCode> {
        match self {
            Self::Core(core) => core.cluster_data_code(),
            _ => None,
        }
    }
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Coloured graph ready for rendering.
    pub graph: SankeyGraph,
    /// Counters from the aggregation pass.
    pub stats: AggregationStats,
    /// Whether the graph is rendered with indentation.
    pub pretty: bool,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when the input cannot be loaded or aggregation fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use geoflow_cli::cli::{Cli, Command, FilterArgs, LineageArgs, OutputArgs, run_cli};
/// # use geoflow_test_support::fixtures::{ClusterBuilder, clusters_json};
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let cluster = ClusterBuilder::new("B.1")
///     .node("A1", &["Canada"])
///     .node("B1", &["USA"])
///     .edge("A1", "B1")
///     .build();
/// let file = NamedTempFile::new()?;
/// std::fs::write(file.path(), clusters_json(&[cluster]))?;
/// let cli = Cli {
///     command: Command::Lineage(LineageArgs {
///         input: file.path().to_path_buf(),
///         lineage: "B.1".into(),
///         filters: FilterArgs::default(),
///         output: OutputArgs::default(),
///     }),
/// };
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.graph.label, ["Canada", "USA"]);
/// assert_eq!(summary.graph.color, ["#808080", "#808080"]);
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    let command = match &cli.command {
        Command::Lineage(_) => "lineage",
        Command::Country(_) => "country",
    };
    Span::current().record("command", field::display(command));
    run_command(cli.command)
}

#[instrument(
    name = "cli.execute",
    err,
    skip(command),
    fields(path = field::Empty),
)]
pub(super) fn run_command(command: Command) -> Result<ExecutionSummary, CliError> {
    let span = Span::current();
    let summary = match command {
        Command::Lineage(args) => {
            span.record("path", field::display(args.input.display()));
            run_lineage(args)?
        }
        Command::Country(args) => {
            span.record("path", field::display(args.input.display()));
            run_country(args)?
        }
    };

    info!(
        lineage = summary.graph.lineage.as_str(),
        labels = summary.graph.label.len(),
        links = summary.graph.link.len(),
        skipped = summary.stats.total_skipped(),
        "command completed"
    );
    for (reason, count) in summary.stats.skipped_by_reason() {
        info!(reason = reason.as_str(), count, "edges skipped");
    }
    Ok(summary)
}

#[instrument(
    name = "cli.lineage",
    err,
    skip(args),
    fields(lineage = field::Empty),
)]
pub(super) fn run_lineage(args: LineageArgs) -> Result<ExecutionSummary, CliError> {
    let LineageArgs {
        input,
        lineage,
        filters,
        output,
    } = args;
    Span::current().record("lineage", field::display(&lineage));
    let options = filters.builder().build()?;
    let clusters = load_clusters(&input)?;
    summarise(&clusters, &View::Lineage(lineage), &options, output)
}

#[instrument(
    name = "cli.country",
    err,
    skip(args),
    fields(country = field::Empty),
)]
pub(super) fn run_country(args: CountryArgs) -> Result<ExecutionSummary, CliError> {
    let CountryArgs {
        input,
        country,
        filters,
        output,
    } = args;
    Span::current().record("country", field::display(&country));
    let options = filters.builder().with_country_filter(country).build()?;
    let clusters = load_clusters(&input)?;
    summarise(&clusters, &View::Country, &options, output)
}

fn summarise(
    clusters: &[Cluster],
    view: &View,
    options: &FilterOptions,
    output: OutputArgs,
) -> Result<ExecutionSummary, CliError> {
    let aggregation = build_graph(clusters, view, options)?;
    let OutputArgs { node_color, pretty } = output;
    let mut graph = aggregation.graph;
    graph.assign_colors(|_| node_color.clone());
    Ok(ExecutionSummary {
        graph,
        stats: aggregation.stats,
        pretty,
    })
}

/// Compression applied to a cluster file, chosen by its final extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEncoding {
    /// Uncompressed JSON.
    Plain,
    /// `.gz`
    Gzip,
    /// `.xz`
    Xz,
}

impl InputEncoding {
    /// Picks the encoding from the extension of `path`, ignoring case.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(OsStr::to_str) {
            Some(extension) if extension.eq_ignore_ascii_case("gz") => Self::Gzip,
            Some(extension) if extension.eq_ignore_ascii_case("xz") => Self::Xz,
            _ => Self::Plain,
        }
    }

    /// Stable lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Gzip => "gzip",
            Self::Xz => "xz",
        }
    }
}

/// Reads a JSON array of clusters from `path`.
///
/// Paths ending in `.gz` or `.xz` are decompressed on the fly.
///
/// # Errors
/// Returns [`CliError::Io`] when the file cannot be opened and
/// [`CliError::Json`] when its contents do not decode.
#[instrument(
    name = "cli.load_clusters",
    err,
    fields(path = field::Empty, encoding = field::Empty, clusters = field::Empty),
)]
pub fn load_clusters(path: &Path) -> Result<Vec<Cluster>, CliError> {
    let span = Span::current();
    span.record("path", field::display(path.display()));
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let encoding = InputEncoding::from_path(path);
    span.record("encoding", encoding.as_str());
    let buffered = BufReader::new(file);
    let reader: Box<dyn Read> = match encoding {
        InputEncoding::Plain => Box::new(buffered),
        InputEncoding::Gzip => Box::new(GzDecoder::new(buffered)),
        InputEncoding::Xz => Box::new(XzDecoder::new(buffered)),
    };

    let clusters: Vec<Cluster> =
        serde_json::from_reader(reader).map_err(|source| CliError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    span.record("clusters", clusters.len());
    Ok(clusters)
}

/// Renders the graph in `summary` to `writer` as JSON followed by a newline.
///
/// # Errors
/// Returns [`io::Error`] if serialisation or writing fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use geoflow_cli::cli::{ExecutionSummary, render_summary};
/// # use geoflow_core::{AggregationStats, FlowGraph};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let mut graph = FlowGraph::new("B.1");
/// graph.push_label("Canada");
/// let summary = ExecutionSummary {
///     graph: graph.recode()?.with_colors(vec!["red".into()])?,
///     stats: AggregationStats::default(),
///     pretty: false,
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// assert_eq!(
///     String::from_utf8(buffer)?,
///     "{\"lineage\":\"B.1\",\"label\":[\"Canada\"],\"color\":[\"red\"],\
///      \"link\":{\"source\":[],\"target\":[],\"value\":[]}}\n"
/// );
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    if summary.pretty {
        serde_json::to_writer_pretty(&mut writer, &summary.graph)?;
    } else {
        serde_json::to_writer(&mut writer, &summary.graph)?;
    }
    writeln!(writer)
}
