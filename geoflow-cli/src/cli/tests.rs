//! Unit tests for the CLI commands and cluster loading.

use super::test_helpers::{
    create_cluster_file, create_gzip_cluster_file, create_text_file, create_xz_cluster_file,
    run_cli_expecting_error, run_command_expecting_error, temp_dir, two_lineages,
};
use super::{
    Cli, CliError, Command, CountryArgs, ExecutionSummary, FilterArgs, InputEncoding, LineageArgs,
    OutputArgs, load_clusters, render_summary, run_cli,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use geoflow_core::{AggregationStats, GeoflowError, SkipReason};
use geoflow_test_support::fixtures::ClusterBuilder;
use geoflow_test_support::tracing::RecordingLayer;
use rstest::rstest;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn lineage_command(input: PathBuf, lineage: &str, filters: FilterArgs) -> Command {
    Command::Lineage(LineageArgs {
        input,
        lineage: lineage.into(),
        filters,
        output: OutputArgs::default(),
    })
}

fn country_command(input: PathBuf, country: &str, filters: FilterArgs) -> Command {
    Command::Country(CountryArgs {
        input,
        country: country.into(),
        filters,
        output: OutputArgs::default(),
    })
}

#[rstest]
fn lineage_command_builds_single_lineage_graph() -> TestResult {
    let dir = temp_dir();
    let path = create_cluster_file(&dir, "clusters.json", &two_lineages())?;
    let summary = run_cli(Cli {
        command: lineage_command(path, "B.1", FilterArgs::default()),
    })?;

    assert_eq!(summary.graph.lineage, "B.1");
    assert_eq!(summary.graph.label, ["Canada", "Mexico", "USA"]);
    assert_eq!(summary.graph.link.source, [0, 0]);
    assert_eq!(summary.graph.link.target, [1, 2]);
    assert_eq!(summary.graph.link.value, [1, 1]);
    assert_eq!(summary.graph.color, ["#808080"; 3]);
    assert!(summary.graph.is_renderable());
    Ok(())
}

#[rstest]
fn country_command_aggregates_across_lineages() -> TestResult {
    let dir = temp_dir();
    let path = create_cluster_file(&dir, "clusters.json", &two_lineages())?;
    let summary = run_cli(Cli {
        command: country_command(path, "Mexico", FilterArgs::default()),
    })?;

    assert_eq!(summary.graph.lineage, "Mexico");
    assert_eq!(summary.graph.label, ["Mexico", "USA", "Canada"]);
    assert_eq!(summary.graph.link.source, [0, 2]);
    assert_eq!(summary.graph.link.target, [1, 0]);
    assert_eq!(summary.graph.link.value, [1, 1]);
    assert_eq!(summary.stats.edges(), 3);
    assert_eq!(summary.stats.connections(), 2);
    assert_eq!(summary.stats.skipped(SkipReason::CountryFilterMismatch), 1);
    Ok(())
}

#[rstest]
#[case::community_kept(false, vec![0, 1])]
#[case::community_dropped(true, vec![1])]
fn exclude_community_flag_reaches_core(
    #[case] exclude: bool,
    #[case] expected_targets: Vec<usize>,
) -> TestResult {
    let cluster = ClusterBuilder::new("B.1")
        .node("C1", &["Canada"])
        .node("X1", &["Canada", "USA"])
        .edge("C1", "X1")
        .build();
    let dir = temp_dir();
    let path = create_cluster_file(&dir, "clusters.json", &[cluster])?;
    let filters = FilterArgs {
        exclude_community_transmission: exclude,
        ..FilterArgs::default()
    };
    let summary = run_cli(Cli {
        command: lineage_command(path, "B.1", filters),
    })?;

    assert_eq!(summary.graph.label, ["Canada", "USA"]);
    assert_eq!(summary.graph.link.target, expected_targets);
    assert!(summary.graph.link.source.iter().all(|source| *source == 0));
    assert!(summary.graph.link.value.iter().all(|value| *value == 1));
    Ok(())
}

#[rstest]
fn include_unsampled_flag_adds_unsampled_label() -> TestResult {
    let cluster = ClusterBuilder::new("B.1")
        .node("C1", &["Canada"])
        .edge("C1", "unsampled1")
        .build();
    let dir = temp_dir();
    let path = create_cluster_file(&dir, "clusters.json", &[cluster])?;
    let filters = FilterArgs {
        include_unsampled: true,
        ..FilterArgs::default()
    };
    let summary = run_cli(Cli {
        command: lineage_command(path, "B.1", filters),
    })?;

    assert_eq!(summary.graph.label, ["Canada", "unsampled"]);
    assert_eq!(summary.graph.link.source, [0]);
    assert_eq!(summary.graph.link.target, [1]);
    Ok(())
}

#[rstest]
fn allow_multiple_sources_flag_accepts_ambiguous_source() -> TestResult {
    let cluster = ClusterBuilder::new("B.1")
        .node("X1", &["Canada", "USA"])
        .node("M1", &["Mexico"])
        .edge("X1", "M1")
        .build();
    let dir = temp_dir();
    let path = create_cluster_file(&dir, "clusters.json", &[cluster])?;

    let rejected = run_cli(Cli {
        command: lineage_command(path.clone(), "B.1", FilterArgs::default()),
    })?;
    assert!(rejected.graph.link.is_empty());
    assert_eq!(rejected.stats.skipped(SkipReason::AmbiguousSource), 1);

    let accepted = run_cli(Cli {
        command: lineage_command(
            path,
            "B.1",
            FilterArgs {
                allow_multiple_sources: true,
                ..FilterArgs::default()
            },
        ),
    })?;
    assert_eq!(accepted.graph.link.len(), 1);
    Ok(())
}

#[rstest]
fn gzip_input_is_decompressed() -> TestResult {
    let dir = temp_dir();
    let path = create_gzip_cluster_file(&dir, "clusters.json.gz", &two_lineages())?;
    let clusters = load_clusters(&path)?;
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[1].lineage(), "B.1");
    Ok(())
}

#[rstest]
fn xz_input_is_decompressed() -> TestResult {
    let dir = temp_dir();
    let path = create_xz_cluster_file(&dir, "clusters.json.xz", &two_lineages())?;
    let summary = run_cli(Cli {
        command: lineage_command(path, "A.1", FilterArgs::default()),
    })?;
    assert_eq!(summary.graph.label, ["Mexico", "USA"]);
    assert_eq!(summary.graph.link.len(), 1);
    Ok(())
}

#[rstest]
#[case::plain("clusters.json", InputEncoding::Plain)]
#[case::gzip("clusters.json.gz", InputEncoding::Gzip)]
#[case::upper("CLUSTERS.JSON.GZ", InputEncoding::Gzip)]
#[case::xz("clusters.json.xz", InputEncoding::Xz)]
#[case::no_extension("clusters", InputEncoding::Plain)]
#[case::gz_in_stem("clusters.gz.json", InputEncoding::Plain)]
fn input_encoding_follows_final_extension(
    #[case] raw_path: &str,
    #[case] expected: InputEncoding,
) {
    assert_eq!(InputEncoding::from_path(Path::new(raw_path)), expected);
}

#[rstest]
fn unknown_lineage_is_reported() -> TestResult {
    let dir = temp_dir();
    let path = create_cluster_file(&dir, "clusters.json", &two_lineages())?;
    let err = run_cli_expecting_error(
        Cli {
            command: lineage_command(path, "Z.9", FilterArgs::default()),
        },
        "unknown lineage must fail",
    );
    assert!(matches!(
        err,
        CliError::Core(GeoflowError::UnknownLineage { ref lineage }) if lineage.as_ref() == "Z.9"
    ));
    Ok(())
}

#[rstest]
#[case::empty("")]
#[case::blank("   ")]
fn blank_country_is_rejected(#[case] country: &str) -> TestResult {
    let dir = temp_dir();
    let path = create_cluster_file(&dir, "clusters.json", &two_lineages())?;
    let err = run_command_expecting_error(
        country_command(path, country, FilterArgs::default()),
        "blank country must fail",
    );
    assert!(matches!(
        err,
        CliError::Core(GeoflowError::EmptyCountryFilter)
    ));
    Ok(())
}

#[rstest]
fn missing_input_is_an_io_error() {
    let dir = temp_dir();
    let missing = dir.path().join("missing.json");
    let err = run_command_expecting_error(
        lineage_command(missing.clone(), "B.1", FilterArgs::default()),
        "missing input must fail",
    );
    match err {
        CliError::Io { path, .. } => assert_eq!(path, missing),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
#[case::not_json("clusters.json", "not json")]
#[case::wrong_shape("clusters.json", "{\"lineage\": \"B.1\"}")]
#[case::bad_edge("clusters.json", "[{\"lineage\": \"B.1\", \"nodes\": {}, \"edges\": [[\"A1\"]], \"country\": {}}]")]
fn malformed_input_is_a_json_error(#[case] name: &str, #[case] contents: &str) -> TestResult {
    let dir = temp_dir();
    let path = create_text_file(&dir, name, contents)?;
    let err = run_command_expecting_error(
        lineage_command(path, "B.1", FilterArgs::default()),
        "malformed input must fail",
    );
    assert!(matches!(err, CliError::Json { .. }));
    Ok(())
}

#[rstest]
fn inconsistent_cluster_surfaces_cluster_data_code() -> TestResult {
    let cluster = ClusterBuilder::new("B.1")
        .node("C1", &["Canada"])
        .edge("C1", "ghost")
        .build();
    let dir = temp_dir();
    let path = create_cluster_file(&dir, "clusters.json", &[cluster])?;
    let err = run_command_expecting_error(
        lineage_command(path, "B.1", FilterArgs::default()),
        "unknown node must fail",
    );
    let CliError::Core(core) = err else {
        panic!("expected a core error, got {err:?}");
    };
    assert_eq!(core.code().as_str(), "GEOFLOW_CLUSTER_DATA_FAILURE");
    assert_eq!(
        core.cluster_data_code().map(|code| code.as_str()),
        Some("CLUSTER_DATA_UNKNOWN_NODE")
    );
    Ok(())
}

#[rstest]
fn render_summary_writes_compact_json_line() -> TestResult {
    let dir = temp_dir();
    let path = create_cluster_file(&dir, "clusters.json", &two_lineages())?;
    let summary = run_cli(Cli {
        command: lineage_command(path, "A.1", FilterArgs::default()),
    })?;

    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    let text = String::from_utf8(buffer)?;
    assert_eq!(text.lines().count(), 1);
    assert!(text.ends_with('\n'));
    let value: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(
        value,
        serde_json::json!({
            "lineage": "A.1",
            "label": ["Mexico", "USA"],
            "color": ["#808080", "#808080"],
            "link": {"source": [0], "target": [1], "value": [1]},
        })
    );
    Ok(())
}

#[rstest]
fn render_summary_pretty_prints_on_request() -> TestResult {
    let mut graph = geoflow_core::FlowGraph::new("B.1");
    graph.push_label("Canada");
    let summary = ExecutionSummary {
        graph: graph.recode()?.with_colors(vec!["red".into()])?,
        stats: AggregationStats::default(),
        pretty: true,
    };
    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    let text = String::from_utf8(buffer)?;
    assert!(text.lines().count() > 1);
    assert!(text.contains("  \"lineage\": \"B.1\""));
    Ok(())
}

#[rstest]
fn clap_parses_lineage_defaults() {
    let cli = Cli::try_parse_from(["geoflow", "lineage", "clusters.json", "--lineage", "B.1"])
        .expect("arguments must parse");
    let Command::Lineage(args) = cli.command else {
        panic!("expected the lineage command");
    };
    assert_eq!(args.input, PathBuf::from("clusters.json"));
    assert_eq!(args.lineage, "B.1");
    assert!(!args.filters.include_unsampled);
    assert!(!args.filters.exclude_community_transmission);
    assert!(!args.filters.allow_multiple_sources);
    assert_eq!(args.output.node_color, "#808080");
    assert!(!args.output.pretty);
}

#[rstest]
fn clap_parses_country_flags() {
    let cli = Cli::try_parse_from([
        "geoflow",
        "country",
        "clusters.json.gz",
        "--country",
        "Mexico",
        "--include-unsampled",
        "--exclude-community-transmission",
        "--allow-multiple-sources",
        "--node-color",
        "steelblue",
        "--pretty",
    ])
    .expect("arguments must parse");
    let Command::Country(args) = cli.command else {
        panic!("expected the country command");
    };
    assert_eq!(args.country, "Mexico");
    assert!(args.filters.include_unsampled);
    assert!(args.filters.exclude_community_transmission);
    assert!(args.filters.allow_multiple_sources);
    assert_eq!(args.output.node_color, "steelblue");
    assert!(args.output.pretty);
}

#[rstest]
#[case::missing_lineage(&["geoflow", "lineage", "clusters.json"])]
#[case::missing_country(&["geoflow", "country", "clusters.json"])]
#[case::missing_input(&["geoflow", "lineage", "--lineage", "B.1"])]
#[case::unknown_command(&["geoflow", "render", "clusters.json"])]
fn clap_rejects_incomplete_arguments(#[case] args: &[&str]) {
    assert!(Cli::try_parse_from(args).is_err());
}

#[rstest]
fn run_cli_emits_tracing_fields() -> TestResult {
    let dir = temp_dir();
    let path = create_cluster_file(&dir, "clusters.json", &two_lineages())?;
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());

    let cli = Cli {
        command: country_command(path, "Mexico", FilterArgs::default()),
    };
    let summary = tracing::subscriber::with_default(subscriber, || run_cli(cli))?;
    assert_eq!(summary.graph.label.len(), 3);

    let run = layer.span("cli.run").expect("cli.run span must exist");
    assert_eq!(run.field("command"), Some("country"));

    let execute = layer.span("cli.execute").expect("cli.execute span must exist");
    assert!(
        execute
            .field("path")
            .is_some_and(|value| value.ends_with("clusters.json"))
    );

    let country = layer.span("cli.country").expect("cli.country span must exist");
    assert_eq!(country.field("country"), Some("Mexico"));

    let load = layer
        .span("cli.load_clusters")
        .expect("cli.load_clusters span must exist");
    assert_eq!(load.field("encoding"), Some("plain"));
    assert_eq!(load.field("clusters"), Some("2"));

    assert!(layer.span("core.build_country_graph").is_some());

    let events = layer.events();
    assert!(events.iter().any(|event| {
        event.level == Level::INFO
            && event.message() == Some("command completed")
            && event.field("lineage") == Some("Mexico")
            && event.field("skipped") == Some("1")
    }));
    assert!(events.iter().any(|event| {
        event.level == Level::INFO
            && event.message() == Some("edges skipped")
            && event.field("reason") == Some("country_filter_mismatch")
            && event.field("count") == Some("1")
    }));
    assert_eq!(
        events
            .iter()
            .filter(|event| event.message() == Some("edges skipped"))
            .count(),
        1
    );
    Ok(())
}

#[rstest]
fn load_clusters_records_path_on_error() {
    let dir = temp_dir();
    let missing = dir.path().join("missing.json.gz");
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());

    let err = tracing::subscriber::with_default(subscriber, || load_clusters(&missing))
        .expect_err("missing file must fail");
    assert!(matches!(err, CliError::Io { .. }));

    let load = layer
        .span("cli.load_clusters")
        .expect("cli.load_clusters span must exist");
    assert!(
        load.field("path")
            .is_some_and(|value| value.ends_with("missing.json.gz"))
    );
    assert_eq!(load.field("encoding"), None);
    let message = err.to_string();
    assert!(layer.events().iter().any(|event| {
        event.level == Level::ERROR && event.field("error") == Some(message.as_str())
    }));
}

#[rstest]
fn cluster_data_error_keeps_lineage_context() -> TestResult {
    let cluster = ClusterBuilder::new("B.1")
        .node("C1", &["Canada"])
        .edge("C1", "ghost")
        .build();
    let dir = temp_dir();
    let path = create_cluster_file(&dir, "clusters.json", &[cluster])?;
    let err = run_command_expecting_error(
        lineage_command(path, "B.1", FilterArgs::default()),
        "unknown node must fail",
    );
    assert!(matches!(
        err,
        CliError::Core(GeoflowError::ClusterData { ref lineage, .. })
            if *lineage == Arc::<str>::from("B.1")
    ));
    Ok(())
}

#[rstest]
fn cli_error_reports_stage_and_codes() -> TestResult {
    let dir = temp_dir();
    let missing = run_command_expecting_error(
        lineage_command(dir.path().join("missing.json"), "B.1", FilterArgs::default()),
        "missing input must fail",
    );
    assert_eq!(missing.stage(), "input");
    assert_eq!(missing.code(), None);

    let cluster = ClusterBuilder::new("B.1")
        .node("C1", &["Canada"])
        .edge("C1", "ghost")
        .build();
    let path = create_cluster_file(&dir, "clusters.json", &[cluster])?;
    let dangling = run_command_expecting_error(
        lineage_command(path, "B.1", FilterArgs::default()),
        "unknown node must fail",
    );
    assert_eq!(dangling.stage(), "aggregation");
    assert_eq!(
        dangling.code().map(|code| code.as_str()),
        Some("GEOFLOW_CLUSTER_DATA_FAILURE")
    );
    assert_eq!(
        dangling.cluster_data_code().map(|code| code.as_str()),
        Some("CLUSTER_DATA_UNKNOWN_NODE")
    );
    Ok(())
}
