//! Top-level graph building for the two Sankey views.
//!
//! Both views fold every eligible edge into a [`FlowGraph`] and recode it
//! exactly once, after the last edge, so link indices always refer to the
//! final label list.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::{
    Result,
    connection::{EdgeOutcome, SkipReason, parse_edge},
    error::{ClusterDataError, GeoflowError},
    graph::{FlowGraph, SankeyGraph},
    model::{Cluster, UNSAMPLED_LABEL},
    options::FilterOptions,
};

/// Which Sankey view to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Flows within one lineage, labelled by the lineage's known countries.
    Lineage(String),
    /// Flows touching the filter country across every lineage.
    Country,
}

/// Counters describing one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationStats {
    edges: usize,
    connections: usize,
    skipped: BTreeMap<SkipReason, usize>,
}

impl AggregationStats {
    /// Edges visited.
    #[must_use]
    pub fn edges(&self) -> usize {
        self.edges
    }

    /// Edges that contributed at least one link.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections
    }

    /// Edges skipped for `reason`.
    #[must_use]
    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    /// Edges skipped for any reason.
    #[must_use]
    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Skip counts per reason, in [`SkipReason::ALL`] order, omitting
    /// reasons that never occurred.
    pub fn skipped_by_reason(&self) -> impl Iterator<Item = (SkipReason, usize)> + '_ {
        SkipReason::ALL
            .into_iter()
            .map(|reason| (reason, self.skipped(reason)))
            .filter(|(_, count)| *count > 0)
    }

    fn record(&mut self, outcome: &EdgeOutcome<'_>) {
        self.edges += 1;
        match outcome.skip_reason() {
            Some(reason) => *self.skipped.entry(reason).or_insert(0) += 1,
            None => self.connections += 1,
        }
    }
}

/// Graph produced by one pass together with its counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    /// Recoded graph, colours not yet assigned.
    pub graph: SankeyGraph,
    /// Per-pass counters.
    pub stats: AggregationStats,
}

/// Builds the Sankey graph for `view` over `clusters`.
///
/// # Errors
/// Returns [`GeoflowError::UnknownLineage`] when the lineage view names a
/// lineage absent from `clusters`, [`GeoflowError::MissingCountryFilter`]
/// when the country view is requested without a filter,
/// [`GeoflowError::ClusterData`] when an edge references inconsistent node
/// data, and [`GeoflowError::MissingLabel`] when a link endpoint has no label.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
/// use geoflow_core::{
///     Cluster, CountryCounts, Edge, FilterOptions, SequenceRecord, View, build_graph,
/// };
///
/// let mut nodes = BTreeMap::new();
/// nodes.insert("A1".to_owned(), vec![SequenceRecord::new("", "", "x/Canada/001/2020")]);
/// nodes.insert("B1".to_owned(), vec![SequenceRecord::new("", "", "x/USA/002/2020")]);
/// let cluster = Cluster::new(
///     "B.1",
///     nodes,
///     vec![Edge::new("A1", "B1", 0.1, Some(50.0))],
///     CountryCounts::from_pairs([("Canada", 1), ("USA", 1)]),
/// );
///
/// let aggregation = build_graph(
///     &[cluster],
///     &View::Lineage("B.1".to_owned()),
///     &FilterOptions::default(),
/// )?;
/// assert_eq!(aggregation.graph.label, ["Canada", "USA"]);
/// assert_eq!(aggregation.graph.link.source, [0]);
/// assert_eq!(aggregation.graph.link.target, [1]);
/// assert_eq!(aggregation.graph.link.value, [1]);
/// # Ok::<(), geoflow_core::GeoflowError>(())
/// ```
#[instrument(
    name = "core.build_graph",
    err,
    skip(clusters, options),
    fields(clusters = clusters.len()),
)]
pub fn build_graph(
    clusters: &[Cluster],
    view: &View,
    options: &FilterOptions,
) -> Result<Aggregation> {
    let aggregation = match view {
        View::Lineage(lineage) => {
            let cluster = clusters
                .iter()
                .find(|cluster| cluster.lineage() == lineage)
                .ok_or_else(|| GeoflowError::UnknownLineage {
                    lineage: Arc::from(lineage.as_str()),
                })?;
            build_lineage_graph(cluster, options)?
        }
        View::Country => {
            let country = options
                .country_filter()
                .ok_or(GeoflowError::MissingCountryFilter)?;
            build_country_graph(clusters, country, options)?
        }
    };

    info!(
        lineage = aggregation.graph.lineage.as_str(),
        labels = aggregation.graph.label.len(),
        links = aggregation.graph.link.len(),
        edges = aggregation.stats.edges(),
        skipped = aggregation.stats.total_skipped(),
        "graph built"
    );
    Ok(aggregation)
}

/// Builds the single-lineage view.
///
/// Labels are fixed up front from the cluster's country mapping, followed by
/// the unsampled label when unsampled nodes are included. Any country filter
/// in `options` is ignored.
///
/// # Errors
/// Returns [`GeoflowError::ClusterData`] for inconsistent node data and
/// [`GeoflowError::MissingLabel`] when a link endpoint is not among the
/// cluster's countries.
#[instrument(
    name = "core.build_lineage_graph",
    err,
    skip(cluster, options),
    fields(lineage = cluster.lineage(), edges = cluster.edges().len()),
)]
pub fn build_lineage_graph(cluster: &Cluster, options: &FilterOptions) -> Result<Aggregation> {
    let mut graph = FlowGraph::new(cluster.lineage());
    for country in cluster.countries().countries() {
        graph.push_label(country);
    }
    if options.include_unsampled() {
        graph.push_label(UNSAMPLED_LABEL);
    }

    let mut stats = AggregationStats::default();
    fold_cluster(
        cluster,
        options,
        None,
        LabelPolicy::Fixed,
        &mut graph,
        &mut stats,
    )?;

    Ok(Aggregation {
        graph: graph.recode()?,
        stats,
    })
}

/// Builds the cross-lineage view for `country`.
///
/// Labels are discovered as connections are accepted: the source first,
/// then each target, each the first time it is seen.
/// Every link touches `country`: when the source is another country, only
/// the targets equal to `country` contribute.
///
/// # Errors
/// Returns [`GeoflowError::EmptyCountryFilter`] for a blank `country` and
/// [`GeoflowError::ClusterData`] for inconsistent node data.
#[instrument(
    name = "core.build_country_graph",
    err,
    skip(clusters, options),
    fields(clusters = clusters.len()),
)]
pub fn build_country_graph(
    clusters: &[Cluster],
    country: &str,
    options: &FilterOptions,
) -> Result<Aggregation> {
    if country.trim().is_empty() {
        return Err(GeoflowError::EmptyCountryFilter);
    }

    let mut graph = FlowGraph::new(country);
    let mut stats = AggregationStats::default();
    for cluster in clusters {
        fold_cluster(
            cluster,
            options,
            Some(country),
            LabelPolicy::Discover,
            &mut graph,
            &mut stats,
        )?;
    }

    Ok(Aggregation {
        graph: graph.recode()?,
        stats,
    })
}

/// How labels reach the graph during a fold.
#[derive(Debug, Clone, Copy)]
enum LabelPolicy {
    /// Labels were registered before folding.
    Fixed,
    /// Each accepted connection registers its countries.
    Discover,
}

fn fold_cluster(
    cluster: &Cluster,
    options: &FilterOptions,
    country_filter: Option<&str>,
    labels: LabelPolicy,
    graph: &mut FlowGraph,
    stats: &mut AggregationStats,
) -> Result<()> {
    for edge in cluster.edges() {
        let outcome = parse_edge(edge, cluster, options, country_filter)
            .map_err(|error| cluster_error(cluster, error))?;
        stats.record(&outcome);
        if let Some(reason) = outcome.skip_reason() {
            debug!(
                lineage = cluster.lineage(),
                source = edge.source(),
                target = edge.target(),
                reason = reason.as_str(),
                "edge skipped"
            );
        }
        // A connection without targets still labels its source.
        if let EdgeOutcome::Connection(connection) = outcome {
            if matches!(labels, LabelPolicy::Discover) {
                graph.push_connection_labels(&connection);
            }
            graph.accumulate(&connection);
        }
    }
    Ok(())
}

fn cluster_error(cluster: &Cluster, error: ClusterDataError) -> GeoflowError {
    GeoflowError::ClusterData {
        lineage: Arc::from(cluster.lineage()),
        error,
    }
}
