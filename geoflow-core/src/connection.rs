//! Turning a single tree edge into a country-level connection.

use std::fmt;

use crate::error::ClusterDataError;
use crate::model::{Cluster, Edge, UNSAMPLED_LABEL, is_unsampled};
use crate::node::{NodeKind, record_country, resolve_country};
use crate::options::FilterOptions;

/// Country-level view of one edge: a source and every target it fans out to.
///
/// Targets may repeat; repeated targets are merged when the connection is
/// accumulated into a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection<'a> {
    /// Country of the parent node.
    pub source_country: &'a str,
    /// Country of each record behind the child node.
    pub target_countries: Vec<&'a str>,
}

/// Why an edge did not produce a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// An endpoint is unsampled and unsampled nodes are excluded.
    UnsampledExcluded,
    /// Both endpoints are unsampled.
    BothUnsampled,
    /// An endpoint is present in the node mapping with no records.
    EmptyNode,
    /// The source node carries several records and multiple sources are
    /// not allowed.
    AmbiguousSource,
    /// Every target was dropped as community transmission. The edge still
    /// yields a connection so its source can be labelled.
    NoTargets,
    /// Neither endpoint matches the country filter.
    CountryFilterMismatch,
}

impl SkipReason {
    /// Every reason, in reporting order.
    pub const ALL: [Self; 6] = [
        Self::UnsampledExcluded,
        Self::BothUnsampled,
        Self::EmptyNode,
        Self::AmbiguousSource,
        Self::NoTargets,
        Self::CountryFilterMismatch,
    ];

    /// Stable snake-case name used in logs and summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnsampledExcluded => "unsampled_excluded",
            Self::BothUnsampled => "both_unsampled",
            Self::EmptyNode => "empty_node",
            Self::AmbiguousSource => "ambiguous_source",
            Self::NoTargets => "no_targets",
            Self::CountryFilterMismatch => "country_filter_mismatch",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of parsing one edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeOutcome<'a> {
    /// The edge contributes these links.
    Connection(Connection<'a>),
    /// The edge was filtered out.
    Skipped(SkipReason),
}

impl EdgeOutcome<'_> {
    /// Reason the edge contributes no link, if any.
    ///
    /// A connection whose targets were all dropped reports
    /// [`SkipReason::NoTargets`].
    #[must_use]
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Connection(connection) if connection.target_countries.is_empty() => {
                Some(SkipReason::NoTargets)
            }
            Self::Connection(_) => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }
}

/// Parses `edge` into a [`Connection`], applying the filters in `options`.
///
/// `country_filter` is passed separately from `options` because the
/// single-lineage view never filters by country.
///
/// # Errors
/// Returns [`ClusterDataError`] when an endpoint is missing from the node
/// mapping or a record name has no country component.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
/// use geoflow_core::{
///     Cluster, CountryCounts, Edge, EdgeOutcome, FilterOptions, SequenceRecord, parse_edge,
/// };
///
/// let mut nodes = BTreeMap::new();
/// nodes.insert("A1".to_owned(), vec![SequenceRecord::new("", "", "x/Canada/001/2020")]);
/// nodes.insert("B1".to_owned(), vec![SequenceRecord::new("", "", "x/USA/002/2020")]);
/// let cluster = Cluster::new("B.1", nodes, Vec::new(), CountryCounts::default());
/// let edge = Edge::new("A1", "B1", 0.1, Some(50.0));
///
/// let outcome = parse_edge(&edge, &cluster, &FilterOptions::default(), None)?;
/// let EdgeOutcome::Connection(connection) = outcome else {
///     panic!("edge must connect");
/// };
/// assert_eq!(connection.source_country, "Canada");
/// assert_eq!(connection.target_countries, ["USA"]);
/// # Ok::<(), geoflow_core::ClusterDataError>(())
/// ```
pub fn parse_edge<'a>(
    edge: &Edge,
    cluster: &'a Cluster,
    options: &FilterOptions,
    country_filter: Option<&str>,
) -> Result<EdgeOutcome<'a>, ClusterDataError> {
    let source_unsampled = is_unsampled(edge.source());
    let target_unsampled = is_unsampled(edge.target());
    if !options.include_unsampled() && (source_unsampled || target_unsampled) {
        return Ok(skip(SkipReason::UnsampledExcluded));
    }
    if source_unsampled && target_unsampled {
        return Ok(skip(SkipReason::BothUnsampled));
    }

    let Some(source) = resolve_country(edge.source(), cluster)? else {
        return Ok(skip(SkipReason::EmptyNode));
    };
    if !options.allow_multiple_sources() && source.record_count().is_some_and(|count| count > 1) {
        return Ok(skip(SkipReason::AmbiguousSource));
    }
    let Some(target) = resolve_country(edge.target(), cluster)? else {
        return Ok(skip(SkipReason::EmptyNode));
    };

    let source_country = source.country();
    let mut target_countries =
        target_countries(edge.target(), target, source_country, options)?;

    if let Some(filter) = country_filter {
        let touches_filter =
            source_country == filter || target_countries.iter().any(|country| *country == filter);
        if !touches_filter {
            return Ok(skip(SkipReason::CountryFilterMismatch));
        }
        // Every link must touch the filter country.
        if source_country != filter {
            target_countries.retain(|country| *country == filter);
        }
    }

    Ok(EdgeOutcome::Connection(Connection {
        source_country,
        target_countries,
    }))
}

fn target_countries<'a>(
    node_id: &str,
    target: NodeKind<'a>,
    source_country: &str,
    options: &FilterOptions,
) -> Result<Vec<&'a str>, ClusterDataError> {
    let NodeKind::Sampled { records, .. } = target else {
        return Ok(vec![UNSAMPLED_LABEL]);
    };

    let mut countries = Vec::with_capacity(records.len());
    for record in records {
        let country = record_country(node_id, record)?;
        if !options.include_community_transmission() && country == source_country {
            continue;
        }
        countries.push(country);
    }
    Ok(countries)
}

const fn skip<'a>(reason: SkipReason) -> EdgeOutcome<'a> {
    EdgeOutcome::Skipped(reason)
}
