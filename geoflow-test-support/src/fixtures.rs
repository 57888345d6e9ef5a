//! Builders for small clusters used across geoflow tests.

use std::collections::BTreeMap;

use geoflow_core::{Cluster, CountryCounts, Edge, SequenceRecord};

/// Builds a [`SequenceRecord`] whose name encodes `country`.
///
/// # Examples
/// ```
/// use geoflow_test_support::fixtures::record;
///
/// assert_eq!(record("Canada", 1).country(), Some("Canada"));
/// ```
#[must_use]
pub fn record(country: &str, serial: usize) -> SequenceRecord {
    SequenceRecord::new(
        "2020-03-01",
        format!("EPI_ISL_{serial}"),
        format!("hCoV-19/{country}/{serial:03}/2020"),
    )
}

/// Fluent builder for [`Cluster`] fixtures.
///
/// Nodes are declared with the countries of their records; the country
/// mapping is derived from those records in first-seen order unless set
/// explicitly.
///
/// # Examples
/// ```
/// use geoflow_test_support::fixtures::ClusterBuilder;
///
/// let cluster = ClusterBuilder::new("B.1")
///     .node("A1", &["Canada"])
///     .node("B1", &["USA"])
///     .edge("A1", "B1")
///     .build();
/// assert_eq!(cluster.countries().countries().collect::<Vec<_>>(), ["Canada", "USA"]);
/// assert_eq!(cluster.edges().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ClusterBuilder {
    lineage: String,
    nodes: BTreeMap<String, Vec<SequenceRecord>>,
    edges: Vec<Edge>,
    countries: Option<Vec<(String, u64)>>,
    serial: usize,
}

impl ClusterBuilder {
    /// Starts an empty cluster for `lineage`.
    #[must_use]
    pub fn new(lineage: &str) -> Self {
        Self {
            lineage: lineage.to_owned(),
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            countries: None,
            serial: 0,
        }
    }

    /// Adds node `id` with one record per entry of `countries`.
    #[must_use]
    pub fn node(mut self, id: &str, countries: &[&str]) -> Self {
        let mut records = Vec::with_capacity(countries.len());
        for country in countries {
            self.serial += 1;
            records.push(record(country, self.serial));
        }
        self.nodes.insert(id.to_owned(), records);
        self
    }

    /// Adds node `id` with explicit records.
    #[must_use]
    pub fn node_with_records(mut self, id: &str, records: Vec<SequenceRecord>) -> Self {
        self.nodes.insert(id.to_owned(), records);
        self
    }

    /// Adds an edge with a fixed branch length and bootstrap support.
    #[must_use]
    pub fn edge(mut self, source: &str, target: &str) -> Self {
        self.edges.push(Edge::new(source, target, 0.1, Some(50.0)));
        self
    }

    /// Overrides the derived country mapping.
    #[must_use]
    pub fn countries(mut self, countries: &[&str]) -> Self {
        self.countries = Some(
            countries
                .iter()
                .map(|country| ((*country).to_owned(), 1))
                .collect(),
        );
        self
    }

    /// Finishes the cluster.
    #[must_use]
    pub fn build(self) -> Cluster {
        let countries = match self.countries {
            Some(explicit) => CountryCounts::from_pairs(explicit),
            None => derived_countries(&self.nodes, &self.edges),
        };
        Cluster::new(self.lineage, self.nodes, self.edges, countries)
    }
}

/// Counts records per country, ordering countries by the first edge that
/// reaches them and then by node id for nodes no edge touches.
fn derived_countries(
    nodes: &BTreeMap<String, Vec<SequenceRecord>>,
    edges: &[Edge],
) -> CountryCounts {
    let mut order: Vec<&str> = Vec::new();
    for edge in edges {
        order.push(edge.source());
        order.push(edge.target());
    }
    order.extend(nodes.keys().map(String::as_str));

    let mut seen: Vec<&str> = Vec::new();
    let mut pairs: Vec<(String, u64)> = Vec::new();
    for node in order {
        if seen.contains(&node) {
            continue;
        }
        seen.push(node);
        for record in nodes.get(node).into_iter().flatten() {
            let Some(country) = record.country() else {
                continue;
            };
            match pairs.iter_mut().find(|(known, _)| known == country) {
                Some(entry) => entry.1 += 1,
                None => pairs.push((country.to_owned(), 1)),
            }
        }
    }
    CountryCounts::from_pairs(pairs)
}

/// Serialises `clusters` as the JSON array the CLI reads.
///
/// # Panics
/// Panics if serialisation fails, which cannot happen for well-formed
/// clusters.
#[must_use]
pub fn clusters_json(clusters: &[Cluster]) -> String {
    match serde_json::to_string(clusters) {
        Ok(json) => json,
        Err(err) => panic!("failed to serialise clusters: {err}"),
    }
}
