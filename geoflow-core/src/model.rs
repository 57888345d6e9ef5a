//! Input data model for phylogenetic clusters.
//!
//! The types mirror the beadplot JSON produced by the upstream clustering
//! pipeline: each node maps to `[coldate, accession, label]` triples and each
//! edge is a `[parent, child, branch_length, support]` array.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Substring marking a node as unsampled (inferred, unobserved).
pub const UNSAMPLED_MARKER: &str = "unsampled";

/// Label used for unsampled nodes in the Sankey output.
pub const UNSAMPLED_LABEL: &str = "unsampled";

/// One observed sequence attached to a tree node.
///
/// Serialised as a three-element array.
///
/// # Examples
/// ```
/// use geoflow_core::SequenceRecord;
///
/// let record = SequenceRecord::new("2020-03-01", "EPI_ISL_1", "hCoV-19/Canada/ON-1/2020");
/// assert_eq!(record.country(), Some("Canada"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord(String, String, String);

impl SequenceRecord {
    /// Creates a record from its collection date, accession and sequence name.
    #[must_use]
    pub fn new(
        collection_date: impl Into<String>,
        accession: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self(collection_date.into(), accession.into(), name.into())
    }

    /// Returns the sample collection date as stored upstream.
    #[must_use]
    pub fn collection_date(&self) -> &str {
        &self.0
    }

    /// Returns the accession number.
    #[must_use]
    pub fn accession(&self) -> &str {
        &self.1
    }

    /// Returns the full sequence name, `<prefix>/<country>/<id>/<year>`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.2
    }

    /// Extracts the country component of the sequence name.
    ///
    /// Returns `None` when the name has no second `/`-separated field.
    #[must_use]
    pub fn country(&self) -> Option<&str> {
        self.2.split('/').nth(1)
    }
}

/// Directed tree edge between two nodes.
///
/// Serialised as `[source, target, branch_length, bootstrap]`; the bootstrap
/// support may be `null` or omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge(String, String, f64, #[serde(default)] Option<f64>);

impl Edge {
    /// Creates an edge.
    ///
    /// # Examples
    /// ```
    /// use geoflow_core::Edge;
    ///
    /// let edge = Edge::new("A1", "B1", 0.1, Some(50.0));
    /// assert_eq!(edge.source(), "A1");
    /// assert_eq!(edge.target(), "B1");
    /// ```
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        branch_length: f64,
        bootstrap: Option<f64>,
    ) -> Self {
        Self(source.into(), target.into(), branch_length, bootstrap)
    }

    /// Returns the parent node id.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.0
    }

    /// Returns the child node id.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.1
    }

    /// Returns the branch length.
    #[must_use]
    pub fn branch_length(&self) -> f64 {
        self.2
    }

    /// Returns the bootstrap support, if the tree carried one.
    #[must_use]
    pub fn bootstrap(&self) -> Option<f64> {
        self.3
    }
}

/// Per-country sample counts in document order.
///
/// Single-lineage graphs take their labels from this mapping, so the order in
/// which countries appear in the input is preserved rather than sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryCounts(Vec<(String, u64)>);

impl CountryCounts {
    /// Builds counts from `(country, count)` pairs, keeping their order.
    ///
    /// A repeated country keeps its first position and takes the later count.
    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut counts = Self::default();
        for (country, count) in pairs {
            counts.insert(country.into(), count);
        }
        counts
    }

    fn insert(&mut self, country: String, count: u64) {
        match self.0.iter_mut().find(|(known, _)| *known == country) {
            Some(entry) => entry.1 = count,
            None => self.0.push((country, count)),
        }
    }

    /// Iterates over country names in document order.
    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(country, _)| country.as_str())
    }

    /// Returns the count recorded for `country`.
    #[must_use]
    pub fn get(&self, country: &str) -> Option<u64> {
        self.0
            .iter()
            .find(|(known, _)| known == country)
            .map(|(_, count)| *count)
    }

    /// Number of distinct countries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no countries are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for CountryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (country, count) in &self.0 {
            map.serialize_entry(country, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CountryCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountryCountsVisitor;

        impl<'de> Visitor<'de> for CountryCountsVisitor {
            type Value = CountryCounts;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a mapping of country names to sample counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut counts = CountryCounts::default();
                while let Some((country, count)) = access.next_entry::<String, u64>()? {
                    counts.insert(country, count);
                }
                Ok(counts)
            }
        }

        deserializer.deserialize_map(CountryCountsVisitor)
    }
}

/// A lineage's transmission tree together with its sequence metadata.
///
/// # Examples
/// ```
/// use geoflow_core::{Cluster, Edge};
///
/// let json = r#"{
///     "lineage": "B.1",
///     "nodes": {"A1": [["2020-01-01", "EPI_1", "x/Canada/001/2020"]]},
///     "edges": [["A1", "unsampled1", 0.1, null]],
///     "country": {"Canada": 1}
/// }"#;
/// let cluster: Cluster = serde_json::from_str(json)?;
/// assert_eq!(cluster.lineage(), "B.1");
/// assert_eq!(cluster.edges(), &[Edge::new("A1", "unsampled1", 0.1, None)]);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    lineage: String,
    #[serde(default)]
    nodes: BTreeMap<String, Vec<SequenceRecord>>,
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default)]
    country: CountryCounts,
}

impl Cluster {
    /// Assembles a cluster from its parts.
    #[must_use]
    pub fn new(
        lineage: impl Into<String>,
        nodes: BTreeMap<String, Vec<SequenceRecord>>,
        edges: Vec<Edge>,
        country: CountryCounts,
    ) -> Self {
        Self {
            lineage: lineage.into(),
            nodes,
            edges,
            country,
        }
    }

    /// Returns the lineage label.
    #[must_use]
    pub fn lineage(&self) -> &str {
        &self.lineage
    }

    /// Returns the records attached to `node`, if the node is known.
    #[must_use]
    pub fn records(&self, node: &str) -> Option<&[SequenceRecord]> {
        self.nodes.get(node).map(Vec::as_slice)
    }

    /// Returns the node count.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the edges in tree order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the per-country sample counts.
    #[must_use]
    pub fn countries(&self) -> &CountryCounts {
        &self.country
    }
}

/// Whether `node_id` names an unsampled node.
#[must_use]
pub fn is_unsampled(node_id: &str) -> bool {
    node_id.contains(UNSAMPLED_MARKER)
}
