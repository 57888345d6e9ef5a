//! Country flow accumulation and the Sankey graph it recodes into.
//!
//! [`FlowGraph`] collects weighted links keyed by country name while edges
//! are folded. [`FlowGraph::recode`] then swaps names for positions in the
//! label list, yielding a [`SankeyGraph`] ready for a renderer. Recoding is a
//! consuming step so no link can be added once indices have been assigned.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Result, connection::Connection, error::GeoflowError};

/// Weighted link between two countries, still keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedLink {
    /// Source country.
    pub source: String,
    /// Target country.
    pub target: String,
    /// Number of contributions merged into the link.
    pub value: u32,
}

/// Graph under construction: labels plus name-keyed links.
///
/// # Examples
/// ```
/// use geoflow_core::{Connection, FlowGraph};
///
/// let mut graph = FlowGraph::new("B.1");
/// graph.push_label("Canada");
/// graph.push_label("USA");
/// graph.accumulate(&Connection {
///     source_country: "Canada",
///     target_countries: vec!["USA", "USA"],
/// });
/// let sankey = graph.recode()?;
/// assert_eq!(sankey.link.source, [0]);
/// assert_eq!(sankey.link.target, [1]);
/// assert_eq!(sankey.link.value, [2]);
/// # Ok::<(), geoflow_core::GeoflowError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowGraph {
    lineage: String,
    labels: Vec<String>,
    links: Vec<NamedLink>,
}

impl FlowGraph {
    /// Creates an empty graph for `lineage`.
    #[must_use]
    pub fn new(lineage: impl Into<String>) -> Self {
        Self {
            lineage: lineage.into(),
            labels: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Appends `label` unless it is already present.
    ///
    /// Returns `true` when the label was new.
    pub fn push_label(&mut self, label: &str) -> bool {
        if self.labels.iter().any(|known| known == label) {
            return false;
        }
        self.labels.push(label.to_owned());
        true
    }

    /// Registers every country named by `connection`, source first.
    pub fn push_connection_labels(&mut self, connection: &Connection<'_>) {
        self.push_label(connection.source_country);
        for country in &connection.target_countries {
            self.push_label(country);
        }
    }

    /// Folds `connection` into the link list.
    ///
    /// Each target contributes one unit to the `(source, target)` link,
    /// creating it on first sight. Weights saturate at `u32::MAX`.
    pub fn accumulate(&mut self, connection: &Connection<'_>) {
        for target in &connection.target_countries {
            let existing = self
                .links
                .iter_mut()
                .find(|link| link.source == connection.source_country && link.target == *target);
            match existing {
                Some(link) => link.value = link.value.saturating_add(1),
                None => self.links.push(NamedLink {
                    source: connection.source_country.to_owned(),
                    target: (*target).to_owned(),
                    value: 1,
                }),
            }
        }
    }

    /// Labels in insertion order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Links in first-seen order.
    #[must_use]
    pub fn links(&self) -> &[NamedLink] {
        &self.links
    }

    /// Replaces link endpoints with their label positions.
    ///
    /// # Errors
    /// Returns [`GeoflowError::MissingLabel`] when a link endpoint was never
    /// registered as a label.
    pub fn recode(self) -> Result<SankeyGraph> {
        let mut link = SankeyLinks::default();
        for named in &self.links {
            link.source.push(label_index(&self.labels, &named.source)?);
            link.target.push(label_index(&self.labels, &named.target)?);
            link.value.push(named.value);
        }
        Ok(SankeyGraph {
            lineage: self.lineage,
            label: self.labels,
            color: Vec::new(),
            link,
        })
    }
}

fn label_index(labels: &[String], country: &str) -> Result<usize> {
    labels
        .iter()
        .position(|label| label == country)
        .ok_or_else(|| GeoflowError::MissingLabel {
            country: Arc::from(country),
        })
}

/// Parallel link arrays in the shape Sankey renderers expect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SankeyLinks {
    /// Index of each link's source label.
    pub source: Vec<usize>,
    /// Index of each link's target label.
    pub target: Vec<usize>,
    /// Weight of each link.
    pub value: Vec<u32>,
}

impl SankeyLinks {
    /// Number of links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Whether the graph has no links.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Iterates over `(source, target, value)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.source
            .iter()
            .zip(&self.target)
            .zip(&self.value)
            .map(|((source, target), value)| (*source, *target, *value))
    }
}

/// Recoded graph handed to a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SankeyGraph {
    /// Lineage, or filter country in the cross-lineage view.
    pub lineage: String,
    /// Unique node labels in insertion order.
    pub label: Vec<String>,
    /// Node colours, one per label once assigned.
    pub color: Vec<String>,
    /// Link arrays indexing into `label`.
    pub link: SankeyLinks,
}

impl SankeyGraph {
    /// Colours every label with `palette(label)`.
    ///
    /// # Examples
    /// ```
    /// use geoflow_core::{Connection, FlowGraph};
    ///
    /// let mut graph = FlowGraph::new("B.1");
    /// graph.push_label("Canada");
    /// let mut sankey = graph.recode()?;
    /// sankey.assign_colors(|_| "grey".to_owned());
    /// assert_eq!(sankey.color, ["grey"]);
    /// # Ok::<(), geoflow_core::GeoflowError>(())
    /// ```
    pub fn assign_colors<F>(&mut self, palette: F)
    where
        F: FnMut(&str) -> String,
    {
        self.color = self.label.iter().map(String::as_str).map(palette).collect();
    }

    /// Installs an explicit colour list.
    ///
    /// # Errors
    /// Returns [`GeoflowError::ColorLengthMismatch`] unless there is exactly
    /// one colour per label.
    pub fn with_colors(mut self, colors: Vec<String>) -> Result<Self> {
        if colors.len() != self.label.len() {
            return Err(GeoflowError::ColorLengthMismatch {
                labels: self.label.len(),
                colors: colors.len(),
            });
        }
        self.color = colors;
        Ok(self)
    }

    /// Whether the graph can be rendered: one colour per label and every link
    /// endpoint in range.
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        let labels = self.label.len();
        self.color.len() == labels
            && self
                .link
                .iter()
                .all(|(source, target, value)| source < labels && target < labels && value >= 1)
    }
}
