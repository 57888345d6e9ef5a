//! Resolution of tree nodes to the country they were sampled in.

use std::sync::Arc;

use crate::error::ClusterDataError;
use crate::model::{Cluster, SequenceRecord, UNSAMPLED_LABEL, is_unsampled};

/// What an edge endpoint resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    /// Inferred node with no observed sequence.
    Unsampled,
    /// Observed node backed by one or more sequence records.
    Sampled {
        /// Country of the first record.
        country: &'a str,
        /// Every record attached to the node.
        records: &'a [SequenceRecord],
    },
}

impl<'a> NodeKind<'a> {
    /// Label this node contributes to the graph when it acts as a source.
    #[must_use]
    pub const fn country(&self) -> &'a str {
        match *self {
            Self::Unsampled => UNSAMPLED_LABEL,
            Self::Sampled { country, .. } => country,
        }
    }

    /// Number of records behind the node; `None` for unsampled nodes.
    #[must_use]
    pub const fn record_count(&self) -> Option<usize> {
        match *self {
            Self::Unsampled => None,
            Self::Sampled { records, .. } => Some(records.len()),
        }
    }

    /// Whether the node is unsampled.
    #[must_use]
    pub const fn is_unsampled(&self) -> bool {
        matches!(self, Self::Unsampled)
    }
}

/// Resolves `node_id` inside `cluster`.
///
/// Returns `Ok(None)` when the node is known but carries no records; the
/// caller skips such edges.
///
/// # Errors
/// Returns [`ClusterDataError::UnknownNode`] when a sampled node is missing
/// from the node mapping, and [`ClusterDataError::MalformedSequenceName`]
/// when its first record has no country component.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
/// use geoflow_core::{Cluster, CountryCounts, NodeKind, SequenceRecord, resolve_country};
///
/// let mut nodes = BTreeMap::new();
/// nodes.insert(
///     "A1".to_owned(),
///     vec![SequenceRecord::new("2020-01-01", "EPI_1", "x/Canada/001/2020")],
/// );
/// let cluster = Cluster::new("B.1", nodes, Vec::new(), CountryCounts::default());
///
/// let kind = resolve_country("A1", &cluster)?.expect("node has records");
/// assert_eq!(kind.country(), "Canada");
/// assert_eq!(kind.record_count(), Some(1));
/// assert_eq!(resolve_country("unsampled3", &cluster)?, Some(NodeKind::Unsampled));
/// # Ok::<(), geoflow_core::ClusterDataError>(())
/// ```
pub fn resolve_country<'a>(
    node_id: &str,
    cluster: &'a Cluster,
) -> Result<Option<NodeKind<'a>>, ClusterDataError> {
    if is_unsampled(node_id) {
        return Ok(Some(NodeKind::Unsampled));
    }

    let records = cluster
        .records(node_id)
        .ok_or_else(|| ClusterDataError::UnknownNode {
            node: Arc::from(node_id),
        })?;
    let Some(first) = records.first() else {
        return Ok(None);
    };
    let country = record_country(node_id, first)?;
    Ok(Some(NodeKind::Sampled { country, records }))
}

/// Reads the country of `record`, attributing failures to `node_id`.
pub(crate) fn record_country<'a>(
    node_id: &str,
    record: &'a SequenceRecord,
) -> Result<&'a str, ClusterDataError> {
    record
        .country()
        .ok_or_else(|| ClusterDataError::MalformedSequenceName {
            node: Arc::from(node_id),
            name: Arc::from(record.name()),
        })
}
