//! geoflow core library.
//!
//! Folds the edges of phylogenetic clusters into weighted country-to-country
//! links for Sankey diagrams of geographic transmission flow.

mod aggregate;
mod connection;
mod error;
mod graph;
mod model;
mod node;
mod options;

pub use crate::{
    aggregate::{
        Aggregation, AggregationStats, View, build_country_graph, build_graph,
        build_lineage_graph,
    },
    connection::{Connection, EdgeOutcome, SkipReason, parse_edge},
    error::{ClusterDataError, ClusterDataErrorCode, GeoflowError, GeoflowErrorCode, Result},
    graph::{FlowGraph, NamedLink, SankeyGraph, SankeyLinks},
    model::{
        Cluster, CountryCounts, Edge, SequenceRecord, UNSAMPLED_LABEL, UNSAMPLED_MARKER,
        is_unsampled,
    },
    node::{NodeKind, resolve_country},
    options::{FilterOptions, FilterOptionsBuilder},
};
