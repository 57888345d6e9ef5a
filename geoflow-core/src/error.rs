//! Error types for the geoflow core library.
//!
//! Defines error enums exposed by the public API and a convenient result alias.

use std::{fmt, sync::Arc};

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// Inconsistency found inside a single [`crate::Cluster`] while resolving
/// edge endpoints.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ClusterDataError {
    /// An edge referenced a sampled node with no entry in the node mapping.
    #[error("edge references node `{node}` missing from the node mapping")]
    UnknownNode {
        /// Identifier of the missing node.
        node: Arc<str>,
    },
    /// A sequence name did not carry a country component.
    #[error("sequence `{name}` on node `{node}` has no country component")]
    MalformedSequenceName {
        /// Node owning the offending record.
        node: Arc<str>,
        /// Raw sequence name as stored in the record.
        name: Arc<str>,
    },
}

define_error_codes! {
    /// Stable codes describing [`ClusterDataError`] variants.
    enum ClusterDataErrorCode for ClusterDataError {
        /// An edge referenced a node missing from the node mapping.
        UnknownNode => UnknownNode { .. } => "CLUSTER_DATA_UNKNOWN_NODE",
        /// A sequence name did not carry a country component.
        MalformedSequenceName => MalformedSequenceName { .. } => "CLUSTER_DATA_MALFORMED_SEQUENCE_NAME",
    }
}

/// Error type produced when configuring or running an aggregation pass.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum GeoflowError {
    /// The country filter was present but blank.
    #[error("country filter must not be blank")]
    EmptyCountryFilter,
    /// Cross-lineage country mode was requested without a country filter.
    #[error("country view requires a country filter")]
    MissingCountryFilter,
    /// No cluster carries the requested lineage label.
    #[error("no cluster has lineage `{lineage}`")]
    UnknownLineage {
        /// Lineage requested by the caller.
        lineage: Arc<str>,
    },
    /// A link endpoint was absent from the label list at recode time.
    #[error("country `{country}` appears in a link but not in the label list")]
    MissingLabel {
        /// Country name that could not be indexed.
        country: Arc<str>,
    },
    /// Supplied node colours did not line up with the labels.
    #[error("graph has {labels} labels but {colors} colours were supplied")]
    ColorLengthMismatch {
        /// Number of labels in the graph.
        labels: usize,
        /// Number of colours supplied.
        colors: usize,
    },
    /// Cluster contents were inconsistent.
    #[error("cluster `{lineage}` is inconsistent: {error}")]
    ClusterData {
        /// Lineage of the cluster that failed.
        lineage: Arc<str>,
        #[source]
        /// Underlying inconsistency.
        error: ClusterDataError,
    },
}

define_error_codes! {
    /// Stable codes describing [`GeoflowError`] variants.
    enum GeoflowErrorCode for GeoflowError {
        /// The country filter was present but blank.
        EmptyCountryFilter => EmptyCountryFilter => "GEOFLOW_EMPTY_COUNTRY_FILTER",
        /// Cross-lineage country mode was requested without a country filter.
        MissingCountryFilter => MissingCountryFilter => "GEOFLOW_MISSING_COUNTRY_FILTER",
        /// No cluster carries the requested lineage label.
        UnknownLineage => UnknownLineage { .. } => "GEOFLOW_UNKNOWN_LINEAGE",
        /// A link endpoint was absent from the label list at recode time.
        MissingLabel => MissingLabel { .. } => "GEOFLOW_MISSING_LABEL",
        /// Supplied node colours did not line up with the labels.
        ColorLengthMismatch => ColorLengthMismatch { .. } => "GEOFLOW_COLOR_LENGTH_MISMATCH",
        /// Cluster contents were inconsistent.
        ClusterDataFailure => ClusterData { .. } => "GEOFLOW_CLUSTER_DATA_FAILURE",
    }
}

impl GeoflowError {
    /// Retrieve the inner [`ClusterDataErrorCode`] when the error originated
    /// in cluster contents.
    pub const fn cluster_data_code(&self) -> Option<ClusterDataErrorCode> {
        match self {
            Self::ClusterData { error, .. } => Some(error.code()),
            _ => None,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, GeoflowError>;
