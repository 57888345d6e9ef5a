use std::sync::Arc;

use geoflow_core::{ClusterDataError, ClusterDataErrorCode, GeoflowError, GeoflowErrorCode};
use rstest::rstest;

#[rstest]
#[case(
    ClusterDataError::UnknownNode { node: Arc::from("ghost") },
    ClusterDataErrorCode::UnknownNode,
)]
#[case(
    ClusterDataError::MalformedSequenceName {
        node: Arc::from("A1"),
        name: Arc::from("Canada"),
    },
    ClusterDataErrorCode::MalformedSequenceName,
)]
fn returns_expected_cluster_data_code(
    #[case] error: ClusterDataError,
    #[case] expected: ClusterDataErrorCode,
) {
    assert_eq!(error.code(), expected);
    assert_eq!(error.code().as_str(), expected.as_str());
}

#[rstest]
#[case(
    GeoflowError::EmptyCountryFilter,
    GeoflowErrorCode::EmptyCountryFilter,
    None,
)]
#[case(
    GeoflowError::MissingCountryFilter,
    GeoflowErrorCode::MissingCountryFilter,
    None,
)]
#[case(
    GeoflowError::UnknownLineage { lineage: Arc::from("XBB") },
    GeoflowErrorCode::UnknownLineage,
    None,
)]
#[case(
    GeoflowError::MissingLabel { country: Arc::from("USA") },
    GeoflowErrorCode::MissingLabel,
    None,
)]
#[case(
    GeoflowError::ColorLengthMismatch { labels: 2, colors: 1 },
    GeoflowErrorCode::ColorLengthMismatch,
    None,
)]
#[case(
    GeoflowError::ClusterData {
        lineage: Arc::from("B.1"),
        error: ClusterDataError::UnknownNode { node: Arc::from("ghost") },
    },
    GeoflowErrorCode::ClusterDataFailure,
    Some(ClusterDataErrorCode::UnknownNode),
)]
fn returns_expected_geoflow_code(
    #[case] error: GeoflowError,
    #[case] expected: GeoflowErrorCode,
    #[case] cluster_data_code: Option<ClusterDataErrorCode>,
) {
    assert_eq!(error.code(), expected);
    assert_eq!(error.code().as_str(), expected.as_str());
    assert_eq!(error.cluster_data_code(), cluster_data_code);
}

#[rstest]
fn codes_are_stable_strings() {
    assert_eq!(
        GeoflowErrorCode::MissingLabel.to_string(),
        "GEOFLOW_MISSING_LABEL"
    );
    assert_eq!(
        ClusterDataErrorCode::UnknownNode.as_str(),
        "CLUSTER_DATA_UNKNOWN_NODE"
    );
}

#[rstest]
fn cluster_data_error_chains_source() {
    let error = GeoflowError::ClusterData {
        lineage: Arc::from("B.1"),
        error: ClusterDataError::UnknownNode {
            node: Arc::from("ghost"),
        },
    };
    let source = std::error::Error::source(&error).expect("cluster data error has a source");
    assert_eq!(
        source.to_string(),
        "edge references node `ghost` missing from the node mapping"
    );
}
