// Test helper functions

use taxa::core::config::Config;
use taxa::core::model::content::PROP_NAME;
use taxa::core::model::{ChildAssocRef, NodeRef};
use taxa::core::services::Services;
use taxa::core::store::NodeService;
use tempfile::TempDir;

/// Create test services over an empty repository, snapshot kept in a temp dir
#[allow(dead_code)] // Used in integration tests
pub fn create_test_services() -> (Services, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config::default();
    config.repository.snapshot_file = temp_dir.path().join("repository.json");

    let services = Services::new(config).expect("Failed to create services");
    (services, temp_dir)
}

/// Sorted `cm:name` values of the children in `assocs`
#[allow(dead_code)] // Used in integration tests
pub fn names(services: &Services, assocs: &[ChildAssocRef]) -> Vec<String> {
    let nodes: Vec<NodeRef> = assocs.iter().map(|a| a.child.clone()).collect();
    node_names(services, &nodes)
}

/// Sorted `cm:name` values of `nodes`
#[allow(dead_code)] // Used in integration tests
pub fn node_names(services: &Services, nodes: &[NodeRef]) -> Vec<String> {
    let mut out: Vec<String> = nodes
        .iter()
        .map(|node| {
            services
                .nodes
                .property(node, &PROP_NAME)
                .expect("Failed to read name")
                .map(|v| v.to_text())
                .unwrap_or_default()
        })
        .collect();
    out.sort();
    out
}

/// Every result set opened against the index has been closed
#[allow(dead_code)] // Used in integration tests
pub fn assert_no_open_result_sets(services: &Services) {
    let stats = services.index.stats();
    assert_eq!(
        stats.outstanding(),
        0,
        "Expected every result set closed, {} opened and {} closed",
        stats.opened(),
        stats.closed()
    );
}
