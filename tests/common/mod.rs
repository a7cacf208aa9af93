// Common test utilities and fixtures

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items
// Note: These may appear unused in some harnesses but are used in others
#[allow(unused_imports)]
pub use fixtures::{test_qname, CategoryFixture, TEST_PREFIX, TEST_URI};
#[allow(unused_imports)]
pub use helpers::{assert_no_open_result_sets, create_test_services, names, node_names};
