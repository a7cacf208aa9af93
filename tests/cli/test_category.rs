//! Tests for the category CLI commands
//!
//! Runs the command handlers against the category fixture:
//! - Listing children, root categories and classifications
//! - Creating and deleting categories (saved to the snapshot)
//! - Output format variations

use crate::common::{test_qname, CategoryFixture};
use taxa::cli::commands::category::{
    execute_children, execute_classifications, execute_create, execute_delete, execute_roots,
    execute_top, ChildrenArgs, ClassificationsArgs, CreateArgs, DeleteArgs, FilterArgs, RootArgs,
    TopArgs,
};
use taxa::cli::OutputFormat;
use taxa::core::category::{CategoryService, Depth, Mode};
use taxa::core::store::NodeService;

fn root_args(name: Option<&str>, create: bool) -> RootArgs {
    RootArgs {
        aspect: "test:AssetClass".to_string(),
        store: None,
        name: name.map(str::to_string),
        create,
        filter: FilterArgs::default(),
    }
}

/// Test listing children in both formats
#[test]
fn test_children_human_and_json() {
    let f = CategoryFixture::new();
    for format in [OutputFormat::Human, OutputFormat::Json] {
        let args = ChildrenArgs {
            node: f.asset_class.to_string(),
            mode: Mode::All,
            depth: Depth::Any,
            filter: FilterArgs {
                sort: true,
                max: Some(5),
                ..FilterArgs::default()
            },
        };
        let result = execute_children(args, &f.services, format);
        assert!(result.is_ok(), "children should succeed: {:?}", result.err());
    }
}

/// Test name filters on the children listing
#[test]
fn test_children_with_filters() {
    let f = CategoryFixture::new();
    let args = ChildrenArgs {
        node: f.asset_class.to_string(),
        mode: Mode::SubCategories,
        depth: Depth::Any,
        filter: FilterArgs {
            exact: vec!["fixed".to_string()],
            like: vec!["Special*".to_string()],
            ..FilterArgs::default()
        },
    };
    assert!(execute_children(args, &f.services, OutputFormat::Json).is_ok());
}

/// Test that a malformed node reference is an error
#[test]
fn test_children_bad_node_ref() {
    let f = CategoryFixture::new();
    let args = ChildrenArgs {
        node: "not a node ref".to_string(),
        mode: Mode::All,
        depth: Depth::Immediate,
        filter: FilterArgs::default(),
    };
    assert!(execute_children(args, &f.services, OutputFormat::Human).is_err());
}

/// Test root categories, plain and by name with create
#[test]
fn test_root_categories() {
    let f = CategoryFixture::new();
    assert!(execute_roots(root_args(None, false), &f.services, OutputFormat::Human).is_ok());
    assert!(
        execute_roots(root_args(Some("Bonds"), true), &f.services, OutputFormat::Json).is_ok()
    );

    let roots = f
        .services
        .categories
        .get_root_categories(&f.store, &test_qname("AssetClass"))
        .unwrap();
    assert_eq!(roots.len(), 3);
    assert!(f.services.config.repository.snapshot_file.exists());
}

/// Test that an unknown prefix in the aspect name is an error
#[test]
fn test_root_categories_unknown_prefix() {
    let f = CategoryFixture::new();
    let mut args = root_args(None, false);
    args.aspect = "nope:Missing".to_string();
    assert!(execute_roots(args, &f.services, OutputFormat::Human).is_err());
}

/// Test creating a root category, a child and deleting them again
#[test]
fn test_create_and_delete() {
    let f = CategoryFixture::new();
    let args = CreateArgs {
        name: "Commodities".to_string(),
        parent: None,
        aspect: "test:AssetClass".to_string(),
        store: None,
    };
    assert!(execute_create(args, &f.services, OutputFormat::Json).is_ok());
    f.services.refresh().unwrap();

    let created = f
        .services
        .categories
        .get_root_categories_named(&f.store, &test_qname("AssetClass"), "Commodities", false)
        .unwrap();
    assert_eq!(created.len(), 1);
    let commodities = created[0].child.clone();

    let args = CreateArgs {
        name: "Gold".to_string(),
        parent: Some(commodities.to_string()),
        aspect: "cm:generalclassifiable".to_string(),
        store: None,
    };
    assert!(execute_create(args, &f.services, OutputFormat::Human).is_ok());

    let args = DeleteArgs {
        node: commodities.to_string(),
    };
    assert!(execute_delete(args, &f.services, OutputFormat::Human).is_ok());
    assert!(!f.services.nodes.exists(&commodities));
}

/// Test classifications and top categories output
#[test]
fn test_classifications_and_top() {
    let f = CategoryFixture::new();
    for format in [OutputFormat::Human, OutputFormat::Json] {
        assert!(
            execute_classifications(ClassificationsArgs { store: None }, &f.services, format)
                .is_ok()
        );
        let args = TopArgs {
            aspect: "test:AssetClass".to_string(),
            store: None,
            count: 3,
        };
        assert!(execute_top(args, &f.services, format).is_ok());
    }
}

/// Test that a store without a protocol is rejected
#[test]
fn test_malformed_store() {
    let f = CategoryFixture::new();
    let args = ClassificationsArgs {
        store: Some("SpacesStore".to_string()),
    };
    assert!(execute_classifications(args, &f.services, OutputFormat::Human).is_err());
}
