// Test fixtures for integration testing

use std::collections::BTreeMap;
use std::sync::Arc;
use taxa::core::config::Config;
use taxa::core::model::content::{
    ASSOC_CHILDREN, ASSOC_SUBCATEGORIES, CATEGORY_ROOT_QNAME, PROP_NAME, TYPE_CATEGORY,
    TYPE_CATEGORY_ROOT, TYPE_FOLDER,
};
use taxa::core::model::{Dictionary, NamespaceRegistry, NodeRef, PropertyValue, QName, StoreRef};
use taxa::core::services::Services;
use taxa::core::store::bootstrap::ensure_classification;
use taxa::core::store::snapshot::{define_classification, ClassificationAspect};
use taxa::core::store::{InMemoryNodeStore, NodeService};
use tempfile::TempDir;

/// Namespace of the fixture model
pub const TEST_URI: &str = "http://www.taxa.dev/test/category/1.0";
pub const TEST_PREFIX: &str = "test";

pub fn test_qname(local: &str) -> QName {
    QName::new(TEST_URI, local)
}

/// Two classifications over fourteen folders:
///
/// ```text
/// cm:categoryRoot
///   test:AssetClass         members: one
///     test:Fixed            members: two..six, twelve, thirteen, fourteen
///     test:Equity           members: seven..fourteen
///       test:SpecialEquity  members: thirteen
///   test:Region             members: one
///     test:Europe           members: two, three
///     test:RestOfWorld      members: four, five
///       test:US
/// ```
///
/// `eight` is also linked under the store root and under `one`.
#[allow(dead_code)] // Not every harness uses every field
pub struct CategoryFixture {
    pub services: Services,
    pub store: StoreRef,
    pub root: NodeRef,
    pub category_root: NodeRef,
    pub asset_class: NodeRef,
    pub fixed: NodeRef,
    pub equity: NodeRef,
    pub special_equity: NodeRef,
    pub region: NodeRef,
    pub europe: NodeRef,
    pub rest_of_world: NodeRef,
    pub us: NodeRef,
    /// Member folders `one` to `fourteen`, in order
    pub members: Vec<NodeRef>,
    pub temp: TempDir,
}

const MEMBER_NAMES: [&str; 14] = [
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
    "twelve", "thirteen", "fourteen",
];

impl CategoryFixture {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut config = Config::default();
        config.repository.snapshot_file = temp.path().join("repository.json");

        let registry = Arc::new(NamespaceRegistry::with_defaults());
        registry.register(TEST_PREFIX, TEST_URI);

        let dictionary = Dictionary::with_content_model();
        for (aspect, property) in [("AssetClass", "assetClass"), ("Region", "region")] {
            define_classification(
                &dictionary,
                &ClassificationAspect {
                    aspect: test_qname(aspect),
                    property: test_qname(property),
                },
            );
        }
        let nodes = Arc::new(InMemoryNodeStore::new(Arc::new(dictionary)));
        let store = StoreRef::spaces_store();
        let root = nodes.create_store(&store).expect("Failed to create store");

        let category_root = nodes
            .create_node(
                &root,
                &ASSOC_CHILDREN,
                &CATEGORY_ROOT_QNAME,
                &TYPE_CATEGORY_ROOT,
                BTreeMap::new(),
            )
            .expect("Failed to create category root")
            .child;
        let asset_class =
            ensure_classification(nodes.as_ref(), &category_root, &test_qname("AssetClass"))
                .expect("Failed to create AssetClass");
        let region = ensure_classification(nodes.as_ref(), &category_root, &test_qname("Region"))
            .expect("Failed to create Region");

        let category = |parent: &NodeRef, name: &str| -> NodeRef {
            nodes
                .create_node(
                    parent,
                    &ASSOC_SUBCATEGORIES,
                    &test_qname(name),
                    &TYPE_CATEGORY,
                    BTreeMap::from([(PROP_NAME.clone(), PropertyValue::text(name))]),
                )
                .expect("Failed to create category")
                .child
        };
        let fixed = category(&asset_class, "Fixed");
        let equity = category(&asset_class, "Equity");
        let special_equity = category(&equity, "SpecialEquity");
        let europe = category(&region, "Europe");
        let rest_of_world = category(&region, "RestOfWorld");
        let us = category(&rest_of_world, "US");

        let folder = |parent: &NodeRef, name: &str| -> NodeRef {
            nodes
                .create_node(
                    parent,
                    &ASSOC_CHILDREN,
                    &QName::new(TEST_URI, name),
                    &TYPE_FOLDER,
                    BTreeMap::from([(PROP_NAME.clone(), PropertyValue::text(name))]),
                )
                .expect("Failed to create folder")
                .child
        };
        let mut members: Vec<NodeRef> = Vec::new();
        for (i, name) in MEMBER_NAMES.iter().enumerate() {
            // one..four under the root, the rest nested like a small file plan
            let parent = match i {
                0..=3 => root.clone(),
                4 | 5 => members[0].clone(),
                6 | 7 => members[1].clone(),
                8..=11 => members[4].clone(),
                12 => members[11].clone(),
                _ => members[12].clone(),
            };
            members.push(folder(&parent, name));
        }
        nodes
            .add_child(&root, &members[7], &ASSOC_CHILDREN, &test_qname("eight-0"))
            .expect("Failed to link eight");
        nodes
            .add_child(&members[0], &members[7], &ASSOC_CHILDREN, &test_qname("eight-1"))
            .expect("Failed to link eight");

        let classify = |node: &NodeRef, aspect: &str, property: &str, categories: &[&NodeRef]| {
            let value: Vec<NodeRef> = categories.iter().map(|c| (*c).clone()).collect();
            nodes
                .add_aspect(
                    node,
                    &test_qname(aspect),
                    BTreeMap::from([(test_qname(property), PropertyValue::from(value))]),
                )
                .expect("Failed to classify");
        };
        let m = &members;
        classify(&m[0], "AssetClass", "assetClass", &[&asset_class]);
        classify(&m[0], "Region", "region", &[&region]);
        for member in &m[1..6] {
            classify(member, "AssetClass", "assetClass", &[&fixed]);
        }
        for member in &m[6..11] {
            classify(member, "AssetClass", "assetClass", &[&equity]);
        }
        classify(&m[11], "AssetClass", "assetClass", &[&fixed, &equity]);
        classify(&m[12], "AssetClass", "assetClass", &[&fixed, &equity, &special_equity]);
        classify(&m[13], "AssetClass", "assetClass", &[&fixed, &equity]);
        classify(&m[1], "Region", "region", &[&europe]);
        classify(&m[2], "Region", "region", &[&europe]);
        classify(&m[3], "Region", "region", &[&rest_of_world]);
        classify(&m[4], "Region", "region", &[&rest_of_world]);

        let services = Services::with_store(config, registry, nodes)
            .expect("Failed to create services");

        Self {
            services,
            store,
            root,
            category_root,
            asset_class,
            fixed,
            equity,
            special_equity,
            region,
            europe,
            rest_of_world,
            us,
            members,
            temp,
        }
    }

    /// Member folder by name
    #[allow(dead_code)] // Used in integration tests
    pub fn member(&self, name: &str) -> &NodeRef {
        let index = MEMBER_NAMES
            .iter()
            .position(|n| *n == name)
            .unwrap_or_else(|| panic!("No member named {name}"));
        &self.members[index]
    }
}
