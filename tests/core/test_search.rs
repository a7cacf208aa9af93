// Integration tests for the search facade and repository persistence

use crate::common::{assert_no_open_result_sets, node_names, test_qname, CategoryFixture};
use std::collections::BTreeMap;
use taxa::core::category::{CategoryService, Depth, Mode};
use taxa::core::config::Config;
use taxa::core::error::TaxaError;
use taxa::core::index::{QueryLanguage, SearchParameters};
use taxa::core::model::content::{PROP_NAME, PROP_TITLE};
use taxa::core::model::PropertyValue;
use taxa::core::search::{SearchService, Subsystem};
use taxa::core::services::Services;
use taxa::core::store::NodeService;

fn found(f: &CategoryFixture, services: &Services, language: QueryLanguage, query: &str) -> usize {
    let params = SearchParameters::builder(language, query)
        .store(f.store.clone())
        .build();
    let mut results = services
        .search
        .query(&params)
        .unwrap_or_else(|e| panic!("'{query}' failed: {e}"));
    let count = results.num_found();
    results.close();
    count
}

#[test]
fn test_query_in_every_language() {
    let f = CategoryFixture::new();
    assert_eq!(f.services.search.subsystem(), Subsystem::Index);

    assert_eq!(
        found(&f, &f.services, QueryLanguage::Lucene, "TYPE:\"cm:category\""),
        8
    );
    assert_eq!(
        found(&f, &f.services, QueryLanguage::XPath, "/cm:categoryRoot/*"),
        2
    );
    assert_eq!(
        found(
            &f,
            &f.services,
            QueryLanguage::Cmis,
            "SELECT * FROM cmis:folder WHERE cmis:name LIKE 'f%'"
        ),
        3
    );
    assert_no_open_result_sets(&f.services);
}

#[test]
fn test_xpath_query_pages() {
    let f = CategoryFixture::new();
    let params = SearchParameters::builder(QueryLanguage::XPath, "/cm:categoryRoot/*/*")
        .store(f.store.clone())
        .skip_count(1)
        .max_items(2)
        .build();
    let results = f.services.search.query(&params).unwrap();

    assert_eq!(results.num_found(), 4);
    assert_eq!(results.rows().len(), 2);
    assert!(results.has_more());

    let bound = SearchParameters::builder(
        QueryLanguage::XPath,
        "/cm:categoryRoot/*/*[@cm:name = $name]",
    )
    .store(f.store.clone())
    .query_param("name", PropertyValue::text("Europe"))
    .build();
    let results = f.services.search.query(&bound).unwrap();
    assert_eq!(results.num_found(), 1);
    assert_eq!(results.rows()[0].node, f.europe);
}

#[test]
fn test_selection_through_facade() {
    let f = CategoryFixture::new();
    let registry = f.services.registry.as_ref();

    let selected = f
        .services
        .search
        .select_nodes(&f.region, "*", &BTreeMap::new(), registry, false)
        .unwrap();
    assert_eq!(node_names(&f.services, &selected), vec!["Europe", "RestOfWorld"]);

    let params = BTreeMap::from([("name".to_string(), PropertyValue::text("Fixed"))]);
    let selected = f
        .services
        .search
        .select_nodes(&f.asset_class, "*[@cm:name = $name]", &params, registry, false)
        .unwrap();
    assert_eq!(selected, vec![f.fixed.clone()]);

    let values = f
        .services
        .search
        .select_properties(&f.equity, "*/@cm:name", &BTreeMap::new(), registry, false)
        .unwrap();
    assert_eq!(values, vec![PropertyValue::text("SpecialEquity")]);
}

#[test]
fn test_contains_and_like() {
    let f = CategoryFixture::new();
    let search = &f.services.search;
    let thirteen = f.member("thirteen");

    assert!(search.contains(thirteen, &PROP_NAME, "thirteen").unwrap());
    assert!(!search.contains(thirteen, &PROP_NAME, "fourteen").unwrap());

    assert!(search.like(thirteen, Some(&*PROP_NAME), "th%", false).unwrap());
    assert!(search.like(thirteen, Some(&*PROP_NAME), "TH_RTEEN", false).unwrap());
    assert!(search.like(thirteen, Some(&*PROP_NAME), "th%", true).unwrap());
    assert!(!search.like(thirteen, Some(&*PROP_NAME), "tw%", true).unwrap());

    // a property the node never had
    assert!(!search.like(thirteen, Some(&*PROP_TITLE), "%", false).unwrap());

    let err = search.like(thirteen, None, "th%", false).unwrap_err();
    assert!(matches!(err, TaxaError::InvalidArgument(_)));
}

#[test]
fn test_noindex_subsystem() {
    let f = CategoryFixture::new();
    let mut config = (*f.services.config).clone();
    config.search.subsystem = "noindex".to_string();
    let services =
        Services::with_store(config, f.services.registry.clone(), f.services.nodes.clone())
            .unwrap();
    assert_eq!(services.search.subsystem(), Subsystem::NoIndex);

    assert_eq!(
        found(&f, &services, QueryLanguage::XPath, "/cm:categoryRoot/test:Region/*"),
        2
    );

    let params = SearchParameters::lucene(&f.store, "TYPE:\"cm:category\"").build();
    let err = services.search.query(&params).unwrap_err();
    assert!(err.is_unsupported());

    let thirteen = f.member("thirteen");
    assert!(services.search.contains(thirteen, &PROP_NAME, "thirteen").unwrap());
    assert!(services.search.like(thirteen, Some(&*PROP_NAME), "th%", false).unwrap());
    assert!(services
        .search
        .like(thirteen, Some(&*PROP_NAME), "th%", true)
        .unwrap_err()
        .is_unsupported());
}

#[test]
fn test_unknown_subsystem_is_rejected() {
    let mut config = Config::default();
    config.search.subsystem = "solr".to_string();
    assert!(Services::new(config).is_err());
}

#[test]
fn test_snapshot_round_trip() {
    let f = CategoryFixture::new();
    f.services.save().unwrap();
    assert!(f.services.config.repository.snapshot_file.exists());

    let reopened = Services::open((*f.services.config).clone()).unwrap();
    assert!(reopened.nodes.exists(&f.special_equity));

    let members = reopened
        .categories
        .get_children(Some(&f.asset_class), Mode::Members, Depth::Any)
        .unwrap();
    assert_eq!(members.len(), 14);

    let classifications = reopened.categories.get_classifications(&f.store).unwrap();
    assert_eq!(classifications.len(), 2);
    assert!(reopened
        .categories
        .get_classification_aspects()
        .contains(&test_qname("Region")));
}

#[test]
fn test_open_without_snapshot_starts_empty() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut config = Config::default();
    config.repository.snapshot_file = temp.path().join("missing.json");

    let services = Services::open(config).unwrap();
    assert!(!services.categories.get_classification_aspects().is_empty());
    assert!(!services.config.repository.snapshot_file.exists());
}
