// Integration tests for path-expression selection

use crate::common::{node_names, CategoryFixture};
use std::collections::BTreeMap;
use taxa::core::error::TaxaError;
use taxa::core::index::SortDefinition;
use taxa::core::model::content::PROP_NAME;
use taxa::core::model::{NodeRef, PropertyValue};

fn select(f: &CategoryFixture, context: &NodeRef, expression: &str) -> Vec<NodeRef> {
    f.services
        .node_searcher
        .select_nodes(
            context,
            expression,
            &BTreeMap::new(),
            f.services.registry.as_ref(),
            false,
            &[],
        )
        .unwrap_or_else(|e| panic!("'{expression}' failed: {e}"))
}

#[test]
fn test_select_category_tree() {
    let f = CategoryFixture::new();

    let classifications = select(&f, &f.root, "/cm:categoryRoot/*");
    assert_eq!(
        node_names(&f.services, &classifications),
        vec!["AssetClass", "Region"]
    );

    let under_asset_class = select(&f, &f.root, "/cm:categoryRoot/test:AssetClass//*");
    assert_eq!(
        node_names(&f.services, &under_asset_class),
        vec!["Equity", "Fixed", "SpecialEquity"]
    );

    assert_eq!(
        select(&f, &f.asset_class, "test:Equity/test:SpecialEquity"),
        vec![f.special_equity.clone()]
    );
    assert_eq!(select(&f, &f.special_equity, "../.."), vec![f.asset_class.clone()]);
}

#[test]
fn test_predicates_over_categories() {
    let f = CategoryFixture::new();

    let found = select(
        &f,
        &f.root,
        "/cm:categoryRoot/*/*[like(@cm:name, 'e%', false)]",
    );
    assert_eq!(node_names(&f.services, &found), vec!["Equity", "Europe"]);

    let with_children = select(&f, &f.region, "*[count(*) = 1]");
    assert_eq!(with_children, vec![f.rest_of_world.clone()]);

    let typed = select(&f, &f.root, "*[subtypeOf('cm:folder')]");
    assert_eq!(
        node_names(&f.services, &typed),
        vec!["eight", "four", "one", "three", "two"]
    );
}

#[test]
fn test_secondary_parents() {
    let f = CategoryFixture::new();
    let eight = f.member("eight");

    let primary = f
        .services
        .node_searcher
        .select_nodes(eight, "..", &BTreeMap::new(), f.services.registry.as_ref(), false, &[])
        .unwrap();
    assert_eq!(primary, vec![f.member("two").clone()]);

    let all = f
        .services
        .node_searcher
        .select_nodes(eight, "..", &BTreeMap::new(), f.services.registry.as_ref(), true, &[])
        .unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.contains(&f.root));
    assert!(all.contains(f.member("one")));
}

#[test]
fn test_ordered_selection_and_properties() {
    let f = CategoryFixture::new();
    let descending = f
        .services
        .node_searcher
        .select_nodes(
            &f.root,
            "/cm:categoryRoot/test:Region/*",
            &BTreeMap::new(),
            f.services.registry.as_ref(),
            false,
            &[SortDefinition::property(PROP_NAME.clone(), false)],
        )
        .unwrap();
    assert_eq!(descending, vec![f.rest_of_world.clone(), f.europe.clone()]);

    let names = f
        .services
        .node_searcher
        .select_properties(
            &f.root,
            "/cm:categoryRoot/test:Region/*/@cm:name",
            &BTreeMap::new(),
            f.services.registry.as_ref(),
            false,
            &[SortDefinition::property(PROP_NAME.clone(), true)],
        )
        .unwrap();
    assert_eq!(
        names,
        vec![PropertyValue::text("Europe"), PropertyValue::text("RestOfWorld")]
    );
}

#[test]
fn test_result_kind_mismatch() {
    let f = CategoryFixture::new();
    let err = f
        .services
        .node_searcher
        .select_nodes(
            &f.root,
            "/cm:categoryRoot/*/@cm:name",
            &BTreeMap::new(),
            f.services.registry.as_ref(),
            false,
            &[],
        )
        .unwrap_err();
    assert!(matches!(err, TaxaError::InvalidPathResult(_)));

    let err = f
        .services
        .node_searcher
        .select_properties(
            &f.root,
            "/cm:categoryRoot/*",
            &BTreeMap::new(),
            f.services.registry.as_ref(),
            false,
            &[],
        )
        .unwrap_err();
    assert!(matches!(err, TaxaError::InvalidPathResult(_)));
}

#[test]
fn test_malformed_expression() {
    let f = CategoryFixture::new();
    let err = f
        .services
        .node_searcher
        .select_nodes(
            &f.root,
            "/cm:categoryRoot[",
            &BTreeMap::new(),
            f.services.registry.as_ref(),
            false,
            &[],
        )
        .unwrap_err();
    assert!(matches!(err, TaxaError::PathEvaluation { .. }));
}
