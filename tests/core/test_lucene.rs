// Integration tests for Lucene queries over category paths

use crate::common::{assert_no_open_result_sets, node_names, CategoryFixture};
use taxa::core::index::{FieldFacet, SearchParameters, SortDefinition};
use taxa::core::model::content::PROP_NAME;

fn count(f: &CategoryFixture, query: &str) -> usize {
    let params = SearchParameters::lucene(&f.store, query).build();
    let mut results = f
        .services
        .searcher
        .query(&params)
        .unwrap_or_else(|e| panic!("Query '{query}' failed: {e}"));
    let found = results.num_found();
    results.close();
    assert!(results.is_closed());
    found
}

#[test]
fn test_category_paths() {
    let f = CategoryFixture::new();
    let base = "/cm:categoryRoot/test:AssetClass";

    assert_eq!(count(&f, &format!("PATH:\"{base}\"")), 1);
    assert_eq!(count(&f, &format!("PATH:\"{base}/test:Fixed\"")), 1);
    assert_eq!(count(&f, &format!("PATH:\"{base}/test:*\"")), 2);
    assert_eq!(count(&f, &format!("PATH:\"{base}//test:*\"")), 3);
    assert_eq!(count(&f, "PATH:\"//test:Equity\""), 1);
    assert_no_open_result_sets(&f.services);
}

#[test]
fn test_member_paths() {
    let f = CategoryFixture::new();
    let base = "/cm:categoryRoot/test:AssetClass";

    assert_eq!(count(&f, &format!("PATH:\"{base}/member\"")), 1);
    assert_eq!(count(&f, &format!("PATH:\"{base}/test:Fixed/member\"")), 8);
    assert_eq!(count(&f, &format!("PATH:\"{base}/test:Equity/member\"")), 8);
    assert_eq!(
        count(&f, &format!("PATH:\"{base}/test:Equity/test:SpecialEquity/member\"")),
        1
    );
    assert_eq!(
        count(
            &f,
            &format!("+PATH:\"{base}/test:Equity/member\" AND +PATH:\"{base}/test:Fixed/member\"")
        ),
        3
    );
    assert_eq!(
        count(
            &f,
            &format!("PATH:\"{base}/test:Equity/member\" PATH:\"{base}/test:Fixed/member\"")
        ),
        13
    );
    assert_eq!(count(&f, "PATH:\"/cm:categoryRoot/test:Region//member\""), 5);
    assert_eq!(
        count(
            &f,
            &format!(
                "+PATH:\"{base}/test:Fixed/member\" AND +PATH:\"/cm:categoryRoot/test:Region/test:Europe/member\""
            )
        ),
        2
    );
}

#[test]
fn test_type_and_aspect_queries() {
    let f = CategoryFixture::new();

    // six categories plus two classification nodes
    assert_eq!(count(&f, "TYPE:\"cm:category\""), 8);
    assert_eq!(count(&f, "ASPECT:\"test:Region\""), 5);
    assert_eq!(count(&f, "ASPECT:\"cm:classifiable\""), 14);
    assert_eq!(count(&f, "+TYPE:\"cm:folder\" -ASPECT:\"test:Region\""), 9);
}

#[test]
fn test_sorted_paged_query() {
    let f = CategoryFixture::new();
    let params = SearchParameters::lucene(&f.store, "TYPE:\"cm:category\"")
        .sort(SortDefinition::property(PROP_NAME.clone(), true))
        .skip_count(1)
        .max_items(3)
        .build();
    let results = f.services.searcher.query(&params).unwrap();

    assert_eq!(results.num_found(), 8);
    assert_eq!(results.start(), 1);
    assert!(results.has_more());
    let names: Vec<String> = results
        .rows()
        .iter()
        .map(|row| node_names(&f.services, std::slice::from_ref(&row.node)).remove(0))
        .collect();
    assert_eq!(names, vec!["Equity", "Europe", "Fixed"]);
    drop(results);
    assert_no_open_result_sets(&f.services);
}

#[test]
fn test_invalid_query_closes_nothing() {
    let f = CategoryFixture::new();
    let params = SearchParameters::lucene(&f.store, "PATH:\"relative/path\"").build();
    assert!(f.services.searcher.query(&params).is_err());
    assert_no_open_result_sets(&f.services);
}

#[test]
fn test_category_facets() {
    let f = CategoryFixture::new();
    let property = crate::common::test_qname("region");
    let params = SearchParameters::lucene(&f.store, "ASPECT:\"test:Region\"")
        .max_items(0)
        .facet(FieldFacet::new(property.clone()))
        .build();
    let results = f.services.searcher.query(&params).unwrap();

    let buckets = results.facet(&property);
    let europe = buckets
        .iter()
        .find(|b| b.value == f.europe.to_string())
        .expect("Europe bucket");
    assert_eq!(europe.count, 2);
    assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), 5);
}
