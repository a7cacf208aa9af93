// Integration tests for CMIS statements over the category fixture

use crate::common::{assert_no_open_result_sets, CategoryFixture};
use taxa::core::cmis::{CmisQuery, CmisResultSet, Condition};
use taxa::core::error::TaxaError;
use taxa::core::index::{QueryLanguage, SearchParameters};
use taxa::core::model::PropertyValue;

fn cmis(f: &CategoryFixture, statement: &str) -> CmisResultSet {
    let params = SearchParameters::builder(QueryLanguage::Cmis, statement)
        .store(f.store.clone())
        .build();
    f.services
        .cmis
        .query(&params)
        .unwrap_or_else(|e| panic!("'{statement}' failed: {e}"))
}

fn names(results: &CmisResultSet) -> Vec<String> {
    results
        .rows
        .iter()
        .map(|row| {
            row.value("cmis:name")
                .map(PropertyValue::to_text)
                .unwrap_or_default()
        })
        .collect()
}

#[test]
fn test_in_folder_follows_secondary_links() {
    let f = CategoryFixture::new();
    let results = cmis(
        &f,
        &format!(
            "SELECT cmis:name FROM cmis:folder WHERE IN_FOLDER('{}') ORDER BY cmis:name",
            f.member("one")
        ),
    );

    assert_eq!(results.columns, vec!["cmis:name"]);
    assert_eq!(names(&results), vec!["eight", "five", "six"]);
    assert_eq!(results.num_found, 3);
    assert!(!results.has_more);
    assert_no_open_result_sets(&f.services);
}

#[test]
fn test_structured_query() {
    let f = CategoryFixture::new();
    let query = CmisQuery::select_all("cmis:folder")
        .with_condition(Condition::InFolder(f.member("five").to_string()));
    let params = SearchParameters::builder(QueryLanguage::Cmis, "")
        .store(f.store.clone())
        .build();
    let results = f.services.cmis.query_structured(&query, &params).unwrap();

    let mut found: Vec<String> = results
        .rows
        .iter()
        .filter_map(|row| row.value("cm:name").map(PropertyValue::to_text))
        .collect();
    found.sort();
    assert_eq!(found, vec!["eleven", "nine", "ten", "twelve"]);
}

#[test]
fn test_in_tree_covers_every_depth() {
    let f = CategoryFixture::new();
    let results = cmis(
        &f,
        &format!(
            "SELECT cmis:name FROM cmis:folder WHERE IN_TREE('{}')",
            f.member("one")
        ),
    );

    let mut found = names(&results);
    found.sort();
    assert_eq!(
        found,
        vec!["eight", "eleven", "five", "fourteen", "nine", "six", "ten", "thirteen", "twelve"]
    );
}

#[test]
fn test_like_with_ordering() {
    let f = CategoryFixture::new();
    let results = cmis(
        &f,
        "SELECT cmis:name AS title FROM cmis:folder WHERE cmis:name LIKE 't%' ORDER BY cmis:name DESC",
    );

    let titles: Vec<String> = results
        .rows
        .iter()
        .map(|row| row.value("title").map(PropertyValue::to_text).unwrap_or_default())
        .collect();
    assert_eq!(titles, vec!["two", "twelve", "three", "thirteen", "ten"]);
}

#[test]
fn test_categories_as_a_type() {
    let f = CategoryFixture::new();
    let results = cmis(
        &f,
        &format!(
            "SELECT cmis:name, cmis:parentId FROM cm:category WHERE IN_FOLDER('{}')",
            f.asset_class
        ),
    );

    assert_eq!(results.len(), 2);
    for row in &results.rows {
        assert_eq!(
            row.value("cmis:parentId"),
            Some(&PropertyValue::NodeRef(f.asset_class.clone()))
        );
    }
}

#[test]
fn test_select_all_columns() {
    let f = CategoryFixture::new();
    let results = cmis(&f, "SELECT * FROM cmis:folder WHERE cmis:name = 'one'");

    assert!(results.columns.is_empty());
    assert_eq!(results.len(), 1);
    let row = &results.rows[0];
    assert_eq!(row.node, *f.member("one"));
    assert_eq!(row.value("cm:name"), Some(&PropertyValue::text("one")));
    assert_eq!(
        row.value("cmis:objectId"),
        Some(&PropertyValue::NodeRef(f.member("one").clone()))
    );
    assert!(row.value("test:assetClass").is_some());
}

#[test]
fn test_contains_and_negation() {
    let f = CategoryFixture::new();

    let found = cmis(&f, "SELECT cmis:name FROM cmis:folder WHERE CONTAINS('thirteen')");
    assert_eq!(names(&found), vec!["thirteen"]);

    let others = cmis(
        &f,
        "SELECT cmis:name FROM cmis:folder WHERE NOT cmis:name IN ('one', 'two')",
    );
    assert_eq!(others.num_found, 12);
}

#[test]
fn test_paging() {
    let f = CategoryFixture::new();
    let params = SearchParameters::builder(
        QueryLanguage::Cmis,
        "SELECT cmis:name FROM cmis:folder ORDER BY cmis:name",
    )
    .store(f.store.clone())
    .skip_count(12)
    .max_items(5)
    .build();
    let results = f.services.cmis.query(&params).unwrap();

    assert_eq!(results.num_found, 14);
    assert_eq!(results.skip_count, 12);
    assert_eq!(names(&results), vec!["twelve", "two"]);
    assert!(!results.has_more);
}

#[test]
fn test_rejects_other_languages() {
    let f = CategoryFixture::new();
    let params = SearchParameters::lucene(&f.store, "TYPE:\"cm:folder\"").build();
    let err = f.services.cmis.query(&params).unwrap_err();
    assert!(matches!(err, TaxaError::InvalidArgument(_)));

    let unknown = SearchParameters::builder(QueryLanguage::Cmis, "SELECT cmis:bogus FROM cmis:folder")
        .store(f.store.clone())
        .build();
    assert!(f.services.cmis.query(&unknown).is_err());
    assert_no_open_result_sets(&f.services);
}
