//! Tests for the query, cmis and select CLI commands
//!
//! Runs the command handlers against the category fixture:
//! - Queries in each language, with paging and sorting
//! - CMIS tables, including SELECT *
//! - Path selection of nodes and property values
//! - Error propagation

use crate::common::CategoryFixture;
use taxa::cli::commands::query::{execute, execute_cmis, CmisArgs, PageArgs, QueryArgs};
use taxa::cli::commands::select::{self, SelectArgs};
use taxa::cli::output::{format_value, truncate};
use taxa::cli::OutputFormat;
use taxa::core::index::QueryLanguage;
use taxa::core::model::PropertyValue;

fn page() -> PageArgs {
    PageArgs {
        store: None,
        skip: 0,
        max: None,
        sort: Vec::new(),
    }
}

fn select_args(expression: &str) -> SelectArgs {
    SelectArgs {
        expression: expression.to_string(),
        context: None,
        store: None,
        properties: false,
        follow_all_parents: false,
        params: Vec::new(),
    }
}

/// Test a sorted, paged Lucene query in both formats
#[test]
fn test_lucene_query() {
    let f = CategoryFixture::new();
    for format in [OutputFormat::Human, OutputFormat::Json] {
        let args = QueryArgs {
            query: "TYPE:\"cm:category\"".to_string(),
            language: QueryLanguage::Lucene,
            page: PageArgs {
                skip: 2,
                max: Some(3),
                sort: vec!["-cm:name".to_string()],
                ..page()
            },
        };
        let result = execute(args, &f.services, format);
        assert!(result.is_ok(), "query should succeed: {:?}", result.err());
    }
}

/// Test xpath and CMIS through the query command
#[test]
fn test_other_languages() {
    let f = CategoryFixture::new();
    let args = QueryArgs {
        query: "/cm:categoryRoot/*".to_string(),
        language: QueryLanguage::XPath,
        page: page(),
    };
    assert!(execute(args, &f.services, OutputFormat::Json).is_ok());

    let args = QueryArgs {
        query: "SELECT * FROM cm:category".to_string(),
        language: QueryLanguage::Cmis,
        page: page(),
    };
    assert!(execute(args, &f.services, OutputFormat::Human).is_ok());
}

/// Test that no results is not an error
#[test]
fn test_query_no_results() {
    let f = CategoryFixture::new();
    let args = QueryArgs {
        query: "TYPE:\"cm:content\"".to_string(),
        language: QueryLanguage::Lucene,
        page: page(),
    };
    assert!(execute(args, &f.services, OutputFormat::Human).is_ok());
}

/// Test that a malformed query or sort key is an error
#[test]
fn test_query_errors() {
    let f = CategoryFixture::new();
    let args = QueryArgs {
        query: "PATH:\"unterminated".to_string(),
        language: QueryLanguage::Lucene,
        page: page(),
    };
    assert!(execute(args, &f.services, OutputFormat::Human).is_err());

    let args = QueryArgs {
        query: "TYPE:\"cm:category\"".to_string(),
        language: QueryLanguage::Lucene,
        page: PageArgs {
            sort: vec!["nope:name".to_string()],
            ..page()
        },
    };
    assert!(execute(args, &f.services, OutputFormat::Human).is_err());
}

/// Test CMIS tables with named columns and SELECT *
#[test]
fn test_cmis_tables() {
    let f = CategoryFixture::new();
    for format in [OutputFormat::Human, OutputFormat::Json] {
        let args = CmisArgs {
            statement: format!(
                "SELECT cmis:name, cmis:parentId FROM cmis:folder WHERE IN_TREE('{}') ORDER BY cmis:name",
                f.member("five")
            ),
            page: page(),
        };
        assert!(execute_cmis(args, &f.services, format).is_ok());
    }

    let args = CmisArgs {
        statement: "SELECT * FROM cmis:folder WHERE cmis:name = 'one'".to_string(),
        page: page(),
    };
    assert!(execute_cmis(args, &f.services, OutputFormat::Human).is_ok());

    let args = CmisArgs {
        statement: "SELECT FROM".to_string(),
        page: page(),
    };
    assert!(execute_cmis(args, &f.services, OutputFormat::Human).is_err());
}

/// Test selecting nodes, property values and bound variables
#[test]
fn test_select() {
    let f = CategoryFixture::new();
    assert!(select::execute(
        select_args("/cm:categoryRoot/*/*"),
        &f.services,
        OutputFormat::Human
    )
    .is_ok());

    let mut args = select_args("*/@cm:name");
    args.context = Some(f.region.to_string());
    args.properties = true;
    assert!(select::execute(args, &f.services, OutputFormat::Json).is_ok());

    let mut args = select_args("..");
    args.context = Some(f.member("eight").to_string());
    args.follow_all_parents = true;
    assert!(select::execute(args, &f.services, OutputFormat::Human).is_ok());

    let mut args = select_args("/cm:categoryRoot/*/*[@cm:name = $name]");
    args.params = vec!["name=Europe".to_string()];
    assert!(select::execute(args, &f.services, OutputFormat::Json).is_ok());
}

/// Test selection errors
#[test]
fn test_select_errors() {
    let f = CategoryFixture::new();
    assert!(select::execute(select_args("/cm:categoryRoot["), &f.services, OutputFormat::Human)
        .is_err());

    let mut args = select_args("*");
    args.params = vec!["novalue".to_string()];
    assert!(select::execute(args, &f.services, OutputFormat::Human).is_err());

    let mut args = select_args("/cm:categoryRoot/*");
    args.properties = true;
    assert!(select::execute(args, &f.services, OutputFormat::Human).is_err());
}

/// Test value and cell formatting helpers
#[test]
fn test_output_helpers() {
    assert_eq!(format_value(&PropertyValue::text("Europe")), "Europe");
    assert_eq!(
        format_value(&PropertyValue::List(vec![
            PropertyValue::text("a"),
            PropertyValue::text("b")
        ])),
        "[a, b]"
    );
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer value", 10), "a much ...");
}
