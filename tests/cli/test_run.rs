//! End-to-end tests through `taxa::cli::run`
//!
//! Each test points the XDG directories at a temp dir, so the repository
//! snapshot written by one command is loaded by the next.

use clap::Parser;
use serial_test::serial;
use std::env;
use taxa::cli::{run, Cli};
use taxa::core::category::CategoryService;
use taxa::core::config::Config;
use taxa::core::model::{QName, StoreRef};
use taxa::core::services::Services;
use tempfile::TempDir;

const URI: &str = "http://www.taxa.dev/test/run/1.0";

fn isolate() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    env::remove_var("TAXA_CONFIG");
    env::remove_var("TAXA_SEARCH_SUBSYSTEM");
    env::set_var("TAXA_CONFIG_DIR", temp.path().join("config"));
    env::set_var("TAXA_DATA_DIR", temp.path().join("data"));
    temp
}

fn restore() {
    env::remove_var("TAXA_CONFIG_DIR");
    env::remove_var("TAXA_DATA_DIR");
}

fn taxa(args: &[&str]) -> Result<(), Box<dyn std::error::Error>> {
    let argv = std::iter::once("taxa").chain(args.iter().copied());
    run(Cli::parse_from(argv))
}

#[test]
#[serial]
fn test_init_create_and_list() {
    let temp = isolate();
    let namespace = format!("run={URI}");

    taxa(&[
        "init",
        "--namespace",
        &namespace,
        "--classification",
        "run:Region=run:region",
    ])
    .expect("init failed");
    assert!(temp.path().join("data").join("repository.json").exists());

    taxa(&["create-category", "Europe", "--aspect", "run:Region"]).expect("create failed");
    taxa(&[
        "--format",
        "json",
        "root-categories",
        "--aspect",
        "run:Region",
        "--name",
        "Asia",
        "--create",
    ])
    .expect("named create failed");
    taxa(&["classifications"]).expect("classifications failed");
    taxa(&["query", "TYPE:\"cm:category\"", "--sort", "cm:name"]).expect("query failed");
    taxa(&["select", "/cm:categoryRoot/run:Region/*"]).expect("select failed");
    taxa(&["cmis", "SELECT cmis:name FROM cm:category"]).expect("cmis failed");

    // a fresh load sees everything the commands saved
    let services = Services::open(Config::load().unwrap()).unwrap();
    let roots = services
        .categories
        .get_root_categories(&StoreRef::spaces_store(), &QName::new(URI, "Region"))
        .unwrap();
    assert_eq!(roots.len(), 2);

    restore();
}

#[test]
#[serial]
fn test_show_config_and_completions() {
    let _temp = isolate();

    taxa(&["show-config"]).expect("show-config failed");
    taxa(&["--format", "json", "show-config", "--all"]).expect("show-config --all failed");
    taxa(&["completions", "bash"]).expect("completions failed");

    restore();
}

#[test]
#[serial]
fn test_errors_are_returned() {
    let _temp = isolate();

    // nothing initialized yet
    assert!(taxa(&["create-category", "Europe"]).is_err());
    assert!(taxa(&["init", "--namespace", "missing-uri"]).is_err());

    env::set_var("TAXA_SEARCH_SUBSYSTEM", "solr");
    assert!(taxa(&["classifications"]).is_err());
    env::remove_var("TAXA_SEARCH_SUBSYSTEM");

    restore();
}
