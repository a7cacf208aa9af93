//! taxa - category and query layer over a content repository
//!
//! # Examples
//!
//! ```bash
//! # Create the default store with a custom classification
//! taxa init --namespace tags=http://example.com/tags \
//!     --classification tags:region=tags:regions
//!
//! # Create and browse categories
//! taxa create-category Europe --aspect tags:region
//! taxa root-categories --aspect tags:region
//! taxa children workspace://SpacesStore/<id> --mode members --depth any
//!
//! # Select nodes with a path expression
//! taxa select '/cm:categoryRoot/cm:generalclassifiable/*'
//!
//! # Run queries
//! taxa query 'TYPE:"cm:category"'
//! taxa cmis "SELECT cmis:name FROM cmis:folder ORDER BY cmis:name"
//! ```
//!
//! Logs go to stderr. `RUST_LOG` sets the filter (default `taxa=warn`) and
//! `TAXA_LOG_FORMAT=json` switches to JSON lines.

use clap::Parser;
use taxa::cli::output::print_error;
use taxa::cli::{run, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taxa=warn".into());
    let json = std::env::var("TAXA_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() {
    init_tracing();

    if let Err(e) = run(Cli::parse()) {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
