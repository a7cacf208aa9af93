//! Init command - create a store with its category root and classifications

use crate::cli::output::colors;
use crate::cli::OutputFormat;
use crate::core::error::TaxaError;
use crate::core::services::Services;
use crate::core::store::bootstrap::bootstrap_store;
use crate::core::store::snapshot::{define_classification, ClassificationAspect};
use crate::core::store::NodeService;
use clap::Args;
use serde::Serialize;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Store to initialize (protocol://identifier), defaults to search.default_store
    #[arg(long, short = 's')]
    pub store: Option<String>,

    /// Namespace to register, as prefix=uri (can be specified multiple times)
    #[arg(long, short = 'n')]
    pub namespace: Vec<String>,

    /// Classification to define, as aspect=property (can be specified multiple times)
    #[arg(long, short = 'c')]
    pub classification: Vec<String>,
}

/// Init result response
#[derive(Debug, Serialize)]
pub struct InitResponse {
    pub store: String,
    pub category_root: String,
    pub classifications: Vec<String>,
}

fn split_pair<'a>(value: &'a str, what: &str) -> Result<(&'a str, &'a str), TaxaError> {
    value
        .split_once('=')
        .map(|(left, right)| (left.trim(), right.trim()))
        .filter(|(left, right)| !left.is_empty() && !right.is_empty())
        .ok_or_else(|| TaxaError::InvalidArgument(format!("Expected {what}, got '{value}'")))
}

/// Execute the init command
pub fn execute(
    args: InitArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::store_or_default(services, args.store.as_deref())?;

    for namespace in &args.namespace {
        let (prefix, uri) = split_pair(namespace, "prefix=uri")?;
        services.registry.register(prefix, uri);
    }

    let dictionary = services.nodes.dictionary();
    for classification in &args.classification {
        let (aspect, property) = split_pair(classification, "aspect=property")?;
        define_classification(
            &dictionary,
            &ClassificationAspect {
                aspect: super::qname(services, aspect)?,
                property: super::qname(services, property)?,
            },
        );
    }

    let category_root = bootstrap_store(services.nodes.as_ref(), &store)?;
    services.save()?;

    let classifications = services
        .nodes
        .child_assocs(&category_root, None, None)?
        .iter()
        .filter_map(|assoc| assoc.qname.as_ref())
        .map(|qname| {
            qname
                .to_prefix_string(services.registry.as_ref())
                .unwrap_or_else(|_| qname.to_string())
        })
        .collect();

    let response = InitResponse {
        store: store.to_string(),
        category_root: category_root.to_string(),
        classifications,
    };

    match format {
        OutputFormat::Human => {
            println!(
                "{} store {}",
                colors::success("Initialized"),
                colors::node_ref(&response.store)
            );
            println!("  Category root: {}", colors::node_ref(&response.category_root));
            println!(
                "  Classifications: {}",
                colors::number(&response.classifications.len().to_string())
            );
            for name in &response.classifications {
                println!("    {}", colors::label(name));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
