//! Select command - evaluate a path expression against the repository

use super::NodeItem;
use crate::cli::output::{colors, format_value};
use crate::cli::OutputFormat;
use crate::core::error::TaxaError;
use crate::core::model::{NodeRef, PropertyValue};
use crate::core::search::SearchService;
use crate::core::services::Services;
use crate::core::store::NodeService;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;

/// Arguments for the select command
#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Path expression, e.g. /cm:categoryRoot/cm:generalclassifiable/*
    pub expression: String,

    /// Context node, defaults to the root of the store
    #[arg(long, short = 'c')]
    pub context: Option<String>,

    /// Store whose root is the default context
    #[arg(long, short = 's')]
    pub store: Option<String>,

    /// Select property values instead of nodes
    #[arg(long)]
    pub properties: bool,

    /// Follow secondary parent links on the parent axis
    #[arg(long)]
    pub follow_all_parents: bool,

    /// Variable binding, as name=value (can be specified multiple times)
    #[arg(long = "param")]
    pub params: Vec<String>,
}

/// Selection response
#[derive(Debug, Serialize)]
pub struct SelectResponse {
    pub expression: String,
    pub context: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<PropertyValue>,
}

fn parse_params(params: &[String]) -> Result<BTreeMap<String, PropertyValue>, TaxaError> {
    params
        .iter()
        .map(|param| {
            let (name, value) = param.split_once('=').ok_or_else(|| {
                TaxaError::InvalidArgument(format!("Expected name=value, got '{param}'"))
            })?;
            Ok((name.trim().to_string(), PropertyValue::text(value)))
        })
        .collect()
}

/// Execute the select command
pub fn execute(
    args: SelectArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let context: NodeRef = match &args.context {
        Some(context) => context.parse()?,
        None => {
            let store = super::store_or_default(services, args.store.as_deref())?;
            services.nodes.root_node(&store)?
        }
    };
    let params = parse_params(&args.params)?;

    let mut response = SelectResponse {
        expression: args.expression.clone(),
        context: context.to_string(),
        nodes: Vec::new(),
        values: Vec::new(),
    };
    if args.properties {
        response.values = services.search.select_properties(
            &context,
            &args.expression,
            &params,
            services.registry.as_ref(),
            args.follow_all_parents,
        )?;
    } else {
        response.nodes = services
            .search
            .select_nodes(
                &context,
                &args.expression,
                &params,
                services.registry.as_ref(),
                args.follow_all_parents,
            )?
            .iter()
            .map(|node| NodeItem::from_node(services, node))
            .collect();
    }

    match format {
        OutputFormat::Human => {
            let count = response.nodes.len() + response.values.len();
            println!(
                "Selected {} item(s) from {}:\n",
                colors::number(&count.to_string()),
                colors::node_ref(&response.context)
            );
            for item in &response.nodes {
                println!("  {}  {}", colors::node_ref(&item.node), item.name);
            }
            for value in &response.values {
                println!("  {}", format_value(value));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}
