//! Query commands - run Lucene, xpath or CMIS queries

use crate::cli::output::{colors, format_value, print_warning, truncate};
use crate::cli::OutputFormat;
use crate::core::error::Result as TaxaResult;
use crate::core::index::params::SearchParametersBuilder;
use crate::core::index::{QueryLanguage, SearchParameters, SortDefinition};
use crate::core::search::SearchService;
use crate::core::services::Services;
use clap::Args;
use serde::Serialize;

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Query text
    pub query: String,

    /// Query language: lucene, xpath or cmis
    #[arg(long, short = 'l', default_value = "lucene")]
    pub language: QueryLanguage,

    #[command(flatten)]
    pub page: PageArgs,
}

/// Store, paging and sorting shared by query commands
#[derive(Args, Debug)]
pub struct PageArgs {
    /// Store to search, defaults to search.default_store
    #[arg(long, short = 's')]
    pub store: Option<String>,

    /// Number of results to skip
    #[arg(long, default_value = "0")]
    pub skip: usize,

    /// Maximum number of results
    #[arg(long, short = 'k')]
    pub max: Option<usize>,

    /// Sort property, prefixed with '-' for descending (can be specified multiple times)
    #[arg(long, allow_hyphen_values = true)]
    pub sort: Vec<String>,
}

impl PageArgs {
    fn parameters(
        &self,
        services: &Services,
        language: QueryLanguage,
        query: &str,
    ) -> TaxaResult<SearchParameters> {
        let store = super::store_or_default(services, self.store.as_deref())?;
        let mut builder: SearchParametersBuilder = SearchParameters::builder(language, query)
            .store(store)
            .skip_count(self.skip);
        if let Some(max) = self.max {
            builder = builder.max_items(max);
        }
        for sort in &self.sort {
            let (name, ascending) = match sort.strip_prefix('-') {
                Some(name) => (name, false),
                None => (sort.as_str(), true),
            };
            builder = builder.sort(SortDefinition::property(
                super::qname(services, name)?,
                ascending,
            ));
        }
        Ok(builder.build())
    }
}

/// Arguments for the cmis command
#[derive(Args, Debug)]
pub struct CmisArgs {
    /// CMIS statement, e.g. SELECT cmis:name FROM cmis:document
    pub statement: String,

    #[command(flatten)]
    pub page: PageArgs,
}

/// One result row
#[derive(Debug, Serialize)]
pub struct QueryResultItem {
    pub rank: usize,
    pub node: String,
    pub name: String,
    pub score: f32,
}

/// Query response
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub language: String,
    pub num_found: usize,
    pub start: usize,
    pub has_more: bool,
    pub results: Vec<QueryResultItem>,
}

/// Execute the query command
pub fn execute(
    args: QueryArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = args.page.parameters(services, args.language, &args.query)?;
    let mut results = services.search.query(&params)?;

    let response = QueryResponse {
        query: args.query.clone(),
        language: args.language.to_string(),
        num_found: results.num_found(),
        start: results.start(),
        has_more: results.has_more(),
        results: results
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| QueryResultItem {
                rank: results.start() + i + 1,
                node: row.node.to_string(),
                name: super::node_name(services, &row.node, None),
                score: row.score,
            })
            .collect(),
    };
    results.close();

    match format {
        OutputFormat::Human => {
            if response.results.is_empty() {
                println!("No results found for '{}'", colors::label(&args.query));
                return Ok(());
            }
            println!(
                "Found {} result(s):\n",
                colors::number(&response.num_found.to_string())
            );
            for item in &response.results {
                println!(
                    "[{}] {} {} {}",
                    colors::rank(&item.rank.to_string()),
                    item.name,
                    colors::node_ref(&item.node),
                    colors::score(&format!("(score: {:.2})", item.score))
                );
            }
            if response.has_more {
                println!("\n{}", colors::dim("More results available, use --skip"));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}

const CELL_WIDTH: usize = 32;

/// Execute the cmis command
pub fn execute_cmis(
    args: CmisArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = args
        .page
        .parameters(services, QueryLanguage::Cmis, &args.statement)?;
    let results = services.cmis.query(&params)?;

    match format {
        OutputFormat::Human => {
            if results.is_empty() {
                println!("No objects matched");
                return Ok(());
            }
            // SELECT * has no fixed column list, so use the keys of the first row
            let columns: Vec<String> = if results.columns.is_empty() {
                results.rows[0].values.keys().cloned().collect()
            } else {
                results.columns.clone()
            };
            let header: Vec<String> = columns
                .iter()
                .map(|c| format!("{:<CELL_WIDTH$}", truncate(c, CELL_WIDTH)))
                .collect();
            println!("{}", colors::label(header.join(" ").trim_end()));
            for row in &results.rows {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| {
                        let text = row.value(c).map(format_value).unwrap_or_default();
                        format!("{:<CELL_WIDTH$}", truncate(&text, CELL_WIDTH))
                    })
                    .collect();
                println!("{}", cells.join(" ").trim_end());
            }
            println!(
                "\n{} of {} object(s)",
                colors::number(&results.len().to_string()),
                colors::number(&results.num_found.to_string())
            );
            if results.skipped_stale > 0 {
                print_warning(&format!(
                    "{} index entries pointed at deleted nodes",
                    results.skipped_stale
                ));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }
    Ok(())
}
