//! Category commands - browse and maintain category trees

use super::NodeItem;
use crate::cli::output::{colors, print_header, print_success, print_warning};
use crate::cli::OutputFormat;
use crate::core::category::{CategoryService, ChildrenFilter, Depth, Mode};
use crate::core::index::{PagingRequest, PagingResults};
use crate::core::model::{ChildAssocRef, NodeRef};
use crate::core::services::Services;
use clap::Args;
use serde::Serialize;

const DEFAULT_ASPECT: &str = "cm:generalclassifiable";

/// Arguments for the create-category command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Name of the new category
    pub name: String,

    /// Parent category node; without it a root category is created
    #[arg(long, short = 'p')]
    pub parent: Option<String>,

    /// Classification aspect for a root category
    #[arg(long, short = 'a', default_value = DEFAULT_ASPECT)]
    pub aspect: String,

    /// Store for a root category, defaults to search.default_store
    #[arg(long, short = 's')]
    pub store: Option<String>,
}

/// Arguments for the delete-category command
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Category node to delete
    pub node: String,
}

/// Name filters, sorting and paging shared by listing commands
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Keep children with this exact name, ignoring case (can be specified multiple times)
    #[arg(long)]
    pub exact: Vec<String>,

    /// Keep children whose name matches this wildcard pattern (can be specified multiple times)
    #[arg(long)]
    pub like: Vec<String>,

    /// Sort by name
    #[arg(long)]
    pub sort: bool,

    /// Number of children to skip
    #[arg(long, default_value = "0")]
    pub skip: usize,

    /// Maximum number of children to return
    #[arg(long)]
    pub max: Option<usize>,
}

impl FilterArgs {
    fn to_filter(&self) -> ChildrenFilter {
        let filter = ChildrenFilter {
            exact_names: self.exact.clone(),
            like_names: self.like.clone(),
            ..ChildrenFilter::default()
        }
        .with_paging(PagingRequest::new(self.skip, self.max.unwrap_or(usize::MAX)));
        if self.sort {
            filter.sorted_by_name()
        } else {
            filter
        }
    }
}

/// Arguments for the children command
#[derive(Args, Debug)]
pub struct ChildrenArgs {
    /// Category node
    pub node: String,

    /// all, members or sub-categories
    #[arg(long, short = 'm', default_value = "all")]
    pub mode: Mode,

    /// immediate or any
    #[arg(long, short = 'd', default_value = "immediate")]
    pub depth: Depth,

    #[command(flatten)]
    pub filter: FilterArgs,
}

/// Arguments for the root-categories command
#[derive(Args, Debug)]
pub struct RootArgs {
    /// Classification aspect
    #[arg(long, short = 'a', default_value = DEFAULT_ASPECT)]
    pub aspect: String,

    /// Store, defaults to search.default_store
    #[arg(long, short = 's')]
    pub store: Option<String>,

    /// Only root categories with this name
    #[arg(long)]
    pub name: Option<String>,

    /// Create the named root category when it does not exist
    #[arg(long, requires = "name")]
    pub create: bool,

    #[command(flatten)]
    pub filter: FilterArgs,
}

/// Arguments for the classifications command
#[derive(Args, Debug)]
pub struct ClassificationsArgs {
    /// Store, defaults to search.default_store
    #[arg(long, short = 's')]
    pub store: Option<String>,
}

/// Arguments for the top-categories command
#[derive(Args, Debug)]
pub struct TopArgs {
    /// Classification aspect
    #[arg(long, short = 'a', default_value = DEFAULT_ASPECT)]
    pub aspect: String,

    /// Store, defaults to search.default_store
    #[arg(long, short = 's')]
    pub store: Option<String>,

    /// Number of categories to return
    #[arg(long, short = 'k', default_value = "10")]
    pub count: usize,
}

/// Listing response
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<NodeItem>,
    pub total_count: usize,
    pub has_more_items: bool,
    pub skipped_stale: usize,
}

impl ListResponse {
    fn from_page(services: &Services, results: &PagingResults<ChildAssocRef>) -> Self {
        Self {
            items: results
                .page
                .iter()
                .map(|assoc| NodeItem::from_assoc(services, assoc))
                .collect(),
            total_count: results.total_count,
            has_more_items: results.has_more_items,
            skipped_stale: results.skipped_stale,
        }
    }

    fn from_assocs(services: &Services, assocs: &[ChildAssocRef]) -> Self {
        Self {
            items: assocs
                .iter()
                .map(|assoc| NodeItem::from_assoc(services, assoc))
                .collect(),
            total_count: assocs.len(),
            has_more_items: false,
            skipped_stale: 0,
        }
    }

    fn print(&self, title: &str, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
        match format {
            OutputFormat::Human => {
                if self.items.is_empty() {
                    println!("No {title} found");
                    return Ok(());
                }
                println!(
                    "{} {} ({} total):\n",
                    colors::label(title),
                    colors::number(&self.items.len().to_string()),
                    colors::number(&self.total_count.to_string())
                );
                for item in &self.items {
                    println!("  {}  {}", colors::node_ref(&item.node), item.name);
                }
                if self.has_more_items {
                    println!("\n{}", colors::dim("More items available, use --skip"));
                }
                if self.skipped_stale > 0 {
                    print_warning(&format!(
                        "{} index entries pointed at deleted nodes",
                        self.skipped_stale
                    ));
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(self)?);
            }
        }
        Ok(())
    }
}

/// Execute the create-category command
pub fn execute_create(
    args: CreateArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let created = match &args.parent {
        Some(parent) => {
            let parent: NodeRef = parent.parse()?;
            services.categories.create_category(&parent, &args.name)?
        }
        None => {
            let store = super::store_or_default(services, args.store.as_deref())?;
            let aspect = super::qname(services, &args.aspect)?;
            services
                .categories
                .create_root_category(&store, &aspect, &args.name)?
        }
    };
    services.save()?;

    let item = NodeItem::from_node(services, &created);
    match format {
        OutputFormat::Human => {
            println!(
                "{} category '{}' as {}",
                colors::success("Created"),
                item.name,
                colors::node_ref(&item.node)
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
    }
    Ok(())
}

/// Execute the delete-category command
pub fn execute_delete(
    args: DeleteArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let node: NodeRef = args.node.parse()?;
    services.categories.delete_category(&node)?;
    services.save()?;

    match format {
        OutputFormat::Human => {
            print_success(&format!("Deleted {}", args.node));
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "deleted": args.node }))?
            );
        }
    }
    Ok(())
}

/// Execute the children command
pub fn execute_children(
    args: ChildrenArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let node: NodeRef = args.node.parse()?;
    let results = services.categories.get_children_filtered(
        Some(&node),
        args.mode,
        args.depth,
        &args.filter.to_filter(),
    )?;
    ListResponse::from_page(services, &results).print("children", format)
}

/// Execute the root-categories command
pub fn execute_roots(
    args: RootArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::store_or_default(services, args.store.as_deref())?;
    let aspect = super::qname(services, &args.aspect)?;

    let response = match &args.name {
        Some(name) => {
            let found = services
                .categories
                .get_root_categories_named(&store, &aspect, name, args.create)?;
            if args.create {
                services.save()?;
            }
            ListResponse::from_assocs(services, &found)
        }
        None => {
            let results = services.categories.get_root_categories_paged(
                &store,
                &aspect,
                &args.filter.to_filter(),
            )?;
            ListResponse::from_page(services, &results)
        }
    };
    response.print("root categories", format)
}

/// Classifications response
#[derive(Debug, Serialize)]
pub struct ClassificationsResponse {
    pub aspects: Vec<String>,
    pub nodes: Vec<NodeItem>,
}

/// Execute the classifications command
pub fn execute_classifications(
    args: ClassificationsArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::store_or_default(services, args.store.as_deref())?;
    let nodes = services.categories.get_classifications(&store)?;
    let response = ClassificationsResponse {
        aspects: services
            .categories
            .get_classification_aspects()
            .iter()
            .map(|aspect| {
                aspect
                    .to_prefix_string(services.registry.as_ref())
                    .unwrap_or_else(|_| aspect.to_string())
            })
            .collect(),
        nodes: nodes
            .iter()
            .map(|assoc| NodeItem::from_assoc(services, assoc))
            .collect(),
    };

    match format {
        OutputFormat::Human => {
            print_header("Classification aspects:");
            for aspect in &response.aspects {
                println!("  {aspect}");
            }
            println!();
            print_header("Classification nodes:");
            for item in &response.nodes {
                println!("  {}  {}", colors::node_ref(&item.node), item.name);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}

/// One counted category
#[derive(Debug, Serialize)]
pub struct TopCategoryItem {
    pub rank: usize,
    pub node: String,
    pub name: String,
    pub members: usize,
}

/// Execute the top-categories command
pub fn execute_top(
    args: TopArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::store_or_default(services, args.store.as_deref())?;
    let aspect = super::qname(services, &args.aspect)?;
    let items: Vec<TopCategoryItem> = services
        .categories
        .get_top_categories(&store, &aspect, args.count)?
        .into_iter()
        .enumerate()
        .map(|(i, (node, members))| TopCategoryItem {
            rank: i + 1,
            name: super::node_name(services, &node, None),
            node: node.to_string(),
            members,
        })
        .collect();

    match format {
        OutputFormat::Human => {
            if items.is_empty() {
                println!("No categorized content found");
            }
            for item in &items {
                println!(
                    "[{}] {} {} {}",
                    colors::rank(&item.rank.to_string()),
                    item.name,
                    colors::node_ref(&item.node),
                    colors::dim(&format!("({} members)", item.members))
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }
    Ok(())
}
