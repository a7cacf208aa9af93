//! CLI adapter for taxa
//!
//! Provides a command-line interface over the category, path-expression,
//! and query services. The repository is loaded from its JSON snapshot on
//! every invocation and the index is rebuilt in memory; commands that
//! change the repository save the snapshot before exiting.
//!
//! # Architecture
//!
//! ```text
//!              +------------------+
//!              |     core/        |
//!              |  (domain logic)  |
//!              +--------+---------+
//!                       |
//!                       v
//!              +------------------+
//!              |      cli/        |
//!              | (clap adapter)   |
//!              +------------------+
//! ```

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// taxa - category and query layer over a content repository
///
/// Browse and maintain category trees, select nodes with path
/// expressions, and run Lucene-like or CMIS queries.
#[derive(Parser, Debug)]
#[command(name = "taxa")]
#[command(author = "Taxa Contributors")]
#[command(version)]
#[command(about = "Category and query layer over a content repository", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a store with its category root and classification nodes
    Init(commands::InitArgs),

    /// Create a category under a parent category or a classification
    #[command(name = "create-category")]
    CreateCategory(commands::category::CreateArgs),

    /// Delete a category and everything below it
    #[command(name = "delete-category")]
    DeleteCategory(commands::category::DeleteArgs),

    /// List sub-categories and members of a category
    Children(commands::category::ChildrenArgs),

    /// List the top-level categories of a classification
    #[command(name = "root-categories")]
    RootCategories(commands::category::RootArgs),

    /// List classification nodes and aspects
    Classifications(commands::category::ClassificationsArgs),

    /// Most used categories of a classification
    #[command(name = "top-categories")]
    TopCategories(commands::category::TopArgs),

    /// Select nodes or property values with a path expression
    Select(commands::SelectArgs),

    /// Run a query through the search service
    Query(commands::QueryArgs),

    /// Run a CMIS statement and print its columns
    Cmis(commands::query::CmisArgs),

    /// Show current configuration
    #[command(name = "show-config")]
    ShowConfig(commands::ConfigArgs),

    /// Generate shell completion scripts
    ///
    /// Output completion script to stdout. To install:
    ///
    ///   bash:  taxa completions bash > ~/.local/share/bash-completion/completions/taxa
    ///   zsh:   taxa completions zsh > ~/.zfunc/_taxa
    ///   fish:  taxa completions fish > ~/.config/fish/completions/taxa.fish
    Completions(commands::CompletionsArgs),
}

/// Run the CLI with the provided arguments
pub fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;
    use crate::core::services::Services;
    use crate::core::xdg::XdgDirs;

    // Handle completions command early (doesn't need services)
    if let Commands::Completions(args) = cli.command {
        return commands::completions::execute(args);
    }

    let xdg = XdgDirs::new();
    xdg.ensure_dirs_exist()?;

    let config = Config::load()?;
    xdg.log_paths();
    config.log_config();

    // Show config without loading the repository
    if let Commands::ShowConfig(args) = cli.command {
        return commands::config::execute(args, &config, &xdg, cli.format);
    }

    let services = Services::open(config)?;

    match cli.command {
        Commands::Init(args) => commands::init::execute(args, &services, cli.format),
        Commands::CreateCategory(args) => {
            commands::category::execute_create(args, &services, cli.format)
        }
        Commands::DeleteCategory(args) => {
            commands::category::execute_delete(args, &services, cli.format)
        }
        Commands::Children(args) => {
            commands::category::execute_children(args, &services, cli.format)
        }
        Commands::RootCategories(args) => {
            commands::category::execute_roots(args, &services, cli.format)
        }
        Commands::Classifications(args) => {
            commands::category::execute_classifications(args, &services, cli.format)
        }
        Commands::TopCategories(args) => {
            commands::category::execute_top(args, &services, cli.format)
        }
        Commands::Select(args) => commands::select::execute(args, &services, cli.format),
        Commands::Query(args) => commands::query::execute(args, &services, cli.format),
        Commands::Cmis(args) => commands::query::execute_cmis(args, &services, cli.format),
        Commands::ShowConfig(_) | Commands::Completions(_) => unreachable!(), // Handled above
    }
}
