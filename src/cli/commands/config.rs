//! Config command - show current configuration

use crate::cli::output::colors;
use crate::cli::OutputFormat;
use crate::core::config::Config;
use crate::core::xdg::XdgDirs;
use clap::Args;
use serde::Serialize;

/// Arguments for the show-config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Also show resolved directories
    #[arg(long, short = 'a')]
    pub all: bool,
}

/// Configuration response
#[derive(Debug, Serialize)]
pub struct ConfigResponse<'a> {
    #[serde(flatten)]
    pub config: &'a Config,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<PathsResponse>,
}

#[derive(Debug, Serialize)]
pub struct PathsResponse {
    pub config_file: String,
    pub data_dir: String,
}

/// Execute the show-config command
pub fn execute(
    args: ConfigArgs,
    config: &Config,
    xdg: &XdgDirs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = ConfigResponse {
        config,
        paths: args.all.then(|| PathsResponse {
            config_file: xdg.config_file().display().to_string(),
            data_dir: xdg.data_dir.display().to_string(),
        }),
    };

    match format {
        OutputFormat::Human => {
            println!("{}", colors::label("Configuration:"));
            println!("  search:");
            println!("    subsystem: {}", config.search.subsystem);
            println!("    default_store: {}", config.search.default_store);
            println!("    max_query_length: {}", config.search.max_query_length);
            println!("  category:");
            println!("    fetch_size: {}", config.category.fetch_size);
            println!("  index:");
            println!("    writer_heap_bytes: {}", config.index.writer_heap_bytes);
            println!("  repository:");
            println!(
                "    snapshot_file: {}",
                colors::path(&config.repository.snapshot_file.display().to_string())
            );
            if let Some(paths) = &response.paths {
                println!("  paths:");
                println!("    config_file: {}", colors::path(&paths.config_file));
                println!("    data_dir: {}", colors::path(&paths.data_dir));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
