//! Configuration management for taxa.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, with sensible defaults for all settings.

use crate::core::error::{Result, TaxaError};
use crate::core::model::StoreRef;
use crate::core::search::Subsystem;
use crate::core::xdg::XdgDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Smallest writer heap tantivy accepts
pub const MIN_WRITER_HEAP_BYTES: usize = 15_000_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub category: CategoryConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// Search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Back end behind the search facade: "index" or "noindex"
    #[serde(default = "default_subsystem")]
    pub subsystem: String,

    /// Store used when a command names none
    #[serde(default = "default_store")]
    pub default_store: String,

    /// Maximum query string length
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
}

/// Category service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryConfig {
    /// Rows fetched per category query
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

/// Index configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Memory budget of the tantivy writer
    #[serde(default = "default_writer_heap_bytes")]
    pub writer_heap_bytes: usize,
}

/// Repository persistence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// JSON snapshot the CLI loads and saves
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: PathBuf,
}

// Default value functions
fn default_subsystem() -> String {
    Subsystem::Index.to_string()
}

fn default_store() -> String {
    StoreRef::spaces_store().to_string()
}

fn default_max_query_length() -> usize {
    4000
}

fn default_fetch_size() -> usize {
    5000
}

fn default_writer_heap_bytes() -> usize {
    50_000_000
}

fn default_snapshot_file() -> PathBuf {
    PathBuf::from("./data/repository.json")
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            subsystem: default_subsystem(),
            default_store: default_store(),
            max_query_length: default_max_query_length(),
        }
    }
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            writer_heap_bytes: default_writer_heap_bytes(),
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            snapshot_file: default_snapshot_file(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| TaxaError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    ///
    /// This method uses XDG Base Directory specification for file locations.
    pub fn load() -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(&xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// Priority order:
    /// 1. TAXA_CONFIG env var
    /// 2. XDG config file (~/.config/taxa/config.toml)
    /// 3. ./taxa.toml
    /// 4. Defaults
    pub fn load_with_xdg(xdg: &XdgDirs) -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("TAXA_CONFIG") {
            Self::from_file(config_path)?
        } else {
            let xdg_config = xdg.config_file();
            if xdg_config.exists() {
                Self::from_file(xdg_config)?
            } else if Path::new("taxa.toml").exists() {
                Self::from_file("taxa.toml")?
            } else {
                Self::default()
            }
        };

        // Keep the snapshot in the XDG data directory unless placed explicitly
        if env::var("TAXA_DATA_DIR").is_err()
            && config.repository.snapshot_file == default_snapshot_file()
        {
            config.repository.snapshot_file = xdg.snapshot_file();
        }

        config.merge_env();
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        // Search configuration
        if let Ok(subsystem) = env::var("TAXA_SEARCH_SUBSYSTEM") {
            self.search.subsystem = subsystem;
        }
        if let Ok(store) = env::var("TAXA_DEFAULT_STORE") {
            self.search.default_store = store;
        }
        if let Ok(max_query_len) = env::var("TAXA_MAX_QUERY_LENGTH") {
            if let Ok(len) = max_query_len.parse() {
                self.search.max_query_length = len;
            }
        }

        // Category configuration
        if let Ok(fetch_size) = env::var("TAXA_FETCH_SIZE") {
            if let Ok(size) = fetch_size.parse() {
                self.category.fetch_size = size;
            }
        }

        // Index configuration
        if let Ok(heap) = env::var("TAXA_WRITER_HEAP_BYTES") {
            if let Ok(bytes) = heap.parse() {
                self.index.writer_heap_bytes = bytes;
            }
        }

        // Repository configuration
        if let Ok(data_dir) = env::var("TAXA_DATA_DIR") {
            self.repository.snapshot_file = PathBuf::from(data_dir).join("repository.json");
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.subsystem()?;
        self.default_store()?;

        if self.search.max_query_length == 0 {
            return Err(TaxaError::ConfigError(
                "Max query length must be non-zero".to_string(),
            ));
        }

        if self.category.fetch_size == 0 {
            return Err(TaxaError::ConfigError(
                "Category fetch size must be non-zero".to_string(),
            ));
        }

        if self.index.writer_heap_bytes < MIN_WRITER_HEAP_BYTES {
            return Err(TaxaError::ConfigError(format!(
                "Index writer heap must be at least {MIN_WRITER_HEAP_BYTES} bytes"
            )));
        }

        if self.repository.snapshot_file.as_os_str().is_empty() {
            return Err(TaxaError::ConfigError(
                "Snapshot file must be set".to_string(),
            ));
        }

        Ok(())
    }

    /// Configured search back end
    pub fn subsystem(&self) -> Result<Subsystem> {
        self.search
            .subsystem
            .parse()
            .map_err(|_| {
                TaxaError::ConfigError(format!(
                    "Unknown search subsystem '{}' (expected index or noindex)",
                    self.search.subsystem
                ))
            })
    }

    /// Configured default store
    pub fn default_store(&self) -> Result<StoreRef> {
        self.search.default_store.parse().map_err(|_| {
            TaxaError::ConfigError(format!(
                "Invalid default store '{}' (expected protocol://identifier)",
                self.search.default_store
            ))
        })
    }

    /// Log configuration
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Search subsystem: {}", self.search.subsystem);
        tracing::info!("  Default store: {}", self.search.default_store);
        tracing::info!("  Max query length: {}", self.search.max_query_length);
        tracing::info!("  Category fetch size: {}", self.category.fetch_size);
        tracing::info!("  Writer heap: {} bytes", self.index.writer_heap_bytes);
        tracing::info!("  Snapshot file: {:?}", self.repository.snapshot_file);
    }
}
