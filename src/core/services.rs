//! Unified service container for taxa
//!
//! Wires the node store, the index and the query services together.

use crate::core::category::{IndexCategoryService, PrefixCache};
use crate::core::cmis::CmisQueryService;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::index::{IndexSearcher, IndexTracker, NodeIndex, TrackReport};
use crate::core::model::{Dictionary, NamespaceRegistry};
use crate::core::search::SearchServiceSubsystemDelegator;
use crate::core::store::snapshot::{self, RepositorySnapshot};
use crate::core::store::InMemoryNodeStore;
use crate::core::xpath::NodeSearcher;
use std::sync::Arc;
use tracing::debug;

/// Unified services container
///
/// The index lives in memory and is rebuilt from the store journal.
#[derive(Clone)]
pub struct Services {
    /// Application configuration
    pub config: Arc<Config>,

    /// Namespace prefix registry
    pub registry: Arc<NamespaceRegistry>,

    /// Authoritative node store
    pub nodes: Arc<InMemoryNodeStore>,

    /// Full-text index over the store
    pub index: Arc<NodeIndex>,

    /// Replays store changes into the index
    pub tracker: Arc<IndexTracker>,

    /// Lucene-like query execution
    pub searcher: Arc<IndexSearcher>,

    /// Category navigation and maintenance
    pub categories: Arc<IndexCategoryService>,

    /// Path-expression selection
    pub node_searcher: Arc<NodeSearcher>,

    /// CMIS statements
    pub cmis: Arc<CmisQueryService>,

    /// Search facade over the configured back end
    pub search: Arc<SearchServiceSubsystemDelegator>,
}

impl Services {
    /// Create services over an empty repository
    pub fn new(config: Config) -> Result<Self> {
        let nodes = InMemoryNodeStore::new(Arc::new(Dictionary::with_content_model()));
        Self::with_store(config, Arc::new(NamespaceRegistry::with_defaults()), Arc::new(nodes))
    }

    /// Create services over the configured snapshot, or an empty repository
    /// when none has been saved yet
    pub fn open(config: Config) -> Result<Self> {
        let registry = Arc::new(NamespaceRegistry::with_defaults());
        match snapshot::load(&config.repository.snapshot_file)? {
            Some(saved) => {
                let nodes = saved.restore(&registry)?;
                Self::with_store(config, registry, Arc::new(nodes))
            }
            None => {
                debug!(
                    path = %config.repository.snapshot_file.display(),
                    "No snapshot yet, starting empty"
                );
                let nodes = InMemoryNodeStore::new(Arc::new(Dictionary::with_content_model()));
                Self::with_store(config, registry, Arc::new(nodes))
            }
        }
    }

    /// Wire services around an existing store and index everything in it
    pub fn with_store(
        config: Config,
        registry: Arc<NamespaceRegistry>,
        nodes: Arc<InMemoryNodeStore>,
    ) -> Result<Self> {
        let index = Arc::new(NodeIndex::create_in_ram(config.index.writer_heap_bytes)?);
        let tracker = Arc::new(IndexTracker::new(
            nodes.clone(),
            index.clone(),
            registry.clone(),
        ));
        tracker.track()?;

        let searcher = Arc::new(IndexSearcher::new(
            index.clone(),
            registry.clone(),
            config.search.max_query_length,
        ));
        let categories = Arc::new(
            IndexCategoryService::new(
                nodes.clone(),
                searcher.clone(),
                Arc::new(PrefixCache::new(registry.clone())),
            )
            .with_fetch_size(config.category.fetch_size),
        );
        let search = Arc::new(SearchServiceSubsystemDelegator::for_subsystem(
            config.subsystem()?,
            nodes.clone(),
            searcher.clone(),
            registry.clone(),
        ));

        Ok(Self {
            node_searcher: Arc::new(NodeSearcher::new(nodes.clone())),
            cmis: Arc::new(CmisQueryService::new(searcher.clone(), nodes.clone())),
            config: Arc::new(config),
            registry,
            nodes,
            index,
            tracker,
            searcher,
            categories,
            search,
        })
    }

    /// Bring the index up to date with the store
    pub fn refresh(&self) -> Result<TrackReport> {
        self.tracker.track()
    }

    /// Persist the repository to the configured snapshot file
    pub fn save(&self) -> Result<()> {
        let captured = RepositorySnapshot::capture(&self.nodes, &self.registry);
        snapshot::save(&self.config.repository.snapshot_file, &captured)
    }
}
