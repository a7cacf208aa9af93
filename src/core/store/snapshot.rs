//! JSON snapshots of an in-memory repository.
//!
//! A snapshot carries the node graph plus what is needed to interpret it:
//! registered namespace prefixes and any classification aspects defined on
//! top of the built-in content model.

use super::memory::{InMemoryNodeStore, NodeRecord};
use super::NodeService;
use crate::core::error::{Result, TaxaError};
use crate::core::model::content::{ASPECT_CLASSIFIABLE, ASPECT_GEN_CLASSIFIABLE};
use crate::core::model::{Dictionary, NamespaceRegistry, NodeRef, PropertyDefinition, QName, StoreRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Current snapshot format version
/// Version 1: Initial format (namespaces, classifications, stores, nodes)
pub const SNAPSHOT_VERSION: u32 = 1;

/// A classification aspect and the category property it declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationAspect {
    pub aspect: QName,
    pub property: QName,
}

/// Serialized repository
#[derive(Debug, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub namespaces: BTreeMap<String, String>,
    #[serde(default)]
    pub classifications: Vec<ClassificationAspect>,
    pub stores: BTreeMap<StoreRef, NodeRef>,
    pub nodes: Vec<NodeRecord>,
}

impl RepositorySnapshot {
    /// Capture the current state of a store
    pub fn capture(nodes: &InMemoryNodeStore, registry: &NamespaceRegistry) -> Self {
        let dictionary = nodes.dictionary();
        let classifications = dictionary
            .sub_aspects(&ASPECT_CLASSIFIABLE, true)
            .into_iter()
            .filter(|aspect| aspect != &*ASPECT_GEN_CLASSIFIABLE)
            .filter_map(|aspect| {
                let property = dictionary.category_property(&aspect)?;
                Some(ClassificationAspect { aspect, property })
            })
            .collect();
        let (stores, records) = nodes.export();
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            namespaces: registry
                .entries()
                .into_iter()
                .filter(|(prefix, _)| !prefix.is_empty())
                .collect(),
            classifications,
            stores,
            nodes: records,
        }
    }

    /// Register namespaces and aspects, then rebuild the node store
    pub fn restore(self, registry: &NamespaceRegistry) -> Result<InMemoryNodeStore> {
        if self.version > SNAPSHOT_VERSION {
            return Err(TaxaError::ConfigError(format!(
                "Snapshot version {} is newer than supported version {}",
                self.version, SNAPSHOT_VERSION
            )));
        }
        for (prefix, uri) in &self.namespaces {
            registry.register(prefix, uri);
        }
        let dictionary = Dictionary::with_content_model();
        for classification in &self.classifications {
            define_classification(&dictionary, classification);
        }
        InMemoryNodeStore::from_records(Arc::new(dictionary), self.stores, self.nodes)
    }
}

/// Register a classification aspect (a sub-aspect of `cm:classifiable`)
pub fn define_classification(dictionary: &Dictionary, classification: &ClassificationAspect) {
    dictionary.register_aspect(
        classification.aspect.clone(),
        Some(ASPECT_CLASSIFIABLE.clone()),
        vec![PropertyDefinition::category(classification.property.clone())],
    );
}

/// Write a snapshot, replacing any previous file atomically
pub fn save(path: &Path, snapshot: &RepositorySnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), nodes = snapshot.nodes.len(), "Saved snapshot");
    Ok(())
}

/// Read a snapshot; `None` when the file does not exist yet
pub fn load(path: &Path) -> Result<Option<RepositorySnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    let snapshot: RepositorySnapshot = serde_json::from_str(&contents)?;
    debug!(path = %path.display(), nodes = snapshot.nodes.len(), "Loaded snapshot");
    Ok(Some(snapshot))
}
