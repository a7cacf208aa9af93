//! Index tracker.
//!
//! Replays the node store's change journal into the index. The index only
//! reflects store changes once the tracker has run, which is the window in
//! which searches can return rows for nodes that have already gone.

use super::path::render_paths;
use super::schema::NodeDocument;
use super::tantivy::NodeIndex;
use crate::core::error::Result;
use crate::core::model::content::MEMBER_SEGMENT;
use crate::core::model::{NamespacePrefixResolver, NodeRef, PropertyValue};
use crate::core::store::{ChangeKind, NodeService};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Outcome of one tracking run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackReport {
    pub indexed: usize,
    pub removed: usize,
    /// Last journal entry applied
    pub last_change: u64,
}

/// Keeps a [`NodeIndex`] in step with a [`NodeService`]
pub struct IndexTracker {
    nodes: Arc<dyn NodeService>,
    index: Arc<NodeIndex>,
    resolver: Arc<dyn NamespacePrefixResolver>,
    last_change: Mutex<u64>,
}

impl IndexTracker {
    pub fn new(
        nodes: Arc<dyn NodeService>,
        index: Arc<NodeIndex>,
        resolver: Arc<dyn NamespacePrefixResolver>,
    ) -> Self {
        Self {
            nodes,
            index,
            resolver,
            last_change: Mutex::new(0),
        }
    }

    /// Apply all journal entries recorded since the previous run, then commit
    pub fn track(&self) -> Result<TrackReport> {
        let mut last_change = self.last_change.lock().unwrap_or_else(|e| e.into_inner());
        let changes = self.nodes.changes_since(*last_change);
        let Some(newest) = changes.last().map(|c| c.id) else {
            return Ok(TrackReport {
                last_change: *last_change,
                ..TrackReport::default()
            });
        };

        let mut to_index = BTreeSet::new();
        let mut to_remove = BTreeSet::new();
        for change in &changes {
            match change.kind {
                ChangeKind::Deleted => {
                    to_index.remove(&change.node);
                    to_remove.insert(change.node.clone());
                }
                ChangeKind::Created => {
                    to_remove.remove(&change.node);
                    to_index.insert(change.node.clone());
                }
                ChangeKind::Updated => {
                    // paths of descendants may have changed with this node
                    to_remove.remove(&change.node);
                    for node in self.subtree(&change.node) {
                        to_index.insert(node);
                    }
                }
            }
        }

        let mut report = TrackReport {
            last_change: newest,
            ..TrackReport::default()
        };
        for node in &to_remove {
            self.index.remove(node);
            report.removed += 1;
        }
        for node in &to_index {
            match build_document(self.nodes.as_ref(), self.resolver.as_ref(), node) {
                Ok(document) => {
                    self.index.upsert(&document)?;
                    report.indexed += 1;
                }
                Err(e) if e.is_stale_reference() => {
                    debug!(node = %node, "Node vanished before indexing");
                    self.index.remove(node);
                    report.removed += 1;
                }
                Err(e) => return Err(e),
            }
        }
        self.index.commit()?;
        *last_change = newest;

        info!(
            indexed = report.indexed,
            removed = report.removed,
            last_change = newest,
            "Index synchronized"
        );
        Ok(report)
    }

    /// Journal position the index has caught up to
    pub fn last_change(&self) -> u64 {
        *self.last_change.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn subtree(&self, root: &NodeRef) -> Vec<NodeRef> {
        let mut out = vec![root.clone()];
        let mut seen: BTreeSet<NodeRef> = BTreeSet::from([root.clone()]);
        let mut cursor = 0;
        while cursor < out.len() {
            let current = out[cursor].clone();
            cursor += 1;
            if let Ok(children) = self.nodes.child_assocs(&current, None, None) {
                for assoc in children {
                    if seen.insert(assoc.child.clone()) {
                        out.push(assoc.child);
                    }
                }
            }
        }
        out
    }
}

/// Gather everything the index records about a node
pub fn build_document(
    nodes: &dyn NodeService,
    resolver: &dyn NamespacePrefixResolver,
    node: &NodeRef,
) -> Result<NodeDocument> {
    let dictionary = nodes.dictionary();
    let node_type = nodes.node_type(node)?;
    let aspects = nodes.aspects(node)?;
    let properties = nodes.properties(node)?;
    let parents = nodes.parent_assocs(node)?;

    let mut paths: BTreeSet<String> = render_paths(&nodes.paths(node)?, resolver)
        .into_iter()
        .collect();

    // members are indexed beneath every category they reference
    for (name, value) in &properties {
        if !dictionary.is_category_property(name) {
            continue;
        }
        for category in value.node_refs() {
            match nodes.path(category) {
                Ok(path) => {
                    for rendered in render_paths(&[path], resolver) {
                        let base = rendered.trim_end_matches('/');
                        paths.insert(format!("{base}/{MEMBER_SEGMENT}"));
                    }
                }
                Err(e) if e.is_stale_reference() => {
                    debug!(node = %node, category = %category, "Skipping missing category");
                }
                Err(e) => return Err(e),
            }
        }
    }

    let mut all_aspects = BTreeSet::new();
    for aspect in &aspects {
        all_aspects.extend(dictionary.super_classes(aspect));
    }

    Ok(NodeDocument {
        node: node.clone(),
        store: node.store_ref().clone(),
        paths,
        parents: parents.iter().filter_map(|a| a.parent.clone()).collect(),
        primary_parent: parents
            .iter()
            .find(|a| a.is_primary)
            .and_then(|a| a.parent.clone()),
        qnames: parents.iter().filter_map(|a| a.qname.clone()).collect(),
        types: dictionary.super_classes(&node_type),
        exact_type: node_type,
        aspects: all_aspects,
        properties: properties
            .into_iter()
            .filter(|(_, v)| !matches!(v, PropertyValue::List(items) if items.is_empty()))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::content::{ASSOC_CONTAINS, CM_URI, PROP_NAME, TYPE_FOLDER};
    use crate::core::model::{Dictionary, NamespaceRegistry, QName, StoreRef};
    use crate::core::store::InMemoryNodeStore;
    use std::collections::BTreeMap;

    fn setup() -> (Arc<InMemoryNodeStore>, IndexTracker, NodeRef) {
        let nodes = Arc::new(InMemoryNodeStore::new(Arc::new(Dictionary::with_content_model())));
        let root = nodes.create_store(&StoreRef::spaces_store()).unwrap();
        let index = Arc::new(NodeIndex::create_in_ram(50_000_000).unwrap());
        let tracker = IndexTracker::new(
            nodes.clone(),
            index,
            Arc::new(NamespaceRegistry::with_defaults()),
        );
        (nodes, tracker, root)
    }

    #[test]
    fn test_track_indexes_and_removes() {
        let (nodes, tracker, root) = setup();
        let folder = nodes
            .create_node(
                &root,
                &ASSOC_CONTAINS,
                &QName::new(CM_URI, "docs"),
                &TYPE_FOLDER,
                BTreeMap::from([(PROP_NAME.clone(), PropertyValue::text("docs"))]),
            )
            .unwrap()
            .child;

        let report = tracker.track().unwrap();
        assert_eq!(report.indexed, 2);
        assert_eq!(tracker.index.num_docs(), 2);

        nodes.delete_node(&folder).unwrap();
        let report = tracker.track().unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(tracker.index.num_docs(), 1);

        // nothing new
        assert_eq!(tracker.track().unwrap().indexed, 0);
    }

    #[test]
    fn test_document_paths_and_types() {
        let (nodes, _tracker, root) = setup();
        let folder = nodes
            .create_node(
                &root,
                &ASSOC_CONTAINS,
                &QName::new(CM_URI, "My Docs"),
                &TYPE_FOLDER,
                BTreeMap::new(),
            )
            .unwrap()
            .child;
        let registry = NamespaceRegistry::with_defaults();
        let document = build_document(nodes.as_ref(), &registry, &folder).unwrap();
        assert!(document.paths.contains("/cm:My_x0020_Docs"));
        assert_eq!(document.primary_parent, Some(root));
        assert!(document.types.len() >= 3);
    }
}
