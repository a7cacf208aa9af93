//! Tree navigation over the node store.

use crate::core::error::Result;
use crate::core::model::{ChildAssocRef, Dictionary, NodeRef, PropertyValue, QName, StoreRef};
use crate::core::store::NodeService;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Walks the node graph for the path evaluator.
///
/// Nodes are addressed through the association that reached them, so a
/// node with several parents can be visited once per parent.
pub struct NodeNavigator<'a> {
    nodes: &'a dyn NodeService,
    follow_all_parent_links: bool,
}

impl<'a> NodeNavigator<'a> {
    pub fn new(nodes: &'a dyn NodeService, follow_all_parent_links: bool) -> Self {
        Self {
            nodes,
            follow_all_parent_links,
        }
    }

    pub fn dictionary(&self) -> Arc<Dictionary> {
        self.nodes.dictionary()
    }

    /// Association pointing at the store root
    pub fn root(&self, store: &StoreRef) -> Result<ChildAssocRef> {
        Ok(ChildAssocRef::root(self.nodes.root_node(store)?))
    }

    /// Association by which `node` hangs off its primary parent
    pub fn primary_assoc(&self, node: &NodeRef) -> Result<ChildAssocRef> {
        self.nodes.primary_parent(node)
    }

    pub fn children(&self, node: &NodeRef) -> Result<Vec<ChildAssocRef>> {
        self.nodes.child_assocs(node, None, None)
    }

    /// Parents of `node`, each addressed by its own primary association.
    /// Only the primary parent unless all parent links are followed.
    pub fn parents(&self, node: &NodeRef) -> Result<Vec<ChildAssocRef>> {
        let links = if self.follow_all_parent_links {
            self.nodes.parent_assocs(node)?
        } else {
            vec![self.nodes.primary_parent(node)?]
        };
        let mut out = Vec::with_capacity(links.len());
        for link in links {
            if let Some(parent) = link.parent {
                out.push(self.primary_assoc(&parent)?);
            }
        }
        Ok(out)
    }

    /// Every association below `node`, depth first in document order
    pub fn descendants(&self, node: &NodeRef) -> Result<Vec<ChildAssocRef>> {
        let mut out = Vec::new();
        let mut stack: Vec<ChildAssocRef> = self.children(node)?.into_iter().rev().collect();
        while let Some(assoc) = stack.pop() {
            stack.extend(self.children(&assoc.child)?.into_iter().rev());
            out.push(assoc);
        }
        Ok(out)
    }

    pub fn properties(&self, node: &NodeRef) -> Result<BTreeMap<QName, PropertyValue>> {
        self.nodes.properties(node)
    }

    pub fn node_type(&self, node: &NodeRef) -> Result<QName> {
        self.nodes.node_type(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::content::{ASSOC_CONTAINS, CM_URI, TYPE_FOLDER};
    use crate::core::store::InMemoryNodeStore;

    fn folder(nodes: &InMemoryNodeStore, parent: &NodeRef, name: &str) -> NodeRef {
        nodes
            .create_node(
                parent,
                &ASSOC_CONTAINS,
                &QName::new(CM_URI, name),
                &TYPE_FOLDER,
                BTreeMap::new(),
            )
            .unwrap()
            .child
    }

    #[test]
    fn test_descendants_in_document_order() {
        let nodes = InMemoryNodeStore::new(Arc::new(Dictionary::with_content_model()));
        let root = nodes.create_store(&StoreRef::spaces_store()).unwrap();
        let a = folder(&nodes, &root, "a");
        let a1 = folder(&nodes, &a, "a1");
        let b = folder(&nodes, &root, "b");

        let navigator = NodeNavigator::new(&nodes, false);
        let found: Vec<NodeRef> = navigator
            .descendants(&root)
            .unwrap()
            .into_iter()
            .map(|assoc| assoc.child)
            .collect();
        assert_eq!(found, vec![a.clone(), a1, b]);
        assert!(navigator.parents(&root).unwrap().is_empty());
        assert_eq!(navigator.parents(&a).unwrap()[0].child, root);
    }

    #[test]
    fn test_secondary_parents_followed_on_request() {
        let nodes = InMemoryNodeStore::new(Arc::new(Dictionary::with_content_model()));
        let root = nodes.create_store(&StoreRef::spaces_store()).unwrap();
        let a = folder(&nodes, &root, "a");
        let b = folder(&nodes, &root, "b");
        let shared = folder(&nodes, &a, "shared");
        nodes
            .add_child(&b, &shared, &ASSOC_CONTAINS, &QName::new(CM_URI, "shared"))
            .unwrap();

        assert_eq!(NodeNavigator::new(&nodes, false).parents(&shared).unwrap().len(), 1);
        let all: Vec<NodeRef> = NodeNavigator::new(&nodes, true)
            .parents(&shared)
            .unwrap()
            .into_iter()
            .map(|assoc| assoc.child)
            .collect();
        assert_eq!(all, vec![a, b]);
    }
}
