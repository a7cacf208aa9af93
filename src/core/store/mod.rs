//! Authoritative node store.
//!
//! The store owns the node graph: types, aspects, properties and the
//! parent/child associations that give every node its paths. The index
//! is derived from it and may lag behind; the store never does.

pub mod bootstrap;
pub mod memory;
pub mod snapshot;

pub use memory::InMemoryNodeStore;

use crate::core::error::Result;
use crate::core::model::{ChildAssocRef, Dictionary, NodeRef, Path, PropertyValue, QName, StoreRef};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Kind of change recorded in the store journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A journal entry. Ids increase monotonically per store instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeChange {
    pub id: u64,
    pub kind: ChangeKind,
    pub node: NodeRef,
}

/// Read and write access to the node graph
pub trait NodeService: Send + Sync {
    /// Dictionary the store validates against
    fn dictionary(&self) -> Arc<Dictionary>;

    fn stores(&self) -> Vec<StoreRef>;

    /// Create a store and its root node. Creating an existing store is an error.
    fn create_store(&self, store: &StoreRef) -> Result<NodeRef>;

    fn root_node(&self, store: &StoreRef) -> Result<NodeRef>;

    fn exists(&self, node: &NodeRef) -> bool;

    fn node_type(&self, node: &NodeRef) -> Result<QName>;

    fn aspects(&self, node: &NodeRef) -> Result<BTreeSet<QName>>;

    fn has_aspect(&self, node: &NodeRef, aspect: &QName) -> Result<bool> {
        Ok(self.aspects(node)?.contains(aspect))
    }

    /// Apply an aspect, merging in the given property values
    fn add_aspect(
        &self,
        node: &NodeRef,
        aspect: &QName,
        properties: BTreeMap<QName, PropertyValue>,
    ) -> Result<()>;

    fn properties(&self, node: &NodeRef) -> Result<BTreeMap<QName, PropertyValue>>;

    fn property(&self, node: &NodeRef, name: &QName) -> Result<Option<PropertyValue>> {
        Ok(self.properties(node)?.remove(name))
    }

    fn set_property(&self, node: &NodeRef, name: &QName, value: PropertyValue) -> Result<()>;

    /// Create a node beneath `parent` through a new primary association
    fn create_node(
        &self,
        parent: &NodeRef,
        assoc_type: &QName,
        assoc_qname: &QName,
        node_type: &QName,
        properties: BTreeMap<QName, PropertyValue>,
    ) -> Result<ChildAssocRef>;

    /// Link an existing node under a further (secondary) parent
    fn add_child(
        &self,
        parent: &NodeRef,
        child: &NodeRef,
        assoc_type: &QName,
        assoc_qname: &QName,
    ) -> Result<ChildAssocRef>;

    /// Delete a node together with its primary descendants
    fn delete_node(&self, node: &NodeRef) -> Result<()>;

    fn primary_parent(&self, node: &NodeRef) -> Result<ChildAssocRef>;

    /// All parent associations, primary first
    fn parent_assocs(&self, node: &NodeRef) -> Result<Vec<ChildAssocRef>>;

    /// Child associations, optionally restricted by association type and qname
    fn child_assocs(
        &self,
        node: &NodeRef,
        assoc_type: Option<&QName>,
        assoc_qname: Option<&QName>,
    ) -> Result<Vec<ChildAssocRef>>;

    /// Child whose `cm:name` equals `name`, ignoring case
    fn child_by_name(&self, node: &NodeRef, name: &str) -> Result<Option<NodeRef>>;

    /// Path along primary parents from the store root
    fn path(&self, node: &NodeRef) -> Result<Path>;

    /// Every path from the store root, following secondary parents too
    fn paths(&self, node: &NodeRef) -> Result<Vec<Path>>;

    /// Journal entries recorded after `after`
    fn changes_since(&self, after: u64) -> Vec<NodeChange>;
}
