//! In-memory node store.
//!
//! All state lives behind a single `RwLock`. Every mutation appends to a
//! change journal which the index tracker replays.

use super::{ChangeKind, NodeChange, NodeService};
use crate::core::error::{Result, TaxaError};
use crate::core::model::content::{PROP_CREATED, PROP_MODIFIED, PROP_NAME, TYPE_CMOBJECT, TYPE_STORE_ROOT};
use crate::core::model::{ChildAssocRef, Dictionary, NodeRef, Path, PropertyValue, QName, StoreRef};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Upper bound on paths enumerated for one node
const MAX_PATHS_PER_NODE: usize = 256;

/// Persistent form of a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_ref: NodeRef,
    pub node_type: QName,
    #[serde(default)]
    pub aspects: BTreeSet<QName>,
    #[serde(default)]
    pub properties: BTreeMap<QName, PropertyValue>,
    /// Parent associations, primary first
    pub parents: Vec<ChildAssocRef>,
    #[serde(default)]
    pub children: Vec<ChildAssocRef>,
}

impl NodeRecord {
    fn name(&self) -> Option<&str> {
        self.properties.get(&PROP_NAME).and_then(|v| v.as_text())
    }

    fn primary_parent(&self) -> Option<&ChildAssocRef> {
        self.parents.iter().find(|a| a.is_primary)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    roots: BTreeMap<StoreRef, NodeRef>,
    nodes: HashMap<NodeRef, NodeRecord>,
    journal: Vec<NodeChange>,
    next_change: u64,
}

impl StoreState {
    fn record(&self, node: &NodeRef) -> Result<&NodeRecord> {
        self.nodes
            .get(node)
            .ok_or_else(|| TaxaError::InvalidNodeRef(node.to_string()))
    }

    fn record_mut(&mut self, node: &NodeRef) -> Result<&mut NodeRecord> {
        self.nodes
            .get_mut(node)
            .ok_or_else(|| TaxaError::InvalidNodeRef(node.to_string()))
    }

    fn log(&mut self, kind: ChangeKind, node: &NodeRef) {
        self.next_change += 1;
        self.journal.push(NodeChange {
            id: self.next_change,
            kind,
            node: node.clone(),
        });
    }

    /// Fail when another child of `parent` already carries `name`
    fn check_unique_name(&self, parent: &NodeRef, name: &str, except: Option<&NodeRef>) -> Result<()> {
        let wanted = name.to_lowercase();
        let clash = self
            .record(parent)?
            .children
            .iter()
            .filter(|a| Some(&a.child) != except)
            .filter_map(|a| self.nodes.get(&a.child))
            .any(|child| child.name().is_some_and(|n| n.to_lowercase() == wanted));
        if clash {
            return Err(TaxaError::DuplicateChildName {
                parent: parent.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn is_ancestor(&self, candidate: &NodeRef, of: &NodeRef) -> bool {
        let mut queue = VecDeque::from([of.clone()]);
        let mut seen = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if &current == candidate {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(record) = self.nodes.get(&current) {
                queue.extend(record.parents.iter().filter_map(|a| a.parent.clone()));
            }
        }
        false
    }

    fn collect_paths(&self, node: &NodeRef, visiting: &mut Vec<NodeRef>, out: &mut Vec<Path>) -> Result<()> {
        let record = self.record(node)?;
        if visiting.contains(node) || out.len() >= MAX_PATHS_PER_NODE {
            return Ok(());
        }
        visiting.push(node.clone());
        for assoc in &record.parents {
            match &assoc.parent {
                None => out.push(Path::new(vec![assoc.clone()])),
                Some(parent) => {
                    let mut parent_paths = Vec::new();
                    self.collect_paths(parent, visiting, &mut parent_paths)?;
                    for mut path in parent_paths {
                        path.push(assoc.clone());
                        out.push(path);
                    }
                }
            }
        }
        visiting.pop();
        Ok(())
    }
}

/// Node store held entirely in memory
#[derive(Debug)]
pub struct InMemoryNodeStore {
    state: RwLock<StoreState>,
    dictionary: Arc<Dictionary>,
}

impl InMemoryNodeStore {
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            dictionary,
        }
    }

    /// Rebuild a store from persisted records. The journal starts with a
    /// `Created` entry for every node so a fresh index can catch up.
    pub fn from_records(
        dictionary: Arc<Dictionary>,
        roots: BTreeMap<StoreRef, NodeRef>,
        records: Vec<NodeRecord>,
    ) -> Result<Self> {
        let mut state = StoreState {
            roots,
            ..StoreState::default()
        };
        for record in records {
            let node = record.node_ref.clone();
            state.nodes.insert(node.clone(), record);
            state.log(ChangeKind::Created, &node);
        }
        for (store, root) in &state.roots {
            if !state.nodes.contains_key(root) {
                return Err(TaxaError::InvalidStoreRef(format!(
                    "{store} (root {root} missing from snapshot)"
                )));
            }
        }
        Ok(Self {
            state: RwLock::new(state),
            dictionary,
        })
    }

    /// Store roots and node records, for persistence
    pub fn export(&self) -> (BTreeMap<StoreRef, NodeRef>, Vec<NodeRecord>) {
        let state = self.read();
        let mut records: Vec<NodeRecord> = state.nodes.values().cloned().collect();
        records.sort_by(|a, b| a.node_ref.cmp(&b.node_ref));
        (state.roots.clone(), records)
    }

    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn check_type(&self, node_type: &QName) -> Result<()> {
        match self.dictionary.class(node_type) {
            Some(class) if !class.is_aspect => Ok(()),
            _ => Err(TaxaError::InvalidArgument(format!("Unknown type: {node_type}"))),
        }
    }
}

impl NodeService for InMemoryNodeStore {
    fn dictionary(&self) -> Arc<Dictionary> {
        Arc::clone(&self.dictionary)
    }

    fn stores(&self) -> Vec<StoreRef> {
        self.read().roots.keys().cloned().collect()
    }

    fn create_store(&self, store: &StoreRef) -> Result<NodeRef> {
        let mut state = self.write();
        if state.roots.contains_key(store) {
            return Err(TaxaError::InvalidArgument(format!("Store already exists: {store}")));
        }
        let root = NodeRef::generate(store);
        state.nodes.insert(
            root.clone(),
            NodeRecord {
                node_ref: root.clone(),
                node_type: TYPE_STORE_ROOT.clone(),
                aspects: BTreeSet::new(),
                properties: BTreeMap::new(),
                parents: vec![ChildAssocRef::root(root.clone())],
                children: Vec::new(),
            },
        );
        state.roots.insert(store.clone(), root.clone());
        state.log(ChangeKind::Created, &root);
        debug!(store = %store, root = %root, "Created store");
        Ok(root)
    }

    fn root_node(&self, store: &StoreRef) -> Result<NodeRef> {
        self.read()
            .roots
            .get(store)
            .cloned()
            .ok_or_else(|| TaxaError::InvalidStoreRef(store.to_string()))
    }

    fn exists(&self, node: &NodeRef) -> bool {
        self.read().nodes.contains_key(node)
    }

    fn node_type(&self, node: &NodeRef) -> Result<QName> {
        Ok(self.read().record(node)?.node_type.clone())
    }

    fn aspects(&self, node: &NodeRef) -> Result<BTreeSet<QName>> {
        Ok(self.read().record(node)?.aspects.clone())
    }

    fn add_aspect(
        &self,
        node: &NodeRef,
        aspect: &QName,
        properties: BTreeMap<QName, PropertyValue>,
    ) -> Result<()> {
        if !self.dictionary.is_aspect(aspect) {
            return Err(TaxaError::InvalidArgument(format!("Unknown aspect: {aspect}")));
        }
        let mut state = self.write();
        let record = state.record_mut(node)?;
        record.aspects.insert(aspect.clone());
        record.properties.extend(properties);
        state.log(ChangeKind::Updated, node);
        Ok(())
    }

    fn properties(&self, node: &NodeRef) -> Result<BTreeMap<QName, PropertyValue>> {
        Ok(self.read().record(node)?.properties.clone())
    }

    fn property(&self, node: &NodeRef, name: &QName) -> Result<Option<PropertyValue>> {
        Ok(self.read().record(node)?.properties.get(name).cloned())
    }

    fn set_property(&self, node: &NodeRef, name: &QName, value: PropertyValue) -> Result<()> {
        let mut state = self.write();
        if name == &*PROP_NAME {
            let new_name = value.to_text();
            let parent = state.record(node)?.primary_parent().and_then(|a| a.parent.clone());
            if let Some(parent) = parent {
                state.check_unique_name(&parent, &new_name, Some(node))?;
            }
        }
        let record = state.record_mut(node)?;
        record.properties.insert(name.clone(), value);
        if self.dictionary.is_sub_class(&record.node_type, &TYPE_CMOBJECT) {
            record
                .properties
                .insert(PROP_MODIFIED.clone(), PropertyValue::Date(Utc::now()));
        }
        state.log(ChangeKind::Updated, node);
        Ok(())
    }

    fn create_node(
        &self,
        parent: &NodeRef,
        assoc_type: &QName,
        assoc_qname: &QName,
        node_type: &QName,
        mut properties: BTreeMap<QName, PropertyValue>,
    ) -> Result<ChildAssocRef> {
        self.check_type(node_type)?;
        let mut state = self.write();
        state.record(parent)?;
        if let Some(name) = properties.get(&PROP_NAME) {
            state.check_unique_name(parent, &name.to_text(), None)?;
        }
        if self.dictionary.is_sub_class(node_type, &TYPE_CMOBJECT) {
            let now = PropertyValue::Date(Utc::now());
            properties.entry(PROP_CREATED.clone()).or_insert_with(|| now.clone());
            properties.entry(PROP_MODIFIED.clone()).or_insert(now);
        }

        let child = NodeRef::generate(parent.store_ref());
        let mut assoc = ChildAssocRef::new(
            assoc_type.clone(),
            parent.clone(),
            assoc_qname.clone(),
            child.clone(),
            true,
        );
        let parent_record = state.record_mut(parent)?;
        assoc.nth_sibling = parent_record.children.len() as i32;
        parent_record.children.push(assoc.clone());

        state.nodes.insert(
            child.clone(),
            NodeRecord {
                node_ref: child.clone(),
                node_type: node_type.clone(),
                aspects: BTreeSet::new(),
                properties,
                parents: vec![assoc.clone()],
                children: Vec::new(),
            },
        );
        state.log(ChangeKind::Created, &child);
        Ok(assoc)
    }

    fn add_child(
        &self,
        parent: &NodeRef,
        child: &NodeRef,
        assoc_type: &QName,
        assoc_qname: &QName,
    ) -> Result<ChildAssocRef> {
        let mut state = self.write();
        state.record(parent)?;
        state.record(child)?;
        if state.is_ancestor(child, parent) {
            return Err(TaxaError::InvalidArgument(format!(
                "Linking {child} under {parent} would create a cycle"
            )));
        }
        let mut assoc = ChildAssocRef::new(
            assoc_type.clone(),
            parent.clone(),
            assoc_qname.clone(),
            child.clone(),
            false,
        );
        let parent_record = state.record_mut(parent)?;
        if parent_record.children.contains(&assoc) {
            return Ok(assoc);
        }
        assoc.nth_sibling = parent_record.children.len() as i32;
        parent_record.children.push(assoc.clone());
        state.record_mut(child)?.parents.push(assoc.clone());
        state.log(ChangeKind::Updated, child);
        Ok(assoc)
    }

    fn delete_node(&self, node: &NodeRef) -> Result<()> {
        let mut state = self.write();
        if state.roots.values().any(|root| root == node) {
            return Err(TaxaError::InvalidArgument(format!(
                "Cannot delete store root: {node}"
            )));
        }
        state.record(node)?;

        // primary descendants go with the node
        let mut doomed = vec![node.clone()];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let current = doomed[cursor].clone();
            cursor += 1;
            if let Some(record) = state.nodes.get(&current) {
                doomed.extend(
                    record
                        .children
                        .iter()
                        .filter(|a| a.is_primary)
                        .map(|a| a.child.clone()),
                );
            }
        }
        let doomed_set: HashSet<NodeRef> = doomed.iter().cloned().collect();

        let mut orphaned_links = BTreeSet::new();
        for gone in &doomed {
            let Some(record) = state.nodes.remove(gone) else {
                continue;
            };
            for assoc in &record.parents {
                if let Some(parent) = assoc.parent.as_ref().filter(|p| !doomed_set.contains(*p)) {
                    if let Some(parent_record) = state.nodes.get_mut(parent) {
                        parent_record.children.retain(|a| a != assoc);
                    }
                }
            }
            for assoc in record.children.iter().filter(|a| !a.is_primary) {
                if doomed_set.contains(&assoc.child) {
                    continue;
                }
                if let Some(child_record) = state.nodes.get_mut(&assoc.child) {
                    child_record.parents.retain(|a| a != assoc);
                    orphaned_links.insert(assoc.child.clone());
                }
            }
        }

        for gone in &doomed {
            state.log(ChangeKind::Deleted, gone);
        }
        for relinked in &orphaned_links {
            state.log(ChangeKind::Updated, relinked);
        }
        debug!(node = %node, removed = doomed.len(), "Deleted node");
        Ok(())
    }

    fn primary_parent(&self, node: &NodeRef) -> Result<ChildAssocRef> {
        let state = self.read();
        state
            .record(node)?
            .primary_parent()
            .cloned()
            .ok_or_else(|| TaxaError::InvalidNodeRef(format!("{node} has no primary parent")))
    }

    fn parent_assocs(&self, node: &NodeRef) -> Result<Vec<ChildAssocRef>> {
        let state = self.read();
        let record = state.record(node)?;
        let mut parents: Vec<ChildAssocRef> = record.parents.iter().filter(|a| a.is_primary).cloned().collect();
        parents.extend(record.parents.iter().filter(|a| !a.is_primary).cloned());
        Ok(parents)
    }

    fn child_assocs(
        &self,
        node: &NodeRef,
        assoc_type: Option<&QName>,
        assoc_qname: Option<&QName>,
    ) -> Result<Vec<ChildAssocRef>> {
        let state = self.read();
        Ok(state
            .record(node)?
            .children
            .iter()
            .filter(|a| assoc_type.map_or(true, |t| a.assoc_type.as_ref() == Some(t)))
            .filter(|a| assoc_qname.map_or(true, |q| a.qname.as_ref() == Some(q)))
            .cloned()
            .collect())
    }

    fn child_by_name(&self, node: &NodeRef, name: &str) -> Result<Option<NodeRef>> {
        let state = self.read();
        let wanted = name.to_lowercase();
        Ok(state
            .record(node)?
            .children
            .iter()
            .find(|a| {
                state
                    .nodes
                    .get(&a.child)
                    .and_then(|c| c.name())
                    .is_some_and(|n| n.to_lowercase() == wanted)
            })
            .map(|a| a.child.clone()))
    }

    fn path(&self, node: &NodeRef) -> Result<Path> {
        let state = self.read();
        let mut elements = Vec::new();
        let mut current = node.clone();
        loop {
            let record = state.record(&current)?;
            let assoc = record
                .primary_parent()
                .cloned()
                .ok_or_else(|| TaxaError::InvalidNodeRef(format!("{current} has no primary parent")))?;
            let parent = assoc.parent.clone();
            elements.push(assoc);
            match parent {
                Some(parent) => {
                    if elements.len() > state.nodes.len() {
                        return Err(TaxaError::InvalidArgument(format!(
                            "Cyclic primary path at {node}"
                        )));
                    }
                    current = parent;
                }
                None => break,
            }
        }
        elements.reverse();
        Ok(Path::new(elements))
    }

    fn paths(&self, node: &NodeRef) -> Result<Vec<Path>> {
        let state = self.read();
        let mut out = Vec::new();
        state.collect_paths(node, &mut Vec::new(), &mut out)?;
        Ok(out)
    }

    fn changes_since(&self, after: u64) -> Vec<NodeChange> {
        let state = self.read();
        let start = state.journal.partition_point(|c| c.id <= after);
        state.journal[start..].to_vec()
    }
}
