//! Store, node and association references.

use super::iso9075;
use super::qname::{NamespacePrefixResolver, QName};
use crate::core::error::{Result, TaxaError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

pub const PROTOCOL_WORKSPACE: &str = "workspace";
pub const PROTOCOL_ARCHIVE: &str = "archive";

/// Reference to a store: `protocol://identifier`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreRef {
    protocol: String,
    identifier: String,
}

impl StoreRef {
    pub fn new(protocol: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            identifier: identifier.into(),
        }
    }

    /// The default workspace store
    pub fn spaces_store() -> Self {
        Self::new(PROTOCOL_WORKSPACE, "SpacesStore")
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Display for StoreRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol, self.identifier)
    }
}

impl FromStr for StoreRef {
    type Err = TaxaError;

    fn from_str(s: &str) -> Result<Self> {
        let (protocol, identifier) = s
            .split_once("://")
            .ok_or_else(|| TaxaError::InvalidArgument(format!("Invalid store reference: {s}")))?;
        if protocol.is_empty() || identifier.is_empty() || identifier.contains('/') {
            return Err(TaxaError::InvalidArgument(format!(
                "Invalid store reference: {s}"
            )));
        }
        Ok(Self::new(protocol, identifier))
    }
}

impl TryFrom<String> for StoreRef {
    type Error = TaxaError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<StoreRef> for String {
    fn from(value: StoreRef) -> Self {
        value.to_string()
    }
}

/// Reference to a node: `protocol://identifier/id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeRef {
    store: StoreRef,
    id: String,
}

impl NodeRef {
    pub fn new(store: StoreRef, id: impl Into<String>) -> Self {
        Self {
            store,
            id: id.into(),
        }
    }

    /// New node reference with a random id
    pub fn generate(store: &StoreRef) -> Self {
        Self::new(store.clone(), uuid::Uuid::new_v4().to_string())
    }

    pub fn store_ref(&self) -> &StoreRef {
        &self.store
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.store, self.id)
    }
}

impl FromStr for NodeRef {
    type Err = TaxaError;

    fn from_str(s: &str) -> Result<Self> {
        let (store, id) = s
            .rsplit_once('/')
            .ok_or_else(|| TaxaError::InvalidArgument(format!("Invalid node reference: {s}")))?;
        if id.is_empty() {
            return Err(TaxaError::InvalidArgument(format!(
                "Invalid node reference: {s}"
            )));
        }
        Ok(Self::new(store.parse()?, id))
    }
}

impl TryFrom<String> for NodeRef {
    type Error = TaxaError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<NodeRef> for String {
    fn from(value: NodeRef) -> Self {
        value.to_string()
    }
}

/// A parent-child association between two nodes.
///
/// The root association of a store has no parent, type or qname.
/// Equality ignores `is_primary` and `nth_sibling`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildAssocRef {
    pub assoc_type: Option<QName>,
    pub parent: Option<NodeRef>,
    pub qname: Option<QName>,
    pub child: NodeRef,
    pub is_primary: bool,
    pub nth_sibling: i32,
}

impl ChildAssocRef {
    pub fn new(
        assoc_type: QName,
        parent: NodeRef,
        qname: QName,
        child: NodeRef,
        is_primary: bool,
    ) -> Self {
        Self {
            assoc_type: Some(assoc_type),
            parent: Some(parent),
            qname: Some(qname),
            child,
            is_primary,
            nth_sibling: -1,
        }
    }

    /// Association pointing at a store root
    pub fn root(child: NodeRef) -> Self {
        Self {
            assoc_type: None,
            parent: None,
            qname: None,
            child,
            is_primary: true,
            nth_sibling: -1,
        }
    }
}

impl PartialEq for ChildAssocRef {
    fn eq(&self, other: &Self) -> bool {
        self.assoc_type == other.assoc_type
            && self.parent == other.parent
            && self.qname == other.qname
            && self.child == other.child
    }
}

impl Eq for ChildAssocRef {}

impl Hash for ChildAssocRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.assoc_type.hash(state);
        self.parent.hash(state);
        self.qname.hash(state);
        self.child.hash(state);
    }
}

/// Chain of associations from a store root down to a node
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Path {
    elements: Vec<ChildAssocRef>,
}

impl Path {
    pub fn new(elements: Vec<ChildAssocRef>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[ChildAssocRef] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn last(&self) -> Option<&ChildAssocRef> {
        self.elements.last()
    }

    pub fn push(&mut self, element: ChildAssocRef) {
        self.elements.push(element);
    }

    /// Render as `/prefix:local/...`, ISO 9075 encoding each local name.
    ///
    /// The root element contributes nothing, so the root path renders as `/`.
    pub fn to_prefix_string(&self, resolver: &dyn NamespacePrefixResolver) -> Result<String> {
        let mut out = String::new();
        for element in &self.elements {
            if element.parent.is_none() {
                continue;
            }
            let qname = element
                .qname
                .as_ref()
                .ok_or_else(|| TaxaError::InvalidArgument("Association without qname".into()))?;
            out.push('/');
            out.push_str(&encode_qname(qname, resolver)?);
        }
        if out.is_empty() {
            out.push('/');
        }
        Ok(out)
    }
}

/// `prefix:encoded-local` for a path segment
pub fn encode_qname(qname: &QName, resolver: &dyn NamespacePrefixResolver) -> Result<String> {
    let local = iso9075::encode(qname.local_name());
    if qname.namespace().is_empty() {
        return Ok(local);
    }
    let prefix = resolver
        .prefixes(qname.namespace())
        .into_iter()
        .next()
        .ok_or_else(|| TaxaError::NamespaceNotFound(qname.namespace().to_string()))?;
    Ok(if prefix.is_empty() {
        local
    } else {
        format!("{prefix}:{local}")
    })
}
