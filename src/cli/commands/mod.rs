//! CLI command implementations
//!
//! Each command module handles argument parsing and execution for a specific CLI command.

pub mod category;
pub mod completions;
pub mod config;
pub mod init;
pub mod query;
pub mod select;

// Re-export argument types for use in mod.rs
pub use completions::CompletionsArgs;
pub use config::ConfigArgs;
pub use init::InitArgs;
pub use query::QueryArgs;
pub use select::SelectArgs;

use crate::core::error::Result;
use crate::core::model::content::PROP_NAME;
use crate::core::model::{ChildAssocRef, NodeRef, QName, StoreRef};
use crate::core::services::Services;
use serde::Serialize;

/// `--store`, else the configured default store
pub(crate) fn store_or_default(services: &Services, store: Option<&str>) -> Result<StoreRef> {
    match store {
        Some(store) => store.parse(),
        None => services.config.default_store(),
    }
}

/// Resolve `prefix:local` or `{uri}local`
pub(crate) fn qname(services: &Services, name: &str) -> Result<QName> {
    QName::resolve(name, services.registry.as_ref())
}

/// `cm:name` of a node, else the local name it is linked under
pub(crate) fn node_name(services: &Services, node: &NodeRef, qname: Option<&QName>) -> String {
    use crate::core::store::NodeService;
    match services.nodes.property(node, &PROP_NAME) {
        Ok(Some(name)) => name.to_text(),
        _ => qname.map(|q| q.local_name().to_string()).unwrap_or_default(),
    }
}

/// One listed node
#[derive(Debug, Serialize)]
pub struct NodeItem {
    pub node: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl NodeItem {
    pub(crate) fn from_assoc(services: &Services, assoc: &ChildAssocRef) -> Self {
        Self {
            node: assoc.child.to_string(),
            name: node_name(services, &assoc.child, assoc.qname.as_ref()),
            parent: assoc.parent.as_ref().map(ToString::to_string),
        }
    }

    pub(crate) fn from_node(services: &Services, node: &NodeRef) -> Self {
        Self {
            node: node.to_string(),
            name: node_name(services, node, None),
            parent: None,
        }
    }
}
