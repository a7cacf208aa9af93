//! Facade over the configured search back end.

use super::like::property_like;
use super::{
    required_property, IndexSearchService, NoIndexSearchService, SearchService, Subsystem,
};
use crate::core::error::Result;
use crate::core::index::{IndexSearcher, ResultSet, SearchParameters};
use crate::core::model::{NamespacePrefixResolver, NodeRef, PropertyValue, QName};
use crate::core::store::NodeService;
use crate::core::xpath::NodeSearcher;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Forwards queries and `contains` to one back end. Path selection and
/// non-full-text `like` are answered from the node store directly.
pub struct SearchServiceSubsystemDelegator {
    subsystem: Subsystem,
    backend: Arc<dyn SearchService>,
    nodes: Arc<dyn NodeService>,
    node_searcher: NodeSearcher,
}

impl SearchServiceSubsystemDelegator {
    pub fn new(
        subsystem: Subsystem,
        backend: Arc<dyn SearchService>,
        nodes: Arc<dyn NodeService>,
    ) -> Self {
        Self {
            subsystem,
            backend,
            node_searcher: NodeSearcher::new(nodes.clone()),
            nodes,
        }
    }

    /// Build the back end named by `subsystem`
    pub fn for_subsystem(
        subsystem: Subsystem,
        nodes: Arc<dyn NodeService>,
        searcher: Arc<IndexSearcher>,
        resolver: Arc<dyn NamespacePrefixResolver>,
    ) -> Self {
        let backend: Arc<dyn SearchService> = match subsystem {
            Subsystem::Index => Arc::new(IndexSearchService::new(nodes.clone(), searcher)),
            Subsystem::NoIndex => Arc::new(NoIndexSearchService::new(nodes.clone(), resolver)),
        };
        debug!(subsystem = %subsystem, "Selected search subsystem");
        Self::new(subsystem, backend, nodes)
    }

    pub fn subsystem(&self) -> Subsystem {
        self.subsystem
    }
}

impl SearchService for SearchServiceSubsystemDelegator {
    fn query(&self, params: &SearchParameters) -> Result<ResultSet> {
        self.backend.query(params)
    }

    fn select_nodes(
        &self,
        context: &NodeRef,
        expression: &str,
        params: &BTreeMap<String, PropertyValue>,
        resolver: &dyn NamespacePrefixResolver,
        follow_all_parent_links: bool,
    ) -> Result<Vec<NodeRef>> {
        self.node_searcher
            .select_nodes(context, expression, params, resolver, follow_all_parent_links, &[])
    }

    fn select_properties(
        &self,
        context: &NodeRef,
        expression: &str,
        params: &BTreeMap<String, PropertyValue>,
        resolver: &dyn NamespacePrefixResolver,
        follow_all_parent_links: bool,
    ) -> Result<Vec<PropertyValue>> {
        self.node_searcher
            .select_properties(context, expression, params, resolver, follow_all_parent_links, &[])
    }

    fn contains(&self, node: &NodeRef, property: &QName, text: &str) -> Result<bool> {
        self.backend.contains(node, property, text)
    }

    fn like(
        &self,
        node: &NodeRef,
        property: Option<&QName>,
        pattern: &str,
        include_fts: bool,
    ) -> Result<bool> {
        let property = required_property(property)?;
        if include_fts {
            return self.backend.like(node, Some(property), pattern, true);
        }
        property_like(self.nodes.as_ref(), node, property, pattern)
    }
}
