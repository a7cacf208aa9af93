//! Store-only search back end.

use super::like::{property_contains, property_like};
use super::{required_property, xpath_result_set, SearchService};
use crate::core::error::{Result, TaxaError};
use crate::core::index::{QueryLanguage, ResultSet, ResultSetStats, SearchParameters};
use crate::core::model::{NamespacePrefixResolver, NodeRef, PropertyValue, QName};
use crate::core::store::NodeService;
use crate::core::xpath::NodeSearcher;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Answers `xpath` queries and property matches from the node store.
/// Index languages are unsupported.
pub struct NoIndexSearchService {
    nodes: Arc<dyn NodeService>,
    resolver: Arc<dyn NamespacePrefixResolver>,
    node_searcher: NodeSearcher,
    stats: Arc<ResultSetStats>,
}

impl NoIndexSearchService {
    pub fn new(nodes: Arc<dyn NodeService>, resolver: Arc<dyn NamespacePrefixResolver>) -> Self {
        Self {
            node_searcher: NodeSearcher::new(nodes.clone()),
            nodes,
            resolver,
            stats: ResultSetStats::new(),
        }
    }

    pub fn stats(&self) -> Arc<ResultSetStats> {
        self.stats.clone()
    }
}

impl SearchService for NoIndexSearchService {
    fn query(&self, params: &SearchParameters) -> Result<ResultSet> {
        match params.language() {
            QueryLanguage::XPath => xpath_result_set(
                &self.node_searcher,
                self.nodes.as_ref(),
                self.resolver.as_ref(),
                params,
                self.stats.clone(),
            ),
            other => Err(TaxaError::Unsupported(format!(
                "The noindex search subsystem cannot run {other} queries"
            ))),
        }
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
        property_contains(self.nodes.as_ref(), node, property, text)
    }

    fn like(
        &self,
        node: &NodeRef,
        property: Option<&QName>,
        pattern: &str,
        include_fts: bool,
    ) -> Result<bool> {
        if include_fts {
            return Err(TaxaError::Unsupported(
                "Full-text like needs the index search subsystem".to_string(),
            ));
        }
        property_like(self.nodes.as_ref(), node, required_property(property)?, pattern)
    }
}
