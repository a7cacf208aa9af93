//! Index-backed search.

use super::like::property_like;
use super::{required_property, xpath_result_set, SearchService};
use crate::core::cmis::translate::like_to_wildcard;
use crate::core::cmis::CmisQueryService;
use crate::core::error::Result;
use crate::core::index::{IndexSearcher, QueryField, QueryLanguage, QueryNode, ResultSet, SearchParameters};
use crate::core::model::{NamespacePrefixResolver, NodeRef, PropertyValue, QName};
use crate::core::store::NodeService;
use crate::core::xpath::NodeSearcher;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs `lucene` and `cmis` queries on the node index and `xpath`
/// expressions against the store
pub struct IndexSearchService {
    nodes: Arc<dyn NodeService>,
    searcher: Arc<IndexSearcher>,
    node_searcher: NodeSearcher,
    cmis: CmisQueryService,
}

impl IndexSearchService {
    pub fn new(nodes: Arc<dyn NodeService>, searcher: Arc<IndexSearcher>) -> Self {
        Self {
            node_searcher: NodeSearcher::new(nodes.clone()),
            cmis: CmisQueryService::new(searcher.clone(), nodes.clone()),
            nodes,
            searcher,
        }
    }

    pub fn cmis(&self) -> &CmisQueryService {
        &self.cmis
    }
}

impl SearchService for IndexSearchService {
    fn query(&self, params: &SearchParameters) -> Result<ResultSet> {
        match params.language() {
            QueryLanguage::Lucene => self.searcher.query(params),
            QueryLanguage::Cmis => self.cmis.execute(params),
            QueryLanguage::XPath => xpath_result_set(
                &self.node_searcher,
                self.nodes.as_ref(),
                self.searcher.resolver(),
                params,
                self.searcher.index().stats(),
            ),
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
        self.searcher.node_contains(node, property, text)
    }

    fn like(
        &self,
        node: &NodeRef,
        property: Option<&QName>,
        pattern: &str,
        include_fts: bool,
    ) -> Result<bool> {
        let property = required_property(property)?;
        if !include_fts {
            return property_like(self.nodes.as_ref(), node, property, pattern);
        }
        let query = QueryNode::field(
            QueryField::Property(property.to_string()),
            like_to_wildcard(pattern),
        );
        self.searcher.node_matches(node, &query)
    }
}
