//! CMIS query language support.
//!
//! - **parser**: CMIS-QL grammar
//! - **translate**: Statements to index query trees and sorts
//! - **results**: Tabular result sets
//!
//! Statements run against the node index. Column values are read from the
//! node store, so an index row whose node has since been deleted is
//! dropped from the page and counted as stale.

pub mod parser;
pub mod results;
pub mod translate;

pub use parser::{parse_cmis, CmisQuery, Condition};
pub use results::{CmisResultSet, CmisRow};
pub use translate::{CmisColumn, CmisTranslator};

use crate::core::error::{Result, TaxaError};
use crate::core::index::{IndexSearcher, QueryLanguage, ResultSet, SearchParameters};
use crate::core::model::{NodeRef, PropertyValue};
use crate::core::store::NodeService;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Executes CMIS statements over the node index
pub struct CmisQueryService {
    searcher: Arc<IndexSearcher>,
    nodes: Arc<dyn NodeService>,
}

impl CmisQueryService {
    pub fn new(searcher: Arc<IndexSearcher>, nodes: Arc<dyn NodeService>) -> Self {
        Self { searcher, nodes }
    }

    /// Parse and run the statement in `params`, projecting the selected columns
    pub fn query(&self, params: &SearchParameters) -> Result<CmisResultSet> {
        let query = self.parse(params)?;
        self.query_structured(&query, params)
    }

    /// Run an already parsed statement; `params` supplies stores, paging and extra sorts
    pub fn query_structured(
        &self,
        query: &CmisQuery,
        params: &SearchParameters,
    ) -> Result<CmisResultSet> {
        let translator = CmisTranslator::new(self.nodes.as_ref(), self.searcher.resolver());
        let columns = query
            .columns
            .iter()
            .map(|c| Ok((c.label().to_string(), translator.column(query, &c.column)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut results = self.run(query, params)?;
        let mut rows = Vec::with_capacity(results.len());
        let mut stale = 0;
        for row in results.rows() {
            if !self.nodes.exists(&row.node) {
                debug!(node = %row.node, "Skipping index row for missing node");
                stale += 1;
                continue;
            }
            let values = if columns.is_empty() {
                self.all_values(&row.node)?
            } else {
                let mut values = BTreeMap::new();
                for (label, column) in &columns {
                    values.insert(label.clone(), self.value(&row.node, column)?);
                }
                values
            };
            rows.push(CmisRow {
                node: row.node.clone(),
                score: row.score,
                values,
            });
        }
        let result = CmisResultSet {
            columns: columns.into_iter().map(|(label, _)| label).collect(),
            rows,
            num_found: results.num_found(),
            skip_count: results.start(),
            has_more: results.has_more(),
            skipped_stale: stale,
        };
        results.close();
        Ok(result)
    }

    /// Run the statement in `params` and hand back the raw index result set
    pub fn execute(&self, params: &SearchParameters) -> Result<ResultSet> {
        let query = self.parse(params)?;
        self.run(&query, params)
    }

    fn parse(&self, params: &SearchParameters) -> Result<CmisQuery> {
        if params.language() != QueryLanguage::Cmis {
            return Err(TaxaError::InvalidArgument(format!(
                "Expected a CMIS statement, got language {}",
                params.language()
            )));
        }
        parse_cmis(params.query())
    }

    fn run(&self, query: &CmisQuery, params: &SearchParameters) -> Result<ResultSet> {
        let translator = CmisTranslator::new(self.nodes.as_ref(), self.searcher.resolver());
        let tree = translator.query(query)?;

        // ORDER BY keys come before any sort on the parameters
        let mut builder = SearchParameters::builder(QueryLanguage::Cmis, params.query())
            .skip_count(params.skip_count())
            .default_operator(params.default_operator());
        for store in params.stores() {
            builder = builder.store(store.clone());
        }
        if let Some(size) = params.page_size() {
            builder = builder.max_items(size);
        }
        for sort in translator.sort(query)?.into_iter().chain(params.sort().iter().cloned()) {
            builder = builder.sort(sort);
        }
        for facet in params.facets() {
            builder = builder.facet(facet.clone());
        }
        debug!(statement = params.query(), "Executing CMIS query");
        self.searcher.query_node(&tree, &builder.build())
    }

    fn value(&self, node: &NodeRef, column: &CmisColumn) -> Result<Option<PropertyValue>> {
        Ok(match column {
            CmisColumn::ObjectId => Some(PropertyValue::NodeRef(node.clone())),
            CmisColumn::ObjectTypeId => Some(PropertyValue::QName(self.nodes.node_type(node)?)),
            CmisColumn::ParentId => self.nodes.primary_parent(node)?.parent.map(PropertyValue::NodeRef),
            CmisColumn::Property(name) => self.nodes.property(node, name)?,
        })
    }

    /// `SELECT *`: every stored property under its prefixed name, plus the object id
    fn all_values(&self, node: &NodeRef) -> Result<BTreeMap<String, Option<PropertyValue>>> {
        let resolver = self.searcher.resolver();
        let mut values = BTreeMap::new();
        values.insert(
            "cmis:objectId".to_string(),
            Some(PropertyValue::NodeRef(node.clone())),
        );
        for (name, value) in self.nodes.properties(node)? {
            let label = name
                .to_prefix_string(resolver)
                .unwrap_or_else(|_| name.to_string());
            values.insert(label, Some(value));
        }
        Ok(values)
    }
}
