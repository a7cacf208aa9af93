//! Path-expression selection over the node graph.
//!
//! - **parser**: Expression grammar
//! - **navigator**: Store-backed tree navigation
//! - **eval**: Expression evaluation
//!
//! [`NodeSearcher`] answers `select_nodes` and `select_properties` straight
//! from the node store, without touching the index.

pub mod eval;
pub mod navigator;
pub mod parser;

pub use eval::{Evaluator, Item};
pub use navigator::NodeNavigator;
pub use parser::{parse_path, Expr};

use crate::core::error::{Result, TaxaError};
use crate::core::index::searcher::compare_optional;
use crate::core::index::{SortDefinition, SortField};
use crate::core::model::{NamespacePrefixResolver, NodeRef, PropertyValue, QName};
use crate::core::store::NodeService;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Evaluates path expressions against a [`NodeService`]
pub struct NodeSearcher {
    nodes: Arc<dyn NodeService>,
}

impl NodeSearcher {
    pub fn new(nodes: Arc<dyn NodeService>) -> Self {
        Self { nodes }
    }

    /// Nodes selected by `expression`, unique in first-seen order.
    ///
    /// Fails with `InvalidPathResult` if the expression selects properties.
    pub fn select_nodes(
        &self,
        context: &NodeRef,
        expression: &str,
        params: &BTreeMap<String, PropertyValue>,
        resolver: &dyn NamespacePrefixResolver,
        follow_all_parent_links: bool,
        order_by: &[SortDefinition],
    ) -> Result<Vec<NodeRef>> {
        let items = self.evaluate(context, expression, params, resolver, follow_all_parent_links)?;

        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Item::Assoc(assoc) => {
                    if seen.insert(assoc.child.clone()) {
                        nodes.push(assoc.child);
                    }
                }
                Item::Property { name, .. } => {
                    return Err(TaxaError::InvalidPathResult(format!(
                        "Expected nodes but '{expression}' selected property {name}"
                    )))
                }
            }
        }

        if !order_by.is_empty() {
            let mut keyed = Vec::with_capacity(nodes.len());
            for node in nodes {
                keyed.push((self.nodes.properties(&node)?, node));
            }
            sort_by_properties(&mut keyed, order_by);
            nodes = keyed.into_iter().map(|(_, node)| node).collect();
        }
        Ok(nodes)
    }

    /// Property values selected by `expression`, unique per node and property.
    ///
    /// Fails with `InvalidPathResult` if the expression selects nodes.
    /// Ordering keys are read from the node carrying each value.
    pub fn select_properties(
        &self,
        context: &NodeRef,
        expression: &str,
        params: &BTreeMap<String, PropertyValue>,
        resolver: &dyn NamespacePrefixResolver,
        follow_all_parent_links: bool,
        order_by: &[SortDefinition],
    ) -> Result<Vec<PropertyValue>> {
        let items = self.evaluate(context, expression, params, resolver, follow_all_parent_links)?;

        let mut seen = HashSet::new();
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Item::Property { node, name, value } => {
                    if seen.insert((node.clone(), name)) {
                        values.push((node, value));
                    }
                }
                Item::Assoc(assoc) => {
                    return Err(TaxaError::InvalidPathResult(format!(
                        "Expected properties but '{expression}' selected node {}",
                        assoc.child
                    )))
                }
            }
        }

        if !order_by.is_empty() {
            let mut keyed = Vec::with_capacity(values.len());
            for (node, value) in values {
                keyed.push((self.nodes.properties(&node)?, value));
            }
            sort_by_properties(&mut keyed, order_by);
            return Ok(keyed.into_iter().map(|(_, value)| value).collect());
        }
        Ok(values.into_iter().map(|(_, value)| value).collect())
    }

    fn evaluate(
        &self,
        context: &NodeRef,
        expression: &str,
        params: &BTreeMap<String, PropertyValue>,
        resolver: &dyn NamespacePrefixResolver,
        follow_all_parent_links: bool,
    ) -> Result<Vec<Item>> {
        let parsed = parse_path(expression)?;
        let navigator = NodeNavigator::new(self.nodes.as_ref(), follow_all_parent_links);
        let evaluator = Evaluator::new(&navigator, resolver, params, expression);
        let items = evaluator.select(&parsed, context)?;
        debug!(expression = expression, selected = items.len(), "Evaluated path");
        Ok(items)
    }
}

/// Stable multi-key sort on property values; nulls first ascending, last descending
fn sort_by_properties<T>(entries: &mut [(BTreeMap<QName, PropertyValue>, T)], order_by: &[SortDefinition]) {
    entries.sort_by(|(a, _), (b, _)| {
        for definition in order_by {
            let SortField::Property(name) = &definition.field else {
                continue;
            };
            let ordering = compare_optional(a.get(name), b.get(name));
            let ordering = if definition.ascending {
                ordering
            } else {
                ordering.reverse()
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
