//! Search services.
//!
//! - **like**: SQL-style `like` patterns and store-side property matching
//! - **index**: Back end running every language against the node index
//! - **noindex**: Back end answering path expressions from the store only
//! - **delegator**: Facade forwarding to the configured back end
//!
//! The back end is picked once, from `search.subsystem`, when the
//! [`SearchServiceSubsystemDelegator`] is built.

pub mod delegator;
pub mod index;
pub mod like;
pub mod noindex;

pub use delegator::SearchServiceSubsystemDelegator;
pub use index::IndexSearchService;
pub use noindex::NoIndexSearchService;

use crate::core::error::{Result, TaxaError};
use crate::core::index::{ResultRow, ResultSet, ResultSetStats, SearchParameters};
use crate::core::model::{NamespacePrefixResolver, NodeRef, PropertyValue, QName};
use crate::core::store::NodeService;
use crate::core::xpath::NodeSearcher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Search operations offered to callers
pub trait SearchService: Send + Sync {
    /// Run a query in any language the back end supports
    fn query(&self, params: &SearchParameters) -> Result<ResultSet>;

    fn select_nodes(
        &self,
        context: &NodeRef,
        expression: &str,
        params: &BTreeMap<String, PropertyValue>,
        resolver: &dyn NamespacePrefixResolver,
        follow_all_parent_links: bool,
    ) -> Result<Vec<NodeRef>>;

    fn select_properties(
        &self,
        context: &NodeRef,
        expression: &str,
        params: &BTreeMap<String, PropertyValue>,
        resolver: &dyn NamespacePrefixResolver,
        follow_all_parent_links: bool,
    ) -> Result<Vec<PropertyValue>>;

    /// Does `property` of `node` contain every word of `text`
    fn contains(&self, node: &NodeRef, property: &QName, text: &str) -> Result<bool>;

    /// Does `property` of `node` match the SQL-style `pattern`.
    ///
    /// With `include_fts` the match runs through the full-text index.
    fn like(
        &self,
        node: &NodeRef,
        property: Option<&QName>,
        pattern: &str,
        include_fts: bool,
    ) -> Result<bool>;
}

/// Available search back ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    #[default]
    Index,
    NoIndex,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Index => write!(f, "index"),
            Subsystem::NoIndex => write!(f, "noindex"),
        }
    }
}

impl FromStr for Subsystem {
    type Err = TaxaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "index" => Ok(Subsystem::Index),
            "noindex" => Ok(Subsystem::NoIndex),
            other => Err(TaxaError::InvalidArgument(format!(
                "Unknown search subsystem: {other}"
            ))),
        }
    }
}

fn required_property(property: Option<&QName>) -> Result<&QName> {
    property.ok_or_else(|| TaxaError::InvalidArgument("A property name is required".to_string()))
}

/// Run an `xpath` query from the root of the first requested store.
///
/// Every selected node scores 1.0; paging and sorting follow `params`.
fn xpath_result_set(
    searcher: &NodeSearcher,
    nodes: &dyn NodeService,
    resolver: &dyn NamespacePrefixResolver,
    params: &SearchParameters,
    stats: Arc<ResultSetStats>,
) -> Result<ResultSet> {
    let store = params.stores().first().ok_or_else(|| {
        TaxaError::InvalidArgument("An xpath query needs a store".to_string())
    })?;
    let root = nodes.root_node(store)?;
    let selected = searcher.select_nodes(
        &root,
        params.query(),
        params.query_params(),
        resolver,
        false,
        params.sort(),
    )?;
    let total = selected.len();
    let skip = params.skip_count();
    let rows: Vec<ResultRow> = selected
        .into_iter()
        .skip(skip)
        .take(params.page_size().unwrap_or(usize::MAX))
        .map(|node| ResultRow::new(node, 1.0))
        .collect();
    debug!(expression = params.query(), found = total, "Executed xpath query");
    Ok(ResultSet::open(rows, total, skip, stats))
}
