//! Tabular CMIS results.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::model::{NodeRef, PropertyValue};

/// One selected object and its column values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CmisRow {
    pub node: NodeRef,
    pub score: f32,
    /// Keyed by column label; `None` when the object has no value
    pub values: BTreeMap<String, Option<PropertyValue>>,
}

impl CmisRow {
    pub fn value(&self, column: &str) -> Option<&PropertyValue> {
        self.values.get(column).and_then(Option::as_ref)
    }
}

/// A page of CMIS query results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CmisResultSet {
    /// Selected column labels; empty for `SELECT *`
    pub columns: Vec<String>,
    pub rows: Vec<CmisRow>,
    /// Matches in the index before paging
    pub num_found: usize,
    pub skip_count: usize,
    pub has_more: bool,
    /// Index rows dropped because their node no longer exists
    pub skipped_stale: usize,
}

impl CmisResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn node_refs(&self) -> Vec<NodeRef> {
        self.rows.iter().map(|r| r.node.clone()).collect()
    }
}
