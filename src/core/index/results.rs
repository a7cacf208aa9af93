//! Result sets and paging.
//!
//! A [`ResultSet`] is a scoped resource: it must be closed once consumed.
//! `close()` is idempotent and `Drop` closes whatever was left open, so the
//! close hook runs exactly once on every exit path. Open and close counts
//! are recorded in shared [`ResultSetStats`].

use crate::core::model::{NodeRef, PropertyValue, QName};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Open/close counters shared by every result set of one executor
#[derive(Debug, Default)]
pub struct ResultSetStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl ResultSetStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Result sets opened and not yet closed
    pub fn outstanding(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }
}

/// One matching node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub node: NodeRef,
    pub score: f32,
    /// Stored property values, when the executor loaded them
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<QName, PropertyValue>,
}

impl ResultRow {
    pub fn new(node: NodeRef, score: f32) -> Self {
        Self {
            node,
            score,
            properties: BTreeMap::new(),
        }
    }
}

/// A facet bucket: value and number of matching documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetBucket {
    pub value: String,
    pub count: usize,
}

/// A page of query matches
#[derive(Debug)]
pub struct ResultSet {
    rows: Vec<ResultRow>,
    num_found: usize,
    start: usize,
    facets: BTreeMap<QName, Vec<FacetBucket>>,
    stats: Arc<ResultSetStats>,
    closed: bool,
}

impl ResultSet {
    /// Open a result set, counting it in `stats`
    pub fn open(
        rows: Vec<ResultRow>,
        num_found: usize,
        start: usize,
        stats: Arc<ResultSetStats>,
    ) -> Self {
        stats.opened.fetch_add(1, Ordering::SeqCst);
        Self {
            rows,
            num_found,
            start,
            facets: BTreeMap::new(),
            stats,
            closed: false,
        }
    }

    pub fn with_facets(mut self, facets: BTreeMap<QName, Vec<FacetBucket>>) -> Self {
        self.facets = facets;
        self
    }

    pub fn rows(&self) -> &[ResultRow] {
        if self.closed {
            warn!("Reading rows of a closed result set");
            return &[];
        }
        &self.rows
    }

    pub fn node_refs(&self) -> Vec<NodeRef> {
        self.rows().iter().map(|r| r.node.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total matches before paging
    pub fn num_found(&self) -> usize {
        self.num_found
    }

    /// Offset of the first row within all matches
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn has_more(&self) -> bool {
        self.start + self.rows.len() < self.num_found
    }

    pub fn facet(&self, field: &QName) -> &[FacetBucket] {
        self.facets.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the result set. Further calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.rows.clear();
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for ResultSet {
    fn drop(&mut self) {
        self.close();
    }
}

/// Requested page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingRequest {
    pub skip_count: usize,
    pub max_items: usize,
}

impl PagingRequest {
    pub fn new(skip_count: usize, max_items: usize) -> Self {
        Self {
            skip_count,
            max_items,
        }
    }

    /// Everything, in one page
    pub fn all() -> Self {
        Self::new(0, usize::MAX)
    }

    /// Cut one page out of a fully materialized list
    pub fn page<T>(&self, items: Vec<T>) -> PagingResults<T> {
        let total = items.len();
        let page: Vec<T> = items
            .into_iter()
            .skip(self.skip_count)
            .take(self.max_items)
            .collect();
        let has_more_items = self.skip_count.saturating_add(page.len()) < total;
        PagingResults {
            page,
            has_more_items,
            total_count: total,
            skipped_stale: 0,
        }
    }
}

impl Default for PagingRequest {
    fn default() -> Self {
        Self::all()
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagingResults<T> {
    pub page: Vec<T>,
    pub has_more_items: bool,
    pub total_count: usize,
    /// Index rows dropped because their node no longer exists
    pub skipped_stale: usize,
}

impl<T> PagingResults<T> {
    pub fn empty() -> Self {
        Self {
            page: Vec::new(),
            has_more_items: false,
            total_count: 0,
            skipped_stale: 0,
        }
    }
}

/// Outcome of mapping an index row back to the store
#[derive(Debug, Clone, PartialEq)]
pub enum RowResolution<T> {
    Resolved(T),
    /// The row names a node the store no longer has
    Stale(NodeRef),
}

impl<T> RowResolution<T> {
    pub fn resolved(self) -> Option<T> {
        match self {
            RowResolution::Resolved(value) => Some(value),
            RowResolution::Stale(_) => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, RowResolution::Stale(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::StoreRef;

    fn rows(n: usize) -> Vec<ResultRow> {
        let store = StoreRef::spaces_store();
        (0..n)
            .map(|_| ResultRow::new(NodeRef::generate(&store), 1.0))
            .collect()
    }

    #[test]
    fn test_close_is_idempotent() {
        let stats = ResultSetStats::new();
        let mut results = ResultSet::open(rows(3), 3, 0, Arc::clone(&stats));
        assert_eq!(stats.outstanding(), 1);

        results.close();
        results.close();
        drop(results);
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.closed(), 1);
    }

    #[test]
    fn test_drop_closes() {
        let stats = ResultSetStats::new();
        {
            let results = ResultSet::open(rows(1), 1, 0, Arc::clone(&stats));
            assert_eq!(results.len(), 1);
        }
        assert_eq!(stats.outstanding(), 0);
    }

    #[test]
    fn test_has_more() {
        let stats = ResultSetStats::new();
        let results = ResultSet::open(rows(2), 5, 2, stats);
        assert!(results.has_more());
    }

    #[test]
    fn test_paging() {
        let request = PagingRequest::new(1, 2);
        let page = request.page(vec!["a", "b", "c", "d"]);
        assert_eq!(page.page, vec!["b", "c"]);
        assert!(page.has_more_items);
        assert_eq!(page.total_count, 4);

        let tail = PagingRequest::new(3, 2).page(vec!["a", "b", "c", "d"]);
        assert_eq!(tail.page, vec!["d"]);
        assert!(!tail.has_more_items);
    }

    #[test]
    fn test_row_resolution() {
        let stale: RowResolution<u8> = RowResolution::Stale(NodeRef::generate(&StoreRef::spaces_store()));
        assert!(stale.is_stale());
        assert_eq!(RowResolution::Resolved(3).resolved(), Some(3));
    }
}
