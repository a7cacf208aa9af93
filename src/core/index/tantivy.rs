//! Tantivy integration for the node index.
//!
//! One document per node, keyed by the `id` field. Updates delete the old
//! document by term and add the new one; readers only see changes after
//! [`NodeIndex::commit`].

use super::results::ResultSetStats;
use super::schema::{create_schema, IndexFields, NodeDocument};
use crate::core::error::{Result, TaxaError};
use crate::core::config::MIN_WRITER_HEAP_BYTES;
use crate::core::model::NodeRef;
use std::sync::{Arc, Mutex, MutexGuard};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, Term};
use tracing::debug;

/// Tantivy index of repository nodes
pub struct NodeIndex {
    index: Index,
    fields: IndexFields,
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    stats: Arc<ResultSetStats>,
}

impl std::fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeIndex")
            .field("schema", &"<schema>")
            .field("stats", &self.stats)
            .finish()
    }
}

impl NodeIndex {
    /// Create an index held in memory
    pub fn create_in_ram(writer_heap_bytes: usize) -> Result<Self> {
        Self::from_index(Index::create_in_ram(create_schema()), writer_heap_bytes)
    }

    fn from_index(index: Index, writer_heap_bytes: usize) -> Result<Self> {
        let fields = IndexFields::from_schema(&index.schema())?;
        let writer = index
            .writer_with_num_threads(1, writer_heap_bytes.max(MIN_WRITER_HEAP_BYTES))
            .map_err(|e| TaxaError::IndexError(format!("Failed to create writer: {e}")))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| TaxaError::IndexError(format!("Failed to create reader: {e}")))?;
        Ok(Self {
            index,
            fields,
            writer: Mutex::new(writer),
            reader,
            stats: ResultSetStats::new(),
        })
    }

    pub fn fields(&self) -> &IndexFields {
        &self.fields
    }

    /// Counters for result sets produced over this index
    pub fn stats(&self) -> Arc<ResultSetStats> {
        Arc::clone(&self.stats)
    }

    fn writer(&self) -> MutexGuard<'_, IndexWriter> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the document of a node
    pub fn upsert(&self, document: &NodeDocument) -> Result<()> {
        let doc = document.to_tantivy(&self.fields)?;
        let writer = self.writer();
        writer.delete_term(Term::from_field_text(
            self.fields.id,
            &document.node.to_string(),
        ));
        writer
            .add_document(doc)
            .map_err(|e| TaxaError::IndexError(format!("Failed to add document: {e}")))?;
        Ok(())
    }

    /// Drop the document of a node
    pub fn remove(&self, node: &NodeRef) {
        self.writer()
            .delete_term(Term::from_field_text(self.fields.id, &node.to_string()));
    }

    /// Commit pending changes and make them visible to searches
    pub fn commit(&self) -> Result<()> {
        let opstamp = self
            .writer()
            .commit()
            .map_err(|e| TaxaError::IndexError(format!("Failed to commit: {e}")))?;
        self.reader
            .reload()
            .map_err(|e| TaxaError::IndexError(format!("Failed to reload reader: {e}")))?;
        debug!(opstamp, "Committed index");
        Ok(())
    }

    pub fn searcher(&self) -> Searcher {
        self.reader.searcher()
    }

    /// Documents visible to searches
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Get a reference to the underlying Tantivy index
    pub fn index(&self) -> &Index {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::content::{TYPE_BASE, TYPE_FOLDER};
    use crate::core::model::StoreRef;
    use std::collections::{BTreeMap, BTreeSet};

    fn document(node: &NodeRef) -> NodeDocument {
        NodeDocument {
            node: node.clone(),
            store: node.store_ref().clone(),
            paths: BTreeSet::from(["/cm:a".to_string()]),
            parents: BTreeSet::new(),
            primary_parent: None,
            qnames: BTreeSet::new(),
            types: vec![TYPE_FOLDER.clone(), TYPE_BASE.clone()],
            exact_type: TYPE_FOLDER.clone(),
            aspects: BTreeSet::new(),
            properties: BTreeMap::new(),
        }
    }

    #[test]
    fn test_upsert_replaces_document() {
        let index = NodeIndex::create_in_ram(MIN_WRITER_HEAP_BYTES).unwrap();
        let node = NodeRef::generate(&StoreRef::spaces_store());

        index.upsert(&document(&node)).unwrap();
        index.upsert(&document(&node)).unwrap();
        index.commit().unwrap();
        assert_eq!(index.num_docs(), 1);

        index.remove(&node);
        index.commit().unwrap();
        assert_eq!(index.num_docs(), 0);
    }

    #[test]
    fn test_uncommitted_changes_invisible() {
        let index = NodeIndex::create_in_ram(MIN_WRITER_HEAP_BYTES).unwrap();
        index
            .upsert(&document(&NodeRef::generate(&StoreRef::spaces_store())))
            .unwrap();
        assert_eq!(index.num_docs(), 0);
    }
}
