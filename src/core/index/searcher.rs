//! Query execution against the node index.

use super::params::{FieldFacet, QueryLanguage, SearchParameters, SortDefinition, SortField};
use super::query::{parse_query, QueryNode};
use super::results::{FacetBucket, ResultRow, ResultSet};
use super::tantivy::NodeIndex;
use super::translate::QueryTranslator;
use crate::core::error::{Result, TaxaError};
use crate::core::model::{NamespacePrefixResolver, NodeRef, PropertyValue, QName};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{DocAddress, Searcher, TantivyDocument, Term};
use tracing::debug;

/// Runs Lucene-like queries and query trees over a [`NodeIndex`]
pub struct IndexSearcher {
    index: Arc<NodeIndex>,
    resolver: Arc<dyn NamespacePrefixResolver>,
    max_query_length: usize,
}

impl IndexSearcher {
    pub fn new(
        index: Arc<NodeIndex>,
        resolver: Arc<dyn NamespacePrefixResolver>,
        max_query_length: usize,
    ) -> Self {
        Self {
            index,
            resolver,
            max_query_length,
        }
    }

    pub fn index(&self) -> &Arc<NodeIndex> {
        &self.index
    }

    pub fn resolver(&self) -> &dyn NamespacePrefixResolver {
        self.resolver.as_ref()
    }

    /// Execute a `lucene` query
    pub fn query(&self, params: &SearchParameters) -> Result<ResultSet> {
        if params.language() != QueryLanguage::Lucene {
            return Err(TaxaError::Unsupported(format!(
                "Index searcher cannot execute {} queries",
                params.language()
            )));
        }
        if params.query().len() > self.max_query_length {
            return Err(TaxaError::InvalidQuery(format!(
                "Query exceeds maximum length of {} characters",
                self.max_query_length
            )));
        }
        let node = parse_query(params.query(), params.default_operator())?;
        debug!(query = params.query(), "Executing index query");
        self.query_node(&node, params)
    }

    /// Execute an already parsed query tree; `params` supplies stores, paging, sort and facets
    pub fn query_node(&self, node: &QueryNode, params: &SearchParameters) -> Result<ResultSet> {
        let translator = QueryTranslator::new(self.index.fields(), self.resolver.as_ref());
        let query = self.restrict_to_stores(translator.translate(node)?, params);
        self.execute(query.as_ref(), params)
    }

    /// Does `node` carry `property` containing every word of `text`
    pub fn node_contains(&self, node: &NodeRef, property: &QName, text: &str) -> Result<bool> {
        let translator = QueryTranslator::new(self.index.fields(), self.resolver.as_ref());
        let query = BooleanQuery::new(vec![
            (Occur::Must, self.id_query(node)),
            (Occur::Must, translator.property_words(property, text)?),
        ]);
        self.count(&query).map(|n| n > 0)
    }

    /// Does `node` match an arbitrary query tree
    pub fn node_matches(&self, node: &NodeRef, query: &QueryNode) -> Result<bool> {
        let translator = QueryTranslator::new(self.index.fields(), self.resolver.as_ref());
        let query = BooleanQuery::new(vec![
            (Occur::Must, self.id_query(node)),
            (Occur::Must, translator.translate(query)?),
        ]);
        self.count(&query).map(|n| n > 0)
    }

    fn id_query(&self, node: &NodeRef) -> Box<dyn Query> {
        Box::new(TermQuery::new(
            Term::from_field_text(self.index.fields().id, &node.to_string()),
            IndexRecordOption::Basic,
        ))
    }

    fn count(&self, query: &dyn Query) -> Result<usize> {
        self.index
            .searcher()
            .search(query, &Count)
            .map_err(|e| TaxaError::SearchFailed(format!("Search failed: {e}")))
    }

    fn restrict_to_stores(&self, query: Box<dyn Query>, params: &SearchParameters) -> Box<dyn Query> {
        if params.stores().is_empty() {
            return query;
        }
        let store_field = self.index.fields().store;
        let stores: Vec<(Occur, Box<dyn Query>)> = params
            .stores()
            .iter()
            .map(|store| {
                let term: Box<dyn Query> = Box::new(TermQuery::new(
                    Term::from_field_text(store_field, &store.to_string()),
                    IndexRecordOption::Basic,
                ));
                (Occur::Should, term)
            })
            .collect();
        Box::new(BooleanQuery::new(vec![
            (Occur::Must, query),
            (Occur::Must, Box::new(BooleanQuery::new(stores))),
        ]))
    }

    fn execute(&self, query: &dyn Query, params: &SearchParameters) -> Result<ResultSet> {
        let start = Instant::now();
        let searcher = self.index.searcher();
        let total_docs = searcher.num_docs() as usize;
        let skip = params.skip_count();
        let page_size = params.page_size().unwrap_or(usize::MAX);

        if total_docs == 0 {
            return Ok(ResultSet::open(Vec::new(), 0, skip, self.index.stats()));
        }

        let sorts_by_property = params
            .sort()
            .iter()
            .any(|s| matches!(s.field, SortField::Property(_)));
        let needs_all = sorts_by_property || !params.facets().is_empty();

        let (hits, num_found) = if needs_all {
            let hits = searcher
                .search(query, &TopDocs::with_limit(total_docs))
                .map_err(|e| TaxaError::SearchFailed(format!("Search failed: {e}")))?;
            let found = hits.len();
            (hits, found)
        } else {
            let limit = skip.saturating_add(page_size).min(total_docs).max(1);
            searcher
                .search(query, &(TopDocs::with_limit(limit), Count))
                .map_err(|e| TaxaError::SearchFailed(format!("Search failed: {e}")))?
        };

        let mut rows = Vec::with_capacity(hits.len());
        for (score, address) in hits {
            rows.push(self.load_row(&searcher, address, score)?);
        }

        let facets = facet_counts(&rows, params.facets());
        if !params.sort().is_empty() {
            sort_rows(&mut rows, params.sort());
        }
        let page: Vec<ResultRow> = rows.into_iter().skip(skip).take(page_size).collect();

        debug!(
            found = num_found,
            returned = page.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Index query complete"
        );
        Ok(ResultSet::open(page, num_found, skip, self.index.stats()).with_facets(facets))
    }

    fn load_row(&self, searcher: &Searcher, address: DocAddress, score: f32) -> Result<ResultRow> {
        let fields = self.index.fields();
        let doc = searcher
            .doc::<TantivyDocument>(address)
            .map_err(|e| TaxaError::SearchFailed(format!("Failed to retrieve document: {e}")))?;
        let id = doc
            .get_first(fields.id)
            .and_then(|v| v.as_str())
            .ok_or_else(|| TaxaError::IndexError("Document without id".to_string()))?;
        let node: NodeRef = id.parse()?;
        let properties: BTreeMap<QName, PropertyValue> = match doc
            .get_first(fields.props)
            .and_then(|v| v.as_str())
        {
            Some(json) => serde_json::from_str(json)?,
            None => BTreeMap::new(),
        };
        Ok(ResultRow {
            node,
            score,
            properties,
        })
    }
}

/// Stable multi-key sort. Missing values sort first ascending, last descending.
pub fn sort_rows(rows: &mut [ResultRow], sort: &[SortDefinition]) {
    rows.sort_by(|a, b| {
        for definition in sort {
            let ordering = match &definition.field {
                SortField::Score => a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal),
                SortField::Property(name) => {
                    compare_optional(a.properties.get(name), b.properties.get(name))
                }
            };
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

/// `None` sorts before any value
pub fn compare_optional(a: Option<&PropertyValue>, b: Option<&PropertyValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.compare(b),
    }
}

/// Count distinct values per document for each requested facet
fn facet_counts(rows: &[ResultRow], facets: &[FieldFacet]) -> BTreeMap<QName, Vec<FacetBucket>> {
    let mut out = BTreeMap::new();
    for facet in facets {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for row in rows {
            let Some(value) = row.properties.get(&facet.field) else {
                continue;
            };
            let distinct: BTreeSet<String> = value.flatten().iter().map(|v| v.to_text()).collect();
            for text in distinct {
                *counts.entry(text).or_default() += 1;
            }
        }
        let mut buckets: Vec<FacetBucket> = counts
            .into_iter()
            .filter(|(_, count)| *count >= facet.min_count)
            .map(|(value, count)| FacetBucket { value, count })
            .collect();
        buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        if facet.limit > 0 {
            buckets.truncate(facet.limit);
        }
        out.insert(facet.field.clone(), buckets);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::StoreRef;

    fn row(value: Option<i64>) -> ResultRow {
        let mut row = ResultRow::new(NodeRef::generate(&StoreRef::spaces_store()), 1.0);
        if let Some(v) = value {
            row.properties
                .insert(QName::new("http://x", "n"), PropertyValue::Integer(v));
        }
        row
    }

    fn values(rows: &[ResultRow]) -> Vec<Option<i64>> {
        rows.iter()
            .map(|r| match r.properties.get(&QName::new("http://x", "n")) {
                Some(PropertyValue::Integer(v)) => Some(*v),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_nulls_first_ascending_last_descending() {
        let key = QName::new("http://x", "n");
        let mut rows = vec![row(Some(2)), row(None), row(Some(1))];
        sort_rows(&mut rows, &[SortDefinition::property(key.clone(), true)]);
        assert_eq!(values(&rows), vec![None, Some(1), Some(2)]);

        sort_rows(&mut rows, &[SortDefinition::property(key, false)]);
        assert_eq!(values(&rows), vec![Some(2), Some(1), None]);
    }

    #[test]
    fn test_facet_counts_ordered_by_count() {
        let key = QName::new("http://x", "n");
        let rows = vec![row(Some(1)), row(Some(2)), row(Some(2)), row(None)];
        let facets = facet_counts(&rows, &[FieldFacet::new(key.clone()).with_limit(1)]);
        assert_eq!(
            facets[&key],
            vec![FacetBucket {
                value: "2".to_string(),
                count: 2
            }]
        );
    }
}
