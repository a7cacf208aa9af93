//! Search parameters.
//!
//! Built once per request with [`SearchParametersBuilder`] and only read
//! afterwards; executors take them by shared reference.

use crate::core::error::{Result, TaxaError};
use crate::core::model::{PropertyValue, QName, StoreRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Query language of [`SearchParameters::query`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    Lucene,
    XPath,
    Cmis,
}

impl fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryLanguage::Lucene => "lucene",
            QueryLanguage::XPath => "xpath",
            QueryLanguage::Cmis => "cmis",
        };
        f.write_str(name)
    }
}

impl FromStr for QueryLanguage {
    type Err = TaxaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "lucene" | "fts-alfresco" => Ok(QueryLanguage::Lucene),
            "xpath" => Ok(QueryLanguage::XPath),
            "cmis" | "cmis-strict" | "cmis-alfresco" => Ok(QueryLanguage::Cmis),
            other => Err(TaxaError::InvalidArgument(format!(
                "Unknown query language: {other}"
            ))),
        }
    }
}

/// How unmarked clauses combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DefaultOperator {
    #[default]
    Or,
    And,
}

/// What to sort by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortField {
    Score,
    Property(QName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDefinition {
    pub field: SortField,
    pub ascending: bool,
}

impl SortDefinition {
    pub fn property(name: QName, ascending: bool) -> Self {
        Self {
            field: SortField::Property(name),
            ascending,
        }
    }

    pub fn score() -> Self {
        Self {
            field: SortField::Score,
            ascending: false,
        }
    }
}

/// Facet request over a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFacet {
    pub field: QName,
    /// Maximum buckets returned; 0 means unlimited
    pub limit: usize,
    pub min_count: usize,
}

impl FieldFacet {
    pub fn new(field: QName) -> Self {
        Self {
            field,
            limit: 0,
            min_count: 1,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Parameters for one query
#[derive(Debug, Clone)]
pub struct SearchParameters {
    stores: Vec<StoreRef>,
    language: QueryLanguage,
    query: String,
    skip_count: usize,
    max_items: Option<usize>,
    limit: Option<usize>,
    sort: Vec<SortDefinition>,
    facets: Vec<FieldFacet>,
    default_operator: DefaultOperator,
    query_params: BTreeMap<String, PropertyValue>,
}

impl SearchParameters {
    pub fn builder(language: QueryLanguage, query: impl Into<String>) -> SearchParametersBuilder {
        SearchParametersBuilder {
            params: SearchParameters {
                stores: Vec::new(),
                language,
                query: query.into(),
                skip_count: 0,
                max_items: None,
                limit: None,
                sort: Vec::new(),
                facets: Vec::new(),
                default_operator: DefaultOperator::Or,
                query_params: BTreeMap::new(),
            },
        }
    }

    /// Lucene query restricted to one store
    pub fn lucene(store: &StoreRef, query: impl Into<String>) -> SearchParametersBuilder {
        Self::builder(QueryLanguage::Lucene, query).store(store.clone())
    }

    pub fn stores(&self) -> &[StoreRef] {
        &self.stores
    }

    pub fn language(&self) -> QueryLanguage {
        self.language
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn skip_count(&self) -> usize {
        self.skip_count
    }

    /// Page size: `max_items`, else `limit`, else unbounded
    pub fn page_size(&self) -> Option<usize> {
        self.max_items.or(self.limit)
    }

    pub fn sort(&self) -> &[SortDefinition] {
        &self.sort
    }

    pub fn facets(&self) -> &[FieldFacet] {
        &self.facets
    }

    pub fn default_operator(&self) -> DefaultOperator {
        self.default_operator
    }

    /// Bound variables, keyed `prefix:name`
    pub fn query_params(&self) -> &BTreeMap<String, PropertyValue> {
        &self.query_params
    }
}

/// Builder for [`SearchParameters`]
#[derive(Debug, Clone)]
pub struct SearchParametersBuilder {
    params: SearchParameters,
}

impl SearchParametersBuilder {
    pub fn store(mut self, store: StoreRef) -> Self {
        if !self.params.stores.contains(&store) {
            self.params.stores.push(store);
        }
        self
    }

    pub fn skip_count(mut self, skip: usize) -> Self {
        self.params.skip_count = skip;
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.params.max_items = Some(max);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.params.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort: SortDefinition) -> Self {
        self.params.sort.push(sort);
        self
    }

    pub fn facet(mut self, facet: FieldFacet) -> Self {
        self.params.facets.push(facet);
        self
    }

    pub fn default_operator(mut self, operator: DefaultOperator) -> Self {
        self.params.default_operator = operator;
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.params.query_params.insert(name.into(), value);
        self
    }

    pub fn build(self) -> SearchParameters {
        self.params
    }
}
