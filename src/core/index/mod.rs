//! Full-text index over the node graph.
//!
//! - **schema**: Tantivy schema and node documents
//! - **tantivy**: Index creation, writes and commits
//! - **query**: Lucene-like query parser
//! - **path**: PATH pattern to regex translation
//! - **translate**: Query trees to tantivy queries
//! - **searcher**: Query execution, sorting and facets
//! - **params**: Search parameters
//! - **results**: Result sets and paging
//! - **tracker**: Replays store changes into the index

pub mod params;
pub mod path;
pub mod query;
pub mod results;
pub mod schema;
pub mod searcher;
pub mod tantivy;
pub mod tracker;
pub mod translate;

pub use params::{DefaultOperator, FieldFacet, QueryLanguage, SearchParameters, SortDefinition, SortField};
pub use query::{parse_query, Occur, QueryField, QueryNode};
pub use results::{
    FacetBucket, PagingRequest, PagingResults, ResultRow, ResultSet, ResultSetStats, RowResolution,
};
pub use searcher::IndexSearcher;
pub use self::tantivy::NodeIndex;
pub use tracker::{IndexTracker, TrackReport};
