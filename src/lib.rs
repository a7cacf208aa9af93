//! taxa - category and query layer over a content repository
//!
//! Categories form trees beneath per-aspect classification nodes of a
//! node store. taxa navigates and maintains those trees through a
//! Tantivy index, selects nodes with an XPath subset, and answers
//! Lucene-like and CMIS queries.
//!
//! # Architecture
//!
//! - **core**: Domain logic
//!   - model (qualified names, node references, values, dictionary)
//!   - store (node service, in-memory store, snapshots, bootstrap)
//!   - index (Tantivy index, query tree, tracker, searcher)
//!   - category (category service)
//!   - xpath (path expression parser and evaluator)
//!   - cmis (CMIS query parser, translator, service)
//!   - search (search back ends and the subsystem delegator)
//!   - config, error, xdg, services
//!
//! - **cli**: clap adapter over the core services

// Core domain logic
pub mod core;

// Command-line adapter
pub mod cli;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{Result, TaxaError};
pub use core::services::Services;
