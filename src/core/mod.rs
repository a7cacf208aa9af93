//! Core domain logic
//!
//! # Architecture
//!
//! - **model**: Qualified names, references, values and the dictionary
//! - **store**: Node service, in-memory store, snapshots and bootstrap
//! - **index**: Tantivy index, query tree, change tracker and searcher
//! - **category**: Category navigation and maintenance
//! - **xpath**: Path expression selection
//! - **cmis**: CMIS query parsing and execution
//! - **search**: Search back ends and the subsystem delegator
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Error types and Result alias
//! - **xdg**: XDG directory handling
//! - **services**: Unified service container

pub mod category;
pub mod cmis;
pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod search;
pub mod services;
pub mod store;
pub mod xdg;
pub mod xpath;

// Re-export key types for convenience
pub use config::Config;
pub use error::{Result, TaxaError};
pub use services::Services;
