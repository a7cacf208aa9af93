//! Error types and error handling for the taxa query layer.
//!
//! Errors fall into a few families: configuration problems (a missing
//! classification or category root, an unmapped namespace), parse failures
//! (query strings and path expressions), usage errors, and stale node
//! references. Stale references are the only family the category service
//! absorbs locally; everything else propagates to the caller.

use thiserror::Error;

/// Result type alias for taxa operations
pub type Result<T> = std::result::Result<T, TaxaError>;

/// Main error type for the taxa service
#[derive(Error, Debug)]
pub enum TaxaError {
    #[error("Node does not exist: {0}")]
    InvalidNodeRef(String),

    #[error("Store does not exist: {0}")]
    InvalidStoreRef(String),

    #[error("Missing classification: {0}")]
    MissingClassification(String),

    #[error("Missing category root in store: {0}")]
    MissingCategoryRoot(String),

    #[error("Missing category: {0}")]
    MissingCategory(String),

    #[error("Namespace not registered: {0}")]
    NamespaceNotFound(String),

    #[error("Duplicate child name '{name}' under {parent}")]
    DuplicateChildName { parent: String, name: String },

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Failed to evaluate path '{expression}': {reason}")]
    PathEvaluation { expression: String, reason: String },

    #[error("Invalid path result: {0}")]
    InvalidPathResult(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Index error: {0}")]
    IndexError(String),

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl TaxaError {
    /// Get user-friendly error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TaxaError::InvalidNodeRef(_)
                | TaxaError::InvalidStoreRef(_)
                | TaxaError::MissingCategory(_)
        )
    }

    /// Check if the error names a node that vanished between index and store.
    ///
    /// The index trails the store, so a row can reference a node that has
    /// since been deleted.
    pub fn is_stale_reference(&self) -> bool {
        matches!(self, TaxaError::InvalidNodeRef(_))
    }

    /// Check if this error reports missing or broken configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TaxaError::MissingClassification(_)
                | TaxaError::MissingCategoryRoot(_)
                | TaxaError::NamespaceNotFound(_)
                | TaxaError::ConfigError(_)
                | TaxaError::TomlError(_)
        )
    }

    /// Check if this is a bad request error (invalid input)
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            TaxaError::InvalidName(_)
                | TaxaError::InvalidArgument(_)
                | TaxaError::InvalidQuery(_)
                | TaxaError::PathEvaluation { .. }
                | TaxaError::InvalidPathResult(_)
                | TaxaError::DuplicateChildName { .. }
        )
    }

    /// Check if the operation is not supported by this implementation
    pub fn is_unsupported(&self) -> bool {
        matches!(self, TaxaError::Unsupported(_))
    }
}

impl From<tantivy::TantivyError> for TaxaError {
    fn from(err: tantivy::TantivyError) -> Self {
        TaxaError::IndexError(err.to_string())
    }
}
