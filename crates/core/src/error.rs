//! Error types for quiver
//!
//! This module defines the single error type used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every variant belongs to exactly one [`ErrorKind`]:
//!
//! | Kind | Variants | Description |
//! |------|----------|-------------|
//! | Type | `InvalidQuery`, `InvalidHybridPair`, `InvalidFilter` | Malformed query shape or type |
//! | Config | `NoEmbeddingFunction`, `InvalidMode`, `MissingQueryString`, `NoVectorColumn`, `AmbiguousVectorColumn`, `InvalidConfig` | Missing or invalid configuration |
//! | State | `IndexMissing`, `IndexExists` | Required index state not met |
//! | Data | `DimensionMismatch`, `ColumnNotFound`, `SchemaMismatch` | Data does not fit the table |
//! | Contract | `RerankerBadReturnType`, `CollaboratorContract` | A collaborator broke its output contract |
//! | External | `Io`, `Serialization`, `Embedding`, `Storage` | Failures raised by collaborators |

use std::io;
use thiserror::Error;

/// Result type alias for quiver operations
pub type QuiverResult<T> = std::result::Result<T, QuiverError>;

/// Coarse classification of a [`QuiverError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed query shape or type
    Type,
    /// Missing or invalid configuration
    Config,
    /// Required index or table state not met
    State,
    /// Data does not fit the table (dimensions, columns, schema)
    Data,
    /// A collaborator violated its output contract
    Contract,
    /// Failure raised by an external collaborator (I/O, model, storage)
    External,
}

/// Error types for quiver
#[derive(Debug, Error)]
pub enum QuiverError {
    // ==================== Type Errors ====================
    /// Query value has the wrong shape for the requested mode
    #[error("invalid query: {reason}")]
    InvalidQuery {
        /// What was wrong with the query
        reason: String,
    },

    /// Hybrid query is neither a string nor a (vector, string) pair
    #[error("invalid hybrid query: {reason}")]
    InvalidHybridPair {
        /// What was wrong with the pair
        reason: String,
    },

    /// Filter or projection expression could not be parsed or evaluated
    #[error("invalid expression '{expression}': {reason}")]
    InvalidFilter {
        /// The offending expression
        expression: String,
        /// Parser or evaluator message
        reason: String,
    },

    // ==================== Config Errors ====================
    /// Text query needs a vector but no embedding function is bound
    #[error("no embedding function bound to column '{column}'")]
    NoEmbeddingFunction {
        /// Vector column that was looked up
        column: String,
    },

    /// Unknown query mode string
    #[error("invalid query mode '{mode}': expected one of 'vector', 'fts', 'hybrid' or 'auto'")]
    InvalidMode {
        /// The mode that was requested
        mode: String,
    },

    /// Reranker needs the query text but none was preserved
    #[error("reranker '{reranker}' needs a query string but the query was not text; pass one explicitly")]
    MissingQueryString {
        /// Name of the reranker
        reranker: String,
    },

    /// Table has no vector column to search
    #[error("table '{table}' has no vector column")]
    NoVectorColumn {
        /// Table name
        table: String,
    },

    /// Table has several vector columns and none was named
    #[error("table '{table}' has several vector columns {candidates:?}; name one explicitly")]
    AmbiguousVectorColumn {
        /// Table name
        table: String,
        /// All vector columns found
        candidates: Vec<String>,
    },

    /// Invalid configuration value
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong
        reason: String,
    },

    // ==================== State Errors ====================
    /// Full-text index required but absent
    #[error("full-text index does not exist for table '{table}'; create one first")]
    IndexMissing {
        /// Table name
        table: String,
    },

    /// Full-text index already exists and replace was not requested
    #[error("full-text index already exists for table '{table}'")]
    IndexExists {
        /// Table name
        table: String,
    },

    // ==================== Data Errors ====================
    /// Query vector dimension does not match the column
    #[error("dimension mismatch on column '{column}': expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Vector column
        column: String,
        /// Column dimension
        expected: usize,
        /// Query dimension
        actual: usize,
    },

    /// Named column does not exist
    #[error("column not found: {column}")]
    ColumnNotFound {
        /// The missing column
        column: String,
    },

    /// Table or column shape is inconsistent
    #[error("schema mismatch: {reason}")]
    SchemaMismatch {
        /// What did not line up
        reason: String,
    },

    // ==================== Contract Errors ====================
    /// Reranker returned something other than a well-formed result table
    #[error("reranker '{reranker}' returned an invalid table: {reason}")]
    RerankerBadReturnType {
        /// Name of the reranker
        reranker: String,
        /// What was wrong with the output
        reason: String,
    },

    /// Another collaborator broke its output contract
    #[error("{collaborator} violated its contract: {reason}")]
    CollaboratorContract {
        /// Which collaborator
        collaborator: String,
        /// What was wrong with the output
        reason: String,
    },

    // ==================== External Errors ====================
    /// I/O error (scratch datasets, config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Embedding model failed
    #[error("embedding function '{function}' failed: {reason}")]
    Embedding {
        /// Name of the embedding function
        function: String,
        /// Model or transport message
        reason: String,
    },

    /// Storage collaborator failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl QuiverError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuiverError::InvalidQuery { .. }
            | QuiverError::InvalidHybridPair { .. }
            | QuiverError::InvalidFilter { .. } => ErrorKind::Type,
            QuiverError::NoEmbeddingFunction { .. }
            | QuiverError::InvalidMode { .. }
            | QuiverError::MissingQueryString { .. }
            | QuiverError::NoVectorColumn { .. }
            | QuiverError::AmbiguousVectorColumn { .. }
            | QuiverError::InvalidConfig { .. } => ErrorKind::Config,
            QuiverError::IndexMissing { .. } | QuiverError::IndexExists { .. } => ErrorKind::State,
            QuiverError::DimensionMismatch { .. }
            | QuiverError::ColumnNotFound { .. }
            | QuiverError::SchemaMismatch { .. } => ErrorKind::Data,
            QuiverError::RerankerBadReturnType { .. }
            | QuiverError::CollaboratorContract { .. } => ErrorKind::Contract,
            QuiverError::Io(_)
            | QuiverError::Serialization(_)
            | QuiverError::Embedding { .. }
            | QuiverError::Storage(_) => ErrorKind::External,
        }
    }

    /// Build an `InvalidQuery` error
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        QuiverError::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// Build an `InvalidHybridPair` error
    pub fn invalid_hybrid_pair(reason: impl Into<String>) -> Self {
        QuiverError::InvalidHybridPair {
            reason: reason.into(),
        }
    }

    /// Build an `InvalidFilter` error
    pub fn invalid_filter(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        QuiverError::InvalidFilter {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Build an `InvalidConfig` error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        QuiverError::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Build a `ColumnNotFound` error
    pub fn column_not_found(column: impl Into<String>) -> Self {
        QuiverError::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Build a `SchemaMismatch` error
    pub fn schema_mismatch(reason: impl Into<String>) -> Self {
        QuiverError::SchemaMismatch {
            reason: reason.into(),
        }
    }

    /// Build a `CollaboratorContract` error
    pub fn contract(collaborator: impl Into<String>, reason: impl Into<String>) -> Self {
        QuiverError::CollaboratorContract {
            collaborator: collaborator.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for QuiverError {
    fn from(e: serde_json::Error) -> Self {
        QuiverError::Serialization(e.to_string())
    }
}
