//! Core types for quiver
//!
//! This crate defines the foundational types used throughout the system:
//! - Error: the `QuiverError` taxonomy and `ErrorKind` classification
//! - Value / DataType: cells and column types
//! - Schema / RecordTable / Row: ordered columnar result tables
//! - RetrievalQuery: the immutable request handed to retrievers, with
//!   `Limit`, `Metric`, `Projection` and the reserved column names

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod query;
pub mod table;
pub mod value;

pub use error::{ErrorKind, QuiverError, QuiverResult};
pub use query::{
    Limit, Metric, Projection, QueryTarget, RetrievalQuery, DEFAULT_NPROBES, DISTANCE_COLUMN,
    QUERY_INDEX_COLUMN, RELEVANCE_SCORE_COLUMN, ROW_ID_COLUMN, SCORE_COLUMN,
};
pub use table::{Field, RecordTable, Row, Schema};
pub use value::{DataType, Value};
