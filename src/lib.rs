//! Quiver - query execution and result fusion for an embeddable vector database
//!
//! Quiver answers vector, full-text and hybrid queries over a table and
//! fuses the two hybrid result streams with a pluggable reranker.
//!
//! # Quick Start
//!
//! ```ignore
//! use quiver::{MemoryTable, Metric, SearchExt};
//! use std::sync::Arc;
//!
//! let table = Arc::new(MemoryTable::from_table("docs", rows)?);
//! table.create_fts_index(&["text"], false)?;
//!
//! // Nearest neighbours with a post-filter
//! let hits = table
//!     .searcher()?
//!     .search(vec![0.4, 0.4])
//!     .metric(Metric::Cosine)
//!     .filter("b < 10", false)
//!     .to_table()?;
//!
//! // Hybrid: vector plus text, fused by the default linear combination
//! let fused = table.searcher()?.search((vec![0.4, 0.4], "red apple")).to_rows()?;
//! ```
//!
//! # Architecture
//!
//! - `quiver-core`: errors, values, schemas, tables and query types
//! - `quiver-engine`: collaborator traits and the in-memory reference table
//! - `quiver-search`: planning, retrieval, hybrid execution and reranking
//!
//! Only the types needed to build tables and run queries are re-exported
//! here.

pub use quiver_core::{
    DataType, ErrorKind, Field, Limit, Metric, Projection, QuiverError, QuiverResult,
    RecordTable, Row, Schema, Value, DISTANCE_COLUMN, QUERY_INDEX_COLUMN,
    RELEVANCE_SCORE_COLUMN, ROW_ID_COLUMN, SCORE_COLUMN,
};
pub use quiver_engine::{
    EmbeddingFunction, ExprFilter, FilterEval, JsonLinesScratchStore, MemoryTable,
    ScratchDatasetFilter, TableSource,
};
pub use quiver_search::{
    Fusion, HybridConfig, LinearCombinationReranker, Normalization, QueryBuilder, QueryInput,
    QueryMode, Reranker, ReturnScore, RrfReranker, SearchConfig, SearchExt, Searcher,
};
