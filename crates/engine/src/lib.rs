//! Retrieval collaborators for quiver
//!
//! This crate provides everything the search layer calls into:
//! - traits: collaborator capabilities (vector scan, text scan, row fetch,
//!   filter evaluation, embedding, table source)
//! - expr: the SQL-like expression language for filters and projections
//! - filter: in-process and scratch-dataset `FilterEval` backends
//! - vector: distance functions and brute-force nearest-neighbour search
//! - search: tokenizer, BM25 scoring and the inverted index
//! - table: `MemoryTable`, an in-memory table implementing every capability

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod expr;
pub mod filter;
pub mod search;
pub mod table;
pub mod traits;
pub mod vector;

pub use filter::{ExprFilter, JsonLinesScratchStore, ScratchDatasetFilter, ScratchStore};
pub use search::InvertedIndex;
pub use table::MemoryTable;
pub use traits::{
    EmbeddingFunction, FilterEval, RowFetch, TableSource, TextIndexScan, TextScanResult,
    VectorIndexScan,
};
