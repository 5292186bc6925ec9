//! Query execution and result fusion for quiver
//!
//! This crate provides:
//! - QueryPlanner: resolves a raw query and a mode into one retrieval path
//! - Retrievers: vector, full-text and plain filtered scan
//! - HybridExecutor: concurrent vector + text retrieval fused by a reranker
//! - Normalization: min-max and rank score normalization
//! - Reranker trait with linear-combination and RRF built-ins
//! - SearchConfig: `quiver.toml` configuration
//! - Searcher / QueryBuilder: the caller-facing builder
//!
//! # Usage
//!
//! ```ignore
//! use quiver_search::SearchExt;
//!
//! let hits = table.searcher()?.search((vector, "red apple")).to_table()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod config;
pub mod hybrid;
pub mod normalize;
pub mod planner;
pub mod rerank;
pub mod retriever;

pub use builder::{QueryBuilder, SearchExt, Searcher};
pub use config::{Fusion, HybridConfig, SearchConfig, CONFIG_FILE_NAME};
pub use hybrid::{HybridExecutor, HybridState};
pub use normalize::{normalize_scores, rank_scores, Normalization};
pub use planner::{infer_vector_column, QueryInput, QueryMode, QueryPlanner, ResolvedQuery};
pub use rerank::{
    check_hybrid_output, join_by_row_id, LinearCombinationReranker, Reranker, ReturnScore,
    RrfReranker,
};
pub use retriever::{phrase_query, EmptyRetriever, Retriever, TextRetriever, VectorRetriever};
