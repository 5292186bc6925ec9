//! Reranking and result fusion
//!
//! This module provides:
//! - Reranker trait for pluggable fusion strategies
//! - LinearCombinationReranker: weighted sum of normalized scores (default)
//! - RrfReranker: Reciprocal Rank Fusion over the two ranked streams
//! - ReturnScore: which score columns a built-in reranker keeps
//!
//! # Orientation
//!
//! The hybrid executor hands `rerank_hybrid` a vector table whose
//! `_distance` is normalized with 0 = closest, and a text table whose
//! `score` is normalized with 1 = most relevant. Built-in rerankers emit
//! `_relevance_score` where higher is better and sort descending by it.

mod linear;
mod merge;
mod rrf;

pub use linear::LinearCombinationReranker;
pub use merge::join_by_row_id;
pub use rrf::RrfReranker;

use quiver_core::{
    DataType, Field, QuiverError, QuiverResult, RecordTable, Value, DISTANCE_COLUMN,
    RELEVANCE_SCORE_COLUMN, ROW_ID_COLUMN, SCORE_COLUMN,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ============================================================================
// Reranker Trait
// ============================================================================

/// Pluggable reranking interface
///
/// `query` is the original query text. It is empty when the search had no
/// text and the reranker does not report [`requires_query_text`].
///
/// # Thread Safety
///
/// Rerankers are shared behind `Arc` and must be Send + Sync.
///
/// [`requires_query_text`]: Reranker::requires_query_text
pub trait Reranker: Send + Sync {
    /// Name for errors and logging
    fn name(&self) -> &str;

    /// Whether the strategy reads the query text
    fn requires_query_text(&self) -> bool {
        false
    }

    /// Fuse a normalized vector result with a normalized text result
    ///
    /// Both inputs carry `_rowid`; the output must too.
    fn rerank_hybrid(
        &self,
        query: &str,
        vector: RecordTable,
        fts: RecordTable,
    ) -> QuiverResult<RecordTable>;

    /// Rerank a vector search result
    fn rerank_vector(&self, query: &str, results: RecordTable) -> QuiverResult<RecordTable>;

    /// Rerank a full-text search result
    fn rerank_fts(&self, query: &str, results: RecordTable) -> QuiverResult<RecordTable>;
}

/// Score columns kept by the built-in rerankers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnScore {
    /// Only `_relevance_score`
    #[default]
    Relevance,
    /// `_relevance_score` plus the input `_distance` and `score` columns
    All,
}

/// Check that a hybrid reranker kept the row-id join key
pub fn check_hybrid_output(reranker: &str, table: &RecordTable) -> QuiverResult<()> {
    let field = table
        .schema()
        .field(ROW_ID_COLUMN)
        .ok_or_else(|| QuiverError::RerankerBadReturnType {
            reranker: reranker.to_string(),
            reason: format!("output has no '{}' column", ROW_ID_COLUMN),
        })?;
    if field.data_type != DataType::UInt64 || field.nullable {
        return Err(QuiverError::RerankerBadReturnType {
            reranker: reranker.to_string(),
            reason: format!(
                "'{}' must be a non-null uint64 column, found {}",
                ROW_ID_COLUMN, field.data_type
            ),
        });
    }
    Ok(())
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Append `_relevance_score`, sort descending by it, trim score columns
///
/// The sort is stable so equal scores keep their merged order.
pub(crate) fn finish_ranked(
    table: RecordTable,
    relevance: Vec<f32>,
    return_score: ReturnScore,
) -> QuiverResult<RecordTable> {
    let mut order: Vec<usize> = (0..relevance.len()).collect();
    order.sort_by(|&a, &b| {
        relevance[b]
            .partial_cmp(&relevance[a])
            .unwrap_or(Ordering::Equal)
    });

    let table = table.append_column(
        Field::new(RELEVANCE_SCORE_COLUMN, DataType::Float32, false),
        relevance.into_iter().map(Value::from).collect(),
    )?;
    let table = table.take(&order)?;

    Ok(match return_score {
        ReturnScore::Relevance => table.drop_column(DISTANCE_COLUMN).drop_column(SCORE_COLUMN),
        ReturnScore::All => table,
    })
}

/// Read a possibly-null float column
pub(crate) fn optional_f32_column(
    table: &RecordTable,
    name: &str,
) -> QuiverResult<Vec<Option<f32>>> {
    Ok(table
        .require_column(name)?
        .iter()
        .map(|v| v.as_f64().map(|x| x as f32))
        .collect())
}
