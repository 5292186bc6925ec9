//! Collaborator capabilities
//!
//! The search layer never touches storage, indexes or models directly. It
//! talks to them through these traits:
//!
//! | Trait | Capability |
//! |-------|------------|
//! | [`VectorIndexScan`] | ranked nearest-neighbour rows with `_distance` |
//! | [`TextIndexScan`] | ranked `(row_id, score)` pairs from an inverted index |
//! | [`RowFetch`] | rows by id, in exactly the requested order |
//! | [`FilterEval`] | subset of a table matching a predicate, order preserved |
//! | [`EmbeddingFunction`] | text to vector, document and query side |
//! | [`TableSource`] | schema, embedding lookup, plain scans, and all of the above |
//!
//! All capabilities are `Send + Sync`; the hybrid path calls them from two
//! worker threads at once.

use quiver_core::{
    Limit, Projection, QuiverError, QuiverResult, RecordTable, RetrievalQuery, Schema,
};
use std::sync::Arc;

/// Nearest-neighbour scan over a vector column
pub trait VectorIndexScan: Send + Sync {
    /// Run a vector query
    ///
    /// The query target is a single vector and the vector column is named.
    /// Metric, nprobes, refine factor, filter, prefilter, limit and
    /// projection are taken from `query` as given. The output is ordered by
    /// ascending `_distance` and carries `_rowid` when the query asks for it.
    fn vector_scan(&self, query: &RetrievalQuery) -> QuiverResult<RecordTable>;
}

/// Output of a [`TextIndexScan`]
///
/// `row_ids[i]` scored `scores[i]`; ordered by descending relevance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextScanResult {
    /// Matching row ids, most relevant first
    pub row_ids: Vec<u64>,
    /// Relevance of each row id
    pub scores: Vec<f32>,
}

impl TextScanResult {
    /// Number of hits
    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    /// Whether there were no hits
    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    /// Check the parallel-array contract
    pub fn validate(&self) -> QuiverResult<()> {
        if self.row_ids.len() != self.scores.len() {
            return Err(QuiverError::contract(
                "text index",
                format!(
                    "returned {} row ids but {} scores",
                    self.row_ids.len(),
                    self.scores.len()
                ),
            ));
        }
        Ok(())
    }
}

/// Full-text scan over an inverted index
pub trait TextIndexScan: Send + Sync {
    /// Whether an inverted index exists
    fn has_fts_index(&self) -> bool;

    /// Run a text query
    fn text_scan(&self, query: &str, limit: Limit) -> QuiverResult<TextScanResult>;
}

/// Row lookup by id
pub trait RowFetch: Send + Sync {
    /// Rows for `row_ids`, in exactly that order, with `projection` applied
    fn fetch_rows(
        &self,
        row_ids: &[u64],
        projection: Option<&Projection>,
    ) -> QuiverResult<RecordTable>;
}

/// Predicate evaluation over an in-memory table
pub trait FilterEval: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Rows of `table` matching `predicate`, in input order
    fn filter(&self, table: &RecordTable, predicate: &str) -> QuiverResult<RecordTable>;
}

/// Text embedding model
pub trait EmbeddingFunction: Send + Sync {
    /// Model name, for errors and logging
    fn name(&self) -> &str;

    /// Document-side embeddings
    fn embed_text(&self, texts: &[String]) -> QuiverResult<Vec<Vec<f32>>>;

    /// Query-side embedding
    ///
    /// Defaults to the document-side embedding of the single text.
    fn embed_query(&self, text: &str) -> QuiverResult<Vec<f32>> {
        self.embed_text(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| QuiverError::Embedding {
                function: self.name().to_string(),
                reason: "model returned no embedding".to_string(),
            })
    }
}

/// A searchable table
pub trait TableSource: VectorIndexScan + TextIndexScan + RowFetch {
    /// Table name
    fn name(&self) -> &str;

    /// Current schema
    fn schema(&self) -> Schema;

    /// Dimension of a vector column
    fn vector_column_dimension(&self, column: &str) -> QuiverResult<usize> {
        vector_dimension(&self.schema(), column)
    }

    /// Embedding function bound to a vector column
    fn embedding_function_for(&self, column: &str) -> Option<Arc<dyn EmbeddingFunction>>;

    /// Plain filtered scan in storage order
    fn scan(
        &self,
        filter: Option<&str>,
        projection: Option<&Projection>,
        limit: Limit,
        with_row_id: bool,
    ) -> QuiverResult<RecordTable>;
}

/// Dimension of `column` in `schema`
pub fn vector_dimension(schema: &Schema, column: &str) -> QuiverResult<usize> {
    let field = schema
        .field(column)
        .ok_or_else(|| QuiverError::column_not_found(column))?;
    field.data_type.vector_dimension().ok_or_else(|| {
        QuiverError::schema_mismatch(format!(
            "column '{}' is {}, not a vector column",
            column, field.data_type
        ))
    })
}
