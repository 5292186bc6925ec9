//! Hybrid search executor
//!
//! Runs a vector search and a full-text search over the same query on a
//! bounded worker pool, normalizes both score columns and fuses them with a
//! [`Reranker`].
//!
//! # State machine
//!
//! ```text
//! Init -> Validating -> RunningRetrievers -> Normalizing -> Reranking -> Truncating -> Done
//!   \__________\_______________\_________________\______________\_____________\__> Failed
//! ```
//!
//! Both retrievers always run with `_rowid`, the only join key between the
//! two streams. The limit is applied to each stream before fusion, so the
//! fused result can hold fewer rows than the limit.

use crate::normalize::Normalization;
use crate::rerank::{check_hybrid_output, LinearCombinationReranker, Reranker};
use crate::retriever::{Retriever, TextRetriever, VectorRetriever};
use quiver_core::{
    DataType, Field, Limit, QueryTarget, QuiverError, QuiverResult, RecordTable, RetrievalQuery,
    Value, DISTANCE_COLUMN, ROW_ID_COLUMN, SCORE_COLUMN,
};
use quiver_engine::{FilterEval, TableSource};
use rayon::ThreadPool;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// HybridState
// ============================================================================

/// Stage of one hybrid execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HybridState {
    /// Not started
    Init,
    /// Checking the index and query
    Validating,
    /// Vector and text retrieval in flight
    RunningRetrievers,
    /// Rescaling `_distance` and `score`
    Normalizing,
    /// Fusing the two streams
    Reranking,
    /// Applying the limit and dropping `_rowid`
    Truncating,
    /// Finished
    Done,
    /// Stopped on an error
    Failed,
}

impl HybridState {
    /// State name for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            HybridState::Init => "init",
            HybridState::Validating => "validating",
            HybridState::RunningRetrievers => "running_retrievers",
            HybridState::Normalizing => "normalizing",
            HybridState::Reranking => "reranking",
            HybridState::Truncating => "truncating",
            HybridState::Done => "done",
            HybridState::Failed => "failed",
        }
    }
}

impl fmt::Display for HybridState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn advance(state: &mut HybridState, next: HybridState) {
    tracing::debug!(target: "quiver::hybrid", from = %state, to = %next, "state transition");
    *state = next;
}

// ============================================================================
// HybridExecutor
// ============================================================================

/// Vector plus full-text search fused into one ranking
pub struct HybridExecutor {
    table: Arc<dyn TableSource>,
    filter_eval: Arc<dyn FilterEval>,
    pool: Arc<ThreadPool>,
    reranker: Arc<dyn Reranker>,
    normalization: Normalization,
    phrase_query: bool,
}

impl HybridExecutor {
    /// Executor over `table`, running retrievers on `pool`
    ///
    /// Fuses with the default [`LinearCombinationReranker`] and min-max
    /// normalization until configured otherwise.
    pub fn new(
        table: Arc<dyn TableSource>,
        filter_eval: Arc<dyn FilterEval>,
        pool: Arc<ThreadPool>,
    ) -> Self {
        HybridExecutor {
            table,
            filter_eval,
            pool,
            reranker: Arc::new(LinearCombinationReranker::default()),
            normalization: Normalization::Score,
            phrase_query: false,
        }
    }

    /// Builder: fusion strategy
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    /// Builder: normalization policy
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Builder: run the text side as an exact phrase query
    pub fn with_phrase_query(mut self, phrase_query: bool) -> Self {
        self.phrase_query = phrase_query;
        self
    }

    /// Run a hybrid search
    ///
    /// `base` carries the vector column, filter, limit, projection, metric
    /// and row-id choice shared by both sides; its target is ignored.
    /// `rerank_text` is what the reranker sees as the query string.
    pub fn execute(
        &self,
        base: &RetrievalQuery,
        vector: Vec<f32>,
        text: &str,
        rerank_text: &str,
    ) -> QuiverResult<RecordTable> {
        let mut state = HybridState::Init;
        match self.drive(&mut state, base, vector, text, rerank_text) {
            Ok(table) => Ok(table),
            Err(e) => {
                tracing::debug!(
                    target: "quiver::hybrid",
                    state = %state,
                    error = %e,
                    "hybrid search failed"
                );
                advance(&mut state, HybridState::Failed);
                Err(e)
            }
        }
    }

    fn drive(
        &self,
        state: &mut HybridState,
        base: &RetrievalQuery,
        vector: Vec<f32>,
        text: &str,
        rerank_text: &str,
    ) -> QuiverResult<RecordTable> {
        advance(state, HybridState::Validating);
        if !self.table.has_fts_index() {
            return Err(QuiverError::IndexMissing {
                table: self.table.name().to_string(),
            });
        }
        if vector.is_empty() {
            return Err(QuiverError::invalid_hybrid_pair("query vector is empty"));
        }
        base.validate()?;

        advance(state, HybridState::RunningRetrievers);
        let vector_query = base
            .clone()
            .with_target(QueryTarget::Vector(vector))
            .with_row_id(true);
        let text_query = base
            .clone()
            .with_target(QueryTarget::Text(text.to_string()))
            .with_row_id(true);
        let vector_retriever = VectorRetriever::new(self.table.clone());
        let text_retriever = TextRetriever::new(self.table.clone(), self.filter_eval.clone())
            .with_phrase_query(self.phrase_query);

        // join waits for both sides before either error surfaces
        let (fts, vector) = self.pool.join(
            || text_retriever.execute(&text_query),
            || vector_retriever.execute(&vector_query),
        );
        let fts = fts?;
        let vector = vector?;
        tracing::debug!(
            target: "quiver::hybrid",
            vector_rows = vector.num_rows(),
            fts_rows = fts.num_rows(),
            "retrievers finished"
        );

        advance(state, HybridState::Normalizing);
        let vector = self.normalize_column(vector, DISTANCE_COLUMN)?;
        let fts = self.normalize_column(fts, SCORE_COLUMN)?;

        advance(state, HybridState::Reranking);
        let fused = self.reranker.rerank_hybrid(rerank_text, vector, fts)?;
        check_hybrid_output(self.reranker.name(), &fused)?;

        advance(state, HybridState::Truncating);
        let limit = base.limit();
        let fused = fused.slice(0, limit.apply(fused.num_rows()));
        if let Limit::Rows(n) = limit {
            if fused.num_rows() < n {
                tracing::warn!(
                    target: "quiver::hybrid",
                    limit = n,
                    rows = fused.num_rows(),
                    "fused result shorter than the limit"
                );
            }
        }
        let fused = if base.includes_row_id() {
            fused
        } else {
            fused.drop_column(ROW_ID_COLUMN)
        };

        advance(state, HybridState::Done);
        Ok(fused)
    }

    fn normalize_column(&self, table: RecordTable, column: &str) -> QuiverResult<RecordTable> {
        let raw = table.f32_column(column)?;
        let normalized = self.normalization.apply(&raw);
        table.append_column(
            Field::new(column, DataType::Float32, false),
            normalized.into_iter().map(Value::from).collect(),
        )
    }
}
