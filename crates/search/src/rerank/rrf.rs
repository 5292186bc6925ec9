//! Reciprocal Rank Fusion

use super::merge::join_by_row_id;
use super::{finish_ranked, Reranker, ReturnScore};
use quiver_core::{QuiverError, QuiverResult, RecordTable, ROW_ID_COLUMN};
use std::collections::HashMap;

/// Reciprocal Rank Fusion (RRF)
///
/// RRF Score = sum(1 / (k + rank)) across both streams, rank starting at 1.
/// Only positions matter; the score columns are carried but never read.
///
/// # Example
///
/// ```text
/// vector: [row1, row2, row3]
/// text:   [row2, row4, row1]
/// k = 60
///
/// row1: 1/61 + 1/63 = 0.0323
/// row2: 1/62 + 1/61 = 0.0325  <- highest
/// row3: 1/63        = 0.0159
/// row4: 1/62        = 0.0161
///
/// fused: [row2, row1, row4, row3]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RrfReranker {
    k: u32,
    return_score: ReturnScore,
}

impl Default for RrfReranker {
    fn default() -> Self {
        RrfReranker {
            k: 60,
            return_score: ReturnScore::Relevance,
        }
    }
}

impl RrfReranker {
    /// Create a reranker with smoothing constant `k`
    pub fn new(k: u32) -> QuiverResult<Self> {
        if k == 0 {
            return Err(QuiverError::invalid_config("RRF k must be greater than 0"));
        }
        Ok(RrfReranker {
            k,
            return_score: ReturnScore::Relevance,
        })
    }

    /// Builder: choose which score columns to keep
    pub fn with_return_score(mut self, return_score: ReturnScore) -> Self {
        self.return_score = return_score;
        self
    }

    /// Smoothing constant
    pub fn k(&self) -> u32 {
        self.k
    }

    fn contribution(&self, position: usize) -> f32 {
        1.0 / (self.k as f32 + (position + 1) as f32)
    }

    fn single_stream(&self, results: RecordTable) -> QuiverResult<RecordTable> {
        let relevance = (0..results.num_rows())
            .map(|i| self.contribution(i))
            .collect();
        finish_ranked(results, relevance, self.return_score)
    }
}

impl Reranker for RrfReranker {
    fn name(&self) -> &str {
        "rrf"
    }

    fn rerank_hybrid(
        &self,
        _query: &str,
        vector: RecordTable,
        fts: RecordTable,
    ) -> QuiverResult<RecordTable> {
        let mut fused: HashMap<u64, f32> = HashMap::new();
        for stream in [&vector, &fts] {
            for (i, id) in stream.u64_column(ROW_ID_COLUMN)?.into_iter().enumerate() {
                *fused.entry(id).or_insert(0.0) += self.contribution(i);
            }
        }

        let merged = join_by_row_id(&vector, &fts)?;
        let relevance = merged
            .u64_column(ROW_ID_COLUMN)?
            .iter()
            .map(|id| fused.get(id).copied().unwrap_or(0.0))
            .collect();
        finish_ranked(merged, relevance, self.return_score)
    }

    fn rerank_vector(&self, _query: &str, results: RecordTable) -> QuiverResult<RecordTable> {
        self.single_stream(results)
    }

    fn rerank_fts(&self, _query: &str, results: RecordTable) -> QuiverResult<RecordTable> {
        self.single_stream(results)
    }
}
