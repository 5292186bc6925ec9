//! Linear combination of normalized scores

use super::merge::join_by_row_id;
use super::{finish_ranked, optional_f32_column, Reranker, ReturnScore};
use crate::normalize::normalize_scores;
use quiver_core::{QuiverError, QuiverResult, RecordTable, DISTANCE_COLUMN, SCORE_COLUMN};

/// Weighted sum of the vector and text signals
///
/// Both inputs are expected normalized: `_distance` in `[0, 1]` with 0 the
/// closest, `score` in `[0, 1]` with 1 the most relevant. The text score is
/// flipped into a distance, the two distances are blended, and the blend is
/// flipped back:
///
/// ```text
/// relevance = 1 - (weight * distance + (1 - weight) * (1 - score))
/// ```
///
/// A row found by only one side takes `fill` as the missing distance.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearCombinationReranker {
    weight: f32,
    fill: f32,
    return_score: ReturnScore,
}

impl Default for LinearCombinationReranker {
    fn default() -> Self {
        LinearCombinationReranker {
            weight: 0.7,
            fill: 1.0,
            return_score: ReturnScore::Relevance,
        }
    }
}

impl LinearCombinationReranker {
    /// Create a reranker; `weight` is the vector share and must be in `[0, 1]`
    pub fn new(weight: f32, fill: f32) -> QuiverResult<Self> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(QuiverError::invalid_config(format!(
                "linear combination weight must be in [0, 1], got {}",
                weight
            )));
        }
        if !fill.is_finite() {
            return Err(QuiverError::invalid_config(format!(
                "linear combination fill must be finite, got {}",
                fill
            )));
        }
        Ok(LinearCombinationReranker {
            weight,
            fill,
            return_score: ReturnScore::Relevance,
        })
    }

    /// Builder: choose which score columns to keep
    pub fn with_return_score(mut self, return_score: ReturnScore) -> Self {
        self.return_score = return_score;
        self
    }

    /// Vector share of the blend
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Distance used for the missing side
    pub fn fill(&self) -> f32 {
        self.fill
    }

    fn combine(&self, distance: Option<f32>, score: Option<f32>) -> f32 {
        let vector_distance = distance.unwrap_or(self.fill);
        let text_distance = score.map(|s| 1.0 - s).unwrap_or(self.fill);
        1.0 - (self.weight * vector_distance + (1.0 - self.weight) * text_distance)
    }
}

impl Reranker for LinearCombinationReranker {
    fn name(&self) -> &str {
        "linear"
    }

    fn rerank_hybrid(
        &self,
        _query: &str,
        vector: RecordTable,
        fts: RecordTable,
    ) -> QuiverResult<RecordTable> {
        let merged = join_by_row_id(&vector, &fts)?;
        let distances = optional_f32_column(&merged, DISTANCE_COLUMN)?;
        let scores = optional_f32_column(&merged, SCORE_COLUMN)?;
        let relevance = distances
            .into_iter()
            .zip(scores)
            .map(|(d, s)| self.combine(d, s))
            .collect();
        finish_ranked(merged, relevance, self.return_score)
    }

    fn rerank_vector(&self, _query: &str, results: RecordTable) -> QuiverResult<RecordTable> {
        let distances = results.f32_column(DISTANCE_COLUMN)?;
        let relevance = normalize_scores(&distances, true);
        finish_ranked(results, relevance, self.return_score)
    }

    fn rerank_fts(&self, _query: &str, results: RecordTable) -> QuiverResult<RecordTable> {
        let scores = results.f32_column(SCORE_COLUMN)?;
        let relevance = normalize_scores(&scores, false);
        finish_ranked(results, relevance, self.return_score)
    }
}
