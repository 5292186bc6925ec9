//! Full-text retrieval
//!
//! The text index returns `(row_id, score)` pairs; rows are then fetched in
//! exactly that order. A filter is never pushed into the text index: it is
//! evaluated over the fetched rows by a [`FilterEval`] backend, so a
//! filtered search can return fewer rows than its limit.

use super::Retriever;
use crate::rerank::Reranker;
use quiver_core::{
    DataType, Field, QueryTarget, QuiverError, QuiverResult, RecordTable, RetrievalQuery, Schema,
    Value, ROW_ID_COLUMN, SCORE_COLUMN,
};
use quiver_engine::expr::project;
use quiver_engine::{FilterEval, RowFetch, TableSource, TextIndexScan};
use std::sync::Arc;

/// Wrap `text` as an exact phrase query
///
/// Inner double quotes become single quotes; this is lossy on purpose and
/// only keeps the phrase syntax well-formed.
pub fn phrase_query(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "'"))
}

/// Runs text queries through the table's inverted index
pub struct TextRetriever {
    table: Arc<dyn TableSource>,
    filter_eval: Arc<dyn FilterEval>,
    phrase_query: bool,
    reranker: Option<Arc<dyn Reranker>>,
}

impl TextRetriever {
    /// Retriever over `table`, filtering with `filter_eval`
    pub fn new(table: Arc<dyn TableSource>, filter_eval: Arc<dyn FilterEval>) -> Self {
        TextRetriever {
            table,
            filter_eval,
            phrase_query: false,
            reranker: None,
        }
    }

    /// Builder: treat the query string as one exact phrase
    pub fn with_phrase_query(mut self, phrase_query: bool) -> Self {
        self.phrase_query = phrase_query;
        self
    }

    /// Builder: rerank the result with the query string
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }
}

fn with_scores(table: RecordTable, scores: &[f32], row_ids: &[u64]) -> QuiverResult<RecordTable> {
    table
        .append_column(
            Field::new(SCORE_COLUMN, DataType::Float32, false),
            scores.iter().map(|&s| Value::from(s)).collect(),
        )?
        .append_column(
            Field::new(ROW_ID_COLUMN, DataType::UInt64, false),
            row_ids.iter().map(|&id| Value::UInt(id)).collect(),
        )
}

fn empty_result(with_row_id: bool) -> QuiverResult<RecordTable> {
    let mut fields = vec![Field::new(SCORE_COLUMN, DataType::Float32, false)];
    if with_row_id {
        fields.push(Field::new(ROW_ID_COLUMN, DataType::UInt64, false));
    }
    Ok(RecordTable::empty(Schema::new(fields)?))
}

impl Retriever for TextRetriever {
    fn execute(&self, query: &RetrievalQuery) -> QuiverResult<RecordTable> {
        let text = match query.target() {
            QueryTarget::Text(t) => t.as_str(),
            _ => {
                return Err(QuiverError::invalid_query(
                    "text retrieval needs a query string",
                ))
            }
        };
        if !self.table.has_fts_index() {
            return Err(QuiverError::IndexMissing {
                table: self.table.name().to_string(),
            });
        }

        let index_query = if self.phrase_query {
            phrase_query(text)
        } else {
            text.to_string()
        };
        let hits = self.table.text_scan(&index_query, query.limit())?;
        hits.validate()?;

        if hits.is_empty() {
            tracing::warn!(
                target: "quiver::fts",
                table = %self.table.name(),
                query = %index_query,
                "full-text search returned no rows"
            );
            return empty_result(query.includes_row_id());
        }

        let results = match query.filter() {
            Some(predicate) => {
                let fetched = self.table.fetch_rows(&hits.row_ids, None)?;
                check_fetched(&fetched, hits.len())?;
                let scored = with_scores(fetched, &hits.scores, &hits.row_ids)?;
                let filtered = self.filter_eval.filter(&scored, predicate)?;
                match query.projection() {
                    Some(projection) => {
                        let scores = filtered.f32_column(SCORE_COLUMN)?;
                        let row_ids = filtered.u64_column(ROW_ID_COLUMN)?;
                        with_scores(project(&filtered, projection)?, &scores, &row_ids)?
                    }
                    None => filtered,
                }
            }
            None => {
                let fetched = self.table.fetch_rows(&hits.row_ids, query.projection())?;
                check_fetched(&fetched, hits.len())?;
                with_scores(fetched, &hits.scores, &hits.row_ids)?
            }
        };

        tracing::debug!(
            target: "quiver::fts",
            table = %self.table.name(),
            hits = hits.len(),
            rows = results.num_rows(),
            filter = query.filter().unwrap_or(""),
            backend = %self.filter_eval.name(),
            "full-text search"
        );

        let results = match &self.reranker {
            Some(reranker) => {
                tracing::debug!(
                    target: "quiver::rerank",
                    reranker = %reranker.name(),
                    "reranking full-text results"
                );
                reranker.rerank_fts(text, results)?
            }
            None => results,
        };

        if query.includes_row_id() {
            Ok(results)
        } else {
            Ok(results.drop_column(ROW_ID_COLUMN))
        }
    }
}

fn check_fetched(fetched: &RecordTable, expected: usize) -> QuiverResult<()> {
    if fetched.num_rows() != expected {
        return Err(QuiverError::contract(
            "row fetch",
            format!(
                "asked for {} rows, received {}",
                expected,
                fetched.num_rows()
            ),
        ));
    }
    Ok(())
}
