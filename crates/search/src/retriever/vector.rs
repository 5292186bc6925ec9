//! Nearest-neighbour retrieval

use super::Retriever;
use crate::planner::infer_vector_column;
use crate::rerank::Reranker;
use quiver_core::{
    DataType, Field, QueryTarget, QuiverError, QuiverResult, RecordTable, RetrievalQuery, Value,
    DISTANCE_COLUMN, QUERY_INDEX_COLUMN,
};
use quiver_engine::{TableSource, VectorIndexScan};
use std::sync::Arc;

/// Runs vector queries through the table's vector index
pub struct VectorRetriever {
    table: Arc<dyn TableSource>,
    reranker: Option<Arc<dyn Reranker>>,
    query_text: Option<String>,
}

impl VectorRetriever {
    /// Retriever over `table`
    pub fn new(table: Arc<dyn TableSource>) -> Self {
        VectorRetriever {
            table,
            reranker: None,
            query_text: None,
        }
    }

    /// Builder: rerank the result; `query_text` is handed to the reranker
    pub fn with_reranker(
        mut self,
        reranker: Arc<dyn Reranker>,
        query_text: Option<String>,
    ) -> Self {
        self.reranker = Some(reranker);
        self.query_text = query_text;
        self
    }

    fn scan_one(
        &self,
        query: &RetrievalQuery,
        column: &str,
        expected: usize,
    ) -> QuiverResult<RecordTable> {
        if let QueryTarget::Vector(v) = query.target() {
            if v.len() != expected {
                return Err(QuiverError::DimensionMismatch {
                    column: column.to_string(),
                    expected,
                    actual: v.len(),
                });
            }
        }
        let result = self.table.vector_scan(query)?;
        check_ascending(&result)?;
        Ok(result)
    }
}

/// The index must return rows closest first
fn check_ascending(result: &RecordTable) -> QuiverResult<()> {
    let distances = result.f32_column(DISTANCE_COLUMN)?;
    if let Some(i) = distances.windows(2).position(|w| w[0] > w[1]) {
        return Err(QuiverError::contract(
            "vector index",
            format!(
                "distances not ascending at row {}: {} > {}",
                i + 1,
                distances[i],
                distances[i + 1]
            ),
        ));
    }
    Ok(())
}

impl Retriever for VectorRetriever {
    fn execute(&self, query: &RetrievalQuery) -> QuiverResult<RecordTable> {
        query.validate()?;
        let column = match query.vector_column() {
            Some(c) => c.to_string(),
            None => infer_vector_column(&self.table.schema(), self.table.name())?,
        };
        let expected = self.table.vector_column_dimension(&column)?;
        let query = query.clone().with_vector_column(column.clone());

        let results = match query.target() {
            QueryTarget::Vector(_) => self.scan_one(&query, &column, expected)?,
            QueryTarget::VectorBatch(vectors) => {
                let mut parts = Vec::with_capacity(vectors.len());
                for (i, v) in vectors.iter().enumerate() {
                    let sub = query.clone().with_target(QueryTarget::Vector(v.clone()));
                    let part = self.scan_one(&sub, &column, expected)?;
                    let index = vec![Value::UInt(i as u64); part.num_rows()];
                    parts.push(part.prepend_column(
                        Field::new(QUERY_INDEX_COLUMN, DataType::UInt32, false),
                        index,
                    )?);
                }
                RecordTable::concat(&parts)?
            }
            _ => {
                return Err(QuiverError::invalid_query(
                    "vector retrieval needs a vector or a batch of vectors",
                ))
            }
        };

        tracing::debug!(
            target: "quiver::vector",
            table = %self.table.name(),
            column = %column,
            metric = %query.metric(),
            limit = %query.limit(),
            rows = results.num_rows(),
            "vector search"
        );

        match &self.reranker {
            Some(reranker) => {
                let text = match (&self.query_text, reranker.requires_query_text()) {
                    (Some(t), _) => t.as_str(),
                    (None, false) => "",
                    (None, true) => {
                        return Err(QuiverError::MissingQueryString {
                            reranker: reranker.name().to_string(),
                        })
                    }
                };
                tracing::debug!(
                    target: "quiver::rerank",
                    reranker = %reranker.name(),
                    "reranking vector results"
                );
                reranker.rerank_vector(text, results)
            }
            None => Ok(results),
        }
    }
}
