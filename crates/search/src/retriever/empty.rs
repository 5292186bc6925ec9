//! Plain filtered scans

use super::Retriever;
use quiver_core::{QueryTarget, QuiverError, QuiverResult, RecordTable, RetrievalQuery};
use quiver_engine::TableSource;
use std::sync::Arc;

/// Runs queries without a search target as a filtered scan
pub struct EmptyRetriever {
    table: Arc<dyn TableSource>,
}

impl EmptyRetriever {
    /// Retriever over `table`
    pub fn new(table: Arc<dyn TableSource>) -> Self {
        EmptyRetriever { table }
    }
}

impl Retriever for EmptyRetriever {
    fn execute(&self, query: &RetrievalQuery) -> QuiverResult<RecordTable> {
        if *query.target() != QueryTarget::None {
            return Err(QuiverError::invalid_query(
                "a plain scan cannot take a vector or text target",
            ));
        }
        let results = self.table.scan(
            query.filter(),
            query.projection(),
            query.limit(),
            query.includes_row_id(),
        )?;
        tracing::debug!(
            target: "quiver::engine",
            table = %self.table.name(),
            rows = results.num_rows(),
            "plain scan"
        );
        Ok(results)
    }
}
