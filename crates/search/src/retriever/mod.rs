//! Retrievers
//!
//! Each retriever executes one [`RetrievalQuery`] against a table and
//! returns a ranked [`RecordTable`]:
//!
//! | Retriever | Target | Rank column |
//! |-----------|--------|-------------|
//! | [`VectorRetriever`] | vector or vector batch | `_distance`, ascending |
//! | [`TextRetriever`] | text | `score`, descending |
//! | [`EmptyRetriever`] | none | storage order |

mod empty;
mod fts;
mod vector;

pub use empty::EmptyRetriever;
pub use fts::{phrase_query, TextRetriever};
pub use vector::VectorRetriever;

use quiver_core::{QuiverResult, RecordTable, RetrievalQuery};

/// Executes one retrieval request
pub trait Retriever: Send + Sync {
    /// Run `query` and return ranked rows
    fn execute(&self, query: &RetrievalQuery) -> QuiverResult<RecordTable>;
}
