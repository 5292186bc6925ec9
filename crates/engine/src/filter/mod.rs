//! Row filter backends
//!
//! Two interchangeable implementations of [`FilterEval`]:
//!
//! - [`ExprFilter`]: evaluates the predicate in-process with the embedded
//!   expression evaluator
//! - [`ScratchDatasetFilter`]: writes the rows to a scratch dataset, lets the
//!   store apply the predicate, then restores the original order
//!
//! Both return the matching subset in input order and must agree on every
//! input.

mod scratch;

pub use scratch::{JsonLinesScratchStore, ScratchDatasetFilter, ScratchStore};

use crate::expr::matching_rows;
use crate::traits::FilterEval;
use quiver_core::{QuiverResult, RecordTable};

/// In-process filter backed by the expression evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprFilter;

impl ExprFilter {
    /// Create the filter
    pub fn new() -> Self {
        ExprFilter
    }
}

impl FilterEval for ExprFilter {
    fn name(&self) -> &str {
        "expr"
    }

    fn filter(&self, table: &RecordTable, predicate: &str) -> QuiverResult<RecordTable> {
        let keep = matching_rows(table, predicate)?;
        tracing::debug!(
            target: "quiver::filter",
            backend = "expr",
            input = table.num_rows(),
            kept = keep.len(),
            "filtered rows"
        );
        table.take(&keep)
    }
}
