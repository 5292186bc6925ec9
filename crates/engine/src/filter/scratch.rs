//! Scratch-dataset filter backend
//!
//! The input rows get an indexer column, are written to a dataset inside a
//! temporary directory, and are read back through the store's own predicate
//! pushdown. The surviving indexer values restore the input order. The
//! directory is removed when the call returns, on success or failure.

use crate::expr::matching_rows;
use crate::traits::FilterEval;
use quiver_core::{DataType, Field, QuiverError, QuiverResult, RecordTable, Schema, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const INDEXER_COLUMN: &str = "__quiver_indexer";
const SCHEMA_FILE: &str = "schema.json";
const DATA_FILE: &str = "data.jsonl";

/// A dataset store able to filter what it reads
pub trait ScratchStore: Send + Sync {
    /// Write `table` as a dataset under `dir`
    fn write_dataset(&self, dir: &Path, table: &RecordTable) -> QuiverResult<()>;

    /// Read back the rows of the dataset under `dir` matching `predicate`
    fn scan_dataset(&self, dir: &Path, predicate: &str) -> QuiverResult<RecordTable>;
}

/// Dataset as a schema file plus one JSON array per row
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesScratchStore;

impl ScratchStore for JsonLinesScratchStore {
    fn write_dataset(&self, dir: &Path, table: &RecordTable) -> QuiverResult<()> {
        let schema_file = File::create(dir.join(SCHEMA_FILE))?;
        serde_json::to_writer(schema_file, table.schema())?;

        let mut out = BufWriter::new(File::create(dir.join(DATA_FILE))?);
        let names = table.schema().names();
        for row in 0..table.num_rows() {
            let values: Vec<&Value> = names
                .iter()
                .map(|name| table.value(row, name).unwrap_or(&Value::Null))
                .collect();
            serde_json::to_writer(&mut out, &values)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }

    fn scan_dataset(&self, dir: &Path, predicate: &str) -> QuiverResult<RecordTable> {
        let schema: Schema = serde_json::from_reader(File::open(dir.join(SCHEMA_FILE))?)?;
        let reader = BufReader::new(File::open(dir.join(DATA_FILE))?);

        let mut rows = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            rows.push(serde_json::from_str::<Vec<Value>>(&line)?);
        }
        let table = RecordTable::from_rows(schema, rows)?;
        let keep = matching_rows(&table, predicate)?;
        table.take(&keep)
    }
}

/// [`FilterEval`] that routes rows through a [`ScratchStore`]
#[derive(Debug, Clone, Default)]
pub struct ScratchDatasetFilter<S = JsonLinesScratchStore> {
    store: S,
}

impl<S: ScratchStore> ScratchDatasetFilter<S> {
    /// Filter through `store`
    pub fn new(store: S) -> Self {
        ScratchDatasetFilter { store }
    }
}

impl<S: ScratchStore> FilterEval for ScratchDatasetFilter<S> {
    fn name(&self) -> &str {
        "scratch"
    }

    fn filter(&self, table: &RecordTable, predicate: &str) -> QuiverResult<RecordTable> {
        if table.has_column(INDEXER_COLUMN) {
            return Err(QuiverError::schema_mismatch(format!(
                "column '{}' is reserved for scratch filtering",
                INDEXER_COLUMN
            )));
        }
        let indexer: Vec<Value> = (0..table.num_rows() as u64).map(Value::UInt).collect();
        let staged = table.clone().append_column(
            Field::new(INDEXER_COLUMN, DataType::UInt64, false),
            indexer,
        )?;

        let dir = tempfile::Builder::new()
            .prefix("quiver-filter-")
            .tempdir()?;
        self.store.write_dataset(dir.path(), &staged)?;
        let matched = self.store.scan_dataset(dir.path(), predicate)?;

        let mut positions = matched
            .u64_column(INDEXER_COLUMN)?
            .into_iter()
            .map(|i| i as usize)
            .collect::<Vec<_>>();
        positions.sort_unstable();

        tracing::debug!(
            target: "quiver::filter",
            backend = "scratch",
            input = table.num_rows(),
            kept = positions.len(),
            "filtered rows"
        );
        table.take(&positions)
    }
}
