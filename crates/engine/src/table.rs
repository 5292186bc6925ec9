//! In-memory reference table
//!
//! `MemoryTable` implements every collaborator capability over rows held in
//! memory: brute-force vector scans, a BM25 inverted index, id lookups and
//! filtered scans. Row ids are assigned in insertion order starting at 0
//! and never reused.
//!
//! # Thread Safety
//!
//! Rows and index state sit behind `parking_lot::RwLock`s; scans take read
//! locks and may run concurrently.

use crate::expr::{matching_rows, project};
use crate::search::InvertedIndex;
use crate::traits::{
    vector_dimension, EmbeddingFunction, RowFetch, TableSource, TextIndexScan, TextScanResult,
    VectorIndexScan,
};
use crate::vector::nearest;
use parking_lot::RwLock;
use quiver_core::{
    DataType, Field, Limit, Projection, QueryTarget, QuiverError, QuiverResult, RecordTable,
    RetrievalQuery, Schema, Value, DISTANCE_COLUMN, ROW_ID_COLUMN,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Rows plus the capabilities a search needs
pub struct MemoryTable {
    name: String,
    rows: RwLock<RecordTable>,
    fts: RwLock<Option<Arc<InvertedIndex>>>,
    embeddings: RwLock<HashMap<String, Arc<dyn EmbeddingFunction>>>,
}

impl MemoryTable {
    /// Create an empty table
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        MemoryTable {
            name: name.into(),
            rows: RwLock::new(RecordTable::empty(schema)),
            fts: RwLock::new(None),
            embeddings: RwLock::new(HashMap::new()),
        }
    }

    /// Create a table holding `table`'s rows
    pub fn from_table(name: impl Into<String>, table: RecordTable) -> QuiverResult<Self> {
        let mem = MemoryTable::new(name, table.schema().clone());
        mem.add(table)?;
        Ok(mem)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.read().num_rows()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all rows in storage order
    pub fn to_table(&self) -> RecordTable {
        self.rows.read().clone()
    }

    /// Append rows; returns the assigned row ids
    ///
    /// The batch schema must equal the table schema. An existing
    /// full-text index is updated with the new rows.
    pub fn add(&self, batch: RecordTable) -> QuiverResult<Vec<u64>> {
        // lock order: fts, then rows
        let fts = self.fts.read();
        let mut rows = self.rows.write();
        if batch.schema() != rows.schema() {
            return Err(QuiverError::schema_mismatch(format!(
                "cannot add rows with columns {:?} to table '{}' with columns {:?}",
                batch.schema().names(),
                self.name,
                rows.schema().names()
            )));
        }

        let first = rows.num_rows();
        let merged = RecordTable::concat(&[rows.clone(), batch])?;
        let ids: Vec<u64> = (first as u64..merged.num_rows() as u64).collect();

        if let Some(index) = fts.as_ref() {
            for &id in &ids {
                index.index_document(id, &text_of(&merged, id as usize, index.columns()));
            }
        }
        *rows = merged;

        tracing::debug!(target: "quiver::engine", table = %self.name, added = ids.len(), "rows added");
        Ok(ids)
    }

    /// Append row-major values
    pub fn add_rows(&self, values: Vec<Vec<Value>>) -> QuiverResult<Vec<u64>> {
        let schema = self.rows.read().schema().clone();
        self.add(RecordTable::from_rows(schema, values)?)
    }

    /// Bind an embedding function to a vector column
    pub fn bind_embedding_function(
        &self,
        column: &str,
        function: Arc<dyn EmbeddingFunction>,
    ) -> QuiverResult<()> {
        self.vector_column_dimension(column)?;
        self.embeddings.write().insert(column.to_string(), function);
        Ok(())
    }

    /// Build a full-text index over string columns
    ///
    /// Fails with `IndexExists` when an index is present and `replace` is
    /// false.
    pub fn create_fts_index<S: AsRef<str>>(&self, columns: &[S], replace: bool) -> QuiverResult<()> {
        let mut fts = self.fts.write();
        if fts.is_some() && !replace {
            return Err(QuiverError::IndexExists {
                table: self.name.clone(),
            });
        }
        if columns.is_empty() {
            return Err(QuiverError::invalid_config(
                "full-text index needs at least one column",
            ));
        }

        let rows = self.rows.read();
        let mut names = Vec::with_capacity(columns.len());
        for column in columns {
            let column = column.as_ref();
            let field = rows
                .schema()
                .field(column)
                .ok_or_else(|| QuiverError::column_not_found(column))?;
            if field.data_type != DataType::Utf8 {
                return Err(QuiverError::schema_mismatch(format!(
                    "cannot index column '{}' of type {}",
                    column, field.data_type
                )));
            }
            names.push(column.to_string());
        }

        let index = InvertedIndex::new(names);
        for pos in 0..rows.num_rows() {
            index.index_document(pos as u64, &text_of(&rows, pos, index.columns()));
        }
        tracing::debug!(
            target: "quiver::engine",
            table = %self.name,
            docs = index.total_docs(),
            "built full-text index"
        );
        *fts = Some(Arc::new(index));
        Ok(())
    }

    fn resolve_vector_column(&self, schema: &Schema, named: Option<&str>) -> QuiverResult<String> {
        if let Some(name) = named {
            return Ok(name.to_string());
        }
        let candidates = schema.vector_columns();
        match candidates.as_slice() {
            [only] => Ok(only.name.clone()),
            [] => Err(QuiverError::NoVectorColumn {
                table: self.name.clone(),
            }),
            many => Err(QuiverError::AmbiguousVectorColumn {
                table: self.name.clone(),
                candidates: many.iter().map(|f| f.name.clone()).collect(),
            }),
        }
    }
}

/// Indexed text of one row: non-null values of `columns` joined by spaces
fn text_of(rows: &RecordTable, pos: usize, columns: &[String]) -> String {
    columns
        .iter()
        .filter_map(|c| rows.value(pos, c).and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Project `subset` and append the distance and row-id columns
fn finish(
    subset: RecordTable,
    row_ids: Vec<u64>,
    projection: Option<&Projection>,
    distances: Option<Vec<f32>>,
    with_row_id: bool,
) -> QuiverResult<RecordTable> {
    let mut out = match projection {
        Some(p) => project(&subset, p)?,
        None => subset,
    };
    if let Some(distances) = distances {
        out = out.append_column(
            Field::new(DISTANCE_COLUMN, DataType::Float32, false),
            distances.into_iter().map(Value::from).collect(),
        )?;
    }
    if with_row_id {
        out = out.append_column(
            Field::new(ROW_ID_COLUMN, DataType::UInt64, false),
            row_ids.into_iter().map(Value::UInt).collect(),
        )?;
    }
    Ok(out)
}

impl VectorIndexScan for MemoryTable {
    /// Exhaustive scan
    ///
    /// `nprobes` and `refine_factor` have no effect on a brute-force scan.
    /// Both prefilter and postfilter consider every row, so a postfilter
    /// never returns fewer rows than a prefilter would.
    fn vector_scan(&self, query: &RetrievalQuery) -> QuiverResult<RecordTable> {
        let rows = self.rows.read();
        let column = self.resolve_vector_column(rows.schema(), query.vector_column())?;
        let expected = vector_dimension(rows.schema(), &column)?;

        let vector = match query.target() {
            QueryTarget::Vector(v) => v,
            _ => {
                return Err(QuiverError::invalid_query(
                    "vector scan needs a single query vector",
                ))
            }
        };
        if vector.len() != expected {
            return Err(QuiverError::DimensionMismatch {
                column,
                expected,
                actual: vector.len(),
            });
        }

        let candidates: Vec<usize> = match (query.filter(), query.prefilter()) {
            (Some(predicate), true) => matching_rows(&rows, predicate)?,
            _ => (0..rows.num_rows()).collect(),
        };
        let values = rows.require_column(&column)?;
        let postfilter = query.filter().filter(|_| !query.prefilter());

        let scan_limit = if postfilter.is_some() {
            Limit::Unbounded
        } else {
            query.limit()
        };
        let mut ranked = nearest(
            candidates.iter().filter_map(|&pos| {
                values[pos]
                    .as_vector()
                    .map(|v| (pos as u64, pos, v))
            }),
            vector,
            query.metric(),
            scan_limit,
        );

        if let Some(predicate) = postfilter {
            let positions: Vec<usize> = ranked.iter().map(|(p, _)| *p).collect();
            let keep = matching_rows(&rows.take(&positions)?, predicate)?;
            ranked = keep.into_iter().map(|i| ranked[i]).collect();
            ranked.truncate(query.limit().apply(ranked.len()));
        }

        tracing::debug!(
            target: "quiver::engine",
            table = %self.name,
            column = %column,
            metric = %query.metric(),
            candidates = candidates.len(),
            returned = ranked.len(),
            "vector scan"
        );

        let positions: Vec<usize> = ranked.iter().map(|(p, _)| *p).collect();
        let subset = rows.take(&positions)?;
        finish(
            subset,
            positions.iter().map(|&p| p as u64).collect(),
            query.projection(),
            Some(ranked.iter().map(|(_, d)| *d).collect()),
            query.includes_row_id(),
        )
    }
}

impl TextIndexScan for MemoryTable {
    fn has_fts_index(&self) -> bool {
        self.fts.read().is_some()
    }

    fn text_scan(&self, query: &str, limit: Limit) -> QuiverResult<TextScanResult> {
        let index = self.fts.read().clone().ok_or_else(|| QuiverError::IndexMissing {
            table: self.name.clone(),
        })?;
        let hits = index.search(query, limit.get());
        let (row_ids, scores) = hits.into_iter().unzip();
        Ok(TextScanResult { row_ids, scores })
    }
}

impl RowFetch for MemoryTable {
    fn fetch_rows(
        &self,
        row_ids: &[u64],
        projection: Option<&Projection>,
    ) -> QuiverResult<RecordTable> {
        let rows = self.rows.read();
        let positions = row_ids
            .iter()
            .map(|&id| {
                let pos = id as usize;
                if pos < rows.num_rows() {
                    Ok(pos)
                } else {
                    Err(QuiverError::Storage(format!(
                        "row id {} not found in table '{}'",
                        id, self.name
                    )))
                }
            })
            .collect::<QuiverResult<Vec<_>>>()?;
        finish(rows.take(&positions)?, Vec::new(), projection, None, false)
    }
}

impl TableSource for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> Schema {
        self.rows.read().schema().clone()
    }

    fn embedding_function_for(&self, column: &str) -> Option<Arc<dyn EmbeddingFunction>> {
        self.embeddings.read().get(column).cloned()
    }

    fn scan(
        &self,
        filter: Option<&str>,
        projection: Option<&Projection>,
        limit: Limit,
        with_row_id: bool,
    ) -> QuiverResult<RecordTable> {
        let rows = self.rows.read();
        let mut positions = match filter {
            Some(predicate) => matching_rows(&rows, predicate)?,
            None => (0..rows.num_rows()).collect(),
        };
        positions.truncate(limit.apply(positions.len()));
        finish(
            rows.take(&positions)?,
            positions.iter().map(|&p| p as u64).collect(),
            projection,
            None,
            with_row_id,
        )
    }
}
