//! Row-id join of a vector result and a text result

use quiver_core::{
    DataType, Field, QuiverResult, RecordTable, Value, DISTANCE_COLUMN, ROW_ID_COLUMN,
    SCORE_COLUMN,
};
use std::collections::{HashMap, HashSet};

/// Outer-join two result tables on `_rowid`
///
/// Vector rows come first in their ranked order, followed by text-only rows
/// in theirs. The output carries one nullable `_distance` and one nullable
/// `score` column; a row found by only one side has `Null` for the other.
pub fn join_by_row_id(vector: &RecordTable, fts: &RecordTable) -> QuiverResult<RecordTable> {
    let vector_ids = vector.u64_column(ROW_ID_COLUMN)?;
    let fts_ids = fts.u64_column(ROW_ID_COLUMN)?;
    let distances = vector.f32_column(DISTANCE_COLUMN)?;
    let scores = fts.f32_column(SCORE_COLUMN)?;

    let score_of: HashMap<u64, f32> = fts_ids.iter().copied().zip(scores.iter().copied()).collect();
    let seen: HashSet<u64> = vector_ids.iter().copied().collect();
    let fts_only: Vec<usize> = fts_ids
        .iter()
        .enumerate()
        .filter(|(_, id)| !seen.contains(*id))
        .map(|(i, _)| i)
        .collect();

    let vector_part = vector.clone().drop_column(DISTANCE_COLUMN).drop_column(SCORE_COLUMN);
    let fts_part = fts
        .take(&fts_only)?
        .drop_column(DISTANCE_COLUMN)
        .drop_column(SCORE_COLUMN);

    // an empty side may have inferred projection types that disagree
    let parts: Vec<RecordTable> = match (vector_part.is_empty(), fts_part.is_empty()) {
        (true, false) => vec![fts_part],
        (false, true) | (true, true) => vec![vector_part],
        (false, false) => vec![vector_part, fts_part],
    };
    let merged = RecordTable::concat(&parts)?;

    let distance_col: Vec<Value> = distances
        .iter()
        .map(|&d| Value::from(d))
        .chain(fts_only.iter().map(|_| Value::Null))
        .collect();
    let score_col: Vec<Value> = vector_ids
        .iter()
        .map(|id| score_of.get(id).map(|&s| Value::from(s)).unwrap_or(Value::Null))
        .chain(fts_only.iter().map(|&i| Value::from(scores[i])))
        .collect();

    merged
        .append_column(
            Field::new(DISTANCE_COLUMN, DataType::Float32, true),
            distance_col,
        )?
        .append_column(Field::new(SCORE_COLUMN, DataType::Float32, true), score_col)
}
