//! Test utilities for the search comprehensive tests

#![allow(dead_code)]

use quiver::{
    DataType, EmbeddingFunction, Field, MemoryTable, QuiverResult, RecordTable, Schema,
    SearchExt, Searcher, Value,
};
use std::sync::Arc;

/// The four-row table used by the end-to-end vector scenario
///
/// | row | vector | b | text |
/// |-----|--------|---|------|
/// | 0 | [1, 0] | 2 | cats and dogs |
/// | 1 | [0, 1] | 20 | dogs only |
/// | 2 | [0.5, 0.5] | 6 | birds |
/// | 3 | [-1, 0] | 1 | null |
pub fn e2e_table() -> Arc<MemoryTable> {
    let schema = Schema::new(vec![
        Field::new("vector", DataType::Vector(2), false),
        Field::new("b", DataType::Int64, false),
        Field::new("text", DataType::Utf8, true),
    ])
    .unwrap();
    let table = MemoryTable::new("e2e", schema);
    table
        .add_rows(vec![
            vec![vec![1.0f32, 0.0].into(), Value::Int(2), "cats and dogs".into()],
            vec![vec![0.0f32, 1.0].into(), Value::Int(20), "dogs only".into()],
            vec![vec![0.5f32, 0.5].into(), Value::Int(6), "birds".into()],
            vec![vec![-1.0f32, 0.0].into(), Value::Int(1), Value::Null],
        ])
        .unwrap();
    Arc::new(table)
}

/// Corpus text by row position
pub const CORPUS: [&str; 12] = [
    "red apple pie",
    "green apple",
    "red sports car",
    "blue sky",
    "red wine",
    "apple orchard",
    "fast car",
    "blue whale",
    "green tea",
    "red panda",
    "old car",
    "apple cider",
];

/// Unit vector at `i * 30` degrees
pub fn corpus_vector(i: usize) -> Vec<f32> {
    let angle = (i as f32 * 30.0).to_radians();
    vec![angle.cos(), angle.sin()]
}

/// Twelve documents with `id`, `text`, `vector`; no index built
pub fn corpus_table_without_index() -> Arc<MemoryTable> {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("vector", DataType::Vector(2), false),
    ])
    .unwrap();
    let rows = CORPUS
        .iter()
        .enumerate()
        .map(|(i, text)| {
            vec![
                Value::Int(i as i64),
                (*text).into(),
                corpus_vector(i).into(),
            ]
        })
        .collect();
    let table =
        MemoryTable::from_table("corpus", RecordTable::from_rows(schema, rows).unwrap()).unwrap();
    Arc::new(table)
}

/// Corpus with a full-text index over `text`
pub fn corpus_table() -> Arc<MemoryTable> {
    let table = corpus_table_without_index();
    table.create_fts_index(&["text"], false).unwrap();
    table
}

/// Corpus with a full-text index and [`AxisEmbedding`] bound to `vector`
pub fn corpus_table_with_embedding() -> Arc<MemoryTable> {
    let table = corpus_table();
    table
        .bind_embedding_function("vector", Arc::new(AxisEmbedding))
        .unwrap();
    table
}

/// Default searcher over `table`
pub fn searcher(table: &Arc<MemoryTable>) -> Searcher {
    table.searcher().unwrap()
}

/// Integer column as plain values
pub fn ids(table: &RecordTable, column: &str) -> Vec<i64> {
    table
        .column(column)
        .unwrap()
        .iter()
        .map(|v| match v {
            Value::Int(i) => *i,
            other => panic!("expected an integer, got {:?}", other),
        })
        .collect()
}

/// Embeds text mentioning "apple" at 0 degrees, anything else at 90
pub struct AxisEmbedding;

impl EmbeddingFunction for AxisEmbedding {
    fn name(&self) -> &str {
        "axis"
    }

    fn embed_text(&self, texts: &[String]) -> QuiverResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.contains("apple") {
                    vec![1.0, 0.0]
                } else {
                    vec![0.0, 1.0]
                }
            })
            .collect())
    }
}
