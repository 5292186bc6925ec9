//! Tier 4: Query Planning
//!
//! Mode resolution, embedding and vector column inference.

use crate::test_utils::*;
use quiver::{
    DataType, ErrorKind, Field, MemoryTable, QueryInput, QueryMode, QuiverError, Schema, Value,
    DISTANCE_COLUMN, SCORE_COLUMN,
};
use quiver_search::{QueryPlanner, ResolvedQuery};
use std::sync::Arc;

fn planner(with_embedding: bool) -> QueryPlanner {
    let table = if with_embedding {
        corpus_table_with_embedding()
    } else {
        corpus_table()
    };
    QueryPlanner::new(table)
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_tier4_no_query_is_plain_scan_in_every_mode() {
    for mode in ["vector", "fts", "hybrid", "auto"] {
        let mode: QueryMode = mode.parse().unwrap();
        let resolved = planner(false)
            .resolve(QueryInput::None, mode, None)
            .unwrap();
        assert_eq!(resolved, ResolvedQuery::Empty);
    }
}

#[test]
fn test_tier4_auto_text_depends_on_embedding() {
    let without = planner(false)
        .resolve("apple".into(), QueryMode::Auto, None)
        .unwrap();
    assert_eq!(without.kind(), "fts");

    let with = planner(true)
        .resolve("apple".into(), QueryMode::Auto, None)
        .unwrap();
    match with {
        ResolvedQuery::Vector { column, text, .. } => {
            assert_eq!(column, "vector");
            assert_eq!(text.as_deref(), Some("apple"));
        }
        other => panic!("expected a vector path, got {:?}", other),
    }
}

#[test]
fn test_tier4_auto_pair_is_hybrid() {
    let resolved = planner(false)
        .resolve(
            QueryInput::from((vec![1.0f32, 0.0], "apple")),
            QueryMode::Auto,
            None,
        )
        .unwrap();
    assert_eq!(
        resolved,
        ResolvedQuery::Hybrid {
            vector: vec![1.0, 0.0],
            column: "vector".to_string(),
            text: "apple".to_string(),
        }
    );
}

#[test]
fn test_tier4_hybrid_pair_of_texts_embeds_first() {
    let resolved = planner(true)
        .resolve(
            QueryInput::from(("apple pie", "pie")),
            QueryMode::Hybrid,
            None,
        )
        .unwrap();
    assert_eq!(
        resolved,
        ResolvedQuery::Hybrid {
            vector: vec![1.0, 0.0],
            column: "vector".to_string(),
            text: "pie".to_string(),
        }
    );
}

#[test]
fn test_tier4_fts_rejects_vectors() {
    let err = planner(false)
        .resolve(vec![1.0f32, 0.0].into(), QueryMode::Fts, None)
        .unwrap_err();
    assert!(matches!(err, QuiverError::InvalidQuery { .. }));
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn test_tier4_vector_text_needs_embedding() {
    let err = planner(false)
        .resolve("apple".into(), QueryMode::Vector, None)
        .unwrap_err();
    assert!(matches!(err, QuiverError::NoEmbeddingFunction { .. }));
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(err.to_string().contains("vector"));
}

#[test]
fn test_tier4_unknown_mode() {
    let err = "semantic".parse::<QueryMode>().unwrap_err();
    match err {
        QuiverError::InvalidMode { mode } => assert_eq!(mode, "semantic"),
        other => panic!("unexpected error: {}", other),
    }
}

// ============================================================================
// Through the Builder
// ============================================================================

#[test]
fn test_tier4_auto_dispatch_shapes_output() {
    let s = searcher(&corpus_table_with_embedding());
    let embedded = s.search("apple").limit(3i64).to_table().unwrap();
    assert!(embedded.has_column(DISTANCE_COLUMN));
    assert!(!embedded.has_column(SCORE_COLUMN));

    let text = s
        .search_with("apple", "fts")
        .unwrap()
        .limit(3i64)
        .to_table()
        .unwrap();
    assert!(text.has_column(SCORE_COLUMN));
    assert!(!text.has_column(DISTANCE_COLUMN));
}

#[test]
fn test_tier4_plain_scan() {
    let out = searcher(&corpus_table())
        .search(QueryInput::None)
        .filter("text = 'blue sky' OR id IN (7, 8)", false)
        .select(["id"])
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "id"), vec![3, 7, 8]);
    assert_eq!(out.schema().names(), vec!["id"]);
}

#[test]
fn test_tier4_no_vector_column() {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("text", DataType::Utf8, false),
    ])
    .unwrap();
    let table = MemoryTable::new("plain", schema);
    table
        .add_rows(vec![vec![Value::Int(0), "hello".into()]])
        .unwrap();
    let err = searcher(&Arc::new(table))
        .search(vec![1.0f32, 0.0])
        .to_table()
        .unwrap_err();
    assert!(matches!(err, QuiverError::NoVectorColumn { .. }));
}
