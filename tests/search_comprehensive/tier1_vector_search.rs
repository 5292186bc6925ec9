//! Tier 1: Vector Search
//!
//! Ranking, metrics, filters and batch queries through the builder.

use crate::test_utils::*;
use quiver::{
    DataType, Field, LinearCombinationReranker, MemoryTable, Metric, QuiverError, RecordTable,
    Schema, Value, DISTANCE_COLUMN, QUERY_INDEX_COLUMN, RELEVANCE_SCORE_COLUMN, ROW_ID_COLUMN,
};
use std::sync::Arc;

fn at_degrees(deg: f32) -> Vec<f32> {
    let r = deg.to_radians();
    vec![r.cos(), r.sin()]
}

fn assert_ascending(table: &RecordTable) {
    let d = table.f32_column(DISTANCE_COLUMN).unwrap();
    assert!(d.windows(2).all(|w| w[0] <= w[1]), "not ascending: {:?}", d);
}

// ============================================================================
// End-to-End Scenario
// ============================================================================

/// Cosine search near [0.4, 0.4] with `b < 10` and limit 2
#[test]
fn test_tier1_e2e_cosine_filtered() {
    let out = searcher(&e2e_table())
        .search(vec![0.4f32, 0.4])
        .metric(Metric::Cosine)
        .filter("b < 10", false)
        .limit(2i64)
        .to_table()
        .unwrap();

    assert_eq!(out.num_rows(), 2);
    assert_eq!(ids(&out, "b"), vec![6, 2]);
    assert_ascending(&out);
    let d = out.f32_column(DISTANCE_COLUMN).unwrap();
    assert!(d[0].abs() < 1e-5);
    assert!((d[1] - (1.0 - std::f32::consts::FRAC_1_SQRT_2)).abs() < 1e-5);
}

/// Prefiltering gives the same answer on the scenario
#[test]
fn test_tier1_e2e_prefilter() {
    let out = searcher(&e2e_table())
        .search(vec![0.4f32, 0.4])
        .metric(Metric::Cosine)
        .filter("b < 10", true)
        .limit(2i64)
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "b"), vec![6, 2]);
}

// ============================================================================
// Ranking
// ============================================================================

#[test]
fn test_tier1_l2_ranking() {
    let out = searcher(&corpus_table())
        .search(at_degrees(10.0))
        .limit(4i64)
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "id"), vec![0, 1, 11, 2]);
    assert_ascending(&out);
    assert!(!out.has_column(ROW_ID_COLUMN));
}

#[test]
fn test_tier1_dot_metric() {
    let out = searcher(&corpus_table())
        .search(vec![2.0f32, 0.0])
        .metric(Metric::Dot)
        .limit(1i64)
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "id"), vec![0]);
    let d = out.f32_column(DISTANCE_COLUMN).unwrap();
    assert!((d[0] + 1.0).abs() < 1e-5);
}

#[test]
fn test_tier1_row_ids_are_positions() {
    let out = searcher(&corpus_table())
        .search(at_degrees(10.0))
        .limit(3i64)
        .with_row_id(true)
        .to_table()
        .unwrap();
    assert_eq!(out.u64_column(ROW_ID_COLUMN).unwrap(), vec![0, 1, 11]);
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_tier1_prefilter_and_postfilter_agree() {
    let s = searcher(&corpus_table());
    let run = |prefilter: bool| {
        s.search(at_degrees(10.0))
            .filter("id >= 6", prefilter)
            .limit(3i64)
            .to_table()
            .unwrap()
    };
    let pre = run(true);
    let post = run(false);
    assert_eq!(pre, post);
    assert_eq!(ids(&pre, "id"), vec![11, 10, 9]);
}

#[test]
fn test_tier1_filter_syntax_error() {
    let err = searcher(&corpus_table())
        .search(at_degrees(0.0))
        .filter("id >>= 3", false)
        .to_table()
        .unwrap_err();
    assert!(matches!(err, QuiverError::InvalidFilter { .. }));
}

// ============================================================================
// Batches and Columns
// ============================================================================

#[test]
fn test_tier1_batch_query() {
    let out = searcher(&corpus_table())
        .search(vec![at_degrees(10.0), at_degrees(190.0)])
        .limit(2i64)
        .to_table()
        .unwrap();
    assert_eq!(out.schema().names()[0], QUERY_INDEX_COLUMN);
    assert_eq!(
        out.schema().field(QUERY_INDEX_COLUMN).unwrap().data_type,
        DataType::UInt32
    );
    assert_eq!(out.u64_column(QUERY_INDEX_COLUMN).unwrap(), vec![0, 0, 1, 1]);
    assert_eq!(ids(&out, "id"), vec![0, 1, 6, 7]);
}

#[test]
fn test_tier1_dimension_mismatch() {
    let err = searcher(&corpus_table())
        .search(vec![1.0f32, 0.0, 0.0])
        .to_table()
        .unwrap_err();
    assert!(matches!(
        err,
        QuiverError::DimensionMismatch {
            expected: 2,
            actual: 3,
            ..
        }
    ));
}

#[test]
fn test_tier1_two_vector_columns() {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("image", DataType::Vector(2), false),
        Field::new("caption", DataType::Vector(3), false),
    ])
    .unwrap();
    let table = MemoryTable::new("media", schema);
    table
        .add_rows(vec![
            vec![
                Value::Int(0),
                vec![1.0f32, 0.0].into(),
                vec![0.0f32, 0.0, 1.0].into(),
            ],
            vec![
                Value::Int(1),
                vec![0.0f32, 1.0].into(),
                vec![1.0f32, 0.0, 0.0].into(),
            ],
        ])
        .unwrap();
    let s = searcher(&Arc::new(table));

    let err = s.search(vec![1.0f32, 0.0]).to_table().unwrap_err();
    match err {
        QuiverError::AmbiguousVectorColumn { candidates, .. } => {
            assert_eq!(candidates, vec!["image", "caption"]);
        }
        other => panic!("unexpected error: {}", other),
    }

    let out = s
        .search(vec![1.0f32, 0.0, 0.0])
        .vector_column("caption")
        .limit(1i64)
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "id"), vec![1]);
}

#[test]
fn test_tier1_expression_projection() {
    let out = searcher(&corpus_table())
        .search(at_degrees(10.0))
        .select_expr([("id", "id"), ("double", "id * 2")])
        .limit(2i64)
        .to_table()
        .unwrap();
    assert_eq!(out.schema().names(), vec!["id", "double", DISTANCE_COLUMN]);
    assert_eq!(ids(&out, "double"), vec![0, 2]);
}

#[test]
fn test_tier1_rerank_vector_results() {
    let out = searcher(&corpus_table())
        .search(at_degrees(10.0))
        .rerank(Arc::new(LinearCombinationReranker::default()), None)
        .limit(4i64)
        .to_table()
        .unwrap();
    assert!(out.has_column(RELEVANCE_SCORE_COLUMN));
    assert!(!out.has_column(DISTANCE_COLUMN));
    let r = out.f32_column(RELEVANCE_SCORE_COLUMN).unwrap();
    assert!(r.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(ids(&out, "id")[0], 0);
}
