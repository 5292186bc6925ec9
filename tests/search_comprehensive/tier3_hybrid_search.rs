//! Tier 3: Hybrid Search
//!
//! Row-id join, fusion through the built-in rerankers, failure paths.

use crate::test_utils::*;
use quiver::{
    DataType, ErrorKind, ExprFilter, Field, LinearCombinationReranker, Normalization,
    QuiverError, QuiverResult, RecordTable, Reranker, RrfReranker, Schema, Value,
    DISTANCE_COLUMN, RELEVANCE_SCORE_COLUMN, ROW_ID_COLUMN, SCORE_COLUMN,
};
use quiver_core::RetrievalQuery;
use quiver_search::HybridExecutor;
use std::sync::{Arc, Mutex};

fn at_degrees(deg: f32) -> Vec<f32> {
    let r = deg.to_radians();
    vec![r.cos(), r.sin()]
}

fn result_table(score_column: &str, rows: &[(u64, f32)]) -> RecordTable {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new(score_column, DataType::Float32, false),
        Field::new(ROW_ID_COLUMN, DataType::UInt64, false),
    ])
    .unwrap();
    RecordTable::from_rows(
        schema,
        rows.iter()
            .map(|&(id, s)| vec![Value::Int(id as i64), Value::from(s), Value::UInt(id)])
            .collect(),
    )
    .unwrap()
}

/// Keeps the query text it was called with
#[derive(Default)]
struct RecordingReranker {
    queries: Mutex<Vec<String>>,
}

impl Reranker for RecordingReranker {
    fn name(&self) -> &str {
        "recording"
    }

    fn rerank_hybrid(
        &self,
        query: &str,
        vector: RecordTable,
        fts: RecordTable,
    ) -> QuiverResult<RecordTable> {
        self.queries.lock().unwrap().push(query.to_string());
        LinearCombinationReranker::default().rerank_hybrid(query, vector, fts)
    }

    fn rerank_vector(&self, _query: &str, results: RecordTable) -> QuiverResult<RecordTable> {
        Ok(results)
    }

    fn rerank_fts(&self, _query: &str, results: RecordTable) -> QuiverResult<RecordTable> {
        Ok(results)
    }
}

/// Loses the join key
struct KeyDroppingReranker;

impl Reranker for KeyDroppingReranker {
    fn name(&self) -> &str {
        "key-dropping"
    }

    fn rerank_hybrid(
        &self,
        _query: &str,
        vector: RecordTable,
        _fts: RecordTable,
    ) -> QuiverResult<RecordTable> {
        Ok(vector.drop_column(ROW_ID_COLUMN))
    }

    fn rerank_vector(&self, _query: &str, results: RecordTable) -> QuiverResult<RecordTable> {
        Ok(results)
    }

    fn rerank_fts(&self, _query: &str, results: RecordTable) -> QuiverResult<RecordTable> {
        Ok(results)
    }
}

// ============================================================================
// Row-Id Join
// ============================================================================

/// Rows found by one side get `fill` for the other
#[test]
fn test_tier3_join_fills_missing_side() {
    let vector = result_table(DISTANCE_COLUMN, &[(1, 0.0), (2, 0.5), (3, 1.0)]);
    let fts = result_table(SCORE_COLUMN, &[(2, 1.0), (3, 0.5), (4, 0.0)]);
    let fused = LinearCombinationReranker::new(0.5, 1.0)
        .unwrap()
        .rerank_hybrid("", vector, fts)
        .unwrap();

    assert_eq!(fused.u64_column(ROW_ID_COLUMN).unwrap(), vec![2, 1, 3, 4]);
    let r = fused.f32_column(RELEVANCE_SCORE_COLUMN).unwrap();
    for (got, want) in r.iter().zip([0.75f32, 0.5, 0.25, 0.0]) {
        assert!((got - want).abs() < 1e-6, "{} != {}", got, want);
    }
    assert!(!fused.has_column(DISTANCE_COLUMN));
    assert!(!fused.has_column(SCORE_COLUMN));
}

// ============================================================================
// Fusion
// ============================================================================

#[test]
fn test_tier3_default_fusion() {
    let out = searcher(&corpus_table())
        .search((at_degrees(30.0), "green"))
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "id")[0], 1);
    assert!(ids(&out, "id").contains(&8));
    let r = out.f32_column(RELEVANCE_SCORE_COLUMN).unwrap();
    assert!((r[0] - 1.0).abs() < 1e-6);
    assert!(r.windows(2).all(|w| w[0] >= w[1]));
    assert!(!out.has_column(ROW_ID_COLUMN));
}

#[test]
fn test_tier3_row_id_on_request() {
    let out = searcher(&corpus_table())
        .search((at_degrees(30.0), "green"))
        .with_row_id(true)
        .to_table()
        .unwrap();
    assert_eq!(out.u64_column(ROW_ID_COLUMN).unwrap()[0], 1);
}

#[test]
fn test_tier3_rrf_fusion() {
    let out = searcher(&corpus_table())
        .search((at_degrees(30.0), "green"))
        .rerank(Arc::new(RrfReranker::default()), None)
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "id")[0], 1);
}

#[test]
fn test_tier3_rank_normalization() {
    let out = searcher(&corpus_table())
        .search((at_degrees(30.0), "green"))
        .normalize(Normalization::Rank)
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "id")[0], 1);
}

#[test]
fn test_tier3_limit_truncates_fused() {
    let out = searcher(&corpus_table())
        .search((at_degrees(30.0), "apple red"))
        .limit(3i64)
        .to_table()
        .unwrap();
    assert_eq!(out.num_rows(), 3);
}

/// Each side is limited before fusion, so the union can fall short
#[test]
fn test_tier3_fused_result_can_be_short() {
    let out = searcher(&corpus_table())
        .search((at_degrees(30.0), "whale"))
        .filter("id = 7", false)
        .limit(5i64)
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "id"), vec![7]);
}

#[test]
fn test_tier3_text_only_query_is_embedded() {
    let out = searcher(&corpus_table_with_embedding())
        .search_with("apple", "hybrid")
        .unwrap()
        .to_table()
        .unwrap();
    // embedded at 0 degrees; the short apple documents at 30 degrees win
    // over row 0, whose longer text scores lowest among the text hits
    let ranked = ids(&out, "id");
    let mut top = ranked[..2].to_vec();
    top.sort();
    assert_eq!(top, vec![1, 11]);
    assert_eq!(ranked[2], 0);
}

#[test]
fn test_tier3_rerank_text_override() {
    let reranker = Arc::new(RecordingReranker::default());
    let s = searcher(&corpus_table());
    s.search((at_degrees(30.0), "green"))
        .rerank(reranker.clone(), None)
        .to_table()
        .unwrap();
    s.search((at_degrees(30.0), "green"))
        .rerank(reranker.clone(), Some("green tea"))
        .to_table()
        .unwrap();
    assert_eq!(
        *reranker.queries.lock().unwrap(),
        vec!["green".to_string(), "green tea".to_string()]
    );
}

#[test]
fn test_tier3_repeatable() {
    let table = corpus_table();
    let pool = Arc::new(rayon_pool());
    let executor = HybridExecutor::new(table, Arc::new(ExprFilter::new()), pool);
    let base = RetrievalQuery::scan().with_limit(6i64).with_row_id(true);
    let first = executor
        .execute(&base, at_degrees(45.0), "red apple car", "red apple car")
        .unwrap();
    for _ in 0..5 {
        let again = executor
            .execute(&base, at_degrees(45.0), "red apple car", "red apple car")
            .unwrap();
        assert_eq!(first, again);
    }
}

fn rayon_pool() -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new()
        .num_threads(2)
        .build()
        .unwrap()
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_tier3_requires_fts_index() {
    let err = searcher(&corpus_table_without_index())
        .search((at_degrees(0.0), "apple"))
        .to_table()
        .unwrap_err();
    assert!(matches!(err, QuiverError::IndexMissing { .. }));
}

/// No text hits is not an error; the vector side alone decides the order
#[test]
fn test_tier3_text_side_without_hits() {
    let out = searcher(&corpus_table())
        .search((at_degrees(0.0), "zebra"))
        .limit(3i64)
        .with_row_id(true)
        .to_table()
        .unwrap();
    assert_eq!(out.num_rows(), 3);
    assert_eq!(ids(&out, "id")[0], 0);
    let mut rest = ids(&out, "id")[1..].to_vec();
    rest.sort_unstable();
    assert_eq!(rest, vec![1, 11]);
    assert!(out.has_column(ROW_ID_COLUMN));
    let relevance = out.f32_column(RELEVANCE_SCORE_COLUMN).unwrap();
    assert!(relevance.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_tier3_malformed_pairs() {
    let s = searcher(&corpus_table());
    for input in [
        quiver::QueryInput::from(("apple", at_degrees(0.0))),
        quiver::QueryInput::from((at_degrees(0.0), at_degrees(0.0))),
    ] {
        let err = s
            .search_with(input, "hybrid")
            .unwrap()
            .to_table()
            .unwrap_err();
        assert!(matches!(err, QuiverError::InvalidHybridPair { .. }));
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    // auto mode never embeds the first element, even when it could
    let err = searcher(&corpus_table_with_embedding())
        .search(("apple", "apple"))
        .to_table()
        .unwrap_err();
    assert!(matches!(err, QuiverError::InvalidHybridPair { .. }));
}

#[test]
fn test_tier3_text_without_embedding() {
    let err = searcher(&corpus_table())
        .search_with("apple", "hybrid")
        .unwrap()
        .to_table()
        .unwrap_err();
    match err {
        QuiverError::NoEmbeddingFunction { column } => assert_eq!(column, "vector"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_tier3_reranker_must_keep_row_id() {
    let err = searcher(&corpus_table())
        .search((at_degrees(30.0), "green"))
        .rerank(Arc::new(KeyDroppingReranker), None)
        .to_table()
        .unwrap_err();
    assert!(matches!(err, QuiverError::RerankerBadReturnType { .. }));
    assert_eq!(err.kind(), ErrorKind::Contract);
}
