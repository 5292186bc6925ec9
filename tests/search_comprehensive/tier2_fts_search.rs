//! Tier 2: Full-Text Search
//!
//! Fetch order, empty results, phrase mode and both filter backends.

use crate::test_utils::*;
use quiver::{
    DataType, ErrorKind, JsonLinesScratchStore, LinearCombinationReranker, QuiverError,
    ScratchDatasetFilter, Value, RELEVANCE_SCORE_COLUMN, ROW_ID_COLUMN, SCORE_COLUMN,
};
use quiver_engine::RowFetch;
use quiver_search::phrase_query;
use std::sync::Arc;

// ============================================================================
// Row Fetch
// ============================================================================

/// Rows come back in the requested order, not storage order
#[test]
fn test_tier2_fetch_preserves_order() {
    let table = corpus_table();
    let out = table.fetch_rows(&[7, 2, 9], None).unwrap();
    assert_eq!(ids(&out, "id"), vec![7, 2, 9]);
}

#[test]
fn test_tier2_fetch_unknown_row_id() {
    let err = corpus_table().fetch_rows(&[3, 99], None).unwrap_err();
    assert!(matches!(err, QuiverError::Storage(_)));
    assert_eq!(err.kind(), ErrorKind::External);
}

// ============================================================================
// Ranking
// ============================================================================

#[test]
fn test_tier2_rank_order() {
    let out = searcher(&corpus_table())
        .search_with("red", "fts")
        .unwrap()
        .to_table()
        .unwrap();
    // shorter documents first, ties by row id
    assert_eq!(ids(&out, "id"), vec![4, 9, 0, 2]);
    let scores = out.f32_column(SCORE_COLUMN).unwrap();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(scores[0], scores[1]);
}

#[test]
fn test_tier2_terms_are_ored() {
    let out = searcher(&corpus_table())
        .search_with("wine whale", "fts")
        .unwrap()
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "id"), vec![4, 7]);
}

#[test]
fn test_tier2_limit_applies_to_hits() {
    let out = searcher(&corpus_table())
        .search_with("red", "fts")
        .unwrap()
        .limit(2i64)
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "id"), vec![4, 9]);
}

// ============================================================================
// Phrase Queries
// ============================================================================

#[test]
fn test_tier2_phrase_escaping() {
    assert_eq!(
        phrase_query("The cats OR dogs were not really \"pets\" at all"),
        "\"The cats OR dogs were not really 'pets' at all\""
    );
}

#[test]
fn test_tier2_phrase_mode() {
    let s = searcher(&corpus_table());
    let loose = s
        .search_with("apple red", "fts")
        .unwrap()
        .limit(0i64)
        .to_table()
        .unwrap();
    assert_eq!(loose.num_rows(), 7);

    let phrase = s
        .search_with("red apple", "fts")
        .unwrap()
        .phrase_query(true)
        .to_table()
        .unwrap();
    assert_eq!(ids(&phrase, "id"), vec![0]);

    let reversed = s
        .search_with("apple red", "fts")
        .unwrap()
        .phrase_query(true)
        .to_table()
        .unwrap();
    assert_eq!(reversed.num_rows(), 0);
}

// ============================================================================
// Empty Results and Index State
// ============================================================================

/// No hits is a typed empty table, not an error
#[test]
fn test_tier2_empty_result_has_score_column() {
    let out = searcher(&corpus_table())
        .search_with("zebra", "fts")
        .unwrap()
        .to_table()
        .unwrap();
    assert_eq!(out.num_rows(), 0);
    let field = out.schema().field(SCORE_COLUMN).unwrap();
    assert_eq!(field.data_type, DataType::Float32);
}

#[test]
fn test_tier2_missing_index() {
    let err = searcher(&corpus_table_without_index())
        .search_with("red", "fts")
        .unwrap()
        .to_table()
        .unwrap_err();
    assert!(matches!(err, QuiverError::IndexMissing { .. }));
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn test_tier2_index_exists() {
    let table = corpus_table();
    let err = table.create_fts_index(&["text"], false).unwrap_err();
    assert!(matches!(err, QuiverError::IndexExists { .. }));
    table.create_fts_index(&["text"], true).unwrap();
}

#[test]
fn test_tier2_added_rows_are_searchable() {
    let table = corpus_table();
    table
        .add_rows(vec![vec![
            Value::Int(12),
            "red balloon".into(),
            corpus_vector(12).into(),
        ]])
        .unwrap();
    let out = searcher(&table)
        .search_with("balloon", "fts")
        .unwrap()
        .with_row_id(true)
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "id"), vec![12]);
    assert_eq!(out.u64_column(ROW_ID_COLUMN).unwrap(), vec![12]);
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_tier2_filter_backends_agree() {
    let table = corpus_table();
    let in_process = searcher(&table)
        .search_with("red apple", "fts")
        .unwrap()
        .filter("id > 0 AND text != 'red wine'", false)
        .select(["id", "text"])
        .to_table()
        .unwrap();
    let scratch = searcher(&table)
        .with_filter_eval(Arc::new(ScratchDatasetFilter::new(JsonLinesScratchStore)))
        .search_with("red apple", "fts")
        .unwrap()
        .filter("id > 0 AND text != 'red wine'", false)
        .select(["id", "text"])
        .to_table()
        .unwrap();

    assert_eq!(in_process, scratch);
    assert_eq!(in_process.schema().names(), vec!["id", "text", SCORE_COLUMN]);
    let kept = ids(&in_process, "id");
    assert!(!kept.contains(&0));
    assert!(!kept.contains(&4));
    let scores = in_process.f32_column(SCORE_COLUMN).unwrap();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

/// The limit caps index hits before the filter runs
#[test]
fn test_tier2_filter_after_limit() {
    let out = searcher(&corpus_table())
        .search_with("red", "fts")
        .unwrap()
        .limit(2i64)
        .filter("id < 3", false)
        .to_table()
        .unwrap();
    assert_eq!(out.num_rows(), 0);
}

#[test]
fn test_tier2_rerank_text_results() {
    let out = searcher(&corpus_table())
        .search_with("apple", "fts")
        .unwrap()
        .rerank(Arc::new(LinearCombinationReranker::default()), None)
        .to_table()
        .unwrap();
    assert!(out.has_column(RELEVANCE_SCORE_COLUMN));
    assert!(!out.has_column(SCORE_COLUMN));
    let r = out.f32_column(RELEVANCE_SCORE_COLUMN).unwrap();
    assert!(r.windows(2).all(|w| w[0] >= w[1]));
}
