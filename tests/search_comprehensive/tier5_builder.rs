//! Tier 5: Builder Surface
//!
//! Limits, projections, terminal consumers and file-based configuration.

use crate::test_utils::*;
use quiver::{
    ErrorKind, Fusion, Limit, Normalization, QueryInput, QuiverError, RrfReranker, SearchConfig,
    Searcher, Value, DISTANCE_COLUMN, RELEVANCE_SCORE_COLUMN,
};
use serde::Deserialize;
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Limits
// ============================================================================

/// 0, negative and absent limits all mean "no limit"
#[test]
fn test_tier5_unbounded_limits() {
    let s = searcher(&corpus_table());
    for limit in [Limit::from(0i64), Limit::from(-5i64), Limit::from(None::<i64>)] {
        assert_eq!(limit, Limit::Unbounded);
        let out = s
            .search(vec![1.0f32, 0.0])
            .limit(limit)
            .to_table()
            .unwrap();
        assert_eq!(out.num_rows(), 12);
    }
}

#[test]
fn test_tier5_limit_keeps_rank_prefix() {
    let s = searcher(&corpus_table());
    let all = s.search(QueryInput::None).limit(0i64).to_table().unwrap();
    assert_eq!(all.num_rows(), 12);
    let three = s.search(QueryInput::None).limit(3i64).to_table().unwrap();
    assert_eq!(three, all.slice(0, 3));

    let ranked = s.search(vec![1.0f32, 0.0]).limit(0i64).to_table().unwrap();
    let top = s.search(vec![1.0f32, 0.0]).limit(3i64).to_table().unwrap();
    assert_eq!(top, ranked.slice(0, 3));
}

#[test]
fn test_tier5_default_limit() {
    let out = searcher(&corpus_table())
        .search(vec![1.0f32, 0.0])
        .to_table()
        .unwrap();
    assert_eq!(out.num_rows(), 10);
}

// ============================================================================
// Terminal Consumers
// ============================================================================

#[test]
fn test_tier5_to_rows() {
    let rows = searcher(&corpus_table())
        .search(vec![1.0f32, 0.0])
        .select(["id", "text"])
        .limit(2i64)
        .to_rows()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("id"), Some(&Value::Int(0)));
    assert_eq!(rows[0].get("text"), Some(&Value::String("red apple pie".into())));
    assert!(rows[0].get(DISTANCE_COLUMN).is_some());
}

#[derive(Debug, Deserialize, PartialEq)]
struct Hit {
    id: i64,
    text: String,
    #[serde(rename = "_distance")]
    distance: f32,
}

#[test]
fn test_tier5_typed_records() {
    let hits: Vec<Hit> = searcher(&corpus_table())
        .search(vec![1.0f32, 0.0])
        .limit(1i64)
        .to_records()
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 0);
    assert_eq!(hits[0].text, "red apple pie");
    assert!(hits[0].distance.abs() < 1e-6);
}

#[test]
fn test_tier5_typed_records_mismatch() {
    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Missing {
        title: String,
    }
    let err = searcher(&corpus_table())
        .search(vec![1.0f32, 0.0])
        .limit(1i64)
        .to_records::<Missing>()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::External);
}

#[test]
fn test_tier5_missing_column_in_select() {
    let err = searcher(&corpus_table())
        .search(vec![1.0f32, 0.0])
        .select(["nope"])
        .to_table()
        .unwrap_err();
    assert!(matches!(err, QuiverError::ColumnNotFound { .. }));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_tier5_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(quiver_search::CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "worker_threads = 3\ndefault_limit = 4\n\n[hybrid]\nweight = 0.2\nnormalize = \"rank\"\n",
    )
    .unwrap();

    let config = SearchConfig::from_file(&path).unwrap();
    assert_eq!(config.hybrid.normalize, Normalization::Rank);
    let s = Searcher::with_config(corpus_table(), config).unwrap();
    assert_eq!(s.config().worker_threads, 3);
    assert_eq!(s.search(vec![1.0f32, 0.0]).to_table().unwrap().num_rows(), 4);
    let fused = s
        .search((vec![1.0f32, 0.0], "apple"))
        .to_table()
        .unwrap();
    assert!(fused.num_rows() <= 4);
}

#[test]
fn test_tier5_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(quiver_search::CONFIG_FILE_NAME);
    std::fs::write(&path, "[hybrid]\nweight = 2.0\n").unwrap();
    let err = SearchConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, QuiverError::InvalidConfig { .. }));
    assert!(err.to_string().contains("quiver.toml"));
}

#[test]
fn test_tier5_config_vector_column() {
    let mut config = SearchConfig::default();
    config.vector_column = Some("missing".to_string());
    let s = Searcher::with_config(corpus_table(), config).unwrap();
    let err = s.search(vec![1.0f32, 0.0]).to_table().unwrap_err();
    assert!(matches!(err, QuiverError::ColumnNotFound { .. }));

    let out = s
        .search(vec![1.0f32, 0.0])
        .vector_column("vector")
        .limit(1i64)
        .to_table()
        .unwrap();
    assert_eq!(ids(&out, "id"), vec![0]);
}

/// `[hybrid] fusion = "rrf"` fuses with the configured `rrf_k`
#[test]
fn test_tier5_config_rrf_fusion() {
    let table = corpus_table();
    let rrf_searcher = |k: u32| {
        let mut config = SearchConfig::default();
        config.hybrid.fusion = Fusion::Rrf;
        config.hybrid.rrf_k = k;
        Searcher::with_config(table.clone(), config).unwrap()
    };
    let query = (vec![1.0f32, 0.0], "red apple");

    let configured = rrf_searcher(5).search(query.clone()).to_table().unwrap();
    let attached = searcher(&table)
        .search(query.clone())
        .rerank(Arc::new(RrfReranker::new(5).unwrap()), None)
        .to_table()
        .unwrap();
    assert_eq!(configured, attached);

    let default_k = rrf_searcher(60).search(query).to_table().unwrap();
    let top_5 = configured.f32_column(RELEVANCE_SCORE_COLUMN).unwrap()[0];
    let top_60 = default_k.f32_column(RELEVANCE_SCORE_COLUMN).unwrap()[0];
    assert!(top_5 > 2.0 / 61.0, "k=5 top score {}", top_5);
    assert!(top_60 <= 2.0 / 61.0 + 1e-6, "k=60 top score {}", top_60);
}

#[test]
fn test_tier5_searcher_is_shareable() {
    let s = Arc::new(searcher(&corpus_table()));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let s = Arc::clone(&s);
            std::thread::spawn(move || {
                s.search((vec![1.0f32, 0.0], "red"))
                    .limit(i as i64 + 1)
                    .to_table()
                    .unwrap()
                    .num_rows()
            })
        })
        .collect();
    for (i, h) in handles.into_iter().enumerate() {
        assert_eq!(h.join().unwrap(), i + 1);
    }
}
