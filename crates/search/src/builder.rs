//! Caller-facing query builder
//!
//! A [`Searcher`] binds a table to a config and a worker pool; each call to
//! [`Searcher::search`] returns a [`QueryBuilder`] that collects options and
//! resolves the query only when a terminal method runs.
//!
//! # Example
//!
//! ```ignore
//! use quiver_search::SearchExt;
//!
//! let rows = table
//!     .searcher()?
//!     .search(vec![0.4, 0.4])
//!     .metric(Metric::Cosine)
//!     .filter("b < 10", false)
//!     .limit(2i64)
//!     .to_rows()?;
//! ```

use crate::config::SearchConfig;
use crate::hybrid::HybridExecutor;
use crate::normalize::Normalization;
use crate::planner::{QueryInput, QueryMode, QueryPlanner, ResolvedQuery};
use crate::rerank::Reranker;
use crate::retriever::{EmptyRetriever, Retriever, TextRetriever, VectorRetriever};
use quiver_core::{
    Limit, Metric, Projection, QueryTarget, QuiverError, QuiverResult, RecordTable,
    RetrievalQuery, Row,
};
use quiver_engine::{ExprFilter, FilterEval, TableSource};
use rayon::ThreadPool;
use serde::de::DeserializeOwned;
use std::sync::Arc;

// ============================================================================
// Searcher
// ============================================================================

/// Entry point for searching one table
#[derive(Clone)]
pub struct Searcher {
    table: Arc<dyn TableSource>,
    config: Arc<SearchConfig>,
    pool: Arc<ThreadPool>,
    filter_eval: Arc<dyn FilterEval>,
}

impl Searcher {
    /// Searcher with the default config
    pub fn new(table: Arc<dyn TableSource>) -> QuiverResult<Self> {
        Self::with_config(table, SearchConfig::default())
    }

    /// Searcher with `config`, validated before the pool is built
    pub fn with_config(table: Arc<dyn TableSource>, config: SearchConfig) -> QuiverResult<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("quiver-search-{}", i))
            .build()
            .map_err(|e| QuiverError::invalid_config(format!("cannot build worker pool: {}", e)))?;
        tracing::debug!(
            target: "quiver::engine",
            table = %table.name(),
            workers = config.worker_threads,
            "searcher ready"
        );
        Ok(Searcher {
            table,
            config: Arc::new(config),
            pool: Arc::new(pool),
            filter_eval: Arc::new(ExprFilter::new()),
        })
    }

    /// Builder: filter backend for full-text post-filtering
    pub fn with_filter_eval(mut self, filter_eval: Arc<dyn FilterEval>) -> Self {
        self.filter_eval = filter_eval;
        self
    }

    /// Active config
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Start a query; the mode is picked from the input shape
    pub fn search(&self, query: impl Into<QueryInput>) -> QueryBuilder {
        QueryBuilder::new(self.clone(), query.into(), QueryMode::Auto)
    }

    /// Start a query in an explicit mode (`vector`, `fts`, `hybrid`, `auto`)
    pub fn search_with(
        &self,
        query: impl Into<QueryInput>,
        mode: &str,
    ) -> QuiverResult<QueryBuilder> {
        let mode = mode.parse::<QueryMode>()?;
        Ok(QueryBuilder::new(self.clone(), query.into(), mode))
    }
}

/// Adds `.searcher()` to shared tables
pub trait SearchExt {
    /// Searcher over this table with the default config
    fn searcher(&self) -> QuiverResult<Searcher>;
}

impl<T: TableSource + 'static> SearchExt for Arc<T> {
    fn searcher(&self) -> QuiverResult<Searcher> {
        let table: Arc<dyn TableSource> = self.clone();
        Searcher::new(table)
    }
}

// ============================================================================
// QueryBuilder
// ============================================================================

/// Options for one query
///
/// Options are plain values until a terminal method (`to_table`,
/// `to_rows`, `to_records`) resolves and runs the query.
#[derive(Clone)]
pub struct QueryBuilder {
    searcher: Searcher,
    input: QueryInput,
    mode: QueryMode,
    vector_column: Option<String>,
    base: RetrievalQuery,
    reranker: Option<Arc<dyn Reranker>>,
    rerank_text: Option<String>,
    phrase_query: bool,
    normalization: Normalization,
}

impl QueryBuilder {
    fn new(searcher: Searcher, input: QueryInput, mode: QueryMode) -> Self {
        let config = &searcher.config;
        let base = RetrievalQuery::scan()
            .with_limit(Limit::rows(config.default_limit))
            .with_nprobes(config.nprobes)
            .with_refine_factor(config.refine_factor);
        let normalization = config.hybrid.normalize;
        let vector_column = config.vector_column.clone();
        QueryBuilder {
            searcher,
            input,
            mode,
            vector_column,
            base,
            reranker: None,
            rerank_text: None,
            phrase_query: false,
            normalization,
        }
    }

    /// Maximum rows; `0`, negative values and `None` mean no limit
    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.base = self.base.with_limit(limit);
        self
    }

    /// Output only these columns
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base = self.base.with_projection(Projection::columns(columns));
        self
    }

    /// Output computed columns, `(name, expression)` in order
    pub fn select_expr<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.base = self.base.with_projection(Projection::expressions(pairs));
        self
    }

    /// Keep only rows matching `predicate`; `prefilter` filters before the
    /// vector index search instead of after it
    pub fn filter(mut self, predicate: impl Into<String>, prefilter: bool) -> Self {
        self.base = self.base.with_filter(predicate, prefilter);
        self
    }

    /// Include the `_rowid` column
    pub fn with_row_id(mut self, with_row_id: bool) -> Self {
        self.base = self.base.with_row_id(with_row_id);
        self
    }

    /// Distance metric
    pub fn metric(mut self, metric: Metric) -> Self {
        self.base = self.base.with_metric(metric);
        self
    }

    /// Index partitions to probe
    pub fn nprobes(mut self, nprobes: usize) -> Self {
        self.base = self.base.with_nprobes(nprobes);
        self
    }

    /// Refine factor; `None` disables refinement
    pub fn refine_factor(mut self, refine_factor: Option<usize>) -> Self {
        self.base = self.base.with_refine_factor(refine_factor);
        self
    }

    /// Vector column to search
    pub fn vector_column(mut self, column: impl Into<String>) -> Self {
        self.vector_column = Some(column.into());
        self
    }

    /// Search the text as one exact phrase (full-text paths only)
    pub fn phrase_query(mut self, phrase_query: bool) -> Self {
        self.phrase_query = phrase_query;
        self
    }

    /// Score normalization before hybrid fusion
    pub fn normalize(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Rerank results; `query_text` overrides the string handed to the
    /// reranker
    pub fn rerank(mut self, reranker: Arc<dyn Reranker>, query_text: Option<&str>) -> Self {
        self.reranker = Some(reranker);
        self.rerank_text = query_text.map(str::to_string);
        self
    }

    /// Resolve and run the query
    pub fn to_table(&self) -> QuiverResult<RecordTable> {
        let table = self.searcher.table.clone();
        let planner = QueryPlanner::new(table.clone());
        let resolved = planner.resolve(
            self.input.clone(),
            self.mode,
            self.vector_column.as_deref(),
        )?;
        tracing::debug!(
            target: "quiver::engine",
            table = %table.name(),
            path = resolved.kind(),
            "executing query"
        );

        match resolved {
            ResolvedQuery::Empty => EmptyRetriever::new(table).execute(&self.base),
            ResolvedQuery::Vector {
                target,
                column,
                text,
            } => {
                let query = self
                    .base
                    .clone()
                    .with_target(target)
                    .with_vector_column(column);
                let mut retriever = VectorRetriever::new(table);
                if let Some(reranker) = &self.reranker {
                    let text = self.rerank_text.clone().or(text);
                    retriever = retriever.with_reranker(reranker.clone(), text);
                }
                retriever.execute(&query)
            }
            ResolvedQuery::Fts { text } => {
                let query = self.base.clone().with_target(QueryTarget::Text(text));
                let mut retriever =
                    TextRetriever::new(table, self.searcher.filter_eval.clone())
                        .with_phrase_query(self.phrase_query);
                if let Some(reranker) = &self.reranker {
                    retriever = retriever.with_reranker(reranker.clone());
                }
                retriever.execute(&query)
            }
            ResolvedQuery::Hybrid {
                vector,
                column,
                text,
            } => {
                let reranker = match &self.reranker {
                    Some(r) => r.clone(),
                    None => self.searcher.config.hybrid.reranker()?,
                };
                let rerank_text = self.rerank_text.clone().unwrap_or_else(|| text.clone());
                let base = self.base.clone().with_vector_column(column);
                HybridExecutor::new(
                    table,
                    self.searcher.filter_eval.clone(),
                    self.searcher.pool.clone(),
                )
                .with_reranker(reranker)
                .with_normalization(self.normalization)
                .with_phrase_query(self.phrase_query)
                .execute(&base, vector, &text, &rerank_text)
            }
        }
    }

    /// Run the query and return its rows
    pub fn to_rows(&self) -> QuiverResult<Vec<Row>> {
        Ok(self.to_table()?.rows())
    }

    /// Run the query and deserialize each row into `T`
    ///
    /// Columns without a matching field in `T` are ignored.
    pub fn to_records<T: DeserializeOwned>(&self) -> QuiverResult<Vec<T>> {
        self.to_table()?
            .rows()
            .iter()
            .map(|row| {
                serde_json::from_value(row.to_json())
                    .map_err(|e| QuiverError::Serialization(e.to_string()))
            })
            .collect()
    }
}
