//! Retrieval query value types
//!
//! This module defines the immutable request handed to a retriever:
//! - RetrievalQuery: one retrieval request (target, filter, limit, tuning)
//! - QueryTarget: what to search for (vector, vector batch, text, nothing)
//! - Limit: row limit with a single "unbounded" form
//! - Metric: vector distance metric
//! - Projection: column list or output-name to expression mapping
//!
//! A `RetrievalQuery` is built with consuming `with_*` methods and is never
//! mutated once a retriever holds it.

use crate::error::{QuiverError, QuiverResult};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Reserved columns
// ============================================================================

/// Vector distance column (float32, lower is closer)
pub const DISTANCE_COLUMN: &str = "_distance";
/// Text relevance column (float32, higher is more relevant)
pub const SCORE_COLUMN: &str = "score";
/// Row identifier column (uint64)
pub const ROW_ID_COLUMN: &str = "_rowid";
/// Fused relevance column written by rerankers (float32, higher is better)
pub const RELEVANCE_SCORE_COLUMN: &str = "_relevance_score";
/// Sub-query index column of batch vector results (uint32)
pub const QUERY_INDEX_COLUMN: &str = "query_index";

// ============================================================================
// Limit
// ============================================================================

/// Row limit
///
/// `None`, `0` and negative values all convert to [`Limit::Unbounded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Limit {
    /// No limit
    #[default]
    Unbounded,
    /// At most this many rows (always > 0)
    Rows(usize),
}

impl Limit {
    /// Limit of `n` rows; `0` is unbounded
    pub fn rows(n: usize) -> Self {
        if n == 0 {
            Limit::Unbounded
        } else {
            Limit::Rows(n)
        }
    }

    /// The row cap, if any
    pub fn get(&self) -> Option<usize> {
        match self {
            Limit::Unbounded => None,
            Limit::Rows(n) => Some(*n),
        }
    }

    /// Whether this is unbounded
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Limit::Unbounded)
    }

    /// Number of rows to keep out of `len`
    pub fn apply(&self, len: usize) -> usize {
        match self {
            Limit::Unbounded => len,
            Limit::Rows(n) => len.min(*n),
        }
    }
}

impl From<i64> for Limit {
    fn from(n: i64) -> Self {
        if n <= 0 {
            Limit::Unbounded
        } else {
            Limit::rows(n as usize)
        }
    }
}

impl From<Option<i64>> for Limit {
    fn from(n: Option<i64>) -> Self {
        n.map(Limit::from).unwrap_or(Limit::Unbounded)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unbounded => write!(f, "unbounded"),
            Limit::Rows(n) => write!(f, "{}", n),
        }
    }
}

// ============================================================================
// Metric
// ============================================================================

/// Vector distance metric
///
/// Every metric is reported as a distance: lower is more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Metric {
    /// Squared Euclidean distance
    #[default]
    L2,
    /// `1 - cosine similarity`
    Cosine,
    /// `1 - dot product`
    Dot,
}

impl Metric {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::L2 => "l2",
            Metric::Cosine => "cosine",
            Metric::Dot => "dot",
        }
    }
}

impl FromStr for Metric {
    type Err = QuiverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(Metric::L2),
            "cosine" => Ok(Metric::Cosine),
            "dot" => Ok(Metric::Dot),
            other => Err(QuiverError::invalid_query(format!(
                "unknown metric '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Projection
// ============================================================================

/// Output column selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Keep these columns, in this order
    Columns(Vec<String>),
    /// Compute `(output name, expression)` pairs, in this order
    Expressions(Vec<(String, String)>),
}

impl Projection {
    /// Column list projection
    pub fn columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Columns(names.into_iter().map(Into::into).collect())
    }

    /// Expression projection
    pub fn expressions<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Projection::Expressions(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Output column names, in order
    pub fn output_names(&self) -> Vec<&str> {
        match self {
            Projection::Columns(names) => names.iter().map(String::as_str).collect(),
            Projection::Expressions(pairs) => pairs.iter().map(|(n, _)| n.as_str()).collect(),
        }
    }
}

// ============================================================================
// RetrievalQuery
// ============================================================================

/// What a retrieval searches for
#[derive(Debug, Clone, PartialEq, Default)]
pub enum QueryTarget {
    /// Plain filtered scan
    #[default]
    None,
    /// One query vector
    Vector(Vec<f32>),
    /// Several query vectors, searched independently
    VectorBatch(Vec<Vec<f32>>),
    /// Full-text query string
    Text(String),
}

/// Default number of index partitions probed
pub const DEFAULT_NPROBES: usize = 20;

/// One retrieval request
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalQuery {
    target: QueryTarget,
    vector_column: Option<String>,
    filter: Option<String>,
    prefilter: bool,
    limit: Limit,
    projection: Option<Projection>,
    metric: Metric,
    nprobes: usize,
    refine_factor: Option<usize>,
    with_row_id: bool,
}

impl Default for RetrievalQuery {
    fn default() -> Self {
        RetrievalQuery {
            target: QueryTarget::None,
            vector_column: None,
            filter: None,
            prefilter: false,
            limit: Limit::Unbounded,
            projection: None,
            metric: Metric::L2,
            nprobes: DEFAULT_NPROBES,
            refine_factor: None,
            with_row_id: false,
        }
    }
}

impl RetrievalQuery {
    /// Query for nearest neighbours of `vector`
    pub fn vector(vector: Vec<f32>) -> Self {
        Self::default().with_target(QueryTarget::Vector(vector))
    }

    /// Query for nearest neighbours of each vector in `vectors`
    pub fn vector_batch(vectors: Vec<Vec<f32>>) -> Self {
        Self::default().with_target(QueryTarget::VectorBatch(vectors))
    }

    /// Full-text query
    pub fn text(text: impl Into<String>) -> Self {
        Self::default().with_target(QueryTarget::Text(text.into()))
    }

    /// Plain filtered scan
    pub fn scan() -> Self {
        Self::default()
    }

    /// Builder: replace the target
    pub fn with_target(mut self, target: QueryTarget) -> Self {
        self.target = target;
        self
    }

    /// Builder: set the vector column
    pub fn with_vector_column(mut self, column: impl Into<String>) -> Self {
        self.vector_column = Some(column.into());
        self
    }

    /// Builder: set the filter predicate and whether it runs before ranking
    pub fn with_filter(mut self, predicate: impl Into<String>, prefilter: bool) -> Self {
        self.filter = Some(predicate.into());
        self.prefilter = prefilter;
        self
    }

    /// Builder: set the row limit
    pub fn with_limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = limit.into();
        self
    }

    /// Builder: set the projection
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Builder: set the metric
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Builder: set the number of probes
    pub fn with_nprobes(mut self, nprobes: usize) -> Self {
        self.nprobes = nprobes;
        self
    }

    /// Builder: set the refine factor
    pub fn with_refine_factor(mut self, refine_factor: Option<usize>) -> Self {
        self.refine_factor = refine_factor;
        self
    }

    /// Builder: include the `_rowid` column
    pub fn with_row_id(mut self, with_row_id: bool) -> Self {
        self.with_row_id = with_row_id;
        self
    }

    /// Search target
    pub fn target(&self) -> &QueryTarget {
        &self.target
    }

    /// Vector column, if named
    pub fn vector_column(&self) -> Option<&str> {
        self.vector_column.as_deref()
    }

    /// Filter predicate
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Whether the filter runs before ranking
    pub fn prefilter(&self) -> bool {
        self.prefilter
    }

    /// Row limit
    pub fn limit(&self) -> Limit {
        self.limit
    }

    /// Projection
    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    /// Distance metric
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Number of probes
    pub fn nprobes(&self) -> usize {
        self.nprobes
    }

    /// Refine factor
    pub fn refine_factor(&self) -> Option<usize> {
        self.refine_factor
    }

    /// Whether `_rowid` is kept in the output
    pub fn includes_row_id(&self) -> bool {
        self.with_row_id
    }

    /// Check the tuning knobs and target shape
    pub fn validate(&self) -> QuiverResult<()> {
        if self.nprobes == 0 {
            return Err(QuiverError::invalid_query("nprobes must be greater than 0"));
        }
        if self.refine_factor == Some(0) {
            return Err(QuiverError::invalid_query(
                "refine_factor must be greater than 0",
            ));
        }
        match &self.target {
            QueryTarget::Vector(v) if v.is_empty() => {
                Err(QuiverError::invalid_query("query vector is empty"))
            }
            QueryTarget::VectorBatch(vs) if vs.is_empty() => {
                Err(QuiverError::invalid_query("query vector batch is empty"))
            }
            QueryTarget::VectorBatch(vs) if vs.iter().any(|v| v.len() != vs[0].len()) => Err(
                QuiverError::invalid_query("query vectors in a batch differ in length"),
            ),
            _ => Ok(()),
        }
    }
}
