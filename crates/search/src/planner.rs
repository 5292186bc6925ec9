//! Query planning
//!
//! Turns a raw query input and a requested mode into one concrete
//! retrieval path:
//!
//! | Input | `vector` | `fts` | `hybrid` | `auto` |
//! |-------|----------|-------|----------|--------|
//! | none | Empty | Empty | Empty | Empty |
//! | vector / batch | Vector | error | error | Vector |
//! | text | Vector (embedded) | Fts | Hybrid (embedded) | Vector if an embedding function is bound, else Fts |
//! | (vector-like, text) | error | error | Hybrid | Hybrid |
//!
//! Embedding happens here, at most once per resolution, before any
//! retrieval starts.

use quiver_core::{QueryTarget, QuiverError, QuiverResult, Schema};
use quiver_engine::TableSource;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// QueryInput
// ============================================================================

/// Raw query as given by the caller
#[derive(Debug, Clone, PartialEq, Default)]
pub enum QueryInput {
    /// No query; a plain filtered scan
    #[default]
    None,
    /// One query vector
    Vector(Vec<f32>),
    /// Several query vectors
    VectorBatch(Vec<Vec<f32>>),
    /// Query string
    Text(String),
    /// Two-element query, used for hybrid search
    Pair(Box<QueryInput>, Box<QueryInput>),
}

impl QueryInput {
    /// Short description for errors and logging
    pub fn describe(&self) -> &'static str {
        match self {
            QueryInput::None => "no query",
            QueryInput::Vector(_) => "a vector",
            QueryInput::VectorBatch(_) => "a batch of vectors",
            QueryInput::Text(_) => "a string",
            QueryInput::Pair(..) => "a pair",
        }
    }

    fn text(&self) -> Option<&str> {
        match self {
            QueryInput::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl From<Vec<f32>> for QueryInput {
    fn from(v: Vec<f32>) -> Self {
        QueryInput::Vector(v)
    }
}

impl From<&[f32]> for QueryInput {
    fn from(v: &[f32]) -> Self {
        QueryInput::Vector(v.to_vec())
    }
}

impl<const N: usize> From<[f32; N]> for QueryInput {
    fn from(v: [f32; N]) -> Self {
        QueryInput::Vector(v.to_vec())
    }
}

impl From<Vec<Vec<f32>>> for QueryInput {
    fn from(v: Vec<Vec<f32>>) -> Self {
        QueryInput::VectorBatch(v)
    }
}

impl From<&str> for QueryInput {
    fn from(s: &str) -> Self {
        QueryInput::Text(s.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(s: String) -> Self {
        QueryInput::Text(s)
    }
}

impl<A: Into<QueryInput>, B: Into<QueryInput>> From<(A, B)> for QueryInput {
    fn from((a, b): (A, B)) -> Self {
        QueryInput::Pair(Box::new(a.into()), Box::new(b.into()))
    }
}

impl<T: Into<QueryInput>> From<Option<T>> for QueryInput {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(QueryInput::None)
    }
}

// ============================================================================
// QueryMode
// ============================================================================

/// Requested search mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// Nearest-neighbour search
    Vector,
    /// Full-text search
    Fts,
    /// Vector and full-text search fused by a reranker
    Hybrid,
    /// Pick from the input shape
    #[default]
    Auto,
}

impl QueryMode {
    /// Mode string
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Vector => "vector",
            QueryMode::Fts => "fts",
            QueryMode::Hybrid => "hybrid",
            QueryMode::Auto => "auto",
        }
    }
}

impl FromStr for QueryMode {
    type Err = QuiverError;

    fn from_str(s: &str) -> QuiverResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vector" => Ok(QueryMode::Vector),
            "fts" => Ok(QueryMode::Fts),
            "hybrid" => Ok(QueryMode::Hybrid),
            "auto" => Ok(QueryMode::Auto),
            _ => Err(QuiverError::InvalidMode {
                mode: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ResolvedQuery
// ============================================================================

/// One concrete retrieval path
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedQuery {
    /// Plain filtered scan
    Empty,
    /// Nearest-neighbour search
    Vector {
        /// `QueryTarget::Vector` or `QueryTarget::VectorBatch`
        target: QueryTarget,
        /// Vector column searched
        column: String,
        /// Query string the vector was embedded from, if any
        text: Option<String>,
    },
    /// Full-text search
    Fts {
        /// Query string
        text: String,
    },
    /// Vector and full-text search over the same query
    Hybrid {
        /// Query vector
        vector: Vec<f32>,
        /// Vector column searched
        column: String,
        /// Query string for the text side
        text: String,
    },
}

impl ResolvedQuery {
    /// Path name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ResolvedQuery::Empty => "empty",
            ResolvedQuery::Vector { .. } => "vector",
            ResolvedQuery::Fts { .. } => "fts",
            ResolvedQuery::Hybrid { .. } => "hybrid",
        }
    }
}

/// The single vector column of `schema`
pub fn infer_vector_column(schema: &Schema, table: &str) -> QuiverResult<String> {
    let candidates = schema.vector_columns();
    match candidates.as_slice() {
        [only] => Ok(only.name.clone()),
        [] => Err(QuiverError::NoVectorColumn {
            table: table.to_string(),
        }),
        _ => Err(QuiverError::AmbiguousVectorColumn {
            table: table.to_string(),
            candidates: candidates.iter().map(|f| f.name.clone()).collect(),
        }),
    }
}

// ============================================================================
// QueryPlanner
// ============================================================================

/// Resolves raw queries against one table
#[derive(Clone)]
pub struct QueryPlanner {
    table: Arc<dyn TableSource>,
}

impl QueryPlanner {
    /// Planner for `table`
    pub fn new(table: Arc<dyn TableSource>) -> Self {
        QueryPlanner { table }
    }

    /// Resolve `input` under `mode`
    ///
    /// `vector_column` names the column to search; when `None` the table's
    /// single vector column is used.
    pub fn resolve(
        &self,
        input: QueryInput,
        mode: QueryMode,
        vector_column: Option<&str>,
    ) -> QuiverResult<ResolvedQuery> {
        let resolved = match (mode, input) {
            (_, QueryInput::None) => ResolvedQuery::Empty,
            (QueryMode::Fts, QueryInput::Text(text)) => ResolvedQuery::Fts { text },
            (QueryMode::Fts, other) => {
                return Err(QuiverError::invalid_query(format!(
                    "full-text search needs a string query, got {}",
                    other.describe()
                )))
            }
            (QueryMode::Vector, QueryInput::Pair(..)) => {
                return Err(QuiverError::invalid_query(
                    "vector search takes a vector or a string; use hybrid mode for pairs",
                ))
            }
            (QueryMode::Vector, input) => self.resolve_vector(input, vector_column)?,
            (QueryMode::Hybrid, input) => self.resolve_hybrid(input, vector_column)?,
            // only explicit hybrid mode embeds a textual first element
            (QueryMode::Auto, QueryInput::Pair(a, b)) => match *a {
                QueryInput::Vector(_) => {
                    self.resolve_hybrid(QueryInput::Pair(a, b), vector_column)?
                }
                other => {
                    return Err(QuiverError::invalid_hybrid_pair(format!(
                        "first element must be a vector in auto mode, got {}",
                        other.describe()
                    )))
                }
            },
            (QueryMode::Auto, QueryInput::Text(text)) => self.resolve_auto_text(text, vector_column)?,
            (QueryMode::Auto, input) => self.resolve_vector(input, vector_column)?,
        };

        tracing::debug!(
            target: "quiver::planner",
            table = %self.table.name(),
            mode = %mode,
            resolved = resolved.kind(),
            "resolved query"
        );
        Ok(resolved)
    }

    fn column(&self, vector_column: Option<&str>) -> QuiverResult<String> {
        match vector_column {
            Some(c) => Ok(c.to_string()),
            None => infer_vector_column(&self.table.schema(), self.table.name()),
        }
    }

    fn embed(&self, column: &str, text: &str) -> QuiverResult<Vec<f32>> {
        let function = self
            .table
            .embedding_function_for(column)
            .ok_or_else(|| QuiverError::NoEmbeddingFunction {
                column: column.to_string(),
            })?;
        tracing::debug!(
            target: "quiver::planner",
            column = %column,
            function = %function.name(),
            "embedding query text"
        );
        function.embed_query(text)
    }

    fn resolve_vector(
        &self,
        input: QueryInput,
        vector_column: Option<&str>,
    ) -> QuiverResult<ResolvedQuery> {
        let column = self.column(vector_column)?;
        let (target, text) = match input {
            QueryInput::Vector(v) => (QueryTarget::Vector(v), None),
            QueryInput::VectorBatch(vs) => (QueryTarget::VectorBatch(vs), None),
            QueryInput::Text(text) => (QueryTarget::Vector(self.embed(&column, &text)?), Some(text)),
            other => {
                return Err(QuiverError::invalid_query(format!(
                    "vector search cannot use {}",
                    other.describe()
                )))
            }
        };
        Ok(ResolvedQuery::Vector {
            target,
            column,
            text,
        })
    }

    fn resolve_auto_text(
        &self,
        text: String,
        vector_column: Option<&str>,
    ) -> QuiverResult<ResolvedQuery> {
        let column = match vector_column {
            Some(c) => Some(c.to_string()),
            None => infer_vector_column(&self.table.schema(), self.table.name()).ok(),
        };
        let bound = column
            .as_deref()
            .and_then(|c| self.table.embedding_function_for(c).map(|f| (c, f)));
        match bound {
            Some((column, function)) => Ok(ResolvedQuery::Vector {
                target: QueryTarget::Vector(function.embed_query(&text)?),
                column: column.to_string(),
                text: Some(text),
            }),
            None => Ok(ResolvedQuery::Fts { text }),
        }
    }

    fn resolve_hybrid(
        &self,
        input: QueryInput,
        vector_column: Option<&str>,
    ) -> QuiverResult<ResolvedQuery> {
        let column = self.column(vector_column)?;
        match input {
            QueryInput::Text(text) => Ok(ResolvedQuery::Hybrid {
                vector: self.embed(&column, &text)?,
                column,
                text,
            }),
            QueryInput::Pair(first, second) => {
                let text = second.text().map(str::to_string).ok_or_else(|| {
                    QuiverError::invalid_hybrid_pair(format!(
                        "second element must be a string, got {}",
                        second.describe()
                    ))
                })?;
                let vector = match *first {
                    QueryInput::Vector(v) => v,
                    QueryInput::Text(s) => self.embed(&column, &s)?,
                    other => {
                        return Err(QuiverError::invalid_hybrid_pair(format!(
                            "first element must be a vector or a string, got {}",
                            other.describe()
                        )))
                    }
                };
                Ok(ResolvedQuery::Hybrid {
                    vector,
                    column,
                    text,
                })
            }
            other => Err(QuiverError::invalid_hybrid_pair(format!(
                "hybrid search needs a string or a (vector, string) pair, got {}",
                other.describe()
            ))),
        }
    }
}
