//! Search configuration via `quiver.toml`
//!
//! Every key is optional; a missing key takes its default. Values are
//! validated as soon as a config is loaded.

use crate::normalize::Normalization;
use crate::rerank::{LinearCombinationReranker, Reranker, RrfReranker};
use quiver_core::{QuiverError, QuiverResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "quiver.toml";

fn default_worker_threads() -> usize {
    2
}

fn default_limit() -> usize {
    10
}

fn default_nprobes() -> usize {
    quiver_core::DEFAULT_NPROBES
}

fn default_weight() -> f32 {
    0.7
}

fn default_fill() -> f32 {
    1.0
}

fn default_rrf_k() -> u32 {
    60
}

/// Reranker a hybrid query uses when none is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fusion {
    /// [`LinearCombinationReranker`] from `weight` and `fill`
    #[default]
    Linear,
    /// [`RrfReranker`] from `rrf_k`
    Rrf,
}

/// Fusion settings for hybrid search, the `[hybrid]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridConfig {
    /// Default reranker
    #[serde(default)]
    pub fusion: Fusion,
    /// Vector share of the default linear-combination reranker
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Distance substituted for a side that did not return a row
    #[serde(default = "default_fill")]
    pub fill: f32,
    /// How both score columns are normalized before fusion
    #[serde(default)]
    pub normalize: Normalization,
    /// Smoothing constant for RRF fusion
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        HybridConfig {
            fusion: Fusion::default(),
            weight: default_weight(),
            fill: default_fill(),
            normalize: Normalization::default(),
            rrf_k: default_rrf_k(),
        }
    }
}

impl HybridConfig {
    /// Build the reranker selected by `fusion`
    pub fn reranker(&self) -> QuiverResult<Arc<dyn Reranker>> {
        let reranker: Arc<dyn Reranker> = match self.fusion {
            Fusion::Linear => Arc::new(LinearCombinationReranker::new(self.weight, self.fill)?),
            Fusion::Rrf => Arc::new(RrfReranker::new(self.rrf_k)?),
        };
        Ok(reranker)
    }
}

/// Search configuration loaded from `quiver.toml`
///
/// # Example
///
/// ```toml
/// worker_threads = 4
/// default_limit = 20
///
/// [hybrid]
/// weight = 0.5
/// normalize = "rank"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Size of the hybrid worker pool, at least 2
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Row limit used until a query sets one; 0 means unbounded
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Default number of index partitions probed
    #[serde(default = "default_nprobes")]
    pub nprobes: usize,
    /// Default refine factor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refine_factor: Option<usize>,
    /// Default vector column; inferred from the schema when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_column: Option<String>,
    /// Hybrid fusion settings
    #[serde(default)]
    pub hybrid: HybridConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            worker_threads: default_worker_threads(),
            default_limit: default_limit(),
            nprobes: default_nprobes(),
            refine_factor: None,
            vector_column: None,
            hybrid: HybridConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Check every value
    pub fn validate(&self) -> QuiverResult<()> {
        if self.worker_threads < 2 {
            return Err(QuiverError::invalid_config(format!(
                "worker_threads must be at least 2, got {}",
                self.worker_threads
            )));
        }
        if self.nprobes == 0 {
            return Err(QuiverError::invalid_config("nprobes must be greater than 0"));
        }
        if self.refine_factor == Some(0) {
            return Err(QuiverError::invalid_config(
                "refine_factor must be greater than 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.hybrid.weight) {
            return Err(QuiverError::invalid_config(format!(
                "hybrid.weight must be in [0, 1], got {}",
                self.hybrid.weight
            )));
        }
        if !self.hybrid.fill.is_finite() {
            return Err(QuiverError::invalid_config("hybrid.fill must be finite"));
        }
        if self.hybrid.rrf_k == 0 {
            return Err(QuiverError::invalid_config(
                "hybrid.rrf_k must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> QuiverResult<Self> {
        let config: SearchConfig = toml::from_str(content)
            .map_err(|e| QuiverError::invalid_config(format!("cannot parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn from_file(path: &Path) -> QuiverResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            QuiverError::InvalidConfig { reason } => {
                QuiverError::invalid_config(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// Default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# quiver search configuration

# Threads in the hybrid search pool (minimum 2)
worker_threads = 2

# Rows returned when a query sets no limit (0 = unbounded)
default_limit = 10

# Vector index tuning
nprobes = 20
# refine_factor = 10

# Vector column to search; inferred when the table has exactly one
# vector_column = "vector"

[hybrid]
# Default reranker: "linear" or "rrf"
fusion = "linear"
# Vector share of the default linear-combination reranker
weight = 0.7
# Distance used when only one side returned a row
fill = 1.0
# "score" (min-max) or "rank" (rank, then min-max)
normalize = "score"
# RRF smoothing constant
rrf_k = 60
"#
    }

    /// Write the default config file if it does not already exist
    pub fn write_default_if_missing(path: &Path) -> QuiverResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to `path`
    pub fn write_to_file(&self, path: &Path) -> QuiverResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| QuiverError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
