//! Score normalization
//!
//! Distances and relevance scores live on unrelated scales. Before fusion
//! both columns are mapped into `[0, 1]`, either directly (min-max) or
//! through their ranks first.

use quiver_core::{QuiverError, QuiverResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ABS_TOLERANCE: f64 = 1e-8;
const REL_TOLERANCE: f64 = 1e-5;

/// How score columns are brought onto a common scale before fusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Min-max normalize the raw values
    #[default]
    Score,
    /// Replace values by their ascending rank, then min-max normalize
    Rank,
}

impl Normalization {
    /// Config string for this policy
    pub fn as_str(&self) -> &'static str {
        match self {
            Normalization::Score => "score",
            Normalization::Rank => "rank",
        }
    }

    /// Apply the policy to one column; lower input stays lower
    pub fn apply(&self, scores: &[f32]) -> Vec<f32> {
        match self {
            Normalization::Score => normalize_scores(scores, false),
            Normalization::Rank => normalize_scores(&rank_scores(scores, true), false),
        }
    }
}

impl FromStr for Normalization {
    type Err = QuiverError;

    fn from_str(s: &str) -> QuiverResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "score" => Ok(Normalization::Score),
            "rank" => Ok(Normalization::Rank),
            other => Err(QuiverError::invalid_config(format!(
                "unknown normalization '{}': expected 'score' or 'rank'",
                other
            ))),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= ABS_TOLERANCE + REL_TOLERANCE * b.abs()
}

/// Min-max normalize `scores` into `[0, 1]`
///
/// When every value is (nearly) equal the range is unusable, so each value
/// is divided by the maximum instead; an all-zero column stays all zero.
/// With `invert` the result is flipped to `1 - x`.
pub fn normalize_scores(scores: &[f32], invert: bool) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let (min, max) = scores.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
        (lo.min(s as f64), hi.max(s as f64))
    });

    let normalized = scores.iter().map(|&s| {
        let s = s as f64;
        if is_close(min, max) {
            if max == 0.0 {
                0.0
            } else {
                s / max
            }
        } else {
            (s - min) / (max - min)
        }
    });

    if invert {
        normalized.map(|x| (1.0 - x) as f32).collect()
    } else {
        normalized.map(|x| x as f32).collect()
    }
}

/// 1-based rank of each score
///
/// Ties keep input order: the earlier of two equal scores ranks first.
pub fn rank_scores(scores: &[f32], ascending: bool) -> Vec<f32> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        let ord = scores[a].total_cmp(&scores[b]);
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
    let mut ranks = vec![0.0; scores.len()];
    for (rank, &i) in order.iter().enumerate() {
        ranks[i] = (rank + 1) as f32;
    }
    ranks
}
