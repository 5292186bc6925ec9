//! Exhaustive nearest-neighbour search
//!
//! Determinism contract:
//! 1. Score every candidate (single-threaded)
//! 2. Sort by (distance asc, row id asc)
//! 3. Truncate to the limit
//!
//! Sufficient for small tables; an ANN index replaces this behind
//! [`VectorIndexScan`](crate::traits::VectorIndexScan).

use super::distance::compute_distance;
use quiver_core::{Limit, Metric};
use std::cmp::Ordering;

/// Nearest candidates to `query`
///
/// `candidates` yields `(row_id, position, vector)`. Returns
/// `(position, distance)` pairs, closest first.
pub fn nearest<'a, I>(candidates: I, query: &[f32], metric: Metric, limit: Limit) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = (u64, usize, &'a [f32])>,
{
    let mut results: Vec<(u64, usize, f32)> = candidates
        .into_iter()
        .map(|(row_id, pos, v)| (row_id, pos, compute_distance(query, v, metric)))
        .collect();

    // Ties break on row id so identical queries give identical results
    results.sort_by(|(id_a, _, d_a), (id_b, _, d_b)| {
        d_a.partial_cmp(d_b)
            .unwrap_or(Ordering::Equal)
            .then_with(|| id_a.cmp(id_b))
    });

    let keep = limit.apply(results.len());
    results.truncate(keep);
    results.into_iter().map(|(_, pos, d)| (pos, d)).collect()
}
