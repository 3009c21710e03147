//! Cosine scoring and top-k selection.
//!
//! Scores are cosine *distances* (`1 - similarity`), so lower means more relevant. A zero-norm
//! vector on either side, or mismatched lengths, scores the maximal distance `1.0` rather than
//! producing NaN.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;

use crate::arena::SlotIndex;

/// Distance reported when similarity is undefined.
pub const MAX_DISTANCE: f32 = 1.0;

/// A candidate slot with its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredSlot {
    pub slot: SlotIndex,
    pub distance: f32,
}

/// Returns `(dot(a, b), |a|², |b|²)`, four lanes per iteration.
#[inline]
pub fn dot_and_norms_sq(a: &[f32], b: &[f32]) -> (f32, f32, f32) {
    debug_assert_eq!(a.len(), b.len());
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    let mut dot = [0.0f32; 4];
    let mut na = [0.0f32; 4];
    let mut nb = [0.0f32; 4];

    let a_chunks = a.chunks_exact(4);
    let b_chunks = b.chunks_exact(4);
    let a_tail = a_chunks.remainder();
    let b_tail = b_chunks.remainder();

    for (ca, cb) in a_chunks.zip(b_chunks) {
        for lane in 0..4 {
            dot[lane] += ca[lane] * cb[lane];
            na[lane] += ca[lane] * ca[lane];
            nb[lane] += cb[lane] * cb[lane];
        }
    }

    let mut dot_sum = dot.iter().sum::<f32>();
    let mut na_sum = na.iter().sum::<f32>();
    let mut nb_sum = nb.iter().sum::<f32>();
    for (&x, &y) in a_tail.iter().zip(b_tail) {
        dot_sum += x * y;
        na_sum += x * x;
        nb_sum += y * y;
    }

    (dot_sum, na_sum, nb_sum)
}

/// Dot product only; used when both norms are already known.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    let mut acc = [0.0f32; 4];
    let a_chunks = a.chunks_exact(4);
    let b_chunks = b.chunks_exact(4);
    let tail: f32 = a_chunks
        .remainder()
        .iter()
        .zip(b_chunks.remainder())
        .map(|(x, y)| x * y)
        .sum();

    for (ca, cb) in a_chunks.zip(b_chunks) {
        acc[0] += ca[0] * cb[0];
        acc[1] += ca[1] * cb[1];
        acc[2] += ca[2] * cb[2];
        acc[3] += ca[3] * cb[3];
    }

    acc[0] + acc[1] + acc[2] + acc[3] + tail
}

#[inline]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let (dot, na, nb) = dot_and_norms_sq(a, b);
    similarity_from_parts(dot, na.sqrt(), nb.sqrt())
}

#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity(a, b)
        .map(|s| 1.0 - s)
        .unwrap_or(MAX_DISTANCE)
}

#[inline]
fn similarity_from_parts(dot: f32, norm_a: f32, norm_b: f32) -> Option<f32> {
    if norm_a == 0.0 || norm_b == 0.0 || !norm_a.is_finite() || !norm_b.is_finite() {
        return None;
    }
    let similarity = dot / (norm_a * norm_b);
    similarity.is_finite().then(|| similarity.clamp(-1.0, 1.0))
}

/// Keeps the `k` lowest-distance candidates, ties resolved by input order.
pub fn select_top_k(mut candidates: Vec<ScoredSlot>, k: usize) -> Vec<ScoredSlot> {
    if k == 0 {
        return Vec::new();
    }

    if candidates.len() <= k {
        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        return candidates;
    }

    // Tag with encounter order so the unstable partition resolves ties like a stable sort.
    let mut tagged: Vec<(usize, ScoredSlot)> = candidates.into_iter().enumerate().collect();
    let by_rank = |a: &(usize, ScoredSlot), b: &(usize, ScoredSlot)| -> Ordering {
        a.1.distance
            .total_cmp(&b.1.distance)
            .then_with(|| a.0.cmp(&b.0))
    };
    tagged.select_nth_unstable_by(k - 1, by_rank);
    tagged.truncate(k);
    tagged.sort_by(by_rank);
    tagged.into_iter().map(|(_, scored)| scored).collect()
}

/// Brute-force scorer over cached embeddings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityEngine;

impl SimilarityEngine {
    pub fn new() -> Self {
        Self
    }

    /// Scores every candidate `(slot, embedding, cached_norm)` against `query` and keeps the top
    /// `k`.
    pub fn top_k<'a, I>(&self, query: &[f32], candidates: I, k: usize) -> Vec<ScoredSlot>
    where
        I: IntoIterator<Item = (SlotIndex, &'a [f32], f32)>,
    {
        if k == 0 {
            return Vec::new();
        }

        let query_norm = norm(query);
        let scored: Vec<ScoredSlot> = candidates
            .into_iter()
            .map(|(slot, embedding, embedding_norm)| {
                let distance = if embedding.len() != query.len() {
                    MAX_DISTANCE
                } else {
                    similarity_from_parts(dot(query, embedding), query_norm, embedding_norm)
                        .map(|s| 1.0 - s)
                        .unwrap_or(MAX_DISTANCE)
                };
                ScoredSlot { slot, distance }
            })
            .collect();

        select_top_k(scored, k)
    }
}
