//! Vector similarity and ranking.

use codewright_core::retrieval::{RetrievalEntry, ScoredEntry};
use std::cmp::Ordering;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length, empty, or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank entries by cosine similarity to a query embedding.
///
/// Sorted by descending score; equal scores fall back to ascending path so
/// results are reproducible. At most `limit` entries are returned.
pub fn rank<'a>(
    entries: impl IntoIterator<Item = &'a RetrievalEntry>,
    query_embedding: &[f32],
    limit: usize,
) -> Vec<ScoredEntry> {
    let mut scored: Vec<ScoredEntry> = entries
        .into_iter()
        .map(|entry| ScoredEntry {
            score: cosine_similarity(&entry.embedding, query_embedding),
            entry: entry.clone(),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.entry.path.cmp(&b.entry.path))
    });
    scored.truncate(limit);
    scored
}
