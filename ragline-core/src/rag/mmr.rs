//! Maximal Marginal Relevance (MMR) selection.
//!
//! MMR re-ranks candidates to balance relevance against redundancy:
//!
//! ```text
//! mmr(c) = λ × sim(query, c) − (1 − λ) × max_{s ∈ selected} sim(c, s)
//! ```
//!
//! - λ = 1.0: ranking by query similarity alone
//! - λ = 0.5: balanced
//! - λ = 0.0: pure anti-redundancy
//!
//! Selection is greedy and deterministic. Every exact tie, including the
//! first pick, resolves to the lowest original index.

use super::index::Matrix;

/// Greedily selects up to `k` row indices, returned in selection order.
///
/// When `k >= n` all `n` indices are returned in greedy order.
///
/// # Arguments
///
/// * `similarities` - Query similarity of each row of `vectors`
/// * `vectors` - Candidate vectors; rows must be normalized so their dot
///   product is a cosine similarity
/// * `k` - Maximum number of indices to select
/// * `lambda` - Weight on query relevance, in `[0, 1]`
///
/// # Returns
///
/// Row indices in the order they were picked, without repeats.
///
/// Runs in O(k·n·d): the per-candidate maximum similarity to the selected set
/// is kept up to date incrementally after each pick.
pub fn select(similarities: &[f32], vectors: &Matrix, k: usize, lambda: f32) -> Vec<usize> {
    debug_assert_eq!(similarities.len(), vectors.rows());

    let n = similarities.len();
    let k = k.min(n);
    if k == 0 {
        return Vec::new();
    }

    let mut selected = Vec::with_capacity(k);
    let mut taken = vec![false; n];
    // Max similarity of each candidate to anything selected so far
    let mut redundancy = vec![f32::NEG_INFINITY; n];

    let first = argmax((0..n).map(|i| (i, similarities[i])));
    let mut last = match first {
        Some(i) => i,
        None => return selected,
    };
    selected.push(last);
    taken[last] = true;

    while selected.len() < k {
        for c in (0..n).filter(|&c| !taken[c]) {
            let sim = vectors.similarity(c, last);
            if sim > redundancy[c] {
                redundancy[c] = sim;
            }
        }

        let best = argmax(
            (0..n)
                .filter(|&c| !taken[c])
                .map(|c| (c, lambda * similarities[c] - (1.0 - lambda) * redundancy[c])),
        );

        match best {
            Some(c) => {
                selected.push(c);
                taken[c] = true;
                last = c;
            }
            None => break,
        }
    }

    selected
}

/// Index of the highest score; on exact ties the earliest candidate wins.
/// NaN ranks below every number.
///
/// Candidates must arrive in ascending index order.
fn argmax(candidates: impl Iterator<Item = (usize, f32)>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, score) in candidates {
        let score = if score.is_nan() { f32::NEG_INFINITY } else { score };
        match best {
            Some((_, best_score)) if !(score > best_score) => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::index::{dot, normalize};

    fn matrix(rows: &[Vec<f32>]) -> Matrix {
        let normalized: Vec<Vec<f32>> = rows.iter().map(|r| normalize(r)).collect();
        let cols = normalized[0].len();
        Matrix::from_rows(normalized.iter().map(|r| r.as_slice()), cols)
    }

    fn sims(vectors: &Matrix, query: &[f32]) -> Vec<f32> {
        let query = normalize(query);
        (0..vectors.rows()).map(|i| dot(vectors.row(i), &query)).collect()
    }

    #[test]
    fn test_empty_input() {
        let vectors = Matrix::from_rows(std::iter::empty(), 3);
        assert!(select(&[], &vectors, 5, 0.5).is_empty());
    }

    #[test]
    fn test_k_zero() {
        let vectors = matrix(&[vec![1.0, 0.0]]);
        assert!(select(&[1.0], &vectors, 0, 0.5).is_empty());
    }

    #[test]
    fn test_returns_k_results() {
        let vectors = matrix(&[
            vec![0.9, 0.1, 0.0],
            vec![0.8, 0.2, 0.0],
            vec![0.7, 0.3, 0.0],
            vec![0.6, 0.4, 0.0],
        ]);
        let similarities = sims(&vectors, &[1.0, 0.0, 0.0]);
        assert_eq!(select(&similarities, &vectors, 3, 0.5).len(), 3);
    }

    #[test]
    fn test_k_larger_than_candidates() {
        let vectors = matrix(&[vec![1.0, 0.0], vec![0.0, 1.0]]);
        let similarities = sims(&vectors, &[1.0, 0.2]);
        assert_eq!(select(&similarities, &vectors, 10, 0.5), vec![0, 1]);
    }

    #[test]
    fn test_first_pick_is_most_similar() {
        let vectors = matrix(&[vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]]);
        let similarities = sims(&vectors, &[1.0, 0.1]);
        for lambda in [0.0, 0.3, 0.5, 1.0] {
            assert_eq!(select(&similarities, &vectors, 3, lambda)[0], 1);
        }
    }

    #[test]
    fn test_pure_diversity_avoids_duplicates() {
        // Two identical documents and one dissimilar
        let vectors = matrix(&[vec![1.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]);
        let similarities = sims(&vectors, &[1.0, 0.3]);

        let picked = select(&similarities, &vectors, 2, 0.0);
        assert_eq!(picked, vec![0, 2]);
    }

    #[test]
    fn test_pure_relevance_keeps_duplicates() {
        let vectors = matrix(&[vec![1.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]);
        let similarities = sims(&vectors, &[1.0, 0.3]);

        let picked = select(&similarities, &vectors, 2, 1.0);
        assert_eq!(picked, vec![0, 1]);
    }

    #[test]
    fn test_pure_relevance_matches_similarity_order() {
        let vectors = matrix(&[
            vec![0.5, 0.5],
            vec![0.9, 0.1],
            vec![0.88, 0.12],
            vec![0.1, 0.9],
        ]);
        let similarities = sims(&vectors, &[1.0, 0.0]);
        assert_eq!(select(&similarities, &vectors, 4, 1.0), vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_balanced_prefers_novel_over_near_duplicate() {
        let vectors = matrix(&[
            vec![0.99, 0.01, 0.0],
            vec![0.98, 0.02, 0.0],
            vec![0.0, 0.0, 1.0],
        ]);
        let similarities = vec![0.95, 0.94, 0.7];
        assert_eq!(select(&similarities, &vectors, 2, 0.5), vec![0, 2]);
    }

    #[test]
    fn test_exact_ties_resolve_to_lowest_index() {
        // Every candidate scores identically at every step
        let vectors = matrix(&[vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]]);
        let similarities = vec![0.5; 4];
        for _ in 0..10 {
            assert_eq!(select(&similarities, &vectors, 4, 0.5), vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn test_tie_between_orthogonal_candidates() {
        // 1 and 2 are both orthogonal to 0 with equal query similarity
        let vectors = matrix(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]]);
        let similarities = vec![0.9, 0.2, 0.2];
        assert_eq!(select(&similarities, &vectors, 3, 0.5), vec![0, 1, 2]);
    }

    #[test]
    fn test_nan_similarity_never_picked_first() {
        let vectors = matrix(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.8]]);
        assert_eq!(select(&[f32::NAN, 0.9, 0.1], &vectors, 1, 0.5), vec![1]);
        assert_eq!(select(&[f32::NAN, 0.9, 0.1], &vectors, 3, 0.5)[2], 0);
    }

    #[test]
    fn test_no_repeats() {
        let vectors = matrix(&[vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]]);
        let similarities = vec![0.9, 0.9, 0.9];
        let mut picked = select(&similarities, &vectors, 3, 0.0);
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn test_argmax_prefers_earliest() {
        assert_eq!(argmax(vec![(0, 1.0), (1, 2.0), (2, 2.0)].into_iter()), Some(1));
        assert_eq!(argmax(std::iter::empty()), None);
    }
}
