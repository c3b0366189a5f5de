use proptest::prelude::*;
use ragline_core::rag::{mmr, top_k, Document, VectorIndex};

fn index_and_query() -> impl Strategy<Value = (Vec<Vec<f32>>, Vec<f32>)> {
    (1usize..6).prop_flat_map(|dim| {
        (
            prop::collection::vec(prop::collection::vec(-1.0f32..1.0, dim), 1..24),
            prop::collection::vec(-1.0f32..1.0, dim),
        )
    })
}

fn build(vectors: &[Vec<f32>]) -> VectorIndex {
    let docs = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| Document::new(format!("doc_{:05}", i), "text", v.clone()))
        .collect();
    VectorIndex::load(docs).unwrap()
}

fn first_argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = i;
        }
    }
    best
}

proptest! {
    #[test]
    fn mmr_returns_min_k_n_distinct((vectors, query) in index_and_query(), k in 1usize..30, lambda in 0.0f32..=1.0) {
        let index = build(&vectors);
        let scores = index.score(&query).unwrap();
        let picked = mmr::select(&scores, index.matrix(), k, lambda);

        prop_assert_eq!(picked.len(), k.min(vectors.len()));
        let mut unique = picked.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), picked.len());
        prop_assert!(picked.iter().all(|&i| i < vectors.len()));
    }

    #[test]
    fn mmr_first_pick_is_most_similar((vectors, query) in index_and_query(), k in 1usize..10, lambda in 0.0f32..=1.0) {
        let index = build(&vectors);
        let scores = index.score(&query).unwrap();
        let picked = mmr::select(&scores, index.matrix(), k, lambda);

        prop_assert_eq!(picked[0], first_argmax(&scores));
    }

    #[test]
    fn mmr_is_deterministic((vectors, query) in index_and_query(), k in 1usize..10, lambda in 0.0f32..=1.0) {
        let index = build(&vectors);
        let scores = index.score(&query).unwrap();

        let a = mmr::select(&scores, index.matrix(), k, lambda);
        let b = mmr::select(&scores, index.matrix(), k, lambda);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn mmr_with_full_relevance_weight_matches_similarity((vectors, query) in index_and_query(), k in 1usize..10) {
        let index = build(&vectors);
        let scores = index.score(&query).unwrap();

        prop_assert_eq!(
            mmr::select(&scores, index.matrix(), k, 1.0),
            top_k(&scores, k)
        );
    }

    #[test]
    fn top_k_is_sorted_and_stable((vectors, query) in index_and_query(), k in 1usize..30) {
        let index = build(&vectors);
        let scores = index.score(&query).unwrap();
        let order = top_k(&scores, k);

        prop_assert_eq!(order.len(), k.min(vectors.len()));
        for pair in order.windows(2) {
            let (a, b) = (scores[pair[0]], scores[pair[1]]);
            prop_assert!(a > b || (a == b && pair[0] < pair[1]));
        }
    }

    #[test]
    fn similarities_are_cosine_bounded((vectors, query) in index_and_query()) {
        let index = build(&vectors);
        for s in index.score(&query).unwrap() {
            prop_assert!(s.is_finite());
            prop_assert!((-1.0001..=1.0001).contains(&s));
        }
    }
}
