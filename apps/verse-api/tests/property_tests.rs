//! Property-based tests for the matching pipeline
//!
//! Exercises the cosine scoring and selection logic the API serves, using
//! proptest-generated queries against fixed corpora.

use proptest::prelude::*;
use verse_core::{best_match, cosine_similarity, Corpus, Match, SCORE_THRESHOLD};

fn query_vector() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0, 4)
}

fn fixed_corpus() -> Corpus {
    Corpus::new(
        vec![
            "Be yourself.".to_string(),
            "Carpe diem.".to_string(),
            "Knowledge is power.".to_string(),
            "Less is more.".to_string(),
        ],
        vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.5, 0.5, 0.5, 0.5],
            vec![0.0, 0.0, -1.0, 0.0],
        ],
        "test-model",
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // ============================================================
    // Cosine similarity
    // ============================================================

    #[test]
    fn cosine_is_bounded(a in query_vector(), b in query_vector()) {
        let score = cosine_similarity(&a, &b);
        prop_assert!((-1.0..=1.0).contains(&score));
    }

    #[test]
    fn cosine_is_symmetric(a in query_vector(), b in query_vector()) {
        prop_assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn cosine_is_scale_invariant(a in query_vector(), b in query_vector(), scale in 0.1f32..10.0) {
        let scaled: Vec<f32> = b.iter().map(|x| x * scale).collect();
        let diff = cosine_similarity(&a, &b) - cosine_similarity(&a, &scaled);
        prop_assert!(diff.abs() < 1e-4);
    }

    #[test]
    fn cosine_of_vector_with_itself_is_one(a in query_vector()) {
        // Skip near-zero vectors, which score 0 against everything.
        prop_assume!(a.iter().map(|x| x * x).sum::<f32>() > 1e-6);
        let score = cosine_similarity(&a, &a);
        prop_assert!((score - 1.0).abs() < 1e-5);
    }

    // ============================================================
    // Selection
    // ============================================================

    #[test]
    fn match_agrees_with_manual_argmax(query in query_vector()) {
        let corpus = fixed_corpus();
        let scores: Vec<f32> = corpus
            .embeddings()
            .iter()
            .map(|row| cosine_similarity(&query, row))
            .collect();
        let top = scores.iter().cloned().fold(f32::MIN, f32::max);
        let first_top = scores.iter().position(|&s| s == top).unwrap();

        match best_match(&corpus, &query) {
            Match::Quote { index, score, .. } => {
                prop_assert!(score > SCORE_THRESHOLD);
                prop_assert_eq!(index, first_top);
                prop_assert_eq!(score, top);
            }
            Match::NoMatch { best_score } => {
                prop_assert!(top <= SCORE_THRESHOLD);
                prop_assert_eq!(best_score, top);
            }
        }
    }

    #[test]
    fn match_is_deterministic(query in query_vector()) {
        let corpus = fixed_corpus();
        prop_assert_eq!(best_match(&corpus, &query), best_match(&corpus, &query));
    }

    #[test]
    fn duplicate_rows_resolve_to_lowest_index(query in query_vector()) {
        let corpus = Corpus::new(
            vec!["first".to_string(), "second".to_string()],
            vec![vec![0.0, 1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]],
            "test-model",
        )
        .unwrap();

        if let Match::Quote { index, .. } = best_match(&corpus, &query) {
            prop_assert_eq!(index, 0);
        }
    }
}
