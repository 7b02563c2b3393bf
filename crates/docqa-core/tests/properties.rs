//! Property tests for chunking, indexing, and retrieval.

use std::sync::Arc;

use docqa_core::chunk::{chunk_text, expected_chunk_count, ChunkParams};
use docqa_core::embedding::{cosine_similarity, dot, l2_norm, normalize, HashEmbedder};
use docqa_core::index::VectorIndex;
use docqa_core::session::{DegeneratePolicy, Session, SessionOptions};
use proptest::prelude::*;

fn params_strategy() -> impl Strategy<Value = (usize, usize)> {
    (1usize..30).prop_flat_map(|size| (Just(size), 0..size))
}

fn vector_pair_strategy() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
    (1usize..32).prop_flat_map(|n| {
        (
            prop::collection::vec(-100.0f32..100.0, n),
            prop::collection::vec(-100.0f32..100.0, n),
        )
    })
}

fn words_strategy(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,6}", 0..max)
}

proptest! {
    #[test]
    fn non_overlapping_portions_reconstruct_words(
        words in words_strategy(200),
        (size, overlap) in params_strategy(),
    ) {
        let params = ChunkParams::new(size, overlap).unwrap();
        let chunks = chunk_text(&words.join(" "), &params).unwrap();

        let mut rebuilt: Vec<String> = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let skip = if i == 0 { 0 } else { overlap };
            rebuilt.extend(chunk.text.split(' ').skip(skip).map(str::to_string));
        }
        prop_assert_eq!(rebuilt, words);
    }

    #[test]
    fn chunk_count_matches_formula(
        words in words_strategy(300),
        (size, overlap) in params_strategy(),
    ) {
        let params = ChunkParams::new(size, overlap).unwrap();
        let chunks = chunk_text(&words.join("  "), &params).unwrap();
        let w = words.len();
        prop_assert_eq!(chunks.len(), expected_chunk_count(w, &params));
        if w > overlap {
            prop_assert_eq!(chunks.len(), (w - overlap).div_ceil(size - overlap));
        } else if w == 0 {
            prop_assert_eq!(chunks.len(), 0);
        }
    }

    #[test]
    fn windows_are_full_except_last(
        words in words_strategy(200),
        (size, overlap) in params_strategy(),
    ) {
        let params = ChunkParams::new(size, overlap).unwrap();
        let chunks = chunk_text(&words.join(" "), &params).unwrap();
        if let Some((last, rest)) = chunks.split_last() {
            for c in rest {
                prop_assert_eq!(c.word_count, size);
            }
            prop_assert!(last.word_count >= 1 && last.word_count <= size);
            prop_assert_eq!(last.start_word + last.word_count, words.len());
        }
    }

    #[test]
    fn indexed_vectors_have_unit_norm(words in prop::collection::vec("[a-z]{1,6}", 1..120)) {
        let options = SessionOptions {
            chunking: ChunkParams::new(10, 3).unwrap(),
            degenerate: DegeneratePolicy::Reject,
        };
        let session = Session::build(&words.join(" "), &options, Arc::new(HashEmbedder::new(64).unwrap())).unwrap();
        prop_assert_eq!(session.index().len(), session.chunks().len());
        for v in session.vectors() {
            prop_assert!((l2_norm(v) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn retrieval_returns_min_k_n_sorted(
        words in prop::collection::vec("[a-z]{1,6}", 1..150),
        query in "[a-z]{1,6}( [a-z]{1,6}){0,4}",
        k in 1usize..12,
    ) {
        let options = SessionOptions {
            chunking: ChunkParams::new(8, 2).unwrap(),
            degenerate: DegeneratePolicy::Reject,
        };
        let session = Session::build(&words.join(" "), &options, Arc::new(HashEmbedder::default())).unwrap();
        let results = session.retrieve(&query, k).unwrap();
        prop_assert_eq!(results.len(), k.min(session.chunks().len()));
        for pair in results.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(pair[0].index < pair[1].index);
            }
        }
    }

    #[test]
    fn chunk_text_query_scores_maximal(words in prop::collection::vec("[a-z]{1,6}", 1..100)) {
        let options = SessionOptions {
            chunking: ChunkParams::new(6, 2).unwrap(),
            degenerate: DegeneratePolicy::Reject,
        };
        let session = Session::build(&words.join(" "), &options, Arc::new(HashEmbedder::default())).unwrap();
        for chunk in session.chunks() {
            let top = session.retrieve(&chunk.text, 1).unwrap();
            prop_assert!((top[0].score - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn unit_dot_product_matches_cosine((a, b) in vector_pair_strategy()) {
        let (Some(ua), Some(ub)) = (normalize(&a), normalize(&b)) else {
            return Ok(());
        };
        prop_assert!((dot(&ua, &ub) - cosine_similarity(&a, &b)).abs() < 1e-4);
    }
}
