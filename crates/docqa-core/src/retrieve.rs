//! Top-k retrieval by cosine similarity.
//!
//! The query is embedded with the same embedder that built the index,
//! normalized identically, and matched against the index by exact inner
//! product. Because both sides are unit vectors the score is the cosine
//! similarity.

use serde::Serialize;
use tracing::debug;

use crate::chunk::Chunk;
use crate::embedding::{normalize, Embedder};
use crate::error::{CoreError, Result};
use crate::index::VectorIndex;

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    /// Rank of the chunk in the original chunk sequence.
    pub index: usize,
    pub text: String,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}

/// Return the `top_k` chunks most similar to `query`, best first.
///
/// `chunks[i]` must be the chunk stored at index position `i`. Results are
/// ordered by descending score; equal scores keep chunk order. `top_k`
/// larger than the index is clamped, so exactly `min(top_k, n)` results come
/// back.
///
/// # Errors
///
/// - [`CoreError::Validation`] if `top_k == 0` or `chunks` does not match the index.
/// - [`CoreError::EmptyIndex`] if nothing is indexed.
/// - [`CoreError::EmptyInput`] if the query is blank.
/// - [`CoreError::DimensionMismatch`] if the query vector does not fit the index.
/// - [`CoreError::DegenerateQuery`] if the query embeds to a zero vector.
/// - [`CoreError::Embedding`] from the embedder, unchanged.
pub fn retrieve(
    query: &str,
    index: &dyn VectorIndex,
    chunks: &[Chunk],
    embedder: &dyn Embedder,
    top_k: usize,
) -> Result<Vec<ScoredChunk>> {
    if top_k == 0 {
        return Err(CoreError::Validation("top_k must be > 0".to_string()));
    }
    if index.is_empty() {
        return Err(CoreError::EmptyIndex);
    }
    if query.trim().is_empty() {
        return Err(CoreError::EmptyInput("query is empty".to_string()));
    }
    if index.len() != chunks.len() {
        return Err(CoreError::Validation(format!(
            "index holds {} vectors but {} chunks were supplied",
            index.len(),
            chunks.len()
        )));
    }

    let raw = embedder.embed_one(query)?;
    if raw.len() != index.dims() {
        return Err(CoreError::DimensionMismatch {
            expected: index.dims(),
            actual: raw.len(),
        });
    }
    let query_vec = normalize(&raw).ok_or(CoreError::DegenerateQuery)?;

    let hits = index.search(&query_vec, top_k)?;
    debug!(
        top_k,
        returned = hits.len(),
        best = hits.first().map(|h| h.score),
        "retrieved chunks"
    );

    Ok(hits
        .into_iter()
        .map(|hit| {
            let chunk = &chunks[hit.position];
            ScoredChunk {
                index: chunk.index,
                text: chunk.text.clone(),
                score: hit.score,
            }
        })
        .collect())
}

/// Like [`retrieve`], returning only the chunk texts.
pub fn retrieve_texts(
    query: &str,
    index: &dyn VectorIndex,
    chunks: &[Chunk],
    embedder: &dyn Embedder,
    top_k: usize,
) -> Result<Vec<String>> {
    Ok(retrieve(query, index, chunks, embedder, top_k)?
        .into_iter()
        .map(|c| c.text)
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::chunk::{chunk_text, ChunkParams};
    use crate::embedding::HashEmbedder;
    use crate::index::FlatIndex;
    use crate::session::{Session, SessionOptions};

    /// One dimension per known word; unknown words are ignored.
    struct VocabEmbedder {
        vocab: HashMap<String, usize>,
        dims: usize,
    }

    impl VocabEmbedder {
        fn new(words: &[&str]) -> Self {
            Self {
                vocab: words
                    .iter()
                    .enumerate()
                    .map(|(i, w)| (w.to_string(), i))
                    .collect(),
                dims: words.len(),
            }
        }

        /// Map `word` onto the dimension of an existing `target` word.
        fn alias(mut self, word: &str, target: &str) -> Self {
            let i = self.vocab[target];
            self.vocab.insert(word.to_string(), i);
            self
        }
    }

    impl Embedder for VocabEmbedder {
        fn model_name(&self) -> &str {
            "vocab"
        }
        fn dims(&self) -> usize {
            self.dims
        }
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0; self.dims];
                    for word in t.split(|c: char| !c.is_alphanumeric()) {
                        if let Some(&i) = self.vocab.get(&word.to_lowercase()) {
                            v[i] += 1.0;
                        }
                    }
                    v
                })
                .collect())
        }
    }

    const FOX: &str = "the quick brown fox jumps over the lazy dog";

    fn fox_session() -> Session {
        let embedder = VocabEmbedder::new(&[
            "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog",
        ])
        .alias("color", "brown");
        let options = SessionOptions {
            chunking: ChunkParams::new(4, 1).unwrap(),
            ..SessionOptions::default()
        };
        Session::build(FOX, &options, Arc::new(embedder)).unwrap()
    }

    #[test]
    fn test_fox_question_ranks_first_chunk() {
        let results = fox_session().retrieve("What color is the fox?", 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].text, "the quick brown fox");
        assert_eq!(results[0].index, 0);
        assert_eq!(results[1].index, 1);
        assert_eq!(results[2].text, "the lazy dog");
        // "color" shares the "brown" dimension, so chunk 0 wins outright.
        assert!(results[0].score > results[1].score);
        assert!(results[1].score > results[2].score);
    }

    #[test]
    fn test_equal_scores_keep_chunk_order() {
        // "fox the" overlaps chunks 0 and 1 equally.
        let results = fox_session().retrieve("fox the", 2).unwrap();
        assert_eq!(results[0].score, results[1].score);
        assert_eq!(results[0].index, 0);
        assert_eq!(results[1].index, 1);
    }

    #[test]
    fn test_exact_chunk_text_is_top_hit() {
        let session = fox_session();
        for chunk in session.chunks() {
            let results = session.retrieve(&chunk.text, 1).unwrap();
            assert_eq!(results[0].index, chunk.index);
            assert!((results[0].score - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_scores_non_increasing() {
        let results = fox_session().retrieve("lazy brown dog", 3).unwrap();
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_top_k_clamped() {
        let results = fox_session().retrieve("fox", 10).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_zero_top_k() {
        assert!(matches!(
            fox_session().retrieve("fox", 0),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_query() {
        assert!(matches!(
            fox_session().retrieve("  \n", 3),
            Err(CoreError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_query_without_known_words_is_degenerate() {
        assert_eq!(
            fox_session().retrieve("zebra", 3),
            Err(CoreError::DegenerateQuery)
        );
    }

    #[test]
    fn test_empty_document_then_retrieve() {
        let chunks = chunk_text("", &ChunkParams::default()).unwrap();
        assert!(chunks.is_empty());
        let embedder = HashEmbedder::default();
        let index = FlatIndex::new(embedder.dims());
        let err = retrieve("anything?", &index, &chunks, &embedder, 3).unwrap_err();
        assert_eq!(err, CoreError::EmptyIndex);
    }

    #[test]
    fn test_chunk_index_mismatch() {
        let session = fox_session();
        let err = retrieve(
            "fox",
            session.index(),
            &session.chunks()[..2],
            session.embedder(),
            1,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let session = fox_session();
        let other = HashEmbedder::new(4).unwrap();
        let err = retrieve("fox", session.index(), session.chunks(), &other, 1).unwrap_err();
        assert_eq!(
            err,
            CoreError::DimensionMismatch {
                expected: 9,
                actual: 4
            }
        );
    }

    #[test]
    fn test_retrieve_texts() {
        let session = fox_session();
        let texts = retrieve_texts(
            "quick brown fox",
            session.index(),
            session.chunks(),
            session.embedder(),
            1,
        )
        .unwrap();
        assert_eq!(texts, ["the quick brown fox"]);
    }
}
