//! Indexing and per-document retrieval sessions.
//!
//! [`build_index`] embeds a document's chunks in one batched call,
//! normalizes every vector to unit length, and loads them into a
//! [`FlatIndex`]. A [`Session`] bundles the result with the embedder that
//! produced it, so queries are embedded by the same model.
//!
//! # Degenerate vectors
//!
//! A chunk whose embedding has zero norm has no direction and is never
//! divided by its norm. [`DegeneratePolicy::Reject`] fails the build with
//! [`CoreError::DegenerateVector`]; [`DegeneratePolicy::Skip`] drops the chunk
//! and records its index in [`Session::skipped`].
//!
//! # Concurrency
//!
//! A built session is immutable. `Session` is `Send + Sync`, and
//! [`Session::retrieve`] takes `&self`, so any number of threads may query one
//! session at once. Replacing the document means building a new session;
//! holders of the old one keep a valid view until they drop it.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chunk::{chunk_text, Chunk, ChunkParams};
use crate::embedding::{normalize, Embedder};
use crate::error::{CoreError, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::retrieve::{retrieve, ScoredChunk};

/// What to do with a chunk whose embedding cannot be normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Fail the whole build.
    #[default]
    Reject,
    /// Exclude the chunk and keep going.
    Skip,
}

/// Output of [`build_index`].
#[derive(Debug, Clone)]
pub struct IndexedChunks {
    /// Chunks that made it into the index; position `i` ↔ index entry `i`.
    pub chunks: Vec<Chunk>,
    /// Unit-normalized vectors, parallel to `chunks`.
    pub vectors: Vec<Vec<f32>>,
    pub index: FlatIndex,
    /// Original indices of chunks excluded as degenerate.
    pub skipped: Vec<usize>,
}

/// Embed, normalize, and index a non-empty sequence of chunks.
///
/// # Errors
///
/// - [`CoreError::EmptyInput`] if `chunks` is empty.
/// - [`CoreError::Embedding`] if the embedder fails or returns the wrong
///   number of vectors.
/// - [`CoreError::DimensionMismatch`] if the vectors disagree in length.
/// - [`CoreError::DegenerateVector`] per `policy`, or when every chunk is degenerate.
pub fn build_index(
    chunks: Vec<Chunk>,
    embedder: &dyn Embedder,
    policy: DegeneratePolicy,
) -> Result<IndexedChunks> {
    if chunks.is_empty() {
        return Err(CoreError::EmptyInput("no chunks to index".to_string()));
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let raw = embedder.embed(&texts)?;
    if raw.len() != chunks.len() {
        return Err(CoreError::Embedding(format!(
            "embedder returned {} vectors for {} texts",
            raw.len(),
            chunks.len()
        )));
    }

    let dims = raw[0].len();
    if dims == 0 {
        return Err(CoreError::Embedding(
            "embedder returned zero-length vectors".to_string(),
        ));
    }
    if dims != embedder.dims() {
        debug!(
            declared = embedder.dims(),
            actual = dims,
            model = embedder.model_name(),
            "embedder dimension differs from declared value"
        );
    }

    let mut kept = Vec::with_capacity(chunks.len());
    let mut vectors = Vec::with_capacity(chunks.len());
    let mut skipped = Vec::new();

    for (chunk, v) in chunks.into_iter().zip(raw) {
        if v.len() != dims {
            return Err(CoreError::DimensionMismatch {
                expected: dims,
                actual: v.len(),
            });
        }
        match normalize(&v) {
            Some(unit) => {
                kept.push(chunk);
                vectors.push(unit);
            }
            None => match policy {
                DegeneratePolicy::Reject => {
                    return Err(CoreError::DegenerateVector {
                        chunk_index: chunk.index,
                    })
                }
                DegeneratePolicy::Skip => {
                    warn!(chunk_index = chunk.index, "skipping chunk with degenerate embedding");
                    skipped.push(chunk.index);
                }
            },
        }
    }

    if kept.is_empty() {
        return Err(CoreError::DegenerateVector {
            chunk_index: skipped.first().copied().unwrap_or(0),
        });
    }

    let index = FlatIndex::from_vectors(dims, &vectors)?;

    Ok(IndexedChunks {
        chunks: kept,
        vectors,
        index,
        skipped,
    })
}

/// Parameters for [`Session::build`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub chunking: ChunkParams,
    pub degenerate: DegeneratePolicy,
}

/// Summary of a session, for display and API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub created_at: String,
    pub chunks: usize,
    pub dims: usize,
    pub model: String,
    pub skipped: Vec<usize>,
}

/// One indexed document: chunks, vectors, index, and the embedder handle.
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    index: FlatIndex,
    embedder: Arc<dyn Embedder>,
    skipped: Vec<usize>,
}

impl Session {
    /// Chunk `text`, embed the chunks, and build the index.
    ///
    /// This blocks for the duration of the embedding call.
    ///
    /// # Errors
    ///
    /// [`CoreError::EmptyInput`] if the text contains no words, otherwise
    /// anything [`build_index`] returns.
    pub fn build(text: &str, options: &SessionOptions, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let chunks = chunk_text(text, &options.chunking)?;
        if chunks.is_empty() {
            return Err(CoreError::EmptyInput("document text is empty".to_string()));
        }
        Self::from_chunks(chunks, embedder, options.degenerate)
    }

    /// Build a session from already-chunked text.
    pub fn from_chunks(
        chunks: Vec<Chunk>,
        embedder: Arc<dyn Embedder>,
        policy: DegeneratePolicy,
    ) -> Result<Self> {
        let started = Instant::now();
        let indexed = build_index(chunks, embedder.as_ref(), policy)?;
        debug!(
            chunks = indexed.chunks.len(),
            dims = indexed.index.dims(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index built"
        );

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            chunks: indexed.chunks,
            vectors: indexed.vectors,
            index: indexed.index,
            embedder,
            skipped: indexed.skipped,
        })
    }

    /// Return the `top_k` chunks most similar to `query`, best first.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        retrieve(query, &self.index, &self.chunks, self.embedder.as_ref(), top_k)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Original indices of chunks excluded as degenerate.
    pub fn skipped(&self) -> &[usize] {
        &self.skipped
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id.clone(),
            created_at: self.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            chunks: self.chunks.len(),
            dims: self.index.dims(),
            model: self.embedder.model_name().to_string(),
            skipped: self.skipped.clone(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("chunks", &self.chunks.len())
            .field("dims", &self.index.dims())
            .field("model", &self.embedder.model_name())
            .field("skipped", &self.skipped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{l2_norm, HashEmbedder};

    /// Returns fixed vectors, ignoring the input text.
    struct FixedEmbedder {
        vectors: Vec<Vec<f32>>,
    }

    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            self.vectors.first().map(|v| v.len()).unwrap_or(0)
        }
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(self.vectors.iter().take(texts.len()).cloned().collect())
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            8
        }
        fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(CoreError::Embedding("backend unavailable".to_string()))
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk {
                index: i,
                text: t.to_string(),
                start_word: i,
                word_count: t.split_whitespace().count(),
            })
            .collect()
    }

    #[test]
    fn test_vectors_are_unit_norm() {
        let embedder = HashEmbedder::new(32).unwrap();
        let indexed = build_index(
            chunks(&["alpha beta", "beta gamma gamma", "delta"]),
            &embedder,
            DegeneratePolicy::Reject,
        )
        .unwrap();
        assert_eq!(indexed.index.len(), 3);
        assert_eq!(indexed.vectors.len(), 3);
        for v in &indexed.vectors {
            assert!((l2_norm(v) - 1.0).abs() < 1e-5);
        }
        assert_eq!(indexed.index.vector(1), Some(indexed.vectors[1].as_slice()));
    }

    #[test]
    fn test_empty_chunks_rejected() {
        let embedder = HashEmbedder::default();
        assert!(matches!(
            build_index(Vec::new(), &embedder, DegeneratePolicy::Reject),
            Err(CoreError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_degenerate_rejected() {
        let embedder = FixedEmbedder {
            vectors: vec![vec![1.0, 0.0], vec![0.0, 0.0]],
        };
        let err = build_index(chunks(&["a", "b"]), &embedder, DegeneratePolicy::Reject).unwrap_err();
        assert_eq!(err, CoreError::DegenerateVector { chunk_index: 1 });
    }

    #[test]
    fn test_degenerate_skipped() {
        let embedder = FixedEmbedder {
            vectors: vec![vec![0.0, 0.0], vec![2.0, 0.0], vec![0.0, 3.0]],
        };
        let indexed =
            build_index(chunks(&["a", "b", "c"]), &embedder, DegeneratePolicy::Skip).unwrap();
        assert_eq!(indexed.skipped, [0]);
        assert_eq!(indexed.chunks.len(), 2);
        assert_eq!(indexed.chunks[0].index, 1);
        assert_eq!(indexed.index.len(), indexed.chunks.len());
    }

    #[test]
    fn test_all_degenerate_fails_even_when_skipping() {
        let embedder = FixedEmbedder {
            vectors: vec![vec![0.0, 0.0], vec![0.0, 0.0]],
        };
        let err = build_index(chunks(&["a", "b"]), &embedder, DegeneratePolicy::Skip).unwrap_err();
        assert_eq!(err, CoreError::DegenerateVector { chunk_index: 0 });
    }

    #[test]
    fn test_wrong_vector_count() {
        let embedder = FixedEmbedder {
            vectors: vec![vec![1.0, 0.0]],
        };
        assert!(matches!(
            build_index(chunks(&["a", "b"]), &embedder, DegeneratePolicy::Reject),
            Err(CoreError::Embedding(_))
        ));
    }

    #[test]
    fn test_inconsistent_dimensions() {
        let embedder = FixedEmbedder {
            vectors: vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]],
        };
        assert_eq!(
            build_index(chunks(&["a", "b"]), &embedder, DegeneratePolicy::Reject).unwrap_err(),
            CoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_embedder_failure_propagates() {
        let err = build_index(chunks(&["a"]), &FailingEmbedder, DegeneratePolicy::Reject).unwrap_err();
        assert_eq!(err, CoreError::Embedding("backend unavailable".to_string()));
    }

    #[test]
    fn test_session_build_empty_text() {
        let err = Session::build("   ", &SessionOptions::default(), Arc::new(HashEmbedder::default()))
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyInput(_)));
    }

    #[test]
    fn test_session_info() {
        let options = SessionOptions {
            chunking: ChunkParams::new(4, 1).unwrap(),
            degenerate: DegeneratePolicy::Reject,
        };
        let session = Session::build(
            "the quick brown fox jumps over the lazy dog",
            &options,
            Arc::new(HashEmbedder::new(64).unwrap()),
        )
        .unwrap();
        let info = session.info();
        assert_eq!(info.chunks, 3);
        assert_eq!(info.dims, 64);
        assert_eq!(info.model, "hash-64");
        assert!(info.skipped.is_empty());
        assert_eq!(info.session_id, session.id());
    }

    #[test]
    fn test_session_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Session>();
    }
}
