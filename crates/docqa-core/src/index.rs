//! Exact inner-product similarity index.
//!
//! [`VectorIndex`] is the search contract used by retrieval:
//! `search(query, k) -> ranked positions`. [`FlatIndex`] implements it by
//! brute force over a contiguous row-major buffer, so every search is exact.
//! Cost is `O(n × d)` per query, which suits single documents and
//! medium-sized corpora; larger collections would swap in an approximate
//! index behind the same trait.
//!
//! Vectors are expected to be unit-normalized, in which case the inner
//! product equals cosine similarity.

use serde::Serialize;

use crate::embedding::dot;
use crate::error::{CoreError, Result};

/// A single search hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hit {
    /// Position of the vector in the index (insertion order).
    pub position: usize,
    /// Inner product between the query and the stored vector.
    pub score: f32,
}

/// Nearest-neighbor search over a fixed set of vectors.
///
/// Implementations must not mutate internal state during [`search`](VectorIndex::search),
/// so one index can serve concurrent readers.
pub trait VectorIndex: Send + Sync {
    /// Dimensionality of every stored vector.
    fn dims(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return up to `k` hits ordered by descending score.
    ///
    /// Equal scores are ordered by ascending position. `k` larger than
    /// [`len`](VectorIndex::len) is clamped.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Validation`] if `k == 0`.
    /// - [`CoreError::EmptyIndex`] if nothing is indexed.
    /// - [`CoreError::DimensionMismatch`] if `query.len() != dims()`.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>>;
}

/// Brute-force exact inner-product index.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dims: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dims` elements.
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            data: Vec::new(),
        }
    }

    /// Build an index from vectors, preserving their order.
    pub fn from_vectors(dims: usize, vectors: &[Vec<f32>]) -> Result<Self> {
        let mut index = Self::new(dims);
        index.data.reserve(dims * vectors.len());
        for v in vectors {
            index.add(v)?;
        }
        Ok(index)
    }

    /// Append a vector; its position is the previous [`len`](VectorIndex::len).
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if self.dims == 0 {
            return Err(CoreError::Validation("index dims must be > 0".to_string()));
        }
        if vector.len() != self.dims {
            return Err(CoreError::DimensionMismatch {
                expected: self.dims,
                actual: vector.len(),
            });
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// The stored vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dims)?;
        self.data.get(start..start + self.dims)
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dims.max(1))
    }
}

impl VectorIndex for FlatIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    fn len(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.data.len() / self.dims
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>> {
        if k == 0 {
            return Err(CoreError::Validation("top_k must be > 0".to_string()));
        }
        if self.is_empty() {
            return Err(CoreError::EmptyIndex);
        }
        if query.len() != self.dims {
            return Err(CoreError::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            });
        }

        let mut hits: Vec<Hit> = self
            .rows()
            .enumerate()
            .map(|(position, row)| Hit {
                position,
                score: dot(query, row),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(k.min(self.len()));

        Ok(hits)
    }
}
