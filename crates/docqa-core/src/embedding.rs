//! Embedder trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! pure helpers for normalization and similarity, and [`HashEmbedder`], a
//! deterministic offline embedder based on feature hashing.
//!
//! Network and ONNX-backed embedders (OpenAI, Ollama, fastembed) live in the
//! `docqa` app crate.

use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

/// Trait for embedding backends.
///
/// An embedder maps a batch of strings to vectors of one fixed dimension.
/// Implementations must be deterministic for identical input within one
/// instance, and must be safe to share between threads: a built
/// [`Session`](crate::session::Session) keeps its embedder for query time.
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-MiniLM-L6-v2"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per text in input order.
    ///
    /// This is a single blocking call; implementations may parallelize
    /// internally but never return partial results.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::Embedding("empty embedding response".to_string()))
    }
}

/// Euclidean norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    norm_f64(v) as f32
}

/// Norm accumulated in `f64` so tiny or huge components neither underflow
/// nor overflow when squared.
fn norm_f64(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Inner product of two equal-length vectors.
///
/// Extra trailing elements of the longer slice are ignored.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Scale a vector to unit Euclidean norm.
///
/// Returns `None` when the norm is zero or not finite; such a vector has
/// no direction and cannot take part in cosine similarity.
pub fn normalize(v: &[f32]) -> Option<Vec<f32>> {
    let norm = norm_f64(v);
    if !norm.is_finite() || norm == 0.0 {
        return None;
    }
    Some(v.iter().map(|&x| (f64::from(x) / norm) as f32).collect())
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, and zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let denom = norm_f64(a) * norm_f64(b);
    if !denom.is_finite() || denom == 0.0 {
        return 0.0;
    }

    let product: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    (product / denom) as f32
}

/// Default dimensionality of [`HashEmbedder`] vectors.
pub const DEFAULT_HASH_DIMS: usize = 256;

/// Deterministic bag-of-words embedder based on feature hashing.
///
/// Each lower-cased alphanumeric token is hashed with SHA-256 into one of
/// `dims` buckets, and the bucket counts form the vector. Texts sharing
/// words land close together; texts without any alphanumeric token embed
/// to the zero vector.
///
/// Needs no model download, which makes it suitable for tests and offline
/// runs. It captures lexical overlap only, not meaning.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
    name: String,
}

impl HashEmbedder {
    /// # Errors
    ///
    /// [`CoreError::Validation`] if `dims == 0`.
    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            return Err(CoreError::Validation("hash embedder dims must be > 0".to_string()));
        }
        Ok(Self {
            dims,
            name: format!("hash-{}", dims),
        })
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(head) % self.dims as u64) as usize
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for token in tokens(text) {
            v[self.bucket(&token)] += 1.0;
        }
        v
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dims: DEFAULT_HASH_DIMS,
            name: format!("hash-{}", DEFAULT_HASH_DIMS),
        }
    }
}

impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Lower-cased alphanumeric runs of `text`.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}
