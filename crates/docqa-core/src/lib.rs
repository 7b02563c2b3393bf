//! # docqa core
//!
//! Synchronous retrieval logic for docqa: word-window chunking, the
//! [`Embedder`](embedding::Embedder) trait, vector math, an exact
//! inner-product index, and per-document retrieval sessions.
//!
//! This crate contains no tokio, network, or filesystem dependencies.
//! Embedding backends and text extraction live in the `docqa` app crate.
//!
//! ```text
//! text ──▶ chunk ──▶ index (embed + normalize) ──▶ retrieve(query) ──▶ ranked chunks
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod retrieve;
pub mod session;

pub use error::{CoreError, Result};
