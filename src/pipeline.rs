//! Async orchestration of the question-answering pipeline.
//!
//! Embedding is blocking (ONNX inference or blocking HTTP), so every step
//! that touches an [`Embedder`] runs on tokio's blocking pool via
//! `spawn_blocking`. From the caller's view each step is a single awaitable
//! call with no partial results.
//!
//! ```text
//! bytes ──extract──▶ text ──build_session──▶ Session ──retrieve──▶ chunks ──answer──▶ Answer
//! ```

use docqa_core::embedding::Embedder;
use docqa_core::index::VectorIndex;
use docqa_core::retrieve::ScoredChunk;
use docqa_core::session::{Session, SessionOptions};
use docqa_core::CoreError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

use crate::answer::{build_context, AnswerError, AnswerGenerator};
use crate::config::EmbeddingConfig;
use crate::embedding::create_provider;
use crate::extract::ExtractError;

/// Any failure along the pipeline, keeping each source distinguishable.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// An answer together with the chunks it was generated from.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub chunks: Vec<ScoredChunk>,
}

/// Create the configured embedder on the blocking pool.
///
/// Loading a local model can take seconds (or minutes on first download);
/// do it once and share the result.
pub async fn load_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || create_provider(&config)).await?
}

/// Chunk, embed, and index a document.
pub async fn build_session(
    text: String,
    options: SessionOptions,
    embedder: Arc<dyn Embedder>,
) -> Result<Session, PipelineError> {
    let started = Instant::now();
    let session =
        tokio::task::spawn_blocking(move || Session::build(&text, &options, embedder)).await??;

    info!(
        session_id = %session.id(),
        chunks = session.chunks().len(),
        dims = session.index().dims(),
        skipped = session.skipped().len(),
        model = %session.embedder().model_name(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "document indexed"
    );
    Ok(session)
}

/// Retrieve the `top_k` chunks most similar to `query`.
pub async fn retrieve(
    session: Arc<Session>,
    query: String,
    top_k: usize,
) -> Result<Vec<ScoredChunk>, PipelineError> {
    let chunks = tokio::task::spawn_blocking(move || session.retrieve(&query, top_k)).await??;
    Ok(chunks)
}

/// Retrieve supporting chunks for `question` and ask the answer generator.
pub async fn ask(
    session: Arc<Session>,
    answerer: &dyn AnswerGenerator,
    question: &str,
    top_k: usize,
) -> Result<Answer, PipelineError> {
    let chunks = retrieve(session, question.to_string(), top_k).await?;
    let context = build_context(&chunks);
    let answer = answerer.answer(question, &context).await?;
    Ok(Answer { answer, chunks })
}
