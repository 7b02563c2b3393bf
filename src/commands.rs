//! CLI command implementations.
//!
//! Each `run_*` function backs one `docqa` subcommand and prints its result
//! to stdout. Diagnostics go through `tracing` (stderr).

use anyhow::{Context, Result};
use docqa_core::chunk::{chunk_text, ChunkParams};
use docqa_core::retrieve::ScoredChunk;
use docqa_core::session::Session;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::answer::create_answerer;
use crate::config::Config;
use crate::extract::load_document;
use crate::pipeline;

/// Read a document from disk on the blocking pool.
async fn read_document(path: &Path) -> Result<String> {
    let owned: PathBuf = path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || load_document(&owned)).await??;
    Ok(text)
}

/// Extract, chunk, embed, and index the document at `path`.
async fn open_session(config: &Config, path: &Path) -> Result<Arc<Session>> {
    let options = config.session_options()?;
    let text = read_document(path).await?;
    let embedder = pipeline::load_embedder(&config.embedding).await?;
    let session = pipeline::build_session(text, options, embedder)
        .await
        .with_context(|| format!("failed to index {}", path.display()))?;
    Ok(Arc::new(session))
}

/// `docqa chunk`: print the word windows of a document.
///
/// `--chunk-size` and `--overlap` override `[chunking]`.
pub async fn run_chunk(
    config: &Config,
    path: &Path,
    chunk_size: Option<usize>,
    overlap: Option<usize>,
) -> Result<()> {
    let params = ChunkParams::new(
        chunk_size.unwrap_or(config.chunking.chunk_size),
        overlap.unwrap_or(config.chunking.overlap),
    )?;
    let text = read_document(path).await?;
    let chunks = chunk_text(&text, &params)?;

    println!("Chunks: {}", chunks.len());
    for chunk in &chunks {
        println!("[{}] {}", chunk.index, chunk.text);
    }
    Ok(())
}

/// `docqa retrieve`: print the chunks most similar to `query`.
pub async fn run_retrieve(
    config: &Config,
    path: &Path,
    query: &str,
    top_k: Option<usize>,
) -> Result<()> {
    let session = open_session(config, path).await?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let results = pipeline::retrieve(session, query.to_string(), top_k).await?;
    print_ranked(&results);
    Ok(())
}

/// `docqa ask`: answer `question` from the document and list the sources.
pub async fn run_ask(
    config: &Config,
    path: &Path,
    question: &str,
    top_k: Option<usize>,
) -> Result<()> {
    let answerer = create_answerer(&config.answer)?;
    let session = open_session(config, path).await?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let answer = pipeline::ask(session, answerer.as_ref(), question, top_k).await?;

    println!("Answer:");
    println!("{}", answer.answer);
    println!();
    println!("Sources:");
    print_ranked(&answer.chunks);
    Ok(())
}

fn print_ranked(results: &[ScoredChunk]) {
    for (i, result) in results.iter().enumerate() {
        println!("{}. [{:.3}] chunk {}", i + 1, result.score, result.index);
        println!("    \"{}\"", result.text);
    }
}
