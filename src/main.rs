//! # docqa CLI
//!
//! Ask questions about a PDF or text document from the command line, or
//! serve the same pipeline over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! docqa [--config ./docqa.toml] [--verbose] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa chunk <file>` | Print the word-window chunks of a document |
//! | `docqa retrieve <file> "<query>"` | Print the chunks most similar to a query |
//! | `docqa ask <file> "<question>"` | Answer a question from the document |
//! | `docqa serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Inspect chunking with a smaller window
//! docqa chunk notes.txt --chunk-size 50 --overlap 10
//!
//! # Offline retrieval with the hash embedder (see docqa.toml)
//! docqa --config ./docqa.toml retrieve report.pdf "quarterly revenue" --top-k 5
//!
//! # Full question answering (needs OPENAI_API_KEY)
//! docqa ask report.pdf "What was revenue in Q3?"
//! ```

use clap::{Parser, Subcommand};
use docqa::config::{self, Config};
use docqa::{commands, logging, server};
use std::path::PathBuf;

/// docqa: question answering over a single document.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Question answering over a single PDF or text document",
    version,
    long_about = "docqa splits a document into overlapping word windows, embeds them, \
    retrieves the windows most similar to a question, and asks a chat model to answer \
    from that context. Available as a CLI and as an HTTP server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Optional. Every setting has a default, so without this flag docqa
    /// runs with the local embedding model and the OpenAI chat API.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overrides `[logging].level`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Extract and chunk a document, printing every chunk.
    ///
    /// Useful for tuning `chunk_size` and `overlap` before indexing.
    Chunk {
        /// PDF, text, or Markdown file.
        file: PathBuf,

        /// Words per chunk (overrides `[chunking].chunk_size`).
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Words shared by consecutive chunks (overrides `[chunking].overlap`).
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Index a document and print the chunks most similar to a query.
    Retrieve {
        file: PathBuf,

        query: String,

        /// Number of chunks to return (overrides `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Index a document and answer a question from it.
    ///
    /// Retrieves the most similar chunks and sends them, with the question,
    /// to the configured chat model. Prints the answer and its sources.
    Ask {
        file: PathBuf,

        question: String,

        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    logging::init(&cfg.logging, cli.verbose)?;

    match cli.command {
        Commands::Chunk {
            file,
            chunk_size,
            overlap,
        } => {
            commands::run_chunk(&cfg, &file, chunk_size, overlap).await?;
        }
        Commands::Retrieve { file, query, top_k } => {
            commands::run_retrieve(&cfg, &file, &query, top_k).await?;
        }
        Commands::Ask {
            file,
            question,
            top_k,
        } => {
            commands::run_ask(&cfg, &file, &question, top_k).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
