//! # docqa
//!
//! Ask questions about a single document.
//!
//! A document (PDF or plain text) is split into overlapping word windows,
//! each window is embedded and L2-normalized, and the vectors are kept in an
//! exact inner-product index. Questions are embedded the same way; the most
//! similar chunks become the context for a chat model's answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────┐   ┌────────────┐
//! │  Extract   │──▶│  docqa-core       │──▶│  Answer    │
//! │ PDF / text │   │ chunk+embed+index │   │ OpenAI chat│
//! └────────────┘   └────────┬─────────┘   └────────────┘
//!                           │
//!                 ┌─────────┴─────────┐
//!                 ▼                   ▼
//!            ┌──────────┐       ┌──────────┐
//!            │   CLI    │       │   HTTP   │
//!            │ (docqa)  │       │  (axum)  │
//!            └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docqa chunk report.pdf --chunk-size 100 --overlap 20
//! docqa retrieve report.pdf "what was revenue in Q3?" --top-k 3
//! docqa ask report.pdf "what was revenue in Q3?"
//! docqa serve                       # POST /document, then /ask
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`commands`] | CLI command implementations |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`embedding`] | Embedding providers (local, OpenAI, Ollama, hash) |
//! | [`answer`] | Chat-model answer generation |
//! | [`pipeline`] | Async orchestration over the blocking core |
//! | [`server`] | HTTP API |
//! | [`logging`] | Tracing subscriber setup |
//!
//! The algorithms (chunking, vector math, the flat index, sessions) live in
//! the `docqa-core` crate, which has no async runtime or I/O.

pub mod answer;
pub mod commands;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod logging;
pub mod pipeline;
pub mod server;
