//! TOML configuration.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below, so an empty file (or no file at all) is a valid
//! configuration.
//!
//! ```toml
//! [chunking]
//! chunk_size = 100
//! overlap = 20
//!
//! [retrieval]
//! top_k = 3
//! on_degenerate = "reject"
//!
//! [embedding]
//! provider = "local"
//! model = "all-MiniLM-L6-v2"
//!
//! [answer]
//! provider = "openai"
//! model = "gpt-3.5-turbo"
//! ```

use anyhow::{bail, Context, Result};
use docqa_core::chunk::{ChunkParams, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use docqa_core::session::{DegeneratePolicy, SessionOptions};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Window size in words.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Words shared by consecutive windows.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_overlap() -> usize {
    DEFAULT_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub on_degenerate: DegeneratePolicy,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            on_degenerate: DegeneratePolicy::Reject,
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `local`, `openai`, `ollama`, or `hash`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    /// `openai` or `disabled`.
    #[serde(default = "default_answer_provider")]
    pub provider: String,
    #[serde(default = "default_answer_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_answer_timeout_secs")]
    pub timeout_secs: u64,
    /// Override for the chat completions endpoint (OpenAI-compatible servers).
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            provider: default_answer_provider(),
            model: default_answer_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            timeout_secs: default_answer_timeout_secs(),
            url: None,
        }
    }
}

fn default_answer_provider() -> String {
    "openai".to_string()
}
fn default_answer_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_max_tokens() -> u32 {
    300
}
fn default_answer_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted document upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Chunking and indexing parameters for [`docqa_core::session::Session::build`].
    pub fn session_options(&self) -> Result<SessionOptions> {
        Ok(SessionOptions {
            chunking: ChunkParams::new(self.chunking.chunk_size, self.chunking.overlap)?,
            degenerate: self.retrieval.on_degenerate,
        })
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        ChunkParams::new(self.chunking.chunk_size, self.chunking.overlap)
            .context("invalid [chunking] section")?;

        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be > 0");
        }

        match self.embedding.provider.as_str() {
            "local" | "openai" | "ollama" | "hash" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be local, openai, ollama, or hash.",
                other
            ),
        }
        if self.embedding.dims == Some(0) {
            bail!("embedding.dims must be > 0");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }
        if matches!(self.embedding.provider.as_str(), "openai" | "ollama")
            && self.embedding.model.is_none()
        {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                self.embedding.provider
            );
        }

        match self.answer.provider.as_str() {
            "openai" | "disabled" => {}
            other => bail!(
                "Unknown answer provider: '{}'. Must be openai or disabled.",
                other
            ),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => bail!("Unknown logging.format: '{}'. Must be pretty or json.", other),
        }

        Ok(())
    }
}

/// Read, parse, and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.chunking.chunk_size, 100);
        assert_eq!(cfg.chunking.overlap, 20);
        assert_eq!(cfg.retrieval.top_k, 3);
        assert_eq!(cfg.retrieval.on_degenerate, DegeneratePolicy::Reject);
        assert_eq!(cfg.embedding.provider, "local");
        assert_eq!(cfg.answer.model, "gpt-3.5-turbo");
        assert_eq!(cfg.answer.max_tokens, 300);
        assert_eq!(cfg.answer.temperature, 0.0);
    }

    #[test]
    fn test_partial_sections() {
        let cfg = parse_config(
            r#"
[chunking]
chunk_size = 50

[retrieval]
on_degenerate = "skip"

[embedding]
provider = "hash"
dims = 128
"#,
        )
        .unwrap();
        assert_eq!(cfg.chunking.chunk_size, 50);
        assert_eq!(cfg.chunking.overlap, 20);
        assert_eq!(cfg.retrieval.on_degenerate, DegeneratePolicy::Skip);
        assert_eq!(cfg.embedding.dims, Some(128));
        let options = cfg.session_options().unwrap();
        assert_eq!(options.chunking.step(), 30);
    }

    #[test]
    fn test_overlap_not_less_than_chunk_size() {
        let err = parse_config("[chunking]\nchunk_size = 4\noverlap = 4\n").unwrap_err();
        assert!(format!("{:#}", err).contains("overlap"));
    }

    #[test]
    fn test_zero_top_k() {
        assert!(parse_config("[retrieval]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn test_unknown_providers() {
        assert!(parse_config("[embedding]\nprovider = \"magic\"\n").is_err());
        assert!(parse_config("[answer]\nprovider = \"magic\"\n").is_err());
    }

    #[test]
    fn test_remote_provider_requires_model() {
        assert!(parse_config("[embedding]\nprovider = \"openai\"\n").is_err());
        assert!(parse_config(
            "[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\n"
        )
        .is_ok());
    }

    #[test]
    fn test_unknown_degenerate_policy() {
        assert!(parse_config("[retrieval]\non_degenerate = \"ignore\"\n").is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let cfg = parse_config(include_str!("../config/docqa.example.toml")).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:7341");
        assert_eq!(cfg.server.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(cfg.embedding.model.as_deref(), Some("all-MiniLM-L6-v2"));
    }
}
