//! Answer generation from retrieved context.
//!
//! The [`AnswerGenerator`] trait is the seam to the chat model: it takes the
//! user's question and the retrieved passages and returns an answer string.
//! [`OpenAIChat`] implements it against the OpenAI chat completions API (or
//! any compatible endpoint); [`DisabledAnswerer`] refuses every request.
//!
//! Failures (missing key, network, non-2xx status, malformed body) are
//! returned as [`AnswerError`] without retrying; whether to retry is the
//! caller's decision.

use async_trait::async_trait;
use docqa_core::retrieve::ScoredChunk;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::AnswerConfig;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the following text to answer the \
question accurately. If you are unsure or the answer doesn't appear in the text, say: \
'I'm not sure based on the document.'";

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("answer generation is disabled")]
    Disabled,
    #[error("OPENAI_API_KEY environment variable not set")]
    MissingApiKey,
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid chat response: {0}")]
    InvalidResponse(String),
}

/// Produces an answer to a question from supporting context.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Model identifier used for answers.
    fn model_name(&self) -> &str;

    async fn answer(&self, question: &str, context: &str) -> Result<String, AnswerError>;
}

/// Join retrieved chunk texts into one context string, best match first.
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// User message sent alongside the system prompt.
pub fn user_prompt(question: &str, context: &str) -> String {
    format!("Context:\n{}\n\nQuestion: {}", context, question)
}

/// Create the [`AnswerGenerator`] named by `config.provider`.
pub fn create_answerer(config: &AnswerConfig) -> anyhow::Result<Arc<dyn AnswerGenerator>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIChat::new(config)?)),
        "disabled" => Ok(Arc::new(DisabledAnswerer)),
        other => anyhow::bail!("Unknown answer provider: {}", other),
    }
}

/// An answer generator that always fails with [`AnswerError::Disabled`].
pub struct DisabledAnswerer;

#[async_trait]
impl AnswerGenerator for DisabledAnswerer {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn answer(&self, _question: &str, _context: &str) -> Result<String, AnswerError> {
        Err(AnswerError::Disabled)
    }
}

/// Chat completions client for OpenAI-compatible endpoints.
///
/// The API key is read from `OPENAI_API_KEY` at request time, so a server
/// can start without one and still serve retrieval.
pub struct OpenAIChat {
    client: reqwest::Client,
    url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIChat {
    pub fn new(config: &AnswerConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_CHAT_URL.to_string()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Extract the trimmed answer from a chat completions response body.
fn parse_chat_response(body: &str) -> Result<String, AnswerError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| AnswerError::InvalidResponse(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| AnswerError::InvalidResponse("response has no message content".to_string()))
}

#[async_trait]
impl AnswerGenerator for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn answer(&self, question: &str, context: &str) -> Result<String, AnswerError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| AnswerError::MissingApiKey)?;
        let prompt = user_prompt(question, context);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key.trim())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AnswerError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(model = %self.model, context_chars = context.len(), "received chat answer");
        parse_chat_response(&text)
    }
}
