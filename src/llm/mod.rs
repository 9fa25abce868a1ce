//! Outbound language-model collaborators.
//!
//! [`ChatProvider`] and [`EmbeddingProvider`] are the narrow contracts the chat
//! and knowledge operations depend on. The concrete clients speak the
//! OpenAI-compatible HTTP API: one attempt per call, fixed timeout, no retry.

pub mod chat;
pub mod embeddings;

use serde::{Deserialize, Serialize};

pub use chat::OpenAiCompatibleChat;
pub use embeddings::OpenAiEmbeddings;

// ── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 900,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider not configured: {0}")]
    NotConfigured(String),
    #[error("provider request failed: {0}")]
    RequestFailed(String),
    #[error("provider response parse error: {0}")]
    ParseError(String),
    #[error("provider request timed out")]
    Timeout,
    #[error("provider unreachable: {0}")]
    Unreachable(String),
    #[error("embedding count mismatch: sent {expected} texts, got {got} vectors")]
    CountMismatch { expected: usize, got: usize },
}

impl LlmError {
    fn from_send(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Unreachable(e.to_string())
        } else {
            Self::RequestFailed(e.to_string())
        }
    }
}

// ── Traits ──────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    /// One completion for `messages`; the reply text of the first choice.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<String, LlmError>;

    fn name(&self) -> &str;
}

#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One vector per input, in input order.
    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>, LlmError>;

    /// Model used when the caller does not name one.
    fn default_model(&self) -> &str;
}

/// Turn a non-success response into `RequestFailed` carrying status and body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(LlmError::RequestFailed(format!("HTTP {status}: {body}")))
}
