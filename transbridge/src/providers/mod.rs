pub mod deepl;
pub mod google;
pub mod openai;

use crate::types::{ChatRequest, ChatResponse};
use async_trait::async_trait;

/// Errors from provider operations. Adapters never swallow failures; the
/// orchestrator classifies these into the closed error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed input detected before any network call (missing image,
    /// bad data URL, empty key).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ProviderError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            ProviderError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Uniform surface over a vendor API: one chat-completion call, one model
/// listing. Every provider (OpenAI, Google, DeepL) implements this trait and
/// returns responses in the OpenAI-compatible shape.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Execute a chat completion (or, for DeepL, a translation dressed as one).
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// List model ids available from this provider.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError>;
}
