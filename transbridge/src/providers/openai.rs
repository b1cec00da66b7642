//! OpenAI chat-completions adapter.
//!
//! Thin pass-through to the REST API; gpt-5-family models get reasoning
//! hints attached before dispatch.

use super::{ChatProvider, ProviderError};
use crate::sanitize;
use crate::types::{ChatMessage, ChatRequest, ChatResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::InvalidInput("OpenAI API key is required".into()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

}

#[derive(Serialize)]
struct CompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verbosity: Option<&'static str>,
}

fn build_body<'a>(request: &'a ChatRequest) -> CompletionsRequest<'a> {
    // gpt-5 models take reasoning hints; translation work wants the minimum.
    let is_gpt5 = request.model.to_lowercase().starts_with("gpt-5");
    CompletionsRequest {
        model: &request.model,
        messages: &request.messages,
        temperature: request.temperature,
        max_completion_tokens: request.max_completion_tokens,
        reasoning_effort: is_gpt5.then_some("minimal"),
        verbosity: is_gpt5.then_some("low"),
    }
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

/// Keep only ids that plausibly serve chat completions.
fn is_chat_model(id: &str) -> bool {
    let lower = id.to_lowercase();
    lower.starts_with("gpt-") || lower.starts_with("chatgpt-")
}

#[async_trait]
impl ChatProvider for OpenAiAdapter {
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = build_body(request);
        debug!(model = %request.model, "openai chat completion request");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: sanitize::sanitize_api_error(&body),
            });
        }

        let text = resp.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&text)?;
        Ok(parsed)
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let resp = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: sanitize::sanitize_api_error(&body),
            });
        }

        let parsed: ModelsResponse = serde_json::from_str(&resp.text().await?)?;
        let models = parsed
            .data
            .into_iter()
            .map(|m| m.id)
            .filter(|id| is_chat_model(id))
            .collect();
        Ok(models)
    }
}
