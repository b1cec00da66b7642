use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Supported translation/LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    Google,
    #[serde(rename = "deepl")]
    DeepL,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Google, Provider::DeepL];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Google => "google",
            Provider::DeepL => "deepl",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "google" => Ok(Provider::Google),
            "deepl" => Ok(Provider::DeepL),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Error for provider names that are not part of the closed set.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown provider '{0}'")]
pub struct UnknownProvider(pub String);

/// Where a returned model list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Cache,
    Api,
    ApiTempKey,
    Unconfigured,
    Fallback,
    Error,
}

impl ModelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSource::Cache => "cache",
            ModelSource::Api => "api",
            ModelSource::ApiTempKey => "api_temp_key",
            ModelSource::Unconfigured => "unconfigured",
            ModelSource::Fallback => "fallback",
            ModelSource::Error => "error",
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Usage tracking
// ---------------------------------------------------------------------------

/// Per-provider request counters, mutated only under the manager's lock.
#[derive(Debug, Clone, Default)]
pub struct ApiUsage {
    pub requests_count: u64,
    pub tokens_used: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_request_time: Option<DateTime<Utc>>,
    pub rate_limit_hits: u64,
}

/// Snapshot of one provider's usage, as handed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct UsageSnapshot {
    pub provider: Provider,
    pub requests_count: u64,
    pub tokens_used: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub last_request_time: Option<DateTime<Utc>>,
    pub rate_limit_hits: u64,
}

impl UsageSnapshot {
    pub fn from_usage(provider: Provider, usage: &ApiUsage) -> Self {
        let success_rate = if usage.requests_count > 0 {
            usage.successful_requests as f64 / usage.requests_count as f64 * 100.0
        } else {
            0.0
        };
        Self {
            provider,
            requests_count: usage.requests_count,
            tokens_used: usage.tokens_used,
            successful_requests: usage.successful_requests,
            failed_requests: usage.failed_requests,
            success_rate,
            last_request_time: usage.last_request_time,
            rate_limit_hits: usage.rate_limit_hits,
        }
    }
}

// ---------------------------------------------------------------------------
// Chat messages (OpenAI wire shape)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One content part of a multimodal message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Message content: plain text or a list of multimodal parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    pub fn has_image(&self) -> bool {
        match self {
            MessageContent::Text(_) => false,
            MessageContent::Parts(parts) => parts
                .iter()
                .any(|p| matches!(p, ContentPart::ImageUrl { .. })),
        }
    }

    /// Concatenated text of the content, ignoring image parts.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests & normalized responses
// ---------------------------------------------------------------------------

/// The fully-resolved parameter set for one provider call.
///
/// `target_lang`/`source_lang` are only meaningful for DeepL; `None` values
/// never reach the wire.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_completion_tokens: Option<u32>,
    pub target_lang: Option<String>,
    pub source_lang: Option<String>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_completion_tokens: None,
            target_lang: None,
            source_lang: None,
        }
    }

    pub fn has_image(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.role == Role::User && m.content.has_image())
    }
}

/// OpenAI-compatible chat-completion response, the one shape every adapter
/// produces regardless of vendor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub total_tokens: u64,
}

impl ChatResponse {
    /// Build a response from plain text, used by adapters whose vendors do
    /// not speak the OpenAI shape natively.
    pub fn from_text(text: impl Into<String>, total_tokens: u64) -> Self {
        Self {
            choices: vec![Choice {
                message: ResponseMessage {
                    content: Some(text.into()),
                },
            }],
            usage: Some(TokenUsage { total_tokens }),
            model: None,
        }
    }

    /// Text of the first choice, if the response has one.
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}
