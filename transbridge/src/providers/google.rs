//! Google Generative AI (Gemini) adapter.
//!
//! Speaks the generateContent REST API and reshapes its responses into the
//! OpenAI-compatible form. Multimodal requests carry images as base64
//! data URLs which are validated and decoded before any network call.

use super::{ChatProvider, ProviderError};
use crate::sanitize;
use crate::types::{ChatRequest, ChatResponse, ContentPart, MessageContent, Role};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Hard cap on image payloads, applied to both the encoded string and the
/// decoded bytes.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub struct GoogleAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleAdapter {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::InvalidInput("Google API key is required".into()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn image(mime_type: String, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData { mime_type, data }),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    include_thoughts: bool,
    thinking_budget: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

#[derive(Deserialize)]
struct ModelsListResponse {
    models: Option<Vec<ModelInfo>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    supported_generation_methods: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Request construction
// ---------------------------------------------------------------------------

/// Split a `data:image/...;base64,...` URL into (mime type, base64 payload),
/// enforcing the image MIME family and size caps.
fn decode_data_url(url: &str) -> Result<(String, String), ProviderError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| ProviderError::InvalidInput("image URL must be a data URL".into()))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| ProviderError::InvalidInput("data URL must be base64-encoded".into()))?;

    let mime_ok = mime
        .strip_prefix("image/")
        .is_some_and(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-')));
    if !mime_ok {
        return Err(ProviderError::InvalidInput(format!(
            "unsupported image MIME type '{mime}'"
        )));
    }

    if payload.is_empty() {
        return Err(ProviderError::InvalidInput("data URL has an empty payload".into()));
    }
    if payload.len() > MAX_IMAGE_BYTES {
        return Err(ProviderError::InvalidInput("encoded image exceeds 10MB".into()));
    }

    let decoded = BASE64
        .decode(payload)
        .map_err(|e| ProviderError::InvalidInput(format!("invalid base64 image data: {e}")))?;
    if decoded.len() > MAX_IMAGE_BYTES {
        return Err(ProviderError::InvalidInput("decoded image exceeds 10MB".into()));
    }

    Ok((mime.to_string(), payload.to_string()))
}

/// Join all system-role message text into one system instruction.
fn system_text(request: &ChatRequest) -> Option<String> {
    let text = request
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.text())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

/// Flatten user/assistant text into a single prompt string.
fn prompt_text(request: &ChatRequest) -> String {
    request
        .messages
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant))
        .map(|m| m.content.text())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_contents(request: &ChatRequest) -> Result<Vec<Content>, ProviderError> {
    let mut parts = Vec::new();

    let prompt = prompt_text(request);
    if !prompt.is_empty() {
        parts.push(Part::text(prompt));
    }

    if request.has_image() {
        for message in &request.messages {
            if message.role != Role::User {
                continue;
            }
            if let MessageContent::Parts(message_parts) = &message.content {
                for part in message_parts {
                    if let ContentPart::ImageUrl { image_url } = part {
                        let (mime, data) = decode_data_url(&image_url.url)?;
                        parts.push(Part::image(mime, data));
                    }
                }
            }
        }
    }

    if parts.is_empty() {
        parts.push(Part::text("Hello"));
    }

    Ok(vec![Content {
        role: "user".into(),
        parts,
    }])
}

fn build_body(request: &ChatRequest) -> Result<GenerateContentRequest, ProviderError> {
    // Gemini 3 models think by default; translation calls do not need it.
    let thinking_config = request
        .model
        .to_lowercase()
        .starts_with("gemini-3")
        .then_some(ThinkingConfig {
            include_thoughts: false,
            thinking_budget: 0,
        });

    Ok(GenerateContentRequest {
        contents: build_contents(request)?,
        system_instruction: system_text(request).map(|text| SystemInstruction {
            parts: vec![Part::text(text)],
        }),
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_completion_tokens,
            thinking_config,
        },
    })
}

// ---------------------------------------------------------------------------
// Response extraction
// ---------------------------------------------------------------------------

fn extract_text(resp: &GenerateContentResponse) -> String {
    let mut out = String::new();
    for candidate in &resp.candidates {
        let parts = candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.as_ref());
        if let Some(parts) = parts {
            for part in parts {
                if let Some(text) = &part.text {
                    out.push_str(text);
                }
            }
        }
    }
    out
}

fn extract_total_tokens(resp: &GenerateContentResponse) -> u64 {
    match &resp.usage_metadata {
        Some(um) => um.total_token_count.unwrap_or_else(|| {
            um.prompt_token_count.unwrap_or(0) + um.candidates_token_count.unwrap_or(0)
        }),
        None => 0,
    }
}

#[async_trait]
impl ChatProvider for GoogleAdapter {
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = build_body(request)?;
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );
        debug!(model = %request.model, multimodal = request.has_image(), "google chat completion request");

        let resp = self.client.post(&url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: sanitize::sanitize_api_error(&body),
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&resp.text().await?)?;
        let text = extract_text(&parsed);
        let total_tokens = extract_total_tokens(&parsed);

        let mut out = ChatResponse::from_text(text, total_tokens);
        out.model = Some(request.model.clone());
        Ok(out)
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/models?key={}", self.base_url, self.api_key);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: sanitize::sanitize_api_error(&body),
            });
        }

        let parsed: ModelsListResponse = serde_json::from_str(&resp.text().await?)?;
        let models = parsed
            .models
            .unwrap_or_default()
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .as_ref()
                    .is_some_and(|methods| methods.iter().any(|g| g == "generateContent"))
            })
            .map(|m| m.name.strip_prefix("models/").unwrap_or(&m.name).to_string())
            .collect();
        Ok(models)
    }
}
