//! DeepL adapter.
//!
//! DeepL is not an LLM: user-role text is concatenated into one blob and
//! POSTed to the translate endpoint, and the single result is wrapped in the
//! same OpenAI-compatible response shape the LLM adapters produce.

use super::{ChatProvider, ProviderError};
use crate::sanitize;
use crate::settings::DEEPL_IDENTIFIER;
use crate::types::{ChatRequest, ChatResponse, Role};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const FREE_BASE_URL: &str = "https://api-free.deepl.com";
const PRO_BASE_URL: &str = "https://api.deepl.com";

pub struct DeepLAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

impl DeepLAdapter {
    pub fn new(api_key: &str, timeout: Duration, plan: &str) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::InvalidInput("DeepL API key is required".into()));
        }
        let base_url = if plan.trim().eq_ignore_ascii_case("pro") {
            PRO_BASE_URL
        } else {
            FREE_BASE_URL
        };
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            base_url: base_url.to_string(),
        })
    }
}

/// Normalize an ISO language code to DeepL's expected format.
///
/// Uppercases plain codes, maps `ua` to DeepL's `UK`, passes through
/// already-formatted codes like `EN-US`, and treats `auto`/empty as
/// "let DeepL detect" (None).
pub fn normalize_lang_code(code: &str) -> Option<String> {
    let trimmed = code.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
        return None;
    }
    let upper = trimmed.to_uppercase();
    if upper == "UA" {
        return Some("UK".into());
    }
    Some(upper)
}

/// Concatenate user-role message text into the translation input.
fn collect_user_text(request: &ChatRequest) -> String {
    request
        .messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.text())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Form fields for the translate call; `source_lang` is omitted when DeepL
/// should detect the source.
fn build_form(request: &ChatRequest) -> Vec<(&'static str, String)> {
    let target_lang = request
        .target_lang
        .as_deref()
        .and_then(normalize_lang_code)
        .unwrap_or_else(|| "EN".into());

    let mut form = vec![
        ("text", collect_user_text(request)),
        ("target_lang", target_lang),
    ];
    if let Some(source) = request.source_lang.as_deref().and_then(normalize_lang_code) {
        form.push(("source_lang", source));
    }
    form
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
struct Translation {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl ChatProvider for DeepLAdapter {
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let form = build_form(request);
        debug!(target_lang = %form[1].1, "deepl translate request");

        let resp = self
            .client
            .post(format!("{}/v2/translate", self.base_url))
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&form)
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

        let parsed: TranslateResponse = serde_json::from_str(&resp.text().await?)?;
        let translated = parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .unwrap_or_default();

        // DeepL has no token concept; usage stays at zero.
        let mut out = ChatResponse::from_text(translated, 0);
        out.model = Some(DEEPL_IDENTIFIER.to_string());
        Ok(out)
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        // No model selection at DeepL; expose the single synthetic id.
        Ok(vec![DEEPL_IDENTIFIER.to_string()])
    }
}
