//! The API manager: provider bring-up, request orchestration with retry,
//! usage accounting, and model discovery, behind one facade.

use crate::cache::ModelCache;
use crate::error::{classify_error, ApiError, ApiErrorKind, ApiManagerError};
use crate::model_manager::ModelManager;
use crate::registry::ProviderRegistry;
use crate::request::{RequestBuilder, TemperaturePurpose};
use crate::settings::{Settings, SettingsStore, DEEPL_IDENTIFIER};
use crate::types::{
    ApiUsage, ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageUrl, ModelSource,
    Provider, UsageSnapshot,
};
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(4);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// A provider is considered rate-limited after this many 429s without a
/// quiet period.
const RATE_LIMIT_HIT_THRESHOLD: u64 = 5;
/// Quiet minutes after which the rate-limit counter resets.
const RATE_LIMIT_RESET_IDLE_MINS: i64 = 5;

pub struct ApiManager {
    settings: SettingsStore,
    registry: Arc<ProviderRegistry>,
    cache: Arc<ModelCache>,
    request_builder: RequestBuilder,
    model_manager: ModelManager,
    usage: Mutex<HashMap<Provider, ApiUsage>>,
    initialized: AtomicBool,
    /// Warn about a malformed response shape once per session, not per call.
    shape_warned: AtomicBool,
}

impl ApiManager {
    pub fn new(settings: Settings, config_dir: &Path) -> Self {
        let store = SettingsStore::new(settings);
        let registry = Arc::new(ProviderRegistry::new(store.clone()));
        let cache = Arc::new(ModelCache::with_default_ttl(config_dir));
        let model_manager =
            ModelManager::new(cache.clone(), store.clone(), registry.clone());
        Self {
            request_builder: RequestBuilder::new(store.clone()),
            settings: store,
            registry,
            cache,
            model_manager,
            usage: Mutex::new(HashMap::new()),
            initialized: AtomicBool::new(false),
            shape_warned: AtomicBool::new(false),
        }
    }

    /// Bring up provider clients and load the model cache. Always leaves the
    /// manager initialized, even with zero clients, so model queries can
    /// still answer from defaults. Returns whether any client came up.
    pub fn initialize(&self) -> bool {
        let count = self.registry.initialize_all();
        self.cache.initialize_safely();
        self.initialized.store(true, Ordering::SeqCst);
        info!(clients = count, "API manager initialized");
        count > 0
    }

    /// Tear down and rebuild clients after a settings change. Usage counters
    /// and the in-memory model cache are reset alongside the clients.
    pub fn reinitialize(&self) -> bool {
        self.registry.clear();
        self.usage.lock().expect("usage lock poisoned").clear();
        self.cache.clear(None);
        self.initialize()
    }

    /// Tear everything down: clients, usage counters, and the in-memory
    /// model cache. The manager must be initialized again before use.
    pub fn shutdown(&self) {
        self.registry.clear();
        self.usage.lock().expect("usage lock poisoned").clear();
        self.cache.clear(None);
        self.initialized.store(false, Ordering::SeqCst);
        info!("API manager shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn has_clients(&self) -> bool {
        self.registry.has_any_clients()
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    fn ensure_initialized(&self) -> Result<(), ApiManagerError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(ApiManagerError::NotInitialized)
        }
    }

    fn active_provider(&self) -> Result<Provider, ApiManagerError> {
        let name = self.settings.snapshot().api_provider;
        name.parse()
            .map_err(|_| ApiManagerError::InvalidProvider(name))
    }

    // -----------------------------------------------------------------------
    // Request orchestration
    // -----------------------------------------------------------------------

    /// Dispatch a request to a provider with retry.
    ///
    /// Retryable failures back off exponentially (4s doubling, capped at
    /// 60s, honoring a provider Retry-After hint when larger) for up to
    /// three attempts. A model rejecting the `temperature` parameter gets
    /// one immediate re-send without it, outside the attempt budget.
    pub async fn make_request(
        &self,
        provider: Provider,
        request: ChatRequest,
    ) -> Result<ChatResponse, ApiManagerError> {
        self.ensure_initialized()?;
        let client = self
            .registry
            .get_client(provider)
            .ok_or_else(|| ApiManagerError::ProviderUnavailable(provider.to_string()))?;

        let mut request = request;
        let mut stripped_temperature = false;
        let mut attempt = 1u32;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            match client.chat_completion(&request).await {
                Ok(response) => {
                    self.record_success(provider, &response);
                    return Ok(response);
                }
                Err(e) => {
                    let err = classify_error(&e);
                    self.record_failure(provider, &err);

                    if !stripped_temperature
                        && request.temperature.is_some()
                        && is_temperature_rejection(&err)
                    {
                        warn!(provider = %provider, model = %request.model,
                            "model rejected temperature, retrying without it");
                        stripped_temperature = true;
                        request.temperature = None;
                        continue;
                    }

                    if err.is_retryable() && attempt < MAX_ATTEMPTS {
                        let mut delay = backoff;
                        if let Some(secs) = err.retry_after {
                            delay = delay.max(Duration::from_secs(secs));
                        }
                        let delay = delay.min(MAX_BACKOFF);
                        warn!(provider = %provider, attempt, delay_secs = delay.as_secs(),
                            "request failed, retrying: {err}");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                        continue;
                    }

                    return Err(err.into());
                }
            }
        }
    }

    /// Translate text with the configured provider.
    ///
    /// DeepL ignores the model hint, system prompt, and temperature; LLM
    /// providers require a model and take `temperature` as an override of
    /// the configured translation temperature. Returns the raw response
    /// together with the extracted text.
    pub async fn make_translation_request(
        &self,
        system_prompt: &str,
        text: &str,
        model: Option<&str>,
        temperature: Option<f64>,
        source_lang: Option<&str>,
        target_lang: Option<&str>,
    ) -> Result<(ChatResponse, String), ApiManagerError> {
        self.ensure_initialized()?;
        let provider = self.active_provider()?;

        let request = match provider {
            Provider::DeepL => self.request_builder.build_deepl_params(
                DEEPL_IDENTIFIER,
                vec![ChatMessage::user(text)],
                target_lang,
                source_lang,
            ),
            Provider::OpenAi | Provider::Google => {
                let model = model.ok_or_else(|| {
                    ApiManagerError::InvalidRequest("a model must be selected for LLM providers".into())
                })?;
                let mut messages = Vec::with_capacity(2);
                if !system_prompt.trim().is_empty() {
                    messages.push(ChatMessage::system(system_prompt));
                }
                messages.push(ChatMessage::user(text));
                self.request_builder.build_llm_params(
                    model,
                    messages,
                    TemperaturePurpose::Translation,
                    temperature,
                )?
            }
        };

        debug!(provider = %provider, model = %request.model, "translation request");
        let response = self.make_request(provider, request).await?;
        let text = self.extract_text_from_response(&response);
        Ok((response, text))
    }

    /// Describe or translate an image with a vision-capable provider.
    pub async fn make_vision_request(
        &self,
        prompt: &str,
        image_data_url: &str,
        model: &str,
    ) -> Result<(ChatResponse, String), ApiManagerError> {
        self.ensure_initialized()?;
        let provider = self.active_provider()?;
        if provider == Provider::DeepL {
            return Err(ApiManagerError::InvalidRequest(
                "vision requests require an LLM provider".into(),
            ));
        }
        if !image_data_url.starts_with("data:image/") {
            return Err(ApiManagerError::InvalidRequest(
                "image must be a data URL with an image/* MIME type".into(),
            ));
        }

        let messages = vec![ChatMessage::user_parts(vec![
            ContentPart::Text {
                text: prompt.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image_data_url.to_string(),
                },
            },
        ])];
        let request = self.request_builder.build_llm_params(
            model,
            messages,
            TemperaturePurpose::Vision,
            None,
        )?;

        debug!(provider = %provider, model = %request.model, "vision request");
        let response = self.make_request(provider, request).await?;
        let text = self.extract_text_from_response(&response);
        Ok((response, text))
    }

    /// Text of the first choice; an unexpected shape yields empty text and
    /// one session-wide warning.
    pub fn extract_text_from_response(&self, response: &ChatResponse) -> String {
        match response.first_text() {
            Some(text) => text.to_string(),
            None => {
                if !self.shape_warned.swap(true, Ordering::SeqCst) {
                    warn!("provider response had no text choice; returning empty text");
                }
                String::new()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Usage accounting
    // -----------------------------------------------------------------------

    fn record_success(&self, provider: Provider, response: &ChatResponse) {
        let mut usage = self.usage.lock().expect("usage lock poisoned");
        let entry = usage.entry(provider).or_default();
        entry.requests_count += 1;
        entry.successful_requests += 1;
        entry.last_request_time = Some(Utc::now());
        if let Some(tokens) = &response.usage {
            entry.tokens_used += tokens.total_tokens;
        }
    }

    fn record_failure(&self, provider: Provider, error: &ApiError) {
        let mut usage = self.usage.lock().expect("usage lock poisoned");
        let entry = usage.entry(provider).or_default();
        entry.requests_count += 1;
        entry.failed_requests += 1;
        if error.kind == ApiErrorKind::RateLimit {
            entry.rate_limit_hits += 1;
        }
    }

    pub fn usage_stats(&self, provider: Provider) -> UsageSnapshot {
        let usage = self.usage.lock().expect("usage lock poisoned");
        let entry = usage.get(&provider).cloned().unwrap_or_default();
        UsageSnapshot::from_usage(provider, &entry)
    }

    pub fn usage_stats_all(&self) -> Vec<UsageSnapshot> {
        let usage = self.usage.lock().expect("usage lock poisoned");
        Provider::ALL
            .into_iter()
            .map(|p| {
                let entry = usage.get(&p).cloned().unwrap_or_default();
                UsageSnapshot::from_usage(p, &entry)
            })
            .collect()
    }

    /// Whether a provider has tripped the local rate-limit heuristic. The
    /// counter resets after five quiet minutes.
    pub fn is_rate_limited(&self, provider: Provider) -> bool {
        let mut usage = self.usage.lock().expect("usage lock poisoned");
        let Some(entry) = usage.get_mut(&provider) else {
            return false;
        };
        if entry.rate_limit_hits <= RATE_LIMIT_HIT_THRESHOLD {
            return false;
        }
        if let Some(last) = entry.last_request_time {
            if Utc::now() - last > chrono::Duration::minutes(RATE_LIMIT_RESET_IDLE_MINS) {
                entry.rate_limit_hits = 0;
                return false;
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Model discovery
    // -----------------------------------------------------------------------

    pub async fn get_available_models(
        &self,
        provider: Provider,
        temp_api_key: Option<&str>,
    ) -> Result<(Vec<String>, ModelSource), ApiManagerError> {
        self.ensure_initialized()?;
        Ok(self
            .model_manager
            .get_available_models(provider, temp_api_key)
            .await)
    }
}

/// A provider's complaint that the model does not take a `temperature`
/// parameter, which the orchestrator answers by re-sending without one.
fn is_temperature_rejection(error: &ApiError) -> bool {
    if error.kind != ApiErrorKind::InvalidRequest {
        return false;
    }
    let lower = error.message.to_lowercase();
    lower.contains("temperature")
        && (lower.contains("unsupported_value")
            || lower.contains("unsupported value")
            || lower.contains("does not support"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorKind;
    use crate::providers::{ChatProvider, ProviderError};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Provider that plays back a script of outcomes and records every
    /// request it saw.
    struct ScriptedProvider {
        script: StdMutex<Vec<Result<ChatResponse, (u16, &'static str)>>>,
        seen: StdMutex<Vec<ChatRequest>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<ChatResponse, (u16, &'static str)>>) -> Self {
            Self {
                script: StdMutex::new(script),
                seen: StdMutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn chat_completion(
            &self,
            request: &ChatRequest,
        ) -> Result<ChatResponse, ProviderError> {
            self.seen.lock().unwrap().push(request.clone());
            let mut script = self.script.lock().unwrap();
            assert!(!script.is_empty(), "provider called more times than scripted");
            match script.remove(0) {
                Ok(response) => Ok(response),
                Err((status, body)) => Err(ProviderError::Http {
                    status,
                    body: body.into(),
                }),
            }
        }

        async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
            Ok(vec!["gpt-5-mini".into()])
        }
    }

    fn manager_with_fake(
        script: Vec<Result<ChatResponse, (u16, &'static str)>>,
    ) -> (ApiManager, Arc<ScriptedProvider>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let manager = ApiManager::new(Settings::default(), dir.path());
        manager.initialize();
        let fake = Arc::new(ScriptedProvider::new(script));
        manager.registry.insert(Provider::OpenAi, fake.clone());
        (manager, fake, dir)
    }

    fn simple_request() -> ChatRequest {
        let mut r = ChatRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")]);
        r.temperature = Some(0.3);
        r
    }

    #[tokio::test]
    async fn requests_fail_before_initialization() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ApiManager::new(Settings::default(), dir.path());
        let err = manager
            .make_request(Provider::OpenAi, simple_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiManagerError::NotInitialized));
    }

    #[tokio::test]
    async fn unregistered_provider_is_reported_unavailable() {
        let (manager, _fake, _dir) = manager_with_fake(vec![]);
        let err = manager
            .make_request(Provider::Google, simple_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiManagerError::ProviderUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_are_retried_up_to_three_attempts() {
        let (manager, fake, _dir) = manager_with_fake(vec![
            Err((503, "try later")),
            Err((503, "try later")),
            Ok(ChatResponse::from_text("Hallo", 7)),
        ]);

        let response = manager
            .make_request(Provider::OpenAi, simple_request())
            .await
            .unwrap();
        assert_eq!(response.first_text(), Some("Hallo"));
        assert_eq!(fake.requests().len(), 3);

        let stats = manager.usage_stats(Provider::OpenAi);
        assert_eq!(stats.requests_count, 3);
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.failed_requests, 2);
        assert_eq!(stats.tokens_used, 7);
        assert!(stats.last_request_time.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_stop_after_the_attempt_budget() {
        let (manager, fake, _dir) = manager_with_fake(vec![
            Err((503, "down")),
            Err((503, "down")),
            Err((503, "down")),
        ]);

        let err = manager
            .make_request(Provider::OpenAi, simple_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiManagerError::Api(e) if e.kind == ApiErrorKind::ServerError));
        assert_eq!(fake.requests().len(), 3);
    }

    #[tokio::test]
    async fn authentication_failures_are_not_retried() {
        let (manager, fake, _dir) = manager_with_fake(vec![Err((401, "invalid api key"))]);

        let err = manager
            .make_request(Provider::OpenAi, simple_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiManagerError::Api(e) if e.kind == ApiErrorKind::Authentication));
        assert_eq!(fake.requests().len(), 1);
    }

    #[tokio::test]
    async fn temperature_rejection_triggers_one_resend_without_it() {
        let (manager, fake, _dir) = manager_with_fake(vec![
            Err((400, "unsupported_value: 'temperature' does not support 0.3")),
            Ok(ChatResponse::from_text("ok", 1)),
        ]);

        let response = manager
            .make_request(Provider::OpenAi, simple_request())
            .await
            .unwrap();
        assert_eq!(response.first_text(), Some("ok"));

        let seen = fake.requests();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].temperature, Some(0.3));
        assert_eq!(seen[1].temperature, None);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_hits_accumulate_and_trip_the_heuristic() {
        let mut script: Vec<Result<ChatResponse, (u16, &'static str)>> = Vec::new();
        for _ in 0..6 {
            script.push(Err((429, "rate limit exceeded")));
        }
        let (manager, _fake, _dir) = manager_with_fake(script);

        // Two calls of three attempts each; every attempt is a 429.
        for _ in 0..2 {
            let err = manager
                .make_request(Provider::OpenAi, simple_request())
                .await
                .unwrap_err();
            assert!(matches!(err, ApiManagerError::Api(e) if e.kind == ApiErrorKind::RateLimit));
        }

        assert!(manager.is_rate_limited(Provider::OpenAi));
        assert!(!manager.is_rate_limited(Provider::Google));
        assert_eq!(manager.usage_stats(Provider::OpenAi).rate_limit_hits, 6);
    }

    #[tokio::test]
    async fn translation_request_builds_llm_messages() {
        let (manager, fake, _dir) =
            manager_with_fake(vec![Ok(ChatResponse::from_text("Hallo Welt", 12))]);

        let (_, text) = manager
            .make_translation_request(
                "Translate to German.",
                "Hello world",
                Some("gpt-4o-mini"),
                None,
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(text, "Hallo Welt");

        let seen = fake.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "gpt-4o-mini");
        assert_eq!(seen[0].messages.len(), 2);
        assert_eq!(seen[0].messages[0].role, crate::types::Role::System);
        assert!(seen[0].temperature.is_some());
        assert!(seen[0].max_completion_tokens.is_some());
    }

    #[tokio::test]
    async fn translation_temperature_override_reaches_the_wire() {
        let (manager, fake, _dir) =
            manager_with_fake(vec![Ok(ChatResponse::from_text("Hallo", 2))]);

        manager
            .make_translation_request(
                "sys",
                "Hello",
                Some("gpt-4o-mini"),
                Some(0.25),
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(fake.requests()[0].temperature, Some(0.25));
    }

    #[tokio::test]
    async fn translation_without_a_model_is_rejected_for_llms() {
        let (manager, _fake, _dir) = manager_with_fake(vec![]);
        let err = manager
            .make_translation_request("sys", "Hello", None, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiManagerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn deepl_translation_uses_the_synthetic_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.api_provider = "deepl".into();
        let manager = ApiManager::new(settings, dir.path());
        manager.initialize();
        let fake = Arc::new(ScriptedProvider::new(vec![Ok(ChatResponse::from_text(
            "Hallo", 0,
        ))]));
        manager.registry.insert(Provider::DeepL, fake.clone());

        let (_, text) = manager
            .make_translation_request("ignored", "Hello", None, None, Some("en"), Some("de"))
            .await
            .unwrap();
        assert_eq!(text, "Hallo");

        let seen = fake.requests();
        assert_eq!(seen[0].model, DEEPL_IDENTIFIER);
        assert_eq!(seen[0].target_lang.as_deref(), Some("de"));
        assert!(seen[0].temperature.is_none());
    }

    #[tokio::test]
    async fn vision_requests_require_an_image_data_url() {
        let (manager, _fake, _dir) = manager_with_fake(vec![]);
        let err = manager
            .make_vision_request("what is this", "https://example.com/cat.png", "gpt-4o")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiManagerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn vision_requests_carry_image_parts_and_vision_temperature() {
        let (manager, fake, _dir) =
            manager_with_fake(vec![Ok(ChatResponse::from_text("a cat", 3))]);

        let (_, text) = manager
            .make_vision_request("describe", "data:image/png;base64,AAAA", "gpt-4o")
            .await
            .unwrap();
        assert_eq!(text, "a cat");

        let seen = fake.requests();
        assert!(seen[0].has_image());
        // Vision defaults to temperature 0.0.
        assert_eq!(seen[0].temperature, Some(0.0));
    }

    #[tokio::test]
    async fn vision_is_refused_on_deepl() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.api_provider = "deepl".into();
        let manager = ApiManager::new(settings, dir.path());
        manager.initialize();

        let err = manager
            .make_vision_request("x", "data:image/png;base64,AAAA", "gpt-4o")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiManagerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn model_queries_are_init_guarded() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ApiManager::new(Settings::default(), dir.path());
        assert!(manager
            .get_available_models(Provider::OpenAi, None)
            .await
            .is_err());

        manager.initialize();
        let (models, source) = manager
            .get_available_models(Provider::OpenAi, None)
            .await
            .unwrap();
        assert_eq!(source, ModelSource::Unconfigured);
        assert!(models.is_empty());
    }

    #[tokio::test]
    async fn shutdown_clears_clients_usage_and_cache() {
        let (manager, _fake, _dir) =
            manager_with_fake(vec![Ok(ChatResponse::from_text("ok", 1))]);
        manager
            .make_request(Provider::OpenAi, simple_request())
            .await
            .unwrap();
        manager.cache.set("openai", vec!["gpt-5-mini".into()]);

        manager.shutdown();
        assert!(!manager.is_initialized());
        assert!(!manager.has_clients());
        assert_eq!(manager.usage_stats(Provider::OpenAi).requests_count, 0);
        assert!(!manager.cache.is_cached("openai"));
    }

    #[tokio::test]
    async fn reinitialize_resets_usage_and_clients() {
        let (manager, _fake, _dir) =
            manager_with_fake(vec![Ok(ChatResponse::from_text("ok", 1))]);
        manager
            .make_request(Provider::OpenAi, simple_request())
            .await
            .unwrap();
        assert_eq!(manager.usage_stats(Provider::OpenAi).requests_count, 1);

        manager.reinitialize();
        assert_eq!(manager.usage_stats(Provider::OpenAi).requests_count, 0);
        assert!(!manager.has_clients());
        assert!(manager.is_initialized());
    }

    #[test]
    fn shape_warning_fires_once_and_yields_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ApiManager::new(Settings::default(), dir.path());
        let empty = ChatResponse::default();
        assert_eq!(manager.extract_text_from_response(&empty), "");
        assert_eq!(manager.extract_text_from_response(&empty), "");
        assert!(manager.shape_warned.load(Ordering::SeqCst));
    }

    #[test]
    fn usage_stats_all_covers_every_provider() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ApiManager::new(Settings::default(), dir.path());
        let all = manager.usage_stats_all();
        assert_eq!(all.len(), Provider::ALL.len());
        assert!(all.iter().all(|s| s.requests_count == 0));
    }
}
