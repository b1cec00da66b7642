//! Request construction: temperature policy and completion-token budgets.

use crate::model_limits::{
    calculate_dynamic_completion_tokens, LimitsError, DEFAULT_MIN_OUTPUT_TOKENS,
    DEFAULT_OUTPUT_SAFETY_MARGIN,
};
use crate::settings::SettingsStore;
use crate::types::{ChatMessage, ChatRequest};
use tracing::debug;

/// Model families that reject a `temperature` parameter.
const FIXED_TEMPERATURE_PREFIXES: &[&str] = &["o1-", "o3-", "gpt-5"];

/// Whether a model accepts a caller-chosen temperature. Reasoning models
/// only run at their fixed default.
pub fn model_supports_temperature(model: &str) -> bool {
    let lower = model.to_lowercase();
    !FIXED_TEMPERATURE_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Clamp a requested temperature to what the model accepts.
pub fn adjust_temperature_for_model(model: &str, temperature: f64) -> f64 {
    if model_supports_temperature(model) {
        temperature
    } else {
        if (temperature - 1.0).abs() > f64::EPSILON {
            debug!(model, temperature, "model runs at fixed temperature 1.0");
        }
        1.0
    }
}

/// What the request is for; selects which configured temperature applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperaturePurpose {
    Translation,
    Vision,
}

pub struct RequestBuilder {
    settings: SettingsStore,
}

impl RequestBuilder {
    pub fn new(settings: SettingsStore) -> Self {
        Self { settings }
    }

    /// Effective (temperature, max_completion_tokens) for a model.
    ///
    /// The temperature comes from the explicit override or the configured
    /// per-purpose value, rounded to two decimals and clamped to the model's
    /// constraints. The token budget is derived from the model's limit table.
    pub fn resolve_llm_temperature_and_limits(
        &self,
        model: &str,
        purpose: TemperaturePurpose,
        temperature_override: Option<f64>,
    ) -> Result<(f64, u32), LimitsError> {
        let settings = self.settings.snapshot();
        let configured = match purpose {
            TemperaturePurpose::Translation => settings.llm_temperature_translation,
            TemperaturePurpose::Vision => settings.llm_temperature_vision,
        };
        let requested = temperature_override.unwrap_or(configured);
        let rounded = (requested * 100.0).round() / 100.0;
        let temperature = adjust_temperature_for_model(model, rounded);

        let max_tokens = calculate_dynamic_completion_tokens(
            model,
            DEFAULT_MIN_OUTPUT_TOKENS,
            DEFAULT_OUTPUT_SAFETY_MARGIN,
        )?;
        Ok((temperature, max_tokens))
    }

    /// A fully-resolved request for the LLM providers.
    pub fn build_llm_params(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        purpose: TemperaturePurpose,
        temperature_override: Option<f64>,
    ) -> Result<ChatRequest, LimitsError> {
        let (temperature, max_tokens) =
            self.resolve_llm_temperature_and_limits(model, purpose, temperature_override)?;
        let mut request = ChatRequest::new(model, messages);
        request.temperature = Some(temperature);
        request.max_completion_tokens = Some(max_tokens);
        Ok(request)
    }

    /// A request for DeepL: no temperature, no token budget, just the text
    /// and language pair.
    pub fn build_deepl_params(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        target_lang: Option<&str>,
        source_lang: Option<&str>,
    ) -> ChatRequest {
        let mut request = ChatRequest::new(model, messages);
        request.target_lang = target_lang.map(str::to_string);
        request.source_lang = source_lang.map(str::to_string);
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Settings, SettingsStore};

    fn builder() -> RequestBuilder {
        RequestBuilder::new(SettingsStore::default())
    }

    #[test]
    fn reasoning_models_have_fixed_temperature() {
        assert!(!model_supports_temperature("gpt-5-nano"));
        assert!(!model_supports_temperature("GPT-5"));
        assert!(!model_supports_temperature("o1-preview"));
        assert!(!model_supports_temperature("o3-mini"));
        assert!(model_supports_temperature("gpt-4o-mini"));
        assert!(model_supports_temperature("gemini-2.5-flash"));
    }

    #[test]
    fn temperature_adjustment_pins_reasoning_models_to_one() {
        assert_eq!(adjust_temperature_for_model("gpt-5-nano", 0.2), 1.0);
        assert_eq!(adjust_temperature_for_model("gpt-4o-mini", 0.2), 0.2);
    }

    #[test]
    fn override_beats_configured_temperature() {
        let (temp, _) = builder()
            .resolve_llm_temperature_and_limits(
                "gpt-4o-mini",
                TemperaturePurpose::Translation,
                Some(0.456),
            )
            .unwrap();
        assert_eq!(temp, 0.46);
    }

    #[test]
    fn purpose_selects_the_configured_temperature() {
        let mut settings = Settings::default();
        settings.llm_temperature_translation = 0.7;
        settings.llm_temperature_vision = 0.1;
        let builder = RequestBuilder::new(SettingsStore::new(settings));

        let (translation, _) = builder
            .resolve_llm_temperature_and_limits(
                "gemini-2.5-flash",
                TemperaturePurpose::Translation,
                None,
            )
            .unwrap();
        assert_eq!(translation, 0.7);

        let (vision, _) = builder
            .resolve_llm_temperature_and_limits("gemini-2.5-flash", TemperaturePurpose::Vision, None)
            .unwrap();
        assert_eq!(vision, 0.1);
    }

    #[test]
    fn token_budget_comes_from_the_limit_table() {
        let (_, tokens) = builder()
            .resolve_llm_temperature_and_limits(
                "gpt-5-nano",
                TemperaturePurpose::Translation,
                None,
            )
            .unwrap();
        // floor(32768 * 0.9) = 29491
        assert_eq!(tokens, 29491);
    }

    #[test]
    fn llm_params_carry_temperature_and_budget() {
        let request = builder()
            .build_llm_params(
                "gpt-4o-mini",
                vec![ChatMessage::user("hi")],
                TemperaturePurpose::Translation,
                None,
            )
            .unwrap();
        assert_eq!(request.temperature, Some(1.0));
        assert!(request.max_completion_tokens.is_some());
        assert!(request.target_lang.is_none());
    }

    #[test]
    fn deepl_params_skip_llm_knobs() {
        let request = builder().build_deepl_params(
            "deepl-translate",
            vec![ChatMessage::user("Hello")],
            Some("de"),
            Some("auto"),
        );
        assert!(request.temperature.is_none());
        assert!(request.max_completion_tokens.is_none());
        assert_eq!(request.target_lang.as_deref(), Some("de"));
        assert_eq!(request.source_lang.as_deref(), Some("auto"));
    }

    #[test]
    fn empty_model_is_rejected() {
        let err = builder()
            .resolve_llm_temperature_and_limits("", TemperaturePurpose::Translation, None)
            .unwrap_err();
        assert_eq!(err, LimitsError::EmptyModel);
    }
}
