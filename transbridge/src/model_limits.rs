//! Per-model output-token limits.
//!
//! Values are hard output caps (completion tokens, not context window) per
//! provider documentation. Sending a larger `max_completion_tokens` than the
//! model allows is rejected with an invalid-request error, so requests are
//! budgeted against this table up front.

use thiserror::Error;
use tracing::{debug, warn};

/// Hard output caps keyed by model-id prefix. Lookup is exact match first,
/// then longest matching prefix, so "gpt-5-nano" wins over "gpt-5".
const MODEL_TOKEN_LIMITS: &[(&str, u32)] = &[
    // OpenAI
    ("gpt-4o-mini", 16_384),
    ("gpt-4o", 16_384),
    ("gpt-4-turbo", 4_096),
    ("gpt-4", 4_096),
    ("o1-", 100_000),
    ("o3-", 100_000),
    ("gpt-5", 128_000),
    ("gpt-5-mini", 128_000),
    ("gpt-5-nano", 32_768),
    ("gpt-5.2", 128_000),
    // Google
    ("gemini-1.5-flash", 8_192),
    ("gemini-1.5-flash-8b", 8_192),
    ("gemini-1.5-pro", 8_192),
    ("gemini-2.0-flash", 8_192),
    ("gemini-2.5-flash", 65_536),
    ("gemini-2.5-pro", 65_536),
    ("gemini-pro", 2_048),
    ("gemini-3", 65_536),
];

/// Conservative cap for models missing from the table.
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 4_096;

/// Minimum output reservation so responses are never starved.
pub const DEFAULT_MIN_OUTPUT_TOKENS: u32 = 2_048;

/// Fraction of the output cap held back for provider accounting variance.
pub const DEFAULT_OUTPUT_SAFETY_MARGIN: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LimitsError {
    #[error("model must be a non-empty string")]
    EmptyModel,
    #[error("output_safety_margin must be in [0.0, 1.0), got {0}")]
    InvalidSafetyMargin(f64),
    #[error("min_output_tokens must be positive")]
    NonPositiveMinTokens,
    #[error("min_output_tokens ({min}) exceeds output limit ({max}) for '{model}'")]
    MinExceedsModelMax { min: u32, max: u32, model: String },
}

/// Maximum completion tokens for a model, or the conservative default when
/// the model is unknown.
pub fn model_max_completion_tokens(model: &str) -> u32 {
    let model = model.trim().to_lowercase();
    if model.is_empty() {
        return DEFAULT_MAX_COMPLETION_TOKENS;
    }

    if let Some((_, limit)) = MODEL_TOKEN_LIMITS.iter().find(|(id, _)| *id == model) {
        return *limit;
    }

    // Longest-prefix match over the registry.
    let best = MODEL_TOKEN_LIMITS
        .iter()
        .filter(|(prefix, _)| model.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len());
    if let Some((prefix, limit)) = best {
        debug!("model '{model}' matched limit prefix '{prefix}' -> {limit}");
        return *limit;
    }

    warn!("unknown model '{model}', using default max_completion_tokens={DEFAULT_MAX_COMPLETION_TOKENS}");
    DEFAULT_MAX_COMPLETION_TOKENS
}

/// Compute a safe `max_completion_tokens` for a request.
///
/// Reserves `output_safety_margin` of the model's output cap, never drops
/// below `min_output_tokens`, and never exceeds the hard cap.
pub fn calculate_dynamic_completion_tokens(
    model: &str,
    min_output_tokens: u32,
    output_safety_margin: f64,
) -> Result<u32, LimitsError> {
    if model.trim().is_empty() {
        return Err(LimitsError::EmptyModel);
    }
    if !(0.0..1.0).contains(&output_safety_margin) {
        return Err(LimitsError::InvalidSafetyMargin(output_safety_margin));
    }
    if min_output_tokens == 0 {
        return Err(LimitsError::NonPositiveMinTokens);
    }

    let max_model_output = model_max_completion_tokens(model);
    if min_output_tokens > max_model_output {
        return Err(LimitsError::MinExceedsModelMax {
            min: min_output_tokens,
            max: max_model_output,
            model: model.to_string(),
        });
    }

    let available = (max_model_output as f64 * (1.0 - output_safety_margin)).floor() as u32;
    let final_tokens = min_output_tokens.max(available).min(max_model_output);

    debug!(
        "model {model}: output limit {max_model_output}, available {available}, final {final_tokens}"
    );
    Ok(final_tokens)
}
