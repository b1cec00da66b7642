//! Multi-provider translation API client: OpenAI and Gemini chat models plus
//! DeepL behind one request/response shape, with model discovery, a
//! disk-persisted model cache, and retrying request orchestration.

pub mod cache;
pub mod error;
pub mod manager;
pub mod model_limits;
pub mod model_manager;
pub mod providers;
pub mod registry;
pub mod request;
pub mod sanitize;
pub mod settings;
pub mod types;

// Re-exports for convenience
pub use cache::{ModelCache, DEFAULT_CACHE_TTL};
pub use error::{classify_error, ApiError, ApiErrorKind, ApiManagerError};
pub use manager::ApiManager;
pub use model_limits::{calculate_dynamic_completion_tokens, model_max_completion_tokens};
pub use model_manager::ModelManager;
pub use providers::{ChatProvider, ProviderError};
pub use registry::ProviderRegistry;
pub use request::{RequestBuilder, TemperaturePurpose};
pub use settings::{
    validate_api_key_format, Settings, SettingsManager, SettingsStore, DEEPL_IDENTIFIER,
};
pub use types::*;
