//! Error taxonomy and classification.
//!
//! Provider failures arrive as `ProviderError` and are mapped into a closed
//! `ApiErrorKind` set by an ordered rule table. The retry loop in the manager
//! inspects `ApiError::is_retryable` directly instead of signalling retries
//! through a wrapper exception type.

use crate::model_limits::LimitsError;
use crate::providers::ProviderError;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Closed set of API failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Authentication,
    RateLimit,
    QuotaExceeded,
    Network,
    Timeout,
    InvalidRequest,
    ServerError,
    Unknown,
}

impl ApiErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorKind::Authentication => "authentication",
            ApiErrorKind::RateLimit => "rate_limit",
            ApiErrorKind::QuotaExceeded => "quota_exceeded",
            ApiErrorKind::Network => "network",
            ApiErrorKind::Timeout => "timeout",
            ApiErrorKind::InvalidRequest => "invalid_request",
            ApiErrorKind::ServerError => "server_error",
            ApiErrorKind::Unknown => "unknown",
        }
    }
}

/// A classified API failure. Created fresh per failure, never persisted.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}: {}", .kind.as_str(), .message)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub status_code: Option<u16>,
    /// Provider-suggested wait before the next attempt, seconds.
    pub retry_after: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            retry_after: None,
            timestamp: Utc::now(),
        }
    }

    /// Whether the orchestrator should retry this failure. Quota exhaustion
    /// is classified but excluded: retrying cannot help within the backoff
    /// window, so it surfaces immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::RateLimit
                | ApiErrorKind::Network
                | ApiErrorKind::Timeout
                | ApiErrorKind::ServerError
        )
    }
}

// ---------------------------------------------------------------------------
// Classification rules
// ---------------------------------------------------------------------------

struct KeywordRule {
    kind: ApiErrorKind,
    keywords: &'static [&'static str],
    /// HTTP statuses that also satisfy this rule.
    statuses: &'static [u16],
}

/// Ordered rules; the first match wins. Rate-limit precedes quota so
/// "rate limit exceeded" is never misread as a quota failure, and both
/// precede the generic network bucket.
const RULES: &[KeywordRule] = &[
    KeywordRule {
        kind: ApiErrorKind::Authentication,
        keywords: &[
            "unauthorized",
            "invalid api key",
            "incorrect api key",
            "authentication",
            "api key not valid",
            "permission denied",
        ],
        statuses: &[401, 403],
    },
    KeywordRule {
        kind: ApiErrorKind::RateLimit,
        keywords: &["rate limit", "too many requests", "resource_exhausted"],
        statuses: &[429],
    },
    KeywordRule {
        kind: ApiErrorKind::QuotaExceeded,
        keywords: &["quota", "billing", "insufficient_quota"],
        statuses: &[],
    },
    KeywordRule {
        kind: ApiErrorKind::Timeout,
        keywords: &["timed out", "timeout"],
        statuses: &[408],
    },
    KeywordRule {
        kind: ApiErrorKind::Network,
        keywords: &["network", "connect", "dns", "channel closed"],
        statuses: &[],
    },
    KeywordRule {
        kind: ApiErrorKind::InvalidRequest,
        keywords: &["invalid", "bad request", "malformed", "unsupported"],
        statuses: &[400, 422],
    },
];

fn parse_retry_after_secs(message: &str) -> Option<u64> {
    let lower = message.to_lowercase();
    for prefix in &["retry-after:", "retry_after:", "retry-after ", "retry_after "] {
        if let Some(pos) = lower.find(prefix) {
            let after = &lower[pos + prefix.len()..];
            let num: String = after
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if let Ok(secs) = num.parse::<f64>() {
                if secs.is_finite() && secs >= 0.0 {
                    return Some(Duration::from_secs_f64(secs).as_secs());
                }
            }
        }
    }
    None
}

/// Map an arbitrary provider failure into the closed taxonomy.
pub fn classify_error(error: &ProviderError) -> ApiError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    let status = error.status_code();

    // Transport-level failures carry their category in the error itself;
    // check them ahead of the keyword table so a body that happens to
    // mention "invalid" cannot shadow a timeout.
    if let ProviderError::Network(e) = error {
        if e.is_timeout() {
            return ApiError {
                kind: ApiErrorKind::Timeout,
                message,
                status_code: status,
                retry_after: None,
                timestamp: Utc::now(),
            };
        }
        if e.is_connect() {
            return ApiError {
                kind: ApiErrorKind::Network,
                message,
                status_code: status,
                retry_after: None,
                timestamp: Utc::now(),
            };
        }
    }

    for rule in RULES {
        let keyword_hit = rule.keywords.iter().any(|kw| lower.contains(kw));
        let status_hit = status.is_some_and(|s| rule.statuses.contains(&s));
        if keyword_hit || status_hit {
            let retry_after = if rule.kind == ApiErrorKind::RateLimit {
                parse_retry_after_secs(&message)
            } else {
                None
            };
            return ApiError {
                kind: rule.kind,
                message,
                status_code: status,
                retry_after,
                timestamp: Utc::now(),
            };
        }
    }

    if status.is_some_and(|s| s >= 500) {
        return ApiError {
            kind: ApiErrorKind::ServerError,
            message,
            status_code: status,
            retry_after: None,
            timestamp: Utc::now(),
        };
    }

    ApiError {
        kind: ApiErrorKind::Unknown,
        message,
        status_code: status,
        retry_after: None,
        timestamp: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Orchestrator-level errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the API manager's public methods.
#[derive(Debug, thiserror::Error)]
pub enum ApiManagerError {
    #[error("API manager not initialized")]
    NotInitialized,

    #[error("invalid API provider '{0}' configured in settings")]
    InvalidProvider(String),

    #[error("provider '{0}' is not available; check the API key in settings")]
    ProviderUnavailable(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Limits(#[from] LimitsError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
