//! Text generation errors

use std::time::Duration;
use thiserror::Error;

/// Failure of one generation call
///
/// Callers never abort a cycle on these; the planner and place selection
/// downgrade to their next fallback tier.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP 429 from the provider
    #[error("Rate limited by provider, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Provider returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Empty completion or a body that does not decode
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Per-call deadline set by the rate limiter
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown provider, missing API key or unusable header value
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether the same request could succeed on a later tick
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout(_) => true,
            Self::ApiError { status, .. } => *status == 408 || *status >= 500,
            Self::InvalidResponse(_) | Self::Json(_) | Self::Config(_) => false,
        }
    }

    /// Provider-advertised wait for a 429
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
