//! Data provider error types

use thiserror::Error;

/// Errors from image, weather and geocoding providers
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned {status}: {message}")]
    Status {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Failed to decode {provider} response: {message}")]
    Decode { provider: String, message: String },

    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("No provider can fetch images from {0}")]
    UnknownSource(String),
}

impl ProviderError {
    /// Check if a later attempt might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(_) => true,
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Decode { .. } => false,
            ProviderError::NotConfigured(_) => false,
            ProviderError::UnknownSource(_) => false,
        }
    }
}
