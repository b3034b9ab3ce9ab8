//! LLM Client module for NomadPost
//!
//! Provides the text-generation call used by the planner, place selection and
//! content assembly.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

mod anthropic;
pub mod client;
mod error;
mod limiter;
mod openai;
mod transport;
mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use limiter::{RateLimitedClient, WINDOW};
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// User agent sent by every outbound HTTP client
pub const USER_AGENT: &str = concat!("nomadpost/", env!("CARGO_PKG_VERSION"));

/// Sampling options for one generation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

impl GenerationOptions {
    /// Low temperature for structured (JSON) answers
    pub fn structured(max_tokens: u32) -> Self {
        Self {
            temperature: 0.3,
            max_tokens,
        }
    }

    /// Higher temperature for prose
    pub fn prose(max_tokens: u32) -> Self {
        Self {
            temperature: 0.8,
            max_tokens,
        }
    }
}

/// Create an LLM client based on the provider specified in config
///
/// The provider client is wrapped in the fixed-window limiter with the
/// configured per-call timeout. Supports "anthropic" and "openai".
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    let inner: Arc<dyn LlmClient> = match config.provider.as_str() {
        "anthropic" => {
            debug!("create_client: creating Anthropic client");
            Arc::new(AnthropicClient::from_config(config)?)
        }
        "openai" => {
            debug!("create_client: creating OpenAI client");
            Arc::new(OpenAIClient::from_config(config)?)
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            return Err(LlmError::Config(format!(
                "Unknown LLM provider: '{}'. Supported: anthropic, openai",
                other
            )));
        }
    };

    Ok(Arc::new(RateLimitedClient::new(
        inner,
        config.requests_per_minute,
        Duration::from_millis(config.timeout_ms),
    )))
}

/// Generate text for a single prompt
///
/// Empty or whitespace-only output is an `InvalidResponse`.
pub async fn generate(client: &dyn LlmClient, prompt: &str, options: GenerationOptions) -> Result<String, LlmError> {
    debug!(prompt_len = prompt.len(), ?options, "generate: called");
    let request = CompletionRequest {
        system_prompt: String::new(),
        messages: vec![Message::user(prompt)],
        max_tokens: options.max_tokens,
        temperature: Some(options.temperature),
    };

    let response = client.complete(request).await.inspect_err(|e| {
        debug!(error = %e, retryable = e.is_retryable(), "generate: call failed");
    })?;
    match response.content {
        Some(text) if !text.trim().is_empty() => {
            debug!(text_len = text.len(), usage = response.usage.total(), "generate: success");
            Ok(text)
        }
        _ => {
            debug!("generate: empty content");
            Err(LlmError::InvalidResponse("Empty completion".to_string()))
        }
    }
}
