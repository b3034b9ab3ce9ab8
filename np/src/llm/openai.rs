//! OpenAI API client implementation
//!
//! Implements the LlmClient trait for OpenAI's Chat Completions API (and
//! compatible endpoints).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::transport::Transport;
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage};
use crate::config::LlmConfig;

/// OpenAI-compatible chat completions client
pub struct OpenAIClient {
    model: String,
    max_tokens: u32,
    transport: Transport,
}

impl OpenAIClient {
    /// Create a client from configuration, reading the key from the configured env var
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(provider = %config.provider, model = %config.model, "OpenAIClient::from_config: called");
        let api_key = config.get_api_key().map_err(|e| LlmError::Config(e.to_string()))?;
        let transport = Transport::new(
            config,
            "/v1/chat/completions",
            &[("authorization", format!("Bearer {}", api_key))],
            &[],
        )?;
        Ok(Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            transport,
        })
    }

    /// Reasoning models take max_completion_tokens and reject temperature
    fn is_reasoning_model(&self) -> bool {
        self.model.starts_with("gpt-5") || self.model.starts_with("o1") || self.model.starts_with("o3")
    }

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let mut messages = Vec::new();
        if !request.system_prompt.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": request.system_prompt,
            }));
        }
        messages.extend(request.messages.iter().map(|m| {
            serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        }));

        let max_tokens = request.max_tokens.min(self.max_tokens);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if self.is_reasoning_model() {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(max_tokens);
            if let Some(temperature) = request.temperature {
                body["temperature"] = serde_json::json!(temperature);
            }
        }

        body
    }

    /// Parse the OpenAI API response
    fn parse_response(&self, api_response: OpenAIResponse) -> CompletionResponse {
        debug!(choices = api_response.choices.len(), "parse_response: called");
        let choice = api_response.choices.into_iter().next();

        let (content, stop_reason) = match choice {
            Some(c) => (c.message.content, StopReason::from_openai(c.finish_reason.as_deref())),
            None => (None, StopReason::EndTurn),
        };

        let usage = api_response
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        CompletionResponse {
            content,
            stop_reason,
            usage,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %self.model, max_tokens = request.max_tokens, "OpenAIClient::complete: called");
        let body = self.build_request_body(&request);
        let api_response: OpenAIResponse = self.transport.post_json(&body).await?;
        Ok(self.parse_response(api_response))
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    fn client(model: &str, max_tokens: u32) -> OpenAIClient {
        let config = LlmConfig {
            provider: "openai".to_string(),
            model: model.to_string(),
            ..LlmConfig::default()
        };
        OpenAIClient {
            model: model.to_string(),
            max_tokens,
            transport: Transport::new(&config, "/v1/chat/completions", &[], &[]).unwrap(),
        }
    }

    fn request(max_tokens: u32) -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You are a travel writer".to_string(),
            messages: vec![Message::user("Hello")],
            max_tokens,
            temperature: Some(0.7),
        }
    }

    #[test]
    fn test_build_request_body_basic() {
        let body = client("gpt-4o", 8192).build_request_body(&request(1000));

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are a travel writer");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body["temperature"].is_number());
    }

    #[test]
    fn test_max_tokens_capped() {
        let body = client("gpt-4o", 1000).build_request_body(&request(5000));
        assert_eq!(body["max_tokens"], 1000);
    }

    #[test]
    fn test_reasoning_model_uses_completion_tokens() {
        let body = client("o3-mini", 4000).build_request_body(&request(500));
        assert_eq!(body["max_completion_tokens"], 500);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_empty_system_prompt_omitted() {
        let mut req = request(100);
        req.system_prompt.clear();
        let body = client("gpt-4o", 1000).build_request_body(&req);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_parse_response() {
        let api: OpenAIResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "Bonjour"}, "finish_reason": "length"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3}
        }))
        .unwrap();
        let response = client("gpt-4o", 1000).parse_response(api);
        assert_eq!(response.content.as_deref(), Some("Bonjour"));
        assert_eq!(response.stop_reason, StopReason::MaxTokens);
        assert_eq!(response.usage.total(), 13);
    }
}
