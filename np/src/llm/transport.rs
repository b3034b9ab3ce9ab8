//! JSON-over-HTTPS transport shared by the provider clients
//!
//! Transient statuses and network failures are retried with exponential
//! backoff; a 429 is surfaced at once so the limiter above can wait it out.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{LlmError, USER_AGENT};
use crate::config::LlmConfig;

/// Retries after the first attempt
pub const MAX_RETRIES: u32 = 3;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Seconds to wait when a 429 carries no usable Retry-After
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Statuses worth another attempt besides 429
const RETRYABLE: [u16; 5] = [408, 500, 502, 503, 504];

/// One endpoint with fixed auth headers
pub struct Transport {
    http: Client,
    url: String,
    headers: HeaderMap,
    /// Extra provider-specific retryable statuses (Anthropic's 529 "overloaded")
    extra_retryable: &'static [u16],
}

impl Transport {
    /// Build an HTTP client with the configured timeout, posting to `base_url + path`
    pub fn new(
        config: &LlmConfig,
        path: &str,
        headers: &[(&'static str, String)],
        extra_retryable: &'static [u16],
    ) -> Result<Self, LlmError> {
        debug!(base_url = %config.base_url, %path, "Transport::new: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(USER_AGENT)
            .build()
            .map_err(LlmError::Network)?;

        let mut map = HeaderMap::new();
        map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            let value = HeaderValue::from_str(value)
                .map_err(|e| LlmError::Config(format!("Invalid value for header {}: {}", name, e)))?;
            map.insert(HeaderName::from_static(name), value);
        }

        Ok(Self {
            http,
            url: format!("{}{}", config.base_url.trim_end_matches('/'), path),
            headers: map,
            extra_retryable,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn is_retryable(&self, status: u16) -> bool {
        RETRYABLE.contains(&status) || self.extra_retryable.contains(&status)
    }

    /// POST `body` and decode the success response as `T`
    pub async fn post_json<T: DeserializeOwned>(&self, body: &serde_json::Value) -> Result<T, LlmError> {
        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF * 2u32.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff.as_millis() as u64, url = %self.url, "Retrying LLM request");
                tokio::time::sleep(backoff).await;
            }

            let response = match self
                .http
                .post(&self.url)
                .headers(self.headers.clone())
                .json(body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    debug!(attempt, error = %e, "post_json: network error");
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();
            if status == 429 {
                let retry_after = retry_after(response.headers());
                debug!(?retry_after, "post_json: rate limited");
                return Err(LlmError::RateLimited { retry_after });
            }

            if !response.status().is_success() {
                let message = response.text().await.unwrap_or_default();
                let error = LlmError::ApiError { status, message };
                if self.is_retryable(status) && attempt < MAX_RETRIES {
                    debug!(attempt, status, "post_json: transient status");
                    last_error = Some(error);
                    continue;
                }
                return Err(error);
            }

            debug!(attempt, status, "post_json: success");
            return Ok(response.json().await?);
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

fn retry_after(headers: &HeaderMap) -> Duration {
    let secs = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(extra: &'static [u16]) -> Transport {
        let config = LlmConfig {
            base_url: "https://llm.test/".to_string(),
            ..LlmConfig::default()
        };
        Transport::new(&config, "/v1/messages", &[("x-api-key", "k".to_string())], extra).unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        assert_eq!(transport(&[]).url(), "https://llm.test/v1/messages");
    }

    #[test]
    fn test_retryable_statuses() {
        let plain = transport(&[]);
        assert!(plain.is_retryable(503));
        assert!(!plain.is_retryable(529));
        assert!(!plain.is_retryable(400));
        assert!(transport(&[529]).is_retryable(529));
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), Duration::from_secs(60));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after(&headers), Duration::from_secs(12));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_header_value_is_config_error() {
        let config = LlmConfig::default();
        let result = Transport::new(&config, "/x", &[("authorization", "bad\nvalue".to_string())], &[]);
        assert!(matches!(result, Err(LlmError::Config(_))));
    }
}
