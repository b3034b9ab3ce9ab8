//! Fixed-window rate limiting and per-call timeout around an LlmClient

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError};

/// Length of one rate-limit window
pub const WINDOW: Duration = Duration::from_secs(60);

/// Decorator that allows at most `max_requests` calls per window and bounds each call
///
/// A caller that finds the window full sleeps until it resets; it is never
/// rejected. The window lock is held while sleeping so waiting callers are
/// served in arrival order. A provider 429 is waited out once (at most one
/// window) before the error is returned.
pub struct RateLimitedClient {
    inner: Arc<dyn LlmClient>,
    max_requests: u32,
    window: Duration,
    call_timeout: Duration,
    state: Mutex<WindowState>,
}

struct WindowState {
    started: Instant,
    count: u32,
}

impl RateLimitedClient {
    pub fn new(inner: Arc<dyn LlmClient>, max_requests: u32, call_timeout: Duration) -> Self {
        Self::with_window(inner, max_requests, WINDOW, call_timeout)
    }

    pub fn with_window(inner: Arc<dyn LlmClient>, max_requests: u32, window: Duration, call_timeout: Duration) -> Self {
        debug!(max_requests, ?window, ?call_timeout, "RateLimitedClient::with_window: called");
        Self {
            inner,
            max_requests: max_requests.max(1),
            window,
            call_timeout,
            state: Mutex::new(WindowState {
                started: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Wait for a slot in the current window and claim it
    async fn acquire(&self) {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        if now.duration_since(state.started) >= self.window {
            debug!("acquire: window expired, resetting");
            state.started = now;
            state.count = 0;
        }

        if state.count >= self.max_requests {
            let resume_at = state.started + self.window;
            info!(
                wait_ms = resume_at.saturating_duration_since(now).as_millis() as u64,
                max_requests = self.max_requests,
                "Generation rate limit reached, waiting for window reset"
            );
            tokio::time::sleep_until(resume_at).await;
            state.started = Instant::now();
            state.count = 0;
        }

        state.count += 1;
        debug!(count = state.count, "acquire: slot claimed");
    }
}

#[async_trait]
impl LlmClient for RateLimitedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!("RateLimitedClient::complete: called");
        self.acquire().await;

        match self.call(request.clone()).await {
            Err(e) if e.retry_after().is_some() => {
                let wait = e.retry_after().unwrap_or(self.window).min(self.window);
                info!(wait_ms = wait.as_millis() as u64, "Provider rate limit hit, waiting before one retry");
                tokio::time::sleep(wait).await;
                self.acquire().await;
                self.call(request).await
            }
            result => result,
        }
    }
}

impl RateLimitedClient {
    async fn call(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        match tokio::time::timeout(self.call_timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = self.call_timeout.as_millis() as u64, "Generation call timed out");
                Err(LlmError::Timeout(self.call_timeout))
            }
        }
    }
}
