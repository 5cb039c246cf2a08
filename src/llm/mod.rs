pub mod gemini;
pub mod groq;
pub mod media;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

pub use gemini::GeminiClient;
pub use groq::GroqClient;
pub use media::PreparedImage;

const UPSTREAM_MAX_RETRY_ATTEMPTS: usize = 2;
const UPSTREAM_RETRY_BASE_DELAY_MS: u64 = 900;

/// Vision model that lists the dominant colours of a screenshot.
#[async_trait]
pub trait ImageColorAnalyzer: Send + Sync {
    fn provider(&self) -> &'static str;

    /// Environment variable that still has to be set before calls can succeed.
    fn missing_configuration(&self) -> Option<&'static str> {
        None
    }

    async fn extract_colors(&self, image: &PreparedImage) -> Result<String>;
}

/// Text model that proposes colours for a project description.
#[async_trait]
pub trait DescriptionColorSuggester: Send + Sync {
    fn provider(&self) -> &'static str;

    fn missing_configuration(&self) -> Option<&'static str> {
        None
    }

    async fn suggest_colors(&self, description: &str) -> Result<String>;
}

pub(crate) fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

pub(crate) fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

pub(crate) fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

pub(crate) fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

pub(crate) fn retry_delay(attempt: usize) -> Duration {
    let attempt = attempt.max(1) as u64;
    Duration::from_millis(UPSTREAM_RETRY_BASE_DELAY_MS.saturating_mul(attempt))
}

pub(crate) fn may_retry(attempt: usize) -> bool {
    attempt < UPSTREAM_MAX_RETRY_ATTEMPTS
}
