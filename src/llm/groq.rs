use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{Config, PALETTE_SYSTEM_PROMPT, PALETTE_USER_PROMPT};
use crate::llm::{
    may_retry, retry_delay, should_retry_error, should_retry_status, summarize_error_body,
    truncate_for_log, DescriptionColorSuggester,
};
use crate::utils::timing::log_llm_timing;

const PROVIDER: &str = "groq";

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>(.*?)</think>(.*)").expect("valid think regex"));

#[derive(Debug, Clone)]
pub struct GroqSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

impl GroqSettings {
    pub fn from_config(config: &Config) -> Self {
        GroqSettings {
            api_key: config.groq_api_key.clone(),
            base_url: config.groq_base_url.clone(),
            model: config.groq_model.clone(),
            temperature: config.groq_temperature,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroqClient {
    settings: GroqSettings,
    http: Client,
}

fn build_user_prompt(description: &str) -> String {
    PALETTE_USER_PROMPT.replace("{description}", description.trim())
}

/// Reasoning models prefix their answer with a `<think>` block.
fn strip_reasoning(content: &str) -> String {
    if let Some(caps) = THINK_BLOCK.captures(content) {
        let final_text = caps.get(2).map(|m| m.as_str()).unwrap_or("").trim();
        if !final_text.is_empty() {
            return final_text.to_string();
        }
        let analysis = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        return analysis.trim().to_string();
    }
    content.trim().to_string()
}

fn extract_message_content(response: &Value) -> String {
    let content = response
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    strip_reasoning(content)
}

impl GroqClient {
    pub fn new(settings: GroqSettings, http: Client) -> Self {
        GroqClient { settings, http }
    }

    fn build_payload(&self, description: &str) -> Value {
        json!({
            "model": self.settings.model,
            "temperature": self.settings.temperature,
            "messages": [
                { "role": "system", "content": PALETTE_SYSTEM_PROMPT },
                { "role": "user", "content": build_user_prompt(description) }
            ]
        })
    }

    async fn call_groq_api(&self, payload: &Value) -> Result<Value> {
        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );
        debug!(
            target: "llm.groq",
            model = %self.settings.model,
            payload = %truncate_for_log(&payload.to_string(), 600)
        );

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = match self
                .http
                .post(&url)
                .bearer_auth(&self.settings.api_key)
                .json(payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    let should_retry = should_retry_error(&err) && may_retry(attempt);
                    warn!(
                        "Groq request failed to send: {} (timeout={}, connect={}, retrying={})",
                        err,
                        err.is_timeout(),
                        err.is_connect(),
                        should_retry
                    );
                    if should_retry {
                        tokio::time::sleep(retry_delay(attempt)).await;
                        continue;
                    }
                    return Err(anyhow!("Groq request failed to send: {}", err));
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let (message, body_summary) = summarize_error_body(&body);
                let should_retry = should_retry_status(status) && may_retry(attempt);
                warn!(
                    "Groq API error: status={}, body={}, retrying={}",
                    status, body_summary, should_retry
                );
                if should_retry {
                    tokio::time::sleep(retry_delay(attempt)).await;
                    continue;
                }
                let detail = message.unwrap_or(body_summary);
                return Err(anyhow!(
                    "Groq request failed with status {}: {}",
                    status,
                    detail
                ));
            }

            let value = response.json::<Value>().await?;
            return Ok(value);
        }
    }
}

#[async_trait]
impl DescriptionColorSuggester for GroqClient {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn missing_configuration(&self) -> Option<&'static str> {
        self.settings
            .api_key
            .trim()
            .is_empty()
            .then_some("GROQ_API_KEY")
    }

    async fn suggest_colors(&self, description: &str) -> Result<String> {
        let payload = self.build_payload(description);
        let metadata = json!({ "description_chars": description.chars().count() });
        log_llm_timing(
            PROVIDER,
            &self.settings.model,
            "suggest_colors",
            Some(metadata),
            || async {
                let response = self.call_groq_api(&payload).await?;
                let text = extract_message_content(&response);
                debug!(
                    target: "llm.groq",
                    response = %truncate_for_log(&text, 400)
                );
                Ok(text)
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn settings(base_url: String) -> GroqSettings {
        GroqSettings {
            api_key: "groq-key".to_string(),
            base_url,
            model: "llama-test".to_string(),
            temperature: 0.7,
        }
    }

    #[test]
    fn strips_think_blocks() {
        assert_eq!(
            strip_reasoning("<think>warm tones\nfor coffee</think>\n[\"#6F4E37\"]"),
            "[\"#6F4E37\"]"
        );
        assert_eq!(strip_reasoning("<think>[\"#FFFFFF\"]</think>  "), "[\"#FFFFFF\"]");
        assert_eq!(strip_reasoning("  [\"#000000\"] "), "[\"#000000\"]");
    }

    #[test]
    fn description_is_embedded_in_prompt() {
        let prompt = build_user_prompt("  A calm meditation app ");
        assert!(prompt.contains("\"A calm meditation app\""));
        assert!(!prompt.contains("{description}"));
    }

    #[tokio::test]
    async fn posts_chat_completion_and_returns_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer groq-key")
                    .json_body_partial(r#"{"model": "llama-test"}"#)
                    .body_contains("coffee shop");
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": { "role": "assistant", "content": "[\"#6F4E37\", \"#FFF8E7\"]" }
                    }]
                }));
            })
            .await;

        let client = GroqClient::new(settings(server.url("")), Client::new());
        let text = client.suggest_colors("A coffee shop").await.unwrap();

        mock.assert_async().await;
        assert_eq!(text, "[\"#6F4E37\", \"#FFF8E7\"]");
    }

    #[tokio::test]
    async fn missing_choices_yield_empty_text() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let client = GroqClient::new(settings(server.url("")), Client::new());
        assert_eq!(client.suggest_colors("Anything").await.unwrap(), "");
    }

    #[tokio::test]
    async fn rate_limit_is_reported_after_retry() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429)
                    .json_body(json!({ "error": { "message": "Rate limit reached" } }));
            })
            .await;

        let client = GroqClient::new(settings(server.url("")), Client::new());
        let err = client.suggest_colors("Anything").await.unwrap_err();
        assert_eq!(mock.hits_async().await, 2);
        assert!(err.to_string().contains("Rate limit reached"));
    }
}
