use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::{Config, IMAGE_COLOR_PROMPT};
use crate::llm::media::PreparedImage;
use crate::llm::{
    may_retry, retry_delay, should_retry_error, should_retry_status, summarize_error_body,
    truncate_for_log, ImageColorAnalyzer,
};
use crate::utils::timing::log_llm_timing;

const PROVIDER: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: i32,
}

impl GeminiSettings {
    pub fn from_config(config: &Config) -> Self {
        GeminiSettings {
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.clone(),
            model: config.gemini_model.clone(),
            temperature: config.gemini_temperature,
            max_output_tokens: config.gemini_max_output_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    Other(IgnoredAny),
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    settings: GeminiSettings,
    http: Client,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings, http: Client) -> Self {
        GeminiClient { settings, http }
    }

    fn redact_api_key(&self, text: &str) -> String {
        let key = self.settings.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    fn build_payload(&self, image: &PreparedImage) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": IMAGE_COLOR_PROMPT },
                    {
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": general_purpose::STANDARD.encode(&image.bytes)
                        }
                    }
                ]
            }],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_output_tokens,
                "responseMimeType": "application/json"
            }
        })
    }

    async fn call_gemini_api(&self, payload: &Value) -> Result<GeminiResponse> {
        let url = self.endpoint();

        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                target: "llm.gemini",
                model = %self.settings.model,
                payload = %summarize_gemini_payload(payload)
            );
        }

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = match self
                .http
                .post(&url)
                .header("x-goog-api-key", &self.settings.api_key)
                .json(payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    let err_text = self.redact_api_key(&err.to_string());
                    let should_retry = should_retry_error(&err) && may_retry(attempt);
                    warn!(
                        "Gemini request failed to send: {} (timeout={}, connect={}, retrying={})",
                        err_text,
                        err.is_timeout(),
                        err.is_connect(),
                        should_retry
                    );
                    if should_retry {
                        tokio::time::sleep(retry_delay(attempt)).await;
                        continue;
                    }
                    return Err(anyhow!("Gemini request failed to send: {}", err_text));
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let (message, body_summary) = summarize_error_body(&body);
                let should_retry = should_retry_status(status) && may_retry(attempt);
                warn!(
                    "Gemini API error: status={}, body={}, retrying={}",
                    status,
                    self.redact_api_key(&body_summary),
                    should_retry
                );
                if should_retry {
                    tokio::time::sleep(retry_delay(attempt)).await;
                    continue;
                }
                let detail = message.unwrap_or(body_summary);
                return Err(anyhow!(
                    "Gemini request failed with status {}: {}",
                    status,
                    self.redact_api_key(&detail)
                ));
            }

            let value = response.json::<GeminiResponse>().await?;
            return Ok(value);
        }
    }
}

fn summarize_gemini_payload(payload: &Value) -> Value {
    let mut summary = Map::new();
    if let Some(parts) = payload
        .pointer("/contents/0/parts")
        .and_then(|value| value.as_array())
    {
        let parts: Vec<Value> = parts
            .iter()
            .map(|part| {
                if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                    json!({ "text": truncate_for_log(text, 120) })
                } else if let Some(inline_data) = part.get("inlineData") {
                    let data_len = inline_data
                        .get("data")
                        .and_then(|value| value.as_str())
                        .map(|value| value.len())
                        .unwrap_or(0);
                    json!({ "inlineData": { "mimeType": inline_data.get("mimeType"), "dataLen": data_len } })
                } else {
                    json!({ "unknownPart": true })
                }
            })
            .collect();
        summary.insert("parts".to_string(), Value::Array(parts));
    }
    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }
    Value::Object(summary)
}

fn extract_text_from_response(response: GeminiResponse) -> String {
    let mut text_parts = Vec::new();
    let candidates = response.candidates.unwrap_or_default();
    if candidates.is_empty() {
        warn!(
            "Gemini returned no candidates (promptFeedback={})",
            response
                .prompt_feedback
                .map(|value| value.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
    }

    for candidate in candidates {
        if let Some(reason) = candidate.finish_reason.as_deref() {
            if reason != "STOP" {
                debug!("Gemini candidate finished with reason {}", reason);
            }
        }
        let parts = candidate
            .content
            .and_then(|content| content.parts)
            .unwrap_or_default();
        for part in parts {
            if let GeminiPart::Text { text } = part {
                if !text.trim().is_empty() {
                    text_parts.push(text);
                }
            }
        }
    }
    text_parts.join("\n")
}

#[async_trait]
impl ImageColorAnalyzer for GeminiClient {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn missing_configuration(&self) -> Option<&'static str> {
        self.settings
            .api_key
            .trim()
            .is_empty()
            .then_some("GEMINI_API_KEY")
    }

    async fn extract_colors(&self, image: &PreparedImage) -> Result<String> {
        let payload = self.build_payload(image);
        let metadata = json!({
            "width": image.width,
            "height": image.height,
            "bytes": image.bytes.len()
        });
        log_llm_timing(
            PROVIDER,
            &self.settings.model,
            "extract_colors",
            Some(metadata),
            || async {
                let response = self.call_gemini_api(&payload).await?;
                let text = extract_text_from_response(response);
                debug!(
                    target: "llm.gemini",
                    response = %truncate_for_log(&text, 400)
                );
                Ok(text)
            },
        )
        .await
    }
}
