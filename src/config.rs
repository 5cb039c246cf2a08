use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use tracing::warn;

/// Upstream calls shorter than this routinely cut off slow vision responses.
const MIN_UPSTREAM_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub log_dir: String,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub gemini_temperature: f32,
    pub gemini_max_output_tokens: i32,
    pub groq_api_key: String,
    pub groq_base_url: String,
    pub groq_model: String,
    pub groq_temperature: f32,
    pub upstream_timeout_seconds: u64,
    pub max_upload_bytes: usize,
    pub image_max_dimension: u32,
    pub cors_allow_origins: Vec<String>,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_i32(name: &str, default: i32) -> i32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<i32>().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_csv(name: &str, default: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn parse_environment(value: &str) -> Environment {
    match value.trim().to_lowercase().as_str() {
        "production" | "prod" => Environment::Production,
        "development" | "dev" | "" => Environment::Development,
        other => {
            warn!(
                "Unknown ENVIRONMENT value '{}'; defaulting to development.",
                other
            );
            Environment::Development
        }
    }
}

fn normalize_upstream_timeout(seconds: u64) -> u64 {
    if seconds < MIN_UPSTREAM_TIMEOUT_SECONDS {
        warn!(
            "UPSTREAM_TIMEOUT_SECONDS={} is below the {}s minimum; using {}s.",
            seconds, MIN_UPSTREAM_TIMEOUT_SECONDS, MIN_UPSTREAM_TIMEOUT_SECONDS
        );
        return MIN_UPSTREAM_TIMEOUT_SECONDS;
    }
    seconds
}

impl Config {
    pub fn load() -> Result<Self> {
        let environment = parse_environment(&env_string("ENVIRONMENT", "development"));

        // Production deployments sit behind a proxy and must accept external connections.
        let default_host = match environment {
            Environment::Production => "0.0.0.0",
            Environment::Development => "127.0.0.1",
        };
        let host_value = env_string("HOST", default_host);
        let host = host_value
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| anyhow!("Invalid HOST value: {host_value}"))?;

        let port = match env::var("PORT") {
            Ok(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| anyhow!("Invalid PORT value: {value}"))?,
            Err(_) => 8000,
        };

        Ok(Config {
            environment,
            host,
            port,
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: env_string("LOG_DIR", "logs"),
            gemini_api_key: env_string("GEMINI_API_KEY", "").trim().to_string(),
            gemini_base_url: env_string(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            gemini_model: env_string("GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_temperature: env_f32("GEMINI_TEMPERATURE", 0.4),
            gemini_max_output_tokens: env_i32("GEMINI_MAX_OUTPUT_TOKENS", 1024),
            groq_api_key: env_string("GROQ_API_KEY", "").trim().to_string(),
            groq_base_url: env_string("GROQ_BASE_URL", "https://api.groq.com/openai/v1"),
            groq_model: env_string("GROQ_MODEL", "llama-3.3-70b-versatile"),
            groq_temperature: env_f32("GROQ_TEMPERATURE", 0.7),
            upstream_timeout_seconds: normalize_upstream_timeout(env_u64(
                "UPSTREAM_TIMEOUT_SECONDS",
                45,
            )),
            max_upload_bytes: env_usize("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            image_max_dimension: env_u32("IMAGE_MAX_DIMENSION", 1024).max(64),
            cors_allow_origins: env_csv("CORS_ALLOW_ORIGINS", "*"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    /// Names of required API keys that are still empty.
    pub fn missing_api_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gemini_api_key.is_empty() {
            missing.push("GEMINI_API_KEY");
        }
        if self.groq_api_key.is_empty() {
            missing.push("GROQ_API_KEY");
        }
        missing
    }
}

pub const IMAGE_COLOR_PROMPT: &str = "Analyze this UI/app image and extract the main color palette.\nReturn ONLY a JSON array of hex color codes (e.g., [\"#3498db\", \"#2ecc71\"]) with no additional text.\nExtract only the most dominant and important colors for the UI design (maximum 6 colors).\nList them from most to least dominant, and focus on colors that would create a harmonious and aesthetically pleasing UI palette.";

pub const PALETTE_SYSTEM_PROMPT: &str = "You are a UI/UX design expert specializing in color theory and accessibility. Your task is to suggest the most appropriate UI colors based on project descriptions.";

pub const PALETTE_USER_PROMPT: &str = r##"Consider this project description:

"{description}"

Based on this description, suggest the most appropriate UI colors in hex format.
These colors should create a harmonious palette that enhances user experience and matches the project's theme.

Return ONLY a JSON array of hex color codes (e.g., ["#3498db", "#2ecc71"]) with no additional text or explanation.
Include 5-7 colors that work well together, in this order:
- Primary brand color
- Secondary color
- Accent color
- Background color
- Text color
- 1-2 additional supporting colors

Ensure the palette has appropriate contrast for accessibility and follows color theory principles."##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_clamped_to_minimum() {
        assert_eq!(normalize_upstream_timeout(5), 30);
        assert_eq!(normalize_upstream_timeout(90), 90);
    }

    #[test]
    fn user_prompt_keeps_example_array_and_placeholder() {
        assert!(PALETTE_USER_PROMPT.contains(r##"(e.g., ["#3498db", "#2ecc71"])"##));
        assert!(PALETTE_USER_PROMPT.contains("\"{description}\""));
        assert!(PALETTE_USER_PROMPT.ends_with("follows color theory principles."));
    }

    #[test]
    fn environment_names_are_case_insensitive() {
        assert_eq!(parse_environment("Production"), Environment::Production);
        assert_eq!(parse_environment(" dev "), Environment::Development);
        assert_eq!(parse_environment("staging"), Environment::Development);
    }
}
