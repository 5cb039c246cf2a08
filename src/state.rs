use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::llm::gemini::GeminiSettings;
use crate::llm::groq::GroqSettings;
use crate::llm::{DescriptionColorSuggester, GeminiClient, GroqClient, ImageColorAnalyzer};
use crate::pipeline::PipelineOptions;
use crate::utils::http::build_http_client;

#[derive(Clone)]
pub struct AppState {
    pub image_analyzer: Arc<dyn ImageColorAnalyzer>,
    pub color_suggester: Arc<dyn DescriptionColorSuggester>,
    pub options: PipelineOptions,
    pub expose_error_details: bool,
    pub max_upload_bytes: usize,
    pub cors_allow_origins: Vec<String>,
    missing_api_keys: Vec<&'static str>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = build_http_client(config.upstream_timeout())?;
        let image_analyzer: Arc<dyn ImageColorAnalyzer> = Arc::new(GeminiClient::new(
            GeminiSettings::from_config(config),
            http.clone(),
        ));
        let color_suggester: Arc<dyn DescriptionColorSuggester> =
            Arc::new(GroqClient::new(GroqSettings::from_config(config), http));

        Ok(AppState {
            image_analyzer,
            color_suggester,
            options: PipelineOptions::from_config(config),
            expose_error_details: !config.is_production(),
            max_upload_bytes: config.max_upload_bytes,
            cors_allow_origins: config.cors_allow_origins.clone(),
            missing_api_keys: config.missing_api_keys(),
        })
    }

    #[cfg(test)]
    pub fn with_adapters(
        image_analyzer: Arc<dyn ImageColorAnalyzer>,
        color_suggester: Arc<dyn DescriptionColorSuggester>,
        options: PipelineOptions,
    ) -> Self {
        let missing_api_keys = image_analyzer
            .missing_configuration()
            .into_iter()
            .chain(color_suggester.missing_configuration())
            .collect();
        AppState {
            image_analyzer,
            color_suggester,
            options,
            expose_error_details: true,
            max_upload_bytes: 10 * 1024 * 1024,
            cors_allow_origins: vec!["*".to_string()],
            missing_api_keys,
        }
    }

    pub fn missing_api_keys(&self) -> &[&'static str] {
        &self.missing_api_keys
    }
}
