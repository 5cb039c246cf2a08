use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::SuggestError;
use crate::llm::media::{prepare_image_file, validate_image_upload, PreparedImage, StagedImage};
use crate::llm::{DescriptionColorSuggester, ImageColorAnalyzer};
use crate::palette::{
    assemble, parse_color_list, reconcile, HexColor, ParseStrategy, ParsedColors, SuggestionResult,
};

/// Raw upload as received from a form field or read from disk.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub declared_mime_type: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub upstream_timeout: Duration,
    pub image_max_dimension: u32,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        PipelineOptions {
            upstream_timeout: config.upstream_timeout(),
            image_max_dimension: config.image_max_dimension,
        }
    }
}

async fn call_upstream<F>(
    provider: &'static str,
    limit: Duration,
    call: F,
) -> Result<String, SuggestError>
where
    F: Future<Output = anyhow::Result<String>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(source)) => Err(SuggestError::UpstreamFailure { provider, source }),
        Err(_) => Err(SuggestError::UpstreamTimeout {
            provider,
            seconds: limit.as_secs(),
        }),
    }
}

const IMAGE_PREPARATION: &str = "image preparation";

/// Stages the upload and shrinks it for the vision model on the blocking
/// pool, under the same deadline as the model calls. The staged file is kept
/// alive until the caller drops it.
async fn stage_and_prepare(
    bytes: Vec<u8>,
    mime_type: String,
    max_dimension: u32,
    limit: Duration,
) -> Result<(StagedImage, PreparedImage), SuggestError> {
    let work = tokio::task::spawn_blocking(move || {
        let staged = StagedImage::stage(&bytes, &mime_type)?;
        let prepared = prepare_image_file(staged.path(), max_dimension)?;
        Ok::<_, SuggestError>((staged, prepared))
    });

    match tokio::time::timeout(limit, work).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(SuggestError::Io(std::io::Error::other(join_err.to_string()))),
        Err(_) => Err(SuggestError::UpstreamTimeout {
            provider: IMAGE_PREPARATION,
            seconds: limit.as_secs(),
        }),
    }
}

fn parse_model_output(request_id: &str, provider: &str, raw: &str) -> ParsedColors {
    let parsed = parse_color_list(raw);
    match parsed.strategy {
        Some(ParseStrategy::PatternScan) => warn!(
            "request_id={} provider={} returned malformed output; recovered {} colors by pattern scan",
            request_id,
            provider,
            parsed.colors.len()
        ),
        Some(strategy) => info!(
            "request_id={} provider={} parsed colors=[{}] strategy={}",
            request_id,
            provider,
            parsed
                .colors
                .iter()
                .map(HexColor::canonical)
                .collect::<Vec<_>>()
                .join(", "),
            strategy.label()
        ),
        None => info!(
            "request_id={} provider={} returned no recognisable colors",
            request_id, provider
        ),
    }
    parsed
}

/// Runs one suggestion request end to end: validate, query both models
/// concurrently, parse, reconcile and assemble.
pub async fn suggest_palette(
    image_analyzer: &dyn ImageColorAnalyzer,
    color_suggester: &dyn DescriptionColorSuggester,
    upload: ImageUpload,
    description: &str,
    options: &PipelineOptions,
    request_id: &str,
) -> Result<SuggestionResult, SuggestError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(SuggestError::InvalidInput(
            "Project description is required".to_string(),
        ));
    }

    if let Some(missing) = image_analyzer
        .missing_configuration()
        .or_else(|| color_suggester.missing_configuration())
    {
        return Err(SuggestError::Configuration(missing.to_string()));
    }

    let mime_type = validate_image_upload(&upload.bytes, upload.declared_mime_type.as_deref())?;
    info!(
        "request_id={} image file={} type={} bytes={} description_chars={}",
        request_id,
        upload.file_name.as_deref().unwrap_or("<unnamed>"),
        mime_type,
        upload.bytes.len(),
        description.chars().count()
    );

    let (staged, prepared) = stage_and_prepare(
        upload.bytes,
        mime_type,
        options.image_max_dimension,
        options.upstream_timeout,
    )
    .await?;
    info!(
        "request_id={} staged {} ({}) prepared as {}x{} {}",
        request_id,
        staged.path().display(),
        staged.mime_type(),
        prepared.width,
        prepared.height,
        prepared.mime_type
    );

    // The first failure drops the other call instead of waiting it out.
    let outputs = tokio::try_join!(
        call_upstream(
            image_analyzer.provider(),
            options.upstream_timeout,
            image_analyzer.extract_colors(&prepared),
        ),
        call_upstream(
            color_suggester.provider(),
            options.upstream_timeout,
            color_suggester.suggest_colors(description),
        ),
    );
    drop(staged);
    let (image_output, description_output) = outputs?;

    let image_colors = parse_model_output(request_id, image_analyzer.provider(), &image_output);
    let description_colors =
        parse_model_output(request_id, color_suggester.provider(), &description_output);

    let reconciliation = reconcile(&image_colors.colors, &description_colors.colors);
    Ok(assemble(
        image_colors.colors,
        description_colors.colors,
        reconciliation,
    ))
}
