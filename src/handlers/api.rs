use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};

use crate::error::{error_chain, SuggestError};
use crate::palette::{error_result, new_request_id, SuggestionResult};
use crate::pipeline::{suggest_palette, ImageUpload};
use crate::state::AppState;
use crate::utils::timing::{complete_request_timer, start_request_timer};

pub const SUGGEST_ROUTE: &str = "/api/suggest-colors";

/// Room for multipart boundaries and the description field on top of the image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let cors = build_cors(&state.cors_allow_origins);
    Router::new()
        .route("/", get(root))
        .route(SUGGEST_ROUTE, post(suggest_colors))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(
            state.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES),
        ))
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

pub fn status_for(err: &SuggestError) -> StatusCode {
    match err {
        SuggestError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SuggestError::UnreadableImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SuggestError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        SuggestError::Configuration(_)
        | SuggestError::UpstreamFailure { .. }
        | SuggestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "UI Palette Advisor API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            SUGGEST_ROUTE: "POST - Get color suggestions based on image and description",
            "/health": "GET - Check API health"
        }
    }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: f64,
    issues: Option<Vec<String>>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let issues: Vec<String> = state
        .missing_api_keys()
        .iter()
        .map(|key| format!("{key} not configured"))
        .collect();
    let status = if issues.is_empty() { "ok" } else { "warning" };

    Json(HealthResponse {
        status,
        timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        issues: (!issues.is_empty()).then_some(issues),
    })
}

struct SuggestForm {
    image: ImageUpload,
    description: String,
}

async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
    max_upload_bytes: usize,
) -> Result<SuggestForm, SuggestError> {
    let mut multipart = multipart.map_err(|rejection| {
        SuggestError::InvalidInput(format!("Expected a multipart form: {}", rejection.body_text()))
    })?;

    let mut image = None;
    let mut description = None;
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        SuggestError::InvalidInput(format!("Malformed multipart body: {}", err.body_text()))
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let file_name = field.file_name().map(str::to_string);
                let declared_mime_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|err| {
                    SuggestError::InvalidInput(format!("Could not read image field: {}", err.body_text()))
                })?;
                image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    declared_mime_type,
                    file_name,
                });
            }
            Some("description") => {
                let text = field.text().await.map_err(|err| {
                    SuggestError::InvalidInput(format!(
                        "Could not read description field: {}",
                        err.body_text()
                    ))
                })?;
                description = Some(text);
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| SuggestError::InvalidInput("Image file is required".to_string()))?;
    if image.bytes.len() > max_upload_bytes {
        return Err(SuggestError::InvalidInput(format!(
            "Image exceeds the {} byte upload limit",
            max_upload_bytes
        )));
    }
    let description = description
        .ok_or_else(|| SuggestError::InvalidInput("Project description is required".to_string()))?;

    Ok(SuggestForm { image, description })
}

async fn run_suggestion(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
    request_id: &str,
) -> Result<SuggestionResult, SuggestError> {
    let form = read_form(multipart, state.max_upload_bytes).await?;
    suggest_palette(
        state.image_analyzer.as_ref(),
        state.color_suggester.as_ref(),
        form.image,
        &form.description,
        &state.options,
        request_id,
    )
    .await
}

async fn suggest_colors(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = new_request_id();
    let mut timer = start_request_timer(&request_id, SUGGEST_ROUTE);

    match run_suggestion(&state, multipart, &request_id).await {
        Ok(result) => {
            info!(
                "request_id={} suggested {} colors",
                request_id,
                result.all_colors.len()
            );
            complete_request_timer(&mut timer, "success", None);
            Json(result).into_response()
        }
        Err(err) => {
            let status = status_for(&err);
            if status.is_server_error() {
                error!(
                    "request_id={} kind={} {}",
                    request_id,
                    err.kind(),
                    error_chain(&err)
                );
            } else {
                warn!("request_id={} kind={} {}", request_id, err.kind(), err);
            }
            complete_request_timer(&mut timer, err.kind(), Some(err.to_string()));
            let body = error_result(&err, &request_id, state.expose_error_details);
            (status, Json(body)).into_response()
        }
    }
}
