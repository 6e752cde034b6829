use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Instrument};

use crate::error::AssessmentError;
use crate::pipeline::{self, AudioUpload};
use crate::result::AssessmentResponse;
use crate::state::AppState;

/// Multipart field names accepted for the audio upload.
const AUDIO_FIELDS: &[&str] = &["audio_file", "file"];

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/assess", post(assess_pronunciation))
}

/// Full application with body limit, CORS and request tracing.
pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.system_config.max_upload_bytes;

    Router::new()
        .merge(create_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Pronunciation Assessment API is running"
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "ffmpeg_available": state.normalizer.is_available()
    }))
}

#[derive(Debug, Deserialize)]
pub struct AssessQuery {
    #[serde(default)]
    pub reference_text: String,
}

/// Extractor rejections are taken as `Result`s so that every failure leaves
/// through `AssessmentError` and its `{detail}` body, and so that the
/// credential check runs before the upload is read.
async fn assess_pronunciation(
    State(state): State<AppState>,
    query: Result<Query<AssessQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AssessmentResponse>, AssessmentError> {
    let span = info_span!("assess", request_id = %state.generate_request_id());

    async move {
        pipeline::assessment_client(&state)?;
        let Query(query) = query.map_err(|e| AssessmentError::InvalidUpload(e.body_text()))?;
        let multipart = multipart.map_err(|e| AssessmentError::InvalidUpload(e.body_text()))?;

        let upload = read_upload(multipart).await?;
        info!(
            "Received upload {:?} ({} bytes), reference text {} chars",
            upload.filename,
            upload.bytes.len(),
            query.reference_text.chars().count()
        );

        let response = pipeline::run_assessment(&state, upload, &query.reference_text).await?;
        Ok::<_, AssessmentError>(Json(response))
    }
    .instrument(span)
    .await
}

async fn read_upload(mut multipart: Multipart) -> Result<AudioUpload, AssessmentError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if !field.name().is_some_and(|name| AUDIO_FIELDS.contains(&name)) {
            continue;
        }

        let filename = field.file_name().map(|name| name.to_string());
        let bytes = field.bytes().await.map_err(upload_error)?;
        return Ok(AudioUpload { bytes, filename });
    }

    Err(AssessmentError::InvalidUpload("No audio file provided".to_string()))
}

fn upload_error(e: MultipartError) -> AssessmentError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AssessmentError::PayloadTooLarge;
    }
    AssessmentError::InvalidUpload(format!("Malformed upload: {}", e.body_text()))
}
