use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures of a single assessment request.
#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("Speech service credentials are not configured ({0})")]
    Misconfiguration(String),

    #[error("Audio format '.{extension}' requires ffmpeg for conversion, but ffmpeg is not installed. Please upload a WAV file or install ffmpeg on the server.")]
    UnsupportedFormat { extension: String },

    #[error("Failed to convert audio file. Please ensure the file is a valid audio format.")]
    ConversionFailed,

    #[error("No speech could be recognized in the audio. Please ensure the audio contains clear speech.")]
    NoSpeechDetected,

    #[error("Speech recognition error: {reason}")]
    ProviderError { reason: String },

    /// Raw provider document could not be read. Never returned to callers.
    #[error("Provider response could not be parsed: {0}")]
    ResponseParseIncomplete(String),

    #[error("{0}")]
    InvalidUpload(String),

    #[error("Upload exceeds the maximum allowed size")]
    PayloadTooLarge,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssessmentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AssessmentError::UnsupportedFormat { .. }
            | AssessmentError::ConversionFailed
            | AssessmentError::NoSpeechDetected
            | AssessmentError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            AssessmentError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AssessmentError::Misconfiguration(_)
            | AssessmentError::ProviderError { .. }
            | AssessmentError::ResponseParseIncomplete(_)
            | AssessmentError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the `detail` field of the error body.
    pub fn detail(&self) -> String {
        match self {
            AssessmentError::Misconfiguration(_) => {
                "AZURE_SPEECH_KEY not configured. Set it in your environment or config file.".to_string()
            }
            AssessmentError::Io(_) | AssessmentError::ResponseParseIncomplete(_) => {
                "Internal error while processing the audio file.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AssessmentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
