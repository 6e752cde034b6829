use axum::body::Bytes;
use tracing::{debug, info};

use crate::assessment::AssessmentClient;
use crate::audio::{file_extension, UploadWorkspace};
use crate::error::AssessmentError;
use crate::result::{self, AssessmentResponse};
use crate::state::AppState;

/// The uploaded audio as received; the filename only serves to infer the encoding.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub bytes: Bytes,
    pub filename: Option<String>,
}

/// The configured assessment client; a missing credential is a server error.
pub fn assessment_client(state: &AppState) -> Result<&AssessmentClient, AssessmentError> {
    state.assessment.as_ref().ok_or_else(|| {
        AssessmentError::Misconfiguration("AZURE_SPEECH_KEY is not set".to_string())
    })
}

/// Persist, normalize, assess and reshape one upload.
///
/// The request workspace is removed before returning, whatever the outcome.
pub async fn run_assessment(
    state: &AppState,
    upload: AudioUpload,
    reference_text: &str,
) -> Result<AssessmentResponse, AssessmentError> {
    let client = assessment_client(state)?;

    let extension = file_extension(upload.filename.as_deref());
    let workspace = UploadWorkspace::create(&state.config.system_config.temp_root())?;

    let outcome = assess_in_workspace(state, client, &workspace, &upload, &extension, reference_text).await;
    workspace.close();
    outcome
}

async fn assess_in_workspace(
    state: &AppState,
    client: &AssessmentClient,
    workspace: &UploadWorkspace,
    upload: &AudioUpload,
    extension: &str,
    reference_text: &str,
) -> Result<AssessmentResponse, AssessmentError> {
    let input = workspace.persist_upload(&upload.bytes, extension).await?;
    let audio = state
        .normalizer
        .normalize(&input, extension, &workspace.converted_path())
        .await?;
    debug!("Assessing {} (converted={})", audio.path.display(), audio.converted);

    let provider_result = client.assess(&audio.path, reference_text).await?;
    let response = result::normalize(&provider_result, reference_text);

    info!(
        "Assessment complete: type={:?}, words={}, accuracy={:.1}",
        response.assessment_type,
        response.words.len(),
        response.accuracy_score
    );
    Ok(response)
}
