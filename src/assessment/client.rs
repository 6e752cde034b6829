use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::interface::{PronunciationConfig, ProviderResult, RecognitionOutcome, SpeechAssessor};
use crate::error::AssessmentError;

/// Drives one recognition per request and turns non-success outcomes into errors.
#[derive(Clone)]
pub struct AssessmentClient {
    assessor: Arc<dyn SpeechAssessor>,
}

impl AssessmentClient {
    pub fn new(assessor: Arc<dyn SpeechAssessor>) -> Self {
        Self { assessor }
    }

    pub async fn assess(
        &self,
        audio: &Path,
        reference_text: &str,
    ) -> Result<ProviderResult, AssessmentError> {
        let config = PronunciationConfig::for_reference(reference_text);
        debug!(
            "Requesting assessment: miscue={}, prosody={}",
            config.enable_miscue, config.enable_prosody_assessment
        );

        let result = self.assessor.recognize(audio, &config).await?;

        match &result.outcome {
            RecognitionOutcome::RecognizedSpeech => {
                info!("Speech recognized: {} words typed", result.words.len());
                Ok(result)
            }
            RecognitionOutcome::NoMatch => {
                warn!("No speech recognized in {}", audio.display());
                Err(AssessmentError::NoSpeechDetected)
            }
            RecognitionOutcome::Failed(reason) => {
                warn!("Speech recognition failed: {}", reason);
                Err(AssessmentError::ProviderError {
                    reason: reason.clone(),
                })
            }
        }
    }
}
