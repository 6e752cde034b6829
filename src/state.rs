use std::sync::Arc;
use uuid::Uuid;

use crate::assessment::{AssessmentClient, AssessorFactory, SpeechAssessor};
use crate::audio::AudioNormalizer;
use crate::config::Config;

/// Immutable per-process state shared by all requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub normalizer: Arc<AudioNormalizer>,
    /// `None` when no speech credentials are configured.
    pub assessment: Option<AssessmentClient>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let assessor = AssessorFactory::create_assessor(&config.speech_config)?;
        Ok(Self::with_assessor(config, assessor))
    }

    pub fn with_assessor(config: Config, assessor: Option<Arc<dyn SpeechAssessor>>) -> Self {
        let normalizer = Arc::new(AudioNormalizer::new(&config.audio_config));
        Self {
            config: Arc::new(config),
            normalizer,
            assessment: assessor.map(AssessmentClient::new),
        }
    }

    pub fn generate_request_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
