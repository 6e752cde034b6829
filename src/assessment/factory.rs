use std::sync::Arc;
use anyhow::Result;
use tracing::{info, warn};

use crate::config::SpeechConfig;
use super::azure::AzureSpeechClient;
use super::interface::SpeechAssessor;

/// Factory for the speech provider behind the assessment client
pub struct AssessorFactory;

impl AssessorFactory {
    /// Create the provider client from configuration.
    ///
    /// Returns `None` when no subscription key is configured; the server still
    /// starts and every assessment request then fails as misconfigured.
    pub fn create_assessor(config: &SpeechConfig) -> Result<Option<Arc<dyn SpeechAssessor>>> {
        let Some(api_key) = config.api_key() else {
            warn!("AZURE_SPEECH_KEY is not set; /assess will answer 500 until it is configured");
            return Ok(None);
        };

        info!("Initializing speech assessor for region {}", config.region);
        let client: Arc<dyn SpeechAssessor> = Arc::new(AzureSpeechClient::new(config, api_key)?);
        Ok(Some(client))
    }
}
