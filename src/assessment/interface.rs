use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AssessmentError;
use crate::result::AssessmentType;

/// Pronunciation assessment settings sent to the provider alongside the audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PronunciationConfig {
    pub reference_text: String,
    pub grading_system: String,
    pub granularity: String,
    pub phoneme_alphabet: String,
    pub enable_miscue: bool,
    pub enable_prosody_assessment: bool,
}

impl PronunciationConfig {
    /// Phoneme-level IPA scoring on a 0-100 scale; miscue detection only when
    /// there is a reference to compare against.
    pub fn for_reference(reference_text: &str) -> Self {
        Self {
            reference_text: reference_text.to_string(),
            grading_system: "HundredMark".to_string(),
            granularity: "Phoneme".to_string(),
            phoneme_alphabet: "IPA".to_string(),
            enable_miscue: AssessmentType::from_reference(reference_text) == AssessmentType::Scripted,
            enable_prosody_assessment: true,
        }
    }
}

/// How the provider classified the utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    RecognizedSpeech,
    NoMatch,
    /// Any other status, carrying the provider's reason code.
    Failed(String),
}

/// Scalar scores as typed by the provider. Unset fields were not reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderScores {
    pub accuracy: Option<f64>,
    pub fluency: Option<f64>,
    pub completeness: Option<f64>,
    pub prosody: Option<f64>,
    pub pronunciation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPhoneme {
    pub symbol: String,
    pub accuracy_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderWord {
    pub text: String,
    pub accuracy_score: Option<f64>,
    pub error_type: Option<String>,
    pub phonemes: Vec<ProviderPhoneme>,
}

/// One recognition result: the typed view plus the raw document it came from.
#[derive(Debug, Clone)]
pub struct ProviderResult {
    pub outcome: RecognitionOutcome,
    pub text: String,
    pub scores: ProviderScores,
    /// May be empty even when the raw document has word detail.
    pub words: Vec<ProviderWord>,
    pub raw_json: Option<String>,
}

impl ProviderResult {
    pub fn with_outcome(outcome: RecognitionOutcome) -> Self {
        Self {
            outcome,
            text: String::new(),
            scores: ProviderScores::default(),
            words: Vec::new(),
            raw_json: None,
        }
    }
}

/// A speech service able to score one canonical WAV utterance.
#[async_trait]
pub trait SpeechAssessor: Send + Sync {
    /// Run a single recognition over the file. Transport and auth failures
    /// are returned as `ProviderError`.
    async fn recognize(
        &self,
        audio: &Path,
        config: &PronunciationConfig,
    ) -> Result<ProviderResult, AssessmentError>;
}
