use serde::{Deserialize, Serialize};

/// Whether the utterance was scored against a reference transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssessmentType {
    Scripted,
    Unscripted,
}

impl AssessmentType {
    pub fn from_reference(reference_text: &str) -> Self {
        if reference_text.trim().is_empty() {
            AssessmentType::Unscripted
        } else {
            AssessmentType::Scripted
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemeScore {
    /// IPA symbol.
    pub phoneme: String,
    pub accuracy_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordScore {
    pub word: String,
    pub accuracy_score: Option<f64>,
    /// Provider miscue tag, passed through verbatim ("None", "Omission", ...).
    pub error_type: Option<String>,
    pub phonemes: Vec<PhonemeScore>,
}

/// Body of a successful `/assess` response. Absent scores serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub recognized_text: String,
    pub accuracy_score: f64,
    pub fluency_score: f64,
    pub completeness_score: Option<f64>,
    pub prosody_score: Option<f64>,
    pub pronunciation_score: Option<f64>,
    pub words: Vec<WordScore>,
    pub assessment_type: AssessmentType,
}
