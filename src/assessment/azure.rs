use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::interface::{
    PronunciationConfig, ProviderPhoneme, ProviderResult, ProviderScores, ProviderWord,
    RecognitionOutcome, SpeechAssessor,
};
use crate::config::SpeechConfig;
use crate::error::AssessmentError;

const WAV_CONTENT_TYPE: &str = "audio/wav; codecs=audio/pcm; samplerate=16000";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const PRONUNCIATION_HEADER: &str = "Pronunciation-Assessment";

/// Azure Speech short-audio REST client with pronunciation assessment enabled.
pub struct AzureSpeechClient {
    client: Client,
    endpoint: String,
    language: String,
    api_key: String,
}

impl AzureSpeechClient {
    pub fn new(config: &SpeechConfig, api_key: &str) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| recognition_endpoint(&config.region));

        info!(
            "Initialized AzureSpeechClient: endpoint={}, language={}",
            endpoint, config.language
        );

        Ok(Self {
            client,
            endpoint,
            language: config.language.clone(),
            api_key: api_key.to_string(),
        })
    }
}

pub fn recognition_endpoint(region: &str) -> String {
    format!(
        "https://{}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1",
        region
    )
}

/// Header value carrying the assessment settings: base64 of the JSON config.
pub fn assessment_header(config: &PronunciationConfig) -> Result<String, AssessmentError> {
    let json = serde_json::to_vec(config).map_err(|e| AssessmentError::ProviderError {
        reason: format!("InvalidConfig: {}", e),
    })?;
    Ok(BASE64_STANDARD.encode(json))
}

#[async_trait]
impl SpeechAssessor for AzureSpeechClient {
    async fn recognize(
        &self,
        audio: &Path,
        config: &PronunciationConfig,
    ) -> Result<ProviderResult, AssessmentError> {
        let audio_bytes = tokio::fs::read(audio).await?;
        debug!("Sending {} bytes to speech service", audio_bytes.len());

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("language", self.language.as_str()), ("format", "detailed")])
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, WAV_CONTENT_TYPE)
            .header(ACCEPT, "application/json")
            .header(PRONUNCIATION_HEADER, assessment_header(config)?)
            .body(audio_bytes)
            .send()
            .await
            .map_err(|e| {
                error!("Speech service request failed: {}", e);
                let reason = if e.is_timeout() { "Timeout" } else { "Transport" };
                AssessmentError::ProviderError {
                    reason: reason.to_string(),
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read speech service response: {}", e);
            AssessmentError::ProviderError {
                reason: "Transport".to_string(),
            }
        })?;

        if !status.is_success() {
            warn!("Speech service returned {}", status);
            debug!("Speech service error body: {}", body);
            return Err(AssessmentError::ProviderError {
                reason: format!("Http{}", status.as_u16()),
            });
        }

        parse_detailed_response(&body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecognitionEnvelope {
    recognition_status: String,
    #[serde(default)]
    display_text: Option<String>,
    #[serde(rename = "NBest", default)]
    n_best: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Hypothesis {
    #[serde(default)]
    display: Option<String>,
    #[serde(default)]
    pronunciation_assessment: Option<Scores>,
    // Older responses put the scores directly on the hypothesis.
    #[serde(flatten)]
    flat: Scores,
    #[serde(default)]
    words: Vec<Word>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Scores {
    accuracy_score: Option<f64>,
    fluency_score: Option<f64>,
    completeness_score: Option<f64>,
    prosody_score: Option<f64>,
    #[serde(alias = "PronunciationScore")]
    pron_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Word {
    word: String,
    #[serde(default)]
    pronunciation_assessment: Option<WordAssessment>,
    #[serde(default)]
    accuracy_score: Option<f64>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    phonemes: Vec<Phoneme>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct WordAssessment {
    accuracy_score: Option<f64>,
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Phoneme {
    phoneme: String,
    #[serde(default)]
    pronunciation_assessment: Option<PhonemeAssessment>,
    #[serde(default)]
    accuracy_score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct PhonemeAssessment {
    accuracy_score: Option<f64>,
}

fn outcome_for_status(status: &str) -> RecognitionOutcome {
    match status {
        "Success" => RecognitionOutcome::RecognizedSpeech,
        "NoMatch" | "InitialSilenceTimeout" | "BabbleTimeout" => RecognitionOutcome::NoMatch,
        other => RecognitionOutcome::Failed(other.to_string()),
    }
}

fn merge_scores(nested: Option<Scores>, flat: Scores) -> ProviderScores {
    let nested = nested.unwrap_or_default();
    ProviderScores {
        accuracy: nested.accuracy_score.or(flat.accuracy_score),
        fluency: nested.fluency_score.or(flat.fluency_score),
        completeness: nested.completeness_score.or(flat.completeness_score),
        prosody: nested.prosody_score.or(flat.prosody_score),
        pronunciation: nested.pron_score.or(flat.pron_score),
    }
}

impl From<Word> for ProviderWord {
    fn from(word: Word) -> Self {
        let assessment = word.pronunciation_assessment.unwrap_or_default();
        ProviderWord {
            text: word.word,
            accuracy_score: assessment.accuracy_score.or(word.accuracy_score),
            error_type: assessment.error_type.or(word.error_type),
            phonemes: word
                .phonemes
                .into_iter()
                .map(|p| ProviderPhoneme {
                    symbol: p.phoneme,
                    accuracy_score: p
                        .pronunciation_assessment
                        .and_then(|a| a.accuracy_score)
                        .or(p.accuracy_score),
                })
                .collect(),
        }
    }
}

/// Decode a `format=detailed` response body into the typed result.
///
/// The best hypothesis is decoded strictly; if that fails the typed scores
/// and words stay empty and only the raw body carries the detail.
pub fn parse_detailed_response(body: &str) -> Result<ProviderResult, AssessmentError> {
    let envelope: RecognitionEnvelope = serde_json::from_str(body).map_err(|e| {
        error!("Unexpected speech service response: {}", e);
        AssessmentError::ProviderError {
            reason: "MalformedResponse".to_string(),
        }
    })?;

    let mut result = ProviderResult::with_outcome(outcome_for_status(&envelope.recognition_status));
    result.raw_json = Some(body.to_string());

    let hypothesis = match envelope.n_best.into_iter().next() {
        Some(value) => match serde_json::from_value::<Hypothesis>(value) {
            Ok(h) => Some(h),
            Err(e) => {
                debug!("Best hypothesis did not match the typed shape: {}", e);
                None
            }
        },
        None => None,
    };

    let display = hypothesis.as_ref().and_then(|h| h.display.clone());
    result.text = envelope.display_text.or(display).unwrap_or_default();

    if let Some(h) = hypothesis {
        result.scores = merge_scores(h.pronunciation_assessment, h.flat);
        result.words = h.words.into_iter().map(ProviderWord::from).collect();
    }

    Ok(result)
}
