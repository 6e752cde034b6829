use serde_json::Value;
use tracing::{debug, warn};

use super::model::{AssessmentResponse, AssessmentType, PhonemeScore, WordScore};
use crate::assessment::{ProviderResult, ProviderScores, ProviderWord};
use crate::error::AssessmentError;

/// Where word-level detail is read from.
enum DetailSource<'a> {
    Structured(&'a [ProviderWord]),
    RawJson(&'a str),
}

impl<'a> DetailSource<'a> {
    fn words(&self) -> Result<Vec<WordScore>, AssessmentError> {
        match self {
            DetailSource::Structured(words) => Ok(words.iter().map(word_from_structured).collect()),
            DetailSource::RawJson(raw) => words_from_raw(raw),
        }
    }
}

/// Word detail from the typed result, falling back to the raw document.
///
/// Returns `None` when neither source has any words. A raw document that
/// cannot be read is treated the same as one without detail.
pub fn extract(result: &ProviderResult) -> Option<Vec<WordScore>> {
    let mut sources = Vec::with_capacity(2);
    if !result.words.is_empty() {
        sources.push(DetailSource::Structured(&result.words));
    }
    if let Some(raw) = result.raw_json.as_deref() {
        sources.push(DetailSource::RawJson(raw));
    }

    for source in sources {
        match source.words() {
            Ok(words) if !words.is_empty() => return Some(words),
            Ok(_) => {}
            Err(e) => debug!("Ignoring word detail: {}", e),
        }
    }
    None
}

/// Build the response for a recognized utterance.
pub fn normalize(result: &ProviderResult, reference_text: &str) -> AssessmentResponse {
    let scores = merged_scores(result);
    let words = extract(result).unwrap_or_default();

    let accuracy_score = scores.accuracy.unwrap_or_else(|| {
        warn!("Provider reported no accuracy score");
        0.0
    });
    let fluency_score = scores.fluency.unwrap_or_else(|| {
        warn!("Provider reported no fluency score");
        0.0
    });

    AssessmentResponse {
        recognized_text: result.text.clone(),
        accuracy_score,
        fluency_score,
        completeness_score: scores.completeness,
        prosody_score: scores.prosody,
        pronunciation_score: scores.pronunciation,
        words,
        assessment_type: AssessmentType::from_reference(reference_text),
    }
}

/// Typed scores, with any unset field looked up in the raw best hypothesis.
fn merged_scores(result: &ProviderResult) -> ProviderScores {
    let typed = result.scores.clone();
    let raw = result
        .raw_json
        .as_deref()
        .and_then(|raw| best_hypothesis(raw).ok())
        .map(|h| scores_from_raw(&h))
        .unwrap_or_default();

    ProviderScores {
        accuracy: typed.accuracy.or(raw.accuracy),
        fluency: typed.fluency.or(raw.fluency),
        completeness: typed.completeness.or(raw.completeness),
        prosody: typed.prosody.or(raw.prosody),
        pronunciation: typed.pronunciation.or(raw.pronunciation),
    }
}

fn word_from_structured(word: &ProviderWord) -> WordScore {
    WordScore {
        word: word.text.clone(),
        accuracy_score: word.accuracy_score,
        error_type: word.error_type.clone(),
        phonemes: word
            .phonemes
            .iter()
            .map(|p| PhonemeScore {
                phoneme: p.symbol.clone(),
                accuracy_score: p.accuracy_score,
            })
            .collect(),
    }
}

fn best_hypothesis(raw: &str) -> Result<Value, AssessmentError> {
    let mut document: Value = serde_json::from_str(raw)
        .map_err(|e| AssessmentError::ResponseParseIncomplete(e.to_string()))?;

    match document.get_mut("NBest").and_then(Value::as_array_mut) {
        Some(hypotheses) if !hypotheses.is_empty() => Ok(hypotheses.swap_remove(0)),
        _ => Err(AssessmentError::ResponseParseIncomplete(
            "no NBest hypothesis".to_string(),
        )),
    }
}

fn words_from_raw(raw: &str) -> Result<Vec<WordScore>, AssessmentError> {
    let hypothesis = best_hypothesis(raw)?;
    let words = hypothesis
        .get("Words")
        .and_then(Value::as_array)
        .map(|words| words.iter().map(word_from_raw).collect())
        .unwrap_or_default();
    Ok(words)
}

fn word_from_raw(word: &Value) -> WordScore {
    let phonemes = word
        .get("Phonemes")
        .and_then(Value::as_array)
        .map(|phonemes| {
            phonemes
                .iter()
                .map(|p| PhonemeScore {
                    phoneme: text_field(p, "Phoneme"),
                    accuracy_score: assessed_number(p, "AccuracyScore"),
                })
                .collect()
        })
        .unwrap_or_default();

    WordScore {
        word: text_field(word, "Word"),
        accuracy_score: assessed_number(word, "AccuracyScore"),
        error_type: assessed_value(word, "ErrorType")
            .and_then(Value::as_str)
            .map(str::to_string),
        phonemes,
    }
}

fn scores_from_raw(hypothesis: &Value) -> ProviderScores {
    ProviderScores {
        accuracy: assessed_number(hypothesis, "AccuracyScore"),
        fluency: assessed_number(hypothesis, "FluencyScore"),
        completeness: assessed_number(hypothesis, "CompletenessScore"),
        prosody: assessed_number(hypothesis, "ProsodyScore"),
        pronunciation: assessed_number(hypothesis, "PronScore")
            .or_else(|| assessed_number(hypothesis, "PronunciationScore")),
    }
}

fn text_field(node: &Value, key: &str) -> String {
    node.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// `node.PronunciationAssessment.<key>`, or `node.<key>` on the flat shape.
fn assessed_value<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    node.get("PronunciationAssessment")
        .and_then(|a| a.get(key))
        .filter(|v| !v.is_null())
        .or_else(|| node.get(key).filter(|v| !v.is_null()))
}

fn assessed_number(node: &Value, key: &str) -> Option<f64> {
    assessed_value(node, key).and_then(Value::as_f64)
}
