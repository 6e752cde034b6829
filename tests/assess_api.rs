use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use pronunciation_backend::assessment::{
    PronunciationConfig, ProviderPhoneme, ProviderResult, ProviderWord, RecognitionOutcome,
    SpeechAssessor,
};
use pronunciation_backend::config::Config;
use pronunciation_backend::error::AssessmentError;
use pronunciation_backend::routes::build_app;
use pronunciation_backend::state::AppState;

const BOUNDARY: &str = "assess-test-boundary";

struct FakeAssessor {
    result: ProviderResult,
    calls: AtomicUsize,
    configs: Mutex<Vec<PronunciationConfig>>,
    audio_seen: Mutex<Vec<Vec<u8>>>,
}

impl FakeAssessor {
    fn returning(result: ProviderResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
            configs: Mutex::new(Vec::new()),
            audio_seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechAssessor for FakeAssessor {
    async fn recognize(
        &self,
        audio: &Path,
        config: &PronunciationConfig,
    ) -> Result<ProviderResult, AssessmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().unwrap().push(config.clone());
        self.audio_seen.lock().unwrap().push(std::fs::read(audio)?);
        Ok(self.result.clone())
    }
}

struct TestApp {
    router: Router,
    workspaces: TempDir,
}

impl TestApp {
    fn new(assessor: Option<Arc<FakeAssessor>>) -> Self {
        Self::with_config(assessor, |_| {})
    }

    fn with_config(assessor: Option<Arc<FakeAssessor>>, customize: impl FnOnce(&mut Config)) -> Self {
        let workspaces = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.audio_config.ffmpeg_path = "/nonexistent/bin/ffmpeg".to_string();
        config.system_config.temp_dir = Some(workspaces.path().to_string_lossy().into_owned());
        customize(&mut config);

        let assessor = assessor.map(|a| a as Arc<dyn SpeechAssessor>);
        let router = build_app(AppState::with_assessor(config, assessor));
        Self { router, workspaces }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(self.workspaces.path()).unwrap().count()
    }
}

fn upload(uri: &str, field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

fn recognized() -> ProviderResult {
    let mut result = ProviderResult::with_outcome(RecognitionOutcome::RecognizedSpeech);
    result.text = "The quick brown fox.".to_string();
    result.scores.accuracy = Some(92.5);
    result.scores.fluency = Some(85.0);
    result.scores.prosody = Some(70.0);
    result.words = vec![ProviderWord {
        text: "the".to_string(),
        accuracy_score: Some(93.0),
        error_type: Some("None".to_string()),
        phonemes: vec![
            ProviderPhoneme { symbol: "ð".to_string(), accuracy_score: Some(95.0) },
            ProviderPhoneme { symbol: "ə".to_string(), accuracy_score: Some(88.5) },
        ],
    }];
    result
}

#[tokio::test]
async fn root_reports_running() {
    let app = TestApp::new(None);
    let (status, body) = app
        .send(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn health_reports_missing_ffmpeg() {
    let app = TestApp::new(None);
    let (status, body) = app
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy", "ffmpeg_available": false}));
}

#[tokio::test]
async fn scripted_wav_upload_is_assessed() {
    let assessor = FakeAssessor::returning(recognized());
    let app = TestApp::new(Some(assessor.clone()));

    let (status, body) = app
        .send(upload(
            "/assess?reference_text=the%20quick%20brown%20fox",
            "audio_file",
            "speech.WAV",
            b"RIFF-audio",
        ))
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["assessment_type"], "SCRIPTED");
    assert_eq!(body["recognized_text"], "The quick brown fox.");
    assert_eq!(body["accuracy_score"], json!(92.5));
    assert_eq!(body["completeness_score"], Value::Null);
    assert_eq!(body["pronunciation_score"], Value::Null);
    assert_eq!(
        body["words"][0]["phonemes"],
        json!([
            {"phoneme": "ð", "accuracy_score": 95.0},
            {"phoneme": "ə", "accuracy_score": 88.5}
        ])
    );

    assert_eq!(assessor.calls(), 1);
    assert!(assessor.configs.lock().unwrap()[0].enable_miscue);
    assert_eq!(assessor.audio_seen.lock().unwrap()[0], b"RIFF-audio");
    assert_eq!(app.leftover_workspaces(), 0);
}

#[tokio::test]
async fn empty_reference_is_unscripted() {
    let assessor = FakeAssessor::returning(recognized());
    let app = TestApp::new(Some(assessor.clone()));

    let (status, body) = app.send(upload("/assess", "file", "speech.wav", b"RIFF")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assessment_type"], "UNSCRIPTED");
    assert!(!assessor.configs.lock().unwrap()[0].enable_miscue);
}

#[tokio::test]
async fn webm_without_converter_never_reaches_provider() {
    let assessor = FakeAssessor::returning(recognized());
    let app = TestApp::new(Some(assessor.clone()));

    let (status, body) = app
        .send(upload("/assess", "audio_file", "clip.webm", b"\x1aE\xdf\xa3"))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("ffmpeg"));
    assert_eq!(assessor.calls(), 0);
    assert_eq!(app.leftover_workspaces(), 0);
}

#[tokio::test]
async fn missing_credentials_is_server_error() {
    let app = TestApp::new(None);

    let (status, body) = app.send(upload("/assess", "audio_file", "speech.wav", b"RIFF")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("AZURE_SPEECH_KEY"));
}

#[tokio::test]
async fn missing_credentials_is_reported_before_reading_upload() {
    let app = TestApp::new(None);

    let (status, body) = app.send(upload("/assess", "notes", "notes.txt", b"hello")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("AZURE_SPEECH_KEY"));
    assert_eq!(app.leftover_workspaces(), 0);
}

#[tokio::test]
async fn no_match_is_client_error() {
    let assessor = FakeAssessor::returning(ProviderResult::with_outcome(RecognitionOutcome::NoMatch));
    let app = TestApp::new(Some(assessor));

    let (status, body) = app.send(upload("/assess", "audio_file", "silence.wav", b"RIFF")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("No speech could be recognized"));
    assert_eq!(app.leftover_workspaces(), 0);
}

#[tokio::test]
async fn provider_failure_is_server_error() {
    let assessor = FakeAssessor::returning(ProviderResult::with_outcome(RecognitionOutcome::Failed(
        "Canceled".to_string(),
    )));
    let app = TestApp::new(Some(assessor));

    let (status, body) = app.send(upload("/assess", "audio_file", "speech.wav", b"RIFF")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Speech recognition error: Canceled");
    assert_eq!(app.leftover_workspaces(), 0);
}

#[tokio::test]
async fn raw_json_detail_fills_word_list() {
    let mut result = recognized();
    result.words.clear();
    result.raw_json = Some(
        json!({"NBest": [{"Words": [{
            "Word": "the",
            "PronunciationAssessment": {"AccuracyScore": 93.0, "ErrorType": "None"},
            "Phonemes": [
                {"Phoneme": "ð", "PronunciationAssessment": {"AccuracyScore": 95.0}},
                {"Phoneme": "ə", "PronunciationAssessment": {"AccuracyScore": 88.5}}
            ]
        }]}]})
        .to_string(),
    );
    let app = TestApp::new(Some(FakeAssessor::returning(result)));

    let (status, body) = app.send(upload("/assess", "audio_file", "speech.wav", b"RIFF")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["words"][0]["word"], "the");
    assert_eq!(body["words"][0]["error_type"], "None");
    assert_eq!(body["words"][0]["phonemes"][1]["accuracy_score"], json!(88.5));
}

#[tokio::test]
async fn malformed_raw_json_still_succeeds() {
    let mut result = recognized();
    result.words.clear();
    result.raw_json = Some("{not json".to_string());
    let app = TestApp::new(Some(FakeAssessor::returning(result)));

    let (status, body) = app.send(upload("/assess", "audio_file", "speech.wav", b"RIFF")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["words"], json!([]));
    assert_eq!(body["fluency_score"], json!(85.0));
}

#[tokio::test]
async fn missing_audio_field_is_client_error() {
    let assessor = FakeAssessor::returning(recognized());
    let app = TestApp::new(Some(assessor.clone()));

    let (status, body) = app.send(upload("/assess", "notes", "notes.txt", b"hello")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No audio file provided");
    assert_eq!(assessor.calls(), 0);
}

#[tokio::test]
async fn unusable_filename_suffix_is_client_error() {
    let assessor = FakeAssessor::returning(recognized());
    let app = TestApp::new(Some(assessor.clone()));
    let long_suffix = format!("clip.{}", "a".repeat(300));

    for filename in ["take.v2/clip", long_suffix.as_str()] {
        let (status, body) = app.send(upload("/assess", "audio_file", filename, b"RIFF")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{filename}: {body}");
        assert!(body["detail"].as_str().unwrap().contains("ffmpeg"));
    }
    assert_eq!(assessor.calls(), 0);
    assert_eq!(app.leftover_workspaces(), 0);
}

#[tokio::test]
async fn non_multipart_body_gets_detail() {
    let assessor = FakeAssessor::returning(recognized());
    let app = TestApp::new(Some(assessor.clone()));

    let (status, body) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/assess")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string(), "{body}");
    assert_eq!(assessor.calls(), 0);
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let assessor = FakeAssessor::returning(recognized());
    let app = TestApp::with_config(Some(assessor.clone()), |config| {
        config.system_config.max_upload_bytes = 1024;
    });

    let (status, body) = app
        .send(upload("/assess", "audio_file", "speech.wav", &[0u8; 4096]))
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["detail"], "Upload exceeds the maximum allowed size");
    assert_eq!(assessor.calls(), 0);
}
