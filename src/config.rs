use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use anyhow::Result;

/// Environment variables kept from the original deployment, mapped onto config keys.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("AZURE_SPEECH_KEY", "speech_config.api_key"),
    ("AZURE_SERVICE_REGION", "speech_config.region"),
    ("AZURE_SPEECH_LANGUAGE", "speech_config.language"),
    ("AZURE_SPEECH_ENDPOINT", "speech_config.endpoint"),
    ("PORT", "system_config.port"),
    ("FFMPEG_PATH", "audio_config.ffmpeg_path"),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_config: SystemConfig,
    #[serde(default)]
    pub speech_config: SpeechConfig,
    #[serde(default)]
    pub audio_config: AudioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Parent directory for per-request workspaces. System temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Full recognition URL, replacing the one derived from `region`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_region() -> String {
    "eastus".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    #[serde(default = "default_conversion_timeout_secs")]
    pub conversion_timeout_secs: u64,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_conversion_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Load the YAML/JSON file at `path` (if it exists) and apply environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var("CONFIG_PATH").ok())
            .unwrap_or_else(|| "conf.yaml".to_string());

        let mut builder = ::config::Config::builder()
            .add_source(::config::File::with_name(&path).required(false))
            .add_source(
                ::config::Environment::with_prefix("PRONUNCIATION")
                    .prefix_separator("__")
                    .separator("__"),
            );

        for (var, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        Self::from_builder(builder)
    }

    pub(crate) fn from_builder(
        builder: ::config::ConfigBuilder<::config::builder::DefaultState>,
    ) -> Result<Self> {
        let config: Config = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}

impl SystemConfig {
    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl SpeechConfig {
    /// The subscription key, treating a blank value as missing.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AudioConfig {
    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            temp_dir: None,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            region: default_region(),
            language: default_language(),
            endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// Hand-written so the subscription key never reaches the logs.
impl std::fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("api_key", &self.api_key().map(|_| "***"))
            .field("region", &self.region)
            .field("language", &self.language)
            .field("endpoint", &self.endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            conversion_timeout_secs: default_conversion_timeout_secs(),
        }
    }
}
