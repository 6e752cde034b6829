use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::AudioConfig;
use crate::error::AssessmentError;

/// Container the speech provider accepts without conversion.
pub const CANONICAL_EXTENSION: &str = "wav";

const SAMPLE_RATE_HZ: &str = "16000";
const CHANNELS: &str = "1";
const SAMPLE_FORMAT: &str = "s16";

/// A 16 kHz / mono / 16-bit PCM WAV file ready for assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalAudio {
    pub path: PathBuf,
    /// False when the upload was already canonical and is used as-is.
    pub converted: bool,
}

/// Extension given to uploads whose filename suffix is not a plain extension.
pub const UNKNOWN_EXTENSION: &str = "bin";

const MAX_EXTENSION_LEN: usize = 8;

/// Lowercased extension of an uploaded filename, `wav` when there is none.
///
/// The result becomes part of an on-disk filename, so a suffix that is not a
/// short ASCII-alphanumeric token maps to [`UNKNOWN_EXTENSION`] and goes
/// through conversion.
pub fn file_extension(filename: Option<&str>) -> String {
    let Some((_, ext)) = filename.and_then(|name| name.rsplit_once('.')) else {
        return CANONICAL_EXTENSION.to_string();
    };

    let ext = ext.trim();
    if ext.is_empty() {
        return CANONICAL_EXTENSION.to_string();
    }
    if ext.len() > MAX_EXTENSION_LEN || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        debug!("Ignoring unusable upload extension {:?}", ext);
        return UNKNOWN_EXTENSION.to_string();
    }
    ext.to_ascii_lowercase()
}

/// Brings uploads into the canonical format through an external ffmpeg process.
#[derive(Debug, Clone)]
pub struct AudioNormalizer {
    ffmpeg_path: String,
    timeout: Duration,
}

impl AudioNormalizer {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            timeout: config.conversion_timeout(),
        }
    }

    pub fn needs_conversion(extension: &str) -> bool {
        !extension.eq_ignore_ascii_case(CANONICAL_EXTENSION)
    }

    /// Presence probe for the transcoder. Does not run it.
    pub fn is_available(&self) -> bool {
        self.locate_ffmpeg().is_some()
    }

    fn locate_ffmpeg(&self) -> Option<PathBuf> {
        let program = Path::new(&self.ffmpeg_path);
        if program.is_absolute() || program.components().count() > 1 {
            return is_executable(program).then(|| program.to_path_buf());
        }

        let search_path = std::env::var_os("PATH")?;
        std::env::split_paths(&search_path)
            .flat_map(|dir| executable_candidates(&dir, &self.ffmpeg_path))
            .find(|candidate| is_executable(candidate))
    }

    /// Return a canonical version of `input`.
    ///
    /// Canonical uploads are returned unchanged and the transcoder is never
    /// touched. Anything else is converted into `output`.
    pub async fn normalize(
        &self,
        input: &Path,
        extension: &str,
        output: &Path,
    ) -> Result<CanonicalAudio, AssessmentError> {
        if !Self::needs_conversion(extension) {
            debug!("Upload is already canonical: {}", input.display());
            return Ok(CanonicalAudio {
                path: input.to_path_buf(),
                converted: false,
            });
        }

        let ffmpeg = self.locate_ffmpeg().ok_or_else(|| {
            warn!("ffmpeg not found (looked for '{}')", self.ffmpeg_path);
            AssessmentError::UnsupportedFormat {
                extension: extension.to_string(),
            }
        })?;

        info!("Converting .{} upload to 16kHz mono WAV", extension);
        self.convert(&ffmpeg, input, output).await?;

        Ok(CanonicalAudio {
            path: output.to_path_buf(),
            converted: true,
        })
    }

    async fn convert(&self, ffmpeg: &Path, input: &Path, output: &Path) -> Result<(), AssessmentError> {
        let mut command = Command::new(ffmpeg);
        command
            .arg("-nostdin")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-ar", SAMPLE_RATE_HZ])
            .args(["-ac", CHANNELS])
            .args(["-sample_fmt", SAMPLE_FORMAT])
            .args(["-f", CANONICAL_EXTENSION])
            .arg(output)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let result = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result,
            Err(_) => {
                warn!("ffmpeg did not finish within {:?}, killed", self.timeout);
                return Err(AssessmentError::ConversionFailed);
            }
        };

        let output_status = match result {
            Ok(out) => out,
            Err(e) => {
                error!("Failed to run ffmpeg: {}", e);
                return Err(AssessmentError::ConversionFailed);
            }
        };

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            warn!("ffmpeg exited with {}", output_status.status);
            debug!("ffmpeg stderr: {}", stderr.trim());
            return Err(AssessmentError::ConversionFailed);
        }

        debug!("Converted audio written to {}", output.display());
        Ok(())
    }
}

fn executable_candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    let mut candidates = vec![dir.join(program)];
    if cfg!(windows) && Path::new(program).extension().is_none() {
        candidates.push(dir.join(format!("{}.exe", program)));
    }
    candidates
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
