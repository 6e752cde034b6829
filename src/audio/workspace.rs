use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::AssessmentError;

/// Request-scoped temporary directory holding the upload and its converted copy.
///
/// Everything inside is removed when the workspace is closed or dropped, so
/// every exit path of a request releases its files.
pub struct UploadWorkspace {
    dir: TempDir,
}

impl UploadWorkspace {
    pub fn create(root: &Path) -> Result<Self, AssessmentError> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix("assess-")
            .tempdir_in(root)?;
        debug!("Created upload workspace: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write the uploaded bytes as `upload.<extension>` and return the path.
    pub async fn persist_upload(
        &self,
        bytes: &[u8],
        extension: &str,
    ) -> Result<PathBuf, AssessmentError> {
        let path = self.dir.path().join(format!("upload.{}", extension));
        tokio::fs::write(&path, bytes).await?;
        debug!("Persisted upload ({} bytes) to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Destination for the transcoder output.
    pub fn converted_path(&self) -> PathBuf {
        self.dir.path().join("converted.wav")
    }

    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed upload workspace: {}", path.display()),
            Err(e) => warn!("Failed to remove upload workspace {}: {}", path.display(), e),
        }
    }
}
