pub mod normalizer;
pub mod workspace;

pub use normalizer::{file_extension, AudioNormalizer, CanonicalAudio, CANONICAL_EXTENSION};
pub use workspace::UploadWorkspace;
