pub mod model;
pub mod normalizer;

pub use model::{AssessmentResponse, AssessmentType, PhonemeScore, WordScore};
pub use normalizer::{extract, normalize};
