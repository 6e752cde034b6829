pub mod azure;
pub mod client;
pub mod factory;
pub mod interface;

pub use client::AssessmentClient;
pub use factory::AssessorFactory;
pub use interface::{
    PronunciationConfig, ProviderPhoneme, ProviderResult, ProviderScores, ProviderWord,
    RecognitionOutcome, SpeechAssessor,
};
