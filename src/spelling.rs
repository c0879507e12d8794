//! Noisy channel spelling correction.
//!
//! The engine is assembled from independent parts:
//!
//! - [`Vocabulary`]: the known words and their frequencies.
//! - [`LanguageModel`]: add-k smoothed n-gram models over words and characters.
//! - [`ErrorModel`]: confusion-matrix probabilities for single-character edits.
//! - [`CandidateGenerator`]: known words within two edits of a token.
//! - [`RankingEngine`]: channel probability times contextual probability.
//! - [`SpellChecker`]: detection and correction of one token per sentence.

pub mod candidates;
pub mod checker;
pub mod distance;
pub mod error_model;
pub mod language_model;
pub mod ngram;
pub mod ranking;
pub mod vocabulary;

// Re-export commonly used types
pub use candidates::{Candidate, CandidateGenerator, GeneratorConfig};
pub use checker::{
    CheckerConfig, Correction, CorrectionContext, CorrectionOutcome, SpellChecker, Suspect,
    SuspectKind,
};
pub use distance::edit_distance;
pub use error_model::{
    ConfusionMatrix, EditOperation, EditStep, ErrorModel, ErrorModelConfig, ErrorRecord,
    ErrorTables, Normalization,
};
pub use language_model::{
    CharModel, LanguageModel, LanguageModelConfig, LanguageModelStats, Sampler, WordModel,
};
pub use ngram::{NGramTable, Token};
pub use ranking::{RankingConfig, RankingEngine, ScoredCandidate};
pub use vocabulary::Vocabulary;
