//! # noisy-speller
//!
//! Context-sensitive spelling correction with the noisy channel model.
//!
//! ## Features
//!
//! - Confusion-matrix error model for insertions, deletions, substitutions
//!   and transpositions
//! - Word and character n-gram language models with add-k smoothing
//! - Candidate search up to two edits away
//! - Detection of unknown words and of known words that do not fit their context
//! - Parallel correction of independent sentences

pub mod cli;
pub mod error;
pub mod spelling;
pub mod text;

pub mod prelude {
    pub use crate::error::{Result, SpellError};
    pub use crate::spelling::{
        CheckerConfig, Correction, CorrectionOutcome, ErrorRecord, SpellChecker,
    };
    pub use crate::text::{split_sentences, tokenize};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
