//! Error types for the noisy-speller library.
//!
//! All fallible operations return [`SpellError`] through the crate-wide
//! [`Result`] alias. Situations the corrector recovers from on its own (a
//! misspelling with no known word nearby, a sentence too short to fill an
//! n-gram context) are not errors and never show up here.
//!
//! # Examples
//!
//! ```
//! use noisy_speller::error::{SpellError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SpellError::invalid_config("n-gram order must be between 1 and 3"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for noisy-speller operations.
#[derive(Error, Debug)]
pub enum SpellError {
    /// I/O errors (corpus files, error tables, config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A model was used before it was trained or loaded
    #[error("Untrained model: {0}")]
    UntrainedModel(String),

    /// Invalid configuration values
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed confusion-matrix record
    #[error("Invalid error record: {0}")]
    InvalidErrorRecord(String),

    /// Malformed corpus or frequency file content
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with SpellError.
pub type Result<T> = std::result::Result<T, SpellError>;

impl SpellError {
    /// Create a new untrained model error.
    pub fn untrained<S: Into<String>>(msg: S) -> Self {
        SpellError::UntrainedModel(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        SpellError::InvalidConfig(msg.into())
    }

    /// Create a new invalid error record error.
    pub fn invalid_record<S: Into<String>>(msg: S) -> Self {
        SpellError::InvalidErrorRecord(msg.into())
    }

    /// Create a new parse error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        SpellError::Parse(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SpellError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = SpellError::untrained("language model");
        assert_eq!(error.to_string(), "Untrained model: language model");

        let error = SpellError::invalid_config("order must be 1..=3");
        assert_eq!(
            error.to_string(),
            "Invalid configuration: order must be 1..=3"
        );

        let error = SpellError::invalid_record("unknown operation 'swap'");
        assert_eq!(
            error.to_string(),
            "Invalid error record: unknown operation 'swap'"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let spell_error = SpellError::from(io_error);

        match spell_error {
            SpellError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }
}
