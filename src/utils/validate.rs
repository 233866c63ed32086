//! Input validation for inbound passages.
//!
//! Validation runs at the edge (HTTP handler, MCP tool, CLI) before the
//! citation pipeline sees the text.

use thiserror::Error;

/// Fewest words a passage may contain
pub const MIN_WORD_COUNT: usize = 5;

/// Most words a passage may contain
pub const MAX_WORD_COUNT: usize = 300;

/// Validation error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Text must be between {min} and {max} words. Current word count: {actual}")]
    WordCount {
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Count whitespace-separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Check that a passage has between [`MIN_WORD_COUNT`] and [`MAX_WORD_COUNT`] words.
pub fn validate_passage(text: &str) -> Result<(), ValidationError> {
    let actual = word_count(text);
    if (MIN_WORD_COUNT..=MAX_WORD_COUNT).contains(&actual) {
        Ok(())
    } else {
        Err(ValidationError::WordCount {
            min: MIN_WORD_COUNT,
            max: MAX_WORD_COUNT,
            actual,
        })
    }
}
