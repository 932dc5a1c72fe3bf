//! Error types for executable stories
//!
//! Story bookkeeping never surfaces these to a test author: the builder and
//! the finalizer log and swallow them. They exist so that internal helpers can
//! propagate failures with `?` up to those boundaries.

use thiserror::Error;

/// Result type alias for story operations
pub type StoryResult<T> = std::result::Result<T, StoryError>;

/// Errors raised while building stories
#[derive(Debug, Error)]
pub enum StoryError {
    /// Unknown step keyword
    #[error("Invalid keyword: {0}")]
    InvalidKeyword(String),

    /// Unknown test status
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Story state could not be accessed (re-entrant use, already finalized)
    #[error("Invalid story state: {0}")]
    InvalidState(String),
}

impl StoryError {
    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}
