//! crates/movie_quiz_core/src/error.rs
//!
//! Defines the error type shared by every quiz operation.

use crate::ports::PortError;

/// Errors surfaced by the quiz core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    /// The daily start budget is used up.
    #[error("Daily limit reached ({limit} quizzes per day)")]
    QuotaExceeded { limit: u32 },

    /// Unknown or expired session, or no movie matched the filters.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generated text did not have the required line shape.
    #[error("Chat replied with an unexpected format. chat_reply: {raw}")]
    Format { raw: String },

    /// The chat backend call itself failed.
    #[error("Chat backend error: {0}")]
    Backend(String),

    /// Every attempt failed with a recoverable error; `source` is the last one.
    #[error("Giving up after {attempts} attempts: {source}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        source: Box<QuizError>,
    },

    /// Loading or saving the stats checkpoint failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias used across the core.
pub type QuizResult<T> = Result<T, QuizError>;

/// Classifies failures the retry executor may try again.
pub trait Recoverable {
    fn is_recoverable(&self) -> bool;
}

impl Recoverable for QuizError {
    fn is_recoverable(&self) -> bool {
        matches!(self, QuizError::Format { .. } | QuizError::Backend(_))
    }
}

impl From<PortError> for QuizError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => QuizError::NotFound(what),
            PortError::Unexpected(msg) => QuizError::Internal(msg),
        }
    }
}
