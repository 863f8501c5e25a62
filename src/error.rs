//! Error taxonomy for the quiz pipeline.
//!
//! Four families, with different recovery semantics:
//! - `SchemaError` - malformed annotation table, fatal for that input
//! - `BackendError` - AI backend unreachable/slow, recoverable, quiz state unchanged
//! - `LifecycleError` - caller misuse of the quiz state machine
//! - parse structural violations are *not* errors at this level: the parser
//!   recovers them per question and marks the result instead

use std::time::Duration;

use thiserror::Error;

use crate::models::quiz::QuizStatus;

/// Malformed annotation table. Generation from this input cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("annotation table is empty")]
    EmptyTable,

    #[error("row {row}: expected columns code,title,begin,end,text")]
    MissingColumns { row: usize },

    #[error("row {row}: offset '{value}' is not a number")]
    BadOffset { row: usize, value: String },

    #[error("row {row}: begin {begin} must be smaller than end {end}")]
    InvertedSpan { row: usize, begin: usize, end: usize },
}

/// AI backend failure. Recoverable: the caller may retry, no quiz state is lost.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("AI backend not available: {0}")]
    Unavailable(String),

    #[error("AI backend request failed: {0}")]
    Request(String),

    #[error("AI backend returned an empty response")]
    EmptyResponse,

    #[error("AI backend call timed out after {0:?}")]
    Timeout(Duration),
}

impl BackendError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Timeout(_))
    }
}

/// Misuse of the quiz lifecycle. Indicates a caller bug, not a user mistake.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("illegal transition: cannot {action} while the quiz is {from:?}")]
    IllegalTransition {
        from: QuizStatus,
        action: &'static str,
    },

    #[error("question index {index} out of range, quiz has {len} questions")]
    QuestionOutOfRange { index: usize, len: usize },

    #[error("edit rejected: {0}")]
    InvalidPatch(String),

    #[error("no quiz has been generated in this session")]
    NoQuiz,
}

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("annotation table error: {0}")]
    Schema(#[from] SchemaError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_messages_name_the_row() {
        let err = SchemaError::BadOffset {
            row: 3,
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "row 3: offset 'abc' is not a number");
    }

    #[test]
    fn timeout_is_recognised() {
        assert!(BackendError::Timeout(Duration::from_secs(60)).is_timeout());
        assert!(!BackendError::EmptyResponse.is_timeout());
    }
}
