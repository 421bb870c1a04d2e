//! Error types for the yabot framework.

use std::any::Any;

use thiserror::Error;
use tower::BoxError;

/// Errors that can occur during context extraction.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The event kind does not match the extractor.
    #[error("event kind mismatch: expected '{expected}', got '{got}'")]
    EventKindMismatch {
        /// Expected event kind.
        expected: &'static str,
        /// Actual event kind.
        got: &'static str,
    },

    /// The callback payload could not be deserialized.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Why a handler invocation did not complete normally.
///
/// The dispatcher treats every variant as "not handled": message, callback
/// and default handlers fall through to the next candidate, button handlers
/// answer with the action error reply.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A handler parameter could not be extracted.
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Failed(BoxError),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Wraps any error returned by a handler.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(err.into())
    }

    /// Builds an error from a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(msg)
    }
}

/// What a handler reported back to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event is handled; dispatch stops.
    Handled,
    /// The handler passes; message dispatch tries the next candidate.
    Declined,
}

/// Result of one handler invocation.
pub type HandlerResult = Result<Outcome, HandlerError>;
