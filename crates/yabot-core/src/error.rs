//! Unified error types for the yabot core.
//!
//! Framework-level errors (handler failures, extraction errors) live in
//! `yabot-framework`; runtime and configuration errors live in `yabot-runtime`.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur while talking to the remote Bot API.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a status other than 200 OK.
    #[error("HTTP {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The (possibly truncated) response body.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The transport is misconfigured.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Returns `true` for errors caused by the network rather than the server.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Timeout)
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// =============================================================================
// Parse Errors
// =============================================================================

/// Reasons a raw update is rejected before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The update is not a JSON object.
    #[error("update is not an object")]
    NotAnObject,

    /// `update_id` is missing or not an integer.
    #[error("update has no integer update_id")]
    MissingUpdateId,

    /// `from.login` is missing, empty or not a string.
    #[error("update has no sender login")]
    MissingSender,

    /// The callback payload is neither an object nor a JSON-encoded object.
    #[error("invalid callback payload: {reason}")]
    InvalidPayload {
        /// Why the payload was rejected.
        reason: String,
    },
}

impl ParseError {
    /// Creates an invalid payload error.
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for update parsing.
pub type ParseResult<T> = Result<T, ParseError>;
