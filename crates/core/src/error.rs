//! Unified error types for uscrape.
//!
//! Every variant carries a stable code prefix so MCP clients can match on it.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the fingerprint cache and its tool surface.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty tool argument).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The document could not be structurally analyzed.
    #[error("PARSE_ERROR: {0}")]
    Parse(String),

    /// No cache entry found for the given fingerprint.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// The durable store could not be reached or the operation failed.
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_UNAVAILABLE: migration failed: {0}")]
    MigrationFailed(String),

    /// Fingerprint text is not 32 hex characters.
    #[error("INVALID_FINGERPRINT: {0}")]
    InvalidFingerprint(String),

    /// The external code generator failed, timed out, or was cancelled.
    #[error("GENERATION_FAILED: {0}")]
    Generation(#[from] GenerationError),

    /// Reused code was rejected by the extraction verifier.
    #[error("INVALIDATED_ENTRY: {0}")]
    InvalidatedEntry(String),
}

impl Error {
    /// Whether this error came from the storage layer.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::MigrationFailed(_))
    }
}

/// Failure reported by a code generation attempt.
///
/// Cloneable so one failed attempt can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct GenerationError {
    message: String,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// The leading generation was dropped before it produced a result.
    pub fn cancelled() -> Self {
        Self::new("generation cancelled before completion")
    }

    pub fn timed_out(after: std::time::Duration) -> Self {
        Self::new(format!("generation timed out after {}ms", after.as_millis()))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::StoreUnavailable(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::StoreUnavailable(tokio_rusqlite::Error::Close(c)),
            _ => Error::StoreUnavailable(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::StoreUnavailable(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::StoreUnavailable(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidFingerprint(msg) => (-32602, format!("invalid fingerprint: {msg}")),
            Error::Parse(msg) => (-32000, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::StoreUnavailable(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::Generation(e) => (-32003, e.to_string()),
            Error::InvalidatedEntry(msg) => (-32004, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("abc123".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("abc123"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::CacheMiss("abc123".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);
    }

    #[test]
    fn test_generation_error_wraps_message() {
        let err: Error = GenerationError::new("model refused").into();
        assert_eq!(err.to_string(), "GENERATION_FAILED: model refused");
        assert!(!err.is_store_unavailable());
    }

    #[test]
    fn test_store_unavailable_classification() {
        let err = Error::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.is_store_unavailable());
        assert!(err.to_string().starts_with("STORE_UNAVAILABLE"));
    }
}
