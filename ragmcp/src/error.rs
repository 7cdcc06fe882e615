//! Error types for ragmcp

use thiserror::Error;

/// ragmcp error type
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed JSON on either side of the wire
    #[error("Parse error: {0}")]
    Parse(String),

    /// Well-formed JSON that is not a usable JSON-RPC message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// HTTP transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Missing or invalid tool argument
    #[error("Invalid argument: {0}")]
    ToolArgument(String),

    /// Vector store or completion failure
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(String),
}

/// Result type alias for ragmcp operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure classes of an HTTP round trip
#[derive(Error, Debug)]
pub enum TransportError {
    /// Nothing is listening at the target address
    #[error("Connection refused - is the server running at {url}?")]
    ConnectionRefused { url: String },

    /// The end-to-end timeout elapsed
    #[error("Request timed out - server may not be responding")]
    Timeout,

    /// Non-2xx HTTP status
    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was neither JSON nor an event stream carrying JSON
    #[error("Invalid JSON response: {0}")]
    InvalidBody(String),

    /// Any other client-side failure
    #[error("Request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Build a status error, keeping at most 200 characters of the body
    pub fn status(status: u16, body: &str) -> Self {
        TransportError::Status {
            status,
            body: body.chars().take(200).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Parse("expected value at line 1 column 1".to_string());
        assert_eq!(
            err.to_string(),
            "Parse error: expected value at line 1 column 1"
        );
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let err: Error = TransportError::Timeout.into();
        assert_eq!(
            err.to_string(),
            "Request timed out - server may not be responding"
        );
    }

    #[test]
    fn test_status_body_truncated() {
        let body = "x".repeat(500);
        let err = TransportError::status(502, &body);
        match &err {
            TransportError::Status { status, body } => {
                assert_eq!(*status, 502);
                assert_eq!(body.len(), 200);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(err.to_string().starts_with("HTTP error 502: "));
    }
}
