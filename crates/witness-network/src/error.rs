//! Error types for network interception and log export.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the network log store.
///
/// None of these ever reach the call being observed; they only surface from
/// explicit export operations.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The log could not be written to its destination.
    #[error("Failed to flush network logs to {path}: {source}")]
    Flush {
        /// Destination file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The log could not be serialized.
    #[error("Failed to serialize network logs: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for network log operations.
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Failure reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// No connection could be established.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The request was cancelled before a response arrived.
    #[error("Request cancelled")]
    Cancelled,

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Request timed out after 5s");

        let err = TransportError::Connect("refused".to_string());
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_flush_error_names_path() {
        let err = NetworkError::Flush {
            path: PathBuf::from("/nowhere/logs.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/nowhere/logs.json"));
    }
}
