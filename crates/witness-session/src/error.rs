//! Error types for session recording.

use std::path::PathBuf;

use thiserror::Error;
use witness_core::ConfigError;

/// Errors from the session recorder and exporter.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested settings were rejected.
    #[error("Invalid session settings: {0}")]
    Config(#[from] ConfigError),

    /// The ticker thread could not be started.
    #[error("Failed to spawn recorder thread: {0}")]
    ThreadSpawnFailed(String),

    /// A session export could not be written.
    #[error("Failed to export session to {path}: {source}")]
    Export {
        /// File or directory being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Session metadata could not be serialized.
    #[error("Failed to serialize session metadata: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Why a snapshot could not be taken.
///
/// Both variants are transient: the recorder skips the tick and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// There is nothing on screen to capture.
    #[error("No surface available to capture")]
    NoSurface,

    /// The provider failed.
    #[error("Capture failed: {0}")]
    Failed(String),
}
