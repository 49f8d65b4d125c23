//! Error types for crash capture.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from persisting or loading crash records.
#[derive(Debug, Error)]
pub enum CrashError {
    /// A crash record could not be written.
    #[error("Failed to persist crash record to {path}: {source}")]
    Persist {
        /// Destination file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A crash record could not be serialized.
    #[error("Failed to serialize crash record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The crash directory or a record in it could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File or directory being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A stored record is not valid.
    #[error("Invalid crash record {path}: {source}")]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for crash operations.
pub type CrashResult<T> = Result<T, CrashError>;
