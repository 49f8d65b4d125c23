//! Errors surfaced by the instrumentation facade.

use thiserror::Error;

use witness_core::ConfigError;
use witness_crash::CrashError;
use witness_network::NetworkError;
use witness_session::SessionError;

/// Errors from [`Instrumentation`](crate::Instrumentation).
#[derive(Debug, Error)]
pub enum InstrumentationError {
    /// The configuration was rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `initialize` was called again with a different application key.
    #[error("Already initialized with application key '{existing}'")]
    AlreadyInitialized {
        /// Key the instance was initialized with.
        existing: String,
    },

    /// The operation needs `initialize` to have run.
    #[error("Instrumentation is not initialized")]
    NotInitialized,

    /// Session recorder error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Network log error.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Crash capture error.
    #[error("Crash error: {0}")]
    Crash(#[from] CrashError),

    /// A background task did not complete.
    #[error("Background task failed: {0}")]
    Task(String),
}

/// Result type for facade operations.
pub type InstrumentationResult<T> = Result<T, InstrumentationError>;
