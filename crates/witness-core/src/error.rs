//! Core error types for Witness.
//!
//! Configuration problems are the only errors that cross the boundary into
//! the host application. Everything else raised inside the instrumentation
//! is swallowed by the component that owns it and reported as a diagnostic.

use thiserror::Error;

/// Errors raised while validating an [`InstrumentationConfig`](crate::InstrumentationConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No application key was provided.
    #[error("Missing application key")]
    MissingApplicationKey,

    /// A field holds a value the components cannot run with.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
