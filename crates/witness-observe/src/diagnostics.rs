//! Diagnostic warnings raised inside the instrumentation.
//!
//! Failures inside Witness never propagate to the host application. They are
//! kept here instead, so a report can carry "what went wrong while we were
//! watching" alongside its payload.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use witness_core::RingBuffer;

use crate::events::{EventSubscriber, InstrumentationEvent};

/// Default number of diagnostics retained.
pub const DEFAULT_DIAGNOSTIC_CAPACITY: usize = 64;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Informational.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticLevel::Info => write!(f, "INFO"),
            DiagnosticLevel::Warning => write!(f, "WARN"),
            DiagnosticLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// A diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level.
    pub level: DiagnosticLevel,
    /// Message.
    pub message: String,
    /// Additional context, usually the event type that raised it.
    pub context: Option<String>,
    /// When the diagnostic was raised.
    pub timestamp: DateTime<Utc>,
}

impl Diagnostic {
    /// Create a diagnostic stamped with the current time.
    pub fn new(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            context: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warning, message)
    }

    /// Attach context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Bounded log of recent warnings and errors.
///
/// Subscribes to the event dispatcher and keeps every event at or above
/// `min_level`, dropping the oldest once full.
pub struct DiagnosticLog {
    entries: Mutex<RingBuffer<Diagnostic>>,
    min_level: DiagnosticLevel,
}

impl DiagnosticLog {
    /// Create a log retaining `capacity` warnings.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(RingBuffer::new(capacity)),
            min_level: DiagnosticLevel::Warning,
        }
    }

    /// Change the minimum retained level.
    pub fn with_min_level(mut self, level: DiagnosticLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Record a diagnostic directly.
    pub fn record(&self, diagnostic: Diagnostic) {
        if diagnostic.level >= self.min_level {
            self.entries.lock().push(diagnostic);
        }
    }

    /// Copy of the retained diagnostics, oldest first.
    pub fn recent(&self) -> Vec<Diagnostic> {
        self.entries.lock().to_vec()
    }

    /// Drop every retained diagnostic.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of retained diagnostics.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGNOSTIC_CAPACITY)
    }
}

impl EventSubscriber for DiagnosticLog {
    fn on_event(&self, event: &InstrumentationEvent) {
        let level = event.level();
        if level < self.min_level {
            return;
        }
        // try_lock: this can run inside the panic hook.
        if let Some(mut entries) = self.entries.try_lock() {
            entries.push(Diagnostic::new(level, event.describe()).with_context(event.event_type()));
        }
    }
}

impl std::fmt::Debug for DiagnosticLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticLog")
            .field("len", &self.len())
            .field("min_level", &self.min_level)
            .finish()
    }
}
