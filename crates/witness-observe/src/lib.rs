//! Witness Observability
//!
//! This crate provides the event and diagnostic plumbing shared by the
//! Witness instrumentation components:
//!
//! - [`EventDispatcher`]: Fan-out of [`InstrumentationEvent`]s to subscribers
//! - [`LoggingSubscriber`]: Forwards events to `tracing`
//! - [`DiagnosticLog`]: Bounded record of warnings raised inside the core
//!
//! # Event Subscription
//!
//! ```ignore
//! use witness_observe::{EventDispatcher, LoggingSubscriber};
//! use std::sync::Arc;
//!
//! let dispatcher = EventDispatcher::new();
//! dispatcher.subscribe(Arc::new(LoggingSubscriber::new()));
//!
//! dispatcher.emit(InstrumentationEvent::TickSkipped { reason: "busy" });
//! ```

pub mod diagnostics;
pub mod events;

// Re-export main types
pub use diagnostics::{DEFAULT_DIAGNOSTIC_CAPACITY, Diagnostic, DiagnosticLevel, DiagnosticLog};
pub use events::{
    CollectingSubscriber, EventDispatcher, EventSubscriber, InstrumentationEvent,
    LoggingSubscriber,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::diagnostics::{Diagnostic, DiagnosticLevel, DiagnosticLog};
    pub use crate::events::{EventDispatcher, EventSubscriber, InstrumentationEvent};
}
