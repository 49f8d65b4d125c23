//! Witness Crash - durable records of unhandled panics
//!
//! - [`CrashCapture`]: Panic hook that persists a [`CrashRecord`] and then
//!   hands over to the hook it replaced
//! - [`HandlerChain`]: Ordered list of [`FaultHandler`]s run on every fault
//! - [`CrashStore`]: One JSON file per crash
//!
//! A record is written synchronously before anything else runs, so it
//! survives even if a later handler aborts the process.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use witness_crash::{CrashCapture, CrashStore};
//! use witness_observe::EventDispatcher;
//!
//! let capture = Arc::new(CrashCapture::new(
//!     CrashStore::default(),
//!     Arc::new(EventDispatcher::new()),
//! ));
//! capture.register();
//! ```

pub mod capture;
pub mod chain;
pub mod error;
pub mod record;
pub mod store;

pub use capture::CrashCapture;
pub use chain::{FaultHandler, HandlerChain, PreviousHook};
pub use error::{CrashError, CrashResult};
pub use record::{CrashRecord, Fault, MAX_STACK_TRACE_BYTES};
pub use store::{CrashStore, DEFAULT_CRASH_DIR_NAME};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::capture::CrashCapture;
    pub use crate::chain::FaultHandler;
    pub use crate::record::{CrashRecord, Fault};
    pub use crate::store::CrashStore;
}
