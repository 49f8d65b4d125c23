//! Witness Session - "what the user saw"
//!
//! This crate keeps a rolling window of visual snapshots and resource samples
//! for the running process:
//!
//! - [`SessionRecorder`]: Fixed-rate sampling into a bounded ring buffer
//! - [`SnapshotProvider`]: Pluggable source of [`Snapshot`]s
//! - [`ResourceSampler`]: Memory and CPU figures attached to each frame
//! - [`export_session`]: Writes a recording out as a directory of files
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use witness_core::SessionSettings;
//! use witness_session::prelude::*;
//!
//! let recorder = SessionRecorder::new(Arc::new(my_provider));
//! recorder.start(SessionSettings::default())?;
//!
//! // later
//! let frames = recorder.snapshot();
//! ```

pub mod error;
pub mod export;
pub mod frame;
pub mod recorder;
pub mod sampler;
pub mod snapshot;

pub use error::{CaptureError, SessionError, SessionResult};
pub use export::{FrameSample, SESSION_METADATA_FILE, SessionMetadata, export_session};
pub use frame::SessionFrame;
pub use recorder::{
    RecorderPhase, RecorderStatus, SessionRecorder, SessionRecorderBuilder, TickOutcome, TickStats,
};
pub use sampler::{NullSampler, ProcessSampler, ResourceSample, ResourceSampler};
pub use snapshot::{
    CaptureRequest, FnSnapshotProvider, ImageFormat, NoSurface, Snapshot, SnapshotProvider, from_fn,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{CaptureError, SessionError, SessionResult};
    pub use crate::frame::SessionFrame;
    pub use crate::recorder::{RecorderPhase, SessionRecorder, TickOutcome};
    pub use crate::snapshot::{CaptureRequest, ImageFormat, Snapshot, SnapshotProvider};
}
