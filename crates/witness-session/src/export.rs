//! Session export as a directory of files.
//!
//! Layout:
//!
//! ```text
//! session_<unix>/
//!     frame_0.<ext>
//!     frame_1.<ext>
//!     ...
//!     metadata.json
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use witness_core::{CaptureQuality, SessionSettings};

use crate::error::{SessionError, SessionResult};
use crate::frame::SessionFrame;
use crate::snapshot::ImageFormat;

/// Name of the metadata document inside a session directory.
pub const SESSION_METADATA_FILE: &str = "metadata.json";

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    /// Number of frames written.
    pub frames: usize,
    /// Configured session length.
    pub session_length_seconds: f64,
    /// Configured capture interval.
    pub interval_seconds: f64,
    /// Configured capture quality.
    pub quality: CaptureQuality,
    /// When the export was made.
    pub timestamp: DateTime<Utc>,
    /// Per-frame details, in recording order.
    pub samples: Vec<FrameSample>,
}

/// Per-frame entry in [`SessionMetadata`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSample {
    /// File name of the frame inside the session directory.
    pub file: String,
    /// When the frame was committed.
    pub timestamp: DateTime<Utc>,
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    /// Image encoding.
    pub format: ImageFormat,
    /// Resident memory.
    pub memory_bytes: Option<u64>,
    /// CPU usage.
    pub cpu_percent: Option<f64>,
}

/// Write `frames` into a fresh `session_<unix>` directory under `dir`.
///
/// If a directory for the same second already exists a numeric suffix is
/// appended. Returns the directory created.
pub fn export_session(
    frames: &[SessionFrame],
    settings: &SessionSettings,
    dir: &Path,
) -> SessionResult<PathBuf> {
    let timestamp = Utc::now();
    fs::create_dir_all(dir).map_err(export_error(dir))?;
    let session_dir = create_unique_dir(dir, &format!("session_{}", timestamp.timestamp()))?;

    let mut samples = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        let snapshot = frame.snapshot();
        let file = format!("frame_{}.{}", index, snapshot.format.extension());
        let path = session_dir.join(&file);
        fs::write(&path, &snapshot.data).map_err(export_error(&path))?;

        samples.push(FrameSample {
            file,
            timestamp: frame.timestamp(),
            width: snapshot.width,
            height: snapshot.height,
            format: snapshot.format,
            memory_bytes: frame.memory_bytes(),
            cpu_percent: frame.cpu_percent(),
        });
    }

    let metadata = SessionMetadata {
        frames: frames.len(),
        session_length_seconds: settings.session_length().as_secs_f64(),
        interval_seconds: settings.interval().as_secs_f64(),
        quality: settings.quality(),
        timestamp,
        samples,
    };
    let path = session_dir.join(SESSION_METADATA_FILE);
    let json = serde_json::to_vec_pretty(&metadata)?;
    witness_core::write_atomic(&path, &json).map_err(export_error(&path))?;

    tracing::info!(
        path = %session_dir.display(),
        frames = frames.len(),
        "Session exported"
    );
    Ok(session_dir)
}

fn create_unique_dir(parent: &Path, base: &str) -> SessionResult<PathBuf> {
    let mut candidate = parent.join(base);
    let mut suffix = 1u32;
    loop {
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                candidate = parent.join(format!("{}_{}", base, suffix));
                suffix += 1;
            }
            Err(e) => {
                return Err(SessionError::Export {
                    path: candidate,
                    source: e,
                });
            }
        }
    }
}

fn export_error(path: &Path) -> impl FnOnce(io::Error) -> SessionError + '_ {
    move |source| SessionError::Export {
        path: path.to_path_buf(),
        source,
    }
}
