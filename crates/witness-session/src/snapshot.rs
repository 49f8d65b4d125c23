//! Snapshot providers.
//!
//! A [`SnapshotProvider`] turns "what the user sees right now" into an owned
//! [`Snapshot`]. The recorder calls it from its ticker thread and the facade
//! calls it on demand, possibly at the same time, so providers must be
//! stateless from the caller's point of view.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use witness_core::CaptureQuality;

use crate::error::CaptureError;

/// Encoding of snapshot bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG encoded.
    Png,
    /// JPEG encoded.
    Jpeg,
    /// Raw 8-bit RGBA pixels, row major.
    Rgba8,
}

impl ImageFormat {
    /// File extension used when a snapshot is written to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Rgba8 => "rgba",
        }
    }
}

/// Parameters for one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Requested fidelity.
    pub quality: CaptureQuality,
}

impl CaptureRequest {
    /// Create a request at the given quality.
    pub fn new(quality: CaptureQuality) -> Self {
        Self { quality }
    }

    /// Compression quality for lossy encoders, `0.0..=1.0`.
    pub fn compression_quality(&self) -> f32 {
        self.quality.compression_quality()
    }
}

/// An owned image of the visible state.
///
/// Cloning is cheap: the pixel data is reference counted and immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Encoding of `data`.
    pub format: ImageFormat,
    /// Encoded image bytes.
    pub data: Bytes,
}

impl Snapshot {
    /// Create a snapshot.
    pub fn new(width: u32, height: u32, format: ImageFormat, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            format,
            data: data.into(),
        }
    }

    /// Size of the encoded data in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the snapshot carries no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Source of snapshots.
pub trait SnapshotProvider: Send + Sync {
    /// Capture the current visible state.
    fn capture(&self, request: &CaptureRequest) -> Result<Snapshot, CaptureError>;
}

/// Provider for processes with nothing to capture. Always reports
/// [`CaptureError::NoSurface`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSurface;

impl SnapshotProvider for NoSurface {
    fn capture(&self, _request: &CaptureRequest) -> Result<Snapshot, CaptureError> {
        Err(CaptureError::NoSurface)
    }
}

/// Provider backed by a closure. Created with [`from_fn`].
pub struct FnSnapshotProvider<F> {
    capture: F,
}

impl<F> SnapshotProvider for FnSnapshotProvider<F>
where
    F: Fn(&CaptureRequest) -> Result<Snapshot, CaptureError> + Send + Sync,
{
    fn capture(&self, request: &CaptureRequest) -> Result<Snapshot, CaptureError> {
        (self.capture)(request)
    }
}

impl<F> std::fmt::Debug for FnSnapshotProvider<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSnapshotProvider").finish_non_exhaustive()
    }
}

/// Build a provider from a closure.
///
/// ```ignore
/// let provider = witness_session::snapshot::from_fn(|request| {
///     Ok(Snapshot::new(1, 1, ImageFormat::Rgba8, vec![0, 0, 0, 255]))
/// });
/// ```
pub fn from_fn<F>(capture: F) -> FnSnapshotProvider<F>
where
    F: Fn(&CaptureRequest) -> Result<Snapshot, CaptureError> + Send + Sync,
{
    FnSnapshotProvider { capture }
}
