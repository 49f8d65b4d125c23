//! Session frames held by the recorder.

use chrono::{DateTime, Utc};

use crate::sampler::ResourceSample;
use crate::snapshot::Snapshot;

/// One sample of the session: what was visible and what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFrame {
    snapshot: Snapshot,
    timestamp: DateTime<Utc>,
    resources: ResourceSample,
}

impl SessionFrame {
    pub(crate) fn new(snapshot: Snapshot, timestamp: DateTime<Utc>, resources: ResourceSample) -> Self {
        Self {
            snapshot,
            timestamp,
            resources,
        }
    }

    /// Captured image.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// When the frame was committed.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Resident memory when the frame was taken.
    pub fn memory_bytes(&self) -> Option<u64> {
        self.resources.memory_bytes
    }

    /// CPU usage since the previous sample.
    pub fn cpu_percent(&self) -> Option<f64> {
        self.resources.cpu_percent
    }

    /// Both resource figures.
    pub fn resources(&self) -> ResourceSample {
        self.resources
    }
}
