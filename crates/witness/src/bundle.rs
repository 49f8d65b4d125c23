//! Report bundles: everything attached to one bug report.
//!
//! A bundle is produced in two steps. [`PendingBundle`] is gathered on the
//! calling thread (the screenshot, a copy of the session frames, metadata).
//! [`PendingBundle::write`] then does all the file IO, which the async path
//! moves to a blocking worker. Nothing in either step fails the bundle:
//! problems are collected as warnings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use witness_core::{CustomMetadata, SessionSettings};
use witness_crash::{CrashCapture, CrashRecord};
use witness_network::{NETWORK_LOG_FILE_NAME, NetworkLogStore};
use witness_observe::{EventDispatcher, InstrumentationEvent};
use witness_session::{CaptureError, SessionFrame, Snapshot, export_session};

/// Name of the bundle manifest inside the bundle directory.
pub const BUNDLE_MANIFEST_FILE: &str = "bundle.json";

/// A finished report bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBundle {
    /// Bundle identifier.
    pub id: Uuid,
    /// When the bundle was requested.
    pub created_at: DateTime<Utc>,
    /// Key of the reporting application.
    pub application_key: String,
    /// Directory holding every file of the bundle.
    pub directory: PathBuf,
    /// On-demand screenshot.
    pub screenshot: Option<PathBuf>,
    /// Network log export.
    pub network_log: Option<PathBuf>,
    /// Number of network entries exported.
    pub network_entries: usize,
    /// Session export directory.
    pub session: Option<PathBuf>,
    /// Number of session frames exported.
    pub session_frames: usize,
    /// Crash records persisted by this or earlier runs.
    pub crashes: Vec<CrashRecord>,
    /// Host-provided metadata.
    pub custom_data: CustomMetadata,
    /// Device and process information.
    pub device_info: BTreeMap<String, String>,
    /// Everything that went wrong while assembling the bundle.
    pub warnings: Vec<String>,
}

impl ReportBundle {
    /// Whether every part was captured.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Receives finished bundles, typically to show a report composer.
pub trait ReportAssembler: Send + Sync {
    /// Take over a finished bundle.
    fn assemble(&self, bundle: &ReportBundle);
}

/// Bundle contents gathered on the caller, not yet written.
pub(crate) struct PendingBundle {
    pub(crate) id: Uuid,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) application_key: String,
    pub(crate) directory: PathBuf,
    pub(crate) screenshot: Result<Snapshot, CaptureError>,
    pub(crate) store: Arc<NetworkLogStore>,
    pub(crate) session: Option<(Vec<SessionFrame>, SessionSettings)>,
    pub(crate) crash: Arc<CrashCapture>,
    pub(crate) custom_data: CustomMetadata,
    pub(crate) device_info: BTreeMap<String, String>,
    pub(crate) events: Arc<EventDispatcher>,
}

impl PendingBundle {
    /// Directory name for a bundle created at `created_at`.
    pub(crate) fn directory_in(output_dir: &Path, created_at: DateTime<Utc>, id: Uuid) -> PathBuf {
        let short = id.simple().to_string();
        output_dir.join(format!(
            "witness_report_{}_{}",
            created_at.timestamp_millis(),
            &short[..8]
        ))
    }

    /// Write every part to disk.
    pub(crate) fn write(self) -> ReportBundle {
        let mut warnings = Vec::new();

        let screenshot = match self.screenshot {
            Ok(snapshot) => {
                let path = self.directory.join(format!(
                    "screenshot_{}.{}",
                    self.created_at.timestamp(),
                    snapshot.format.extension()
                ));
                match witness_core::write_atomic(&path, &snapshot.data) {
                    Ok(()) => Some(path),
                    Err(e) => {
                        warnings.push(format!("screenshot not written: {}", e));
                        None
                    }
                }
            }
            Err(e) => {
                warnings.push(format!("screenshot not captured: {}", e));
                None
            }
        };

        let log_path = self.directory.join(NETWORK_LOG_FILE_NAME);
        let (network_log, network_entries) = match self.store.flush_to_durable_form(&log_path) {
            Ok(entries) => {
                self.events.emit(InstrumentationEvent::NetworkLogsFlushed {
                    path: log_path.clone(),
                    entries,
                });
                (Some(log_path), entries)
            }
            Err(e) => {
                self.events.emit(InstrumentationEvent::NetworkLogFlushFailed {
                    message: e.to_string(),
                });
                warnings.push(e.to_string());
                (None, 0)
            }
        };

        let (session, session_frames) = match self.session {
            Some((frames, settings)) => match export_session(&frames, &settings, &self.directory) {
                Ok(dir) => (Some(dir), frames.len()),
                Err(e) => {
                    warnings.push(e.to_string());
                    (None, 0)
                }
            },
            None => (None, 0),
        };

        let crashes = match self.crash.persisted_records() {
            Ok(records) => records,
            Err(e) => {
                warnings.push(e.to_string());
                Vec::new()
            }
        };

        let bundle = ReportBundle {
            id: self.id,
            created_at: self.created_at,
            application_key: self.application_key,
            directory: self.directory,
            screenshot,
            network_log,
            network_entries,
            session,
            session_frames,
            crashes,
            custom_data: self.custom_data,
            device_info: self.device_info,
            warnings,
        };
        write_manifest(bundle)
    }
}

fn write_manifest(mut bundle: ReportBundle) -> ReportBundle {
    let path = bundle.directory.join(BUNDLE_MANIFEST_FILE);
    let written = serde_json::to_vec_pretty(&bundle)
        .map_err(|e| e.to_string())
        .and_then(|json| witness_core::write_atomic(&path, &json).map_err(|e| e.to_string()));

    match written {
        Ok(()) => tracing::info!(
            path = %bundle.directory.display(),
            warnings = bundle.warnings.len(),
            "Report bundle written"
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Report bundle manifest not written");
            bundle.warnings.push(format!("manifest not written: {}", e));
        }
    }
    bundle
}
