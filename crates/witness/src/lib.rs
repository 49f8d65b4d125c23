//! # Witness - In-process Diagnostic Instrumentation
//!
//! Witness runs inside a client application and keeps a short, bounded
//! record of what happened before something went wrong, so that a bug report
//! can show what the user saw and what the network did.
//!
//! ## Features
//!
//! - **Network**: Every call made through an instrumented transport is logged
//! - **Session**: Periodic snapshots and resource samples in a ring buffer
//! - **Crashes**: Panics are persisted before the previous panic hook runs
//! - **Reports**: One call gathers everything into a report bundle
//!
//! ## Quick Start
//!
//! ```ignore
//! use witness::prelude::*;
//!
//! let witness = Witness::builder()
//!     .with_snapshot_provider(Arc::new(my_provider))
//!     .build();
//!
//! witness.initialize(InstrumentationConfig::new("my-app-key"))?;
//!
//! let client = witness.intercept(my_transport);
//! let response = client.send(HttpRequest::get("https://example.com")).await?;
//!
//! let bundle = witness.capture_report_bundle()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Host application                     │
//! ├─────────────────────────────────────────────────────────┤
//! │                    witness (facade)                     │
//! │                 ┌──────────────────────┐                │
//! │                 │    Instrumentation   │                │
//! │                 └──────────┬───────────┘                │
//! │                            │                            │
//! │  ┌───────────────┬─────────┴────────┬────────────────┐  │
//! │  │witness-network│ witness-session  │ witness-crash  │  │
//! │  │(interceptor,  │ (recorder,       │ (panic hook,   │  │
//! │  │ log store)    │  snapshots)      │  records)      │  │
//! │  └───────────────┴──────────────────┴────────────────┘  │
//! ├─────────────────────────────────────────────────────────┤
//! │            witness-observe   │   witness-core           │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod bundle;
pub mod device;
pub mod error;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use witness_core::{CaptureQuality, CustomMetadata, InstrumentationConfig, MetadataValue};
use witness_crash::{CrashCapture, CrashStore};
use witness_network::{
    InterceptedTransport, NetworkInterceptor, NetworkLogEntry, NetworkLogStore, Transport,
};
use witness_observe::{
    Diagnostic, DiagnosticLog, EventDispatcher, EventSubscriber, InstrumentationEvent,
    LoggingSubscriber,
};
use witness_session::{
    CaptureRequest, NoSurface, RecorderPhase, ResourceSampler, SessionRecorder, SnapshotProvider,
};

pub use bundle::{BUNDLE_MANIFEST_FILE, ReportAssembler, ReportBundle};
pub use device::{DeviceInfoProvider, ProcessDeviceInfo};
pub use error::{InstrumentationError, InstrumentationResult};

use bundle::PendingBundle;

// Re-export from sub-crates
pub use witness_core;
pub use witness_crash;
pub use witness_network;
pub use witness_observe;
pub use witness_session;

/// Main entry point for Witness.
pub struct Witness;

impl Witness {
    /// Create a new instrumentation builder.
    pub fn builder() -> InstrumentationBuilder {
        InstrumentationBuilder::new()
    }
}

/// Builder for [`Instrumentation`].
pub struct InstrumentationBuilder {
    snapshot_provider: Option<Arc<dyn SnapshotProvider>>,
    resource_sampler: Option<Arc<dyn ResourceSampler>>,
    device_info: Option<Arc<dyn DeviceInfoProvider>>,
    assembler: Option<Arc<dyn ReportAssembler>>,
    event_subscribers: Vec<Arc<dyn EventSubscriber>>,
    output_dir: PathBuf,
    crash_dir: Option<PathBuf>,
    crash_capture: bool,
    session_in_bundle: bool,
    manual_ticks: bool,
    log_events: bool,
}

impl InstrumentationBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            snapshot_provider: None,
            resource_sampler: None,
            device_info: None,
            assembler: None,
            event_subscribers: Vec::new(),
            output_dir: std::env::temp_dir(),
            crash_dir: None,
            crash_capture: true,
            session_in_bundle: true,
            manual_ticks: false,
            log_events: true,
        }
    }

    /// Source of screenshots. Without one, no snapshots are taken.
    pub fn with_snapshot_provider(mut self, provider: Arc<dyn SnapshotProvider>) -> Self {
        self.snapshot_provider = Some(provider);
        self
    }

    /// Source of memory and CPU figures for session frames.
    pub fn with_resource_sampler(mut self, sampler: Arc<dyn ResourceSampler>) -> Self {
        self.resource_sampler = Some(sampler);
        self
    }

    /// Source of device metadata for bundles.
    pub fn with_device_info(mut self, provider: Arc<dyn DeviceInfoProvider>) -> Self {
        self.device_info = Some(provider);
        self
    }

    /// Receiver for finished report bundles.
    pub fn with_report_assembler(mut self, assembler: Arc<dyn ReportAssembler>) -> Self {
        self.assembler = Some(assembler);
        self
    }

    /// Add an event subscriber.
    pub fn with_event_subscriber(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.event_subscribers.push(subscriber);
        self
    }

    /// Directory report bundles are written under. Defaults to the system
    /// temp directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Directory crash records are written to.
    pub fn with_crash_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.crash_dir = Some(dir.into());
        self
    }

    /// Whether `initialize` installs the panic hook. Enabled by default.
    pub fn with_crash_capture(mut self, enabled: bool) -> Self {
        self.crash_capture = enabled;
        self
    }

    /// Whether bundles include the recorded session. Enabled by default.
    pub fn with_session_export(mut self, enabled: bool) -> Self {
        self.session_in_bundle = enabled;
        self
    }

    /// Do not spawn a ticker thread; the host drives
    /// [`SessionRecorder::tick`] itself.
    pub fn with_manual_ticks(mut self) -> Self {
        self.manual_ticks = true;
        self
    }

    /// Whether events are forwarded to `tracing`. Enabled by default.
    pub fn with_event_logging(mut self, enabled: bool) -> Self {
        self.log_events = enabled;
        self
    }

    /// Build the instrumentation. Nothing runs until
    /// [`Instrumentation::initialize`].
    pub fn build(self) -> Arc<Instrumentation> {
        let events = Arc::new(EventDispatcher::new());
        let diagnostics = Arc::new(DiagnosticLog::default());
        events.subscribe(Arc::clone(&diagnostics) as Arc<dyn EventSubscriber>);
        if self.log_events {
            events.subscribe(Arc::new(LoggingSubscriber::new()));
        }
        for subscriber in self.event_subscribers {
            events.subscribe(subscriber);
        }

        let store = Arc::new(NetworkLogStore::default());
        let interceptor = Arc::new(
            NetworkInterceptor::new(Arc::clone(&store)).with_events(Arc::clone(&events)),
        );
        interceptor.set_enabled(false);

        let provider = self
            .snapshot_provider
            .unwrap_or_else(|| Arc::new(NoSurface) as Arc<dyn SnapshotProvider>);
        let mut recorder = SessionRecorder::builder(Arc::clone(&provider))
            .with_events(Arc::clone(&events));
        if let Some(sampler) = self.resource_sampler {
            recorder = recorder.with_sampler(sampler);
        }
        if self.manual_ticks {
            recorder = recorder.with_manual_ticks();
        }

        let crash_store = CrashStore::new(self.crash_dir.unwrap_or_else(CrashStore::default_dir));
        let crash = Arc::new(CrashCapture::new(crash_store, Arc::clone(&events)));

        Arc::new(Instrumentation {
            events,
            diagnostics,
            store,
            interceptor,
            provider,
            recorder: recorder.build(),
            crash,
            device_info: self
                .device_info
                .unwrap_or_else(|| Arc::new(ProcessDeviceInfo::new()) as Arc<dyn DeviceInfoProvider>),
            assembler: self.assembler,
            custom_data: RwLock::new(CustomMetadata::new()),
            config: RwLock::new(None),
            output_dir: self.output_dir,
            crash_capture: self.crash_capture,
            session_in_bundle: self.session_in_bundle,
        })
    }
}

impl Default for InstrumentationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running instrumentation instance.
///
/// Constructed once by the host and shared by `Arc` with whoever needs it.
pub struct Instrumentation {
    events: Arc<EventDispatcher>,
    diagnostics: Arc<DiagnosticLog>,
    store: Arc<NetworkLogStore>,
    interceptor: Arc<NetworkInterceptor>,
    provider: Arc<dyn SnapshotProvider>,
    recorder: SessionRecorder,
    crash: Arc<CrashCapture>,
    device_info: Arc<dyn DeviceInfoProvider>,
    assembler: Option<Arc<dyn ReportAssembler>>,
    custom_data: RwLock<CustomMetadata>,
    config: RwLock<Option<InstrumentationConfig>>,
    output_dir: PathBuf,
    crash_capture: bool,
    session_in_bundle: bool,
}

impl Instrumentation {
    /// Start instrumenting with `config`.
    ///
    /// Calling this again with the same application key is a no-op. A
    /// different key is rejected; use [`reconfigure`](Self::reconfigure) to
    /// change settings.
    pub fn initialize(&self, config: InstrumentationConfig) -> InstrumentationResult<()> {
        self.validate(&config)?;

        let mut current = self.config.write();
        if let Some(existing) = current.as_ref() {
            if existing.application_key == config.application_key {
                debug!(application_key = %config.application_key, "Already initialized");
                return Ok(());
            }
            return Err(InstrumentationError::AlreadyInitialized {
                existing: existing.application_key.clone(),
            });
        }

        let settings = config.session_settings()?;
        // Nothing else changes unless the recorder is running.
        self.recorder.start(settings)?;
        self.store.set_capacity(config.network_log_capacity);
        self.interceptor.set_enabled(config.enable_network_logging);
        if self.crash_capture {
            self.crash.register();
        }

        info!(
            application_key = %config.application_key,
            network_logging = config.enable_network_logging,
            session_capacity = settings.capacity(),
            "Witness initialized"
        );
        *current = Some(config);
        Ok(())
    }

    /// Apply a new configuration.
    ///
    /// An invalid configuration is rejected and the previous one stays in
    /// effect. While recording, the recorder switches to the new settings
    /// atomically and starts a fresh buffer.
    pub fn reconfigure(&self, config: InstrumentationConfig) -> InstrumentationResult<()> {
        self.validate(&config)?;

        let mut current = self.config.write();
        let Some(existing) = current.as_ref() else {
            return Err(InstrumentationError::NotInitialized);
        };
        if existing.application_key != config.application_key {
            return Err(InstrumentationError::AlreadyInitialized {
                existing: existing.application_key.clone(),
            });
        }

        let settings = config.session_settings()?;
        self.recorder.update_settings(settings)?;
        self.store.set_capacity(config.network_log_capacity);
        self.interceptor.set_enabled(config.enable_network_logging);

        info!(
            session_capacity = settings.capacity(),
            network_logging = config.enable_network_logging,
            "Witness reconfigured"
        );
        *current = Some(config);
        Ok(())
    }

    /// Whether `initialize` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.config.read().is_some()
    }

    /// The active configuration.
    pub fn config(&self) -> Option<InstrumentationConfig> {
        self.config.read().clone()
    }

    /// Wrap a host transport so its calls are logged.
    pub fn intercept<T: Transport>(&self, transport: T) -> InterceptedTransport<T> {
        InterceptedTransport::new(transport, Arc::clone(&self.interceptor))
    }

    /// The network interceptor, for hosts driving `begin`/`complete` directly.
    pub fn interceptor(&self) -> &Arc<NetworkInterceptor> {
        &self.interceptor
    }

    /// Copy of the network log.
    pub fn network_logs(&self) -> Vec<NetworkLogEntry> {
        self.store.all()
    }

    /// Drop every network log entry.
    pub fn clear_network_logs(&self) {
        self.store.clear();
        info!("Network logs cleared");
    }

    /// The session recorder.
    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    /// Pause session recording, keeping recorded frames.
    pub fn pause_recording(&self) {
        self.recorder.pause();
    }

    /// Resume session recording.
    ///
    /// After [`stop_recording`](Self::stop_recording) this starts a fresh
    /// recording with the active configuration.
    pub fn resume_recording(&self) -> InstrumentationResult<()> {
        let current = self.config.read();
        let config = current.as_ref().ok_or(InstrumentationError::NotInitialized)?;
        match self.recorder.phase() {
            RecorderPhase::Stopped => self.recorder.start(config.session_settings()?)?,
            RecorderPhase::Paused | RecorderPhase::Recording => self.recorder.resume()?,
        }
        Ok(())
    }

    /// Stop session recording and discard recorded frames.
    pub fn stop_recording(&self) {
        self.recorder.stop();
    }

    /// The crash capture.
    pub fn crash_capture(&self) -> &Arc<CrashCapture> {
        &self.crash
    }

    /// Attach a metadata value to future reports.
    pub fn add_custom_data(&self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.custom_data.write().insert(key, value);
    }

    /// Remove one metadata value.
    pub fn remove_custom_data(&self, key: &str) -> Option<MetadataValue> {
        self.custom_data.write().remove(key)
    }

    /// Remove every metadata value.
    pub fn clear_custom_data(&self) {
        self.custom_data.write().clear();
    }

    /// Copy of the metadata attached to reports.
    pub fn custom_data(&self) -> CustomMetadata {
        self.custom_data.read().clone()
    }

    /// The event dispatcher.
    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.events
    }

    /// Recent warnings raised inside the instrumentation.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.recent()
    }

    /// Gather a report bundle and write it under the output directory.
    ///
    /// Takes one high-quality screenshot, flushes the network log, exports
    /// the session and attaches metadata. Parts that fail are listed in
    /// [`ReportBundle::warnings`]. The bundle is handed to the report
    /// assembler, if one is configured, before it is returned.
    pub fn capture_report_bundle(&self) -> InstrumentationResult<ReportBundle> {
        let bundle = self.prepare_bundle()?.write();
        Ok(self.finish_bundle(bundle))
    }

    /// Async variant of [`capture_report_bundle`](Self::capture_report_bundle).
    ///
    /// The screenshot is taken on the calling task; file IO runs on the
    /// blocking pool.
    pub async fn capture_report_bundle_async(&self) -> InstrumentationResult<ReportBundle> {
        let pending = self.prepare_bundle()?;
        let bundle = tokio::task::spawn_blocking(move || pending.write())
            .await
            .map_err(|e| InstrumentationError::Task(e.to_string()))?;
        Ok(self.finish_bundle(bundle))
    }

    /// Stop recording, stop intercepting and stop capturing panics. Panic
    /// hooks other tools installed in the meantime keep working.
    ///
    /// The instance can be initialized again afterwards.
    pub fn shutdown(&self) {
        let mut current = self.config.write();
        self.recorder.stop();
        self.interceptor.set_enabled(false);
        self.crash.unregister();
        *current = None;
        info!("Witness shut down");
    }

    fn validate(&self, config: &InstrumentationConfig) -> InstrumentationResult<()> {
        if let Err(e) = config.validate() {
            warn!(error = %e, "Configuration rejected");
            self.events.emit(InstrumentationEvent::ConfigRejected {
                message: e.to_string(),
            });
            return Err(e.into());
        }
        Ok(())
    }

    fn prepare_bundle(&self) -> InstrumentationResult<PendingBundle> {
        let application_key = self
            .config
            .read()
            .as_ref()
            .map(|c| c.application_key.clone())
            .ok_or(InstrumentationError::NotInitialized)?;

        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let screenshot = self
            .provider
            .capture(&CaptureRequest::new(CaptureQuality::High));
        let session = self
            .session_in_bundle
            .then(|| (self.recorder.snapshot(), self.recorder.settings()))
            .filter(|(frames, _)| !frames.is_empty());

        Ok(PendingBundle {
            id,
            created_at,
            application_key,
            directory: PendingBundle::directory_in(&self.output_dir, created_at, id),
            screenshot,
            store: Arc::clone(&self.store),
            session,
            crash: Arc::clone(&self.crash),
            custom_data: self.custom_data(),
            device_info: self.device_info.collect(),
            events: Arc::clone(&self.events),
        })
    }

    fn finish_bundle(&self, bundle: ReportBundle) -> ReportBundle {
        if let Some(assembler) = &self.assembler {
            assembler.assemble(&bundle);
        }
        bundle
    }
}

impl std::fmt::Debug for Instrumentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrumentation")
            .field("initialized", &self.is_initialized())
            .field("recorder", &self.recorder)
            .field("network", &self.store)
            .field("crash", &self.crash)
            .finish_non_exhaustive()
    }
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Main types
    pub use crate::{
        Instrumentation, InstrumentationBuilder, InstrumentationError, InstrumentationResult,
        ReportAssembler, ReportBundle, Witness,
    };

    // Configuration
    pub use witness_core::{
        CaptureFrequency, CaptureQuality, CustomMetadata, InstrumentationConfig, MetadataValue,
        SessionSettings,
    };

    // Network
    pub use witness_network::{
        HttpRequest, HttpResponse, InterceptedTransport, NetworkLogEntry, Transport,
        TransportError,
    };

    // Session
    pub use witness_session::{
        CaptureError, CaptureRequest, ImageFormat, Snapshot, SnapshotProvider, TickOutcome,
    };

    // Crash
    pub use witness_crash::{CrashRecord, Fault, FaultHandler};

    // Observability
    pub use witness_observe::{EventSubscriber, InstrumentationEvent};

    // Common std types
    pub use std::sync::Arc;
    pub use std::time::Duration;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use witness_core::CaptureFrequency;
    use witness_session::{ImageFormat, NullSampler, Snapshot, TickOutcome, from_fn};

    fn provider() -> Arc<dyn SnapshotProvider> {
        Arc::new(from_fn(|request: &CaptureRequest| {
            let side = if request.quality == CaptureQuality::High { 4 } else { 2 };
            Ok(Snapshot::new(side, side, ImageFormat::Png, vec![0x89, b'P', b'N', b'G']))
        }))
    }

    fn instrumentation(dir: &std::path::Path) -> Arc<Instrumentation> {
        Witness::builder()
            .with_snapshot_provider(provider())
            .with_resource_sampler(Arc::new(NullSampler))
            .with_output_dir(dir.join("reports"))
            .with_crash_dir(dir.join("crashes"))
            .with_crash_capture(false)
            .with_manual_ticks()
            .with_event_logging(false)
            .build()
    }

    struct Capturing(Mutex<Vec<Uuid>>);

    impl ReportAssembler for Capturing {
        fn assemble(&self, bundle: &ReportBundle) {
            self.0.lock().push(bundle.id);
        }
    }

    #[test]
    fn test_initialize_same_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let witness = instrumentation(dir.path());

        witness.initialize(InstrumentationConfig::new("key")).unwrap();
        witness
            .initialize(InstrumentationConfig::new("key").with_session_length(10))
            .unwrap();

        assert_eq!(witness.config().unwrap().session_length_seconds, 40);
        assert!(witness.interceptor().is_enabled());
    }

    #[test]
    fn test_initialize_different_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let witness = instrumentation(dir.path());

        witness.initialize(InstrumentationConfig::new("first")).unwrap();
        let err = witness
            .initialize(InstrumentationConfig::new("second"))
            .unwrap_err();
        assert!(matches!(
            err,
            InstrumentationError::AlreadyInitialized { existing } if existing == "first"
        ));
    }

    #[test]
    fn test_invalid_config_rejected_with_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let witness = instrumentation(dir.path());

        let err = witness
            .initialize(InstrumentationConfig::default())
            .unwrap_err();
        assert!(matches!(err, InstrumentationError::Config(_)));
        assert!(!witness.is_initialized());
        assert_eq!(witness.diagnostics().len(), 1);
    }

    #[test]
    fn test_reconfigure_keeps_previous_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let witness = instrumentation(dir.path());
        witness.initialize(InstrumentationConfig::new("key")).unwrap();

        let bad = InstrumentationConfig::new("key")
            .with_session_length(1)
            .with_capture_frequency(CaptureFrequency::Low);
        assert!(witness.reconfigure(bad).is_err());
        assert_eq!(witness.recorder().status().capacity, 40);

        let good = InstrumentationConfig::new("key")
            .with_session_length(4)
            .with_capture_frequency(CaptureFrequency::High)
            .with_network_logging(false);
        witness.reconfigure(good).unwrap();
        assert_eq!(witness.recorder().status().capacity, 8);
        assert!(!witness.interceptor().is_enabled());
    }

    #[test]
    fn test_reconfigure_before_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let witness = instrumentation(dir.path());
        assert!(matches!(
            witness.reconfigure(InstrumentationConfig::new("key")),
            Err(InstrumentationError::NotInitialized)
        ));
    }

    #[test]
    fn test_resume_after_stop_records_again() {
        let dir = tempfile::tempdir().unwrap();
        let witness = instrumentation(dir.path());
        witness.initialize(InstrumentationConfig::new("key")).unwrap();
        witness.recorder().tick();

        witness.stop_recording();
        assert_eq!(witness.recorder().phase(), RecorderPhase::Stopped);

        witness.resume_recording().unwrap();
        assert_eq!(witness.recorder().phase(), RecorderPhase::Recording);
        assert_eq!(witness.recorder().status().capacity, 40);
        assert!(matches!(
            witness.recorder().tick(),
            TickOutcome::Captured { frames: 1, .. }
        ));
    }

    #[test]
    fn test_resume_before_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let witness = instrumentation(dir.path());
        assert!(matches!(
            witness.resume_recording(),
            Err(InstrumentationError::NotInitialized)
        ));
        assert_eq!(witness.recorder().phase(), RecorderPhase::Stopped);
    }

    #[test]
    fn test_rejected_initialize_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let witness = instrumentation(dir.path());

        let invalid = InstrumentationConfig::new("key")
            .with_network_log_capacity(5)
            .with_session_length(1)
            .with_capture_frequency(CaptureFrequency::Low);
        assert!(witness.initialize(invalid).is_err());

        assert!(!witness.interceptor().is_enabled());
        assert_eq!(witness.interceptor().store().capacity(), 100);
        assert_eq!(witness.recorder().phase(), RecorderPhase::Stopped);
        assert!(!witness.is_initialized());
    }

    #[test]
    fn test_custom_data() {
        let dir = tempfile::tempdir().unwrap();
        let witness = instrumentation(dir.path());

        witness.add_custom_data("user", "alice");
        witness.add_custom_data("premium", true);
        witness.add_custom_data("cart_items", 3);
        assert_eq!(witness.custom_data().len(), 3);

        assert!(witness.remove_custom_data("premium").is_some());
        witness.clear_custom_data();
        assert!(witness.custom_data().is_empty());
    }

    #[test]
    fn test_bundle_requires_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let witness = instrumentation(dir.path());
        assert!(matches!(
            witness.capture_report_bundle(),
            Err(InstrumentationError::NotInitialized)
        ));
    }

    #[test]
    fn test_bundle_contents() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = Arc::new(Capturing(Mutex::new(Vec::new())));
        let witness = Witness::builder()
            .with_snapshot_provider(provider())
            .with_resource_sampler(Arc::new(NullSampler))
            .with_output_dir(dir.path())
            .with_crash_dir(dir.path().join("crashes"))
            .with_crash_capture(false)
            .with_manual_ticks()
            .with_event_logging(false)
            .with_report_assembler(Arc::clone(&assembler) as Arc<dyn ReportAssembler>)
            .build();
        witness.initialize(InstrumentationConfig::new("key")).unwrap();
        witness.recorder().tick();
        witness.recorder().tick();
        witness.add_custom_data("build", "42");

        let bundle = witness.capture_report_bundle().unwrap();

        assert!(bundle.is_complete(), "warnings: {:?}", bundle.warnings);
        let screenshot = bundle.screenshot.as_ref().unwrap();
        assert!(screenshot.extension().is_some_and(|e| e == "png"));
        assert!(screenshot.exists());
        assert!(bundle.network_log.as_ref().unwrap().exists());
        assert_eq!(bundle.session_frames, 2);
        let session = bundle.session.as_ref().unwrap();
        assert!(session.join("frame_0.png").exists());
        assert!(session.join("frame_1.png").exists());
        assert!(bundle.directory.join(BUNDLE_MANIFEST_FILE).exists());
        assert_eq!(bundle.custom_data.get("build"), Some(&MetadataValue::from("42")));
        assert!(bundle.device_info.contains_key("os"));
        assert_eq!(*assembler.0.lock(), vec![bundle.id]);
    }

    #[test]
    fn test_bundle_without_surface_has_warning() {
        let dir = tempfile::tempdir().unwrap();
        let witness = Witness::builder()
            .with_output_dir(dir.path())
            .with_crash_dir(dir.path().join("crashes"))
            .with_crash_capture(false)
            .with_manual_ticks()
            .with_event_logging(false)
            .build();
        witness.initialize(InstrumentationConfig::new("key")).unwrap();

        let bundle = witness.capture_report_bundle().unwrap();
        assert!(bundle.screenshot.is_none());
        assert!(bundle.session.is_none());
        assert_eq!(bundle.warnings.len(), 1);
        assert!(bundle.network_log.is_some());
    }

    #[test]
    fn test_shutdown_allows_reinitialize() {
        let dir = tempfile::tempdir().unwrap();
        let witness = instrumentation(dir.path());
        witness.initialize(InstrumentationConfig::new("first")).unwrap();
        witness.shutdown();

        assert!(!witness.is_initialized());
        assert!(!witness.interceptor().is_enabled());
        witness.initialize(InstrumentationConfig::new("second")).unwrap();
    }

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let _witness = Witness::builder().with_crash_capture(false).build();
        let _config = InstrumentationConfig::new("prelude");
    }
}
