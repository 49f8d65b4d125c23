//! Continuous session recording into a bounded ring buffer.
//!
//! The recorder samples the [`SnapshotProvider`] at a fixed interval and keeps
//! the last `floor(session_length / interval)` frames. State transitions:
//!
//! ```text
//!             start                 pause
//!  Stopped ──────────▶ Recording ──────────▶ Paused
//!     ▲                 │   ▲                 │
//!     │      stop       │   └──── resume ─────┘
//!     └─────────────────┘ (stop from Paused too)
//! ```
//!
//! Every transition bumps a generation counter. A ticker thread is bound to
//! the generation it was spawned for and exits as soon as the counter moves;
//! a capture that finishes after a transition is discarded instead of being
//! committed with the wrong settings. Stopping never waits for a capture in
//! progress.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use witness_core::{RingBuffer, SessionSettings};
use witness_observe::{EventDispatcher, InstrumentationEvent};

use crate::error::{CaptureError, SessionError, SessionResult};
use crate::export::export_session;
use crate::frame::SessionFrame;
use crate::sampler::{ProcessSampler, ResourceSampler};
use crate::snapshot::{CaptureRequest, SnapshotProvider};

/// Recorder lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecorderPhase {
    /// Not recording; the buffer is empty.
    Stopped,
    /// Sampling on every tick.
    Recording,
    /// Not sampling; frames are kept.
    Paused,
}

impl RecorderPhase {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderPhase::Stopped => "stopped",
            RecorderPhase::Recording => "recording",
            RecorderPhase::Paused => "paused",
        }
    }
}

impl std::fmt::Display for RecorderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was committed.
    Captured {
        /// Frames held after the commit.
        frames: usize,
        /// Buffer capacity.
        capacity: usize,
    },
    /// The recorder is not in the recording phase.
    NotRecording,
    /// A previous capture is still running; this tick was dropped.
    Busy,
    /// The recorder changed state during the capture; the frame was discarded.
    Stale,
    /// The provider had nothing to capture.
    NoSurface,
    /// The provider failed.
    Failed(String),
}

/// Tick counters since the recorder was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Frames committed.
    pub captured: u64,
    /// Ticks dropped because a capture was in progress.
    pub busy: u64,
    /// Captures discarded after a state change.
    pub stale: u64,
    /// Ticks with no surface to capture.
    pub no_surface: u64,
    /// Ticks where the provider failed.
    pub failed: u64,
    /// Deadlines the ticker missed and skipped.
    pub missed: u64,
}

/// Point-in-time view of the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderStatus {
    /// Current phase.
    pub phase: RecorderPhase,
    /// Active settings.
    pub settings: SessionSettings,
    /// Frames currently held.
    pub frames: usize,
    /// Buffer capacity.
    pub capacity: usize,
    /// Current generation.
    pub generation: u64,
    /// Tick counters.
    pub ticks: TickStats,
}

#[derive(Default)]
struct TickCounters {
    captured: AtomicU64,
    busy: AtomicU64,
    stale: AtomicU64,
    no_surface: AtomicU64,
    failed: AtomicU64,
    missed: AtomicU64,
}

impl TickCounters {
    fn snapshot(&self) -> TickStats {
        TickStats {
            captured: self.captured.load(Ordering::Relaxed),
            busy: self.busy.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            no_surface: self.no_surface.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            missed: self.missed.load(Ordering::Relaxed),
        }
    }
}

struct RecorderState {
    phase: RecorderPhase,
    settings: SessionSettings,
    generation: u64,
    frames: RingBuffer<SessionFrame>,
}

impl RecorderState {
    /// Swap settings, clearing the buffer if they differ.
    fn apply_settings(&mut self, settings: SessionSettings) {
        if self.settings != settings {
            self.frames.clear();
            self.frames.set_capacity(settings.capacity());
            self.settings = settings;
        }
    }
}

struct Shared {
    provider: Arc<dyn SnapshotProvider>,
    sampler: Arc<dyn ResourceSampler>,
    events: Arc<EventDispatcher>,
    state: Mutex<RecorderState>,
    wake: Condvar,
    busy: AtomicBool,
    counters: TickCounters,
    spawn_ticker: bool,
}

/// Clears the busy flag when the capture ends, even by unwinding.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Shared {
    fn transition(&self, state: &mut RecorderState, to: RecorderPhase) {
        let from = state.phase;
        state.phase = to;
        state.generation += 1;
        self.wake.notify_all();

        if from != to {
            info!(from = from.as_str(), to = to.as_str(), "Session recorder state changed");
            self.events.emit(InstrumentationEvent::RecorderStateChanged {
                from: from.as_str(),
                to: to.as_str(),
            });
        }
    }

    fn tick(&self, bound_to: Option<u64>) -> TickOutcome {
        let (generation, quality) = {
            let state = self.state.lock();
            if state.phase != RecorderPhase::Recording {
                return TickOutcome::NotRecording;
            }
            if bound_to.is_some_and(|g| g != state.generation) {
                return TickOutcome::Stale;
            }
            (state.generation, state.settings.quality())
        };

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.counters.busy.fetch_add(1, Ordering::Relaxed);
            debug!("Capture still in progress; dropping tick");
            self.events.emit(InstrumentationEvent::TickSkipped { reason: "busy" });
            return TickOutcome::Busy;
        }
        let _busy = BusyGuard(&self.busy);

        let snapshot = match self.provider.capture(&CaptureRequest::new(quality)) {
            Ok(snapshot) => snapshot,
            Err(CaptureError::NoSurface) => {
                self.counters.no_surface.fetch_add(1, Ordering::Relaxed);
                debug!("No surface to capture; skipping tick");
                self.events
                    .emit(InstrumentationEvent::TickSkipped { reason: "no_surface" });
                return TickOutcome::NoSurface;
            }
            Err(CaptureError::Failed(message)) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %message, "Snapshot capture failed; skipping tick");
                self.events.emit(InstrumentationEvent::CaptureFailed {
                    message: message.clone(),
                });
                return TickOutcome::Failed(message);
            }
        };
        let resources = self.sampler.sample();
        let now = Utc::now();

        let (frames, capacity) = {
            let mut state = self.state.lock();
            if state.phase != RecorderPhase::Recording || state.generation != generation {
                drop(state);
                self.counters.stale.fetch_add(1, Ordering::Relaxed);
                debug!(generation, "Recorder changed during capture; discarding frame");
                self.events.emit(InstrumentationEvent::TickSkipped { reason: "stale" });
                return TickOutcome::Stale;
            }

            let timestamp = match state.frames.last() {
                Some(last) if last.timestamp() > now => last.timestamp(),
                _ => now,
            };
            state
                .frames
                .push(SessionFrame::new(snapshot, timestamp, resources));
            (state.frames.len(), state.frames.capacity())
        };

        self.counters.captured.fetch_add(1, Ordering::Relaxed);
        self.events.emit(InstrumentationEvent::FrameCaptured {
            frame_count: frames,
            capacity,
        });
        TickOutcome::Captured { frames, capacity }
    }
}

/// Records the session into a bounded ring buffer.
///
/// Dropping the recorder stops it.
pub struct SessionRecorder {
    inner: Arc<Shared>,
}

impl SessionRecorder {
    /// Create a recorder with default settings and a [`ProcessSampler`].
    pub fn new(provider: Arc<dyn SnapshotProvider>) -> Self {
        Self::builder(provider).build()
    }

    /// Create a builder.
    pub fn builder(provider: Arc<dyn SnapshotProvider>) -> SessionRecorderBuilder {
        SessionRecorderBuilder::new(provider)
    }

    /// Start recording with `settings`.
    ///
    /// Starting from `Paused` resumes; frames are kept unless the settings
    /// changed. Starting while already recording applies the settings the
    /// same way [`update_settings`](Self::update_settings) does.
    pub fn start(&self, settings: SessionSettings) -> SessionResult<()> {
        let mut state = self.inner.state.lock();
        if state.phase == RecorderPhase::Recording && state.settings == settings {
            return Ok(());
        }

        state.apply_settings(settings);
        self.inner.transition(&mut state, RecorderPhase::Recording);
        info!(
            interval_ms = settings.interval().as_millis() as u64,
            capacity = settings.capacity(),
            quality = %settings.quality(),
            "Session recording started"
        );
        self.spawn_ticker(&mut state)
    }

    /// Replace the settings.
    ///
    /// While recording, the ticker is replaced and the buffer cleared and
    /// resized in one step, so no frame is ever committed under a mix of old
    /// and new settings.
    pub fn update_settings(&self, settings: SessionSettings) -> SessionResult<()> {
        let mut state = self.inner.state.lock();
        if state.settings == settings {
            return Ok(());
        }

        state.apply_settings(settings);
        info!(
            interval_ms = settings.interval().as_millis() as u64,
            capacity = settings.capacity(),
            "Session settings updated"
        );

        if state.phase == RecorderPhase::Recording {
            state.generation += 1;
            self.inner.wake.notify_all();
            self.spawn_ticker(&mut state)?;
        }
        Ok(())
    }

    /// Stop sampling but keep the recorded frames.
    pub fn pause(&self) {
        let mut state = self.inner.state.lock();
        if state.phase == RecorderPhase::Recording {
            self.inner.transition(&mut state, RecorderPhase::Paused);
        }
    }

    /// Continue sampling after [`pause`](Self::pause).
    ///
    /// Does nothing unless paused; a stopped recorder needs
    /// [`start`](Self::start).
    pub fn resume(&self) -> SessionResult<()> {
        let mut state = self.inner.state.lock();
        if state.phase != RecorderPhase::Paused {
            return Ok(());
        }
        self.inner.transition(&mut state, RecorderPhase::Recording);
        self.spawn_ticker(&mut state)
    }

    /// Stop sampling and discard every frame.
    ///
    /// Returns immediately. A capture still in progress finishes on its own
    /// and is discarded.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        if state.phase == RecorderPhase::Stopped {
            return;
        }
        state.frames.clear();
        self.inner.transition(&mut state, RecorderPhase::Stopped);
    }

    /// Run one tick now.
    ///
    /// This is what the ticker thread calls on every deadline; hosts that
    /// drive their own timer can call it directly.
    pub fn tick(&self) -> TickOutcome {
        self.inner.tick(None)
    }

    /// Copy of the recorded frames, oldest first.
    pub fn snapshot(&self) -> Vec<SessionFrame> {
        self.inner.state.lock().frames.to_vec()
    }

    /// Current phase.
    pub fn phase(&self) -> RecorderPhase {
        self.inner.state.lock().phase
    }

    /// Number of frames held.
    pub fn frame_count(&self) -> usize {
        self.inner.state.lock().frames.len()
    }

    /// Active settings.
    pub fn settings(&self) -> SessionSettings {
        self.inner.state.lock().settings
    }

    /// Full status.
    pub fn status(&self) -> RecorderStatus {
        let state = self.inner.state.lock();
        RecorderStatus {
            phase: state.phase,
            settings: state.settings,
            frames: state.frames.len(),
            capacity: state.frames.capacity(),
            generation: state.generation,
            ticks: self.inner.counters.snapshot(),
        }
    }

    /// Write the recorded frames into a new session directory under `dir`.
    ///
    /// Returns the directory created. See [`export_session`] for the layout.
    pub fn save_session(&self, dir: &Path) -> SessionResult<PathBuf> {
        let (frames, settings) = {
            let state = self.inner.state.lock();
            (state.frames.to_vec(), state.settings)
        };
        export_session(&frames, &settings, dir)
    }

    fn spawn_ticker(&self, state: &mut RecorderState) -> SessionResult<()> {
        if !self.inner.spawn_ticker {
            return Ok(());
        }

        let shared = Arc::clone(&self.inner);
        let generation = state.generation;
        let interval = state.settings.interval();

        let spawned = thread::Builder::new()
            .name("witness-session-ticker".to_string())
            .spawn(move || run_ticker(shared, generation, interval));

        match spawned {
            // Detached: it exits on its own once the generation moves on.
            Ok(_) => Ok(()),
            Err(e) => {
                state.frames.clear();
                self.inner.transition(state, RecorderPhase::Stopped);
                Err(SessionError::ThreadSpawnFailed(e.to_string()))
            }
        }
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SessionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SessionRecorder")
            .field("phase", &state.phase)
            .field("frames", &state.frames.len())
            .field("capacity", &state.frames.capacity())
            .field("generation", &state.generation)
            .finish()
    }
}

/// Fixed-rate tick loop bound to one generation.
///
/// Deadlines advance by whole intervals; if a tick overruns, the deadlines it
/// missed are skipped rather than fired back to back.
fn run_ticker(shared: Arc<Shared>, generation: u64, interval: Duration) {
    debug!(generation, interval_ms = interval.as_millis() as u64, "Session ticker started");
    let mut deadline = Instant::now() + interval;

    loop {
        {
            let mut state = shared.state.lock();
            loop {
                if state.generation != generation || state.phase != RecorderPhase::Recording {
                    debug!(generation, "Session ticker exiting");
                    return;
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                shared.wake.wait_for(&mut state, deadline - now);
            }
        }

        shared.tick(Some(generation));

        deadline += interval;
        let now = Instant::now();
        if deadline <= now {
            let behind = now - deadline;
            let missed = (behind.as_nanos() / interval.as_nanos()) as u32 + 1;
            deadline += interval * missed;
            shared
                .counters
                .missed
                .fetch_add(u64::from(missed), Ordering::Relaxed);
        }
    }
}

/// Builder for [`SessionRecorder`].
pub struct SessionRecorderBuilder {
    provider: Arc<dyn SnapshotProvider>,
    sampler: Option<Arc<dyn ResourceSampler>>,
    events: Option<Arc<EventDispatcher>>,
    settings: SessionSettings,
    spawn_ticker: bool,
}

impl SessionRecorderBuilder {
    fn new(provider: Arc<dyn SnapshotProvider>) -> Self {
        Self {
            provider,
            sampler: None,
            events: None,
            settings: SessionSettings::default(),
            spawn_ticker: true,
        }
    }

    /// Use a custom resource sampler.
    pub fn with_sampler(mut self, sampler: Arc<dyn ResourceSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Emit events through a shared dispatcher.
    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Initial settings, used until the first `start`.
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Do not spawn a ticker thread; ticks come only from
    /// [`SessionRecorder::tick`].
    pub fn with_manual_ticks(mut self) -> Self {
        self.spawn_ticker = false;
        self
    }

    /// Build the recorder in the stopped phase.
    pub fn build(self) -> SessionRecorder {
        let state = RecorderState {
            phase: RecorderPhase::Stopped,
            settings: self.settings,
            generation: 0,
            frames: RingBuffer::new(self.settings.capacity()),
        };

        SessionRecorder {
            inner: Arc::new(Shared {
                provider: self.provider,
                sampler: self
                    .sampler
                    .unwrap_or_else(|| Arc::new(ProcessSampler::new())),
                events: self
                    .events
                    .unwrap_or_else(|| Arc::new(EventDispatcher::new())),
                state: Mutex::new(state),
                wake: Condvar::new(),
                busy: AtomicBool::new(false),
                counters: TickCounters::default(),
                spawn_ticker: self.spawn_ticker,
            }),
        }
    }
}
