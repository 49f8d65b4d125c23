//! Observable events emitted by the instrumentation components.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::diagnostics::DiagnosticLevel;

/// Events that can be observed while instrumentation is running.
#[derive(Debug, Clone)]
pub enum InstrumentationEvent {
    /// A network call was observed to completion and logged.
    NetworkCallCompleted {
        /// Identifier of the log entry.
        request_id: String,
        /// HTTP method.
        method: String,
        /// Target URL.
        url: String,
        /// Response status, absent if the call failed.
        status: Option<u16>,
        /// Measured duration.
        duration: Option<Duration>,
    },
    /// An in-flight handle was completed more than once.
    DuplicateCompletion {
        /// Identifier of the handle.
        request_id: String,
    },
    /// The network log store was written to durable storage.
    NetworkLogsFlushed {
        /// Destination file.
        path: PathBuf,
        /// Number of entries written.
        entries: usize,
    },
    /// Writing the network log store failed.
    NetworkLogFlushFailed {
        /// Error message.
        message: String,
    },
    /// The session recorder changed state.
    RecorderStateChanged {
        /// Previous state.
        from: &'static str,
        /// New state.
        to: &'static str,
    },
    /// A session frame was committed to the ring buffer.
    FrameCaptured {
        /// Frames held after the commit.
        frame_count: usize,
        /// Buffer capacity at commit time.
        capacity: usize,
    },
    /// A recorder tick produced no frame.
    TickSkipped {
        /// Why the tick was skipped.
        reason: &'static str,
    },
    /// A snapshot could not be taken.
    CaptureFailed {
        /// Error message.
        message: String,
    },
    /// A crash record was persisted.
    CrashPersisted {
        /// Destination file.
        path: PathBuf,
    },
    /// A crash record could not be persisted.
    CrashPersistFailed {
        /// Error message.
        message: String,
    },
    /// A configuration was rejected and the previous one kept.
    ConfigRejected {
        /// Error message.
        message: String,
    },
}

impl InstrumentationEvent {
    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            InstrumentationEvent::NetworkCallCompleted { .. } => "network_call_completed",
            InstrumentationEvent::DuplicateCompletion { .. } => "duplicate_completion",
            InstrumentationEvent::NetworkLogsFlushed { .. } => "network_logs_flushed",
            InstrumentationEvent::NetworkLogFlushFailed { .. } => "network_log_flush_failed",
            InstrumentationEvent::RecorderStateChanged { .. } => "recorder_state_changed",
            InstrumentationEvent::FrameCaptured { .. } => "frame_captured",
            InstrumentationEvent::TickSkipped { .. } => "tick_skipped",
            InstrumentationEvent::CaptureFailed { .. } => "capture_failed",
            InstrumentationEvent::CrashPersisted { .. } => "crash_persisted",
            InstrumentationEvent::CrashPersistFailed { .. } => "crash_persist_failed",
            InstrumentationEvent::ConfigRejected { .. } => "config_rejected",
        }
    }

    /// Severity used when the event is kept as a diagnostic.
    pub fn level(&self) -> DiagnosticLevel {
        match self {
            InstrumentationEvent::DuplicateCompletion { .. }
            | InstrumentationEvent::NetworkLogFlushFailed { .. }
            | InstrumentationEvent::CaptureFailed { .. }
            | InstrumentationEvent::ConfigRejected { .. } => DiagnosticLevel::Warning,
            InstrumentationEvent::CrashPersistFailed { .. } => DiagnosticLevel::Error,
            _ => DiagnosticLevel::Info,
        }
    }

    /// One-line human readable description.
    pub fn describe(&self) -> String {
        match self {
            InstrumentationEvent::NetworkCallCompleted {
                method, url, status, ..
            } => match status {
                Some(code) => format!("{} {} -> {}", method, url, code),
                None => format!("{} {} -> failed", method, url),
            },
            InstrumentationEvent::DuplicateCompletion { request_id } => {
                format!("request {} completed more than once", request_id)
            }
            InstrumentationEvent::NetworkLogsFlushed { path, entries } => {
                format!("{} network log entries written to {}", entries, path.display())
            }
            InstrumentationEvent::NetworkLogFlushFailed { message } => {
                format!("network log flush failed: {}", message)
            }
            InstrumentationEvent::RecorderStateChanged { from, to } => {
                format!("recorder {} -> {}", from, to)
            }
            InstrumentationEvent::FrameCaptured {
                frame_count,
                capacity,
            } => format!("frame captured ({}/{})", frame_count, capacity),
            InstrumentationEvent::TickSkipped { reason } => format!("tick skipped: {}", reason),
            InstrumentationEvent::CaptureFailed { message } => {
                format!("snapshot capture failed: {}", message)
            }
            InstrumentationEvent::CrashPersisted { path } => {
                format!("crash record written to {}", path.display())
            }
            InstrumentationEvent::CrashPersistFailed { message } => {
                format!("crash record could not be written: {}", message)
            }
            InstrumentationEvent::ConfigRejected { message } => {
                format!("configuration rejected: {}", message)
            }
        }
    }
}

/// Subscriber for instrumentation events.
pub trait EventSubscriber: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &InstrumentationEvent);

    /// Filter for event types this subscriber is interested in.
    /// Returns `None` to receive all events.
    fn event_filter(&self) -> Option<Vec<&'static str>> {
        None
    }
}

/// A subscriber that forwards events to `tracing`.
pub struct LoggingSubscriber;

impl LoggingSubscriber {
    /// Create a new logging subscriber.
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoggingSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for LoggingSubscriber {
    fn on_event(&self, event: &InstrumentationEvent) {
        match event {
            InstrumentationEvent::NetworkCallCompleted {
                request_id,
                method,
                url,
                status,
                duration,
            } => {
                tracing::debug!(
                    event = "network_call_completed",
                    request_id = request_id,
                    method = method,
                    url = url,
                    status = ?status,
                    duration_ms = ?duration.map(|d| d.as_millis()),
                    "Network call logged"
                );
            }
            InstrumentationEvent::FrameCaptured {
                frame_count,
                capacity,
            } => {
                tracing::trace!(
                    event = "frame_captured",
                    frames = frame_count,
                    capacity = capacity,
                    "Session frame captured"
                );
            }
            InstrumentationEvent::TickSkipped { reason } => {
                tracing::trace!(event = "tick_skipped", reason = reason, "Recorder tick skipped");
            }
            InstrumentationEvent::RecorderStateChanged { from, to } => {
                tracing::info!(
                    event = "recorder_state_changed",
                    from = from,
                    to = to,
                    "Recorder state changed"
                );
            }
            InstrumentationEvent::NetworkLogsFlushed { path, entries } => {
                tracing::info!(
                    event = "network_logs_flushed",
                    path = %path.display(),
                    entries = entries,
                    "Network logs flushed"
                );
            }
            InstrumentationEvent::CrashPersisted { path } => {
                tracing::info!(
                    event = "crash_persisted",
                    path = %path.display(),
                    "Crash record persisted"
                );
            }
            InstrumentationEvent::CrashPersistFailed { message } => {
                tracing::error!(event = "crash_persist_failed", message = message, "Crash record lost");
            }
            other => {
                tracing::warn!(
                    event = other.event_type(),
                    message = %other.describe(),
                    "Instrumentation warning"
                );
            }
        }
    }
}

/// A subscriber that collects events for later analysis.
pub struct CollectingSubscriber {
    events: RwLock<Vec<(Instant, InstrumentationEvent)>>,
    max_events: usize,
}

impl CollectingSubscriber {
    /// Create a new collecting subscriber.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events,
        }
    }

    /// Get collected events.
    pub fn events(&self) -> Vec<(Instant, InstrumentationEvent)> {
        self.events.read().clone()
    }

    /// Count collected events of one type.
    pub fn count_of(&self, event_type: &str) -> usize {
        self.events
            .read()
            .iter()
            .filter(|(_, e)| e.event_type() == event_type)
            .count()
    }

    /// Clear collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Get event count.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl EventSubscriber for CollectingSubscriber {
    fn on_event(&self, event: &InstrumentationEvent) {
        let mut events = self.events.write();
        if events.len() < self.max_events {
            events.push((Instant::now(), event.clone()));
        }
    }
}

/// Event dispatcher that manages subscribers.
#[derive(Default)]
pub struct EventDispatcher {
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// Remove all subscribers.
    pub fn clear_subscribers(&self) {
        self.subscribers.write().clear();
    }

    /// Get subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: InstrumentationEvent) {
        let subscribers = self.subscribers.read();
        Self::deliver(&subscribers, &event);
    }

    /// Emit without waiting on the subscriber list.
    ///
    /// Used from the panic hook: if the list is being modified the event is
    /// dropped instead of blocking the faulting thread. Returns whether the
    /// event was delivered.
    pub fn try_emit(&self, event: InstrumentationEvent) -> bool {
        match self.subscribers.try_read() {
            Some(subscribers) => {
                Self::deliver(&subscribers, &event);
                true
            }
            None => false,
        }
    }

    fn deliver(subscribers: &[Arc<dyn EventSubscriber>], event: &InstrumentationEvent) {
        for subscriber in subscribers {
            if let Some(filter) = subscriber.event_filter() {
                if !filter.contains(&event.event_type()) {
                    continue;
                }
            }
            subscriber.on_event(event);
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
