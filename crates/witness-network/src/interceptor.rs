//! Transparent interception of outbound network calls.
//!
//! The interceptor sits between the host application and its transport.
//! [`NetworkInterceptor::begin`] records an issued call and hands back an
//! [`InFlightHandle`]; [`NetworkInterceptor::complete`] finalizes it into the
//! [`NetworkLogStore`]. Completion is exactly-once per handle: the in-flight
//! record is removed atomically, so a racing second completion finds nothing.
//!
//! The interceptor never alters the call it observes. Requests it does not
//! understand pass through untouched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use bytes::Bytes;
use dashmap::DashMap;
use uuid::Uuid;

use witness_observe::{EventDispatcher, InstrumentationEvent};

use crate::entry::InFlightRequest;
use crate::error::TransportError;
use crate::store::NetworkLogStore;
use crate::transport::{HttpRequest, HttpResponse};

/// Token identifying one in-flight call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InFlightHandle {
    request_id: Uuid,
}

impl InFlightHandle {
    /// Identifier of the call, shared with its log entry.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }
}

/// How an observed call ended.
#[derive(Debug, Clone, Copy)]
pub enum CallOutcome<'a> {
    /// The transport produced a response.
    Response(&'a HttpResponse),
    /// The transport failed.
    Failed(&'a TransportError),
    /// The caller abandoned the call.
    Cancelled,
}

/// Observes calls and logs them into a [`NetworkLogStore`].
pub struct NetworkInterceptor {
    enabled: AtomicBool,
    in_flight: DashMap<Uuid, InFlightRequest>,
    store: Arc<NetworkLogStore>,
    events: Arc<EventDispatcher>,
}

impl NetworkInterceptor {
    /// Create an enabled interceptor writing into `store`.
    pub fn new(store: Arc<NetworkLogStore>) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            in_flight: DashMap::new(),
            store,
            events: Arc::new(EventDispatcher::new()),
        }
    }

    /// Emit events through a shared dispatcher.
    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = events;
        self
    }

    /// Start or stop intercepting new calls.
    ///
    /// Calls already in flight are still completed into the store.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            tracing::info!(enabled, "Network interception toggled");
        }
    }

    /// Whether new calls are intercepted.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// The store entries are written to.
    pub fn store(&self) -> &Arc<NetworkLogStore> {
        &self.store
    }

    /// Number of calls begun but not completed.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Record an issued call.
    ///
    /// Returns `None` and leaves the request untouched when interception is
    /// disabled, the URL scheme is not `http`/`https`, or the request has
    /// already been observed. Otherwise marks the request observed, so that
    /// clones derived from it (retries, redirects) are not logged again.
    pub fn begin(&self, request: &mut HttpRequest) -> Option<InFlightHandle> {
        if !self.is_enabled() || request.is_observed() || !is_http_scheme(&request.url) {
            return None;
        }
        request.mark_observed();

        let request_id = Uuid::new_v4();
        let method = if request.method.trim().is_empty() {
            "GET".to_string()
        } else {
            request.method.to_ascii_uppercase()
        };
        let in_flight = InFlightRequest::new(
            request_id,
            method,
            request.url.clone(),
            request.headers.clone(),
            body_text(request.body.as_ref()),
        );
        self.in_flight.insert(request_id, in_flight);

        tracing::trace!(request_id = %request_id, url = %request.url, "Network call begun");
        Some(InFlightHandle { request_id })
    }

    /// Finalize a call now. See [`complete_at`](Self::complete_at).
    pub fn complete(&self, handle: &InFlightHandle, outcome: CallOutcome<'_>) -> bool {
        self.complete_at(handle, outcome, Instant::now())
    }

    /// Finalize a call that ended at `end` and append it to the store.
    ///
    /// Returns `false` if the handle was already completed. A duplicate is
    /// logged and reported as an event but never produces a second entry.
    pub fn complete_at(&self, handle: &InFlightHandle, outcome: CallOutcome<'_>, end: Instant) -> bool {
        let Some((_, in_flight)) = self.in_flight.remove(&handle.request_id) else {
            tracing::warn!(
                request_id = %handle.request_id,
                "Network call completed more than once; ignoring"
            );
            self.events.emit(InstrumentationEvent::DuplicateCompletion {
                request_id: handle.request_id.to_string(),
            });
            return false;
        };

        let entry = match outcome {
            CallOutcome::Response(response) => in_flight.finish_response(
                response.status,
                response.headers.clone(),
                body_text(response.body.as_ref()),
                end,
            ),
            CallOutcome::Failed(error) => in_flight.finish_error(error.to_string(), end),
            CallOutcome::Cancelled => {
                in_flight.finish_error(TransportError::Cancelled.to_string(), end)
            }
        };

        self.events.emit(InstrumentationEvent::NetworkCallCompleted {
            request_id: entry.request_id().to_string(),
            method: entry.method().to_string(),
            url: entry.url().to_string(),
            status: entry.response_status_code(),
            duration: entry.duration(),
        });
        self.store.append(entry);
        true
    }
}

impl std::fmt::Debug for NetworkInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkInterceptor")
            .field("enabled", &self.is_enabled())
            .field("in_flight", &self.in_flight.len())
            .field("store", &self.store)
            .finish()
    }
}

fn is_http_scheme(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, _)) => {
            scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
        }
        None => false,
    }
}

fn body_text(body: Option<&Bytes>) -> Option<String> {
    body.and_then(|bytes| std::str::from_utf8(bytes).ok().map(str::to_owned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use witness_observe::{CollectingSubscriber, EventSubscriber};

    fn interceptor(capacity: usize) -> NetworkInterceptor {
        NetworkInterceptor::new(Arc::new(NetworkLogStore::new(capacity)))
    }

    #[test]
    fn test_begin_and_complete() {
        let interceptor = interceptor(10);
        let mut request = HttpRequest::new("post", "https://api.example.com/items")
            .with_header("Content-Type", "application/json")
            .with_body("{\"id\":1}");

        let handle = interceptor.begin(&mut request).unwrap();
        assert_eq!(interceptor.in_flight_count(), 1);

        let response = HttpResponse::new(201).with_body("created");
        assert!(interceptor.complete(&handle, CallOutcome::Response(&response)));

        let entries = interceptor.store().all();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.request_id(), handle.request_id());
        assert_eq!(entry.method(), "POST");
        assert_eq!(entry.request_body(), Some("{\"id\":1}"));
        assert_eq!(entry.request_headers()["Content-Type"], "application/json");
        assert_eq!(entry.response_status_code(), Some(201));
        assert_eq!(entry.response_body(), Some("created"));
        assert_eq!(interceptor.in_flight_count(), 0);
    }

    #[test]
    fn test_missing_method_defaults_to_get() {
        let interceptor = interceptor(10);
        let mut request = HttpRequest::new("", "http://example.com");
        let handle = interceptor.begin(&mut request).unwrap();
        interceptor.complete(&handle, CallOutcome::Cancelled);

        assert_eq!(interceptor.store().all()[0].method(), "GET");
    }

    #[test]
    fn test_non_http_scheme_passes_through() {
        let interceptor = interceptor(10);
        let mut request = HttpRequest::get("ftp://files.example.com/a.txt");
        assert!(interceptor.begin(&mut request).is_none());
        assert!(!request.is_observed());

        let mut request = HttpRequest::get("not a url");
        assert!(interceptor.begin(&mut request).is_none());
    }

    #[test]
    fn test_observed_request_not_logged_twice() {
        let interceptor = interceptor(10);
        let mut request = HttpRequest::get("https://example.com");
        assert!(interceptor.begin(&mut request).is_some());

        let mut retry = request.clone();
        assert!(retry.is_observed());
        assert!(interceptor.begin(&mut retry).is_none());
    }

    #[test]
    fn test_disabled_passes_through() {
        let interceptor = interceptor(10);
        interceptor.set_enabled(false);
        let mut request = HttpRequest::get("https://example.com");
        assert!(interceptor.begin(&mut request).is_none());
        assert!(!request.is_observed());
    }

    #[test]
    fn test_failure_records_error() {
        let interceptor = interceptor(10);
        let mut request = HttpRequest::get("https://example.com");
        let handle = interceptor.begin(&mut request).unwrap();

        let error = TransportError::Timeout(Duration::from_secs(30));
        interceptor.complete(&handle, CallOutcome::Failed(&error));

        let entry = &interceptor.store().all()[0];
        assert!(entry.is_failure());
        assert!(entry.error().unwrap().contains("timed out"));
        assert!(entry.response_status_code().is_none());
    }

    #[test]
    fn test_non_utf8_body_stored_as_none() {
        let interceptor = interceptor(10);
        let mut request = HttpRequest::get("https://example.com/image");
        let handle = interceptor.begin(&mut request).unwrap();

        let response = HttpResponse::new(200).with_body(vec![0xff, 0xfe, 0x00]);
        interceptor.complete(&handle, CallOutcome::Response(&response));

        let entry = &interceptor.store().all()[0];
        assert_eq!(entry.response_status_code(), Some(200));
        assert!(entry.response_body().is_none());
    }

    #[test]
    fn test_duplicate_completion_ignored() {
        let events = Arc::new(EventDispatcher::new());
        let collector = Arc::new(CollectingSubscriber::new(10));
        events.subscribe(Arc::clone(&collector) as Arc<dyn EventSubscriber>);
        let interceptor = interceptor(10).with_events(events);

        let mut request = HttpRequest::get("https://example.com");
        let handle = interceptor.begin(&mut request).unwrap();
        let response = HttpResponse::new(200);

        assert!(interceptor.complete(&handle, CallOutcome::Response(&response)));
        assert!(!interceptor.complete(&handle, CallOutcome::Response(&response)));

        assert_eq!(interceptor.store().len(), 1);
        assert_eq!(collector.count_of("duplicate_completion"), 1);
        assert_eq!(collector.count_of("network_call_completed"), 1);
    }

    #[test]
    fn test_concurrent_duplicate_completes_log_once() {
        let interceptor = interceptor(10);
        let mut request = HttpRequest::get("https://example.com");
        let handle = interceptor.begin(&mut request).unwrap();
        let response = HttpResponse::new(204);

        let successes: usize = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| interceptor.complete(&handle, CallOutcome::Response(&response)))
                })
                .collect();
            workers
                .into_iter()
                .map(|w| usize::from(w.join().unwrap()))
                .sum()
        });

        assert_eq!(successes, 1);
        assert_eq!(interceptor.store().len(), 1);
    }

    #[test]
    fn test_entries_ordered_by_completion() {
        let interceptor = interceptor(10);
        let mut a = HttpRequest::get("https://a.example");
        let mut b = HttpRequest::get("https://b.example");

        let handle_a = interceptor.begin(&mut a).unwrap();
        let handle_b = interceptor.begin(&mut b).unwrap();
        let start = Instant::now();

        let ok = HttpResponse::new(200);
        interceptor.complete_at(&handle_b, CallOutcome::Response(&ok), start + Duration::from_millis(10));
        interceptor.complete_at(&handle_a, CallOutcome::Response(&ok), start + Duration::from_millis(50));

        let entries = interceptor.store().all();
        assert_eq!(entries[0].url(), "https://b.example");
        assert_eq!(entries[1].url(), "https://a.example");
        assert!(entries[1].duration().unwrap() >= Duration::from_millis(50));
    }

    #[test]
    fn test_is_http_scheme() {
        assert!(is_http_scheme("http://a"));
        assert!(is_http_scheme("HTTPS://a"));
        assert!(!is_http_scheme("wss://a"));
        assert!(!is_http_scheme("/relative/path"));
    }
}
