//! Request/response types and the instrumented transport wrapper.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;

use crate::entry::Headers;
use crate::error::TransportError;
use crate::interceptor::{CallOutcome, InFlightHandle, NetworkInterceptor};

/// An outbound HTTP request as seen by the instrumentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpRequest {
    /// HTTP method. Empty means `GET`.
    pub method: String,
    /// Absolute request URL.
    pub url: String,
    /// Request headers.
    pub headers: Headers,
    /// Request body.
    pub body: Option<Bytes>,
    observed: bool,
}

impl HttpRequest {
    /// Create a request.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            observed: false,
        }
    }

    /// Create a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Add a header, replacing any previous value for the same key.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether this request (or the one it was cloned from) has already been
    /// recorded by an interceptor.
    pub fn is_observed(&self) -> bool {
        self.observed
    }

    pub(crate) fn mark_observed(&mut self) {
        self.observed = true;
    }
}

/// An HTTP response as seen by the instrumentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Response body.
    pub body: Option<Bytes>,
}

impl HttpResponse {
    /// Create a response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Anything that can carry an [`HttpRequest`] to a server.
pub trait Transport: Send + Sync {
    /// Send a request and wait for its response.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// A [`Transport`] whose calls are recorded by a [`NetworkInterceptor`].
///
/// The inner transport's result is returned to the caller unchanged. If the
/// returned future is dropped before it resolves, the call is logged as
/// cancelled.
pub struct InterceptedTransport<T> {
    inner: T,
    interceptor: Arc<NetworkInterceptor>,
}

impl<T: Transport> InterceptedTransport<T> {
    /// Wrap `inner`.
    pub fn new(inner: T, interceptor: Arc<NetworkInterceptor>) -> Self {
        Self { inner, interceptor }
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Unwrap, returning the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport> Transport for InterceptedTransport<T> {
    fn send(
        &self,
        mut request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        let guard = self
            .interceptor
            .begin(&mut request)
            .map(|handle| CompletionGuard {
                interceptor: Arc::clone(&self.interceptor),
                handle: Some(handle),
            });
        let call = self.inner.send(request);

        async move {
            let result = call.await;
            if let Some(mut guard) = guard {
                match &result {
                    Ok(response) => guard.complete(CallOutcome::Response(response)),
                    Err(error) => guard.complete(CallOutcome::Failed(error)),
                }
            }
            result
        }
    }
}

impl<T> std::fmt::Debug for InterceptedTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptedTransport")
            .field("interceptor", &self.interceptor)
            .finish_non_exhaustive()
    }
}

/// Completes its handle as cancelled unless completed explicitly first.
struct CompletionGuard {
    interceptor: Arc<NetworkInterceptor>,
    handle: Option<InFlightHandle>,
}

impl CompletionGuard {
    fn complete(&mut self, outcome: CallOutcome<'_>) {
        if let Some(handle) = self.handle.take() {
            self.interceptor.complete(&handle, outcome);
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.interceptor.complete(&handle, CallOutcome::Cancelled);
        }
    }
}
