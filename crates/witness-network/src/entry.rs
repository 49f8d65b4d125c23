//! Network log entries.
//!
//! An entry starts life as an [`InFlightRequest`] when a call is issued and is
//! finalized into a [`NetworkLogEntry`] exactly once, when the call completes.
//! Finalized entries are immutable.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header map used for requests and responses. Keys are unique.
pub type Headers = BTreeMap<String, String>;

/// One observed request/response pair.
///
/// A finalized entry carries either response fields or an error, never both
/// and never neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkLogEntry {
    request_id: Uuid,
    timestamp: DateTime<Utc>,
    url: String,
    method: String,
    request_headers: Headers,
    request_body: Option<String>,
    response_status_code: Option<u16>,
    response_headers: Option<Headers>,
    response_body: Option<String>,
    #[serde(default, with = "witness_core::duration_secs::option")]
    duration: Option<Duration>,
    error: Option<String>,
}

impl NetworkLogEntry {
    /// Unique identifier assigned when the call was issued.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// When the call was issued.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Request URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request headers.
    pub fn request_headers(&self) -> &Headers {
        &self.request_headers
    }

    /// Request body, if it was valid UTF-8 text.
    pub fn request_body(&self) -> Option<&str> {
        self.request_body.as_deref()
    }

    /// Response status code.
    pub fn response_status_code(&self) -> Option<u16> {
        self.response_status_code
    }

    /// Response headers.
    pub fn response_headers(&self) -> Option<&Headers> {
        self.response_headers.as_ref()
    }

    /// Response body, if it was valid UTF-8 text.
    pub fn response_body(&self) -> Option<&str> {
        self.response_body.as_deref()
    }

    /// Wall-clock time between issue and completion.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Error description for calls that did not produce a response.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the call failed at the transport level.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// A call that has been issued but not completed.
#[derive(Debug)]
pub(crate) struct InFlightRequest {
    request_id: Uuid,
    timestamp: DateTime<Utc>,
    started: Instant,
    url: String,
    method: String,
    headers: Headers,
    body: Option<String>,
}

impl InFlightRequest {
    pub(crate) fn new(
        request_id: Uuid,
        method: String,
        url: String,
        headers: Headers,
        body: Option<String>,
    ) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
            started: Instant::now(),
            url,
            method,
            headers,
            body,
        }
    }

    pub(crate) fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub(crate) fn started(&self) -> Instant {
        self.started
    }

    /// Finalize with a response.
    pub(crate) fn finish_response(
        self,
        status: u16,
        headers: Headers,
        body: Option<String>,
        end: Instant,
    ) -> NetworkLogEntry {
        let mut entry = self.finish(end);
        entry.response_status_code = Some(status);
        entry.response_headers = Some(headers);
        entry.response_body = body;
        entry
    }

    /// Finalize with a transport error.
    pub(crate) fn finish_error(self, error: String, end: Instant) -> NetworkLogEntry {
        let mut entry = self.finish(end);
        entry.error = Some(error);
        entry
    }

    fn finish(self, end: Instant) -> NetworkLogEntry {
        NetworkLogEntry {
            request_id: self.request_id,
            timestamp: self.timestamp,
            duration: Some(end.saturating_duration_since(self.started)),
            url: self.url,
            method: self.method,
            request_headers: self.headers,
            request_body: self.body,
            response_status_code: None,
            response_headers: None,
            response_body: None,
            error: None,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_entry(url: &str) -> NetworkLogEntry {
    InFlightRequest::new(
        Uuid::new_v4(),
        "GET".to_string(),
        url.to_string(),
        Headers::new(),
        None,
    )
    .finish_response(200, Headers::new(), None, Instant::now())
}
