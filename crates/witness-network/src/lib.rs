//! Witness Network - transparent network call logging
//!
//! This crate records every outbound HTTP call made through an instrumented
//! transport into a bounded, most-recent-first window:
//!
//! - [`NetworkInterceptor`]: Records issued calls and finalizes them exactly once
//! - [`InterceptedTransport`]: Wraps any [`Transport`] so its calls are recorded
//! - [`NetworkLogStore`]: Bounded store of [`NetworkLogEntry`] values
//!
//! The instrumentation is not a proxy. Requests and responses reach the caller
//! exactly as the inner transport produced them.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use witness_network::prelude::*;
//!
//! let store = Arc::new(NetworkLogStore::new(100));
//! let interceptor = Arc::new(NetworkInterceptor::new(Arc::clone(&store)));
//! let client = InterceptedTransport::new(my_transport, interceptor);
//!
//! let response = client.send(HttpRequest::get("https://example.com")).await?;
//! store.flush_to_durable_form(&NetworkLogStore::default_export_path())?;
//! ```

pub mod entry;
pub mod error;
pub mod interceptor;
pub mod store;
pub mod transport;

pub use entry::{Headers, NetworkLogEntry};
pub use error::{NetworkError, NetworkResult, TransportError};
pub use interceptor::{CallOutcome, InFlightHandle, NetworkInterceptor};
pub use store::{NETWORK_LOG_FILE_NAME, NetworkLogStore};
pub use transport::{HttpRequest, HttpResponse, InterceptedTransport, Transport};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::entry::NetworkLogEntry;
    pub use crate::error::{NetworkError, NetworkResult, TransportError};
    pub use crate::interceptor::{CallOutcome, NetworkInterceptor};
    pub use crate::store::NetworkLogStore;
    pub use crate::transport::{HttpRequest, HttpResponse, InterceptedTransport, Transport};
}
