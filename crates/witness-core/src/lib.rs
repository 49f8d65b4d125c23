//! Witness Core - shared building blocks for in-process diagnostics
//!
//! This crate holds the types every Witness component agrees on:
//!
//! - [`InstrumentationConfig`]: The configuration surface consumed at startup
//! - [`SessionSettings`]: Validated interval/capacity pair for the recorder
//! - [`RingBuffer`]: Fixed-capacity FIFO used by every bounded store
//! - [`CustomMetadata`]: Typed key-value data attached to reports
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Host application                   │
//! ├─────────────────────────────────────────────────────┤
//! │                 witness (facade)                    │
//! ├──────────────┬──────────────────┬───────────────────┤
//! │ witness-     │ witness-session  │ witness-crash     │
//! │ network      │ (recorder,       │ (panic hook       │
//! │ (intercept,  │  snapshots)      │  chain)           │
//! │  log store)  │                  │                   │
//! ├──────────────┴──────────────────┴───────────────────┤
//! │          witness-observe  │  witness-core           │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod metadata;
pub mod persist;
pub mod ring;

pub use config::{
    CaptureFrequency, CaptureQuality, DEFAULT_NETWORK_LOG_CAPACITY,
    DEFAULT_SESSION_LENGTH_SECONDS, InstrumentationConfig, SessionSettings,
};
pub use error::{ConfigError, ConfigResult};
pub use metadata::{CustomMetadata, MetadataValue};
pub use persist::write_atomic;
pub use ring::RingBuffer;

/// Seconds-as-float serde adapter for [`std::time::Duration`].
///
/// Durations are exported as fractional seconds so that exported documents
/// stay readable by report tooling on any platform.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }

    /// Same adapter for `Option<Duration>`.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => serializer.serialize_some(&d.as_secs_f64()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let secs = Option::<f64>::deserialize(deserializer)?;
            secs.map(|s| Duration::try_from_secs_f64(s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{CaptureFrequency, CaptureQuality, InstrumentationConfig, SessionSettings};
    pub use crate::error::{ConfigError, ConfigResult};
    pub use crate::metadata::{CustomMetadata, MetadataValue};
    pub use crate::ring::RingBuffer;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let config = InstrumentationConfig::new("prelude");
        let settings = config.session_settings().unwrap();
        let ring: RingBuffer<u8> = RingBuffer::new(settings.capacity());
        assert_eq!(ring.capacity(), 40);
    }
}
