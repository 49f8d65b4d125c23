//! Configuration types for the Witness instrumentation core.
//!
//! [`InstrumentationConfig`] is the surface consumed from the bootstrap code
//! of the host application. [`SessionSettings`] is the validated subset the
//! session recorder runs with; it is always derived through
//! [`SessionSettings::from_config`] or [`SessionSettings::new`] so that a
//! recorder never sees a zero interval or a zero-capacity buffer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default number of network log entries retained.
pub const DEFAULT_NETWORK_LOG_CAPACITY: usize = 100;

/// Default length of retained session history, in seconds.
pub const DEFAULT_SESSION_LENGTH_SECONDS: u32 = 40;

/// Fidelity of captured snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureQuality {
    /// Smallest output, heaviest compression.
    Low,
    /// Balanced output.
    #[default]
    Medium,
    /// Closest to the on-screen pixels.
    High,
}

impl CaptureQuality {
    /// Compression quality in `0.0..=1.0` handed to snapshot encoders.
    pub fn compression_quality(&self) -> f32 {
        match self {
            CaptureQuality::Low => 0.3,
            CaptureQuality::Medium => 0.6,
            CaptureQuality::High => 0.9,
        }
    }
}

impl std::fmt::Display for CaptureQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureQuality::Low => write!(f, "low"),
            CaptureQuality::Medium => write!(f, "medium"),
            CaptureQuality::High => write!(f, "high"),
        }
    }
}

/// How often the session recorder samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFrequency {
    /// One frame every two seconds.
    Low,
    /// One frame per second.
    #[default]
    Medium,
    /// Two frames per second.
    High,
}

impl CaptureFrequency {
    /// Sampling interval for this frequency.
    pub fn interval(&self) -> Duration {
        match self {
            CaptureFrequency::Low => Duration::from_secs(2),
            CaptureFrequency::Medium => Duration::from_secs(1),
            CaptureFrequency::High => Duration::from_millis(500),
        }
    }
}

impl std::fmt::Display for CaptureFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureFrequency::Low => write!(f, "low"),
            CaptureFrequency::Medium => write!(f, "medium"),
            CaptureFrequency::High => write!(f, "high"),
        }
    }
}

/// Configuration handed to the instrumentation at process start.
///
/// Keys are camelCase on the wire so that the same document can be shared
/// with the bootstrap code of other platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentationConfig {
    /// Key identifying the host application.
    pub application_key: String,

    /// Whether outbound network calls are logged.
    pub enable_network_logging: bool,

    /// Seconds of session history retained by the recorder.
    pub session_length_seconds: u32,

    /// Snapshot fidelity.
    pub capture_quality: CaptureQuality,

    /// Snapshot sampling frequency.
    pub capture_frequency: CaptureFrequency,

    /// Maximum number of network log entries retained.
    pub network_log_capacity: usize,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            application_key: String::new(),
            enable_network_logging: true,
            session_length_seconds: DEFAULT_SESSION_LENGTH_SECONDS,
            capture_quality: CaptureQuality::default(),
            capture_frequency: CaptureFrequency::default(),
            network_log_capacity: DEFAULT_NETWORK_LOG_CAPACITY,
        }
    }
}

impl InstrumentationConfig {
    /// Create a configuration for the given application key with defaults.
    pub fn new(application_key: impl Into<String>) -> Self {
        Self {
            application_key: application_key.into(),
            ..Self::default()
        }
    }

    /// Enable or disable network logging.
    pub fn with_network_logging(mut self, enabled: bool) -> Self {
        self.enable_network_logging = enabled;
        self
    }

    /// Set the retained session length in seconds.
    pub fn with_session_length(mut self, seconds: u32) -> Self {
        self.session_length_seconds = seconds;
        self
    }

    /// Set the capture quality.
    pub fn with_capture_quality(mut self, quality: CaptureQuality) -> Self {
        self.capture_quality = quality;
        self
    }

    /// Set the capture frequency.
    pub fn with_capture_frequency(mut self, frequency: CaptureFrequency) -> Self {
        self.capture_frequency = frequency;
        self
    }

    /// Set the network log capacity.
    pub fn with_network_log_capacity(mut self, capacity: usize) -> Self {
        self.network_log_capacity = capacity;
        self
    }

    /// Check the configuration for values the components cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.application_key.trim().is_empty() {
            return Err(ConfigError::MissingApplicationKey);
        }
        if self.network_log_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "networkLogCapacity",
                reason: "must be at least 1".to_string(),
            });
        }
        self.session_settings().map(|_| ())
    }

    /// Derive the recorder settings for this configuration.
    pub fn session_settings(&self) -> ConfigResult<SessionSettings> {
        SessionSettings::from_config(self)
    }
}

/// Validated recorder settings.
///
/// Interval and buffer capacity always travel together: a recorder is
/// reconfigured by swapping a whole `SessionSettings`, never one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    interval: Duration,
    session_length: Duration,
    quality: CaptureQuality,
}

impl SessionSettings {
    /// Create settings from raw values.
    ///
    /// # Errors
    ///
    /// Rejects a zero interval, a zero session length, and a session length
    /// shorter than one interval (which would yield an empty buffer).
    pub fn new(
        interval: Duration,
        session_length: Duration,
        quality: CaptureQuality,
    ) -> ConfigResult<Self> {
        if interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "captureInterval",
                reason: "must be greater than zero".to_string(),
            });
        }
        if session_length.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "sessionLengthSeconds",
                reason: "must be greater than zero".to_string(),
            });
        }
        if session_length < interval {
            return Err(ConfigError::InvalidValue {
                field: "sessionLengthSeconds",
                reason: format!(
                    "{:?} is shorter than the capture interval {:?}",
                    session_length, interval
                ),
            });
        }

        Ok(Self {
            interval,
            session_length,
            quality,
        })
    }

    /// Derive settings from an instrumentation configuration.
    pub fn from_config(config: &InstrumentationConfig) -> ConfigResult<Self> {
        Self::new(
            config.capture_frequency.interval(),
            Duration::from_secs(u64::from(config.session_length_seconds)),
            config.capture_quality,
        )
    }

    /// Interval between ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Length of retained history.
    pub fn session_length(&self) -> Duration {
        self.session_length
    }

    /// Capture quality.
    pub fn quality(&self) -> CaptureQuality {
        self.quality
    }

    /// Number of frames the ring buffer holds: `floor(length / interval)`.
    pub fn capacity(&self) -> usize {
        let frames = self.session_length.as_nanos() / self.interval.as_nanos();
        frames.max(1) as usize
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            interval: CaptureFrequency::default().interval(),
            session_length: Duration::from_secs(u64::from(DEFAULT_SESSION_LENGTH_SECONDS)),
            quality: CaptureQuality::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = InstrumentationConfig::default();
        assert!(config.enable_network_logging);
        assert_eq!(config.session_length_seconds, 40);
        assert_eq!(config.capture_quality, CaptureQuality::Medium);
        assert_eq!(config.capture_frequency, CaptureFrequency::Medium);
        assert_eq!(config.network_log_capacity, 100);
    }

    #[test]
    fn test_config_builder() {
        let config = InstrumentationConfig::new("app-key")
            .with_network_logging(false)
            .with_session_length(10)
            .with_capture_frequency(CaptureFrequency::High)
            .with_capture_quality(CaptureQuality::Low);

        assert_eq!(config.application_key, "app-key");
        assert!(!config.enable_network_logging);
        assert_eq!(config.session_settings().unwrap().capacity(), 20);
    }

    #[test]
    fn test_missing_application_key_rejected() {
        let config = InstrumentationConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingApplicationKey)
        ));
    }

    #[test]
    fn test_capacity_is_floor_of_length_over_interval() {
        let settings = SessionSettings::new(
            Duration::from_secs(1),
            Duration::from_secs(3),
            CaptureQuality::Medium,
        )
        .unwrap();
        assert_eq!(settings.capacity(), 3);

        let settings = SessionSettings::new(
            Duration::from_secs(2),
            Duration::from_secs(5),
            CaptureQuality::Medium,
        )
        .unwrap();
        assert_eq!(settings.capacity(), 2);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = SessionSettings::new(Duration::ZERO, Duration::from_secs(3), CaptureQuality::Low);
        assert!(result.is_err());
    }

    #[test]
    fn test_length_shorter_than_interval_rejected() {
        let config = InstrumentationConfig::new("k")
            .with_session_length(1)
            .with_capture_frequency(CaptureFrequency::Low);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_quality_mapping() {
        assert!(CaptureQuality::Low.compression_quality() < CaptureQuality::Medium.compression_quality());
        assert!(CaptureQuality::Medium.compression_quality() < CaptureQuality::High.compression_quality());
    }

    #[test]
    fn test_config_deserializes_camel_case() {
        let json = r#"{
            "applicationKey": "abc",
            "enableNetworkLogging": false,
            "sessionLengthSeconds": 12,
            "captureQuality": "high",
            "captureFrequency": "low"
        }"#;
        let config: InstrumentationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.application_key, "abc");
        assert_eq!(config.capture_quality, CaptureQuality::High);
        assert_eq!(config.capture_frequency, CaptureFrequency::Low);
        assert_eq!(config.network_log_capacity, DEFAULT_NETWORK_LOG_CAPACITY);
    }

    #[test]
    fn test_config_deserializes_toml() {
        let doc = r#"
            applicationKey = "from-toml"
            sessionLengthSeconds = 6
            captureFrequency = "high"
        "#;
        let config: InstrumentationConfig = toml::from_str(doc).unwrap();
        assert_eq!(config.application_key, "from-toml");
        assert_eq!(config.session_settings().unwrap().capacity(), 12);
    }
}
