//! CLI subcommands.

pub mod inspect;
pub mod record;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use witness::prelude::InstrumentationConfig;

/// Read an instrumentation configuration. Files ending in `.json` are parsed
/// as JSON, everything else as TOML.
pub fn load_config(path: &Path) -> Result<InstrumentationConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&text, path)
}

fn parse_config(text: &str, path: &Path) -> Result<InstrumentationConfig> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(text).with_context(|| format!("Invalid JSON in {}", path.display()))
    } else {
        toml::from_str(text).with_context(|| format!("Invalid TOML in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use witness::prelude::{CaptureFrequency, CaptureQuality};

    #[test]
    fn test_parse_toml_config() {
        let text = r#"
applicationKey = "demo"
sessionLengthSeconds = 10
captureQuality = "high"
captureFrequency = "low"
"#;
        let config = parse_config(text, Path::new("witness.toml")).unwrap();
        assert_eq!(config.application_key, "demo");
        assert_eq!(config.session_length_seconds, 10);
        assert_eq!(config.capture_quality, CaptureQuality::High);
        assert_eq!(config.capture_frequency, CaptureFrequency::Low);
        assert!(config.enable_network_logging);
    }

    #[test]
    fn test_parse_json_config() {
        let text = r#"{ "applicationKey": "demo", "enableNetworkLogging": false }"#;
        let config = parse_config(text, Path::new("witness.JSON")).unwrap();
        assert!(!config.enable_network_logging);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/witness.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
