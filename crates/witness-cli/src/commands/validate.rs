//! Validate command - Check an instrumentation configuration.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;

use witness::prelude::*;

use crate::OutputFormat;

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Configuration file (defaults to --config)
    pub file: Option<PathBuf>,
}

/// Validation result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationResult {
    valid: bool,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    application_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<SessionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    network_log_capacity: Option<usize>,
    network_logging: bool,
    errors: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSummary {
    interval_ms: u128,
    length_seconds: u64,
    frames: usize,
    quality: String,
}

impl From<&SessionSettings> for SessionSummary {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            interval_ms: settings.interval().as_millis(),
            length_seconds: settings.session_length().as_secs(),
            frames: settings.capacity(),
            quality: settings.quality().to_string(),
        }
    }
}

/// Execute the validate command.
pub fn execute(args: ValidateArgs, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let Some(path) = args.file.as_deref().or(config) else {
        bail!("No configuration file given; pass a path or --config");
    };

    let result = validate(path);

    if !format.print_json(&result)? {
        if result.valid {
            println!("Configuration is valid: {}", path.display());
            if let Some(key) = &result.application_key {
                println!("  Application key: {}", key);
            }
            if let Some(session) = &result.session {
                println!(
                    "  Session: {} frames, one every {} ms ({} s, {} quality)",
                    session.frames, session.interval_ms, session.length_seconds, session.quality
                );
            }
            if let Some(capacity) = result.network_log_capacity {
                let state = if result.network_logging { "enabled" } else { "disabled" };
                println!("  Network log: {} entries ({})", capacity, state);
            }
        } else {
            println!("Configuration is INVALID: {}", path.display());
            for error in &result.errors {
                println!("  Error: {}", error);
            }
        }
    }

    if result.valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Validation failed"))
    }
}

fn validate(path: &Path) -> ValidationResult {
    let mut result = ValidationResult {
        valid: false,
        path: path.display().to_string(),
        application_key: None,
        session: None,
        network_log_capacity: None,
        network_logging: false,
        errors: Vec::new(),
    };

    let config = match super::load_config(path) {
        Ok(config) => config,
        Err(e) => {
            result.errors.push(format!("{:#}", e));
            return result;
        }
    };

    match config.validate().and_then(|()| config.session_settings()) {
        Ok(settings) => {
            result.valid = true;
            result.application_key = Some(config.application_key.clone());
            result.session = Some(SessionSummary::from(&settings));
            result.network_log_capacity = Some(config.network_log_capacity);
            result.network_logging = config.enable_network_logging;
        }
        Err(e) => result.errors.push(e.to_string()),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "ok.toml",
            "applicationKey = \"demo\"\nsessionLengthSeconds = 3\n",
        );

        let result = validate(&path);
        assert!(result.valid, "{:?}", result.errors);
        assert_eq!(result.session.unwrap().frames, 3);
        assert_eq!(result.network_log_capacity, Some(100));
    }

    #[test]
    fn test_session_shorter_than_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "short.toml",
            "applicationKey = \"demo\"\nsessionLengthSeconds = 1\ncaptureFrequency = \"low\"\n",
        );

        let result = validate(&path);
        assert!(!result.valid);
        assert!(result.errors[0].contains("sessionLengthSeconds"));
    }

    #[test]
    fn test_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "empty.json", "{}");

        let result = validate(&path);
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Missing application key".to_string()]);
    }
}
