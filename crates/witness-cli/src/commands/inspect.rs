//! Inspect command - Show the contents of files written by Witness.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;

use witness::prelude::*;
use witness::{BUNDLE_MANIFEST_FILE, ReportBundle};

use crate::OutputFormat;

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Network log, crash record, bundle manifest or bundle directory
    #[arg(required = true)]
    pub path: PathBuf,

    /// Show only the last N network entries
    #[arg(long)]
    pub last: Option<usize>,

    /// Show only failed network calls
    #[arg(long)]
    pub failures: bool,
}

/// What a file turned out to hold.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum Inspection {
    NetworkLog { entries: Vec<NetworkLogEntry> },
    Crash { record: CrashRecord },
    Bundle { bundle: Box<ReportBundle> },
}

/// Execute the inspect command.
pub fn execute(args: InspectArgs, format: OutputFormat) -> Result<()> {
    let mut inspection = inspect(&args.path)?;

    if let Inspection::NetworkLog { entries } = &mut inspection {
        if args.failures {
            entries.retain(NetworkLogEntry::is_failure);
        }
        if let Some(last) = args.last {
            let skip = entries.len().saturating_sub(last);
            entries.drain(..skip);
        }
    }

    if format.print_json(&inspection)? {
        return Ok(());
    }

    match &inspection {
        Inspection::NetworkLog { entries } => {
            println!("Network log: {} ({} entries)", args.path.display(), entries.len());
            for entry in entries {
                print_entry(entry);
            }
        }
        Inspection::Crash { record } => {
            println!("Crash record: {}", args.path.display());
            println!("  Name: {}", record.name);
            println!("  Reason: {}", record.reason);
            println!("  Time: {}", record.timestamp.to_rfc3339());
            println!("\n{}", record.stack_trace);
        }
        Inspection::Bundle { bundle } => print_bundle(bundle),
    }

    Ok(())
}

fn inspect(path: &Path) -> Result<Inspection> {
    let file = if path.is_dir() {
        path.join(BUNDLE_MANIFEST_FILE)
    } else {
        path.to_path_buf()
    };
    let bytes =
        std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("{} is not JSON", file.display()))?;

    let inspection = if value.is_array() {
        Inspection::NetworkLog {
            entries: serde_json::from_value(value).context("Not a network log")?,
        }
    } else if value.get("stackTrace").is_some() {
        Inspection::Crash {
            record: serde_json::from_value(value).context("Not a crash record")?,
        }
    } else if value.get("applicationKey").is_some() {
        Inspection::Bundle {
            bundle: Box::new(serde_json::from_value(value).context("Not a bundle manifest")?),
        }
    } else {
        bail!("Unrecognized file: {}", file.display());
    };
    Ok(inspection)
}

fn print_entry(entry: &NetworkLogEntry) {
    let duration = entry
        .duration()
        .map(|d| format!("{} ms", d.as_millis()))
        .unwrap_or_else(|| "-".to_string());
    let outcome = match (entry.response_status_code(), entry.error()) {
        (Some(status), _) => status.to_string(),
        (None, Some(error)) => format!("ERROR {}", error),
        (None, None) => "pending".to_string(),
    };
    println!(
        "  {} {:6} {} -> {} ({})",
        entry.timestamp().format("%H:%M:%S%.3f"),
        entry.method(),
        entry.url(),
        outcome,
        duration
    );
}

fn print_bundle(bundle: &ReportBundle) {
    println!("Report bundle: {}", bundle.directory.display());
    println!("  Id: {}", bundle.id);
    println!("  Created: {}", bundle.created_at.to_rfc3339());
    println!("  Application: {}", bundle.application_key);

    let show = |label: &str, path: &Option<PathBuf>| match path {
        Some(path) => println!("  {}: {}", label, path.display()),
        None => println!("  {}: (none)", label),
    };
    show("Screenshot", &bundle.screenshot);
    show("Network log", &bundle.network_log);
    println!("  Network entries: {}", bundle.network_entries);
    show("Session", &bundle.session);
    println!("  Session frames: {}", bundle.session_frames);
    println!("  Crashes: {}", bundle.crashes.len());

    if !bundle.custom_data.is_empty() {
        println!("\nCustom data:");
        for (key, value) in bundle.custom_data.iter() {
            println!("  {} = {}", key, value);
        }
    }
    if !bundle.device_info.is_empty() {
        println!("\nDevice:");
        for (key, value) in &bundle.device_info {
            println!("  {} = {}", key, value);
        }
    }
    if !bundle.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &bundle.warnings {
            println!("  - {}", warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_crash_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crash_1.json");
        std::fs::write(
            &path,
            r#"{"name":"panic","reason":"boom","stackTrace":"at main","timestamp":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();

        match inspect(&path).unwrap() {
            Inspection::Crash { record } => assert_eq!(record.reason, "boom"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_inspect_empty_network_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        std::fs::write(&path, "[]").unwrap();

        assert!(matches!(
            inspect(&path).unwrap(),
            Inspection::NetworkLog { entries } if entries.is_empty()
        ));
    }

    #[test]
    fn test_inspect_unrecognized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.json");
        std::fs::write(&path, r#"{"hello":"world"}"#).unwrap();

        assert!(inspect(&path).is_err());
    }
}
