//! Faults and the crash records persisted for them.

use std::backtrace::Backtrace;
use std::panic::PanicHookInfo;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest stack trace kept in a record, in bytes.
pub const MAX_STACK_TRACE_BYTES: usize = 64 * 1024;

/// An unhandled fault, as delivered to the handler chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Kind of fault, `"panic"` for Rust panics.
    pub name: String,
    /// Human readable reason.
    pub reason: String,
    /// Where the fault happened.
    pub stack_trace: String,
}

impl Fault {
    /// Create a fault.
    pub fn new(
        name: impl Into<String>,
        reason: impl Into<String>,
        stack_trace: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
            stack_trace: truncate_utf8(stack_trace.into(), MAX_STACK_TRACE_BYTES),
        }
    }

    /// Describe a panic from inside the panic hook.
    ///
    /// The reason is the panic message. The stack trace names the thread and
    /// location, followed by a backtrace captured regardless of
    /// `RUST_BACKTRACE`.
    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let reason = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        let thread = std::thread::current();
        let location = info
            .location()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        let stack_trace = format!(
            "thread '{}' panicked at {}\n{}",
            thread.name().unwrap_or("<unnamed>"),
            location,
            Backtrace::force_capture()
        );

        Self::new("panic", reason, stack_trace)
    }
}

/// Durable form of a [`Fault`].
///
/// Serialized with exactly the keys `name`, `reason`, `stackTrace` and
/// `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashRecord {
    /// Kind of fault.
    pub name: String,
    /// Human readable reason.
    pub reason: String,
    /// Where the fault happened.
    pub stack_trace: String,
    /// When the fault was handled.
    pub timestamp: DateTime<Utc>,
}

impl CrashRecord {
    /// Stamp a fault with the current time.
    pub fn from_fault(fault: &Fault) -> Self {
        Self {
            name: fault.name.clone(),
            reason: fault.reason.clone(),
            stack_trace: fault.stack_trace.clone(),
            timestamp: Utc::now(),
        }
    }

    /// File name the record is stored under: `crash_<unix millis>.json`.
    pub fn file_name(&self) -> String {
        format!("crash_{}.json", self.timestamp.timestamp_millis())
    }
}

fn truncate_utf8(mut text: String, max: usize) -> String {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_has_exact_keys() {
        let record = CrashRecord::from_fault(&Fault::new("panic", "boom", "at main.rs:1"));
        let json = serde_json::to_value(&record).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();

        assert_eq!(keys, vec!["name", "reason", "stackTrace", "timestamp"]);
        assert_eq!(json["reason"], "boom");
        assert_eq!(json["stackTrace"], "at main.rs:1");
    }

    #[test]
    fn test_file_name_uses_millis() {
        let record = CrashRecord::from_fault(&Fault::new("panic", "boom", ""));
        let expected = format!("crash_{}.json", record.timestamp.timestamp_millis());
        assert_eq!(record.file_name(), expected);
    }

    #[test]
    fn test_stack_trace_truncated_on_char_boundary() {
        let long = "é".repeat(MAX_STACK_TRACE_BYTES);
        let fault = Fault::new("panic", "big", long);

        assert!(fault.stack_trace.len() <= MAX_STACK_TRACE_BYTES);
        assert!(fault.stack_trace.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_short_stack_trace_untouched() {
        let fault = Fault::new("panic", "small", "frame 0");
        assert_eq!(fault.stack_trace, "frame 0");
    }
}
