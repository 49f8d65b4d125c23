//! Installs the real process panic hook, so it lives in its own test binary.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use witness::prelude::*;
use witness::witness_crash::CrashStore;

struct Counter(Arc<Mutex<Vec<String>>>);

impl FaultHandler for Counter {
    fn on_fault(&self, fault: &Fault, _panic: Option<&std::panic::PanicHookInfo<'_>>) {
        self.0.lock().push(fault.reason.clone());
    }

    fn name(&self) -> &str {
        "counter"
    }
}

fn checkout() {
    panic!("cart is empty");
}

#[test]
fn test_panic_persisted_then_previous_hook_runs_and_shutdown_keeps_later_hooks() {
    let dir = tempfile::tempdir().unwrap();
    let crash_dir = dir.path().join("crashes");

    let previous_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&previous_calls);
    let hook_dir = crash_dir.clone();
    let files_seen_by_previous = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&files_seen_by_previous);
    std::panic::set_hook(Box::new(move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        *seen.lock() = CrashStore::new(&hook_dir).load_all().ok().map(|r| r.len());
    }));

    let witness = Witness::builder()
        .with_crash_dir(&crash_dir)
        .with_output_dir(dir.path())
        .with_manual_ticks()
        .with_event_logging(false)
        .build();
    witness.initialize(InstrumentationConfig::new("panics")).unwrap();
    assert!(witness.crash_capture().is_registered());

    let reasons = Arc::new(Mutex::new(Vec::new()));
    witness
        .crash_capture()
        .add_handler(Arc::new(Counter(Arc::clone(&reasons))));

    assert!(std::panic::catch_unwind(checkout).is_err());

    assert_eq!(previous_calls.load(Ordering::SeqCst), 1);
    assert_eq!(*files_seen_by_previous.lock(), Some(1));
    assert_eq!(*reasons.lock(), vec!["cart is empty".to_string()]);

    let records = witness.crash_capture().persisted_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "panic");
    assert_eq!(records[0].reason, "cart is empty");

    // A second tool chains its hook on top of ours.
    let other_tool_calls = Arc::new(AtomicUsize::new(0));
    let other = Arc::clone(&other_tool_calls);
    let below = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        other.fetch_add(1, Ordering::SeqCst);
        below(info);
    }));

    witness.shutdown();
    assert!(!witness.crash_capture().is_registered());

    // The other tool keeps working and panics reach the original hook, but
    // nothing is recorded any more.
    assert!(std::panic::catch_unwind(checkout).is_err());
    assert_eq!(other_tool_calls.load(Ordering::SeqCst), 1);
    assert_eq!(previous_calls.load(Ordering::SeqCst), 2);
    assert_eq!(reasons.lock().len(), 1);
    assert_eq!(witness.crash_capture().persisted_records().unwrap().len(), 1);

    drop(std::panic::take_hook());
}
