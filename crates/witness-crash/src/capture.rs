//! Panic capture installed in front of the existing panic hook.
//!
//! [`CrashCapture::register`] takes whatever hook is currently installed and
//! replaces it with one that runs the [`HandlerChain`]:
//!
//! 1. persist a [`CrashRecord`] synchronously,
//! 2. call the hook that was installed before,
//! 3. call every handler added through [`CrashCapture::add_handler`].
//!
//! The core handler never prevents the rest of the chain from running, and
//! the panic itself proceeds exactly as it would have without Witness.
//!
//! The process hook is installed once and never removed. Other tools may
//! have installed their own hooks on top of it, chaining down to ours, so
//! [`CrashCapture::unregister`] only deactivates it: an inactive capture
//! hands every panic straight to the hook it replaced.

use std::panic::PanicHookInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{error, info};

use witness_observe::{EventDispatcher, InstrumentationEvent};

use crate::chain::{FaultHandler, HandlerChain, PreviousHook};
use crate::error::CrashResult;
use crate::record::{CrashRecord, Fault};
use crate::store::CrashStore;

/// First link of every chain: writes the crash record.
struct PersistHandler {
    store: CrashStore,
    events: Arc<EventDispatcher>,
}

impl FaultHandler for PersistHandler {
    fn on_fault(&self, fault: &Fault, _panic: Option<&PanicHookInfo<'_>>) {
        let record = CrashRecord::from_fault(fault);
        match self.store.persist(&record) {
            Ok(path) => {
                info!(
                    path = %path.display(),
                    name = %fault.name,
                    reason = %fault.reason,
                    "Crash record persisted"
                );
                self.events
                    .try_emit(InstrumentationEvent::CrashPersisted { path });
            }
            Err(e) => {
                error!(error = %e, reason = %fault.reason, "Failed to persist crash record");
                self.events.try_emit(InstrumentationEvent::CrashPersistFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    fn name(&self) -> &str {
        "persist"
    }
}

/// Captures unhandled panics into durable crash records.
pub struct CrashCapture {
    core: Arc<PersistHandler>,
    chain: RwLock<HandlerChain>,
    installed: Mutex<bool>,
    active: AtomicBool,
}

impl CrashCapture {
    /// Create a capture writing into `store`.
    pub fn new(store: CrashStore, events: Arc<EventDispatcher>) -> Self {
        let core = Arc::new(PersistHandler { store, events });
        let chain = HandlerChain::new(Arc::clone(&core) as Arc<dyn FaultHandler>);
        Self {
            core,
            chain: RwLock::new(chain),
            installed: Mutex::new(false),
            active: AtomicBool::new(false),
        }
    }

    /// Where crash records are written.
    pub fn store(&self) -> &CrashStore {
        &self.core.store
    }

    /// Records persisted so far, oldest first.
    pub fn persisted_records(&self) -> CrashResult<Vec<CrashRecord>> {
        self.core.store.load_all()
    }

    /// Install the capture as the process panic hook.
    ///
    /// The hook installed at this point is kept and runs right after the
    /// crash record is written. Registering again after
    /// [`unregister`](Self::unregister) reactivates the hook already in place
    /// instead of installing a second one. Returns whether this call
    /// activated the capture.
    pub fn register(self: &Arc<Self>) -> bool {
        let mut installed = self.installed.lock();
        if self.active.swap(true, Ordering::SeqCst) {
            return false;
        }

        if !*installed {
            let previous = Arc::new(PreviousHook::new(std::panic::take_hook()));
            self.chain.write().set_previous(Arc::clone(&previous));

            let capture = Arc::downgrade(self);
            std::panic::set_hook(Box::new(move |panic| match capture.upgrade() {
                Some(capture) if capture.is_registered() => capture.on_panic(panic),
                _ => previous.call(panic),
            }));
            *installed = true;
        }

        info!(dir = %self.store().dir().display(), "Crash capture registered");
        true
    }

    /// Stop capturing. Panics go straight to the hook that was installed
    /// before [`register`](Self::register).
    ///
    /// Hooks installed on top of ours by other tools stay in place. Returns
    /// whether the capture was registered.
    pub fn unregister(&self) -> bool {
        let _installed = self.installed.lock();
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }

        info!("Crash capture unregistered");
        true
    }

    /// Whether panics are being captured.
    pub fn is_registered(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Append a handler to the end of the chain.
    pub fn add_handler(&self, handler: Arc<dyn FaultHandler>) {
        self.chain.write().push(handler);
    }

    /// Link names in execution order.
    pub fn handler_names(&self) -> Vec<String> {
        self.chain.read().names()
    }

    /// Deliver a fault that did not come from a panic.
    ///
    /// Runs the same chain as a real panic, except the previous panic hook.
    pub fn handle_fault(&self, fault: &Fault) {
        self.deliver(fault, None);
    }

    fn on_panic(&self, panic: &PanicHookInfo<'_>) {
        let fault = Fault::from_panic(panic);
        self.deliver(&fault, Some(panic));
    }

    fn deliver(&self, fault: &Fault, panic: Option<&PanicHookInfo<'_>>) {
        match self.chain.try_read_for(Duration::from_millis(250)) {
            Some(chain) => chain.run(fault, panic),
            // The chain is being modified, possibly by the faulting thread
            // itself. Persist at least.
            None => self.core.on_fault(fault, panic),
        }
    }
}

impl std::fmt::Debug for CrashCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrashCapture")
            .field("store", &self.core.store)
            .field("registered", &self.is_registered())
            .finish()
    }
}
