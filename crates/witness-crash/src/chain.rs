//! Ordered fault handler chain.
//!
//! Order is fixed: the core handler first, then the hook that was installed
//! before registration, then every handler added later in the order they
//! were added.

use std::panic::PanicHookInfo;
use std::sync::Arc;

use crate::record::Fault;

/// A link in the handler chain.
pub trait FaultHandler: Send + Sync {
    /// Handle a fault. `panic` is present when the fault is a real panic
    /// delivered through the panic hook.
    fn on_fault(&self, fault: &Fault, panic: Option<&PanicHookInfo<'_>>);

    /// Name shown in diagnostics.
    fn name(&self) -> &str {
        "handler"
    }
}

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// The panic hook that was installed before ours.
///
/// It can only be invoked for real panics. Simulated faults have no panic
/// information to hand it and skip this link.
pub struct PreviousHook {
    hook: PanicHook,
}

impl PreviousHook {
    pub(crate) fn new(hook: PanicHook) -> Self {
        Self { hook }
    }

    pub(crate) fn call(&self, info: &PanicHookInfo<'_>) {
        (self.hook)(info)
    }
}

impl FaultHandler for PreviousHook {
    fn on_fault(&self, _fault: &Fault, panic: Option<&PanicHookInfo<'_>>) {
        match panic {
            Some(info) => self.call(info),
            None => tracing::trace!("Simulated fault; previous panic hook not invoked"),
        }
    }

    fn name(&self) -> &str {
        "previous-hook"
    }
}

/// Ordered list of fault handlers.
pub struct HandlerChain {
    core: Arc<dyn FaultHandler>,
    previous: Option<Arc<PreviousHook>>,
    added: Vec<Arc<dyn FaultHandler>>,
}

impl HandlerChain {
    /// Create a chain whose first link is `core`.
    pub fn new(core: Arc<dyn FaultHandler>) -> Self {
        Self {
            core,
            previous: None,
            added: Vec::new(),
        }
    }

    /// Place the previously installed hook directly after the core handler.
    pub(crate) fn set_previous(&mut self, previous: Arc<PreviousHook>) {
        self.previous = Some(previous);
    }

    /// Append a handler after every existing link.
    pub fn push(&mut self, handler: Arc<dyn FaultHandler>) {
        self.added.push(handler);
    }

    /// Number of links, core included.
    pub fn len(&self) -> usize {
        1 + usize::from(self.previous.is_some()) + self.added.len()
    }

    /// A chain always has its core link.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Link names in execution order.
    pub fn names(&self) -> Vec<String> {
        self.links().iter().map(|h| h.name().to_string()).collect()
    }

    /// Run every link in order.
    pub fn run(&self, fault: &Fault, panic: Option<&PanicHookInfo<'_>>) {
        for handler in self.links() {
            handler.on_fault(fault, panic);
        }
    }

    fn links(&self) -> Vec<&dyn FaultHandler> {
        let mut links: Vec<&dyn FaultHandler> = Vec::with_capacity(self.len());
        links.push(self.core.as_ref());
        if let Some(previous) = &self.previous {
            links.push(previous.as_ref());
        }
        for handler in &self.added {
            links.push(handler.as_ref());
        }
        links
    }
}

impl std::fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
