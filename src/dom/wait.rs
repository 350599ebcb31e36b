use std::sync::{Arc, Mutex};

use super::core::{Element, Selector};

/// Default deadline for element waits, in milliseconds.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Outcome of an element wait. `TimedOut` is terminal: the watcher is
/// removed from the document when the deadline expires.
#[derive(Debug, Clone)]
pub enum WaitStatus {
    Pending,
    Resolved(Element),
    TimedOut,
}

/// Handle to a pending element wait. Resolution happens when a matching
/// element is inserted; expiry happens when the runtime clock passes the
/// deadline. A wait whose selector already matched at registration time is
/// resolved immediately and never observes the document.
pub struct ElementWait {
    selector: String,
    slot: Arc<Mutex<WaitStatus>>,
}

impl ElementWait {
    pub(super) fn new(selector: String, slot: Arc<Mutex<WaitStatus>>) -> Self {
        Self { selector, slot }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn status(&self) -> WaitStatus {
        self.slot.lock().expect("wait slot poisoned").clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status(), WaitStatus::Pending)
    }

    /// The resolved element, if the wait has succeeded.
    pub fn resolved(&self) -> Option<Element> {
        match self.status() {
            WaitStatus::Resolved(element) => Some(element),
            _ => None,
        }
    }
}

pub(super) struct Watcher {
    pub selector: Selector,
    pub deadline_ms: u64,
    pub slot: Arc<Mutex<WaitStatus>>,
}

impl Watcher {
    pub fn resolve(&self, element: &Element) {
        *self.slot.lock().expect("wait slot poisoned") = WaitStatus::Resolved(element.clone());
    }

    pub fn expire(&self) {
        *self.slot.lock().expect("wait slot poisoned") = WaitStatus::TimedOut;
    }
}

pub(super) fn pending_slot() -> Arc<Mutex<WaitStatus>> {
    Arc::new(Mutex::new(WaitStatus::Pending))
}

pub(super) fn resolved_slot(element: Element) -> Arc<Mutex<WaitStatus>> {
    Arc::new(Mutex::new(WaitStatus::Resolved(element)))
}
