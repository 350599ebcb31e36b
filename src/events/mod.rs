//! Synchronous publish/subscribe channel shared by the runtime, the
//! application controller, and external page scripts.
//!
//! `emit` delivers to every listener registered for the event name, in
//! subscription order, before it returns. The bus never catches listener
//! panics; batch failure isolation is the caller's concern and applies to
//! component lifecycles, not bus delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

/// Emitted by the core runtime once per successful `init`.
pub const CORE_INITIALIZED: &str = "core:initialized";
/// Emitted by the core runtime at the end of `cleanup`.
pub const CORE_CLEANUP: &str = "core:cleanup";
/// Emitted for every component registration, including silent replacement.
pub const COMPONENT_REGISTERED: &str = "component:registered";
/// Emitted only on an actual breakpoint transition, never on a same-value
/// re-evaluation.
pub const BREAKPOINT_CHANGED: &str = "breakpoint:changed";
/// Emitted by the application controller once per successful `init`.
pub const APP_INITIALIZED: &str = "app:initialized";
/// Emitted when the controller's init sequence fails; carries the error text.
pub const APP_INITIALIZATION_FAILED: &str = "app:initialization-failed";
/// Re-emission of page visibility changes.
pub const APP_VISIBILITY: &str = "app:visibility";
/// Emitted after a dynamic-content reload re-initialized the registries.
pub const APP_CONTENT_RELOADED: &str = "app:content-reloaded";
/// Captured unhandled script error, forwarded for observability only.
pub const ERROR_GLOBAL: &str = "error:global";
/// Captured unhandled promise rejection, forwarded for observability only.
pub const ERROR_PROMISE: &str = "error:promise";

pub type EventPayload = Value;

type Callback = Arc<dyn Fn(&EventPayload) + Send + Sync>;

/// Token returned by [`EventBus::on`]; passing it to [`EventBus::off`] removes
/// that subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    callback: Callback,
}

#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
    next_id: AtomicU64,
}

pub type SharedEventBus = Arc<EventBus>;

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to an event name. Listeners fire in subscription order.
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.lock().expect("event bus poisoned");
        listeners.entry(event.to_string()).or_default().push(Listener {
            id,
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove one subscription. Returns whether anything was removed.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().expect("event bus poisoned");
        match listeners.get_mut(event) {
            Some(entries) => {
                let before = entries.len();
                entries.retain(|listener| listener.id != id);
                if entries.is_empty() {
                    listeners.remove(event);
                }
                before > 0
            }
            None => false,
        }
    }

    /// Deliver `payload` to every current listener for `event`, in
    /// subscription order, before returning. Returns the delivery count.
    ///
    /// The listener list is snapshotted up front: subscriptions made during
    /// delivery become visible on the next emit.
    pub fn emit(&self, event: &str, payload: EventPayload) -> usize {
        let snapshot: Vec<Callback> = {
            let listeners = self.listeners.lock().expect("event bus poisoned");
            listeners
                .get(event)
                .map(|entries| entries.iter().map(|l| Arc::clone(&l.callback)).collect())
                .unwrap_or_default()
        };
        for callback in &snapshot {
            callback(&payload);
        }
        snapshot.len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        let listeners = self.listeners.lock().expect("event bus poisoned");
        listeners.get(event).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delivers_in_subscription_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            bus.on("test:event", move |_| {
                seen.lock().unwrap().push(tag);
            });
        }

        let delivered = bus.emit("test:event", json!({}));
        assert_eq!(delivered, 3);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn emit_with_no_listeners_is_a_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.emit("test:silent", json!(null)), 0);
    }

    #[test]
    fn off_removes_only_the_given_subscription() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0u32));

        let keep = Arc::clone(&count);
        bus.on("test:event", move |_| *keep.lock().unwrap() += 1);
        let removed_count = Arc::clone(&count);
        let removable = bus.on("test:event", move |_| {
            *removed_count.lock().unwrap() += 10;
        });

        assert!(bus.off("test:event", removable));
        assert!(!bus.off("test:event", removable));
        bus.emit("test:event", json!({}));
        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(bus.listener_count("test:event"), 1);
    }

    #[test]
    fn payload_reaches_listeners() {
        let bus = EventBus::new();
        let captured = Arc::new(Mutex::new(Value::Null));
        let slot = Arc::clone(&captured);
        bus.on(BREAKPOINT_CHANGED, move |payload| {
            *slot.lock().unwrap() = payload.clone();
        });

        bus.emit(BREAKPOINT_CHANGED, json!({ "from": "xs", "to": "md" }));
        assert_eq!(
            *captured.lock().unwrap(),
            json!({ "from": "xs", "to": "md" })
        );
    }

    #[test]
    fn subscriptions_during_emit_fire_on_the_next_emit() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(Mutex::new(0u32));

        let bus_clone = Arc::clone(&bus);
        let count_clone = Arc::clone(&count);
        bus.on("test:event", move |_| {
            let late = Arc::clone(&count_clone);
            bus_clone.on("test:event", move |_| {
                *late.lock().unwrap() += 1;
            });
        });

        bus.emit("test:event", json!({}));
        assert_eq!(*count.lock().unwrap(), 0);
        bus.emit("test:event", json!({}));
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
