//! Pure helpers shared across the runtime.
//!
//! All timing in this crate is expressed as milliseconds since page start,
//! supplied by the embedder with every environment event; these helpers never
//! read the wall clock, which keeps lifecycles deterministic and scriptable.

use serde_json::Value;

/// Quiet-window invocation limiting: a recorded value is surfaced once no
/// further record has arrived for `quiet_ms`. Re-recording replaces the
/// pending value and restarts the window.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet_ms: u64,
    pending: Option<(T, u64)>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet_ms: u64) -> Self {
        Self {
            quiet_ms,
            pending: None,
        }
    }

    pub fn record(&mut self, value: T, at_ms: u64) {
        self.pending = Some((value, at_ms));
    }

    /// Surface the pending value once the quiet window has elapsed.
    pub fn poll(&mut self, at_ms: u64) -> Option<T> {
        let elapsed = match &self.pending {
            Some((_, recorded_at)) => at_ms.saturating_sub(*recorded_at) >= self.quiet_ms,
            None => false,
        };
        if !elapsed {
            return None;
        }
        self.pending.take().map(|(value, _)| value)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop whatever is pending without surfacing it.
    pub fn reset(&mut self) {
        self.pending = None;
    }

    pub fn quiet_ms(&self) -> u64 {
        self.quiet_ms
    }
}

/// Minimum-interval invocation limiting: the first call passes, later calls
/// pass only once `min_interval_ms` has elapsed since the last passing call.
#[derive(Debug, Clone)]
pub struct Throttler {
    min_interval_ms: u64,
    last_allowed: Option<u64>,
}

impl Throttler {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_allowed: None,
        }
    }

    pub fn allow(&mut self, at_ms: u64) -> bool {
        let allowed = match self.last_allowed {
            None => true,
            Some(last) => at_ms.saturating_sub(last) >= self.min_interval_ms,
        };
        if allowed {
            self.last_allowed = Some(at_ms);
        }
        allowed
    }
}

/// Recursively merge `overlay` into `base`. Objects merge key-by-key; any
/// other pairing replaces the base value with a clone of the overlay.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                deep_merge(base_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (base_slot, value) => *base_slot = value.clone(),
    }
}
