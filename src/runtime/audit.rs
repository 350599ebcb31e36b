//! Lifecycle audit instrumentation.
//!
//! Lightweight hooks so callers can observe the major lifecycle transitions
//! of the runtime and the controller without contorting the core paths.
//! Each record carries a stage identifier, a millisecond timestamp, and
//! structured detail fields for downstream buffering or visualization.

use serde_json::Value;

use crate::logging::unix_ms;

/// Distinct lifecycle checkpoints recorded by the runtime and controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeAuditStage {
    /// Core `init` completed a fresh generation.
    CoreInitialized,
    /// `init` was called on an already-initialized instance (warned no-op).
    InitSkipped,
    /// Global error/rejection hooks were installed on the document.
    ErrorHooksInstalled,
    /// A component was registered.
    ComponentRegistered,
    /// A registration silently displaced an existing handle.
    ComponentReplaced,
    /// A settled resize produced an actual breakpoint transition.
    BreakpointChanged,
    /// A component failed during a batch teardown or broadcast.
    ComponentCleanupFailed,
    /// Core cleanup finished; registry cleared.
    CoreCleanedUp,
    /// Controller init completed: discovery, page dispatch, listeners.
    AppInitialized,
    /// Controller init failed and the generation was abandoned.
    AppInitFailed,
    /// A page module was selected and set up.
    PageDispatched,
    /// Dynamic content reload re-initialized the registries.
    ContentReloaded,
    /// Controller teardown finished.
    AppCleanedUp,
}

/// Structured audit entry.
#[derive(Debug, Clone)]
pub struct RuntimeAuditEvent {
    pub ts_ms: u128,
    pub stage: RuntimeAuditStage,
    pub details: Vec<(String, Value)>,
}

/// Builder helper to append detail fields ergonomically.
pub struct RuntimeAuditEventBuilder {
    event: RuntimeAuditEvent,
}

impl RuntimeAuditEventBuilder {
    pub fn new(stage: RuntimeAuditStage) -> Self {
        Self {
            event: RuntimeAuditEvent {
                ts_ms: unix_ms(),
                stage,
                details: Vec::new(),
            },
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.event.details.push((key.into(), value));
        self
    }

    pub fn finish(self) -> RuntimeAuditEvent {
        self.event
    }
}

/// Trait implemented by any audit sink.
pub trait RuntimeAudit: Send + Sync {
    fn record(&self, event: RuntimeAuditEvent);
}

/// Default no-op implementation used when auditing is disabled.
#[derive(Debug, Default)]
pub struct NullRuntimeAudit;

impl RuntimeAudit for NullRuntimeAudit {
    fn record(&self, _event: RuntimeAuditEvent) {}
}
