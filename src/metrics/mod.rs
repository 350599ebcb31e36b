use serde_json::json;

use crate::logging::{LogEvent, LogFields, LogLevel};

/// Lifecycle counters accumulated while debug mode is enabled.
#[derive(Debug, Default, Clone)]
pub struct RuntimeMetrics {
    events_emitted: u64,
    components_registered: u64,
    breakpoint_changes: u64,
    cleanup_failures: u64,
    content_reloads: u64,
}

impl RuntimeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event_emitted(&mut self) {
        self.events_emitted = self.events_emitted.saturating_add(1);
    }

    pub fn record_registration(&mut self) {
        self.components_registered = self.components_registered.saturating_add(1);
    }

    pub fn record_breakpoint_change(&mut self) {
        self.breakpoint_changes = self.breakpoint_changes.saturating_add(1);
    }

    pub fn record_cleanup_failure(&mut self) {
        self.cleanup_failures = self.cleanup_failures.saturating_add(1);
    }

    pub fn record_content_reload(&mut self) {
        self.content_reloads = self.content_reloads.saturating_add(1);
    }

    pub fn snapshot(&self, uptime_ms: u64) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms,
            events_emitted: self.events_emitted,
            components_registered: self.components_registered,
            breakpoint_changes: self.breakpoint_changes,
            cleanup_failures: self.cleanup_failures,
            content_reloads: self.content_reloads,
            gateway_requests: 0,
            gateway_failures: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub events_emitted: u64,
    pub components_registered: u64,
    pub breakpoint_changes: u64,
    pub cleanup_failures: u64,
    pub content_reloads: u64,
    pub gateway_requests: u64,
    pub gateway_failures: u64,
}

impl MetricSnapshot {
    /// Fold in the gateway's own counters; the runtime supplies them since
    /// the gateway counts independently of debug mode.
    pub fn with_gateway(mut self, requests: u64, failures: u64) -> Self {
        self.gateway_requests = requests;
        self.gateway_failures = failures;
        self
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        let mut fields = LogFields::new();
        fields.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        fields.insert("events_emitted".to_string(), json!(self.events_emitted));
        fields.insert(
            "components_registered".to_string(),
            json!(self.components_registered),
        );
        fields.insert(
            "breakpoint_changes".to_string(),
            json!(self.breakpoint_changes),
        );
        fields.insert("cleanup_failures".to_string(), json!(self.cleanup_failures));
        fields.insert("content_reloads".to_string(), json!(self.content_reloads));
        fields.insert("gateway_requests".to_string(), json!(self.gateway_requests));
        fields.insert("gateway_failures".to_string(), json!(self.gateway_failures));
        LogEvent::with_fields(
            LogLevel::Info,
            target.to_string(),
            "runtime_metrics".to_string(),
            fields,
        )
    }
}
