//! Core runtime: the single source of truth for configuration, environment
//! classification, and cross-component communication.
//!
//! The runtime owns the application state, the component registry, the event
//! bus, and the breakpoint evaluation; the application controller layers
//! discovery and page dispatch on top of it. All timing arrives as
//! milliseconds since page start through [`CoreRuntime::pump`].

use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::config::ThemeConfig;
use crate::dom::{DEFAULT_WAIT_TIMEOUT_MS, ElementWait, SharedDocument};
use crate::error::{Result, ThemeError};
use crate::events::{
    self, EventBus, EventPayload, ListenerId, SharedEventBus,
};
use crate::gateway::{Gateway, Transport};
use crate::globals::{GlobalScope, install_legacy_globals};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::RuntimeMetrics;
use crate::util::Debouncer;

pub mod audit;
mod breakpoint;
mod component;
mod page;

pub use breakpoint::{
    Breakpoint, BreakpointChange, MOBILE_MAX_WIDTH, RESIZE_QUIET_WINDOW_MS, is_mobile_width,
};
pub use component::{Component, ComponentHandle, ComponentRegistry};
pub use page::PageContext;

use audit::{NullRuntimeAudit, RuntimeAudit, RuntimeAuditEventBuilder, RuntimeAuditStage};

const LOG_TARGET: &str = "marquee::runtime";
const METRICS_TARGET: &str = "marquee::runtime.metrics";
const DEFAULT_METRICS_INTERVAL_MS: u64 = 5_000;

/// Mutable state owned exclusively by the core runtime.
///
/// `is_initialized` transitions false → true exactly once per lifecycle
/// generation; reinitialization resets it through `cleanup` first.
#[derive(Debug, Clone)]
pub struct ApplicationState {
    pub is_initialized: bool,
    pub current_page: PageContext,
    pub is_mobile: bool,
    pub current_breakpoint: Option<Breakpoint>,
}

impl Default for ApplicationState {
    fn default() -> Self {
        Self {
            is_initialized: false,
            current_page: PageContext::Default,
            is_mobile: false,
            current_breakpoint: None,
        }
    }
}

pub struct CoreRuntime {
    config: ThemeConfig,
    document: SharedDocument,
    bus: SharedEventBus,
    gateway: Arc<Gateway>,
    scope: GlobalScope,
    logger: Option<Logger>,
    audit: Arc<dyn RuntimeAudit>,
    metrics: Option<Arc<Mutex<RuntimeMetrics>>>,
    metrics_interval_ms: u64,
    last_metrics_emit_ms: Option<u64>,
    state: ApplicationState,
    components: ComponentRegistry,
    resize_debounce: Debouncer<u32>,
    clock_ms: u64,
}

impl CoreRuntime {
    pub fn new(
        config: ThemeConfig,
        document: SharedDocument,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let gateway = Arc::new(Gateway::new(&config, transport));
        Self {
            config,
            document,
            bus: Arc::new(EventBus::new()),
            gateway,
            scope: GlobalScope::new(),
            logger: None,
            audit: Arc::new(NullRuntimeAudit),
            metrics: None,
            metrics_interval_ms: DEFAULT_METRICS_INTERVAL_MS,
            last_metrics_emit_ms: None,
            state: ApplicationState::default(),
            components: ComponentRegistry::new(),
            resize_debounce: Debouncer::new(RESIZE_QUIET_WINDOW_MS),
            clock_ms: 0,
        }
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.gateway.attach_logger(logger.clone());
        self.logger = Some(logger);
    }

    pub fn set_audit(&mut self, audit: Arc<dyn RuntimeAudit>) {
        self.audit = audit;
    }

    /// Zero disables periodic metrics snapshots.
    pub fn set_metrics_interval(&mut self, interval_ms: u64) {
        self.metrics_interval_ms = interval_ms;
    }

    pub fn config(&self) -> &ThemeConfig {
        &self.config
    }

    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    pub fn bus(&self) -> &SharedEventBus {
        &self.bus
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn scope(&self) -> &GlobalScope {
        &self.scope
    }

    pub fn logger(&self) -> Option<&Logger> {
        self.logger.as_ref()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Idempotent bootstrap. A second call on an initialized runtime warns
    /// and returns without side effects. Error/rejection hooks outlive
    /// cleanup: the runtime is their sole owner, so a later generation
    /// reuses the installed pair instead of stacking a new one.
    pub fn init(&mut self) -> Result<()> {
        if self.state.is_initialized {
            self.log(LogLevel::Warn, "core_already_initialized", std::iter::empty());
            self.audit
                .record(RuntimeAuditEventBuilder::new(RuntimeAuditStage::InitSkipped).finish());
            return Ok(());
        }

        if self.config.gateway_url.trim().is_empty() {
            return Err(ThemeError::Initialization(
                "gateway URL missing from bootstrap configuration".to_string(),
            ));
        }

        self.install_error_hooks();

        if self.config.debug_enabled && self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(RuntimeMetrics::new())));
        }
        self.last_metrics_emit_ms = Some(self.clock_ms);

        install_legacy_globals(&self.scope, &self.bus, &self.gateway)?;

        self.state.current_page = PageContext::classify(&self.document.body_classes());
        let width = self.document.viewport_width();
        self.state.current_breakpoint = Some(Breakpoint::for_width(width));
        self.state.is_mobile = is_mobile_width(width);
        self.resize_debounce.reset();
        self.state.is_initialized = true;

        self.audit.record(
            RuntimeAuditEventBuilder::new(RuntimeAuditStage::CoreInitialized)
                .detail("page", json!(self.state.current_page.as_str()))
                .detail("width", json!(width))
                .finish(),
        );
        self.log(
            LogLevel::Info,
            "core_initialized",
            [
                json_kv("page", json!(self.state.current_page.as_str())),
                json_kv("width", json!(width)),
            ],
        );
        self.emit(events::CORE_INITIALIZED, self.state_snapshot());
        Ok(())
    }

    /// Emit through the bus, counting into metrics when enabled.
    pub fn emit(&self, event: &str, payload: EventPayload) -> usize {
        if let Some(metrics) = &self.metrics {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_event_emitted();
            }
        }
        self.bus.emit(event, payload)
    }

    pub fn on<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        self.bus.on(event, callback)
    }

    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.bus.off(event, id)
    }

    /// Insert into the registry, silently replacing an existing handle of
    /// the same name. The displaced handle is dropped without cleanup.
    pub fn register_component(&mut self, name: &str, handle: ComponentHandle) {
        let replaced = self.components.insert(name, handle);
        if let Some(metrics) = &self.metrics {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_registration();
            }
        }
        let stage = if replaced {
            RuntimeAuditStage::ComponentReplaced
        } else {
            RuntimeAuditStage::ComponentRegistered
        };
        self.audit.record(
            RuntimeAuditEventBuilder::new(stage)
                .detail("component", json!(name))
                .finish(),
        );
        self.log(
            LogLevel::Debug,
            "component_registered",
            [
                json_kv("component", json!(name)),
                json_kv("replaced", json!(replaced)),
            ],
        );
        self.emit(
            events::COMPONENT_REGISTERED,
            json!({ "name": name, "replaced": replaced }),
        );
    }

    /// Lookup never panics; `None` is the not-found sentinel.
    pub fn component(&self, name: &str) -> Option<&dyn Component> {
        self.components.get(name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut ComponentHandle> {
        self.components.get_mut(name)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains(name)
    }

    pub fn component_names(&self) -> Vec<String> {
        self.components.names()
    }

    /// Record a viewport resize for debounced evaluation. Ignored while
    /// uninitialized.
    pub fn handle_resize(&mut self, width: u32, at_ms: u64) {
        if !self.state.is_initialized {
            return;
        }
        self.resize_debounce.record(width, at_ms);
    }

    /// Advance the runtime clock: expire element waits, settle a quiet
    /// resize window, emit periodic metrics. Returns the breakpoint
    /// transition, if the settled width produced one, so the caller can
    /// forward it to registries the core does not own.
    pub fn pump(&mut self, at_ms: u64) -> Option<BreakpointChange> {
        self.clock_ms = self.clock_ms.max(at_ms);
        let expired = self.document.expire_watchers(self.clock_ms);
        if expired > 0 {
            self.log(
                LogLevel::Debug,
                "element_waits_expired",
                [json_kv("count", json!(expired))],
            );
        }
        let change = match self.resize_debounce.poll(self.clock_ms) {
            Some(width) => self.apply_width(width),
            None => None,
        };
        self.maybe_emit_metrics();
        change
    }

    /// Register a bounded element wait against the shared document, using
    /// the runtime clock for the deadline.
    pub fn wait_for_element(&self, selector: &str, timeout_ms: Option<u64>) -> Result<ElementWait> {
        self.document.wait_for(
            selector,
            timeout_ms.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS),
            self.clock_ms,
        )
    }

    /// Invoke `reinitialize` on every registered component, isolating
    /// per-component failures.
    pub fn reinitialize_components(&mut self) {
        let mut failures = Vec::new();
        for (name, handle) in self.components.iter_mut() {
            if let Err(err) = handle.reinitialize() {
                failures.push((name.to_string(), err.to_string()));
            }
        }
        if let Some(metrics) = &self.metrics {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_content_reload();
            }
        }
        for (component, error) in failures {
            self.log(
                LogLevel::Warn,
                "component_reinitialize_failed",
                [
                    json_kv("component", json!(component)),
                    json_kv("error", json!(error)),
                ],
            );
        }
    }

    /// Tear down every registered component (failures isolated and logged
    /// with the component name), clear the registry, reset the initialized
    /// flag, and announce the cleanup. A second call against an empty,
    /// uninitialized runtime is a no-op.
    pub fn cleanup(&mut self) {
        if !self.state.is_initialized && self.components.is_empty() {
            return;
        }

        let mut failures = Vec::new();
        for (name, handle) in self.components.iter_mut() {
            if let Err(err) = handle.cleanup() {
                failures.push((name.to_string(), err.to_string()));
            }
        }
        for (component, error) in &failures {
            if let Some(metrics) = &self.metrics {
                if let Ok(mut guard) = metrics.lock() {
                    guard.record_cleanup_failure();
                }
            }
            self.audit.record(
                RuntimeAuditEventBuilder::new(RuntimeAuditStage::ComponentCleanupFailed)
                    .detail("component", json!(component))
                    .detail("error", json!(error))
                    .finish(),
            );
            self.log(
                LogLevel::Warn,
                "component_cleanup_failed",
                [
                    json_kv("component", json!(component)),
                    json_kv("error", json!(error)),
                ],
            );
        }

        self.components.clear();
        self.state.is_initialized = false;
        self.audit
            .record(RuntimeAuditEventBuilder::new(RuntimeAuditStage::CoreCleanedUp).finish());
        self.emit(events::CORE_CLEANUP, json!({ "failures": failures.len() }));
    }

    fn install_error_hooks(&self) {
        let error_bus = Arc::clone(&self.bus);
        let installed_error = self.document.install_error_hook(Arc::new(move |message| {
            error_bus.emit(events::ERROR_GLOBAL, json!({ "message": message }));
        }));
        let rejection_bus = Arc::clone(&self.bus);
        let installed_rejection = self
            .document
            .install_rejection_hook(Arc::new(move |message| {
                rejection_bus.emit(events::ERROR_PROMISE, json!({ "message": message }));
            }));
        if installed_error || installed_rejection {
            self.audit.record(
                RuntimeAuditEventBuilder::new(RuntimeAuditStage::ErrorHooksInstalled).finish(),
            );
        }
    }

    fn apply_width(&mut self, width: u32) -> Option<BreakpointChange> {
        let to = Breakpoint::for_width(width);
        // The mobile flag tracks every settled width, including evaluations
        // suppressed below.
        self.state.is_mobile = is_mobile_width(width);
        let from = self.state.current_breakpoint;
        if from == Some(to) {
            return None;
        }
        self.state.current_breakpoint = Some(to);
        let change = BreakpointChange {
            from,
            to,
            width,
            is_mobile: self.state.is_mobile,
        };
        if let Some(metrics) = &self.metrics {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_breakpoint_change();
            }
        }
        self.audit.record(
            RuntimeAuditEventBuilder::new(RuntimeAuditStage::BreakpointChanged)
                .detail("from", json!(from.map(|b| b.as_str())))
                .detail("to", json!(to.as_str()))
                .detail("width", json!(width))
                .finish(),
        );
        self.emit(events::BREAKPOINT_CHANGED, change.to_payload());
        self.broadcast_breakpoint(&change);
        Some(change)
    }

    fn broadcast_breakpoint(&mut self, change: &BreakpointChange) {
        let mut failures = Vec::new();
        for (name, handle) in self.components.iter_mut() {
            if let Err(err) = handle.on_breakpoint_change(change) {
                failures.push((name.to_string(), err.to_string()));
            }
        }
        for (component, error) in failures {
            self.log(
                LogLevel::Warn,
                "component_breakpoint_failed",
                [
                    json_kv("component", json!(component)),
                    json_kv("error", json!(error)),
                ],
            );
        }
    }

    fn maybe_emit_metrics(&mut self) {
        if self.metrics_interval_ms == 0 {
            return;
        }
        let Some(metrics) = self.metrics.as_ref() else {
            return;
        };
        match self.last_metrics_emit_ms {
            Some(last) if self.clock_ms.saturating_sub(last) < self.metrics_interval_ms => return,
            _ => {}
        }
        self.last_metrics_emit_ms = Some(self.clock_ms);

        if let (Some(logger), Ok(guard)) = (self.logger.as_ref(), metrics.lock()) {
            let counters = self.gateway.counters();
            let snapshot = guard
                .snapshot(self.clock_ms)
                .with_gateway(counters.sent, counters.failed);
            let _ = logger.log_event(snapshot.to_log_event(METRICS_TARGET));
        }
    }

    fn state_snapshot(&self) -> EventPayload {
        json!({
            "page": self.state.current_page.as_str(),
            "breakpoint": self.state.current_breakpoint.map(|b| b.as_str()),
            "is_mobile": self.state.is_mobile,
            "version": self.config.version,
            "components": self.components.names(),
        })
    }

    fn log(
        &self,
        level: LogLevel,
        message: &str,
        fields: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) {
        if let Some(logger) = self.logger.as_ref() {
            let event = event_with_fields(level, LOG_TARGET, message, fields);
            let _ = logger.log_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, Element, WaitStatus};
    use crate::gateway::StaticTransport;
    use crate::logging::MemorySink;

    fn test_config() -> ThemeConfig {
        ThemeConfig {
            gateway_url: "https://example.test/gateway".to_string(),
            security_token: "nonce".to_string(),
            debug_enabled: false,
            version: "1.0.0".to_string(),
        }
    }

    fn runtime_with_width(width: u32) -> CoreRuntime {
        let document = Document::new();
        document.set_viewport_width(width);
        CoreRuntime::new(test_config(), document.shared(), StaticTransport::ok(json!(null)))
    }

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_cleanup: bool,
    }

    impl Recorder {
        fn handle(
            label: &'static str,
            log: &Arc<Mutex<Vec<String>>>,
            fail_cleanup: bool,
        ) -> ComponentHandle {
            Box::new(Self {
                label,
                log: Arc::clone(log),
                fail_cleanup,
            })
        }
    }

    impl Component for Recorder {
        fn name(&self) -> &str {
            self.label
        }

        fn cleanup(&mut self) -> Result<()> {
            self.log.lock().unwrap().push(format!("cleanup:{}", self.label));
            if self.fail_cleanup {
                return Err(ThemeError::component(self.label, "cleanup exploded"));
            }
            Ok(())
        }

        fn on_breakpoint_change(&mut self, change: &BreakpointChange) -> Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("breakpoint:{}:{}", self.label, change.to.as_str()));
            Ok(())
        }
    }

    fn count_emissions(runtime: &CoreRuntime, event: &'static str) -> Arc<Mutex<u32>> {
        let counter = Arc::new(Mutex::new(0u32));
        let slot = Arc::clone(&counter);
        runtime.on(event, move |_| *slot.lock().unwrap() += 1);
        counter
    }

    #[test]
    fn init_is_idempotent_with_a_single_emission() {
        let sink = MemorySink::new();
        let mut runtime = runtime_with_width(1024);
        runtime.set_logger(Logger::new(sink.clone()));
        let initialized = count_emissions(&runtime, events::CORE_INITIALIZED);

        runtime.init().unwrap();
        runtime.init().unwrap();

        assert!(runtime.state().is_initialized);
        assert_eq!(*initialized.lock().unwrap(), 1);
        assert_eq!(sink.count_message("core_already_initialized"), 1);
    }

    #[test]
    fn init_classifies_page_and_breakpoint() {
        let document = Document::new();
        document.set_body_classes(["single-video", "postid-9"]);
        document.set_viewport_width(575);
        let mut runtime = CoreRuntime::new(
            test_config(),
            document.shared(),
            StaticTransport::ok(json!(null)),
        );
        runtime.init().unwrap();

        let state = runtime.state();
        assert_eq!(state.current_page, PageContext::VideoSingle);
        assert_eq!(state.current_breakpoint, Some(Breakpoint::Xs));
        assert!(state.is_mobile);
    }

    #[test]
    fn empty_gateway_url_fails_initialization() {
        let mut config = test_config();
        config.gateway_url = String::new();
        let document = Document::new();
        let mut runtime =
            CoreRuntime::new(config, document.shared(), StaticTransport::ok(json!(null)));
        let err = runtime.init().unwrap_err();
        assert!(matches!(err, ThemeError::Initialization(_)));
        assert!(!runtime.state().is_initialized);
    }

    #[test]
    fn error_hooks_install_once_across_generations() {
        let mut runtime = runtime_with_width(1024);
        runtime.init().unwrap();
        let global_errors = count_emissions(&runtime, events::ERROR_GLOBAL);

        runtime.cleanup();
        runtime.init().unwrap();

        // One report → one forwarded event: the second init reused the
        // installed hook instead of stacking another.
        runtime.document().report_script_error("boom");
        assert_eq!(*global_errors.lock().unwrap(), 1);
    }

    #[test]
    fn continuous_resize_sequence_emits_each_transition() {
        let mut runtime = runtime_with_width(575);
        runtime.init().unwrap();
        let changes = Arc::new(Mutex::new(Vec::new()));
        let slot = Arc::clone(&changes);
        runtime.on(events::BREAKPOINT_CHANGED, move |payload| {
            slot.lock().unwrap().push((
                payload["from"].as_str().map(str::to_string),
                payload["to"].as_str().unwrap().to_string(),
            ));
        });

        runtime.handle_resize(800, 1_000);
        assert_eq!(runtime.pump(1_050), None); // still inside the quiet window
        let first = runtime.pump(1_100).expect("transition");
        assert_eq!(first.from, Some(Breakpoint::Xs));
        assert_eq!(first.to, Breakpoint::Md);

        runtime.handle_resize(1_300, 2_000);
        let second = runtime.pump(2_100).expect("transition");
        assert_eq!(second.from, Some(Breakpoint::Md));
        assert_eq!(second.to, Breakpoint::Xl);

        assert_eq!(
            changes.lock().unwrap().as_slice(),
            [
                (Some("xs".to_string()), "md".to_string()),
                (Some("md".to_string()), "xl".to_string()),
            ]
        );
    }

    #[test]
    fn jump_resize_collapses_to_one_transition() {
        let mut runtime = runtime_with_width(575);
        runtime.init().unwrap();
        let emitted = count_emissions(&runtime, events::BREAKPOINT_CHANGED);

        runtime.handle_resize(800, 1_000);
        runtime.handle_resize(1_300, 1_050); // re-records inside the window
        assert_eq!(runtime.pump(1_100), None);
        let change = runtime.pump(1_150).expect("transition");
        assert_eq!(change.from, Some(Breakpoint::Xs));
        assert_eq!(change.to, Breakpoint::Xl);
        assert_eq!(*emitted.lock().unwrap(), 1);
    }

    #[test]
    fn same_breakpoint_resize_emits_nothing() {
        let mut runtime = runtime_with_width(800);
        runtime.init().unwrap();
        let emitted = count_emissions(&runtime, events::BREAKPOINT_CHANGED);

        runtime.handle_resize(850, 1_000);
        assert_eq!(runtime.pump(1_100), None);
        assert_eq!(*emitted.lock().unwrap(), 0);
        assert_eq!(runtime.state().current_breakpoint, Some(Breakpoint::Md));
    }

    #[test]
    fn suppressed_transition_still_updates_mobile_flag() {
        let mut runtime = runtime_with_width(768);
        runtime.init().unwrap();
        assert!(runtime.state().is_mobile);

        runtime.handle_resize(769, 1_000);
        assert_eq!(runtime.pump(1_100), None); // md → md, suppressed
        assert!(!runtime.state().is_mobile);
    }

    #[test]
    fn breakpoint_broadcast_reaches_components() {
        let mut runtime = runtime_with_width(575);
        runtime.init().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        runtime.register_component("nav", Recorder::handle("nav", &log, false));
        runtime.register_component("hero", Recorder::handle("hero", &log, false));

        runtime.handle_resize(1_300, 1_000);
        runtime.pump(1_100);

        assert_eq!(
            log.lock().unwrap().as_slice(),
            ["breakpoint:nav:xl", "breakpoint:hero:xl"]
        );
    }

    #[test]
    fn registration_replaces_silently_and_lookup_sees_latest() {
        let mut runtime = runtime_with_width(1024);
        runtime.init().unwrap();
        let registered = count_emissions(&runtime, events::COMPONENT_REGISTERED);
        let log = Arc::new(Mutex::new(Vec::new()));

        runtime.register_component("slider", Recorder::handle("h1", &log, false));
        runtime.register_component("slider", Recorder::handle("h2", &log, false));

        assert_eq!(runtime.component("slider").map(|c| c.name()), Some("h2"));
        assert!(runtime.component("missing").is_none());
        assert_eq!(*registered.lock().unwrap(), 2);
        // The displaced handle was dropped without cleanup.
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn erring_cleanup_does_not_block_siblings() {
        let sink = MemorySink::new();
        let mut runtime = runtime_with_width(1024);
        runtime.set_logger(Logger::new(sink.clone()));
        runtime.init().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        runtime.register_component("first", Recorder::handle("first", &log, true));
        runtime.register_component("second", Recorder::handle("second", &log, false));

        runtime.cleanup();

        assert_eq!(
            log.lock().unwrap().as_slice(),
            ["cleanup:first", "cleanup:second"]
        );
        assert!(!runtime.state().is_initialized);
        assert!(runtime.component_names().is_empty());
        assert_eq!(sink.count_message("component_cleanup_failed"), 1);
    }

    #[test]
    fn cleanup_then_init_starts_a_fresh_generation() {
        let mut runtime = runtime_with_width(1024);
        runtime.init().unwrap();
        let cleaned = count_emissions(&runtime, events::CORE_CLEANUP);
        let log = Arc::new(Mutex::new(Vec::new()));
        runtime.register_component("nav", Recorder::handle("nav", &log, false));

        runtime.cleanup();
        assert_eq!(*cleaned.lock().unwrap(), 1);
        runtime.cleanup(); // empty + uninitialized → no second emission
        assert_eq!(*cleaned.lock().unwrap(), 1);

        runtime.init().unwrap();
        assert!(runtime.state().is_initialized);
        assert!(runtime.component_names().is_empty());
    }

    #[test]
    fn wait_for_element_resolves_and_times_out() {
        let mut runtime = runtime_with_width(1024);
        runtime.init().unwrap();

        let late = runtime.wait_for_element("#late", Some(50)).unwrap();
        let never = runtime.wait_for_element("#never", Some(50)).unwrap();
        assert!(late.is_pending());

        runtime.pump(10);
        runtime
            .document()
            .insert(Element::new("div").with_id("late"));
        assert!(late.resolved().is_some());

        runtime.pump(49);
        assert!(never.is_pending());
        runtime.pump(50);
        assert!(matches!(never.status(), WaitStatus::TimedOut));
        assert_eq!(runtime.document().watcher_count(), 0);
    }

    #[test]
    fn debug_mode_emits_metrics_snapshots() {
        let sink = MemorySink::new();
        let mut config = test_config();
        config.debug_enabled = true;
        let document = Document::new();
        document.set_viewport_width(575);
        let mut runtime =
            CoreRuntime::new(config, document.shared(), StaticTransport::ok(json!(null)));
        runtime.set_logger(Logger::new(sink.clone()));
        runtime.set_metrics_interval(1_000);
        runtime.init().unwrap();

        runtime.handle_resize(1_300, 100);
        runtime.pump(200); // transition, but interval not yet reached
        assert_eq!(sink.count_message("runtime_metrics"), 0);
        runtime.pump(1_000);
        assert_eq!(sink.count_message("runtime_metrics"), 1);
        let snapshot = sink
            .events()
            .into_iter()
            .find(|event| event.message == "runtime_metrics")
            .unwrap();
        assert_eq!(snapshot.fields.get("breakpoint_changes"), Some(&json!(1)));
    }
}
