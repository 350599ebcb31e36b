//! Application controller: one full page lifecycle.
//!
//! Discovery → instantiation → page dispatch → global listeners → ordered
//! teardown. The controller drives the core runtime, owns the page-scoped
//! component registry and the page modules, and is fed by the embedder's
//! [`EnvironmentEvent`] stream: resize, visibility, dynamic content, and
//! unload all arrive through [`App::handle_event`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ThemeConfig;
use crate::dom::{Selector, SharedDocument};
use crate::error::Result;
use crate::events;
use crate::gateway::Transport;
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::runtime::{
    ComponentHandle, ComponentRegistry, CoreRuntime,
    audit::{RuntimeAudit, RuntimeAuditEventBuilder, RuntimeAuditStage},
};

mod components;
mod pages;

pub use components::{
    BACK_TO_TOP_SELECTOR, BackToTop, CAROUSEL_CONFIG_ATTR, CAROUSEL_SELECTOR, Carousel,
    CarouselConfig, DEFAULT_SLIDES, NAVIGATION_SELECTOR, Navigation, THEME_CHANGED,
    THEME_SWITCH_SELECTOR, ThemeSwitcher, carousel_key,
};
pub use pages::{LoginPage, PageDeps, PageModule, RegisterPage, module_for};

const LOG_TARGET: &str = "marquee::app";

/// Environment signals the embedder feeds into the controller. Serde-tagged
/// so lifecycle scripts can be loaded from JSON and replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvironmentEvent {
    Resize { width: u32, at_ms: u64 },
    VisibilityChanged { visible: bool, at_ms: u64 },
    ContentLoaded { at_ms: u64 },
    Tick { at_ms: u64 },
    BeforeUnload { at_ms: u64 },
}

pub struct App {
    core: CoreRuntime,
    components: ComponentRegistry,
    page_modules: Vec<Box<dyn PageModule>>,
    initialized: bool,
    audit: Arc<dyn RuntimeAudit>,
}

impl App {
    pub fn new(
        config: ThemeConfig,
        document: SharedDocument,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let core = CoreRuntime::new(config, document, transport);
        Self {
            core,
            components: ComponentRegistry::new(),
            page_modules: Vec::new(),
            initialized: false,
            audit: Arc::new(crate::runtime::audit::NullRuntimeAudit),
        }
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.core.set_logger(logger);
    }

    pub fn set_audit(&mut self, audit: Arc<dyn RuntimeAudit>) {
        self.audit = Arc::clone(&audit);
        self.core.set_audit(audit);
    }

    pub fn core(&self) -> &CoreRuntime {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut CoreRuntime {
        &mut self.core
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Names in the controller-owned (page-scoped) registry.
    pub fn component_names(&self) -> Vec<String> {
        self.components.names()
    }

    pub fn page_module_names(&self) -> Vec<String> {
        self.page_modules
            .iter()
            .map(|module| module.name().to_string())
            .collect()
    }

    /// Idempotent bootstrap of one lifecycle generation. Each step completes
    /// before the next begins; page dispatch can assume the global
    /// components are already registered. On failure the controller emits
    /// `app:initialization-failed`, stays uninitialized, and leaves anything
    /// already registered in place for the next cleanup. No rollback, no
    /// automatic retry.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            self.log(LogLevel::Warn, "app_already_initialized", std::iter::empty());
            self.audit
                .record(RuntimeAuditEventBuilder::new(RuntimeAuditStage::InitSkipped).finish());
            return Ok(());
        }

        match self.try_init() {
            Ok(()) => {
                self.initialized = true;
                let mut discovered = self.core.component_names();
                discovered.extend(self.components.names());
                let page = self.core.state().current_page;
                self.audit.record(
                    RuntimeAuditEventBuilder::new(RuntimeAuditStage::AppInitialized)
                        .detail("components", json!(discovered))
                        .detail("page", json!(page.as_str()))
                        .finish(),
                );
                self.log(
                    LogLevel::Info,
                    "app_initialized",
                    [
                        json_kv("components", json!(discovered)),
                        json_kv("page", json!(page.as_str())),
                    ],
                );
                self.core.emit(
                    events::APP_INITIALIZED,
                    json!({
                        "components": discovered,
                        "page_modules": self.page_module_names(),
                        "page": page.as_str(),
                    }),
                );
                Ok(())
            }
            Err(err) => {
                self.audit.record(
                    RuntimeAuditEventBuilder::new(RuntimeAuditStage::AppInitFailed)
                        .detail("error", json!(err.to_string()))
                        .finish(),
                );
                self.log(
                    LogLevel::Error,
                    "app_initialization_failed",
                    [json_kv("error", json!(err.to_string()))],
                );
                self.core.emit(
                    events::APP_INITIALIZATION_FAILED,
                    json!({ "error": err.to_string() }),
                );
                Err(err)
            }
        }
    }

    fn try_init(&mut self) -> Result<()> {
        self.core.init()?;
        self.discover_components()?;
        self.dispatch_page()?;
        Ok(())
    }

    /// Single discovery pass. Absence of any selector's target silently
    /// skips that component: the templates vary by page and the controller
    /// tolerates every subset of fixtures.
    fn discover_components(&mut self) -> Result<()> {
        let document = Arc::clone(self.core.document());

        if document.exists(&Selector::parse(NAVIGATION_SELECTOR)?) {
            let mut handle: ComponentHandle = Box::new(Navigation::new(Arc::clone(&document)));
            handle.init()?;
            self.core.register_component("navigation", handle);
        }

        if let Some(element) = document.query(&Selector::parse(THEME_SWITCH_SELECTOR)?) {
            let mut handle: ComponentHandle = Box::new(ThemeSwitcher::new(
                Arc::clone(&document),
                Arc::clone(self.core.bus()),
                &element,
            ));
            handle.init()?;
            self.core.register_component("theme-switcher", handle);
        }

        if document.exists(&Selector::parse(BACK_TO_TOP_SELECTOR)?) {
            let mut handle: ComponentHandle = Box::new(BackToTop::new());
            handle.init()?;
            self.register_page_scoped("back-to-top", handle);
        }

        let carousel_selector = Selector::parse(CAROUSEL_SELECTOR)?;
        for (index, element) in document.query_all(&carousel_selector).iter().enumerate() {
            let key = carousel_key(element, index);
            let mut handle: ComponentHandle =
                Box::new(Carousel::from_element(&key, element, self.core.logger()));
            handle.init()?;
            self.register_page_scoped(&key, handle);
        }

        Ok(())
    }

    fn register_page_scoped(&mut self, name: &str, handle: ComponentHandle) {
        let replaced = self.components.insert(name, handle);
        self.log(
            LogLevel::Debug,
            "component_discovered",
            [
                json_kv("component", json!(name)),
                json_kv("replaced", json!(replaced)),
            ],
        );
    }

    /// Select and run exactly one page routine. `Default` runs none, which
    /// is valid, not an error.
    fn dispatch_page(&mut self) -> Result<()> {
        let context = self.core.state().current_page;
        let deps = PageDeps {
            document: Arc::clone(self.core.document()),
            gateway: Arc::clone(self.core.gateway()),
            logger: self.core.logger().cloned(),
        };
        if let Some(mut module) = module_for(context, deps) {
            module.setup()?;
            self.audit.record(
                RuntimeAuditEventBuilder::new(RuntimeAuditStage::PageDispatched)
                    .detail("page", json!(context.as_str()))
                    .detail("module", json!(module.name()))
                    .finish(),
            );
            self.log(
                LogLevel::Debug,
                "page_dispatched",
                [json_kv("module", json!(module.name()))],
            );
            self.page_modules.push(module);
        }
        Ok(())
    }

    /// The controller's global listeners, driven by the embedder's feed.
    /// Everything but `BeforeUnload` is inert while uninitialized.
    pub fn handle_event(&mut self, event: &EnvironmentEvent) -> Result<()> {
        match event {
            EnvironmentEvent::Resize { width, at_ms } => {
                self.core.handle_resize(*width, *at_ms);
                self.pump(*at_ms);
            }
            EnvironmentEvent::Tick { at_ms } => {
                self.pump(*at_ms);
            }
            EnvironmentEvent::VisibilityChanged { visible, at_ms } => {
                self.pump(*at_ms);
                self.core.document().set_visible(*visible);
                if self.initialized {
                    self.core
                        .emit(events::APP_VISIBILITY, json!({ "visible": *visible }));
                }
            }
            EnvironmentEvent::ContentLoaded { at_ms } => {
                self.pump(*at_ms);
                if self.initialized {
                    self.reload_content();
                }
            }
            EnvironmentEvent::BeforeUnload { at_ms } => {
                self.pump(*at_ms);
                self.cleanup();
            }
        }
        Ok(())
    }

    /// Drive a scripted lifecycle to completion.
    pub fn run_scripted<I>(&mut self, script: I) -> Result<()>
    where
        I: IntoIterator<Item = EnvironmentEvent>,
    {
        for event in script {
            self.handle_event(&event)?;
        }
        Ok(())
    }

    /// Ordered teardown: controller-owned components, then page modules,
    /// then the core runtime. Per-item failures are isolated. Safe to call
    /// repeatedly; a fully torn-down controller is a no-op.
    pub fn cleanup(&mut self) {
        let had_work =
            self.initialized || !self.components.is_empty() || !self.page_modules.is_empty();

        let mut failures = Vec::new();
        for (name, handle) in self.components.iter_mut() {
            if let Err(err) = handle.cleanup() {
                failures.push((name.to_string(), err.to_string()));
            }
        }
        self.components.clear();

        for module in self.page_modules.iter_mut() {
            if let Err(err) = module.cleanup() {
                failures.push((module.name().to_string(), err.to_string()));
            }
        }
        self.page_modules.clear();

        for (component, error) in failures {
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

        self.core.cleanup();
        self.initialized = false;

        if had_work {
            self.audit
                .record(RuntimeAuditEventBuilder::new(RuntimeAuditStage::AppCleanedUp).finish());
            self.log(LogLevel::Info, "app_cleaned_up", std::iter::empty());
        }
    }

    /// Full teardown followed by a fresh bootstrap, for content swaps that
    /// replace the page without a reload.
    pub fn reinitialize(&mut self) -> Result<()> {
        self.cleanup();
        self.init()
    }

    fn pump(&mut self, at_ms: u64) {
        let Some(change) = self.core.pump(at_ms) else {
            return;
        };
        // The core already notified its own registry; forward the
        // transition to the page-scoped one with the same isolation.
        let mut failures = Vec::new();
        for (name, handle) in self.components.iter_mut() {
            if let Err(err) = handle.on_breakpoint_change(&change) {
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

    fn reload_content(&mut self) {
        self.core.reinitialize_components();
        let mut failures = Vec::new();
        for (name, handle) in self.components.iter_mut() {
            if let Err(err) = handle.reinitialize() {
                failures.push((name.to_string(), err.to_string()));
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
        self.audit
            .record(RuntimeAuditEventBuilder::new(RuntimeAuditStage::ContentReloaded).finish());
        self.core.emit(
            events::APP_CONTENT_RELOADED,
            json!({ "components": self.components.len() }),
        );
    }

    fn log(
        &self,
        level: LogLevel,
        message: &str,
        fields: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) {
        if let Some(logger) = self.core.logger() {
            let _ = logger.log_event(event_with_fields(level, LOG_TARGET, message, fields));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, Element};
    use crate::error::ThemeError;
    use crate::gateway::StaticTransport;
    use crate::logging::MemorySink;
    use crate::runtime::Component;
    use serde_json::Value;
    use std::sync::Mutex;

    fn test_config() -> ThemeConfig {
        ThemeConfig {
            gateway_url: "https://example.test/gateway".to_string(),
            security_token: "nonce".to_string(),
            debug_enabled: false,
            version: "1.0.0".to_string(),
        }
    }

    fn home_document() -> SharedDocument {
        let document = Document::new();
        document.set_body_classes(["home", "logged-in"]);
        document.set_viewport_width(575);
        document.insert(Element::new("nav").with_class("site-nav"));
        document.insert(
            Element::new("button")
                .with_attr("data-theme-switch", "")
                .with_attr("data-default-theme", "dark"),
        );
        document.insert(Element::new("a").with_id("back-to-top"));
        document.insert(Element::new("div").with_class("video-grid"));
        document.insert(
            Element::new("div")
                .with_id("hero")
                .with_attr("data-carousel", "")
                .with_attr(CAROUSEL_CONFIG_ATTR, r#"{"slides":["a","b"]}"#),
        );
        document.insert(
            Element::new("div")
                .with_attr("data-carousel", "")
                .with_attr(CAROUSEL_CONFIG_ATTR, "{broken"),
        );
        document.shared()
    }

    fn boot_app(document: SharedDocument) -> (App, MemorySink) {
        let sink = MemorySink::new();
        let mut app = App::new(
            test_config(),
            document,
            StaticTransport::ok(json!({ "videos": [] })),
        );
        app.set_logger(Logger::new(sink.clone()));
        (app, sink)
    }

    fn count_emissions(app: &App, event: &'static str) -> Arc<Mutex<u32>> {
        let counter = Arc::new(Mutex::new(0u32));
        let slot = Arc::clone(&counter);
        app.core().on(event, move |_| *slot.lock().unwrap() += 1);
        counter
    }

    struct ReinitProbe {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Component for ReinitProbe {
        fn name(&self) -> &str {
            self.label
        }

        fn reinitialize(&mut self) -> crate::error::Result<()> {
            self.log.lock().unwrap().push(format!("reinit:{}", self.label));
            Ok(())
        }
    }

    #[test]
    fn boot_discovers_components_and_dispatches_the_page() {
        let document = home_document();
        let (mut app, _) = boot_app(Arc::clone(&document));
        let initialized = count_emissions(&app, events::APP_INITIALIZED);

        app.init().unwrap();

        assert!(app.is_initialized());
        assert!(app.core().has_component("navigation"));
        assert!(app.core().has_component("theme-switcher"));
        assert_eq!(
            app.component_names(),
            ["back-to-top", "carousel:hero", "carousel:slot1"]
        );
        assert_eq!(app.page_module_names(), ["page:home"]);
        assert_eq!(*initialized.lock().unwrap(), 1);

        // The malformed carousel registered on fallback configuration and
        // the page routine populated the grid.
        let grid = document.query(&Selector::class("video-grid")).unwrap();
        assert_eq!(grid.text(), "0 featured videos");
    }

    #[test]
    fn double_init_is_a_warned_noop() {
        let (mut app, sink) = boot_app(home_document());
        let initialized = count_emissions(&app, events::APP_INITIALIZED);

        app.init().unwrap();
        app.init().unwrap();

        assert_eq!(*initialized.lock().unwrap(), 1);
        assert_eq!(sink.count_message("app_already_initialized"), 1);
    }

    #[test]
    fn init_failure_reports_and_leaves_registrations_in_place() {
        let document = Document::new();
        document.set_body_classes(["home"]);
        document.insert(Element::new("nav").with_class("site-nav"));
        document.insert(
            Element::new("div")
                .with_attr("data-carousel", "")
                .with_attr(CAROUSEL_CONFIG_ATTR, r#"{"autoplay":true,"interval_ms":0}"#),
        );
        let (mut app, sink) = boot_app(document.shared());
        let failed = count_emissions(&app, events::APP_INITIALIZATION_FAILED);

        let err = app.init().unwrap_err();
        assert!(matches!(err, ThemeError::ComponentConfig(_)));
        assert!(!app.is_initialized());
        assert_eq!(*failed.lock().unwrap(), 1);
        assert_eq!(sink.count_message("app_initialization_failed"), 1);

        // No rollback: the navigation registered before the failure stays,
        // and the next cleanup tears it down.
        assert!(app.core().has_component("navigation"));
        app.cleanup();
        assert!(!app.core().has_component("navigation"));
    }

    #[test]
    fn resize_through_the_event_feed_reaches_both_registries() {
        let (mut app, _) = boot_app(home_document());
        app.init().unwrap();
        let changes = count_emissions(&app, events::BREAKPOINT_CHANGED);

        app.run_scripted([
            EnvironmentEvent::Resize {
                width: 1_300,
                at_ms: 1_000,
            },
            EnvironmentEvent::Tick { at_ms: 1_100 },
        ])
        .unwrap();

        assert_eq!(*changes.lock().unwrap(), 1);
        assert_eq!(app.core().state().current_breakpoint.unwrap().as_str(), "xl");
        assert!(!app.core().state().is_mobile);
    }

    #[test]
    fn reinitialize_repopulates_without_leaking_listeners() {
        let (mut app, _) = boot_app(home_document());
        app.init().unwrap();
        app.reinitialize().unwrap();
        app.reinitialize().unwrap();

        assert!(app.is_initialized());
        assert_eq!(
            app.component_names(),
            ["back-to-top", "carousel:hero", "carousel:slot1"]
        );

        // One settled resize still produces exactly one transition event
        // and one hook forwarding; generations do not stack observers.
        let changes = count_emissions(&app, events::BREAKPOINT_CHANGED);
        let errors = count_emissions(&app, events::ERROR_GLOBAL);
        app.run_scripted([
            EnvironmentEvent::Resize {
                width: 1_300,
                at_ms: 5_000,
            },
            EnvironmentEvent::Tick { at_ms: 5_100 },
        ])
        .unwrap();
        app.core().document().report_script_error("boom");

        assert_eq!(*changes.lock().unwrap(), 1);
        assert_eq!(*errors.lock().unwrap(), 1);
    }

    #[test]
    fn before_unload_tears_everything_down() {
        let (mut app, _) = boot_app(home_document());
        app.init().unwrap();
        let cleaned = count_emissions(&app, events::CORE_CLEANUP);

        app.run_scripted([EnvironmentEvent::BeforeUnload { at_ms: 9_000 }])
            .unwrap();

        assert!(!app.is_initialized());
        assert!(app.component_names().is_empty());
        assert!(app.page_module_names().is_empty());
        assert!(app.core().component_names().is_empty());
        assert_eq!(*cleaned.lock().unwrap(), 1);

        // A second unload against the empty controller is a no-op.
        app.run_scripted([EnvironmentEvent::BeforeUnload { at_ms: 9_100 }])
            .unwrap();
        assert_eq!(*cleaned.lock().unwrap(), 1);
    }

    #[test]
    fn visibility_changes_are_reemitted() {
        let (mut app, _) = boot_app(home_document());
        app.init().unwrap();
        let payloads = Arc::new(Mutex::new(Vec::<Value>::new()));
        let slot = Arc::clone(&payloads);
        app.core().on(events::APP_VISIBILITY, move |payload| {
            slot.lock().unwrap().push(payload.clone());
        });

        app.handle_event(&EnvironmentEvent::VisibilityChanged {
            visible: false,
            at_ms: 2_000,
        })
        .unwrap();

        assert_eq!(
            payloads.lock().unwrap().as_slice(),
            [json!({ "visible": false })]
        );
        assert!(!app.core().document().is_visible());
    }

    #[test]
    fn content_loaded_reinitializes_both_registries() {
        let (mut app, _) = boot_app(home_document());
        app.init().unwrap();
        let reloaded = count_emissions(&app, events::APP_CONTENT_RELOADED);

        let log = Arc::new(Mutex::new(Vec::new()));
        app.core_mut().register_component(
            "probe:core",
            Box::new(ReinitProbe {
                label: "core",
                log: Arc::clone(&log),
            }),
        );
        app.components.insert(
            "probe:app",
            Box::new(ReinitProbe {
                label: "app",
                log: Arc::clone(&log),
            }),
        );

        app.handle_event(&EnvironmentEvent::ContentLoaded { at_ms: 3_000 })
            .unwrap();

        assert_eq!(
            log.lock().unwrap().as_slice(),
            ["reinit:core", "reinit:app"]
        );
        assert_eq!(*reloaded.lock().unwrap(), 1);
    }

    #[test]
    fn events_before_init_are_inert() {
        let (mut app, _) = boot_app(home_document());
        let visibility = count_emissions(&app, events::APP_VISIBILITY);
        let reloaded = count_emissions(&app, events::APP_CONTENT_RELOADED);

        app.run_scripted([
            EnvironmentEvent::Resize {
                width: 1_300,
                at_ms: 100,
            },
            EnvironmentEvent::Tick { at_ms: 300 },
            EnvironmentEvent::VisibilityChanged {
                visible: false,
                at_ms: 400,
            },
            EnvironmentEvent::ContentLoaded { at_ms: 500 },
        ])
        .unwrap();

        assert!(!app.is_initialized());
        assert_eq!(*visibility.lock().unwrap(), 0);
        assert_eq!(*reloaded.lock().unwrap(), 0);
    }

    #[test]
    fn default_page_runs_no_module() {
        let document = Document::new();
        document.set_body_classes(["logged-in", "admin-bar"]);
        let (mut app, _) = boot_app(document.shared());

        app.init().unwrap();
        assert!(app.page_module_names().is_empty());
    }

    #[test]
    fn scripts_round_trip_through_json() {
        let script = r#"[
            { "type": "resize", "width": 1300, "at_ms": 1000 },
            { "type": "tick", "at_ms": 1100 },
            { "type": "visibility_changed", "visible": false, "at_ms": 1200 },
            { "type": "before_unload", "at_ms": 1300 }
        ]"#;
        let events: Vec<EnvironmentEvent> = serde_json::from_str(script).unwrap();

        let (mut app, _) = boot_app(home_document());
        app.init().unwrap();
        app.run_scripted(events).unwrap();
        assert!(!app.is_initialized());
    }
}
