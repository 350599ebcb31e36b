//! Marquee: the client-side lifecycle runtime of a video site theme.
//!
//! The crate boots a page, conditionally wires UI components to document
//! elements present on it, exposes a single outbound gateway to the backend,
//! and routes to page-specific setup logic selected by a body-class
//! taxonomy. The embedder supplies the document and the environment event
//! feed; every lifecycle is deterministic and scriptable.

pub mod app;
pub mod config;
pub mod dom;
pub mod error;
pub mod events;
pub mod gateway;
pub mod globals;
pub mod logging;
pub mod metrics;
pub mod runtime;
pub mod util;

pub use app::{
    App, BackToTop, CAROUSEL_CONFIG_ATTR, CAROUSEL_SELECTOR, Carousel, CarouselConfig,
    DEFAULT_SLIDES, EnvironmentEvent, LoginPage, NAVIGATION_SELECTOR, Navigation, PageDeps,
    PageModule, RegisterPage, THEME_SWITCH_SELECTOR, ThemeSwitcher, module_for,
};
pub use config::{ConfigError, ThemeConfig};
pub use dom::{
    DEFAULT_WAIT_TIMEOUT_MS, Document, Element, ElementWait, ErrorHook, Selector, SharedDocument,
    WaitStatus,
};
pub use error::{Result, ThemeError};
pub use events::{EventBus, EventPayload, ListenerId, SharedEventBus};
pub use gateway::{
    Gateway, GatewayCounters, GatewayError, RequestOptions, ResponseEnvelope, StaticTransport,
    Transport, TransportRequest, TransportResponse,
};
pub use globals::{GlobalScope, GlobalScopeError, LegacyGlobals, install_legacy_globals};
pub use logging::{
    ConsoleSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink, event_with_fields, json_kv,
};
pub use metrics::{MetricSnapshot, RuntimeMetrics};
pub use runtime::audit::{
    NullRuntimeAudit, RuntimeAudit, RuntimeAuditEvent, RuntimeAuditEventBuilder, RuntimeAuditStage,
};
pub use runtime::{
    ApplicationState, Breakpoint, BreakpointChange, Component, ComponentHandle, ComponentRegistry,
    CoreRuntime, MOBILE_MAX_WIDTH, PageContext, RESIZE_QUIET_WINDOW_MS, is_mobile_width,
};
pub use util::{Debouncer, Throttler, deep_merge};
