//! Discovery component shells.
//!
//! Each shell carries only the lifecycle-relevant state of its widget; the
//! visual behavior belongs to the page. The discovery pass in the controller
//! instantiates a shell only when its selector predicate matches, so any
//! subset of these may be absent on a given page.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::dom::{Element, Selector, SharedDocument};
use crate::error::{Result, ThemeError};
use crate::events::SharedEventBus;
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::runtime::{BreakpointChange, Component};

/// Discovery predicates, in CSS selector syntax.
pub const NAVIGATION_SELECTOR: &str = ".site-nav";
pub const THEME_SWITCH_SELECTOR: &str = "[data-theme-switch]";
pub const BACK_TO_TOP_SELECTOR: &str = "#back-to-top";
pub const CAROUSEL_SELECTOR: &str = "[data-carousel]";

/// Attribute carrying a carousel's per-instance JSON configuration.
pub const CAROUSEL_CONFIG_ATTR: &str = "data-carousel-config";

/// Emitted by [`ThemeSwitcher::toggle`].
pub const THEME_CHANGED: &str = "theme:changed";

/// Slide sources applied when an instance configures none.
pub const DEFAULT_SLIDES: &[&str] = &["latest", "trending", "featured"];

const LOG_TARGET: &str = "marquee::app.components";

/// Site navigation. Globally shared: registered into the core registry.
pub struct Navigation {
    document: SharedDocument,
    open: bool,
}

impl Navigation {
    pub fn new(document: SharedDocument) -> Self {
        Self {
            document,
            open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }
}

impl Component for Navigation {
    fn name(&self) -> &str {
        "navigation"
    }

    fn on_breakpoint_change(&mut self, change: &BreakpointChange) -> Result<()> {
        // An open desktop menu collapses when the viewport drops to mobile.
        if change.is_mobile {
            self.open = false;
        }
        self.document.set_attr(
            &Selector::class("site-nav"),
            "data-collapsed",
            if change.is_mobile { "1" } else { "0" },
        );
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }
}

/// Light/dark switcher. Globally shared: registered into the core registry.
pub struct ThemeSwitcher {
    document: SharedDocument,
    bus: SharedEventBus,
    theme: String,
}

impl ThemeSwitcher {
    pub fn new(document: SharedDocument, bus: SharedEventBus, element: &Element) -> Self {
        let theme = element
            .attr("data-default-theme")
            .unwrap_or("dark")
            .to_string();
        Self {
            document,
            bus,
            theme,
        }
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn toggle(&mut self) {
        self.theme = if self.theme == "dark" {
            "light".to_string()
        } else {
            "dark".to_string()
        };
        self.apply();
        self.bus
            .emit(THEME_CHANGED, json!({ "theme": self.theme }));
    }

    fn apply(&self) {
        self.document.set_attr(
            &Selector::attr("data-theme-switch"),
            "data-active-theme",
            &self.theme,
        );
    }
}

impl Component for ThemeSwitcher {
    fn name(&self) -> &str {
        "theme-switcher"
    }

    fn init(&mut self) -> Result<()> {
        self.apply();
        Ok(())
    }
}

/// Scroll-back affordance. Page-scoped: registered into the controller's
/// own registry.
#[derive(Default)]
pub struct BackToTop {
    visible: bool,
}

impl BackToTop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

impl Component for BackToTop {
    fn name(&self) -> &str {
        "back-to-top"
    }

    fn reinitialize(&mut self) -> Result<()> {
        self.visible = false;
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.visible = false;
        Ok(())
    }
}

/// Per-instance carousel configuration, parsed from
/// [`CAROUSEL_CONFIG_ATTR`]. Unknown fields are ignored; a missing or
/// malformed blob falls back to the defaults wholesale.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    pub slides: Vec<String>,
    pub autoplay: bool,
    pub interval_ms: u64,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            slides: DEFAULT_SLIDES.iter().map(|s| s.to_string()).collect(),
            autoplay: false,
            interval_ms: 6_000,
        }
    }
}

/// One `[data-carousel]` instance, keyed by element id or positional
/// fallback. Multi-instance: the controller registers one shell per match.
pub struct Carousel {
    key: String,
    config: CarouselConfig,
    active_slide: usize,
    visible_slides: usize,
}

impl Carousel {
    /// Build from a matched element. A malformed configuration blob is
    /// isolated to this instance: it logs a warning and falls back to the
    /// default configuration so sibling discovery continues.
    pub fn from_element(key: &str, element: &Element, logger: Option<&Logger>) -> Self {
        let config = match element.attr(CAROUSEL_CONFIG_ATTR) {
            None => CarouselConfig::default(),
            Some(raw) => match serde_json::from_str::<CarouselConfig>(raw) {
                Ok(mut config) => {
                    if config.slides.is_empty() {
                        config.slides = DEFAULT_SLIDES.iter().map(|s| s.to_string()).collect();
                    }
                    config
                }
                Err(err) => {
                    if let Some(logger) = logger {
                        let event = event_with_fields(
                            LogLevel::Warn,
                            LOG_TARGET,
                            "carousel_config_invalid",
                            [
                                json_kv("instance", json!(key)),
                                json_kv("error", json!(err.to_string())),
                            ],
                        );
                        let _ = logger.log_event(event);
                    }
                    CarouselConfig::default()
                }
            },
        };
        Self {
            key: key.to_string(),
            config,
            active_slide: 0,
            visible_slides: 3,
        }
    }

    pub fn config(&self) -> &CarouselConfig {
        &self.config
    }

    pub fn active_slide(&self) -> usize {
        self.active_slide
    }

    pub fn visible_slides(&self) -> usize {
        self.visible_slides
    }

    pub fn advance(&mut self) {
        if !self.config.slides.is_empty() {
            self.active_slide = (self.active_slide + 1) % self.config.slides.len();
        }
    }
}

impl Component for Carousel {
    fn name(&self) -> &str {
        &self.key
    }

    fn init(&mut self) -> Result<()> {
        // A parsed configuration can still be semantically invalid; this is
        // an initialization failure, not a discovery-isolation case.
        if self.config.autoplay && self.config.interval_ms == 0 {
            return Err(ThemeError::ComponentConfig(format!(
                "carousel `{}` enables autoplay with a zero interval",
                self.key
            )));
        }
        Ok(())
    }

    fn reinitialize(&mut self) -> Result<()> {
        self.active_slide = 0;
        Ok(())
    }

    fn on_breakpoint_change(&mut self, change: &BreakpointChange) -> Result<()> {
        self.visible_slides = if change.is_mobile { 1 } else { 3 };
        if self.active_slide >= self.config.slides.len() {
            self.active_slide = 0;
        }
        Ok(())
    }
}

/// Derive the registry key for a carousel element: its id, or a positional
/// fallback when the markup carries none.
pub fn carousel_key(element: &Element, index: usize) -> String {
    match element.id() {
        Some(id) => format!("carousel:{id}"),
        None => format!("carousel:slot{index}"),
    }
}
