//! Boot a home page fixture against a canned backend and replay a short
//! environment script: resize across two breakpoints, a dynamic content
//! reload, then unload.
//!
//! Run with `cargo run --example scripted_boot`.

use serde_json::json;

use marquee::{
    App, CAROUSEL_CONFIG_ATTR, ConsoleSink, Document, Element, EnvironmentEvent, Logger,
    StaticTransport, ThemeConfig,
};

fn main() -> marquee::Result<()> {
    let bootstrap = json!({
        "gateway_url": "https://demo.test/gateway",
        "security_token": "demo-nonce",
        "debug_enabled": true,
        "version": "0.2.0",
    });
    let config = ThemeConfig::from_bootstrap(Some(&bootstrap))?;

    let document = Document::new();
    document.set_body_classes(["home"]);
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
            .with_attr(CAROUSEL_CONFIG_ATTR, r#"{"slides":["latest","trending"]}"#),
    );
    let document = document.shared();

    let transport = StaticTransport::ok(json!({ "videos": [{}, {}, {}, {}] }));
    let mut app = App::new(config, document, transport);
    app.set_logger(Logger::new(ConsoleSink));

    app.init()?;
    println!("page: {}", app.core().state().current_page.as_str());
    println!("global components: {:?}", app.core().component_names());
    println!("page components:   {:?}", app.component_names());
    println!("page modules:      {:?}", app.page_module_names());

    let script = vec![
        EnvironmentEvent::Resize {
            width: 1_300,
            at_ms: 1_000,
        },
        EnvironmentEvent::Tick { at_ms: 1_100 },
        EnvironmentEvent::Resize {
            width: 600,
            at_ms: 2_000,
        },
        EnvironmentEvent::Tick { at_ms: 2_100 },
        EnvironmentEvent::ContentLoaded { at_ms: 3_000 },
        EnvironmentEvent::BeforeUnload { at_ms: 4_000 },
    ];
    app.run_scripted(script)?;

    println!(
        "after unload: initialized = {}",
        app.is_initialized()
    );
    Ok(())
}
