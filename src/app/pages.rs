//! Page-specific setup routines.
//!
//! Exactly one module is selected per lifecycle generation, keyed by
//! [`PageContext`]; `Default` selects none, which is valid. Every module
//! follows two policies uniformly: a missing sub-fixture silently skips its
//! wiring, and a failed gateway call is logged and the dependent update
//! skipped; the page never breaks over a fetch.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::dom::{Selector, SharedDocument};
use crate::error::Result;
use crate::gateway::{Gateway, RequestOptions};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::runtime::PageContext;

const LOG_TARGET: &str = "marquee::app.pages";

/// Setup routine for one page type. `cleanup` is optional, like the
/// component capability set.
pub trait PageModule: Send {
    fn name(&self) -> &str;
    fn setup(&mut self) -> Result<()>;
    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collaborators handed to every page module at construction.
#[derive(Clone)]
pub struct PageDeps {
    pub document: SharedDocument,
    pub gateway: Arc<Gateway>,
    pub logger: Option<Logger>,
}

impl PageDeps {
    /// Log-and-skip fetch: `None` when the call failed or the backend
    /// declined, with the reason logged either way.
    fn fetch(&self, options: RequestOptions) -> Option<Value> {
        let action = options.action().to_string();
        match self.gateway.request(options) {
            Ok(envelope) if envelope.success => Some(envelope.data),
            Ok(_) => {
                self.log(
                    LogLevel::Debug,
                    "request_declined",
                    [json_kv("action", json!(action))],
                );
                None
            }
            Err(err) => {
                self.log(
                    LogLevel::Warn,
                    "request_skipped",
                    [
                        json_kv("action", json!(action)),
                        json_kv("error", json!(err.to_string())),
                    ],
                );
                None
            }
        }
    }

    fn log(
        &self,
        level: LogLevel,
        message: &str,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) {
        if let Some(logger) = self.logger.as_ref() {
            let _ = logger.log_event(event_with_fields(level, LOG_TARGET, message, fields));
        }
    }
}

/// Total dispatch function: every recognized context maps to its module,
/// `Default` to none.
pub fn module_for(context: PageContext, deps: PageDeps) -> Option<Box<dyn PageModule>> {
    match context {
        PageContext::Home => Some(Box::new(HomePage { deps })),
        PageContext::VideoSingle => Some(Box::new(VideoSinglePage { deps })),
        PageContext::Performers => Some(Box::new(PerformersPage { deps })),
        PageContext::Login => Some(Box::new(LoginPage {
            deps,
            form_present: false,
        })),
        PageContext::Register => Some(Box::new(RegisterPage {
            deps,
            form_present: false,
        })),
        PageContext::LikedVideos => Some(Box::new(LikedVideosPage { deps })),
        PageContext::ShortVideos => Some(Box::new(ShortVideosPage { deps })),
        PageContext::Archive => Some(Box::new(ArchivePage { deps })),
        PageContext::Search => Some(Box::new(SearchPage { deps })),
        PageContext::Default => None,
    }
}

pub struct HomePage {
    deps: PageDeps,
}

impl PageModule for HomePage {
    fn name(&self) -> &str {
        "page:home"
    }

    fn setup(&mut self) -> Result<()> {
        let grid = Selector::class("video-grid");
        if !self.deps.document.exists(&grid) {
            return Ok(());
        }
        if let Some(data) = self
            .deps
            .fetch(RequestOptions::new("load_featured_videos").field("count", 12))
        {
            let count = data["videos"].as_array().map(Vec::len).unwrap_or(0);
            self.deps
                .document
                .update_text(&grid, &format!("{count} featured videos"));
        }
        Ok(())
    }
}

pub struct VideoSinglePage {
    deps: PageDeps,
}

impl PageModule for VideoSinglePage {
    fn name(&self) -> &str {
        "page:video-single"
    }

    fn setup(&mut self) -> Result<()> {
        let video_id = self
            .deps
            .document
            .query(&Selector::class("video-player"))
            .and_then(|player| player.attr("data-video-id").map(str::to_string));

        let Some(video_id) = video_id else {
            return Ok(());
        };

        // Fire-and-forget; a failed view count never disturbs the page.
        let _ = self
            .deps
            .fetch(RequestOptions::new("track_view").field("video_id", video_id.clone()));

        let related = Selector::id("related-videos");
        if self.deps.document.exists(&related) {
            if let Some(data) = self
                .deps
                .fetch(RequestOptions::new("load_related_videos").field("video_id", video_id))
            {
                let count = data["videos"].as_array().map(Vec::len).unwrap_or(0);
                self.deps
                    .document
                    .update_text(&related, &format!("{count} related videos"));
            }
        }
        Ok(())
    }
}

pub struct PerformersPage {
    deps: PageDeps,
}

impl PageModule for PerformersPage {
    fn name(&self) -> &str {
        "page:performers"
    }

    fn setup(&mut self) -> Result<()> {
        let list = Selector::class("performer-list");
        if !self.deps.document.exists(&list) {
            return Ok(());
        }
        if let Some(data) = self.deps.fetch(RequestOptions::new("load_performers")) {
            let count = data["performers"].as_array().map(Vec::len).unwrap_or(0);
            self.deps
                .document
                .update_text(&list, &format!("{count} performers"));
        }
        Ok(())
    }
}

pub struct LoginPage {
    deps: PageDeps,
    form_present: bool,
}

impl LoginPage {
    /// Submit credentials through the gateway. Auth and transport failures
    /// surface as inline form error text; only a successful envelope
    /// returns `true`.
    pub fn submit(&self, username: &str, password: &str) -> bool {
        if !self.form_present {
            return false;
        }
        if username.trim().is_empty() || password.is_empty() {
            self.show_error("Both fields are required.");
            return false;
        }
        match self.deps.gateway.request(
            RequestOptions::new("user_login")
                .field("username", username)
                .field("password", password),
        ) {
            Ok(envelope) if envelope.success => {
                self.deps
                    .document
                    .update_text(&Selector::class("form-error"), "");
                true
            }
            Ok(envelope) => {
                let message = envelope.data["message"]
                    .as_str()
                    .unwrap_or("Login failed.")
                    .to_string();
                self.show_error(&message);
                false
            }
            Err(err) => {
                self.deps.log(
                    LogLevel::Warn,
                    "login_request_failed",
                    [json_kv("error", json!(err.to_string()))],
                );
                self.show_error("Could not reach the server. Try again.");
                false
            }
        }
    }

    fn show_error(&self, text: &str) {
        self.deps
            .document
            .update_text(&Selector::class("form-error"), text);
    }
}

impl PageModule for LoginPage {
    fn name(&self) -> &str {
        "page:login"
    }

    fn setup(&mut self) -> Result<()> {
        self.form_present = self.deps.document.exists(&Selector::id("login-form"));
        if self.form_present {
            self.deps
                .log(LogLevel::Debug, "login_form_wired", std::iter::empty());
        }
        Ok(())
    }
}

pub struct RegisterPage {
    deps: PageDeps,
    form_present: bool,
}

impl RegisterPage {
    pub fn submit(&self, username: &str, email: &str, password: &str) -> bool {
        if !self.form_present {
            return false;
        }
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            self.show_error("All fields are required.");
            return false;
        }
        match self.deps.gateway.request(
            RequestOptions::new("user_register")
                .field("username", username)
                .field("email", email)
                .field("password", password),
        ) {
            Ok(envelope) if envelope.success => {
                self.deps
                    .document
                    .update_text(&Selector::class("form-error"), "");
                true
            }
            Ok(envelope) => {
                let message = envelope.data["message"]
                    .as_str()
                    .unwrap_or("Registration failed.")
                    .to_string();
                self.show_error(&message);
                false
            }
            Err(err) => {
                self.deps.log(
                    LogLevel::Warn,
                    "register_request_failed",
                    [json_kv("error", json!(err.to_string()))],
                );
                self.show_error("Could not reach the server. Try again.");
                false
            }
        }
    }

    fn show_error(&self, text: &str) {
        self.deps
            .document
            .update_text(&Selector::class("form-error"), text);
    }
}

impl PageModule for RegisterPage {
    fn name(&self) -> &str {
        "page:register"
    }

    fn setup(&mut self) -> Result<()> {
        self.form_present = self.deps.document.exists(&Selector::id("register-form"));
        Ok(())
    }
}

pub struct LikedVideosPage {
    deps: PageDeps,
}

impl PageModule for LikedVideosPage {
    fn name(&self) -> &str {
        "page:liked-videos"
    }

    fn setup(&mut self) -> Result<()> {
        let grid = Selector::class("liked-grid");
        if !self.deps.document.exists(&grid) {
            return Ok(());
        }
        if let Some(data) = self.deps.fetch(RequestOptions::new("load_liked_videos")) {
            let text = match data["videos"].as_array().map(Vec::len).unwrap_or(0) {
                0 => "You have not liked any videos yet.".to_string(),
                count => format!("{count} liked videos"),
            };
            self.deps.document.update_text(&grid, &text);
        }
        Ok(())
    }
}

pub struct ShortVideosPage {
    deps: PageDeps,
}

impl PageModule for ShortVideosPage {
    fn name(&self) -> &str {
        "page:short-videos"
    }

    fn setup(&mut self) -> Result<()> {
        let feed = Selector::class("shorts-feed");
        if !self.deps.document.exists(&feed) {
            return Ok(());
        }
        if let Some(data) = self.deps.fetch(RequestOptions::new("load_short_videos")) {
            let count = data["videos"].as_array().map(Vec::len).unwrap_or(0);
            self.deps
                .document
                .update_text(&feed, &format!("{count} shorts"));
        }
        Ok(())
    }
}

pub struct ArchivePage {
    deps: PageDeps,
}

impl PageModule for ArchivePage {
    fn name(&self) -> &str {
        "page:archive"
    }

    fn setup(&mut self) -> Result<()> {
        let grid = Selector::class("archive-grid");
        let Some(element) = self.deps.document.query(&grid) else {
            return Ok(());
        };
        let page: u64 = element
            .attr("data-page")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(1);
        if let Some(data) = self
            .deps
            .fetch(RequestOptions::new("load_archive_page").field("page", page))
        {
            let count = data["videos"].as_array().map(Vec::len).unwrap_or(0);
            self.deps
                .document
                .update_text(&grid, &format!("{count} videos on page {page}"));
        }
        Ok(())
    }
}

pub struct SearchPage {
    deps: PageDeps,
}

impl PageModule for SearchPage {
    fn name(&self) -> &str {
        "page:search"
    }

    fn setup(&mut self) -> Result<()> {
        let results = Selector::class("search-results");
        let Some(element) = self.deps.document.query(&results) else {
            return Ok(());
        };
        let query = element.attr("data-query").unwrap_or("").to_string();
        if query.is_empty() {
            return Ok(());
        }
        if let Some(data) = self
            .deps
            .fetch(RequestOptions::new("load_search_results").field("query", query.clone()))
        {
            let count = data["videos"].as_array().map(Vec::len).unwrap_or(0);
            self.deps
                .document
                .update_text(&results, &format!("{count} results for \"{query}\""));
        }
        Ok(())
    }
}
