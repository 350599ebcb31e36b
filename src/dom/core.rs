use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use blake3::Hash;

use crate::error::{Result, ThemeError};

use super::wait::{ElementWait, Watcher, pending_slot, resolved_slot};

/// Supported selector forms: `#id`, `.class`, `[attr]`, and a bare tag name.
/// This is the subset the discovery predicates and page modules use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Class(String),
    Attr(String),
    Tag(String),
}

impl Selector {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    pub fn attr(attr: impl Into<String>) -> Self {
        Self::Attr(attr.into())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into().to_ascii_lowercase())
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if let Some(id) = trimmed.strip_prefix('#') {
            if !id.is_empty() {
                return Ok(Self::Id(id.to_string()));
            }
        } else if let Some(class) = trimmed.strip_prefix('.') {
            if !class.is_empty() {
                return Ok(Self::Class(class.to_string()));
            }
        } else if let Some(inner) = trimmed.strip_prefix('[') {
            if let Some(attr) = inner.strip_suffix(']') {
                if !attr.is_empty() {
                    return Ok(Self::Attr(attr.to_string()));
                }
            }
        } else if !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Ok(Self::Tag(trimmed.to_ascii_lowercase()));
        }
        Err(ThemeError::InvalidSelector(raw.to_string()))
    }
}

/// One element of the externally-supplied page markup. Only the properties
/// the runtime consumes are modeled: identity, class list, `data-*`
/// attributes, and text content.
#[derive(Debug, Clone)]
pub struct Element {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: HashMap<String, String>,
    text: String,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: HashMap::new(),
            text: String::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Id(id) => self.id.as_deref() == Some(id.as_str()),
            Selector::Class(class) => self.has_class(class),
            Selector::Attr(attr) => self.attributes.contains_key(attr),
            Selector::Tag(tag) => self.tag == *tag,
        }
    }

    fn content_hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.text.as_bytes());
        let mut attrs: Vec<_> = self.attributes.iter().collect();
        attrs.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in attrs {
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b";");
        }
        hasher.finalize()
    }
}

struct StoredElement {
    element: Element,
    hash: Hash,
}

/// Hook invoked for unhandled script errors / promise rejections reported by
/// the environment. The runtime installs these once and owns them.
pub type ErrorHook = Arc<dyn Fn(&str) + Send + Sync>;

struct DocumentInner {
    body_classes: Vec<String>,
    viewport_width: u32,
    visible: bool,
    elements: Vec<StoredElement>,
    changed: Vec<usize>,
    watchers: Vec<Watcher>,
    error_hook: Option<ErrorHook>,
    rejection_hook: Option<ErrorHook>,
}

impl Default for DocumentInner {
    fn default() -> Self {
        Self {
            body_classes: Vec::new(),
            viewport_width: 1024,
            visible: true,
            elements: Vec::new(),
            changed: Vec::new(),
            watchers: Vec::new(),
            error_hook: None,
            rejection_hook: None,
        }
    }
}

/// The live page state, shared between the embedder (writer) and the runtime
/// (reader/observer). Single-writer-at-a-time by construction; the lock is
/// never held across hook invocation.
#[derive(Default)]
pub struct Document {
    inner: RwLock<DocumentInner>,
}

pub type SharedDocument = Arc<Document>;

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedDocument {
        Arc::new(self)
    }

    pub fn set_body_classes<I, S>(&self, classes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.write();
        inner.body_classes = classes.into_iter().map(Into::into).collect();
    }

    pub fn body_classes(&self) -> Vec<String> {
        self.read().body_classes.clone()
    }

    pub fn viewport_width(&self) -> u32 {
        self.read().viewport_width
    }

    pub fn set_viewport_width(&self, width: u32) {
        self.write().viewport_width = width;
    }

    pub fn is_visible(&self) -> bool {
        self.read().visible
    }

    pub fn set_visible(&self, visible: bool) {
        self.write().visible = visible;
    }

    /// Insert an element, resolving any pending waits it satisfies.
    pub fn insert(&self, element: Element) {
        let mut inner = self.write();
        let index = inner.elements.len();
        let hash = element.content_hash();
        let mut remaining = Vec::with_capacity(inner.watchers.len());
        for watcher in inner.watchers.drain(..) {
            if element.matches(&watcher.selector) {
                watcher.resolve(&element);
            } else {
                remaining.push(watcher);
            }
        }
        inner.watchers = remaining;
        inner.elements.push(StoredElement { element, hash });
        inner.changed.push(index);
    }

    pub fn query(&self, selector: &Selector) -> Option<Element> {
        self.read()
            .elements
            .iter()
            .find(|stored| stored.element.matches(selector))
            .map(|stored| stored.element.clone())
    }

    pub fn query_all(&self, selector: &Selector) -> Vec<Element> {
        self.read()
            .elements
            .iter()
            .filter(|stored| stored.element.matches(selector))
            .map(|stored| stored.element.clone())
            .collect()
    }

    pub fn exists(&self, selector: &Selector) -> bool {
        self.query(selector).is_some()
    }

    /// Replace the text of the first match. Returns `true` only when an
    /// element matched and its content hash actually changed; a same-content
    /// update is suppressed and does not mark the element changed.
    pub fn update_text(&self, selector: &Selector, text: &str) -> bool {
        let mut inner = self.write();
        let Some(index) = inner
            .elements
            .iter()
            .position(|stored| stored.element.matches(selector))
        else {
            return false;
        };
        let stored = &mut inner.elements[index];
        let updated = stored.element.clone().with_text(text);
        let new_hash = updated.content_hash();
        if stored.hash == new_hash {
            return false;
        }
        stored.element = updated;
        stored.hash = new_hash;
        if !inner.changed.contains(&index) {
            inner.changed.push(index);
        }
        true
    }

    /// Set an attribute on the first match, with the same change suppression
    /// as [`Document::update_text`].
    pub fn set_attr(&self, selector: &Selector, name: &str, value: &str) -> bool {
        let mut inner = self.write();
        let Some(index) = inner
            .elements
            .iter()
            .position(|stored| stored.element.matches(selector))
        else {
            return false;
        };
        let stored = &mut inner.elements[index];
        let updated = stored.element.clone().with_attr(name, value);
        let new_hash = updated.content_hash();
        if stored.hash == new_hash {
            return false;
        }
        stored.element = updated;
        stored.hash = new_hash;
        if !inner.changed.contains(&index) {
            inner.changed.push(index);
        }
        true
    }

    /// Drain the elements whose content changed since the last call, in
    /// change order.
    pub fn take_changed(&self) -> Vec<Element> {
        let mut inner = self.write();
        let indices: Vec<usize> = inner.changed.drain(..).collect();
        indices
            .into_iter()
            .filter_map(|index| inner.elements.get(index).map(|s| s.element.clone()))
            .collect()
    }

    /// Register a bounded-deadline wait for `selector`. Already-present
    /// matches resolve immediately without registering a watcher.
    pub fn wait_for(&self, selector: &str, timeout_ms: u64, now_ms: u64) -> Result<ElementWait> {
        let parsed = Selector::parse(selector)?;
        if let Some(element) = self.query(&parsed) {
            return Ok(ElementWait::new(selector.to_string(), resolved_slot(element)));
        }
        let slot = pending_slot();
        self.write().watchers.push(Watcher {
            selector: parsed,
            deadline_ms: now_ms.saturating_add(timeout_ms),
            slot: Arc::clone(&slot),
        });
        Ok(ElementWait::new(selector.to_string(), slot))
    }

    /// Expire watchers whose deadline has passed, cancelling their
    /// subscriptions. Returns the number of waits that timed out.
    pub fn expire_watchers(&self, now_ms: u64) -> usize {
        let mut inner = self.write();
        let mut remaining = Vec::with_capacity(inner.watchers.len());
        let mut expired = 0;
        for watcher in inner.watchers.drain(..) {
            if now_ms >= watcher.deadline_ms {
                watcher.expire();
                expired += 1;
            } else {
                remaining.push(watcher);
            }
        }
        inner.watchers = remaining;
        expired
    }

    pub fn watcher_count(&self) -> usize {
        self.read().watchers.len()
    }

    /// Install the unhandled-error hook. Returns `false` when one is already
    /// present (the existing hook is kept).
    pub fn install_error_hook(&self, hook: ErrorHook) -> bool {
        let mut inner = self.write();
        if inner.error_hook.is_some() {
            return false;
        }
        inner.error_hook = Some(hook);
        true
    }

    /// Install the unhandled-rejection hook. Same semantics as
    /// [`Document::install_error_hook`].
    pub fn install_rejection_hook(&self, hook: ErrorHook) -> bool {
        let mut inner = self.write();
        if inner.rejection_hook.is_some() {
            return false;
        }
        inner.rejection_hook = Some(hook);
        true
    }

    pub fn has_error_hooks(&self) -> bool {
        let inner = self.read();
        inner.error_hook.is_some() && inner.rejection_hook.is_some()
    }

    /// Report an unhandled script error. Returns whether a hook consumed it.
    pub fn report_script_error(&self, message: &str) -> bool {
        let hook = self.read().error_hook.clone();
        match hook {
            Some(hook) => {
                hook(message);
                true
            }
            None => false,
        }
    }

    /// Report an unhandled promise rejection. Returns whether a hook
    /// consumed it.
    pub fn report_unhandled_rejection(&self, message: &str) -> bool {
        let hook = self.read().rejection_hook.clone();
        match hook {
            Some(hook) => {
                hook(message);
                true
            }
            None => false,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, DocumentInner> {
        self.inner.read().expect("document poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, DocumentInner> {
        self.inner.write().expect("document poisoned")
    }
}
