use crate::error::Result;

use super::breakpoint::BreakpointChange;

/// Contract between a registry and the UI units it owns.
///
/// Every lifecycle method beyond `name` is an optional capability: the
/// default implementation is the declined case, so a component opts in by
/// overriding only what it supports and the registry can invoke the full set
/// unconditionally. Errors from any capability are isolated by the caller
/// during batch operations.
pub trait Component: Send {
    fn name(&self) -> &str;

    /// One-time setup after construction, before registration completes.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release whatever the component holds. Invoked exactly once per
    /// generation by the owning registry's cleanup pass.
    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Re-bind to freshly injected content without a full page reload.
    fn reinitialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// React to an actual breakpoint transition.
    fn on_breakpoint_change(&mut self, _change: &BreakpointChange) -> Result<()> {
        Ok(())
    }
}

pub type ComponentHandle = Box<dyn Component>;

/// Insertion-ordered name → handle store.
///
/// Ordering makes teardown deterministic. Re-registering an existing name
/// replaces the handle in place and drops the displaced handle without
/// invoking its cleanup. That matches the observed registry behavior and
/// is covered by tests.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: Vec<(String, ComponentHandle)>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or silently replace. Returns whether a handle was displaced.
    pub fn insert(&mut self, name: impl Into<String>, handle: ComponentHandle) -> bool {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => {
                entry.1 = handle;
                true
            }
            None => {
                self.entries.push((name, handle));
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Component> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, handle)| handle.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ComponentHandle> {
        self.entries
            .iter_mut()
            .find(|(existing, _)| existing == name)
            .map(|(_, handle)| handle)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut ComponentHandle)> {
        self.entries
            .iter_mut()
            .map(|(name, handle)| (name.as_str(), handle))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
