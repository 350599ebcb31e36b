//! Global-scope adapter layer.
//!
//! [`GlobalScope`] is a type-erased resource map keyed by [`TypeId`], the
//! explicit stand-in for ambient page globals: each type appears at most
//! once, and installation is idempotent through `get_or_insert_with`.
//! [`LegacyGlobals`] is the backward-compatible facade older page scripts
//! expect (an `emit`/`on`/`off` event surface, the gateway handle, and the
//! debounce/throttle helper constructors), installed into the scope during
//! core init and only there.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::events::{EventPayload, ListenerId, SharedEventBus};
use crate::gateway::Gateway;
use crate::util::{Debouncer, Throttler};

/// Type-erased once-per-type resource map shared across the page.
#[derive(Clone, Default)]
pub struct GlobalScope {
    inner: Arc<RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl GlobalScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_arc<T>(&self, value: Arc<T>) -> Result<(), GlobalScopeError>
    where
        T: Send + Sync + 'static,
    {
        let mut guard = self.inner.write().map_err(|_| GlobalScopeError::Poisoned)?;
        let type_id = TypeId::of::<T>();
        if guard.contains_key(&type_id) {
            return Err(GlobalScopeError::AlreadyExists);
        }
        guard.insert(type_id, Box::new(value));
        Ok(())
    }

    pub fn get<T>(&self) -> Result<Arc<T>, GlobalScopeError>
    where
        T: Send + Sync + 'static,
    {
        let guard = self.inner.read().map_err(|_| GlobalScopeError::Poisoned)?;
        let boxed = guard
            .get(&TypeId::of::<T>())
            .ok_or(GlobalScopeError::Missing)?;
        let arc = boxed
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(GlobalScopeError::TypeMismatch)?;
        Ok(arc)
    }

    pub fn get_or_insert_with<T, F>(&self, make: F) -> Result<Arc<T>, GlobalScopeError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        if let Ok(value) = self.get::<T>() {
            return Ok(value);
        }
        let value = Arc::new(make());
        {
            let mut guard = self.inner.write().map_err(|_| GlobalScopeError::Poisoned)?;
            guard
                .entry(TypeId::of::<T>())
                .or_insert_with(|| Box::new(value.clone()));
        }
        Ok(value)
    }
}

#[derive(Debug, Error)]
pub enum GlobalScopeError {
    #[error("resource already exists")]
    AlreadyExists,
    #[error("resource missing")]
    Missing,
    #[error("resource type mismatch")]
    TypeMismatch,
    #[error("global scope poisoned")]
    Poisoned,
}

/// Backward-compatible surface for external page scripts.
pub struct LegacyGlobals {
    bus: SharedEventBus,
    gateway: Arc<Gateway>,
}

impl LegacyGlobals {
    pub fn new(bus: SharedEventBus, gateway: Arc<Gateway>) -> Self {
        Self { bus, gateway }
    }

    pub fn emit(&self, event: &str, payload: EventPayload) -> usize {
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

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn debouncer<T>(&self, quiet_ms: u64) -> Debouncer<T> {
        Debouncer::new(quiet_ms)
    }

    pub fn throttler(&self, min_interval_ms: u64) -> Throttler {
        Throttler::new(min_interval_ms)
    }
}

/// Install the legacy facade, reusing an existing installation.
pub fn install_legacy_globals(
    scope: &GlobalScope,
    bus: &SharedEventBus,
    gateway: &Arc<Gateway>,
) -> Result<Arc<LegacyGlobals>, GlobalScopeError> {
    scope.get_or_insert_with(|| LegacyGlobals::new(Arc::clone(bus), Arc::clone(gateway)))
}
