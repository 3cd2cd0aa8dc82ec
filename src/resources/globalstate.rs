//! Global game state shared with handlers.
//!
//! The [`GlobalState`] resource is a versioned key/value store (scalars,
//! integers, strings, flags). Every mutation bumps a monotonic change
//! counter; the dispatcher compares that counter once per batch and calls
//! `on_state_change` on every handler when it moved.
//!
//! The store is shared between the simulation thread, the dispatch thread
//! and the host, so the resource is a cheap clonable handle around a lock.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bevy_ecs::prelude::Resource;
use rustc_hash::{FxHashMap, FxHashSet};

/// Contents of the global state.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    /// Floating-point values addressed by string keys.
    pub scalars: FxHashMap<String, f32>,
    /// Integer values addressed by string keys.
    pub integers: FxHashMap<String, i32>,
    /// String values addressed by string keys.
    pub strings: FxHashMap<String, String>,
    /// Presence-only boolean flags; a key being present means "true".
    pub flags: FxHashSet<String>,
    change_count: u64,
}

impl StateStore {
    pub fn change_count(&self) -> u64 {
        self.change_count
    }
}

#[derive(Debug, Clone, Default, Resource)]
pub struct GlobalState(Arc<RwLock<StateStore>>);

impl GlobalState {
    fn read(&self) -> RwLockReadGuard<'_, StateStore> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StateStore> {
        let mut store = self.0.write().unwrap_or_else(PoisonError::into_inner);
        store.change_count += 1;
        store
    }

    /// Monotonic counter, incremented by every mutation.
    pub fn change_count(&self) -> u64 {
        self.read().change_count
    }

    /// Run `f` with read access to the whole store.
    pub fn with<R>(&self, f: impl FnOnce(&StateStore) -> R) -> R {
        f(&self.read())
    }

    /// Clone of the whole store, e.g. for saving.
    pub fn snapshot(&self) -> StateStore {
        self.read().clone()
    }

    pub fn set_scalar(&self, key: impl Into<String>, value: f32) {
        self.write().scalars.insert(key.into(), value);
    }
    pub fn get_scalar(&self, key: &str) -> Option<f32> {
        self.read().scalars.get(key).copied()
    }
    pub fn set_integer(&self, key: impl Into<String>, value: i32) {
        self.write().integers.insert(key.into(), value);
    }
    pub fn get_integer(&self, key: &str) -> Option<i32> {
        self.read().integers.get(key).copied()
    }
    pub fn set_string(&self, key: impl Into<String>, value: impl Into<String>) {
        self.write().strings.insert(key.into(), value.into());
    }
    /// Returns an owned copy, the store stays locked only for the lookup.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.read().strings.get(key).cloned()
    }
    pub fn remove_string(&self, key: &str) -> Option<String> {
        self.write().strings.remove(key)
    }
    pub fn set_flag(&self, key: impl Into<String>) {
        self.write().flags.insert(key.into());
    }
    pub fn clear_flag(&self, key: &str) {
        self.write().flags.remove(key);
    }
    pub fn has_flag(&self, key: &str) -> bool {
        self.read().flags.contains(key)
    }
}
