//! Per-frame interaction state of an event.
//!
//! The [`Interaction`] component is written by the interaction scan on the
//! simulation thread:
//! - `collision` is rebuilt from scratch every frame.
//! - `reachable` is maintained incrementally: entries are only dropped once
//!   the partner is out of reach.
//! - `just_touching` records partners whose touch handler already fired in
//!   the current contact episode. It is the one piece of state the dispatch
//!   thread writes, so it lives behind a shared [`TouchLedger`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy_ecs::prelude::Component;
use smallvec::SmallVec;

use crate::components::eventobject::EventId;

/// Ordered, duplicate-free list of event ids.
pub type EventList = SmallVec<[EventId; 4]>;

/// Shared "touch already fired" set of one event.
///
/// Cloning shares the underlying set. The lock is only held for the
/// duration of a single list operation, never across a handler call.
#[derive(Debug, Clone, Default)]
pub struct TouchLedger(Arc<Mutex<EventList>>);

impl TouchLedger {
    fn lock(&self) -> MutexGuard<'_, EventList> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.lock().contains(&id)
    }

    /// Returns `true` if `id` was not recorded yet.
    pub fn insert(&self, id: EventId) -> bool {
        let mut list = self.lock();
        if list.contains(&id) {
            false
        } else {
            list.push(id);
            true
        }
    }

    pub fn remove(&self, id: EventId) -> bool {
        let mut list = self.lock();
        match list.iter().position(|e| *e == id) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drop every entry not contained in `keep`.
    pub fn retain_in(&self, keep: &[EventId]) {
        self.lock().retain(|id| keep.contains(id));
    }

    pub fn ids(&self) -> EventList {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[derive(Component, Debug, Default)]
pub struct Interaction {
    /// Events currently overlapping this one.
    pub collision: EventList,
    /// Subset of `collision` whose touch handler already fired.
    pub just_touching: TouchLedger,
    /// Pushable events within this event's outreach.
    pub reachable: EventList,
}

impl Interaction {
    pub fn add_collision(&mut self, id: EventId) {
        if !self.collision.contains(&id) {
            self.collision.push(id);
        }
    }

    /// Returns `true` if `id` was added.
    pub fn add_reachable(&mut self, id: EventId) -> bool {
        if self.reachable.contains(&id) {
            false
        } else {
            self.reachable.push(id);
            true
        }
    }

    pub fn remove_reachable(&mut self, id: EventId) -> bool {
        match self.reachable.iter().position(|e| *e == id) {
            Some(pos) => {
                self.reachable.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove every trace of `id` (used when an event leaves the active set).
    pub fn forget(&mut self, id: EventId) {
        self.collision.retain(|e| *e != id);
        self.reachable.retain(|e| *e != id);
        self.just_touching.remove(id);
    }

    /// Enforce `just_touching ⊆ collision`.
    pub fn prune_touching(&self) {
        self.just_touching.retain_in(&self.collision);
    }

    pub fn clear(&mut self) {
        self.collision.clear();
        self.just_touching.clear();
        self.reachable.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reachable_has_no_duplicates() {
        let mut inter = Interaction::default();
        assert!(inter.add_reachable(EventId(3)));
        assert!(!inter.add_reachable(EventId(3)));
        assert_eq!(inter.reachable.len(), 1);
        assert!(inter.remove_reachable(EventId(3)));
        assert!(!inter.remove_reachable(EventId(3)));
    }

    #[test]
    fn ledger_is_shared_between_clones() {
        let inter = Interaction::default();
        let view = inter.just_touching.clone();
        view.insert(EventId(7));
        assert!(inter.just_touching.contains(EventId(7)));
        assert!(!view.insert(EventId(7)));
    }

    #[test]
    fn prune_keeps_touching_within_collision() {
        let mut inter = Interaction::default();
        inter.add_collision(EventId(1));
        inter.just_touching.insert(EventId(1));
        inter.just_touching.insert(EventId(2));
        inter.prune_touching();
        assert_eq!(inter.just_touching.ids().as_slice(), &[EventId(1)]);
    }

    #[test]
    fn forget_removes_all_traces() {
        let mut inter = Interaction::default();
        inter.add_collision(EventId(1));
        inter.add_reachable(EventId(1));
        inter.just_touching.insert(EventId(1));
        inter.forget(EventId(1));
        assert!(inter.collision.is_empty());
        assert!(inter.reachable.is_empty());
        assert!(inter.just_touching.is_empty());
    }
}
