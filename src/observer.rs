//! Observers (L6): a persistent entity set maintained incrementally by
//! subscribing to a storage's construct/destroy signals, rather than
//! recomputed by scanning on every access.
//!
//! The set tracks exact membership, maintained via
//! [`crate::signal::SignalChannel`] rather than a dirty-bit mask plus a
//! generation counter.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use ahash::RandomState;

use crate::entity::{Entity, Id32};
use crate::signal::SignalKind;
use crate::storage::Storage;

/// An entity set kept in sync with a storage's lifecycle signals.
///
/// Construct the observer once (it subscribes immediately), then read
/// `Observer::entities` whenever a snapshot of "who currently matches" is
/// needed, without re-scanning the storage.
pub struct Observer {
    seen: Rc<RefCell<HashSet<Entity<Id32>, RandomState>>>,
}

impl Observer {
    /// Subscribes to `storage`'s construct and destroy signals, starting
    /// from the storage's current membership.
    pub fn new<T, S: Storage<T>>(storage: &mut S) -> Self {
        let seen: Rc<RefCell<HashSet<Entity<Id32>, RandomState>>> =
            Rc::new(RefCell::new(storage.entities().iter().copied().collect()));

        let on_construct = seen.clone();
        storage.signals().connect(SignalKind::Construct, move |_registry, e| {
            on_construct.borrow_mut().insert(e);
        });

        let on_destroy = seen.clone();
        storage.signals().connect(SignalKind::Destroy, move |_registry, e| {
            on_destroy.borrow_mut().remove(&e);
        });

        Observer { seen }
    }

    /// True iff `e` currently matches the observed storage's membership.
    pub fn contains(&self, e: Entity<Id32>) -> bool {
        self.seen.borrow().contains(&e)
    }

    /// Number of entities currently observed.
    pub fn len(&self) -> usize {
        self.seen.borrow().len()
    }

    /// True iff nothing is currently observed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of every currently observed entity. Order is
    /// unspecified.
    pub fn entities(&self) -> Vec<Entity<Id32>> {
        self.seen.borrow().iter().copied().collect()
    }

    /// Empties the observed set. The observer keeps listening for future
    /// signals; this only discards what has been accumulated so far, for
    /// a client that has just finished processing a batch.
    pub fn clear(&self) {
        self.seen.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::storage::{Component, DenseStorage};

    #[derive(Debug, PartialEq)]
    struct Vel(u32);
    impl Component for Vel {
        type Storage = DenseStorage<Vel>;
    }

    // Observers only hear about mutations routed through a `Registry`: a
    // handler needs `(registry, entity)`, and a bare storage mutated
    // directly has no registry to hand it.
    #[test]
    fn tracks_construct_and_destroy_without_rescanning() {
        let mut r = Registry::new();
        let e1 = r.create();
        r.emplace(e1, Vel(10));

        let observer = Observer::new(r.storage_mut::<Vel>());
        assert!(observer.contains(e1));
        assert_eq!(observer.len(), 1);

        let e2 = r.create();
        r.emplace(e2, Vel(20));
        assert!(observer.contains(e2));
        assert_eq!(observer.len(), 2);

        r.erase::<Vel>(e1);
        assert!(!observer.contains(e1));
        assert_eq!(observer.len(), 1);
    }

    #[test]
    fn clear_discards_the_accumulated_set_without_unsubscribing() {
        let mut r = Registry::new();
        let observer = Observer::new(r.storage_mut::<Vel>());
        let e1 = r.create();
        r.emplace(e1, Vel(10));
        assert_eq!(observer.len(), 1);

        observer.clear();
        assert!(observer.is_empty());

        let e2 = r.create();
        r.emplace(e2, Vel(20));
        assert!(observer.contains(e2));
        assert_eq!(observer.len(), 1);
    }
}
