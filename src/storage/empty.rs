//! Storage specialization for zero-sized (marker/tag) component types:
//! membership is the only state, so there is no payload array at all.

use crate::entity::{Entity, Id32};
use crate::signal::SignalChannel;
use crate::sparse_set::{DeletePolicy, SparseSet};
use crate::storage::Storage;

/// Membership-only storage for a zero-sized component type `T`.
///
/// `T` must be constructible from nothing meaningful; `get`/`get_mut`
/// return a reference to a single shared/owned dummy value since every
/// instance is indistinguishable.
pub struct EmptyStorage<T, const PAGE: usize = { crate::sparse_set::DEFAULT_PAGE_SIZE }> {
    set: SparseSet<Id32, PAGE>,
    signals: SignalChannel<Entity<Id32>>,
    dummy: T,
}

impl<T: Default, const PAGE: usize> Default for EmptyStorage<T, PAGE> {
    fn default() -> Self {
        EmptyStorage {
            set: SparseSet::new(DeletePolicy::SwapAndPop),
            signals: SignalChannel::default(),
            dummy: T::default(),
        }
    }
}

impl<T: Default, const PAGE: usize> Storage<T> for EmptyStorage<T, PAGE> {
    const PAGE_SIZE: usize = PAGE;

    fn contains(&self, e: Entity<Id32>) -> bool {
        self.set.contains(e)
    }

    fn emplace(&mut self, e: Entity<Id32>, _value: T) {
        debug_assert!(!self.set.contains(e), "emplace() precondition: !contains(e)");
        self.set.push(e);
    }

    fn insert(&mut self, e: Entity<Id32>, value: T) {
        if !self.set.contains(e) {
            self.emplace(e, value);
        }
    }

    fn get(&self, e: Entity<Id32>) -> &T {
        debug_assert!(self.set.contains(e));
        &self.dummy
    }

    fn get_mut(&mut self, e: Entity<Id32>) -> &mut T {
        debug_assert!(self.set.contains(e));
        &mut self.dummy
    }

    fn try_get(&self, e: Entity<Id32>) -> Option<&T> {
        self.set.contains(e).then(|| &self.dummy)
    }

    fn try_get_mut(&mut self, e: Entity<Id32>) -> Option<&mut T> {
        if self.set.contains(e) {
            Some(&mut self.dummy)
        } else {
            None
        }
    }

    fn erase(&mut self, e: Entity<Id32>) -> T {
        debug_assert!(self.set.contains(e), "erase() precondition: contains(e)");
        self.set.erase(e);
        T::default()
    }

    fn remove(&mut self, e: Entity<Id32>) -> Option<T> {
        self.set.contains(e).then(|| self.erase(e))
    }

    fn patch<F: FnOnce(&mut T)>(&mut self, e: Entity<Id32>, f: F) {
        debug_assert!(self.set.contains(e));
        f(&mut self.dummy);
    }

    fn len(&self) -> usize {
        self.set.len()
    }

    fn clear(&mut self) {
        self.set.clear();
    }

    fn entities(&self) -> &[Entity<Id32>] {
        self.set.dense()
    }

    fn signals(&mut self) -> &mut SignalChannel<Entity<Id32>> {
        &mut self.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::construct;

    #[test]
    fn tracks_membership_without_payload() {
        let mut s: EmptyStorage<()> = EmptyStorage::default();
        let e = construct::<Id32>(1, 0);
        s.emplace(e, ());
        assert!(s.contains(e));
        s.erase(e);
        assert!(!s.contains(e));
    }
}
