//! Swap-and-pop component storage: the default policy. No pointer
//! stability; O(1) everything, and iteration never walks past a tombstone
//! because none are ever created.
//!
//! A dense payload `Vec<T>` is kept parallel to the sparse set's dense
//! entity array, rather than indexed through a bitset.

use crate::entity::{Entity, Id32};
use crate::signal::SignalChannel;
use crate::sparse_set::{DeletePolicy, SparseSet};
use crate::storage::Storage;

/// Swap-and-pop storage for component type `T`, with a sparse page size of
/// `PAGE` (default [`crate::sparse_set::DEFAULT_PAGE_SIZE`]).
pub struct DenseStorage<T, const PAGE: usize = { crate::sparse_set::DEFAULT_PAGE_SIZE }> {
    set: SparseSet<Id32, PAGE>,
    payload: Vec<T>,
    signals: SignalChannel<Entity<Id32>>,
}

impl<T, const PAGE: usize> Default for DenseStorage<T, PAGE> {
    fn default() -> Self {
        DenseStorage {
            set: SparseSet::new(DeletePolicy::SwapAndPop),
            payload: Vec::new(),
            signals: SignalChannel::default(),
        }
    }
}

impl<T, const PAGE: usize> Storage<T> for DenseStorage<T, PAGE> {
    const PAGE_SIZE: usize = PAGE;

    fn contains(&self, e: Entity<Id32>) -> bool {
        self.set.contains(e)
    }

    fn emplace(&mut self, e: Entity<Id32>, value: T) {
        debug_assert!(!self.set.contains(e), "emplace() precondition: !contains(e)");
        self.set.push(e);
        self.payload.push(value);
    }

    fn insert(&mut self, e: Entity<Id32>, value: T) {
        if self.set.contains(e) {
            let slot = self.set.index(e);
            self.payload[slot] = value;
        } else {
            self.emplace(e, value);
        }
    }

    fn get(&self, e: Entity<Id32>) -> &T {
        &self.payload[self.set.index(e)]
    }

    fn get_mut(&mut self, e: Entity<Id32>) -> &mut T {
        let i = self.set.index(e);
        &mut self.payload[i]
    }

    fn try_get(&self, e: Entity<Id32>) -> Option<&T> {
        self.set.contains(e).then(|| &self.payload[self.set.index(e)])
    }

    fn try_get_mut(&mut self, e: Entity<Id32>) -> Option<&mut T> {
        if self.set.contains(e) {
            let i = self.set.index(e);
            Some(&mut self.payload[i])
        } else {
            None
        }
    }

    fn erase(&mut self, e: Entity<Id32>) -> T {
        debug_assert!(self.set.contains(e), "erase() precondition: contains(e)");
        let slot = self.set.index(e);
        self.set.erase(e);
        self.payload.swap_remove(slot)
    }

    fn remove(&mut self, e: Entity<Id32>) -> Option<T> {
        self.set.contains(e).then(|| self.erase(e))
    }

    fn patch<F: FnOnce(&mut T)>(&mut self, e: Entity<Id32>, f: F) {
        let i = self.set.index(e);
        f(&mut self.payload[i]);
    }

    fn len(&self) -> usize {
        self.set.len()
    }

    fn clear(&mut self) {
        self.set.clear();
        self.payload.clear();
    }

    fn entities(&self) -> &[Entity<Id32>] {
        self.set.dense()
    }

    fn signals(&mut self) -> &mut SignalChannel<Entity<Id32>> {
        &mut self.signals
    }
}

impl<T, const PAGE: usize> DenseStorage<T, PAGE> {
    /// Reorders the dense arrays (entities and payload together) to match
    /// `model`'s order, for the entities both storages share. See
    /// `SparseSet::sort_as`.
    pub fn sort_as(&mut self, model: &SparseSet<Id32, PAGE>) {
        let old_order: Vec<Entity<Id32>> = self.set.dense().to_vec();
        let rank = |e: Entity<Id32>| -> usize {
            if model.contains(e) {
                model.index(e)
            } else {
                usize::MAX
            }
        };
        self.set.sort_by(|a, b| rank(*a).cmp(&rank(*b)));

        let mut payload_by_entity: ahash::AHashMap<u64, T> = ahash::AHashMap::with_capacity(old_order.len());
        for (e, value) in old_order.into_iter().zip(std::mem::take(&mut self.payload)) {
            payload_by_entity.insert(e.raw(), value);
        }
        self.payload = self
            .set
            .dense()
            .iter()
            .map(|e| payload_by_entity.remove(&e.raw()).unwrap())
            .collect();
    }
}
