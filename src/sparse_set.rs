//! Paged sparse sets (L1): the bidirectional index <-> dense-position
//! mapping shared by every component storage.
//!
//! A [`SparseSet`] maintains a set of live [`Entity`] values with O(1)
//! insert, remove, `contains`, and position lookup. The sparse side is a
//! paged array (pages allocated lazily, never freed individually); the
//! dense side is a contiguous `Vec<Entity<C>>`. Each sparse slot reuses the
//! packed-identifier representation: its index bits hold the dense
//! *position*, its version bits are kept in sync with the version of the
//! entity currently occupying that position; an unallocated or freed slot
//! holds the tombstone encoding.

use log::trace;

use crate::entity::{construct, to_entity, to_version, Entity, Id32, IdConfig};

/// Default page size: 4096 slots.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Deletion policy for a sparse set, selected per component type.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DeletePolicy {
    /// Removing an entity swaps it with the last dense element, then
    /// shrinks the dense array. No tombstones ever appear in `dense`.
    /// Default; does not guarantee pointer stability for surviving
    /// elements.
    SwapAndPop,
    /// Removing an entity tombstones its slot and threads it onto a free
    /// list; the dense array never shrinks on erase. Preserves pointer
    /// stability for surviving elements; `compact()` is the only operation
    /// that invalidates it.
    InPlace,
}

type Page<C, const PAGE: usize> = Box<[Entity<C>; PAGE]>;

/// The sparse-set core shared by every component storage.
///
/// Generic over the entity id width `C` (default 32-bit) and the sparse
/// page size `PAGE` (default [`DEFAULT_PAGE_SIZE`]); a component type can
/// override `PAGE` for dense or sparse component distributions.
pub struct SparseSet<C: IdConfig = Id32, const PAGE: usize = DEFAULT_PAGE_SIZE> {
    sparse: Vec<Option<Page<C, PAGE>>>,
    dense: Vec<Entity<C>>,
    policy: DeletePolicy,
    free_head: Option<u32>,
}

impl<C: IdConfig, const PAGE: usize> SparseSet<C, PAGE> {
    /// Creates an empty sparse set using the given deletion policy.
    pub fn new(policy: DeletePolicy) -> Self {
        SparseSet {
            sparse: Vec::new(),
            dense: Vec::new(),
            policy,
            free_head: None,
        }
    }

    /// The deletion policy this set was created with.
    pub fn policy(&self) -> DeletePolicy {
        self.policy
    }

    #[inline]
    fn page_offset(index: u32) -> (usize, usize) {
        ((index as usize) / PAGE, (index as usize) % PAGE)
    }

    fn sparse_slot(&self, index: u32) -> Option<Entity<C>> {
        let (page, offset) = Self::page_offset(index);
        self.sparse.get(page)?.as_deref().map(|p| p[offset])
    }

    fn ensure_page(&mut self, page: usize) -> &mut Page<C, PAGE> {
        if self.sparse.len() <= page {
            self.sparse.resize_with(page + 1, || None);
        }
        self.sparse[page].get_or_insert_with(|| Box::new([Entity::tombstone(); PAGE]))
    }

    /// O(1): true iff a live slot is allocated for `e`'s index and its
    /// stored version matches `e`'s version.
    #[inline]
    pub fn contains(&self, e: Entity<C>) -> bool {
        match self.sparse_slot(e.index()) {
            Some(slot) if !slot.is_tombstone() => slot.version() == e.version(),
            _ => false,
        }
    }

    /// O(1): the dense position of `e`.
    ///
    /// # Panics
    /// Panics if `!self.contains(e)`.
    #[inline]
    pub fn index(&self, e: Entity<C>) -> usize {
        debug_assert!(self.contains(e), "index() precondition: contains(e)");
        to_entity::<C>(self.sparse_slot(e.index()).unwrap().raw()) as usize
    }

    /// O(1) amortized: appends `e` to the dense array, allocating its
    /// sparse page on demand.
    ///
    /// Under [`DeletePolicy::InPlace`], reuses a freed slot from the free
    /// list instead of growing `dense` when one is available.
    ///
    /// # Panics
    /// Panics if `self.contains(e)` (precondition violation).
    pub fn push(&mut self, e: Entity<C>) {
        debug_assert!(!self.contains(e), "push() precondition: !contains(e)");
        let position = match (self.policy, self.free_head) {
            (DeletePolicy::InPlace, Some(head)) => {
                let link = to_entity::<C>(self.dense[head as usize].raw());
                self.free_head = if link == C::INDEX_MASK { None } else { Some(link as u32) };
                self.dense[head as usize] = e;
                head
            }
            _ => {
                self.dense.push(e);
                (self.dense.len() - 1) as u32
            }
        };

        let (page, offset) = Self::page_offset(e.index());
        self.ensure_page(page)[offset] = construct::<C>(position as u64, e.version() as u64);
    }

    /// O(1): swap-and-pop or in-place tombstone erase, per policy.
    ///
    /// # Panics
    /// Panics if `!self.contains(e)`.
    pub fn erase(&mut self, e: Entity<C>) {
        debug_assert!(self.contains(e), "erase() precondition: contains(e)");
        let position = self.index(e);

        match self.policy {
            DeletePolicy::SwapAndPop => {
                let last = self.dense.len() - 1;
                if position != last {
                    let back = self.dense[last];
                    self.dense[position] = back;
                    let (page, offset) = Self::page_offset(back.index());
                    self.ensure_page(page)[offset] = construct::<C>(position as u64, back.version() as u64);
                }
                self.dense.pop();
            }
            DeletePolicy::InPlace => {
                let link = self.free_head.map(|h| h as u64).unwrap_or(C::INDEX_MASK);
                self.dense[position] = construct::<C>(link, C::VERSION_MASK >> C::VERSION_SHIFT);
                self.free_head = Some(position as u32);
            }
        }

        let (page, offset) = Self::page_offset(e.index());
        self.ensure_page(page)[offset] = Entity::tombstone();
    }

    /// Idempotent `erase`: returns whether `e` was actually removed.
    pub fn remove(&mut self, e: Entity<C>) -> bool {
        if self.contains(e) {
            self.erase(e);
            true
        } else {
            false
        }
    }

    /// O(n): drops every entry and clears the sparse pages.
    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.free_head = None;
    }

    /// Number of live entities (for [`DeletePolicy::InPlace`], tombstoned
    /// slots are excluded even though `dense.len()` itself does not shrink
    /// on erase).
    pub fn len(&self) -> usize {
        match self.policy {
            DeletePolicy::SwapAndPop => self.dense.len(),
            DeletePolicy::InPlace => self.dense.iter().filter(|d| !d.is_tombstone()).count(),
        }
    }

    /// True iff there are no live entities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw dense slice, in dense order. Under [`DeletePolicy::InPlace`]
    /// this may contain tombstoned slots; use [`SparseSet::iter`] to skip
    /// them.
    pub fn dense(&self) -> &[Entity<C>] {
        &self.dense
    }

    /// Iterates live entities in dense order, skipping tombstones.
    pub fn iter(&self) -> impl Iterator<Item = Entity<C>> + '_ {
        self.dense.iter().copied().filter(|e| !e.is_tombstone())
    }

    /// Coalesces tombstones left by [`DeletePolicy::InPlace`] erases into a
    /// single contiguous prefix, rewriting `dense` and fixing up `sparse`
    /// links. This is the only operation that invalidates pointer
    /// stability under the in-place policy; callers that also carry a
    /// payload array must mirror this compaction there (see
    /// `storage::stable`).
    ///
    /// Returns the permutation applied: `(old_position, new_position)`
    /// pairs for every element that moved, in the order the moves must be
    /// replayed to keep a parallel payload array in sync.
    pub fn compact(&mut self) -> Vec<(usize, usize)> {
        let mut moves = Vec::new();
        let mut write = 0usize;
        for read in 0..self.dense.len() {
            let e = self.dense[read];
            if e.is_tombstone() {
                continue;
            }
            if read != write {
                self.dense[write] = e;
                moves.push((read, write));
                let (page, offset) = Self::page_offset(e.index());
                self.ensure_page(page)[offset] = construct::<C>(write as u64, e.version() as u64);
            }
            write += 1;
        }
        self.dense.truncate(write);
        self.free_head = None;
        trace!("compact: coalesced {} tombstone(s)", moves.len());
        moves
    }

    /// Sorts the dense range with `cmp`, rebuilding sparse links
    /// afterward. Only sound under [`DeletePolicy::SwapAndPop`], since
    /// in-place tombstones carry free-list state in their position field
    /// that sorting would scramble.
    pub fn sort_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&Entity<C>, &Entity<C>) -> std::cmp::Ordering,
    {
        debug_assert!(matches!(self.policy, DeletePolicy::SwapAndPop));
        self.dense.sort_by(&mut cmp);
        for (position, e) in self.dense.iter().enumerate() {
            let (page, offset) = Self::page_offset(e.index());
            self.ensure_page(page)[offset] = construct::<C>(position as u64, e.version() as u64);
        }
    }

    /// Reorders this set's dense range so that, for every entity present in
    /// both sets, its relative order here matches its order in `model`.
    /// Entities present only in `self` keep their relative order and are
    /// moved after the ones shared with `model`. Used to pre-align a view's
    /// secondary storages with the driver for faster iteration.
    pub fn sort_as(&mut self, model: &SparseSet<C, PAGE>) {
        debug_assert!(matches!(self.policy, DeletePolicy::SwapAndPop));
        let rank = |e: &Entity<C>| -> usize {
            if model.contains(*e) {
                model.index(*e)
            } else {
                usize::MAX
            }
        };
        self.sort_by(|a, b| rank(a).cmp(&rank(b)));
    }
}
