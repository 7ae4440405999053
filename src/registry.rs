//! The registry (L4): entity lifecycle plus the type-id-keyed map of
//! per-component storages.
//!
//! Entity recycling threads its free list directly through the `entities`
//! vector itself: a slot's own index field doubles as the link to the
//! next free slot when that slot isn't holding a live entity.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use ahash::RandomState;
use log::trace;

use crate::entity::{construct, next, Entity, Id32, IdConfig};
use crate::error::{Error, StorageMismatch, WrongGeneration};
use crate::signal::{SignalChannel, SignalKind};
use crate::storage::{Component, Storage};

/// Type-erased access to a concrete `Storage<T>`, used by the registry's
/// storage map and by [`crate::view::View`] to probe storages whose
/// component type isn't statically known at the call site.
pub trait AnyStorage: Any {
    /// See [`Storage::contains`].
    fn contains_any(&self, e: Entity<Id32>) -> bool;
    /// See [`Storage::remove`]; returns whether anything was removed.
    fn remove_any(&mut self, e: Entity<Id32>) -> bool;
    /// See [`Storage::clear`].
    fn clear_any(&mut self);
    /// See [`Storage::len`].
    fn len_any(&self) -> usize;
    /// See [`Storage::entities`].
    fn entities_any(&self) -> &[Entity<Id32>];
    /// Upcast to `&dyn Any` for downcasting to the concrete storage type.
    fn as_any(&self) -> &dyn Any;
    /// Upcast to `&mut dyn Any` for downcasting to the concrete storage
    /// type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// The storage's signal channel, type-erased. Every concrete storage's
    /// [`Storage::signals`] carries the same payload type (`Entity<Id32>`),
    /// so this doesn't need a downcast the way the other accessors do.
    fn signals_any(&mut self) -> &mut SignalChannel<Entity<Id32>>;
}

impl<T: 'static, S: Storage<T> + 'static> AnyStorage for S {
    fn contains_any(&self, e: Entity<Id32>) -> bool {
        self.contains(e)
    }
    fn remove_any(&mut self, e: Entity<Id32>) -> bool {
        self.remove(e).is_some()
    }
    fn clear_any(&mut self) {
        self.clear()
    }
    fn len_any(&self) -> usize {
        self.len()
    }
    fn entities_any(&self) -> &[Entity<Id32>] {
        self.entities()
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn signals_any(&mut self) -> &mut SignalChannel<Entity<Id32>> {
        self.signals()
    }
}

/// The ECS registry: owns the entity pool and every component storage
/// registered against it.
///
/// A registry is not `Send`/`Sync`: mutation of any one registry is
/// single-writer, single-threaded.
pub struct Registry {
    entities: Vec<Entity<Id32>>,
    free_head: Option<u32>,
    sequence: HashMap<TypeId, usize, RandomState>,
    storages: Vec<Box<dyn AnyStorage>>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            entities: Vec::new(),
            free_head: None,
            sequence: HashMap::with_hasher(RandomState::new()),
            storages: Vec::new(),
        }
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new entity, recycling a destroyed index (with a bumped
    /// version) if one is available, else allocating a fresh index.
    pub fn create(&mut self) -> Entity<Id32> {
        let entity = match self.free_head {
            Some(idx) => {
                let slot = self.entities[idx as usize];
                let link = slot.index();
                self.free_head = if link as u64 == Id32::INDEX_MASK { None } else { Some(link) };
                let revived = construct::<Id32>(idx as u64, slot.version() as u64);
                self.entities[idx as usize] = revived;
                revived
            }
            None => {
                let idx = self.entities.len() as u64;
                let fresh = construct::<Id32>(idx, 0);
                self.entities.push(fresh);
                fresh
            }
        };
        trace!("create: {:?}", entity);
        entity
    }

    /// "Hint" creation: tries to produce `hint` itself. If `hint`'s index
    /// is free (either never allocated or currently on the free list),
    /// allocates it at exactly that index and version; otherwise falls
    /// back to [`Registry::create`] and returns a fresh id different from
    /// `hint`.
    pub fn create_at(&mut self, hint: Entity<Id32>) -> Entity<Id32> {
        let idx = hint.index() as usize;
        if idx >= self.entities.len() {
            // grow the index space, threading every padding slot (everything
            // strictly before `idx`) onto the free list.
            while self.entities.len() < idx {
                let i = self.entities.len() as u32;
                let link_sentinel = self.free_head.map(|h| h as u64).unwrap_or(Id32::INDEX_MASK);
                self.entities.push(construct::<Id32>(link_sentinel, 0));
                self.free_head = Some(i);
            }
            self.entities.push(hint);
            trace!("create_at: honored hint {:?}", hint);
            return hint;
        }
        if self.index_alive(idx) {
            return self.create();
        }
        // idx is on the free list: try to claim it directly.
        if self.unlink_free(idx as u32) {
            self.entities[idx] = hint;
            trace!("create_at: honored hint {:?}", hint);
            hint
        } else {
            self.create()
        }
    }

    fn index_alive(&self, idx: usize) -> bool {
        idx < self.entities.len() && self.entities[idx].index() as usize == idx
    }

    fn unlink_free(&mut self, target: u32) -> bool {
        let mut cursor = self.free_head;
        let mut prev: Option<u32> = None;
        while let Some(idx) = cursor {
            let next_link = self.entities[idx as usize].index();
            let next_free = if next_link as u64 == Id32::INDEX_MASK { None } else { Some(next_link) };
            if idx == target {
                match prev {
                    Some(p) => {
                        let prev_version = self.entities[p as usize].version();
                        let link_sentinel = next_free.map(|h| h as u64).unwrap_or(Id32::INDEX_MASK);
                        self.entities[p as usize] = construct::<Id32>(link_sentinel, prev_version as u64);
                    }
                    None => self.free_head = next_free,
                }
                return true;
            }
            prev = Some(idx);
            cursor = next_free;
        }
        false
    }

    /// True iff `e`'s index is in range and its version matches the
    /// currently live entity at that index.
    pub fn valid(&self, e: Entity<Id32>) -> bool {
        let idx = e.index() as usize;
        idx < self.entities.len() && self.entities[idx] == e
    }

    /// Destroys `e`: removes it from every storage that contains it
    /// (firing each storage's `on_destroy` signal), then recycles its
    /// index with `next(e)`'s version.
    ///
    /// # Panics
    /// Panics if `!self.valid(e)`. See [`Registry::checked_destroy`] for a
    /// non-panicking variant.
    pub fn destroy(&mut self, e: Entity<Id32>) {
        self.destroy_with_version(e, next::<Id32>(e).version());
    }

    /// Same as [`Registry::destroy`], but forces the recycled version
    /// instead of deriving it from `e` via `next`.
    ///
    /// # Panics
    /// Panics if `!self.valid(e)`.
    pub fn destroy_with_version(&mut self, e: Entity<Id32>, version: u32) {
        debug_assert!(self.valid(e), "destroy() precondition: valid(e)");
        self.destroy_unchecked(e, version);
    }

    /// Non-panicking [`Registry::destroy`]: reports a stale `e` as
    /// [`Error::WrongGeneration`] instead of asserting.
    pub fn checked_destroy(&mut self, e: Entity<Id32>) -> Result<(), Error> {
        if !self.valid(e) {
            return Err(Error::WrongGeneration(WrongGeneration {
                action: "destroy",
                entity: e,
            }));
        }
        self.destroy_unchecked(e, next::<Id32>(e).version());
        Ok(())
    }

    fn destroy_unchecked(&mut self, e: Entity<Id32>, version: u32) {
        for idx in 0..self.storages.len() {
            if self.storages[idx].contains_any(e) {
                self.fire_any(idx, SignalKind::Destroy, e);
                self.storages[idx].remove_any(e);
            }
        }

        let idx = e.index() as usize;
        let link_sentinel = self.free_head.map(|h| h as u64).unwrap_or(Id32::INDEX_MASK);
        self.entities[idx] = construct::<Id32>(link_sentinel, version as u64);
        self.free_head = Some(idx as u32);
        trace!("destroy: {:?}", e);
    }

    /// True iff `e` is valid and carries no components in any registered
    /// storage.
    pub fn orphan(&self, e: Entity<Id32>) -> bool {
        self.valid(e) && self.storages.iter().all(|s| !s.contains_any(e))
    }

    /// Erases every component from every registered storage and recycles
    /// every currently-live entity. Unlike calling `destroy` in a loop,
    /// storages are bulk-cleared rather than erased one signal at a time.
    ///
    /// Entities are threaded onto the free list in descending index order,
    /// so the next `create()` after a full clear reuses index zero first.
    pub fn clear(&mut self) {
        for storage in &mut self.storages {
            storage.clear_any();
        }
        for idx in (0..self.entities.len()).rev() {
            if self.entities[idx].index() as usize == idx {
                let bumped = next::<Id32>(self.entities[idx]);
                let link_sentinel = self.free_head.map(|h| h as u64).unwrap_or(Id32::INDEX_MASK);
                self.entities[idx] = construct::<Id32>(link_sentinel, bumped.version() as u64);
                self.free_head = Some(idx as u32);
            }
        }
    }

    /// Bulk-clears a single component type's storage, without
    /// individually firing `on_destroy` per entity. A no-op if `C` has
    /// never been touched.
    pub fn clear_storage<C: Component>(&mut self) {
        let type_id = TypeId::of::<C>();
        if let Some(&idx) = self.sequence.get(&type_id) {
            self.storages[idx].clear_any();
        }
    }

    fn storage_index<C: Component>(&mut self) -> usize {
        let type_id = TypeId::of::<C>();
        if let Some(&idx) = self.sequence.get(&type_id) {
            return idx;
        }
        let idx = self.storages.len();
        self.storages.push(Box::<C::Storage>::default());
        self.sequence.insert(type_id, idx);
        trace!("registered storage for {}", std::any::type_name::<C>());
        idx
    }

    /// Mutable access to `C`'s storage, creating it lazily on first use.
    pub fn storage_mut<C: Component>(&mut self) -> &mut C::Storage {
        let idx = self.storage_index::<C>();
        self.storages[idx]
            .as_any_mut()
            .downcast_mut::<C::Storage>()
            .expect("storage type matches registration")
    }

    /// Shared access to `C`'s storage, if it has ever been touched.
    pub fn try_storage<C: Component>(&self) -> Option<&C::Storage> {
        let type_id = TypeId::of::<C>();
        let idx = *self.sequence.get(&type_id)?;
        self.storages[idx].as_any().downcast_ref::<C::Storage>()
    }

    /// Type-erased storage lookup by [`TypeId`], for callers that don't
    /// statically know the component type (e.g. scripting bridges).
    pub fn storage_dyn(&self, type_id: TypeId) -> Option<&dyn AnyStorage> {
        let idx = *self.sequence.get(&type_id)?;
        Some(self.storages[idx].as_ref())
    }

    /// Attaches `value` to `e` as a `C` component, firing `on_construct`
    /// with `(self, e)` afterward.
    ///
    /// # Panics
    /// Panics if `e` already carries `C`, or `!self.valid(e)`.
    pub fn emplace<C: Component>(&mut self, e: Entity<Id32>, value: C) {
        debug_assert!(self.valid(e), "emplace() precondition: valid(e)");
        self.storage_mut::<C>().emplace(e, value);
        self.fire::<C>(SignalKind::Construct, e);
    }

    /// Insert-or-replace `C` on `e`, firing `on_construct` or `on_update`
    /// with `(self, e)` depending on whether `e` already carried `C`.
    ///
    /// # Panics
    /// Panics if `!self.valid(e)`.
    pub fn insert<C: Component>(&mut self, e: Entity<Id32>, value: C) {
        debug_assert!(self.valid(e), "insert() precondition: valid(e)");
        let already = self.storage_mut::<C>().contains(e);
        self.storage_mut::<C>().insert(e, value);
        self.fire::<C>(if already { SignalKind::Update } else { SignalKind::Construct }, e);
    }

    /// Shared access to `e`'s `C` component.
    ///
    /// # Panics
    /// Panics if `e` does not carry `C`.
    pub fn get<C: Component>(&self, e: Entity<Id32>) -> &C {
        self.try_storage::<C>()
            .filter(|s| s.contains(e))
            .map(|s| s.get(e))
            .expect("get() precondition: e carries C")
    }

    /// Unique access to `e`'s `C` component.
    ///
    /// # Panics
    /// Panics if `e` does not carry `C`.
    pub fn get_mut<C: Component>(&mut self, e: Entity<Id32>) -> &mut C {
        self.storage_mut::<C>().get_mut(e)
    }

    /// Shared access without the liveness precondition.
    pub fn try_get<C: Component>(&self, e: Entity<Id32>) -> Option<&C> {
        self.try_storage::<C>().and_then(|s| s.try_get(e))
    }

    /// Unique access without the liveness precondition.
    pub fn try_get_mut<C: Component>(&mut self, e: Entity<Id32>) -> Option<&mut C> {
        let type_id = TypeId::of::<C>();
        if !self.sequence.contains_key(&type_id) {
            return None;
        }
        self.storage_mut::<C>().try_get_mut(e)
    }

    /// Mutates `e`'s `C` component in place, firing exactly one
    /// `on_update` signal with `(self, e)`.
    ///
    /// # Panics
    /// Panics if `e` does not carry `C`.
    pub fn patch<C: Component, F: FnOnce(&mut C)>(&mut self, e: Entity<Id32>, f: F) {
        self.storage_mut::<C>().patch(e, f);
        self.fire::<C>(SignalKind::Update, e);
    }

    /// Removes `e`'s `C` component, firing `on_destroy` with `(self, e)`
    /// just before the component is actually removed.
    ///
    /// # Panics
    /// Panics if `e` does not carry `C`.
    pub fn erase<C: Component>(&mut self, e: Entity<Id32>) -> C {
        self.fire::<C>(SignalKind::Destroy, e);
        self.storage_mut::<C>().erase(e)
    }

    /// Idempotent `erase`.
    pub fn remove<C: Component>(&mut self, e: Entity<Id32>) -> Option<C> {
        let type_id = TypeId::of::<C>();
        if !self.sequence.contains_key(&type_id) {
            return None;
        }
        if self.storage_mut::<C>().contains(e) {
            self.fire::<C>(SignalKind::Destroy, e);
        }
        self.storage_mut::<C>().remove(e)
    }

    /// Publishes `kind` on `C`'s signal channel, handing every subscribed
    /// handler `(self, e)`. The channel is briefly taken out of the
    /// storage (and put back afterward) so that handlers can borrow `self`
    /// as `&Registry` without aliasing the `&mut` borrow the storage
    /// lookup itself would otherwise hold.
    fn fire<C: Component>(&mut self, kind: SignalKind, e: Entity<Id32>) {
        let mut channel = std::mem::take(self.storage_mut::<C>().signals());
        channel.publish(kind, self, e);
        *self.storage_mut::<C>().signals() = channel;
    }

    /// Type-erased counterpart to [`Registry::fire`], for callers (like
    /// [`Registry::destroy_unchecked`]) that only know a storage's index,
    /// not its component type.
    fn fire_any(&mut self, storage_idx: usize, kind: SignalKind, e: Entity<Id32>) {
        let mut channel = std::mem::take(self.storages[storage_idx].signals_any());
        channel.publish(kind, self, e);
        *self.storages[storage_idx].signals_any() = channel;
    }

    /// True iff `e` carries every component in `C`.
    pub fn all_of<C: Component>(&self, e: Entity<Id32>) -> bool {
        self.try_storage::<C>().map(|s| s.contains(e)).unwrap_or(false)
    }

    /// True iff `e` carries at least one of a list of component types.
    /// Exposed as a free function over explicit storage lookups since
    /// Rust cannot fold a variadic type list the way the C++ original
    /// does; see `view.rs` for the many-type ergonomic entry point.
    pub fn any_of(&self, e: Entity<Id32>, type_ids: &[TypeId]) -> bool {
        type_ids.iter().any(|t| self.storage_dyn(*t).map(|s| s.contains_any(e)).unwrap_or(false))
    }

    /// Total number of entities ever allocated (live + recycled-but-not-
    /// reused), i.e. the high-water mark of the index space.
    pub fn capacity(&self) -> usize {
        self.entities.len()
    }

    /// Number of currently live entities.
    pub fn alive(&self) -> usize {
        (0..self.entities.len())
            .filter(|&i| self.entities[i].index() as usize == i)
            .count()
    }

    /// Looks up a storage by `TypeId` and downcasts it to `C::Storage`,
    /// returning [`Error::StorageMismatch`] if the stored type and `C`
    /// disagree. Used by type-erased callers that believe they know what
    /// type a `TypeId` names but want a checked result rather than a
    /// panic.
    pub fn checked_storage<C: Component>(&self, type_id: TypeId) -> Result<&C::Storage, Error> {
        self.storage_dyn(type_id)
            .and_then(|s| s.as_any().downcast_ref::<C::Storage>())
            .ok_or(Error::StorageMismatch(StorageMismatch {
                expected: std::any::type_name::<C>(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pos(i32, i32);
    impl Component for Pos {
        type Storage = crate::storage::DenseStorage<Pos>;
    }

    #[test]
    fn create_destroy_recycle_bumps_version() {
        let mut r = Registry::new();
        let e0 = r.create();
        assert!(r.valid(e0));
        r.destroy(e0);
        assert!(!r.valid(e0));
        let e1 = r.create();
        assert_eq!(e1.index(), e0.index());
        assert_eq!(e1.version(), e0.version() + 1);
    }

    #[test]
    fn emplace_get_erase_roundtrip() {
        let mut r = Registry::new();
        let e = r.create();
        r.emplace(e, Pos(1, 2));
        assert_eq!(*r.get::<Pos>(e), Pos(1, 2));
        assert!(r.all_of::<Pos>(e));
        let removed = r.erase::<Pos>(e);
        assert_eq!(removed, Pos(1, 2));
        assert!(!r.all_of::<Pos>(e));
    }

    #[test]
    fn destroy_clears_components_and_orphan_reports_it() {
        let mut r = Registry::new();
        let e = r.create();
        r.emplace(e, Pos(0, 0));
        assert!(!r.orphan(e));
        r.destroy(e);
        let e2 = r.create();
        assert!(r.orphan(e2));
    }

    #[test]
    fn ten_entities_destroy_five_recreate_five() {
        let mut r = Registry::new();
        let mut ids: Vec<_> = (0..10).map(|_| r.create()).collect();
        for e in ids.iter().take(5) {
            r.destroy(*e);
        }
        let revived: Vec<_> = (0..5).map(|_| r.create()).collect();
        for e in &revived {
            assert!(r.valid(*e));
        }
        ids.truncate(5);
        // every recycled index should be one of the originally destroyed ones.
        for e in &revived {
            assert!(ids.iter().any(|old| old.index() == e.index()));
        }
    }

    #[test]
    fn destroy_with_version_forces_recycled_version() {
        let mut r = Registry::new();
        let e = r.create();
        r.destroy_with_version(e, 7);
        let revived = r.create();
        assert_eq!(revived.index(), e.index());
        assert_eq!(revived.version(), 7);
    }

    #[test]
    fn checked_destroy_reports_wrong_generation_instead_of_panicking() {
        let mut r = Registry::new();
        let e = r.create();
        r.destroy(e);
        match r.checked_destroy(e) {
            Err(Error::WrongGeneration(g)) => assert_eq!(g.action, "destroy"),
            other => panic!("expected WrongGeneration, got {:?}", other),
        }
        let e2 = r.create();
        assert!(r.checked_destroy(e2).is_ok());
        assert!(!r.valid(e2));
    }

    #[test]
    fn create_at_honors_a_fresh_hint_beyond_current_capacity() {
        let mut r = Registry::new();
        let hint = crate::entity::construct::<Id32>(5, 0);
        let granted = r.create_at(hint);
        assert_eq!(granted, hint);
        assert!(r.valid(granted));
        // the padding slots below index 5 remain available to `create()`.
        let filled: Vec<_> = (0..5).map(|_| r.create()).collect();
        for e in &filled {
            assert!(e.index() < 5);
        }
    }

    #[test]
    fn create_at_falls_back_when_hint_is_already_alive() {
        let mut r = Registry::new();
        let e = r.create();
        let granted = r.create_at(e);
        assert_ne!(granted, e);
    }

    #[test]
    fn clear_then_create_reuses_index_zero_first() {
        let mut r = Registry::new();
        let e = r.create();
        r.create();
        r.create();
        r.clear();
        let revived = r.create();
        assert_eq!(revived.index(), 0);
        assert_eq!(revived.version(), e.version() + 1);
    }

    #[test]
    fn clear_storage_only_affects_one_type() {
        #[derive(Debug, PartialEq)]
        struct Vel(i32);
        impl Component for Vel {
            type Storage = crate::storage::DenseStorage<Vel>;
        }

        let mut r = Registry::new();
        let e = r.create();
        r.emplace(e, Pos(1, 1));
        r.emplace(e, Vel(2));
        r.clear_storage::<Pos>();
        assert!(!r.all_of::<Pos>(e));
        assert!(r.all_of::<Vel>(e));
    }
}
