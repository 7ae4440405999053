//! Component storage (L2): pairs a [`SparseSet`] with a parallel payload
//! array, selecting one of two deletion policies per component type.
//!
//! [`Component::Storage`] picks the concrete storage for a type at compile
//! time; the storages themselves are sparse-set backed rather than
//! bitset-masked.

mod dense;
mod empty;
mod stable;

pub use dense::DenseStorage;
pub use empty::EmptyStorage;
pub use stable::StableStorage;

use crate::entity::{Entity, Id32};
use crate::signal::SignalChannel;

/// A type that can be attached to entities as a component.
///
/// `Storage` selects the deletion policy and layout: [`DenseStorage`] for
/// the default swap-and-pop behavior, [`StableStorage`] for pointer-stable
/// in-place deletion, or [`EmptyStorage`] for zero-sized marker types. The
/// `derive` feature's `#[derive(Component)]` picks `DenseStorage` unless a
/// `#[component(storage = "...")]` attribute says otherwise.
pub trait Component: Sized + 'static {
    /// Concrete storage backing this component type.
    type Storage: Storage<Self>;
}

/// The operations every concrete component storage must provide.
///
/// This is the trait the registry's type-erased map is built against (via
/// `AnyStorage`, see `registry.rs`); `T` is the payload type, not `Self`.
///
/// None of these methods publish on [`Storage::signals`] themselves: a
/// handler needs the owning [`crate::registry::Registry`], which a bare
/// storage doesn't have. [`crate::registry::Registry`]'s own
/// `emplace`/`insert`/`patch`/`erase`/`remove` call the matching storage
/// method here and then publish the signal with `(self, e)` afterward.
/// Mutating a storage directly, without going through a registry, never
/// fires a signal.
pub trait Storage<T>: Default {
    /// Page size override, for types that specialize via
    /// `#[component(page_size = "...")]`. Defaults to
    /// [`crate::sparse_set::DEFAULT_PAGE_SIZE`].
    const PAGE_SIZE: usize = crate::sparse_set::DEFAULT_PAGE_SIZE;

    /// True iff `e` currently carries this component.
    fn contains(&self, e: Entity<Id32>) -> bool;

    /// Attaches `value` to `e`.
    ///
    /// # Panics
    /// Panics if `self.contains(e)` (precondition violation; use
    /// [`Storage::insert`] for insert-or-replace semantics).
    fn emplace(&mut self, e: Entity<Id32>, value: T);

    /// Insert-or-replace: attaches `value` to `e`. The registry layer
    /// fires `on_update` instead of `on_construct` for the replace case.
    fn insert(&mut self, e: Entity<Id32>, value: T);

    /// Shared access to `e`'s component.
    ///
    /// # Panics
    /// Panics if `!self.contains(e)`.
    fn get(&self, e: Entity<Id32>) -> &T;

    /// Unique access to `e`'s component.
    ///
    /// # Panics
    /// Panics if `!self.contains(e)`.
    fn get_mut(&mut self, e: Entity<Id32>) -> &mut T;

    /// Shared access without the liveness precondition.
    fn try_get(&self, e: Entity<Id32>) -> Option<&T>;

    /// Unique access without the liveness precondition.
    fn try_get_mut(&mut self, e: Entity<Id32>) -> Option<&mut T>;

    /// Removes `e`'s component.
    ///
    /// # Panics
    /// Panics if `!self.contains(e)`.
    fn erase(&mut self, e: Entity<Id32>) -> T;

    /// Idempotent `erase`: returns the removed value, if any.
    fn remove(&mut self, e: Entity<Id32>) -> Option<T>;

    /// Mutates `e`'s component in place via `f`. The registry layer fires
    /// exactly one `on_update` signal regardless of how many fields `f`
    /// touches.
    ///
    /// # Panics
    /// Panics if `!self.contains(e)`.
    fn patch<F: FnOnce(&mut T)>(&mut self, e: Entity<Id32>, f: F);

    /// Inserts every `(entity, value)` pair as one operation, without
    /// requiring the caller to drive the loop itself. A bare storage's
    /// `insert_bulk` fires nothing (see the trait-level note); a registry
    /// driving this still has to fire one `on_construct`/`on_update` per
    /// entity itself, since the loop happens below the registry layer.
    fn insert_bulk<I: Iterator<Item = (Entity<Id32>, T)>>(&mut self, pairs: I) {
        for (e, value) in pairs {
            self.insert(e, value);
        }
    }

    /// Number of live components.
    fn len(&self) -> usize;

    /// True iff no entity carries this component.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every component. A bulk reset, not a loop of single removals:
    /// no `on_destroy` fires at all, from either layer.
    fn clear(&mut self);

    /// Entities carrying this component, in dense (iteration) order.
    fn entities(&self) -> &[Entity<Id32>];

    /// The signal channel backing `on_construct`/`on_update`/`on_destroy`.
    fn signals(&mut self) -> &mut SignalChannel<Entity<Id32>>;
}
