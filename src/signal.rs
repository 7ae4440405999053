//! The storage signal mixin (L3): synchronous construct/update/destroy
//! notifications.
//!
//! A [`SignalChannel`] dispatches synchronously, unlike a buffered/polled
//! event channel: every subscribed handler runs to completion, in
//! subscription order, before the registry call that triggered it
//! (`emplace`, `patch`, `erase`, ...) returns. Every handler receives the
//! owning [`Registry`] alongside the affected entity, the same
//! `(registry, entity)` pair a caller would get threading the registry
//! through by hand — a storage mutated directly, without going through a
//! registry, never fires a signal, since there is no registry to hand the
//! handler. Observers (L6) depend on a handler never missing or reordering
//! a mutation relative to the rest of the registry's state.

use crate::registry::Registry;

/// A slot for a single signal's subscribers, parameterized over the
/// payload passed to each handler alongside the registry (always `Entity`
/// for storage signals).
pub struct Signal<T> {
    handlers: Vec<Box<dyn FnMut(&Registry, T) + 'static>>,
}

impl<T: Copy> Signal<T> {
    fn new() -> Self {
        Signal { handlers: Vec::new() }
    }

    /// Registers a handler. Returns its index, usable with
    /// [`Signal::disconnect`].
    pub fn connect<F: FnMut(&Registry, T) + 'static>(&mut self, handler: F) -> usize {
        self.handlers.push(Box::new(handler));
        self.handlers.len() - 1
    }

    /// Removes a previously connected handler by index. A no-op if `id` is
    /// out of range (already disconnected or never valid).
    pub fn disconnect(&mut self, id: usize) {
        if id < self.handlers.len() {
            self.handlers.remove(id);
        }
    }

    /// Invokes every connected handler with `(registry, value)`, in
    /// subscription order.
    pub fn publish(&mut self, registry: &Registry, value: T) {
        for handler in &mut self.handlers {
            handler(registry, value);
        }
    }

    fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Which lifecycle event a [`SignalChannel`] subscriber is attaching to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SignalKind {
    /// Fired after a component is first attached to an entity.
    Construct,
    /// Fired after an existing component is replaced or patched.
    Update,
    /// Fired just before a component is removed from an entity.
    Destroy,
}

/// The three signals a [`crate::storage::Storage`] exposes: `on_construct`,
/// `on_update`, `on_destroy`.
pub struct SignalChannel<T> {
    construct: Signal<T>,
    update: Signal<T>,
    destroy: Signal<T>,
}

impl<T: Copy> Default for SignalChannel<T> {
    fn default() -> Self {
        SignalChannel {
            construct: Signal::new(),
            update: Signal::new(),
            destroy: Signal::new(),
        }
    }
}

impl<T: Copy> SignalChannel<T> {
    /// Subscribes `handler` to `kind`, returning an id for
    /// [`SignalChannel::disconnect`]. `handler` receives the owning
    /// registry alongside the payload on every publish.
    pub fn connect<F: FnMut(&Registry, T) + 'static>(&mut self, kind: SignalKind, handler: F) -> usize {
        self.signal_mut(kind).connect(handler)
    }

    /// Unsubscribes a handler previously returned by `connect` for the same
    /// `kind`.
    pub fn disconnect(&mut self, kind: SignalKind, id: usize) {
        self.signal_mut(kind).disconnect(id);
    }

    /// Synchronously runs every handler subscribed to `kind`, passing
    /// `registry` through to each.
    pub fn publish(&mut self, kind: SignalKind, registry: &Registry, value: T) {
        self.signal_mut(kind).publish(registry, value);
    }

    /// True iff no handlers are subscribed to any of the three signals.
    /// Storages can use this to skip bookkeeping on the hot path when
    /// nothing observes them.
    pub fn is_quiet(&self) -> bool {
        self.construct.is_empty() && self.update.is_empty() && self.destroy.is_empty()
    }

    fn signal_mut(&mut self, kind: SignalKind) -> &mut Signal<T> {
        match kind {
            SignalKind::Construct => &mut self.construct,
            SignalKind::Update => &mut self.update,
            SignalKind::Destroy => &mut self.destroy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn handlers_run_synchronously_and_in_order() {
        let r = Registry::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut channel: SignalChannel<u32> = SignalChannel::default();

        let log1 = log.clone();
        channel.connect(SignalKind::Construct, move |_, e| log1.borrow_mut().push(("a", e)));
        let log2 = log.clone();
        channel.connect(SignalKind::Construct, move |_, e| log2.borrow_mut().push(("b", e)));

        channel.publish(SignalKind::Construct, &r, 7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn disconnect_stops_future_publishes() {
        let r = Registry::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut channel: SignalChannel<u32> = SignalChannel::default();
        let log1 = log.clone();
        let id = channel.connect(SignalKind::Destroy, move |_, e| log1.borrow_mut().push(e));
        channel.disconnect(SignalKind::Destroy, id);
        channel.publish(SignalKind::Destroy, &r, 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn is_quiet_tracks_subscriptions() {
        let mut channel: SignalChannel<u32> = SignalChannel::default();
        assert!(channel.is_quiet());
        channel.connect(SignalKind::Update, |_, _| {});
        assert!(!channel.is_quiet());
    }

    #[test]
    fn handlers_receive_the_owning_registry() {
        let r = Registry::new();
        let mut channel: SignalChannel<u32> = SignalChannel::default();
        let capacities: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let c = capacities.clone();
        channel.connect(SignalKind::Construct, move |registry, _| {
            c.borrow_mut().push(registry.capacity());
        });
        channel.publish(SignalKind::Construct, &r, 0);
        assert_eq!(*capacities.borrow(), vec![r.capacity()]);
    }
}
