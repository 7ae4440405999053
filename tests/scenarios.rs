//! Crate-level scenarios exercising entities, components, views, signals
//! and observers together, rather than one module in isolation.

use sparsecs::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position(f32, f32);
impl Component for Position {
    type Storage = DenseStorage<Position>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity(f32, f32);
impl Component for Velocity {
    type Storage = DenseStorage<Velocity>;
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Marker;
impl Component for Marker {
    type Storage = EmptyStorage<Marker>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Big(u64);
impl Component for Big {
    type Storage = StableStorage<Big>;
}

#[test]
fn view_iterates_entities_sharing_position_and_velocity() {
    let mut r = Registry::new();
    let mut matching = Vec::new();

    for i in 0..5 {
        let e = r.create();
        r.emplace(e, Position(i as f32, 0.0));
        if i % 2 == 0 {
            r.emplace(e, Velocity(1.0, 0.0));
            matching.push(e);
        }
    }

    let v = view::<(Position, Velocity)>(&r);
    let seen: Vec<_> = v.entities();
    assert_eq!(seen, matching);
}

#[test]
fn destroy_signal_fires_before_component_is_actually_removed() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut r = Registry::new();
    let e0 = r.create();
    r.emplace(e0, Position(1.0, 1.0));

    // seen captures what the handler actually received: the owning
    // registry (checked via a call back into it) and the entity, at the
    // moment the handler runs the erase() call hasn't returned yet, so
    // the component is still present in the registry the handler sees.
    let seen: Rc<RefCell<Option<(bool, Entity)>>> = Rc::new(RefCell::new(None));
    let handler_seen = seen.clone();
    r.storage_mut::<Position>()
        .signals()
        .connect(SignalKind::Destroy, move |registry, entity| {
            handler_seen.replace(Some((registry.all_of::<Position>(entity), entity)));
        });

    r.erase::<Position>(e0);

    let (still_present, fired_for) = seen.borrow().expect("destroy handler must have run");
    assert!(still_present, "component must still be present while the handler runs");
    assert_eq!(fired_for, e0);
    assert!(!r.all_of::<Position>(e0));
}

#[test]
fn stable_storage_keeps_pointers_valid_across_unrelated_erase() {
    let mut r = Registry::new();
    let keep = r.create();
    r.emplace(keep, Big(42));
    let doomed = r.create();
    r.emplace(doomed, Big(99));

    let ptr_before: *const Big = r.get::<Big>(keep);
    r.erase::<Big>(doomed);
    let ptr_after: *const Big = r.get::<Big>(keep);
    assert_eq!(ptr_before, ptr_after);
    assert_eq!(*r.get::<Big>(keep), Big(42));
}

#[test]
fn ten_entities_destroy_five_then_recreate_five_bumps_versions() {
    let mut r = Registry::new();
    let created: Vec<_> = (0..10).map(|_| r.create()).collect();
    for e in &created[0..5] {
        r.destroy(*e);
    }
    let revived: Vec<_> = (0..5).map(|_| r.create()).collect();

    for e in &revived {
        assert!(r.valid(*e));
        let was_destroyed = created[0..5].iter().any(|old| old.index() == e.index());
        assert!(was_destroyed, "recycled index must come from a destroyed entity");
        assert!(e.version() > 0, "recycling must bump the version");
    }
    for e in &created[5..10] {
        assert!(r.valid(*e), "untouched entities remain valid");
    }
}

#[test]
fn excluding_a_component_filters_a_hundred_entity_view() {
    let mut r = Registry::new();
    let mut expected = Vec::new();
    for i in 0..100 {
        let e = r.create();
        r.emplace(e, Position(i as f32, 0.0));
        if i % 10 == 0 {
            r.emplace(e, Marker);
        } else {
            expected.push(e);
        }
    }

    let v = view::<(Position,)>(&r).exclude_dyn(&r, &[std::any::TypeId::of::<Marker>()]);
    assert_eq!(v.entities(), expected);
}

#[test]
fn swapping_which_storage_drives_iteration_yields_the_same_set() {
    let mut r = Registry::new();
    for i in 0..50 {
        let e = r.create();
        r.emplace(e, Position(i as f32, 0.0));
    }
    let tagged: Vec<_> = (0..3)
        .map(|i| {
            let e = r.create();
            r.emplace(e, Position(100.0 + i as f32, 0.0));
            r.emplace(e, Velocity(0.0, 1.0));
            e
        })
        .collect();

    let mut a = view::<(Position, Velocity)>(&r).entities();
    let mut b = view::<(Velocity, Position)>(&r).entities();
    a.sort_by_key(|e| e.index());
    b.sort_by_key(|e| e.index());
    let mut expected = tagged;
    expected.sort_by_key(|e| e.index());
    assert_eq!(a, expected);
    assert_eq!(b, expected);
}

#[test]
fn observer_tracks_membership_without_storage_scan() {
    let mut r = Registry::new();
    let e1 = r.create();
    r.emplace(e1, Velocity(0.0, 0.0));

    let observer = Observer::new(r.storage_mut::<Velocity>());
    assert!(observer.contains(e1));

    let e2 = r.create();
    r.emplace(e2, Velocity(1.0, 0.0));
    assert_eq!(observer.len(), 2);

    r.erase::<Velocity>(e1);
    assert!(!observer.contains(e1));
    assert_eq!(observer.len(), 1);
}
