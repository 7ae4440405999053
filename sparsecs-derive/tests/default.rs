use sparsecs::prelude::*;

#[derive(DeriveComponent)]
pub struct Pos(f32, f32);

#[derive(DeriveComponent)]
#[component(storage = "stable")]
pub struct Big([u8; 64]);

#[derive(DeriveComponent, Default)]
#[component(storage = "empty")]
pub struct Tag;

#[derive(DeriveComponent)]
#[component(page_size = "256")]
pub struct Small(u8);

static_assertions::assert_type_eq_all!(<Pos as Component>::Storage, DenseStorage<Pos>);
static_assertions::assert_type_eq_all!(<Big as Component>::Storage, StableStorage<Big>);
static_assertions::assert_type_eq_all!(<Tag as Component>::Storage, EmptyStorage<Tag>);
static_assertions::assert_type_eq_all!(<Small as Component>::Storage, DenseStorage<Small, 256>);
