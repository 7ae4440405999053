//! sparsecs: a sparse-set Entity-Component-System core.
//!
//! A [`registry::Registry`] owns entities and their components. Entities
//! are packed `(index, version)` identifiers (`entity`); components live in
//! per-type [`storage::Storage`] implementations built on a shared
//! [`sparse_set::SparseSet`]; [`view::View`] runs a query over one or more
//! component types without materializing an intersection; `signal` and
//! `observer` let code react to component lifecycle events instead of
//! polling for them.
//!
//! ```
//! use sparsecs::prelude::*;
//!
//! struct Position(f32, f32);
//! impl Component for Position {
//!     type Storage = DenseStorage<Position>;
//! }
//!
//! let mut registry = Registry::new();
//! let e = registry.create();
//! registry.emplace(e, Position(0.0, 0.0));
//! assert!(registry.all_of::<Position>(e));
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod entity;
pub mod error;
pub mod observer;
pub mod prelude;
pub mod registry;
pub mod signal;
pub mod sparse_set;
pub mod storage;
pub mod view;

#[cfg(feature = "derive")]
pub use sparsecs_derive::Component;
