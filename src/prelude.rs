//! Convenience re-exports of the types most call sites need.

pub use crate::entity::{Entity, Id32};
pub use crate::error::{Error, WrongGeneration};
pub use crate::observer::Observer;
pub use crate::registry::Registry;
pub use crate::signal::SignalKind;
pub use crate::storage::{Component, DenseStorage, EmptyStorage, Storage, StableStorage};
pub use crate::view::view;

#[cfg(feature = "derive")]
pub use sparsecs_derive::Component as DeriveComponent;
