//! sparsecs error module.
//!
//! There are specific types for errors (e.g. [`WrongGeneration`]) and
//! additionally one [`Error`] type that can represent them all. Each error
//! in this module has an `Into<Error>` implementation.
//!
//! Precondition violations (getting an absent component, emplacing onto an
//! entity that already has one, ...) are not part of this type: per the
//! core's error taxonomy those are caller bugs and are reported by
//! assertion, not by `Result`. This module only covers failures that a
//! well-behaved caller can still hit: a stale entity handle, or a
//! storage/type mismatch surfacing through type-erased access.

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};

use crate::entity::Entity;

/// A boxed error implementing `Debug`, `Display` and `Error`.
pub struct BoxedErr(pub Box<dyn StdError + Send + Sync + 'static>);

impl BoxedErr {
    /// Creates a new boxed error.
    pub fn new<T>(err: T) -> Self
    where
        T: StdError + Send + Sync + 'static,
    {
        BoxedErr(Box::new(err))
    }
}

impl Debug for BoxedErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for BoxedErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for BoxedErr {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// The sparsecs error type, able to represent any recoverable failure this
/// crate's public API can raise.
#[derive(Debug)]
pub enum Error {
    /// A stale entity handle was used (it has since been destroyed and its
    /// index recycled under a new version).
    WrongGeneration(WrongGeneration),
    /// A type-erased storage access named a component type that does not
    /// match the storage it was handed.
    StorageMismatch(StorageMismatch),
    /// A custom, boxed error propagated from component construction.
    Custom(BoxedErr),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::WrongGeneration(e) => write!(f, "wrong generation: {}", e),
            Error::StorageMismatch(e) => write!(f, "storage mismatch: {}", e),
            Error::Custom(e) => write!(f, "custom: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::WrongGeneration(e) => Some(e),
            Error::StorageMismatch(e) => Some(e),
            Error::Custom(e) => Some(e),
        }
    }
}

impl From<WrongGeneration> for Error {
    fn from(e: WrongGeneration) -> Self {
        Error::WrongGeneration(e)
    }
}

impl From<StorageMismatch> for Error {
    fn from(e: StorageMismatch) -> Self {
        Error::StorageMismatch(e)
    }
}

/// Raised when an operation is attempted through an `Entity` whose version
/// no longer matches the version currently alive at that index.
#[derive(Debug)]
pub struct WrongGeneration {
    /// The action that failed because of the wrong generation.
    pub action: &'static str,
    /// The entity handle that was passed, carrying the stale version.
    pub entity: Entity,
}

impl Display for WrongGeneration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tried to {} entity {:?}, but it is no longer alive at that version",
            self.action, self.entity
        )
    }
}

impl StdError for WrongGeneration {}

/// Raised by type-erased storage access (`Registry::storage(type_id)` and
/// friends) when the requested component type does not match the stored
/// type.
#[derive(Debug)]
pub struct StorageMismatch {
    /// Name of the component type that was expected (`std::any::type_name`).
    pub expected: &'static str,
}

impl Display for StorageMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "storage does not hold components of type {}", self.expected)
    }
}

impl StdError for StorageMismatch {}
