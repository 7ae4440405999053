//! Entity identifier algebra (L0): packing an index and a version into a
//! single integer, and the reserved null/tombstone encodings.
//!
//! An [`Entity`] is an opaque integer split into a low **index** bitfield and
//! a high **version** bitfield. Three widths are supported through
//! [`IdConfig`]: [`Id16`] (12 + 4), [`Id32`] (20 + 12, the crate default) and
//! [`Id64`] (32 + 32). The split is fixed per width; see each marker type's
//! docs for the exact masks.

use std::fmt;
use std::marker::PhantomData;

/// The raw integer representation every [`IdConfig`] packs into. Widths
/// narrower than 64 bits simply leave the high bits unused.
pub type Raw = u64;

/// Selects the index/version bit split for an [`Entity`].
///
/// Implemented only by [`Id16`], [`Id32`] and [`Id64`]; this trait is sealed
/// in spirit (not `pub(crate)`-sealed, since downstream crates may
/// legitimately want a fourth width, but the three provided covers the
/// widths spec'd here).
pub trait IdConfig: Copy + Clone + Eq + PartialEq + 'static {
    /// Number of bits dedicated to the index.
    const INDEX_BITS: u32;
    /// Number of bits dedicated to the version.
    const VERSION_BITS: u32;

    /// Mask selecting the index bits of a packed identifier.
    const INDEX_MASK: Raw = (1u64 << Self::INDEX_BITS) - 1;
    /// Mask selecting the version bits of a packed identifier, already
    /// shifted into position.
    const VERSION_MASK: Raw = ((1u64 << Self::VERSION_BITS) - 1) << Self::INDEX_BITS;
    /// Number of bits to shift a version value left before OR-ing it with an
    /// index.
    const VERSION_SHIFT: u32 = Self::INDEX_BITS;
}

/// 16-bit identifiers: 12 index bits (4k live entities), 4 version bits.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Id16;

impl IdConfig for Id16 {
    const INDEX_BITS: u32 = 12;
    const VERSION_BITS: u32 = 4;
}

/// 32-bit identifiers: 20 index bits, 12 version bits. The crate's default.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Id32;

impl IdConfig for Id32 {
    const INDEX_BITS: u32 = 20;
    const VERSION_BITS: u32 = 12;
}

/// 64-bit identifiers: 32 index bits, 32 version bits.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Id64;

impl IdConfig for Id64 {
    const INDEX_BITS: u32 = 32;
    const VERSION_BITS: u32 = 32;
}

/// An entity handle: an opaque `(index, version)` pair packed into a single
/// integer, generic over the bit-width configuration `C` (default: 32-bit).
///
/// Two values are reserved and never returned by a registry's `create()`:
/// [`Entity::null`] (all-ones index) and [`Entity::tombstone`] (all-ones
/// version). `null` compares equal only to another `null`, regardless of
/// version; `tombstone` compares equal only to another `tombstone`,
/// regardless of index. Ordinary entities compare by their full packed
/// value.
pub struct Entity<C: IdConfig = Id32> {
    value: Raw,
    _config: PhantomData<C>,
}

impl<C: IdConfig> Entity<C> {
    /// Builds an entity straight from a pre-packed raw value, without
    /// masking. Used internally by the sparse set and registry, which are
    /// trusted to already have masked inputs.
    #[inline]
    pub(crate) fn from_raw(value: Raw) -> Self {
        Entity {
            value,
            _config: PhantomData,
        }
    }

    /// The packed raw value.
    #[inline]
    pub fn raw(self) -> Raw {
        self.value
    }

    /// The reserved "no entity" value: index bits all set, version
    /// arbitrary (fixed to zero here for a canonical representation).
    #[inline]
    pub fn null() -> Self {
        construct(C::INDEX_MASK, 0)
    }

    /// The reserved tombstone value: version bits all set, index arbitrary
    /// (fixed to zero here for a canonical representation).
    #[inline]
    pub fn tombstone() -> Self {
        construct(0, C::VERSION_MASK >> C::VERSION_SHIFT)
    }

    /// `true` if this is the reserved null value (any version).
    #[inline]
    pub fn is_null(self) -> bool {
        to_entity::<C>(self.value) == C::INDEX_MASK
    }

    /// `true` if this is the reserved tombstone value (any index).
    #[inline]
    pub fn is_tombstone(self) -> bool {
        to_version::<C>(self.value) == C::VERSION_MASK >> C::VERSION_SHIFT
    }

    /// The index bitfield.
    #[inline]
    pub fn index(self) -> u32 {
        to_entity::<C>(self.value) as u32
    }

    /// The version bitfield.
    #[inline]
    pub fn version(self) -> u32 {
        to_version::<C>(self.value) as u32
    }
}

impl<C: IdConfig> Clone for Entity<C> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<C: IdConfig> Copy for Entity<C> {}

impl<C: IdConfig> PartialEq for Entity<C> {
    fn eq(&self, other: &Self) -> bool {
        if self.is_null() || other.is_null() {
            return self.is_null() && other.is_null();
        }
        if self.is_tombstone() || other.is_tombstone() {
            return self.is_tombstone() && other.is_tombstone();
        }
        self.value == other.value
    }
}
impl<C: IdConfig> Eq for Entity<C> {}

impl<C: IdConfig> std::hash::Hash for Entity<C> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<C: IdConfig> fmt::Debug for Entity<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else if self.is_tombstone() {
            write!(f, "Entity(tombstone)")
        } else {
            write!(f, "Entity(index={}, version={})", self.index(), self.version())
        }
    }
}

/// Extracts the index bitfield out of a raw packed identifier.
#[inline]
pub fn to_entity<C: IdConfig>(id: Raw) -> Raw {
    id & C::INDEX_MASK
}

/// Extracts the version bitfield out of a raw packed identifier.
#[inline]
pub fn to_version<C: IdConfig>(id: Raw) -> Raw {
    (id & C::VERSION_MASK) >> C::VERSION_SHIFT
}

/// Packs an index and a version into an entity. Stray bits above either
/// mask are truncated silently; callers that source either value from
/// untrusted input must pre-mask it themselves.
#[inline]
pub fn construct<C: IdConfig>(index: Raw, version: Raw) -> Entity<C> {
    let packed = (index & C::INDEX_MASK) | ((version & (C::VERSION_MASK >> C::VERSION_SHIFT)) << C::VERSION_SHIFT);
    Entity::from_raw(packed)
}

/// Takes the index from `lhs` and the version from `rhs`.
#[inline]
pub fn combine<C: IdConfig>(lhs: Entity<C>, rhs: Entity<C>) -> Entity<C> {
    construct::<C>(to_entity::<C>(lhs.value), to_version::<C>(rhs.value))
}

/// Same index, version bumped by one; wraps to zero instead of ever
/// producing the tombstone encoding.
#[inline]
pub fn next<C: IdConfig>(id: Entity<C>) -> Entity<C> {
    let tombstone_version = C::VERSION_MASK >> C::VERSION_SHIFT;
    let bumped = (to_version::<C>(id.value) + 1) & tombstone_version;
    let version = if bumped == tombstone_version { 0 } else { bumped };
    construct::<C>(to_entity::<C>(id.value), version)
}
