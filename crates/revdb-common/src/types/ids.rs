//! Core identifier types for revdb.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing a node key from being passed where a page key or revision
//! number is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{NODE_PAGE_EXPONENT, NODE_PAGE_SLOTS};

/// Node key - uniquely identifies a node across all revisions of a store.
///
/// Node keys are assigned monotonically and never reused.
///
/// # Example
///
/// ```rust
/// use revdb_common::types::NodeKey;
///
/// let key = NodeKey::new(129);
/// assert_eq!(key.page_key().as_u64(), 1);
/// assert_eq!(key.slot(), 1);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeKey(u64);

impl NodeKey {
    /// Sentinel for "no node", used for absent parent/sibling/child links.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates a new `NodeKey` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(key: u64) -> Self {
        Self(key)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next node key.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Checks that this is not the [`NodeKey::NULL`] sentinel.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::NULL.0
    }

    /// Returns the key of the node page holding this node.
    #[inline]
    #[must_use]
    pub const fn page_key(self) -> PageKey {
        PageKey(self.0 >> NODE_PAGE_EXPONENT)
    }

    /// Returns the slot of this node inside its node page.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        (self.0 & (NODE_PAGE_SLOTS as u64 - 1)) as usize
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::NULL {
            write!(f, "NodeKey(NULL)")
        } else {
            write!(f, "NodeKey({})", self.0)
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeKey {
    #[inline]
    fn from(key: u64) -> Self {
        Self::new(key)
    }
}

impl From<NodeKey> for u64 {
    #[inline]
    fn from(key: NodeKey) -> Self {
        key.0
    }
}

/// Node page key - identifies the node page holding a contiguous key range.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PageKey(u64);

impl PageKey {
    /// Creates a new `PageKey` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(key: u64) -> Self {
        Self(key)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the node key stored in `slot` of this page.
    #[inline]
    #[must_use]
    pub const fn node_key(self, slot: usize) -> NodeKey {
        NodeKey((self.0 << NODE_PAGE_EXPONENT) | slot as u64)
    }
}

impl fmt::Debug for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageKey({})", self.0)
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Revision number - identifies one committed, immutable snapshot.
///
/// Revision 0 is the empty bootstrap revision.
///
/// # Example
///
/// ```rust
/// use revdb_common::types::Revision;
///
/// let rev = Revision::BOOTSTRAP;
/// assert_eq!(rev.next(), Revision::new(1));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Revision(u64);

impl Revision {
    /// The empty revision every store starts from.
    pub const BOOTSTRAP: Self = Self(0);

    /// Creates a new `Revision` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(revision: u64) -> Self {
        Self(revision)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next revision number.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns true for the bootstrap revision.
    #[inline]
    #[must_use]
    pub const fn is_bootstrap(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({})", self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Revision {
    #[inline]
    fn from(revision: u64) -> Self {
        Self::new(revision)
    }
}

impl From<Revision> for u64 {
    #[inline]
    fn from(revision: Revision) -> Self {
        revision.0
    }
}

/// Name key - identifies an interned string in a name page.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NameKey(i32);

impl NameKey {
    /// Sentinel for "no name".
    pub const NULL: Self = Self(-1);

    /// Creates a new `NameKey` from a raw i32 value.
    #[inline]
    #[must_use]
    pub const fn new(key: i32) -> Self {
        Self(key)
    }

    /// Returns the raw i32 value.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Next key to try after a hash collision, wrapping from
    /// `i32::MAX` back to 0 so candidates never collide with [`NameKey::NULL`].
    #[inline]
    #[must_use]
    pub const fn next_candidate(self) -> Self {
        Self(self.0.wrapping_add(1) & i32::MAX)
    }
}

impl fmt::Debug for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameKey({})", self.0)
    }
}

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted location of a page, as handed out by a storage backend.
///
/// The checksum of the encoded page travels with its offset, so a
/// reference either knows both or neither.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageLocation {
    /// Backend-specific offset (file offset or slot index).
    pub offset: u64,
    /// CRC32 of the encoded page.
    pub checksum: u32,
}

impl PageLocation {
    /// Creates a new location.
    #[inline]
    #[must_use]
    pub const fn new(offset: u64, checksum: u32) -> Self {
        Self { offset, checksum }
    }
}

impl fmt::Debug for PageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageLocation({}, crc={:#010x})", self.offset, self.checksum)
    }
}

impl fmt::Display for PageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.offset)
    }
}
