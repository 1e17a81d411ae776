//! Indirect pages and indirect-tree addressing.
//!
//! An indirect tree has a fixed height. A key is decomposed into one offset
//! per level by shifting it by that level's exponent and subtracting the part
//! already consumed, so reaching a leaf is a direct walk rather than a search.
//!
//! Two indirect trees exist per store: one under the uber page keyed by
//! revision number, and one under every revision root keyed by node-page key.

use revdb_common::constants::{
    INDIRECT_FANOUT, INDIRECT_HEIGHT, INDIRECT_LEVEL_EXPONENTS, MAX_INDIRECT_KEY,
};

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::page::{Page, PageReference};
use crate::record::NodeRecord;

/// Radix node holding [`INDIRECT_FANOUT`] child references.
#[derive(Debug, Clone)]
pub struct IndirectPage<N> {
    references: Box<[PageReference<N>]>,
}

impl<N: NodeRecord> Default for IndirectPage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NodeRecord> IndirectPage<N> {
    /// Creates an indirect page with all references empty.
    pub fn new() -> Self {
        Self {
            references: (0..INDIRECT_FANOUT).map(|_| PageReference::new()).collect(),
        }
    }

    /// Number of reference slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.references.len()
    }

    /// Reference at `offset`.
    #[inline]
    pub fn reference(&self, offset: usize) -> Option<&PageReference<N>> {
        self.references.get(offset)
    }

    /// Reference at `offset`, mutably.
    #[inline]
    pub fn reference_mut(&mut self, offset: usize) -> Option<&mut PageReference<N>> {
        self.references.get_mut(offset)
    }

    /// Iterates over non-empty references with their offsets.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &PageReference<N>)> {
        self.references
            .iter()
            .enumerate()
            .filter(|(_, reference)| !reference.is_empty())
    }
}

/// Decomposes `key` into one offset per indirect level, root first.
pub fn level_offsets(key: u64) -> StorageResult<[usize; INDIRECT_HEIGHT]> {
    if key > MAX_INDIRECT_KEY {
        return Err(StorageError::KeyOutOfRange {
            key,
            max: MAX_INDIRECT_KEY,
        });
    }

    let mut remaining = key;
    let mut offsets = [0usize; INDIRECT_HEIGHT];
    for (level, exponent) in INDIRECT_LEVEL_EXPONENTS.iter().enumerate() {
        let offset = remaining >> exponent;
        remaining -= offset << exponent;
        offsets[level] = offset as usize;
    }
    Ok(offsets)
}

/// Walks from `root` to the leaf reference for `key` without modifying
/// anything.
///
/// Returns `None` if the path was never written.
pub fn find_leaf<'a, N: NodeRecord>(
    root: &'a PageReference<N>,
    key: u64,
    backend: &dyn StorageBackend<N>,
) -> StorageResult<Option<&'a PageReference<N>>> {
    let offsets = level_offsets(key)?;
    let mut current = root;
    for offset in offsets {
        if current.is_empty() {
            return Ok(None);
        }
        let indirect = current.resolve(backend)?.as_indirect()?;
        current = indirect
            .reference(offset)
            .ok_or(StorageError::SlotOutOfRange {
                slot: offset,
                capacity: indirect.capacity(),
            })?;
    }
    Ok((!current.is_empty()).then_some(current))
}

/// Walks from `root` to the leaf reference for `key`, making every indirect
/// page on the way private and dirty.
///
/// Missing indirect pages are created. The returned leaf reference is left
/// untouched; the caller decides what to store there.
pub fn prepare_leaf<'a, N: NodeRecord>(
    root: &'a mut PageReference<N>,
    key: u64,
    backend: &dyn StorageBackend<N>,
) -> StorageResult<&'a mut PageReference<N>> {
    let offsets = level_offsets(key)?;
    let mut current = root;
    for offset in offsets {
        let indirect = current
            .prepare_for_modification(backend, || Page::Indirect(IndirectPage::new()))?
            .as_indirect_mut()?;
        let capacity = indirect.capacity();
        current = indirect
            .reference_mut(offset)
            .ok_or(StorageError::SlotOutOfRange {
                slot: offset,
                capacity,
            })?;
    }
    Ok(current)
}
