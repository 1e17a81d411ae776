//! Node pages.

use revdb_common::constants::NODE_PAGE_SLOTS;
use revdb_common::types::{PageKey, PageLocation, Revision};

use crate::error::{StorageError, StorageResult};
use crate::record::{NodeRecord, NodeSlot};

/// One version of the node slots for a contiguous node-key range.
///
/// A version may be complete or hold only the slots changed in its revision;
/// earlier versions are reached through `previous`. `chain_len` counts the
/// versions between this one and the last complete version (0 for a
/// complete page).
#[derive(Debug, Clone)]
pub struct NodePage<N> {
    page_key: PageKey,
    revision: Revision,
    slots: Box<[Option<NodeSlot<N>>]>,
    previous: Option<PageLocation>,
    chain_len: u32,
}

impl<N: NodeRecord> NodePage<N> {
    /// Creates an empty page.
    pub fn new(page_key: PageKey, revision: Revision) -> Self {
        Self {
            page_key,
            revision,
            slots: (0..NODE_PAGE_SLOTS).map(|_| None).collect(),
            previous: None,
            chain_len: 0,
        }
    }

    /// Key of this page.
    #[inline]
    pub fn page_key(&self) -> PageKey {
        self.page_key
    }

    /// Revision this version was written in.
    #[inline]
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Sets the revision this version belongs to.
    pub fn set_revision(&mut self, revision: Revision) {
        self.revision = revision;
    }

    /// Location of the previous version of this page.
    #[inline]
    pub fn previous(&self) -> Option<PageLocation> {
        self.previous
    }

    /// Links this version to its predecessor.
    pub fn set_previous(&mut self, previous: Option<PageLocation>) {
        self.previous = previous;
    }

    /// Versions between this one and the last complete version.
    #[inline]
    pub fn chain_len(&self) -> u32 {
        self.chain_len
    }

    /// Sets the chain length.
    pub fn set_chain_len(&mut self, chain_len: u32) {
        self.chain_len = chain_len;
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot content, including tombstones.
    #[inline]
    pub fn slot(&self, slot: usize) -> Option<&NodeSlot<N>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Slot content, mutably.
    #[inline]
    pub fn slot_mut(&mut self, slot: usize) -> Option<&mut NodeSlot<N>> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Live node in `slot`.
    #[inline]
    pub fn node(&self, slot: usize) -> Option<&N> {
        self.slot(slot).and_then(NodeSlot::as_live)
    }

    /// Stores `content` in `slot`.
    pub fn set_slot(&mut self, slot: usize, content: NodeSlot<N>) -> StorageResult<()> {
        let capacity = self.slots.len();
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(StorageError::SlotOutOfRange { slot, capacity })?;
        *entry = Some(content);
        Ok(())
    }

    /// Returns true if `slot` is occupied by a node or a tombstone.
    #[inline]
    pub fn is_occupied(&self, slot: usize) -> bool {
        self.slot(slot).is_some()
    }

    /// Iterates over occupied slots with their indices.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &NodeSlot<N>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|slot| (index, slot)))
    }

    /// Number of occupied slots.
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TreeNode;
    use revdb_common::types::NodeKey;

    fn node(key: u64) -> TreeNode {
        let mut node = TreeNode::text(format!("node-{key}"));
        node.key = NodeKey::new(key);
        node
    }

    #[test]
    fn test_new_page_is_empty() {
        let page: NodePage<TreeNode> = NodePage::new(PageKey::new(3), Revision::new(1));
        assert_eq!(page.capacity(), NODE_PAGE_SLOTS);
        assert_eq!(page.occupied_count(), 0);
        assert!(page.previous().is_none());
        assert_eq!(page.chain_len(), 0);
    }

    #[test]
    fn test_set_and_read_slots() {
        let mut page = NodePage::new(PageKey::new(0), Revision::new(1));
        page.set_slot(5, NodeSlot::Live(node(5))).unwrap();
        page.set_slot(6, NodeSlot::Deleted(NodeKey::new(6))).unwrap();

        assert_eq!(page.node(5).unwrap().key, NodeKey::new(5));
        assert!(page.is_occupied(6));
        assert!(page.node(6).is_none());
        assert_eq!(page.occupied().map(|(i, _)| i).collect::<Vec<_>>(), vec![5, 6]);
    }

    #[test]
    fn test_slot_out_of_range() {
        let mut page = NodePage::new(PageKey::new(0), Revision::new(1));
        let result = page.set_slot(NODE_PAGE_SLOTS, NodeSlot::Live(node(0)));
        assert!(matches!(result, Err(StorageError::SlotOutOfRange { .. })));
    }
}
