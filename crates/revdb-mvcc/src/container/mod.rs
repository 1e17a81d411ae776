//! Read view and write copy of one node page.

use revdb_common::types::{NodeKey, PageKey, Revision};
use revdb_storage::error::StorageResult;
use revdb_storage::page::NodePage;
use revdb_storage::record::{NodeRecord, NodeSlot};

/// Pair of node pages a write transaction holds for one page key.
///
/// `complete` is the reconstructed view of the page as of the revision the
/// transaction started from. `modified` is the version being built for the
/// pending revision. Lookups consult `modified` first.
#[derive(Debug, Clone)]
pub struct NodePageContainer<N> {
    complete: NodePage<N>,
    modified: NodePage<N>,
}

impl<N: NodeRecord> NodePageContainer<N> {
    /// Creates a container from its two views.
    pub fn new(complete: NodePage<N>, modified: NodePage<N>) -> Self {
        Self { complete, modified }
    }

    /// Container for a page key that has no history.
    pub fn empty(page_key: PageKey, revision: Revision) -> Self {
        Self::new(
            NodePage::new(page_key, revision),
            NodePage::new(page_key, revision),
        )
    }

    /// Key of the page.
    pub fn page_key(&self) -> PageKey {
        self.modified.page_key()
    }

    /// Reconstructed read view.
    pub fn complete(&self) -> &NodePage<N> {
        &self.complete
    }

    /// Version being built.
    pub fn modified(&self) -> &NodePage<N> {
        &self.modified
    }

    /// Consumes the container, returning the version to persist.
    pub fn into_modified(self) -> NodePage<N> {
        self.modified
    }

    /// Slot content as seen by the writer, tombstones included.
    pub fn slot(&self, slot: usize) -> Option<&NodeSlot<N>> {
        self.modified.slot(slot).or_else(|| self.complete.slot(slot))
    }

    /// Live node in `slot` as seen by the writer.
    pub fn node(&self, slot: usize) -> Option<&N> {
        self.slot(slot).and_then(NodeSlot::as_live)
    }

    /// Copies the node in `slot` into the modified version if it is not
    /// there yet and returns it for mutation.
    ///
    /// Returns `None` if the slot is empty or holds a tombstone.
    pub fn prepare_node(&mut self, slot: usize) -> StorageResult<Option<&mut N>> {
        if !self.modified.is_occupied(slot) {
            if let Some(content) = self.complete.slot(slot).cloned() {
                self.modified.set_slot(slot, content)?;
            }
        }
        Ok(self.modified.slot_mut(slot).and_then(NodeSlot::as_live_mut))
    }

    /// Places a new node in `slot`.
    pub fn insert_node(&mut self, slot: usize, node: N) -> StorageResult<()> {
        self.modified.set_slot(slot, NodeSlot::Live(node))
    }

    /// Tombstones `slot` in both views.
    pub fn remove_node(&mut self, slot: usize, key: NodeKey) -> StorageResult<()> {
        self.complete.set_slot(slot, NodeSlot::Deleted(key))?;
        self.modified.set_slot(slot, NodeSlot::Deleted(key))
    }
}
