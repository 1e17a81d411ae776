//! Version chains of node pages.
//!
//! ```text
//! leaf reference
//!   └─ version r7 ─previous→ version r5 ─previous→ version r2 ─previous→ ...
//!      (newest)                                     (oldest needed)
//! ```
//!
//! Only as many versions as the strategy needs are loaded. Older versions
//! are read straight from the backend and not cached on any reference, so a
//! chain never keeps history alive beyond the reconstruction that used it.

use std::sync::Arc;

use revdb_common::types::{PageKey, PageLocation, Revision};
use revdb_storage::backend::StorageBackend;
use revdb_storage::error::StorageResult;
use revdb_storage::page::{NodePage, Page, PageReference};
use revdb_storage::record::NodeRecord;
use tracing::trace;

/// Stored versions of one node page, newest first.
#[derive(Debug, Clone)]
pub struct VersionChain<N> {
    versions: Vec<Arc<Page<N>>>,
    latest_location: Option<PageLocation>,
}

impl<N: NodeRecord> VersionChain<N> {
    /// A chain for a page that has never been written.
    pub fn empty() -> Self {
        Self {
            versions: Vec::new(),
            latest_location: None,
        }
    }

    /// Loads versions starting at `latest`.
    ///
    /// Stops after `max_versions` versions, at the first complete version
    /// when `stop_at_complete` is set, or when the history runs out.
    pub fn collect(
        latest: &PageReference<N>,
        backend: &dyn StorageBackend<N>,
        max_versions: usize,
        stop_at_complete: bool,
    ) -> StorageResult<Self> {
        if latest.is_empty() {
            return Ok(Self::empty());
        }

        let mut versions = Vec::with_capacity(max_versions);
        let mut page = Arc::clone(latest.resolve(backend)?);
        loop {
            let node = page.as_node()?;
            let previous = node.previous();
            let complete = node.chain_len() == 0;
            versions.push(page);

            if versions.len() >= max_versions || (stop_at_complete && complete) {
                break;
            }
            match previous {
                Some(location) => page = Arc::new(backend.read_page(location)?),
                None => break,
            }
        }

        trace!(versions = versions.len(), "collected node page versions");
        Ok(Self {
            versions,
            latest_location: latest.location(),
        })
    }

    /// Number of versions loaded.
    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Returns true if the page has no stored version.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Location of the newest version; the predecessor of the next one.
    #[inline]
    pub fn latest_location(&self) -> Option<PageLocation> {
        self.latest_location
    }

    /// Versions, newest first.
    pub fn versions(&self) -> impl Iterator<Item = &NodePage<N>> {
        self.versions.iter().filter_map(|page| page.as_node().ok())
    }

    /// Newest version.
    pub fn latest(&self) -> Option<&NodePage<N>> {
        self.versions().next()
    }

    /// Oldest loaded version.
    pub fn oldest(&self) -> Option<&NodePage<N>> {
        self.versions().last()
    }

    /// Combines all loaded versions, the newest occupant of each slot
    /// winning. Tombstones are kept so they keep masking older content.
    pub fn merge(&self, page_key: PageKey) -> NodePage<N> {
        let revision = self
            .latest()
            .map_or(Revision::BOOTSTRAP, NodePage::revision);
        let mut merged = NodePage::new(page_key, revision);
        for version in self.versions() {
            for (slot, content) in version.occupied() {
                if !merged.is_occupied(slot) {
                    // Slots come from a page of the same geometry.
                    let _ = merged.set_slot(slot, content.clone());
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revdb_common::types::NodeKey;
    use revdb_storage::backend::MemoryBackend;
    use revdb_storage::record::{NodeSlot, TreeNode};

    fn live(key: u64, value: &str) -> NodeSlot<TreeNode> {
        let mut node = TreeNode::text(value.to_owned());
        node.key = NodeKey::new(key);
        NodeSlot::Live(node)
    }

    /// Writes versions oldest first; each entry is (chain_len, slots).
    fn write_chain(
        backend: &MemoryBackend<TreeNode>,
        versions: &[(u32, Vec<(usize, NodeSlot<TreeNode>)>)],
    ) -> PageReference<TreeNode> {
        let mut previous = None;
        for (revision, (chain_len, slots)) in versions.iter().enumerate() {
            let mut page = NodePage::new(PageKey::new(0), Revision::new(revision as u64 + 1));
            page.set_chain_len(*chain_len);
            page.set_previous(previous);
            for (slot, content) in slots {
                page.set_slot(*slot, content.clone()).unwrap();
            }
            previous = Some(backend.write(&Page::Node(page)).unwrap());
        }
        PageReference::persisted(previous.unwrap())
    }

    #[test]
    fn test_empty_reference() {
        let backend = MemoryBackend::<TreeNode>::new();
        let chain = VersionChain::collect(&PageReference::new(), &backend, 4, false).unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.merge(PageKey::new(0)).occupied_count(), 0);
    }

    #[test]
    fn test_collect_respects_limit() {
        let backend = MemoryBackend::<TreeNode>::new();
        let latest = write_chain(
            &backend,
            &[
                (0, vec![(0, live(0, "a"))]),
                (1, vec![(1, live(1, "b"))]),
                (2, vec![(2, live(2, "c"))]),
                (3, vec![(3, live(3, "d"))]),
            ],
        );

        let chain = VersionChain::collect(&latest, &backend, 2, false).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.latest().unwrap().revision(), Revision::new(4));
        assert_eq!(chain.oldest().unwrap().revision(), Revision::new(3));
    }

    #[test]
    fn test_collect_stops_at_complete() {
        let backend = MemoryBackend::<TreeNode>::new();
        let latest = write_chain(
            &backend,
            &[
                (0, vec![(0, live(0, "a"))]),
                (0, vec![(0, live(0, "a2")), (1, live(1, "b"))]),
                (1, vec![(2, live(2, "c"))]),
            ],
        );

        let chain = VersionChain::collect(&latest, &backend, 10, true).unwrap();
        assert_eq!(chain.len(), 2);
        let merged = chain.merge(PageKey::new(0));
        assert_eq!(merged.node(0).unwrap().value.as_ref(), b"a2");
        assert!(merged.node(1).is_some());
        assert!(merged.node(2).is_some());
    }

    #[test]
    fn test_merge_newest_wins_and_tombstones_mask() {
        let backend = MemoryBackend::<TreeNode>::new();
        let latest = write_chain(
            &backend,
            &[
                (0, vec![(0, live(0, "old")), (1, live(1, "gone"))]),
                (1, vec![(0, live(0, "new")), (1, NodeSlot::Deleted(NodeKey::new(1)))]),
            ],
        );

        let chain = VersionChain::collect(&latest, &backend, 10, false).unwrap();
        let merged = chain.merge(PageKey::new(0));
        assert_eq!(merged.node(0).unwrap().value.as_ref(), b"new");
        assert!(merged.node(1).is_none());
        assert!(merged.slot(1).unwrap().is_deleted());
        assert_eq!(chain.latest_location(), latest.location());
    }
}
