//! Sliding snapshot revisioning.

use revdb_common::config::Revisioning;
use revdb_common::types::{PageKey, Revision};
use revdb_storage::backend::StorageBackend;
use revdb_storage::error::StorageResult;
use revdb_storage::page::PageReference;
use revdb_storage::record::NodeRecord;
use tracing::trace;

use super::{successor_page, RevisioningStrategy};
use crate::chain::VersionChain;
use crate::container::NodePageContainer;

/// The newest `window` versions of a page jointly hold all of its slots.
///
/// When a new version is written and the window is already full, every slot
/// whose newest content lives only in the oldest version is copied forward,
/// because that version is about to leave the window. Versions older than
/// the window are never read again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidingSnapshot {
    window: u32,
}

impl SlidingSnapshot {
    /// Creates the strategy. A window of 0 is treated as 1.
    pub fn new(window: u32) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// Window size.
    pub fn window_size(&self) -> u32 {
        self.window
    }
}

impl<N: NodeRecord> RevisioningStrategy<N> for SlidingSnapshot {
    fn kind(&self) -> Revisioning {
        Revisioning::SlidingSnapshot
    }

    fn window(&self) -> u32 {
        self.window
    }

    fn collect_versions(
        &self,
        latest: &PageReference<N>,
        backend: &dyn StorageBackend<N>,
    ) -> StorageResult<VersionChain<N>> {
        VersionChain::collect(latest, backend, self.window as usize, false)
    }

    fn prepare_modification(
        &self,
        page_key: PageKey,
        chain: &VersionChain<N>,
        revision: Revision,
    ) -> NodePageContainer<N> {
        let complete = chain.merge(page_key);
        let mut modified = successor_page(page_key, chain, revision);

        if chain.len() >= self.window as usize {
            let newer: Vec<_> = chain.versions().take(chain.len() - 1).collect();
            let mut carried = 0usize;
            if let Some(oldest) = chain.oldest() {
                for (slot, content) in oldest.occupied() {
                    let shadowed = newer.iter().any(|page| page.is_occupied(slot));
                    if !shadowed && !content.is_deleted() {
                        let _ = modified.set_slot(slot, content.clone());
                        carried += 1;
                    }
                }
            }
            trace!(%page_key, %revision, carried, "sliding snapshot: carried slots forward");
        }

        NodePageContainer::new(complete, modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revdb_common::types::NodeKey;
    use revdb_storage::backend::MemoryBackend;
    use revdb_storage::page::{NodePage, Page};
    use revdb_storage::record::{NodeSlot, TreeNode};

    fn node(key: u64, value: &str) -> TreeNode {
        let mut node = TreeNode::text(value.to_owned());
        node.key = NodeKey::new(key);
        node
    }

    #[test]
    fn test_slots_leaving_window_are_carried() {
        let strategy = SlidingSnapshot::new(3);
        let backend = MemoryBackend::<TreeNode>::new();
        let mut latest = PageReference::new();

        // r1 writes slots 0 and 1; r2 and r3 only touch slot 1.
        for revision in 1..=3u64 {
            let chain = RevisioningStrategy::<TreeNode>::collect_versions(&strategy, &latest, &backend)
                .unwrap();
            let mut container =
                strategy.prepare_modification(PageKey::new(0), &chain, Revision::new(revision));
            if revision == 1 {
                container.insert_node(0, node(0, "only-in-r1")).unwrap();
                container.insert_node(1, node(1, "r1")).unwrap();
            } else {
                container.prepare_node(1).unwrap().unwrap().set_value(format!("r{revision}"));
            }
            let page = container.into_modified();
            latest = PageReference::persisted(backend.write(&Page::Node(page)).unwrap());
        }

        // r4 pushes r1 out of the window, so slot 0 is carried forward.
        let chain = RevisioningStrategy::<TreeNode>::collect_versions(&strategy, &latest, &backend)
            .unwrap();
        assert_eq!(chain.len(), 3);
        let container = strategy.prepare_modification(PageKey::new(0), &chain, Revision::new(4));
        assert_eq!(
            container.modified().node(0).unwrap().value.as_ref(),
            b"only-in-r1"
        );
        assert!(container.modified().slot(1).is_none());
        assert_eq!(container.node(1).unwrap().value.as_ref(), b"r3");
    }

    #[test]
    fn test_tombstone_in_oldest_is_not_carried() {
        let strategy = SlidingSnapshot::new(1);
        let backend = MemoryBackend::<TreeNode>::new();

        let mut page = NodePage::new(PageKey::new(0), Revision::new(1));
        page.set_slot(0, NodeSlot::Deleted(NodeKey::new(0))).unwrap();
        page.set_slot(1, NodeSlot::Live(node(1, "live"))).unwrap();
        let latest = PageReference::persisted(backend.write(&Page::Node(page)).unwrap());

        let chain = RevisioningStrategy::<TreeNode>::collect_versions(&strategy, &latest, &backend)
            .unwrap();
        let container = strategy.prepare_modification(PageKey::new(0), &chain, Revision::new(2));
        assert!(container.modified().slot(0).is_none());
        assert!(container.modified().node(1).is_some());
    }

    #[test]
    fn test_window_bounds_reads() {
        let strategy = SlidingSnapshot::new(2);
        let backend = MemoryBackend::<TreeNode>::new();
        let mut latest = PageReference::new();
        for revision in 1..=6u64 {
            let chain = RevisioningStrategy::<TreeNode>::collect_versions(&strategy, &latest, &backend)
                .unwrap();
            assert!(chain.len() <= 2);
            let mut container =
                strategy.prepare_modification(PageKey::new(0), &chain, Revision::new(revision));
            container
                .insert_node(revision as usize, node(revision, "x"))
                .unwrap();
            latest = PageReference::persisted(
                backend.write(&Page::Node(container.into_modified())).unwrap(),
            );
        }

        let chain = RevisioningStrategy::<TreeNode>::collect_versions(&strategy, &latest, &backend)
            .unwrap();
        let view = strategy.reconstruct(PageKey::new(0), &chain);
        for slot in 1..=6 {
            assert!(view.node(slot).is_some(), "slot {slot} lost");
        }
    }
}
