//! Uber pages.

use revdb_common::types::{NodeKey, Revision};

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use crate::page::indirect::{find_leaf, prepare_leaf};
use crate::page::{Page, PageReference, RevisionRootPage};
use crate::record::NodeRecord;

/// Store root of one committed revision.
///
/// Every revision up to `revision_number` is reachable through the indirect
/// tree below `indirect_root`. A published uber page is never modified; the
/// next commit builds a successor that shares everything it does not touch.
#[derive(Debug, Clone)]
pub struct UberPage<N> {
    revision_number: Revision,
    revision_count: u64,
    max_node_key: NodeKey,
    indirect_root: PageReference<N>,
    is_bootstrap: bool,
}

impl<N: NodeRecord> UberPage<N> {
    /// Builds the uber page of a fresh store: revision 0, no nodes.
    ///
    /// The result is dirty and must be committed before it is published.
    pub fn bootstrap(backend: &dyn StorageBackend<N>, timestamp: u64) -> StorageResult<Self> {
        let mut uber = Self {
            revision_number: Revision::BOOTSTRAP,
            revision_count: 1,
            max_node_key: NodeKey::NULL,
            indirect_root: PageReference::new(),
            is_bootstrap: true,
        };
        let root = RevisionRootPage::new(Revision::BOOTSTRAP, timestamp);
        uber.set_revision_root(root, backend)?;
        Ok(uber)
    }

    /// Reassembles an uber page from persisted fields.
    pub fn from_parts(
        revision_number: Revision,
        revision_count: u64,
        max_node_key: NodeKey,
        indirect_root: PageReference<N>,
        is_bootstrap: bool,
    ) -> Self {
        Self {
            revision_number,
            revision_count,
            max_node_key,
            indirect_root,
            is_bootstrap,
        }
    }

    /// Clones this page as the root of the next revision.
    pub fn successor(&self) -> Self {
        let revision_number = self.revision_number.next();
        Self {
            revision_number,
            revision_count: revision_number.as_u64() + 1,
            max_node_key: self.max_node_key,
            indirect_root: self.indirect_root.clone(),
            is_bootstrap: false,
        }
    }

    /// Latest revision reachable from this page.
    #[inline]
    pub fn revision_number(&self) -> Revision {
        self.revision_number
    }

    /// Number of revisions reachable from this page.
    #[inline]
    pub fn revision_count(&self) -> u64 {
        self.revision_count
    }

    /// Highest node key ever allocated in the store.
    #[inline]
    pub fn max_node_key(&self) -> NodeKey {
        self.max_node_key
    }

    /// Returns true for the uber page written at store creation.
    #[inline]
    pub fn is_bootstrap(&self) -> bool {
        self.is_bootstrap
    }

    /// Root of the revision indirect tree.
    #[inline]
    pub fn indirect_root(&self) -> &PageReference<N> {
        &self.indirect_root
    }

    /// Root of the revision indirect tree, mutably.
    #[inline]
    pub fn indirect_root_mut(&mut self) -> &mut PageReference<N> {
        &mut self.indirect_root
    }

    /// Raises the store-wide node key high-water mark.
    pub fn record_node_key(&mut self, key: NodeKey) {
        if key.is_valid() && (!self.max_node_key.is_valid() || key > self.max_node_key) {
            self.max_node_key = key;
        }
    }

    /// Root page of `revision`, if it is reachable from this page.
    pub fn revision_root<'a>(
        &'a self,
        revision: Revision,
        backend: &dyn StorageBackend<N>,
    ) -> StorageResult<Option<&'a RevisionRootPage<N>>> {
        if revision > self.revision_number {
            return Ok(None);
        }
        match find_leaf(&self.indirect_root, revision.as_u64(), backend)? {
            Some(reference) => Ok(Some(reference.resolve(backend)?.as_revision_root()?)),
            None => Ok(None),
        }
    }

    /// Links `root` into the revision tree under its revision number.
    pub fn set_revision_root(
        &mut self,
        root: RevisionRootPage<N>,
        backend: &dyn StorageBackend<N>,
    ) -> StorageResult<()> {
        let leaf = prepare_leaf(&mut self.indirect_root, root.revision().as_u64(), backend)?;
        leaf.set_page(Page::RevisionRoot(root));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::record::TreeNode;

    #[test]
    fn test_bootstrap() {
        let backend = MemoryBackend::<TreeNode>::new();
        let uber = UberPage::bootstrap(&backend, 11).unwrap();
        assert!(uber.is_bootstrap());
        assert_eq!(uber.revision_number(), Revision::BOOTSTRAP);
        assert_eq!(uber.revision_count(), 1);
        assert!(uber.indirect_root().is_dirty());

        let root = uber.revision_root(Revision::BOOTSTRAP, &backend).unwrap().unwrap();
        assert_eq!(root.node_count(), 0);
        assert_eq!(root.timestamp(), 11);
    }

    #[test]
    fn test_successor() {
        let backend = MemoryBackend::<TreeNode>::new();
        let mut uber = UberPage::bootstrap(&backend, 0).unwrap();
        uber.record_node_key(NodeKey::new(9));

        let next = uber.successor();
        assert!(!next.is_bootstrap());
        assert_eq!(next.revision_number(), Revision::new(1));
        assert_eq!(next.revision_count(), 2);
        assert_eq!(next.max_node_key(), NodeKey::new(9));
        assert!(next.revision_root(Revision::new(1), &backend).unwrap().is_none());
        assert!(next.revision_root(Revision::new(0), &backend).unwrap().is_some());
    }

    #[test]
    fn test_revision_beyond_latest() {
        let backend = MemoryBackend::<TreeNode>::new();
        let uber = UberPage::bootstrap(&backend, 0).unwrap();
        assert!(uber.revision_root(Revision::new(3), &backend).unwrap().is_none());
    }
}
