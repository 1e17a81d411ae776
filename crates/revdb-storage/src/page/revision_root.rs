//! Revision root pages.

use revdb_common::types::{NameKey, NodeKey, PageKey, Revision};

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use crate::page::indirect::find_leaf;
use crate::page::{NamePage, Page, PageReference};
use crate::record::NodeRecord;

/// Root of one revision.
///
/// Holds the revision's counters, its name page, and the indirect tree over
/// its node pages. A write transaction builds the next revision's root by
/// cloning the previous one; the clone shares both subtrees until they are
/// modified.
#[derive(Debug, Clone)]
pub struct RevisionRootPage<N> {
    revision: Revision,
    max_node_key: NodeKey,
    node_count: u64,
    timestamp: u64,
    name_page_ref: PageReference<N>,
    node_indirect_root: PageReference<N>,
}

impl<N: NodeRecord> RevisionRootPage<N> {
    /// Creates the root of an empty revision.
    pub fn new(revision: Revision, timestamp: u64) -> Self {
        Self {
            revision,
            max_node_key: NodeKey::NULL,
            node_count: 0,
            timestamp,
            name_page_ref: PageReference::new(),
            node_indirect_root: PageReference::new(),
        }
    }

    /// Reassembles a root from persisted fields.
    pub fn from_parts(
        revision: Revision,
        max_node_key: NodeKey,
        node_count: u64,
        timestamp: u64,
        name_page_ref: PageReference<N>,
        node_indirect_root: PageReference<N>,
    ) -> Self {
        Self {
            revision,
            max_node_key,
            node_count,
            timestamp,
            name_page_ref,
            node_indirect_root,
        }
    }

    /// Clones this root as the starting point of `revision`.
    pub fn successor(&self, revision: Revision) -> Self {
        Self {
            revision,
            ..self.clone()
        }
    }

    /// Revision number.
    #[inline]
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Highest node key allocated, or [`NodeKey::NULL`] if none.
    #[inline]
    pub fn max_node_key(&self) -> NodeKey {
        self.max_node_key
    }

    /// Live nodes in this revision.
    #[inline]
    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// Commit time in milliseconds since the Unix epoch.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Reference to the name page.
    #[inline]
    pub fn name_page_ref(&self) -> &PageReference<N> {
        &self.name_page_ref
    }

    /// Reference to the name page, mutably.
    #[inline]
    pub fn name_page_ref_mut(&mut self) -> &mut PageReference<N> {
        &mut self.name_page_ref
    }

    /// Root of the node-page indirect tree.
    #[inline]
    pub fn node_indirect_root(&self) -> &PageReference<N> {
        &self.node_indirect_root
    }

    /// Root of the node-page indirect tree, mutably.
    #[inline]
    pub fn node_indirect_root_mut(&mut self) -> &mut PageReference<N> {
        &mut self.node_indirect_root
    }

    /// Sets the commit time.
    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    /// Raises the max node key to `key` if it is higher.
    pub fn record_node_key(&mut self, key: NodeKey) {
        if !self.max_node_key.is_valid() || key > self.max_node_key {
            self.max_node_key = key;
        }
    }

    /// Counts a created node.
    pub fn increment_node_count(&mut self) {
        self.node_count += 1;
    }

    /// Counts a removed node.
    pub fn decrement_node_count(&mut self) {
        self.node_count = self.node_count.saturating_sub(1);
    }

    /// Leaf reference of the node page `page_key`, if it was ever written.
    pub fn node_page_reference<'a>(
        &'a self,
        page_key: PageKey,
        backend: &dyn StorageBackend<N>,
    ) -> StorageResult<Option<&'a PageReference<N>>> {
        find_leaf(&self.node_indirect_root, page_key.as_u64(), backend)
    }

    /// Name interned under `key` in this revision.
    pub fn name(&self, key: NameKey, backend: &dyn StorageBackend<N>) -> StorageResult<Option<String>> {
        if self.name_page_ref.is_empty() {
            return Ok(None);
        }
        let page = self.name_page_ref.resolve(backend)?.as_name()?;
        Ok(page.get(key).map(str::to_owned))
    }

    /// Private, mutable name page of this revision.
    pub fn name_page_mut(&mut self, backend: &dyn StorageBackend<N>) -> StorageResult<&mut NamePage> {
        self.name_page_ref
            .prepare_for_modification(backend, || Page::Name(NamePage::new()))?
            .as_name_mut()
    }
}
