use std::fmt;
use std::sync::Arc;

use revdb_common::types::{NameKey, NodeKey, PageKey, Revision};
use revdb_mvcc::RevisioningStrategy;
use revdb_storage::backend::StorageBackend;
use revdb_storage::cache::{CacheStats, PageCache};
use revdb_storage::page::{NodePage, RevisionRootPage, UberPage};
use revdb_storage::record::NodeRecord;
use tracing::trace;

use super::{addressable, collect_chain};
use crate::error::{TransactionError, TxnResult};

/// Read-only view of one committed revision.
///
/// Everything reachable from the pinned uber page is immutable, so the view
/// stays identical for its whole lifetime no matter what is committed later.
pub struct ReadTransactionState<N: NodeRecord> {
    backend: Arc<dyn StorageBackend<N>>,
    strategy: Arc<dyn RevisioningStrategy<N>>,
    uber: Arc<UberPage<N>>,
    root: RevisionRootPage<N>,
    pages: PageCache<PageKey, NodePage<N>>,
}

impl<N: NodeRecord> ReadTransactionState<N> {
    /// Pins `revision` of the store rooted at `uber`.
    pub fn new(
        backend: Arc<dyn StorageBackend<N>>,
        strategy: Arc<dyn RevisioningStrategy<N>>,
        uber: Arc<UberPage<N>>,
        revision: Revision,
        cache_capacity: usize,
    ) -> TxnResult<Self> {
        let root = uber
            .revision_root(revision, backend.as_ref())?
            .cloned()
            .ok_or(TransactionError::InvalidRevision {
                requested: revision.as_u64(),
                latest: uber.revision_number(),
            })?;
        Ok(Self {
            backend,
            strategy,
            uber,
            root,
            pages: PageCache::new(cache_capacity),
        })
    }

    /// Revision this view is pinned to.
    pub fn revision_number(&self) -> Revision {
        self.root.revision()
    }

    /// Commit time of the revision in milliseconds since the Unix epoch.
    pub fn revision_timestamp(&self) -> u64 {
        self.root.timestamp()
    }

    /// Live nodes in the revision.
    pub fn node_count(&self) -> u64 {
        self.root.node_count()
    }

    /// Highest node key allocated up to this revision.
    pub fn max_node_key(&self) -> NodeKey {
        self.root.max_node_key()
    }

    /// Uber page the view was opened from.
    pub fn uber(&self) -> &Arc<UberPage<N>> {
        &self.uber
    }

    /// Node stored under `key`, if it is live in this revision.
    pub fn get_node(&self, key: NodeKey) -> TxnResult<Option<N>> {
        if !addressable(key) {
            return Ok(None);
        }
        let page = self.node_page(key.page_key())?;
        Ok(page.node(key.slot()).cloned())
    }

    /// Name interned under `key` in this revision.
    pub fn get_name(&self, key: NameKey) -> TxnResult<Option<String>> {
        Ok(self.root.name(key, self.backend.as_ref())?)
    }

    /// Hit and miss counters of the reconstructed-page cache.
    pub fn cache_stats(&self) -> &CacheStats {
        self.pages.stats()
    }

    fn node_page(&self, page_key: PageKey) -> TxnResult<Arc<NodePage<N>>> {
        if let Some(page) = self.pages.get(&page_key) {
            return Ok(page);
        }
        let chain = collect_chain(
            &self.root,
            page_key,
            self.backend.as_ref(),
            self.strategy.as_ref(),
        )?;
        trace!(%page_key, versions = chain.len(), "reconstructing node page");
        let page = self.strategy.reconstruct(page_key, &chain);
        Ok(self.pages.insert(page_key, page))
    }
}

impl<N: NodeRecord> fmt::Debug for ReadTransactionState<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadTransactionState")
            .field("revision", &self.root.revision())
            .field("node_count", &self.root.node_count())
            .field("cached_pages", &self.pages.len())
            .finish()
    }
}
