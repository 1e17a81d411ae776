use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use revdb_common::constants::MAX_NODE_KEY;
use revdb_common::types::{NameKey, NodeKey, PageKey, Revision};
use revdb_mvcc::{NodePageContainer, RevisioningStrategy};
use revdb_storage::backend::StorageBackend;
use revdb_storage::page::indirect::prepare_leaf;
use revdb_storage::page::{Page, RevisionRootPage, UberPage};
use revdb_storage::record::NodeRecord;
use tracing::{debug, info, warn};

use super::{addressable, collect_chain, now_millis, write_uber};
use crate::error::{TransactionError, TxnResult};
use crate::log::TransactionLog;

/// Outcome of one successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitStats {
    /// Revision that was published.
    pub revision: Revision,
    /// Pages written, including indirect pages and the uber page.
    pub pages_written: usize,
    /// Node pages written.
    pub node_pages: usize,
    /// Wall time spent in the commit.
    pub elapsed: Duration,
}

/// Pending revision of the single writer.
///
/// Starts as a successor of the last committed uber page. Node pages are
/// copied into the transaction log on first touch; the revision root, the
/// name page and the indirect trees are copied on write as they are
/// modified. Nothing is shared with readers until [`commit`] publishes.
///
/// A failed commit poisons the state: every operation except [`abort`]
/// fails until it is aborted.
///
/// [`commit`]: WriteTransactionState::commit
/// [`abort`]: WriteTransactionState::abort
pub struct WriteTransactionState<N: NodeRecord> {
    backend: Arc<dyn StorageBackend<N>>,
    strategy: Arc<dyn RevisioningStrategy<N>>,
    keys: Arc<AtomicU64>,
    base: Arc<UberPage<N>>,
    uber: UberPage<N>,
    root: RevisionRootPage<N>,
    log: TransactionLog<N>,
    modifications: u64,
    poisoned: bool,
}

impl<N: NodeRecord> WriteTransactionState<N> {
    /// Opens the revision following `base`.
    ///
    /// `keys` holds the next node key to hand out and is shared by every
    /// writer of the session.
    pub fn new(
        backend: Arc<dyn StorageBackend<N>>,
        strategy: Arc<dyn RevisioningStrategy<N>>,
        keys: Arc<AtomicU64>,
        base: Arc<UberPage<N>>,
    ) -> TxnResult<Self> {
        let (uber, root) = pending_revision(&base, base.revision_number(), backend.as_ref())?;
        Ok(Self {
            backend,
            strategy,
            keys,
            base,
            uber,
            root,
            log: TransactionLog::new(),
            modifications: 0,
            poisoned: false,
        })
    }

    /// Revision the next commit will publish.
    pub fn revision_number(&self) -> Revision {
        self.uber.revision_number()
    }

    /// Last committed revision this state builds on.
    pub fn base_revision(&self) -> Revision {
        self.base.revision_number()
    }

    /// Live nodes in the pending revision.
    pub fn node_count(&self) -> u64 {
        self.root.node_count()
    }

    /// Highest node key present in the pending revision.
    pub fn max_node_key(&self) -> NodeKey {
        self.root.max_node_key()
    }

    /// Modifications since the last commit, abort or revert.
    pub fn modification_count(&self) -> u64 {
        self.modifications
    }

    /// Node pages touched since the last commit.
    pub fn touched_pages(&self) -> usize {
        self.log.len()
    }

    /// Returns true after a failed commit.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Node prepared for modification and not yet finished.
    pub fn in_flight(&self) -> Option<NodeKey> {
        self.log.in_flight()
    }

    /// Stores `record` under a fresh node key and returns the key.
    pub fn create_node(&mut self, mut record: N) -> TxnResult<NodeKey> {
        self.ensure_writable()?;
        let key = self.allocate_key()?;
        record.set_node_key(key);

        self.container(key.page_key())?
            .insert_node(key.slot(), record)?;
        self.root.record_node_key(key);
        self.uber.record_node_key(key);
        self.root.increment_node_count();
        self.modifications += 1;
        Ok(key)
    }

    /// Returns a private copy of node `key` to modify in place.
    ///
    /// The modification must be ended with
    /// [`finish_node_modification`](Self::finish_node_modification) before
    /// another node can be prepared.
    pub fn prepare_node_for_modification(&mut self, key: NodeKey) -> TxnResult<&mut N> {
        self.ensure_writable()?;
        if let Some(in_flight) = self.log.in_flight() {
            return Err(TransactionError::NestedModification { in_flight });
        }

        let page_key = key.page_key();
        self.existing_container(key)?;
        self.log.begin_modification(key)?;
        self.modifications += 1;
        self.log
            .get_mut(page_key)
            .ok_or(TransactionError::NodeNotFound { key })?
            .prepare_node(key.slot())?
            .ok_or(TransactionError::NodeNotFound { key })
    }

    /// Ends the modification started by
    /// [`prepare_node_for_modification`](Self::prepare_node_for_modification).
    pub fn finish_node_modification(&mut self, key: NodeKey) -> TxnResult<()> {
        self.log.finish_modification(key)
    }

    /// Stores `node` as the new content of the node being modified and ends
    /// the modification.
    pub fn finish_node_modification_with(&mut self, key: NodeKey, node: &N) -> TxnResult<()> {
        if self.log.in_flight() != Some(key) {
            return Err(TransactionError::NotInFlight { key });
        }
        let target = self
            .log
            .get_mut(key.page_key())
            .ok_or(TransactionError::NotInFlight { key })?
            .prepare_node(key.slot())?
            .ok_or(TransactionError::NodeNotFound { key })?;
        target.clone_from(node);
        target.set_node_key(key);
        self.log.finish_modification(key)
    }

    /// Removes node `key` from the pending revision.
    pub fn remove_node(&mut self, key: NodeKey) -> TxnResult<()> {
        self.ensure_writable()?;
        if let Some(in_flight) = self.log.in_flight() {
            return Err(TransactionError::NestedModification { in_flight });
        }

        self.existing_container(key)?.remove_node(key.slot(), key)?;
        self.root.decrement_node_count();
        self.modifications += 1;
        Ok(())
    }

    /// Node `key` as this transaction sees it, uncommitted changes included.
    pub fn get_node(&self, key: NodeKey) -> TxnResult<Option<N>> {
        if !addressable(key) {
            return Ok(None);
        }
        let page_key = key.page_key();
        if let Some(container) = self.log.get(page_key) {
            return Ok(container.node(key.slot()).cloned());
        }

        let chain = collect_chain(
            &self.root,
            page_key,
            self.backend.as_ref(),
            self.strategy.as_ref(),
        )?;
        let page = self.strategy.reconstruct(page_key, &chain);
        Ok(page.node(key.slot()).cloned())
    }

    /// Interns `name`, reusing its key if the pending name page has it.
    pub fn intern_name(&mut self, name: &str) -> TxnResult<NameKey> {
        self.ensure_writable()?;
        let names = self.root.name_page_ref();
        if !names.is_empty() {
            let page = names.resolve(self.backend.as_ref())?.as_name()?;
            if let Some(key) = page.lookup(name) {
                return Ok(key);
            }
        }
        Ok(self.root.name_page_mut(self.backend.as_ref())?.intern(name))
    }

    /// Name interned under `key` in the pending revision.
    pub fn get_name(&self, key: NameKey) -> TxnResult<Option<String>> {
        Ok(self.root.name(key, self.backend.as_ref())?)
    }

    /// Writes the pending revision and returns the published uber page.
    ///
    /// On success the state moves on to the next revision and stays usable.
    /// On failure nothing is published and the state is poisoned.
    pub fn commit(&mut self) -> TxnResult<(Arc<UberPage<N>>, CommitStats)> {
        self.ensure_writable()?;
        if let Some(in_flight) = self.log.in_flight() {
            return Err(TransactionError::NestedModification { in_flight });
        }

        let started = Instant::now();
        let revision = self.uber.revision_number();
        match self.write_revision() {
            Ok((published, pages_written, node_pages)) => {
                let stats = CommitStats {
                    revision,
                    pages_written,
                    node_pages,
                    elapsed: started.elapsed(),
                };
                self.advance(Arc::clone(&published));
                Ok((published, stats))
            }
            Err(e) => {
                self.poisoned = true;
                warn!(%revision, error = %e, "commit failed; transaction must be aborted");
                Err(e)
            }
        }
    }

    /// Replaces the pending revision with a copy of committed `revision`.
    ///
    /// The next commit publishes a new revision whose content equals
    /// `revision`; history is never removed.
    pub fn revert_to(&mut self, revision: u64) -> TxnResult<()> {
        self.ensure_writable()?;
        if let Some(in_flight) = self.log.in_flight() {
            return Err(TransactionError::NestedModification { in_flight });
        }
        let latest = self.base.revision_number();
        if revision > latest.as_u64() {
            return Err(TransactionError::InvalidRevision {
                requested: revision,
                latest,
            });
        }

        let (uber, root) =
            pending_revision(&self.base, Revision::new(revision), self.backend.as_ref())?;
        self.uber = uber;
        self.root = root;
        self.log.clear();
        self.modifications = 1;
        info!(
            source = revision,
            pending = %self.uber.revision_number(),
            "reverted pending revision"
        );
        Ok(())
    }

    /// Discards every uncommitted change. Always succeeds.
    pub fn abort(&mut self) {
        let discarded = self.log.len();
        self.log.clear();
        self.modifications = 0;
        match pending_revision(&self.base, self.base.revision_number(), self.backend.as_ref()) {
            Ok((uber, root)) => {
                self.uber = uber;
                self.root = root;
                self.poisoned = false;
            }
            Err(e) => {
                self.poisoned = true;
                warn!(error = %e, "could not reopen pending revision after abort");
            }
        }
        debug!(discarded_pages = discarded, "aborted pending revision");
    }

    fn ensure_writable(&self) -> TxnResult<()> {
        if self.poisoned {
            return Err(TransactionError::Poisoned);
        }
        Ok(())
    }

    fn allocate_key(&self) -> TxnResult<NodeKey> {
        let raw = self.keys.fetch_add(1, Ordering::SeqCst);
        if raw > MAX_NODE_KEY {
            return Err(TransactionError::KeysExhausted);
        }
        Ok(NodeKey::new(raw))
    }

    /// Container of `page_key`, prepared by the strategy on first touch.
    fn container(&mut self, page_key: PageKey) -> TxnResult<&mut NodePageContainer<N>> {
        let revision = self.uber.revision_number();
        let Self {
            log,
            root,
            backend,
            strategy,
            ..
        } = self;
        log.get_or_create(page_key, || {
            let chain = collect_chain(&*root, page_key, backend.as_ref(), strategy.as_ref())?;
            Ok(strategy.prepare_modification(page_key, &chain, revision))
        })
    }

    /// Container holding live node `key`.
    ///
    /// A page is only added to the log once the node is known to exist, so
    /// a lookup of a missing node leaves nothing to write on commit.
    fn existing_container(&mut self, key: NodeKey) -> TxnResult<&mut NodePageContainer<N>> {
        if !addressable(key) {
            return Err(TransactionError::NodeNotFound { key });
        }
        let page_key = key.page_key();
        if !self.log.contains(page_key) {
            let chain = collect_chain(
                &self.root,
                page_key,
                self.backend.as_ref(),
                self.strategy.as_ref(),
            )?;
            let revision = self.uber.revision_number();
            let container = self
                .strategy
                .prepare_modification(page_key, &chain, revision);
            if container.node(key.slot()).is_none() {
                return Err(TransactionError::NodeNotFound { key });
            }
            self.log.put(container);
        }

        let container = self
            .log
            .get_mut(page_key)
            .ok_or(TransactionError::NodeNotFound { key })?;
        if container.node(key.slot()).is_none() {
            return Err(TransactionError::NodeNotFound { key });
        }
        Ok(container)
    }

    /// Links every logged node page into the pending root and persists the
    /// whole revision. Returns the published uber page, the number of pages
    /// written and the number of node pages among them.
    fn write_revision(&mut self) -> TxnResult<(Arc<UberPage<N>>, usize, usize)> {
        let backend = Arc::clone(&self.backend);
        let revision = self.uber.revision_number();

        let mut node_pages = 0;
        for (page_key, container) in self.log.drain() {
            let leaf = prepare_leaf(
                self.root.node_indirect_root_mut(),
                page_key.as_u64(),
                backend.as_ref(),
            )?;
            leaf.set_page(Page::Node(container.into_modified()));
            node_pages += 1;
        }
        self.root.set_timestamp(now_millis());

        let root = std::mem::replace(&mut self.root, RevisionRootPage::new(revision, 0));
        let mut uber = std::mem::replace(&mut self.uber, self.base.successor());
        uber.set_revision_root(root, backend.as_ref())?;

        let (published, pages_written) = write_uber(uber, backend.as_ref())?;
        Ok((published, pages_written, node_pages))
    }

    /// Moves on to the revision after the just published `base`.
    fn advance(&mut self, base: Arc<UberPage<N>>) {
        self.base = base;
        self.log.clear();
        self.modifications = 0;
        match pending_revision(&self.base, self.base.revision_number(), self.backend.as_ref()) {
            Ok((uber, root)) => {
                self.uber = uber;
                self.root = root;
            }
            Err(e) => {
                self.poisoned = true;
                warn!(error = %e, "could not open the revision after a commit");
            }
        }
    }
}

impl<N: NodeRecord> fmt::Debug for WriteTransactionState<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteTransactionState")
            .field("base", &self.base.revision_number())
            .field("pending", &self.uber.revision_number())
            .field("touched_pages", &self.log.len())
            .field("modifications", &self.modifications)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

/// Successor uber page of `base` and a fresh root seeded from `source`.
fn pending_revision<N: NodeRecord>(
    base: &UberPage<N>,
    source: Revision,
    backend: &dyn StorageBackend<N>,
) -> TxnResult<(UberPage<N>, RevisionRootPage<N>)> {
    let uber = base.successor();
    let root = base
        .revision_root(source, backend)?
        .ok_or(TransactionError::InvalidRevision {
            requested: source.as_u64(),
            latest: base.revision_number(),
        })?
        .successor(uber.revision_number());
    Ok((uber, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{bootstrap, ReadTransactionState};
    use revdb_common::config::{Revisioning, StoreConfig};
    use revdb_mvcc::strategy_for;
    use revdb_storage::backend::MemoryBackend;
    use revdb_storage::record::TreeNode;

    struct Fixture {
        backend: Arc<dyn StorageBackend<TreeNode>>,
        strategy: Arc<dyn RevisioningStrategy<TreeNode>>,
        keys: Arc<AtomicU64>,
        published: Arc<UberPage<TreeNode>>,
    }

    impl Fixture {
        fn new(revisioning: Revisioning, window: u32) -> Self {
            let backend: Arc<dyn StorageBackend<TreeNode>> = Arc::new(MemoryBackend::new());
            let strategy = Arc::from(strategy_for(&StoreConfig::new(revisioning, window)));
            let published = bootstrap(backend.as_ref()).unwrap();
            Self {
                backend,
                strategy,
                keys: Arc::new(AtomicU64::new(0)),
                published,
            }
        }

        fn writer(&self) -> WriteTransactionState<TreeNode> {
            WriteTransactionState::new(
                Arc::clone(&self.backend),
                Arc::clone(&self.strategy),
                Arc::clone(&self.keys),
                Arc::clone(&self.published),
            )
            .unwrap()
        }

        fn reader(&self, revision: u64) -> ReadTransactionState<TreeNode> {
            ReadTransactionState::new(
                Arc::clone(&self.backend),
                Arc::clone(&self.strategy),
                Arc::clone(&self.published),
                Revision::new(revision),
                8,
            )
            .unwrap()
        }

        fn commit(&mut self, writer: &mut WriteTransactionState<TreeNode>) -> CommitStats {
            let (published, stats) = writer.commit().unwrap();
            self.published = published;
            stats
        }
    }

    fn text(value: &str) -> TreeNode {
        TreeNode::text(value.to_owned())
    }

    fn value_of(node: Option<TreeNode>) -> Option<String> {
        node.map(|n| String::from_utf8_lossy(&n.value).into_owned())
    }

    #[test]
    fn test_create_and_commit() {
        let mut fx = Fixture::new(Revisioning::Incremental, 4);
        let mut writer = fx.writer();
        assert_eq!(writer.revision_number(), Revision::new(1));

        let key = writer.create_node(text("a")).unwrap();
        assert_eq!(key, NodeKey::new(0));
        assert_eq!(value_of(writer.get_node(key).unwrap()).as_deref(), Some("a"));
        assert_eq!(writer.modification_count(), 1);

        let stats = fx.commit(&mut writer);
        assert_eq!(stats.revision, Revision::new(1));
        assert_eq!(stats.node_pages, 1);
        assert_eq!(fx.published.revision_number(), Revision::new(1));
        assert_eq!(fx.published.max_node_key(), key);

        // The writer moved on to the next revision.
        assert_eq!(writer.revision_number(), Revision::new(2));
        assert_eq!(writer.modification_count(), 0);
        assert_eq!(writer.node_count(), 1);

        let reader = fx.reader(1);
        assert_eq!(reader.node_count(), 1);
        assert!(reader.revision_timestamp() > 0);
        assert_eq!(value_of(reader.get_node(key).unwrap()).as_deref(), Some("a"));
        assert!(fx.reader(0).get_node(key).unwrap().is_none());
    }

    #[test]
    fn test_modify_in_place() {
        let mut fx = Fixture::new(Revisioning::SlidingSnapshot, 3);
        let mut writer = fx.writer();
        let key = writer.create_node(text("old")).unwrap();
        fx.commit(&mut writer);

        writer.prepare_node_for_modification(key).unwrap().set_value("new");
        let nested = writer.prepare_node_for_modification(key);
        assert!(matches!(
            nested,
            Err(TransactionError::NestedModification { .. })
        ));
        assert!(matches!(
            writer.commit(),
            Err(TransactionError::NestedModification { .. })
        ));
        writer.finish_node_modification(key).unwrap();

        assert_eq!(value_of(writer.get_node(key).unwrap()).as_deref(), Some("new"));
        assert_eq!(
            value_of(fx.reader(1).get_node(key).unwrap()).as_deref(),
            Some("old")
        );

        fx.commit(&mut writer);
        assert_eq!(
            value_of(fx.reader(2).get_node(key).unwrap()).as_deref(),
            Some("new")
        );
    }

    #[test]
    fn test_finish_with_copy() {
        let mut fx = Fixture::new(Revisioning::Incremental, 2);
        let mut writer = fx.writer();
        let key = writer.create_node(text("a")).unwrap();
        fx.commit(&mut writer);

        let mut copy = writer.prepare_node_for_modification(key).unwrap().clone();
        copy.set_value("b");
        let other = NodeKey::new(99);
        assert!(matches!(
            writer.finish_node_modification_with(other, &copy),
            Err(TransactionError::NotInFlight { .. })
        ));
        writer.finish_node_modification_with(key, &copy).unwrap();
        assert!(writer.in_flight().is_none());
        assert_eq!(value_of(writer.get_node(key).unwrap()).as_deref(), Some("b"));
    }

    #[test]
    fn test_prepare_missing_node() {
        let fx = Fixture::new(Revisioning::Incremental, 2);
        let mut writer = fx.writer();
        let result = writer.prepare_node_for_modification(NodeKey::new(5));
        assert!(matches!(result, Err(TransactionError::NodeNotFound { .. })));
        assert!(writer.in_flight().is_none());
    }

    #[test]
    fn test_missing_node_touches_no_page() {
        let mut fx = Fixture::new(Revisioning::Incremental, 3);
        let mut writer = fx.writer();
        writer.create_node(text("a")).unwrap();
        fx.commit(&mut writer);

        // Empty slot on a stored page, then a page that was never written.
        for missing in [NodeKey::new(5), NodeKey::new(1_000_000)] {
            assert!(matches!(
                writer.prepare_node_for_modification(missing),
                Err(TransactionError::NodeNotFound { .. })
            ));
            assert!(matches!(
                writer.remove_node(missing),
                Err(TransactionError::NodeNotFound { .. })
            ));
        }
        assert_eq!(writer.touched_pages(), 0);
        assert_eq!(writer.modification_count(), 0);
        assert!(writer.in_flight().is_none());

        let stats = fx.commit(&mut writer);
        assert_eq!(stats.node_pages, 0);
        assert_eq!(fx.reader(2).node_count(), 1);
    }

    #[test]
    fn test_remove_node() {
        let mut fx = Fixture::new(Revisioning::Incremental, 3);
        let mut writer = fx.writer();
        let a = writer.create_node(text("a")).unwrap();
        let b = writer.create_node(text("b")).unwrap();
        fx.commit(&mut writer);

        writer.remove_node(a).unwrap();
        assert!(writer.get_node(a).unwrap().is_none());
        assert_eq!(writer.node_count(), 1);
        assert!(matches!(
            writer.remove_node(a),
            Err(TransactionError::NodeNotFound { .. })
        ));
        fx.commit(&mut writer);

        let reader = fx.reader(2);
        assert_eq!(reader.node_count(), 1);
        assert!(reader.get_node(a).unwrap().is_none());
        assert!(reader.get_node(b).unwrap().is_some());
        assert!(fx.reader(1).get_node(a).unwrap().is_some());
    }

    #[test]
    fn test_intern_name() {
        let mut fx = Fixture::new(Revisioning::Incremental, 3);
        let mut writer = fx.writer();
        let key = writer.intern_name("item").unwrap();
        assert_eq!(writer.intern_name("item").unwrap(), key);
        assert_eq!(writer.get_name(key).unwrap().as_deref(), Some("item"));
        fx.commit(&mut writer);

        // A known name does not dirty the name page.
        assert_eq!(writer.intern_name("item").unwrap(), key);
        assert_eq!(fx.reader(1).get_name(key).unwrap().as_deref(), Some("item"));
        assert!(fx.reader(0).get_name(key).unwrap().is_none());
    }

    #[test]
    fn test_abort_discards_changes() {
        let mut fx = Fixture::new(Revisioning::Incremental, 3);
        let mut writer = fx.writer();
        let first = writer.create_node(text("a")).unwrap();
        writer.abort();

        assert!(writer.get_node(first).unwrap().is_none());
        assert_eq!(writer.node_count(), 0);
        assert_eq!(writer.touched_pages(), 0);

        // Keys are not reused after an abort.
        let second = writer.create_node(text("b")).unwrap();
        assert!(second > first);
        fx.commit(&mut writer);
        assert_eq!(fx.published.revision_number(), Revision::new(1));
    }

    #[test]
    fn test_revert_to() {
        let mut fx = Fixture::new(Revisioning::Incremental, 2);
        let mut writer = fx.writer();
        let key = writer.create_node(text("v1")).unwrap();
        fx.commit(&mut writer);
        writer.prepare_node_for_modification(key).unwrap().set_value("v2");
        writer.finish_node_modification(key).unwrap();
        writer.create_node(text("extra")).unwrap();
        fx.commit(&mut writer);

        assert!(matches!(
            writer.revert_to(7),
            Err(TransactionError::InvalidRevision { .. })
        ));
        writer.revert_to(1).unwrap();
        assert_eq!(writer.revision_number(), Revision::new(3));
        assert_eq!(writer.node_count(), 1);
        fx.commit(&mut writer);

        let reader = fx.reader(3);
        assert_eq!(reader.revision_number(), Revision::new(3));
        assert_eq!(reader.node_count(), 1);
        assert_eq!(value_of(reader.get_node(key).unwrap()).as_deref(), Some("v1"));

        // Keys keep growing past the ones the revert dropped.
        let next = writer.create_node(text("after")).unwrap();
        assert_eq!(next, NodeKey::new(2));
    }

    #[test]
    fn test_commit_without_changes_publishes_revision() {
        let mut fx = Fixture::new(Revisioning::SlidingSnapshot, 2);
        let mut writer = fx.writer();
        let stats = fx.commit(&mut writer);
        assert_eq!(stats.node_pages, 0);
        assert_eq!(fx.published.revision_number(), Revision::new(1));
        assert_eq!(fx.reader(1).node_count(), 0);
    }

    #[test]
    fn test_keys_span_pages() {
        let mut fx = Fixture::new(Revisioning::Incremental, 4);
        let mut writer = fx.writer();
        let keys: Vec<NodeKey> = (0..300)
            .map(|i| writer.create_node(text(&i.to_string())).unwrap())
            .collect();
        assert_eq!(writer.touched_pages(), 3);
        let stats = fx.commit(&mut writer);
        assert_eq!(stats.node_pages, 3);

        let reader = fx.reader(1);
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(
                value_of(reader.get_node(*key).unwrap()),
                Some(i.to_string())
            );
        }
        assert!(reader.cache_stats().hits() > 0);
    }
}
