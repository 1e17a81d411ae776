use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;
use revdb_common::config::WriteOptions;
use revdb_common::types::{NameKey, NodeKey, Revision};
use revdb_storage::error::StorageError;
use revdb_storage::page::UberPage;
use revdb_storage::record::NodeRecord;
use tracing::{debug, info, warn};

use super::timer::AutoCommitTimer;
use crate::error::{TransactionError, TxnResult};
use crate::session::permit::Permit;
use crate::session::Session;
use crate::state::{CommitStats, WriteTransactionState};

/// Writer state while the transaction is open.
struct ActiveWriter<N: NodeRecord> {
    state: WriteTransactionState<N>,
    last_commit: Option<CommitStats>,
    _permit: Permit,
}

/// Part of a write transaction shared with the session and the auto-commit
/// timer.
pub(crate) struct WriterShared<N: NodeRecord> {
    session: Arc<Session<N>>,
    options: WriteOptions,
    slot: Mutex<Option<ActiveWriter<N>>>,
}

impl<N: NodeRecord> WriterShared<N> {
    fn with_active<R>(
        &self,
        f: impl FnOnce(&mut ActiveWriter<N>) -> TxnResult<R>,
    ) -> TxnResult<R> {
        let mut slot = self.slot.lock();
        let active = slot.as_mut().ok_or(TransactionError::Closed)?;
        f(active)
    }

    fn commit_active(&self, active: &mut ActiveWriter<N>) -> TxnResult<Arc<UberPage<N>>> {
        let (published, stats) = active.state.commit()?;
        self.session.publish(Arc::clone(&published));
        info!(
            revision = %stats.revision,
            pages_written = stats.pages_written,
            node_pages = stats.node_pages,
            elapsed_us = stats.elapsed.as_micros() as u64,
            "committed revision"
        );
        active.last_commit = Some(stats);
        Ok(published)
    }

    /// Commits if the modification count passed the configured threshold.
    fn commit_if_over_threshold(&self, active: &mut ActiveWriter<N>) -> TxnResult<()> {
        let threshold = self.options.auto_commit_node_count;
        if self.options.counts_modifications()
            && active.state.modification_count() > u64::from(threshold)
        {
            debug!(threshold, "modification threshold reached");
            self.commit_active(active)?;
        }
        Ok(())
    }

    /// Timer entry point: commits pending modifications, if any.
    pub(crate) fn commit_on_interval(&self) {
        let result = self.with_active(|active| {
            if active.state.modification_count() == 0
                || active.state.is_poisoned()
                || active.state.in_flight().is_some()
            {
                return Ok(());
            }
            self.commit_active(active).map(|_| ())
        });
        match result {
            Ok(()) | Err(TransactionError::Closed) => {}
            Err(e) => warn!(error = %e, "interval auto-commit failed"),
        }
    }

    /// Aborts pending changes and releases the write permit. Idempotent.
    pub(crate) fn shutdown(&self) {
        if let Some(mut active) = self.slot.lock().take() {
            if active.state.modification_count() > 0 {
                warn!(
                    pending = %active.state.revision_number(),
                    modifications = active.state.modification_count(),
                    "discarding uncommitted changes"
                );
            }
            active.state.abort();
        }
    }
}

/// The store's single write transaction.
///
/// Builds the next revision privately; [`commit`](Self::commit) publishes it
/// and moves on to the revision after it, so one handle can commit many
/// times. Dropping or closing the handle aborts pending changes and
/// releases the write permit.
pub struct WriteTxn<N: NodeRecord> {
    shared: Arc<WriterShared<N>>,
    timer: Option<AutoCommitTimer>,
}

impl<N: NodeRecord> WriteTxn<N> {
    pub(crate) fn begin(
        session: Arc<Session<N>>,
        state: WriteTransactionState<N>,
        permit: Permit,
        options: WriteOptions,
    ) -> TxnResult<Self> {
        let shared = Arc::new(WriterShared {
            session,
            options,
            slot: Mutex::new(Some(ActiveWriter {
                state,
                last_commit: None,
                _permit: permit,
            })),
        });
        shared.session.register_writer(&shared);

        let timer = if options.is_timed() {
            let timer = AutoCommitTimer::spawn(Arc::downgrade(&shared), options.auto_commit_interval)
                .map_err(StorageError::from)?;
            Some(timer)
        } else {
            None
        };
        Ok(Self { shared, timer })
    }

    /// Revision the next commit will publish.
    pub fn revision_number(&self) -> TxnResult<Revision> {
        self.shared.with_active(|active| Ok(active.state.revision_number()))
    }

    /// Live nodes in the pending revision.
    pub fn node_count(&self) -> TxnResult<u64> {
        self.shared.with_active(|active| Ok(active.state.node_count()))
    }

    /// Highest node key present in the pending revision.
    pub fn max_node_key(&self) -> TxnResult<NodeKey> {
        self.shared.with_active(|active| Ok(active.state.max_node_key()))
    }

    /// Modifications since the last commit.
    pub fn modification_count(&self) -> TxnResult<u64> {
        self.shared
            .with_active(|active| Ok(active.state.modification_count()))
    }

    /// Statistics of the most recent successful commit.
    pub fn last_commit_stats(&self) -> Option<CommitStats> {
        self.shared
            .slot
            .lock()
            .as_ref()
            .and_then(|active| active.last_commit)
    }

    /// Returns true once the transaction was closed, here or by the store.
    pub fn is_closed(&self) -> bool {
        self.shared.slot.lock().is_none()
    }

    /// Stores `record` under a fresh node key.
    pub fn create_node(&mut self, record: N) -> TxnResult<NodeKey> {
        let shared = &self.shared;
        shared.with_active(|active| {
            let key = active.state.create_node(record)?;
            shared.commit_if_over_threshold(active)?;
            Ok(key)
        })
    }

    /// Prepares node `key` for modification.
    ///
    /// The guard dereferences to a private copy of the node; dropping it
    /// stores the copy in the pending revision.
    pub fn prepare_for_modification(&mut self, key: NodeKey) -> TxnResult<NodeGuard<'_, N>> {
        let node = self.shared.with_active(|active| {
            Ok(active.state.prepare_node_for_modification(key)?.clone())
        })?;
        Ok(NodeGuard {
            txn: self,
            key,
            node,
        })
    }

    /// Removes node `key` from the pending revision.
    pub fn remove_node(&mut self, key: NodeKey) -> TxnResult<()> {
        let shared = &self.shared;
        shared.with_active(|active| {
            active.state.remove_node(key)?;
            shared.commit_if_over_threshold(active)
        })
    }

    /// Node `key` including uncommitted changes.
    pub fn get_node(&self, key: NodeKey) -> TxnResult<Option<N>> {
        self.shared.with_active(|active| active.state.get_node(key))
    }

    /// Interns `name` in the pending revision.
    pub fn intern_name(&mut self, name: &str) -> TxnResult<NameKey> {
        self.shared.with_active(|active| active.state.intern_name(name))
    }

    /// Name interned under `key` in the pending revision.
    pub fn get_name(&self, key: NameKey) -> TxnResult<Option<String>> {
        self.shared.with_active(|active| active.state.get_name(key))
    }

    /// Publishes the pending revision and returns its uber page.
    pub fn commit(&mut self) -> TxnResult<Arc<UberPage<N>>> {
        let shared = &self.shared;
        shared.with_active(|active| shared.commit_active(active))
    }

    /// Makes the pending revision a copy of committed `revision`.
    pub fn revert_to(&mut self, revision: u64) -> TxnResult<()> {
        self.shared
            .with_active(|active| active.state.revert_to(revision))
    }

    /// Discards uncommitted changes and keeps the transaction open.
    pub fn abort(&mut self) {
        if let Some(active) = self.shared.slot.lock().as_mut() {
            active.state.abort();
        }
    }

    /// Aborts pending changes and releases the write permit.
    pub fn close(mut self) {
        self.end();
    }

    fn end(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
        self.shared.shutdown();
    }

    fn finish_modification(&self, key: NodeKey, node: &N) -> TxnResult<()> {
        let shared = &self.shared;
        shared.with_active(|active| {
            active.state.finish_node_modification_with(key, node)?;
            shared.commit_if_over_threshold(active)
        })
    }
}

impl<N: NodeRecord> Drop for WriteTxn<N> {
    fn drop(&mut self) {
        self.end();
    }
}

impl<N: NodeRecord> fmt::Debug for WriteTxn<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.slot.lock();
        match slot.as_ref() {
            Some(active) => f
                .debug_struct("WriteTxn")
                .field("state", &active.state)
                .field("auto_commit", &self.shared.options)
                .finish(),
            None => f.write_str("WriteTxn(closed)"),
        }
    }
}

/// A node prepared for modification.
///
/// Holds the write transaction mutably, so only one node can be under
/// modification at a time. The modified node is stored back when the guard
/// drops.
pub struct NodeGuard<'a, N: NodeRecord> {
    txn: &'a mut WriteTxn<N>,
    key: NodeKey,
    node: N,
}

impl<N: NodeRecord> NodeGuard<'_, N> {
    /// Key of the node under modification.
    pub fn key(&self) -> NodeKey {
        self.key
    }
}

impl<N: NodeRecord> Deref for NodeGuard<'_, N> {
    type Target = N;

    fn deref(&self) -> &N {
        &self.node
    }
}

impl<N: NodeRecord> DerefMut for NodeGuard<'_, N> {
    fn deref_mut(&mut self) -> &mut N {
        &mut self.node
    }
}

impl<N: NodeRecord> Drop for NodeGuard<'_, N> {
    fn drop(&mut self) {
        if let Err(e) = self.txn.finish_modification(self.key, &self.node) {
            warn!(key = %self.key, error = %e, "failed to finish node modification");
        }
    }
}

impl<N: NodeRecord> fmt::Debug for NodeGuard<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeGuard")
            .field("key", &self.key)
            .field("node", &self.node)
            .finish()
    }
}
