use std::fmt;
use std::sync::Arc;

use revdb_common::types::{NameKey, NodeKey, Revision};
use revdb_storage::cache::CacheStats;
use revdb_storage::record::NodeRecord;

use crate::error::{TransactionError, TxnResult};
use crate::session::permit::Permit;
use crate::session::Session;
use crate::state::ReadTransactionState;

/// Read-only transaction pinned to one committed revision.
///
/// Holds a read permit until dropped or closed.
pub struct ReadTxn<N: NodeRecord> {
    state: ReadTransactionState<N>,
    session: Arc<Session<N>>,
    _permit: Permit,
}

impl<N: NodeRecord> ReadTxn<N> {
    pub(crate) fn new(
        state: ReadTransactionState<N>,
        session: Arc<Session<N>>,
        permit: Permit,
    ) -> Self {
        Self {
            state,
            session,
            _permit: permit,
        }
    }

    /// Revision this transaction reads.
    pub fn revision_number(&self) -> Revision {
        self.state.revision_number()
    }

    /// Commit time of the revision in milliseconds since the Unix epoch.
    pub fn revision_timestamp(&self) -> u64 {
        self.state.revision_timestamp()
    }

    /// Live nodes in the revision.
    pub fn node_count(&self) -> u64 {
        self.state.node_count()
    }

    /// Highest node key allocated up to this revision.
    pub fn max_node_key(&self) -> NodeKey {
        self.state.max_node_key()
    }

    /// Node stored under `key`.
    pub fn get_node(&self, key: NodeKey) -> TxnResult<Option<N>> {
        self.ensure_open()?;
        self.state.get_node(key)
    }

    /// Name interned under `key`.
    pub fn get_name(&self, key: NameKey) -> TxnResult<Option<String>> {
        self.ensure_open()?;
        self.state.get_name(key)
    }

    /// Reconstructed-page cache counters.
    pub fn cache_stats(&self) -> &CacheStats {
        self.state.cache_stats()
    }

    /// Releases the read permit.
    pub fn close(self) {}

    fn ensure_open(&self) -> TxnResult<()> {
        if self.session.is_closed() {
            return Err(TransactionError::StoreClosed);
        }
        Ok(())
    }
}

impl<N: NodeRecord> fmt::Debug for ReadTxn<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadTxn").field(&self.state).finish()
    }
}
