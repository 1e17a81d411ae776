//! Sessions: admission control and revision publication.
//!
//! A [`Store`] is a cheap handle to one session. The session owns the
//! backend, the revisioning strategy and the pointer to the last committed
//! uber page. Publishing a commit is a single pointer swap under a write
//! lock; readers copy the pointer once when they begin and never touch the
//! lock again.
//!
//! ```text
//!             Store (Arc handle)
//!                   │
//!                   ▼
//!   ┌──────────────────────────────────┐
//!   │ Session                          │
//!   │  published: RwLock<Arc<Uber>> ◀──┼── WriteTxn::commit
//!   │  readers:   PermitPool(N)     ◀──┼── begin_read
//!   │  writers:   PermitPool(1)     ◀──┼── begin_write (fails fast)
//!   │  keys:      AtomicU64            │
//!   └──────────────────────────────────┘
//! ```

pub(crate) mod permit;
mod registry;

pub use registry::StoreRegistry;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use revdb_common::config::{StoreConfig, WriteOptions};
use revdb_common::types::Revision;
use revdb_mvcc::{strategy_for, RevisioningStrategy};
use revdb_storage::backend::{FileBackend, MemoryBackend, StorageBackend};
use revdb_storage::error::StorageError;
use revdb_storage::page::UberPage;
use revdb_storage::record::{NodeRecord, TreeNode};
use tracing::{info, warn};

use self::permit::{PermitError, PermitPool};
use crate::error::{TransactionError, TxnResult};
use crate::state::{self, ReadTransactionState, WriteTransactionState};
use crate::txn::{ReadTxn, WriteTxn, WriterShared};

/// Counters of one session.
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Read transactions started.
    pub reads_begun: AtomicU64,
    /// Write transactions started.
    pub writes_begun: AtomicU64,
    /// Write transactions refused because another was active.
    pub writers_rejected: AtomicU64,
    /// Revisions published.
    pub commits: AtomicU64,
}

/// Shared state behind every handle of one store.
pub(crate) struct Session<N: NodeRecord> {
    config: StoreConfig,
    path: Option<PathBuf>,
    backend: Arc<dyn StorageBackend<N>>,
    strategy: Arc<dyn RevisioningStrategy<N>>,
    published: RwLock<Arc<UberPage<N>>>,
    keys: Arc<AtomicU64>,
    readers: Arc<PermitPool>,
    writers: Arc<PermitPool>,
    writer: Mutex<Weak<WriterShared<N>>>,
    closed: AtomicBool,
    stats: SessionStats,
}

impl<N: NodeRecord> Session<N> {
    fn new(
        backend: Arc<dyn StorageBackend<N>>,
        config: StoreConfig,
        path: Option<PathBuf>,
    ) -> TxnResult<Arc<Self>> {
        config
            .validate()
            .map_err(|message| TransactionError::InvalidConfig { message })?;

        let published = if backend.exists() {
            state::load_published(backend.as_ref())?
        } else {
            state::bootstrap(backend.as_ref())?
        };
        let max_key = published.max_node_key();
        let next_key = if max_key.is_valid() {
            max_key.as_u64() + 1
        } else {
            0
        };

        info!(
            revision = %published.revision_number(),
            revisioning = %config.revisioning,
            window = config.revision_window,
            path = ?path,
            "opened store"
        );

        Ok(Arc::new(Self {
            strategy: Arc::from(strategy_for::<N>(&config)),
            readers: PermitPool::new(config.max_concurrent_readers),
            writers: PermitPool::new(1),
            config,
            path,
            backend,
            published: RwLock::new(published),
            keys: Arc::new(AtomicU64::new(next_key)),
            writer: Mutex::new(Weak::new()),
            closed: AtomicBool::new(false),
            stats: SessionStats::default(),
        }))
    }

    pub(crate) fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> TxnResult<()> {
        if self.is_closed() {
            return Err(TransactionError::StoreClosed);
        }
        Ok(())
    }

    fn published(&self) -> Arc<UberPage<N>> {
        Arc::clone(&self.published.read())
    }

    /// Makes `uber` the last committed revision.
    pub(crate) fn publish(&self, uber: Arc<UberPage<N>>) {
        *self.published.write() = uber;
        self.stats.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn register_writer(&self, writer: &Arc<WriterShared<N>>) {
        *self.writer.lock() = Arc::downgrade(writer);
    }

    fn close(&self) -> TxnResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.readers.close();
        self.writers.close();
        let writer = self.writer.lock().upgrade();
        if let Some(writer) = writer {
            warn!("closing store with an open write transaction");
            writer.shutdown();
        }
        self.backend.close()?;
        info!(path = ?self.path, "closed store");
        Ok(())
    }
}

impl<N: NodeRecord> Drop for Session<N> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "error while closing store");
        }
    }
}

/// Handle to an open store.
///
/// Clones share one session. The session closes when [`close`](Self::close)
/// is called or the last handle and transaction are gone.
pub struct Store<N: NodeRecord = TreeNode> {
    session: Arc<Session<N>>,
}

impl<N: NodeRecord> Clone for Store<N> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
        }
    }
}

impl<N: NodeRecord> Store<N> {
    /// Opens or creates the store in directory `path`.
    ///
    /// An existing store must have been created with the same revisioning
    /// layout. A directory can back one open store per process; use a
    /// [`StoreRegistry`] to share it between callers.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> TxnResult<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path).map_err(|e| StorageError::file(path, e))?;

        let stored = FileBackend::<N>::load_config(path)?;
        if let Some(stored) = &stored {
            if !stored.same_layout(&config) {
                return Err(TransactionError::ConfigMismatch {
                    message: format!(
                        "store uses {} with window {}, requested {} with window {}",
                        stored.revisioning,
                        stored.revision_window,
                        config.revisioning,
                        config.revision_window
                    ),
                });
            }
        }

        let backend = FileBackend::<N>::open(path, config.sync_on_commit)?;
        if stored.is_none() {
            backend.save_config(&config)?;
        }
        let session = Session::new(Arc::new(backend), config, Some(path.to_path_buf()))?;
        Ok(Self { session })
    }

    /// Creates a store that lives in memory.
    pub fn open_in_memory(config: StoreConfig) -> TxnResult<Self> {
        Self::with_backend(Arc::new(MemoryBackend::new()), config)
    }

    /// Opens a store on a caller-provided backend, bootstrapping it if
    /// empty.
    pub fn with_backend(backend: Arc<dyn StorageBackend<N>>, config: StoreConfig) -> TxnResult<Self> {
        let session = Session::new(backend, config, None)?;
        Ok(Self { session })
    }

    /// Begins a read transaction on `revision`, or on the latest committed
    /// revision if `None`.
    ///
    /// Waits for a read permit up to the configured timeout.
    pub fn begin_read(&self, revision: Option<u64>) -> TxnResult<ReadTxn<N>> {
        let session = &self.session;
        session.ensure_open()?;

        let uber = session.published();
        let latest = uber.revision_number();
        let revision = match revision {
            Some(requested) if requested > latest.as_u64() => {
                return Err(TransactionError::InvalidRevision { requested, latest });
            }
            Some(requested) => Revision::new(requested),
            None => latest,
        };

        let permit = session
            .readers
            .acquire(session.config.read_permit_timeout)
            .map_err(|e| match e {
                PermitError::Closed => TransactionError::StoreClosed,
                PermitError::Exhausted | PermitError::TimedOut => {
                    warn!(
                        readers = session.readers.capacity(),
                        "timed out waiting for a read permit"
                    );
                    TransactionError::ReaderTimeout
                }
            })?;

        let state = ReadTransactionState::new(
            Arc::clone(&session.backend),
            Arc::clone(&session.strategy),
            uber,
            revision,
            session.config.page_cache_capacity,
        )?;
        session.stats.reads_begun.fetch_add(1, Ordering::Relaxed);
        Ok(ReadTxn::new(state, Arc::clone(session), permit))
    }

    /// Begins the write transaction without auto-commit.
    pub fn begin_write(&self) -> TxnResult<WriteTxn<N>> {
        self.begin_write_with(WriteOptions::default())
    }

    /// Begins the write transaction with auto-commit `options`.
    ///
    /// Fails with [`TransactionError::WriterActive`] instead of waiting if
    /// another write transaction is open.
    pub fn begin_write_with(&self, options: WriteOptions) -> TxnResult<WriteTxn<N>> {
        let session = &self.session;
        session.ensure_open()?;

        let permit = session.writers.try_acquire().map_err(|e| match e {
            PermitError::Closed => TransactionError::StoreClosed,
            PermitError::Exhausted | PermitError::TimedOut => {
                session.stats.writers_rejected.fetch_add(1, Ordering::Relaxed);
                TransactionError::WriterActive
            }
        })?;

        let state = WriteTransactionState::new(
            Arc::clone(&session.backend),
            Arc::clone(&session.strategy),
            Arc::clone(&session.keys),
            session.published(),
        )?;
        let txn = WriteTxn::begin(Arc::clone(session), state, permit, options)?;
        session.stats.writes_begun.fetch_add(1, Ordering::Relaxed);
        Ok(txn)
    }

    /// Latest committed revision.
    pub fn revision_number(&self) -> Revision {
        self.session.published().revision_number()
    }

    /// Uber page of the latest committed revision.
    pub fn published(&self) -> Arc<UberPage<N>> {
        self.session.published()
    }

    /// Configuration the store was opened with.
    pub fn config(&self) -> &StoreConfig {
        self.session.config()
    }

    /// Directory of a file-backed store.
    pub fn path(&self) -> Option<&Path> {
        self.session.path.as_deref()
    }

    /// Session counters.
    pub fn stats(&self) -> &SessionStats {
        &self.session.stats
    }

    /// Read transactions currently holding a permit.
    pub fn active_readers(&self) -> u32 {
        self.session.readers.in_use()
    }

    /// Returns true once the store has been closed.
    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    /// Returns true if both handles share one session.
    pub fn same_session(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.session, &other.session)
    }

    /// Closes the store for every handle: aborts the open writer, refuses
    /// new transactions and releases the backend. Idempotent.
    pub fn close(&self) -> TxnResult<()> {
        self.session.close()
    }

    pub(crate) fn from_session(session: Arc<Session<N>>) -> Self {
        Self { session }
    }

    pub(crate) fn downgrade(&self) -> Weak<Session<N>> {
        Arc::downgrade(&self.session)
    }
}

impl<N: NodeRecord> fmt::Debug for Store<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.session.path)
            .field("revision", &self.revision_number())
            .field("revisioning", &self.session.config.revisioning)
            .field("closed", &self.is_closed())
            .finish()
    }
}
