//! One session per store directory.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Weak;

use parking_lot::Mutex;
use revdb_common::config::StoreConfig;
use revdb_storage::error::StorageError;
use revdb_storage::record::{NodeRecord, TreeNode};
use tracing::debug;

use super::{Session, Store};
use crate::error::{TransactionError, TxnResult};

/// Maps canonical store directories to their live session.
///
/// Opening a directory that already has a live session returns another
/// handle to it, so one process never runs two sessions over the same
/// files. Entries do not keep sessions alive.
pub struct StoreRegistry<N: NodeRecord = TreeNode> {
    stores: Mutex<HashMap<PathBuf, Weak<Session<N>>>>,
}

impl<N: NodeRecord> Default for StoreRegistry<N> {
    fn default() -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
        }
    }
}

impl<N: NodeRecord> StoreRegistry<N> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live store for `path`, or opens it.
    pub fn open(&self, path: impl AsRef<Path>, config: StoreConfig) -> TxnResult<Store<N>> {
        let path = path.as_ref();
        fs::create_dir_all(path).map_err(|e| StorageError::file(path, e))?;
        let canonical = fs::canonicalize(path).map_err(|e| StorageError::file(path, e))?;

        let mut stores = self.stores.lock();
        let live = stores
            .get(&canonical)
            .and_then(Weak::upgrade)
            .filter(|session| !session.is_closed());
        if let Some(session) = live {
            if !session.config().same_layout(&config) {
                return Err(TransactionError::ConfigMismatch {
                    message: format!(
                        "{} is open with {} window {}",
                        canonical.display(),
                        session.config().revisioning,
                        session.config().revision_window
                    ),
                });
            }
            debug!(path = %canonical.display(), "reusing open store");
            return Ok(Store::from_session(session));
        }

        let store = Store::open(&canonical, config)?;
        stores.retain(|_, session| session.strong_count() > 0);
        stores.insert(canonical, store.downgrade());
        Ok(store)
    }

    /// Number of directories with a live session.
    pub fn len(&self) -> usize {
        self.stores
            .lock()
            .values()
            .filter(|session| session.upgrade().is_some_and(|s| !s.is_closed()))
            .count()
    }

    /// Returns true if no session is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<N: NodeRecord> fmt::Debug for StoreRegistry<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("live", &self.len())
            .finish()
    }
}
