//! Transaction state behind the public handles.
//!
//! [`ReadTransactionState`] pins one committed revision and never changes.
//! [`WriteTransactionState`] owns the pending revision: a successor uber
//! page, a fresh revision root and the transaction log. Both resolve node
//! pages through the store's revisioning strategy.

mod read;
mod write;

pub use read::ReadTransactionState;
pub use write::{CommitStats, WriteTransactionState};

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use revdb_common::types::{NodeKey, PageKey};
use revdb_mvcc::{RevisioningStrategy, VersionChain};
use revdb_storage::backend::StorageBackend;
use revdb_storage::error::StorageError;
use revdb_storage::page::persist::persist;
use revdb_storage::page::{Page, PageReference, RevisionRootPage, UberPage};
use revdb_storage::record::NodeRecord;
use tracing::info;

use crate::error::TxnResult;

/// Writes revision 0 of an empty store and returns its uber page.
pub fn bootstrap<N: NodeRecord>(backend: &dyn StorageBackend<N>) -> TxnResult<Arc<UberPage<N>>> {
    let uber = UberPage::bootstrap(backend, now_millis())?;
    let (published, pages_written) = write_uber(uber, backend)?;
    info!(pages_written, "bootstrapped store");
    Ok(published)
}

/// Reads the uber page the backend's first reference points at.
pub fn load_published<N: NodeRecord>(
    backend: &dyn StorageBackend<N>,
) -> TxnResult<Arc<UberPage<N>>> {
    let reference = backend.read_first_reference()?;
    let uber = reference.resolve(backend)?.as_uber()?.clone();
    Ok(Arc::new(uber))
}

/// Persists the page tree below `uber` and swings the first reference to
/// it. Returns the clean uber page and the number of pages written.
fn write_uber<N: NodeRecord>(
    uber: UberPage<N>,
    backend: &dyn StorageBackend<N>,
) -> TxnResult<(Arc<UberPage<N>>, usize)> {
    let mut reference = PageReference::dirty(Page::Uber(uber));
    let pages_written = persist(&mut reference, backend)?;
    backend.write_first_reference(&reference)?;
    let uber = reference
        .page()
        .ok_or(StorageError::UnresolvableReference)?
        .as_uber()?
        .clone();
    Ok((Arc::new(uber), pages_written))
}

/// Loads the stored versions of node page `page_key` in `root`.
fn collect_chain<N: NodeRecord>(
    root: &RevisionRootPage<N>,
    page_key: PageKey,
    backend: &dyn StorageBackend<N>,
    strategy: &dyn RevisioningStrategy<N>,
) -> TxnResult<VersionChain<N>> {
    match root.node_page_reference(page_key, backend)? {
        Some(reference) => Ok(strategy.collect_versions(reference, backend)?),
        None => Ok(VersionChain::empty()),
    }
}

/// Returns true if `key` can name a stored node.
fn addressable(key: NodeKey) -> bool {
    key.is_valid() && key.as_u64() <= revdb_common::constants::MAX_NODE_KEY
}

/// Milliseconds since the Unix epoch.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
