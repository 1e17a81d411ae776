//! Fault injection.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use revdb_common::types::PageLocation;
use revdb_storage::backend::{BackendStatsSnapshot, MemoryBackend, StorageBackend};
use revdb_storage::error::{StorageError, StorageResult};
use revdb_storage::page::{Page, PageReference};
use revdb_storage::record::NodeRecord;
use tracing::debug;

/// In-memory backend that fails on demand.
///
/// [`fail_after`](Self::fail_after) lets a number of page writes succeed and
/// fails every write after them.
/// [`fail_first_reference`](Self::fail_first_reference) fails the final
/// pointer swap instead.
pub struct FaultyBackend<N> {
    inner: MemoryBackend<N>,
    writes_left: AtomicI64,
    fail_first_reference: AtomicBool,
}

impl<N: NodeRecord> FaultyBackend<N> {
    /// Creates a backend that does not fail yet.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::new(),
            writes_left: AtomicI64::new(-1),
            fail_first_reference: AtomicBool::new(false),
        })
    }

    /// Lets `writes` more page writes succeed, then fails the rest.
    pub fn fail_after(&self, writes: u32) {
        self.writes_left.store(i64::from(writes), Ordering::SeqCst);
    }

    /// Fails every `write_first_reference` call while set.
    pub fn fail_first_reference(&self, fail: bool) {
        self.fail_first_reference.store(fail, Ordering::SeqCst);
    }

    /// Stops injecting failures.
    pub fn heal(&self) {
        self.writes_left.store(-1, Ordering::SeqCst);
        self.fail_first_reference.store(false, Ordering::SeqCst);
    }

    /// Pages stored so far, including those of failed commits.
    pub fn page_count(&self) -> usize {
        self.inner.page_count()
    }

    fn take_write(&self) -> StorageResult<()> {
        let left = self.writes_left.load(Ordering::SeqCst);
        if left < 0 {
            return Ok(());
        }
        if left == 0 {
            debug!("injecting page write failure");
            return Err(StorageError::write_failed("injected page write failure"));
        }
        self.writes_left.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

impl<N: NodeRecord> StorageBackend<N> for FaultyBackend<N> {
    fn exists(&self) -> bool {
        self.inner.exists()
    }

    fn read_first_reference(&self) -> StorageResult<PageReference<N>> {
        self.inner.read_first_reference()
    }

    fn write_first_reference(&self, reference: &PageReference<N>) -> StorageResult<()> {
        if self.fail_first_reference.load(Ordering::SeqCst) {
            return Err(StorageError::write_failed("injected first reference failure"));
        }
        self.inner.write_first_reference(reference)
    }

    fn read_page(&self, location: PageLocation) -> StorageResult<Page<N>> {
        self.inner.read_page(location)
    }

    fn write(&self, page: &Page<N>) -> StorageResult<PageLocation> {
        self.take_write()?;
        self.inner.write(page)
    }

    fn close(&self) -> StorageResult<()> {
        self.inner.close()
    }

    fn stats(&self) -> BackendStatsSnapshot {
        self.inner.stats()
    }
}
