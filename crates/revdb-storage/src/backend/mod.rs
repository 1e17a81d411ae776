//! Storage backends.
//!
//! A backend persists encoded pages and the single "first reference" that
//! points at the published uber page. The page engine never assumes a byte
//! layout beyond "a page written at a location reads back equal".

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use std::sync::atomic::{AtomicU64, Ordering};

use revdb_common::types::PageLocation;

use crate::error::StorageResult;
use crate::page::{Page, PageReference};
use crate::record::NodeRecord;

/// Durable page store used by a session.
pub trait StorageBackend<N: NodeRecord>: Send + Sync {
    /// Returns true if a first reference has been written.
    fn exists(&self) -> bool;

    /// Reads the reference to the published uber page.
    fn read_first_reference(&self) -> StorageResult<PageReference<N>>;

    /// Atomically replaces the first reference. The reference must already
    /// carry a location.
    fn write_first_reference(&self, reference: &PageReference<N>) -> StorageResult<()>;

    /// Reads and decodes the page stored at `location`.
    fn read_page(&self, location: PageLocation) -> StorageResult<Page<N>>;

    /// Encodes and appends `page`, returning where it was stored.
    fn write(&self, page: &Page<N>) -> StorageResult<PageLocation>;

    /// Releases resources. Later calls fail with `Closed`.
    fn close(&self) -> StorageResult<()>;

    /// Snapshot of I/O counters.
    fn stats(&self) -> BackendStatsSnapshot;
}

/// I/O counters shared by the bundled backends.
#[derive(Debug, Default)]
pub struct BackendStats {
    reads: AtomicU64,
    writes: AtomicU64,
    bytes_written: AtomicU64,
}

impl BackendStats {
    /// Counts one page read.
    #[inline]
    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one page write of `bytes` bytes.
    #[inline]
    pub fn record_write(&self, bytes: usize) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Takes a snapshot of the counters.
    pub fn snapshot(&self) -> BackendStatsSnapshot {
        BackendStatsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time backend counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStatsSnapshot {
    /// Pages read.
    pub reads: u64,
    /// Pages written.
    pub writes: u64,
    /// Encoded bytes written.
    pub bytes_written: u64,
}
