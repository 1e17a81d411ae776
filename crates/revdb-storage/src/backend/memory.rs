//! In-memory backend.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;
use revdb_common::types::PageLocation;

use super::{BackendStats, BackendStatsSnapshot, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::page::codec::{decode_page, encode_page};
use crate::page::{compute_checksum, Page, PageReference};
use crate::record::NodeRecord;

/// Backend keeping encoded pages in a vector; a location's offset is the
/// page's index.
///
/// Pages still go through the codec, so a store backed by memory exercises
/// the same serialization as one backed by a file.
pub struct MemoryBackend<N> {
    pages: RwLock<Vec<Bytes>>,
    first_reference: RwLock<Option<PageLocation>>,
    closed: AtomicBool,
    stats: BackendStats,
    _record: PhantomData<fn() -> N>,
}

impl<N: NodeRecord> Default for MemoryBackend<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NodeRecord> MemoryBackend<N> {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self {
            pages: RwLock::new(Vec::new()),
            first_reference: RwLock::new(None),
            closed: AtomicBool::new(false),
            stats: BackendStats::default(),
            _record: PhantomData,
        }
    }

    /// Number of pages stored.
    pub fn page_count(&self) -> usize {
        self.pages.read().len()
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl<N: NodeRecord> StorageBackend<N> for MemoryBackend<N> {
    fn exists(&self) -> bool {
        self.first_reference.read().is_some()
    }

    fn read_first_reference(&self) -> StorageResult<PageReference<N>> {
        self.check_open()?;
        let location = (*self.first_reference.read()).ok_or(StorageError::NotBootstrapped)?;
        Ok(PageReference::persisted(location))
    }

    fn write_first_reference(&self, reference: &PageReference<N>) -> StorageResult<()> {
        self.check_open()?;
        let location = reference.location().ok_or(StorageError::DirtyReference)?;
        *self.first_reference.write() = Some(location);
        Ok(())
    }

    fn read_page(&self, location: PageLocation) -> StorageResult<Page<N>> {
        self.check_open()?;
        let bytes = self
            .pages
            .read()
            .get(location.offset as usize)
            .cloned()
            .ok_or(StorageError::PageNotFound { location })?;

        let actual = compute_checksum(&bytes);
        if actual != location.checksum {
            return Err(StorageError::ChecksumMismatch {
                location,
                expected: location.checksum,
                actual,
            });
        }
        self.stats.record_read();
        decode_page(&bytes)
    }

    fn write(&self, page: &Page<N>) -> StorageResult<PageLocation> {
        self.check_open()?;
        let bytes = encode_page(page)?;
        let checksum = compute_checksum(&bytes);
        self.stats.record_write(bytes.len());

        let mut pages = self.pages.write();
        let offset = pages.len() as u64;
        pages.push(bytes);
        Ok(PageLocation::new(offset, checksum))
    }

    fn close(&self) -> StorageResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn stats(&self) -> BackendStatsSnapshot {
        self.stats.snapshot()
    }
}
