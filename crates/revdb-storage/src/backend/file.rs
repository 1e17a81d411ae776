//! File backend.
//!
//! A store directory holds three files:
//!
//! ```text
//! pages.dat   append-only frames: len u32 | crc32 u32 | encoded page
//! uber.ref    magic u32 | version u16 | location (13 bytes) | crc32 u32
//! store.json  the store configuration fixed at creation
//! ```
//!
//! `uber.ref` is replaced by writing a temporary file, syncing it, and
//! renaming it over the old one, so a crash leaves either the previous or
//! the new published revision.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Buf, BufMut, BytesMut};
use parking_lot::Mutex;
use revdb_common::config::StoreConfig;
use revdb_common::constants::{
    CONFIG_FILE_NAME, FIRST_REFERENCE_FILE_NAME, FORMAT_VERSION, PAGES_FILE_NAME,
    PAGE_FRAME_HEADER_SIZE, STORE_MAGIC,
};
use revdb_common::types::PageLocation;
use tracing::{debug, info};

use super::{BackendStats, BackendStatsSnapshot, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::page::codec::{decode_page, encode_page};
use crate::page::{compute_checksum, Page, PageReference};
use crate::record::NodeRecord;

/// Store directories held by a live file backend of this process.
static OPEN_DIRS: Mutex<BTreeSet<PathBuf>> = parking_lot::const_mutex(BTreeSet::new());

const FIRST_REFERENCE_TMP: &str = "uber.ref.tmp";
const FIRST_REFERENCE_SIZE: usize = 4 + 2 + 1 + 8 + 4 + 4;

struct PageFile {
    file: File,
    len: u64,
}

/// Exclusive claim on a store directory, released on drop.
#[derive(Debug)]
struct DirClaim {
    dir: PathBuf,
}

impl DirClaim {
    fn acquire(dir: &Path) -> StorageResult<Self> {
        let dir = dir.canonicalize().map_err(|e| StorageError::file(dir, e))?;
        if !OPEN_DIRS.lock().insert(dir.clone()) {
            return Err(StorageError::Locked { path: dir });
        }
        Ok(Self { dir })
    }
}

impl Drop for DirClaim {
    fn drop(&mut self) {
        OPEN_DIRS.lock().remove(&self.dir);
    }
}

/// Backend storing pages in an append-only file.
pub struct FileBackend<N> {
    dir: PathBuf,
    pages: Mutex<PageFile>,
    claim: Mutex<Option<DirClaim>>,
    sync_writes: bool,
    closed: AtomicBool,
    stats: BackendStats,
    _record: PhantomData<fn() -> N>,
}

impl<N: NodeRecord> FileBackend<N> {
    /// Opens the store directory `dir`, creating it if needed.
    ///
    /// With `sync_writes`, the page file is synced before every first
    /// reference update.
    ///
    /// Only one backend per directory may be open in a process at a time;
    /// a second open fails with [`StorageError::Locked`] until the first is
    /// closed or dropped.
    pub fn open(dir: impl AsRef<Path>, sync_writes: bool) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StorageError::file(&dir, e))?;
        let claim = DirClaim::acquire(&dir)?;

        let path = dir.join(PAGES_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| StorageError::file(&path, e))?;
        let len = file
            .metadata()
            .map_err(|e| StorageError::file(&path, e))?
            .len();

        info!(dir = %dir.display(), bytes = len, "opened file backend");

        Ok(Self {
            dir,
            pages: Mutex::new(PageFile { file, len }),
            claim: Mutex::new(Some(claim)),
            sync_writes,
            closed: AtomicBool::new(false),
            stats: BackendStats::default(),
            _record: PhantomData,
        })
    }

    /// Directory of this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads the configuration persisted at creation, if any.
    pub fn load_config(dir: impl AsRef<Path>) -> StorageResult<Option<StoreConfig>> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| StorageError::file(&path, e))?;
        let config = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::config(format!("{}: {e}", path.display())))?;
        Ok(Some(config))
    }

    /// Persists `config` next to the page file.
    pub fn save_config(&self, config: &StoreConfig) -> StorageResult<()> {
        let path = self.dir.join(CONFIG_FILE_NAME);
        let json = serde_json::to_vec_pretty(config)
            .map_err(|e| StorageError::config(e.to_string()))?;
        fs::write(&path, json).map_err(|e| StorageError::file(&path, e))
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }

    fn sync_pages(&self) -> StorageResult<()> {
        let pages = self.pages.lock();
        pages
            .file
            .sync_data()
            .map_err(|e| StorageError::file(self.dir.join(PAGES_FILE_NAME), e))
    }
}

impl<N: NodeRecord> StorageBackend<N> for FileBackend<N> {
    fn exists(&self) -> bool {
        self.dir.join(FIRST_REFERENCE_FILE_NAME).exists()
    }

    fn read_first_reference(&self) -> StorageResult<PageReference<N>> {
        self.check_open()?;
        let path = self.dir.join(FIRST_REFERENCE_FILE_NAME);
        if !path.exists() {
            return Err(StorageError::NotBootstrapped);
        }

        let mut raw = [0u8; FIRST_REFERENCE_SIZE];
        File::open(&path)
            .and_then(|mut file| file.read_exact(&mut raw))
            .map_err(|e| StorageError::file(&path, e))?;

        let body = &raw[..FIRST_REFERENCE_SIZE - 4];
        let mut buf = &raw[..];
        let magic = buf.get_u32();
        if magic != STORE_MAGIC {
            return Err(StorageError::corrupted(format!(
                "invalid magic: expected {STORE_MAGIC:08x}, got {magic:08x}"
            )));
        }
        let version = buf.get_u16();
        if version != FORMAT_VERSION {
            return Err(StorageError::corrupted(format!(
                "unsupported format version: {version}"
            )));
        }
        let present = buf.get_u8();
        let offset = buf.get_u64();
        let checksum = buf.get_u32();
        let stored = buf.get_u32();
        let computed = compute_checksum(body);
        if stored != computed {
            return Err(StorageError::corrupted(format!(
                "first reference checksum mismatch: expected {stored:08x}, got {computed:08x}"
            )));
        }
        if present == 0 {
            return Err(StorageError::NotBootstrapped);
        }
        Ok(PageReference::persisted(PageLocation::new(offset, checksum)))
    }

    fn write_first_reference(&self, reference: &PageReference<N>) -> StorageResult<()> {
        self.check_open()?;
        let location = reference.location().ok_or(StorageError::DirtyReference)?;
        if self.sync_writes {
            self.sync_pages()?;
        }

        let mut buf = BytesMut::with_capacity(FIRST_REFERENCE_SIZE);
        buf.put_u32(STORE_MAGIC);
        buf.put_u16(FORMAT_VERSION);
        buf.put_u8(1);
        buf.put_u64(location.offset);
        buf.put_u32(location.checksum);
        let checksum = compute_checksum(&buf);
        buf.put_u32(checksum);

        let tmp_path = self.dir.join(FIRST_REFERENCE_TMP);
        let path = self.dir.join(FIRST_REFERENCE_FILE_NAME);

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|e| StorageError::file(&tmp_path, e))?;
        file.write_all(&buf)
            .map_err(|e| StorageError::file(&tmp_path, e))?;
        if self.sync_writes {
            file.sync_all()
                .map_err(|e| StorageError::file(&tmp_path, e))?;
        }
        drop(file);

        fs::rename(&tmp_path, &path).map_err(|e| StorageError::file(&path, e))?;

        if self.sync_writes {
            if let Ok(dir) = File::open(&self.dir) {
                let _ = dir.sync_all();
            }
        }

        debug!(%location, "first reference replaced");
        Ok(())
    }

    fn read_page(&self, location: PageLocation) -> StorageResult<Page<N>> {
        self.check_open()?;
        let path = self.dir.join(PAGES_FILE_NAME);

        let payload = {
            let mut pages = self.pages.lock();
            if location.offset + PAGE_FRAME_HEADER_SIZE as u64 > pages.len {
                return Err(StorageError::PageNotFound { location });
            }

            let mut header = [0u8; PAGE_FRAME_HEADER_SIZE];
            pages
                .file
                .seek(SeekFrom::Start(location.offset))
                .and_then(|_| pages.file.read_exact(&mut header))
                .map_err(|e| StorageError::file(&path, e))?;

            let mut header = &header[..];
            let len = header.get_u32() as usize;
            let frame_checksum = header.get_u32();
            if frame_checksum != location.checksum {
                return Err(StorageError::ChecksumMismatch {
                    location,
                    expected: location.checksum,
                    actual: frame_checksum,
                });
            }

            let mut payload = vec![0u8; len];
            pages
                .file
                .read_exact(&mut payload)
                .map_err(|e| StorageError::file(&path, e))?;
            payload
        };

        let actual = compute_checksum(&payload);
        if actual != location.checksum {
            return Err(StorageError::ChecksumMismatch {
                location,
                expected: location.checksum,
                actual,
            });
        }
        self.stats.record_read();
        decode_page(&payload)
    }

    fn write(&self, page: &Page<N>) -> StorageResult<PageLocation> {
        self.check_open()?;
        let payload = encode_page(page)?;
        let checksum = compute_checksum(&payload);

        let mut frame = BytesMut::with_capacity(PAGE_FRAME_HEADER_SIZE + payload.len());
        frame.put_u32(payload.len() as u32);
        frame.put_u32(checksum);
        frame.put_slice(&payload);

        let mut pages = self.pages.lock();
        let offset = pages.len;
        pages
            .file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| pages.file.write_all(&frame))
            .map_err(|e| StorageError::file(self.dir.join(PAGES_FILE_NAME), e))?;
        pages.len += frame.len() as u64;
        self.stats.record_write(frame.len());

        Ok(PageLocation::new(offset, checksum))
    }

    fn close(&self) -> StorageResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let result = self.sync_pages();
        self.claim.lock().take();
        info!(dir = %self.dir.display(), "closed file backend");
        result
    }

    fn stats(&self) -> BackendStatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::NamePage;
    use crate::record::TreeNode;
    use revdb_common::config::Revisioning;
    use tempfile::TempDir;

    fn names(name: &str) -> Page<TreeNode> {
        let mut page = NamePage::new();
        page.intern(name);
        Page::Name(page)
    }

    #[test]
    fn test_write_read_reopen() {
        let tmp = TempDir::new().unwrap();
        let location = {
            let backend = FileBackend::<TreeNode>::open(tmp.path(), true).unwrap();
            backend.write(&names("first")).unwrap();
            let location = backend.write(&names("second")).unwrap();
            backend
                .write_first_reference(&PageReference::persisted(location))
                .unwrap();
            backend.close().unwrap();
            location
        };

        let backend = FileBackend::<TreeNode>::open(tmp.path(), true).unwrap();
        assert!(backend.exists());
        let first = backend.read_first_reference().unwrap();
        assert_eq!(first.location(), Some(location));
        let page = backend.read_page(location).unwrap();
        assert!(page.as_name().unwrap().lookup("second").is_some());
    }

    #[test]
    fn test_missing_first_reference() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::<TreeNode>::open(tmp.path(), false).unwrap();
        assert!(!backend.exists());
        assert!(matches!(
            backend.read_first_reference(),
            Err(StorageError::NotBootstrapped)
        ));
    }

    #[test]
    fn test_corrupted_first_reference() {
        let tmp = TempDir::new().unwrap();
        {
            let backend = FileBackend::<TreeNode>::open(tmp.path(), false).unwrap();
            let location = backend.write(&names("x")).unwrap();
            backend
                .write_first_reference(&PageReference::persisted(location))
                .unwrap();
        }

        let path = tmp.path().join(FIRST_REFERENCE_FILE_NAME);
        let mut raw = fs::read(&path).unwrap();
        raw[8] ^= 0xFF;
        fs::write(&path, raw).unwrap();

        let backend = FileBackend::<TreeNode>::open(tmp.path(), false).unwrap();
        assert!(matches!(
            backend.read_first_reference(),
            Err(StorageError::Corrupted { .. })
        ));
    }

    #[test]
    fn test_corrupted_page_payload() {
        let tmp = TempDir::new().unwrap();
        let location = {
            let backend = FileBackend::<TreeNode>::open(tmp.path(), false).unwrap();
            backend.write(&names("payload")).unwrap()
        };

        let path = tmp.path().join(PAGES_FILE_NAME);
        let mut raw = fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        fs::write(&path, raw).unwrap();

        let backend = FileBackend::<TreeNode>::open(tmp.path(), false).unwrap();
        assert!(matches!(
            backend.read_page(location),
            Err(StorageError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_read_beyond_end() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::<TreeNode>::open(tmp.path(), false).unwrap();
        assert!(matches!(
            backend.read_page(PageLocation::new(4096, 0)),
            Err(StorageError::PageNotFound { .. })
        ));
    }

    #[test]
    fn test_directory_opened_once() {
        let tmp = TempDir::new().unwrap();
        let first = FileBackend::<TreeNode>::open(tmp.path(), false).unwrap();
        assert!(matches!(
            FileBackend::<TreeNode>::open(tmp.path(), false),
            Err(StorageError::Locked { .. })
        ));
        // A different spelling of the same directory is still refused.
        assert!(matches!(
            FileBackend::<TreeNode>::open(tmp.path().join("."), false),
            Err(StorageError::Locked { .. })
        ));

        first.close().unwrap();
        let second = FileBackend::<TreeNode>::open(tmp.path(), false).unwrap();
        drop(second);
        FileBackend::<TreeNode>::open(tmp.path(), false).unwrap();
    }

    #[test]
    fn test_config_persistence() {
        let tmp = TempDir::new().unwrap();
        assert!(FileBackend::<TreeNode>::load_config(tmp.path())
            .unwrap()
            .is_none());

        let backend = FileBackend::<TreeNode>::open(tmp.path(), false).unwrap();
        let config = StoreConfig::new(Revisioning::SlidingSnapshot, 3);
        backend.save_config(&config).unwrap();

        let loaded = FileBackend::<TreeNode>::load_config(tmp.path())
            .unwrap()
            .unwrap();
        assert_eq!(loaded, config);
    }
}
