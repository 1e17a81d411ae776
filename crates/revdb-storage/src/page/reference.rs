//! Versioned page pointers.

use std::fmt;
use std::sync::{Arc, OnceLock};

use revdb_common::types::PageLocation;
use tracing::trace;

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::page::Page;
use crate::record::NodeRecord;

/// Pointer from a parent page to a child page.
///
/// A reference is in one of three states:
///
/// - **unresolved**: only the persisted location is known
/// - **resolved-clean**: the page is in memory and matches its location
/// - **resolved-dirty**: the page is in memory and has no location yet
///
/// Readers resolve through a shared reference; the loaded page is cached on
/// the reference and shared by every clone made afterwards. Writers obtain a
/// private copy with [`PageReference::prepare_for_modification`], which
/// clones the page only if some other revision still shares it.
#[derive(Clone)]
pub struct PageReference<N> {
    location: Option<PageLocation>,
    page: OnceLock<Arc<Page<N>>>,
}

impl<N> Default for PageReference<N> {
    fn default() -> Self {
        Self {
            location: None,
            page: OnceLock::new(),
        }
    }
}

impl<N: NodeRecord> PageReference<N> {
    /// Creates an empty reference.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unresolved reference to a persisted page.
    pub fn persisted(location: PageLocation) -> Self {
        Self {
            location: Some(location),
            page: OnceLock::new(),
        }
    }

    /// Creates a dirty reference holding a page that has not been written.
    pub fn dirty(page: Page<N>) -> Self {
        Self {
            location: None,
            page: OnceLock::from(Arc::new(page)),
        }
    }

    /// Creates a clean reference for a page just written at `location`.
    pub fn written(location: PageLocation, page: Arc<Page<N>>) -> Self {
        Self {
            location: Some(location),
            page: OnceLock::from(page),
        }
    }

    /// Persisted location, if the page has been written.
    #[inline]
    pub fn location(&self) -> Option<PageLocation> {
        self.location
    }

    /// Checksum of the persisted page, if any.
    #[inline]
    pub fn checksum(&self) -> Option<u32> {
        self.location.map(|location| location.checksum)
    }

    /// The in-memory page, if loaded.
    #[inline]
    pub fn page(&self) -> Option<&Arc<Page<N>>> {
        self.page.get()
    }

    /// Returns true if the page is in memory but not yet written.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.location.is_none() && self.page.get().is_some()
    }

    /// Returns true if the reference points nowhere.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.page.get().is_none()
    }

    /// Materializes the page, reading it from `backend` on first use.
    ///
    /// Idempotent: later calls return the cached page.
    pub fn resolve(&self, backend: &dyn StorageBackend<N>) -> StorageResult<&Arc<Page<N>>> {
        if let Some(page) = self.page.get() {
            return Ok(page);
        }

        let location = self.location.ok_or(StorageError::UnresolvableReference)?;
        trace!(%location, "resolving page reference");
        let page = Arc::new(backend.read_page(location)?);
        // A concurrent resolver may win the race; both loaded the same bytes.
        let _ = self.page.set(page);
        self.page.get().ok_or(StorageError::UnresolvableReference)
    }

    /// Returns a private, mutable copy of the page and marks the reference
    /// dirty.
    ///
    /// The page is loaded from `backend` if only its location is known, or
    /// built with `create` if the reference is empty. A page still shared
    /// with a committed revision is cloned before it is handed out.
    pub fn prepare_for_modification(
        &mut self,
        backend: &dyn StorageBackend<N>,
        create: impl FnOnce() -> Page<N>,
    ) -> StorageResult<&mut Page<N>> {
        if self.page.get().is_none() {
            let page = match self.location {
                Some(location) => backend.read_page(location)?,
                None => create(),
            };
            let _ = self.page.set(Arc::new(page));
        }

        self.location = None;
        self.page
            .get_mut()
            .map(Arc::make_mut)
            .ok_or(StorageError::UnresolvableReference)
    }

    /// Replaces the target with a new dirty page.
    pub fn set_page(&mut self, page: Page<N>) {
        self.location = None;
        self.page = OnceLock::from(Arc::new(page));
    }

    /// Removes the in-memory page, leaving the location untouched.
    pub fn take_page(&mut self) -> Option<Arc<Page<N>>> {
        self.page.take()
    }

    /// Returns a reference with the same location and no cached page.
    pub fn detached(&self) -> Self {
        Self {
            location: self.location,
            page: OnceLock::new(),
        }
    }
}

impl<N> fmt::Debug for PageReference<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match (self.location.is_some(), self.page.get().is_some()) {
            (false, false) => "empty",
            (true, false) => "unresolved",
            (true, true) => "clean",
            (false, true) => "dirty",
        };
        f.debug_struct("PageReference")
            .field("location", &self.location)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::page::NamePage;
    use crate::record::TreeNode;

    fn name_page(name: &str) -> Page<TreeNode> {
        let mut page = NamePage::new();
        page.intern(name);
        Page::Name(page)
    }

    #[test]
    fn test_states() {
        let empty: PageReference<TreeNode> = PageReference::new();
        assert!(empty.is_empty());
        assert!(!empty.is_dirty());

        let dirty = PageReference::dirty(name_page("a"));
        assert!(dirty.is_dirty());
        assert!(dirty.location().is_none());

        let unresolved: PageReference<TreeNode> =
            PageReference::persisted(PageLocation::new(3, 0xABCD));
        assert!(!unresolved.is_empty());
        assert!(!unresolved.is_dirty());
        assert!(unresolved.page().is_none());
        assert_eq!(unresolved.checksum(), Some(0xABCD));
    }

    #[test]
    fn test_resolve_empty_fails() {
        let backend = MemoryBackend::<TreeNode>::new();
        let empty: PageReference<TreeNode> = PageReference::new();
        assert!(matches!(
            empty.resolve(&backend),
            Err(StorageError::UnresolvableReference)
        ));
    }

    #[test]
    fn test_resolve_caches_page() {
        let backend = MemoryBackend::<TreeNode>::new();
        let location = backend.write(&name_page("cached")).unwrap();

        let reference = PageReference::persisted(location);
        let first = Arc::clone(reference.resolve(&backend).unwrap());
        let second = reference.resolve(&backend).unwrap();
        assert!(Arc::ptr_eq(&first, second));
        assert_eq!(backend.stats().reads, 1);
    }

    #[test]
    fn test_prepare_clones_shared_page() {
        let backend = MemoryBackend::<TreeNode>::new();
        let location = backend.write(&name_page("shared")).unwrap();

        let committed = PageReference::persisted(location);
        committed.resolve(&backend).unwrap();

        let mut private = committed.clone();
        let page = private
            .prepare_for_modification(&backend, || Page::Name(NamePage::new()))
            .unwrap();
        page.as_name_mut().unwrap().intern("private");

        assert!(private.is_dirty());
        assert!(committed.location().is_some());
        let committed_names = committed.page().unwrap().as_name().unwrap();
        assert_eq!(committed_names.len(), 1);
        let private_names = private.page().unwrap().as_name().unwrap();
        assert_eq!(private_names.len(), 2);
    }

    #[test]
    fn test_prepare_creates_missing_page() {
        let backend = MemoryBackend::<TreeNode>::new();
        let mut reference: PageReference<TreeNode> = PageReference::new();
        reference
            .prepare_for_modification(&backend, || name_page("fresh"))
            .unwrap();
        assert!(reference.is_dirty());
        assert_eq!(backend.stats().reads, 0);
    }

    #[test]
    fn test_prepare_dirty_page_is_not_cloned() {
        let backend = MemoryBackend::<TreeNode>::new();
        let mut reference = PageReference::dirty(name_page("x"));
        let before = Arc::as_ptr(reference.page().unwrap());
        reference
            .prepare_for_modification(&backend, || Page::Name(NamePage::new()))
            .unwrap();
        assert_eq!(before, Arc::as_ptr(reference.page().unwrap()));
    }
}
