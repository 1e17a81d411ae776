//! # revdb-storage
//!
//! The versioned page graph for revdb.
//!
//! Every committed revision is reachable from one [`UberPage`]. Below it an
//! indirect tree keyed by revision number leads to [`RevisionRootPage`]s, and
//! below each of those a second indirect tree keyed by node-page key leads
//! to [`NodePage`]s. Pages are shared between revisions through
//! reference-counted handles; a writer clones a page only when it modifies
//! it.
//!
//! ```text
//! UberPage
//!   └─ indirect tree (by revision)
//!        └─ RevisionRootPage ── NamePage
//!             └─ indirect tree (by node-page key)
//!                  └─ NodePage ─previous→ NodePage ─previous→ ...
//! ```
//!
//! Pages are persisted through a [`StorageBackend`]; [`MemoryBackend`] and
//! [`FileBackend`] ship with the crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Storage backends
pub mod backend;

/// Reconstructed-page cache for readers
pub mod cache;

/// Storage error types
pub mod error;

/// Pages, references, and the page codec
pub mod page;

/// Node records stored in node pages
pub mod record;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use cache::{CacheStats, PageCache};
pub use error::{StorageError, StorageResult};
pub use page::persist::persist;
pub use page::{
    IndirectPage, NamePage, NodePage, Page, PageReference, PageType, RevisionRootPage, UberPage,
};
pub use record::{NodeKind, NodeRecord, NodeSlot, TreeNode};
