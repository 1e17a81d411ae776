//! Pages of the versioned page graph.
//!
//! Five page kinds make up a store:
//!
//! - **Uber**: root of one committed revision, indexes all revision roots
//! - **Indirect**: fixed-fanout radix node of an indirect tree
//! - **RevisionRoot**: per-revision root, indexes that revision's node pages
//! - **Node**: slots for a contiguous range of node keys
//! - **Name**: string-interning table
//!
//! Pages link to each other through [`PageReference`]s. Parents are always
//! persisted after their children, so a persisted page only ever refers to
//! persisted pages.

pub mod codec;
pub mod indirect;
pub mod persist;

mod checksum;
mod name;
mod node;
mod reference;
mod revision_root;
mod types;
mod uber;

pub use checksum::{compute_checksum, verify_checksum};
pub use indirect::IndirectPage;
pub use name::NamePage;
pub use node::NodePage;
pub use reference::PageReference;
pub use revision_root::RevisionRootPage;
pub use types::PageType;
pub use uber::UberPage;

use crate::error::{StorageError, StorageResult};
use crate::record::NodeRecord;

/// Any page of the graph.
#[derive(Debug, Clone)]
pub enum Page<N> {
    /// Store root of one revision.
    Uber(UberPage<N>),
    /// Radix node of an indirect tree.
    Indirect(IndirectPage<N>),
    /// Root of one revision.
    RevisionRoot(RevisionRootPage<N>),
    /// Node slots.
    Node(NodePage<N>),
    /// Interned names.
    Name(NamePage),
}

impl<N: NodeRecord> Page<N> {
    /// Returns the type of this page.
    pub fn page_type(&self) -> PageType {
        match self {
            Self::Uber(_) => PageType::Uber,
            Self::Indirect(_) => PageType::Indirect,
            Self::RevisionRoot(_) => PageType::RevisionRoot,
            Self::Node(_) => PageType::Node,
            Self::Name(_) => PageType::Name,
        }
    }

    /// Number of child references this page holds.
    pub fn child_count(&self) -> usize {
        match self {
            Self::Uber(_) => 1,
            Self::Indirect(page) => page.capacity(),
            Self::RevisionRoot(_) => 2,
            Self::Node(_) | Self::Name(_) => 0,
        }
    }

    /// Returns the child reference at `index`, in persistence order.
    pub fn child(&self, index: usize) -> Option<&PageReference<N>> {
        match self {
            Self::Uber(page) if index == 0 => Some(page.indirect_root()),
            Self::Indirect(page) => page.reference(index),
            Self::RevisionRoot(page) => match index {
                0 => Some(page.name_page_ref()),
                1 => Some(page.node_indirect_root()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns the child reference at `index` mutably.
    pub fn child_mut(&mut self, index: usize) -> Option<&mut PageReference<N>> {
        match self {
            Self::Uber(page) if index == 0 => Some(page.indirect_root_mut()),
            Self::Indirect(page) => page.reference_mut(index),
            Self::RevisionRoot(page) => match index {
                0 => Some(page.name_page_ref_mut()),
                1 => Some(page.node_indirect_root_mut()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Borrows this page as an uber page.
    pub fn as_uber(&self) -> StorageResult<&UberPage<N>> {
        match self {
            Self::Uber(page) => Ok(page),
            other => Err(StorageError::unexpected_page(PageType::Uber, other.page_type())),
        }
    }

    /// Borrows this page as an indirect page.
    pub fn as_indirect(&self) -> StorageResult<&IndirectPage<N>> {
        match self {
            Self::Indirect(page) => Ok(page),
            other => Err(StorageError::unexpected_page(PageType::Indirect, other.page_type())),
        }
    }

    /// Borrows this page mutably as an indirect page.
    pub fn as_indirect_mut(&mut self) -> StorageResult<&mut IndirectPage<N>> {
        match self {
            Self::Indirect(page) => Ok(page),
            other => Err(StorageError::unexpected_page(PageType::Indirect, other.page_type())),
        }
    }

    /// Borrows this page as a revision root.
    pub fn as_revision_root(&self) -> StorageResult<&RevisionRootPage<N>> {
        match self {
            Self::RevisionRoot(page) => Ok(page),
            other => Err(StorageError::unexpected_page(
                PageType::RevisionRoot,
                other.page_type(),
            )),
        }
    }

    /// Borrows this page as a node page.
    pub fn as_node(&self) -> StorageResult<&NodePage<N>> {
        match self {
            Self::Node(page) => Ok(page),
            other => Err(StorageError::unexpected_page(PageType::Node, other.page_type())),
        }
    }

    /// Borrows this page as a name page.
    pub fn as_name(&self) -> StorageResult<&NamePage> {
        match self {
            Self::Name(page) => Ok(page),
            other => Err(StorageError::unexpected_page(PageType::Name, other.page_type())),
        }
    }

    /// Borrows this page mutably as a name page.
    pub fn as_name_mut(&mut self) -> StorageResult<&mut NamePage> {
        match self {
            Self::Name(page) => Ok(page),
            other => Err(StorageError::unexpected_page(PageType::Name, other.page_type())),
        }
    }
}
