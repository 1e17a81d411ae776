//! Node records stored in node pages.
//!
//! The page engine is generic over the record type. A record knows its own
//! key, exposes the structural links the surrounding tree API needs, and can
//! serialize itself into a node page.

use std::fmt;

use bytes::{Buf, BufMut, Bytes};
use revdb_common::types::{NameKey, NodeKey};

use crate::error::{StorageError, StorageResult};
use crate::page::codec::ensure_remaining;

/// A node record that can live in a [`NodePage`](crate::page::NodePage).
pub trait NodeRecord: Clone + fmt::Debug + Send + Sync + 'static {
    /// The key of this node.
    fn node_key(&self) -> NodeKey;

    /// Assigns the key. Called once by the write transaction on creation.
    fn set_node_key(&mut self, key: NodeKey);

    /// Parent node, or [`NodeKey::NULL`].
    fn parent_key(&self) -> NodeKey;

    /// First child, or [`NodeKey::NULL`].
    fn first_child_key(&self) -> NodeKey;

    /// Left sibling, or [`NodeKey::NULL`].
    fn left_sibling_key(&self) -> NodeKey;

    /// Right sibling, or [`NodeKey::NULL`].
    fn right_sibling_key(&self) -> NodeKey;

    /// Appends the serialized record to `buf`.
    fn encode<B: BufMut>(&self, buf: &mut B);

    /// Reads one record previously written by [`NodeRecord::encode`].
    fn decode<B: Buf>(buf: &mut B) -> StorageResult<Self>;
}

/// Content of one occupied node-page slot.
///
/// A tombstone occupies its slot so that older versions of the page cannot
/// resurface the removed node during reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSlot<N> {
    /// A live node.
    Live(N),
    /// A removed node.
    Deleted(NodeKey),
}

impl<N: NodeRecord> NodeSlot<N> {
    /// Returns the live node, if any.
    #[inline]
    pub fn as_live(&self) -> Option<&N> {
        match self {
            Self::Live(node) => Some(node),
            Self::Deleted(_) => None,
        }
    }

    /// Returns the live node mutably, if any.
    #[inline]
    pub fn as_live_mut(&mut self) -> Option<&mut N> {
        match self {
            Self::Live(node) => Some(node),
            Self::Deleted(_) => None,
        }
    }

    /// Returns true for a tombstone.
    #[inline]
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted(_))
    }

    /// The key held in this slot.
    pub fn node_key(&self) -> NodeKey {
        match self {
            Self::Live(node) => node.node_key(),
            Self::Deleted(key) => *key,
        }
    }
}

/// Kind of a [`TreeNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeKind {
    /// Root of a document.
    Document = 1,
    /// Element with a name.
    Element = 2,
    /// Attribute with a name and value.
    Attribute = 3,
    /// Text content.
    Text = 4,
    /// Namespace declaration.
    Namespace = 5,
}

impl NodeKind {
    /// Creates a NodeKind from a raw byte value.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Document),
            2 => Some(Self::Element),
            3 => Some(Self::Attribute),
            4 => Some(Self::Text),
            5 => Some(Self::Namespace),
            _ => None,
        }
    }
}

/// General-purpose node record with tree links, a name, and a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Key of this node.
    pub key: NodeKey,
    /// Parent link.
    pub parent: NodeKey,
    /// First child link.
    pub first_child: NodeKey,
    /// Left sibling link.
    pub left_sibling: NodeKey,
    /// Right sibling link.
    pub right_sibling: NodeKey,
    /// Node kind.
    pub kind: NodeKind,
    /// Interned name, or [`NameKey::NULL`].
    pub name: NameKey,
    /// Raw value.
    pub value: Bytes,
}

const TREE_NODE_FIXED_SIZE: usize = 5 * 8 + 1 + 4 + 4;

impl TreeNode {
    /// Creates an unlinked node. The key is assigned on creation.
    pub fn new(kind: NodeKind, value: impl Into<Bytes>) -> Self {
        Self {
            key: NodeKey::NULL,
            parent: NodeKey::NULL,
            first_child: NodeKey::NULL,
            left_sibling: NodeKey::NULL,
            right_sibling: NodeKey::NULL,
            kind,
            name: NameKey::NULL,
            value: value.into(),
        }
    }

    /// Creates a text node.
    pub fn text(value: impl Into<Bytes>) -> Self {
        Self::new(NodeKind::Text, value)
    }

    /// Creates an element node with an interned name.
    pub fn element(name: NameKey) -> Self {
        Self {
            name,
            ..Self::new(NodeKind::Element, Bytes::new())
        }
    }

    /// Sets the parent link.
    #[must_use]
    pub fn with_parent(mut self, parent: NodeKey) -> Self {
        self.parent = parent;
        self
    }

    /// Replaces the value.
    pub fn set_value(&mut self, value: impl Into<Bytes>) {
        self.value = value.into();
    }
}

impl NodeRecord for TreeNode {
    fn node_key(&self) -> NodeKey {
        self.key
    }

    fn set_node_key(&mut self, key: NodeKey) {
        self.key = key;
    }

    fn parent_key(&self) -> NodeKey {
        self.parent
    }

    fn first_child_key(&self) -> NodeKey {
        self.first_child
    }

    fn left_sibling_key(&self) -> NodeKey {
        self.left_sibling
    }

    fn right_sibling_key(&self) -> NodeKey {
        self.right_sibling
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64(self.key.as_u64());
        buf.put_u64(self.parent.as_u64());
        buf.put_u64(self.first_child.as_u64());
        buf.put_u64(self.left_sibling.as_u64());
        buf.put_u64(self.right_sibling.as_u64());
        buf.put_u8(self.kind as u8);
        buf.put_i32(self.name.as_i32());
        buf.put_u32(self.value.len() as u32);
        buf.put_slice(&self.value);
    }

    fn decode<B: Buf>(buf: &mut B) -> StorageResult<Self> {
        ensure_remaining(&*buf, TREE_NODE_FIXED_SIZE, "tree node header")?;
        let key = NodeKey::new(buf.get_u64());
        let parent = NodeKey::new(buf.get_u64());
        let first_child = NodeKey::new(buf.get_u64());
        let left_sibling = NodeKey::new(buf.get_u64());
        let right_sibling = NodeKey::new(buf.get_u64());
        let kind_byte = buf.get_u8();
        let kind = NodeKind::from_u8(kind_byte)
            .ok_or_else(|| StorageError::corrupted(format!("unknown node kind {kind_byte}")))?;
        let name = NameKey::new(buf.get_i32());
        let value_len = buf.get_u32() as usize;
        ensure_remaining(&*buf, value_len, "tree node value")?;
        let value = buf.copy_to_bytes(value_len);

        Ok(Self {
            key,
            parent,
            first_child,
            left_sibling,
            right_sibling,
            kind,
            name,
            value,
        })
    }
}
