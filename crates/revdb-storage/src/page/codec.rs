//! Binary page codec.
//!
//! Every encoded page starts with its [`PageType`] tag. References are
//! encoded as a presence flag followed by offset and checksum; a dirty
//! reference cannot be encoded because its child has no location yet.
//!
//! ```text
//! Uber:         tag | revision u64 | count u64 | max_key u64 | bootstrap u8 | ref
//! Indirect:     tag | n u16 | n × (offset u16 | ref)
//! RevisionRoot: tag | revision u64 | max_key u64 | node_count u64 | timestamp u64 | ref | ref
//! Node:         tag | page_key u64 | revision u64 | chain_len u32 | ref | n u16 | n × slot
//! Name:         tag | n u32 | n × (key i32 | len u32 | utf8)
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use revdb_common::types::{NameKey, NodeKey, PageKey, PageLocation, Revision};

use crate::error::{StorageError, StorageResult};
use crate::page::{
    IndirectPage, NamePage, NodePage, Page, PageReference, PageType, RevisionRootPage, UberPage,
};
use crate::record::{NodeRecord, NodeSlot};

const REFERENCE_ABSENT: u8 = 0;
const REFERENCE_PRESENT: u8 = 1;

const SLOT_LIVE: u8 = 1;
const SLOT_DELETED: u8 = 2;

/// Fails with a corruption error if fewer than `needed` bytes remain.
#[inline]
pub fn ensure_remaining<B: Buf>(buf: &B, needed: usize, what: &str) -> StorageResult<()> {
    if buf.remaining() < needed {
        return Err(StorageError::corrupted(format!(
            "{what} truncated: need {needed} bytes, have {}",
            buf.remaining()
        )));
    }
    Ok(())
}

/// Serializes a page.
pub fn encode_page<N: NodeRecord>(page: &Page<N>) -> StorageResult<Bytes> {
    let mut buf = BytesMut::with_capacity(256);
    buf.put_u8(page.page_type() as u8);

    match page {
        Page::Uber(uber) => {
            buf.put_u64(uber.revision_number().as_u64());
            buf.put_u64(uber.revision_count());
            buf.put_u64(uber.max_node_key().as_u64());
            buf.put_u8(u8::from(uber.is_bootstrap()));
            encode_reference(uber.indirect_root(), &mut buf)?;
        }
        Page::Indirect(indirect) => {
            let occupied: Vec<_> = indirect.occupied().collect();
            buf.put_u16(occupied.len() as u16);
            for (offset, reference) in occupied {
                buf.put_u16(offset as u16);
                encode_reference(reference, &mut buf)?;
            }
        }
        Page::RevisionRoot(root) => {
            buf.put_u64(root.revision().as_u64());
            buf.put_u64(root.max_node_key().as_u64());
            buf.put_u64(root.node_count());
            buf.put_u64(root.timestamp());
            encode_reference(root.name_page_ref(), &mut buf)?;
            encode_reference(root.node_indirect_root(), &mut buf)?;
        }
        Page::Node(node) => {
            buf.put_u64(node.page_key().as_u64());
            buf.put_u64(node.revision().as_u64());
            buf.put_u32(node.chain_len());
            encode_location(node.previous(), &mut buf);
            buf.put_u16(node.occupied_count() as u16);
            for (slot, content) in node.occupied() {
                buf.put_u16(slot as u16);
                match content {
                    NodeSlot::Live(record) => {
                        buf.put_u8(SLOT_LIVE);
                        record.encode(&mut buf);
                    }
                    NodeSlot::Deleted(key) => {
                        buf.put_u8(SLOT_DELETED);
                        buf.put_u64(key.as_u64());
                    }
                }
            }
        }
        Page::Name(names) => {
            buf.put_u32(names.len() as u32);
            for (key, name) in names.iter() {
                buf.put_i32(key.as_i32());
                buf.put_u32(name.len() as u32);
                buf.put_slice(name.as_bytes());
            }
        }
    }

    Ok(buf.freeze())
}

/// Deserializes a page previously produced by [`encode_page`].
pub fn decode_page<N: NodeRecord>(bytes: &[u8]) -> StorageResult<Page<N>> {
    let mut buf = bytes;
    ensure_remaining(&buf, 1, "page tag")?;
    let tag = buf.get_u8();
    let page_type = PageType::from_u8(tag)
        .ok_or_else(|| StorageError::corrupted(format!("unknown page type tag {tag}")))?;

    let page = match page_type {
        PageType::Uber => {
            ensure_remaining(&buf, 25, "uber page")?;
            let revision_number = Revision::new(buf.get_u64());
            let revision_count = buf.get_u64();
            let max_node_key = NodeKey::new(buf.get_u64());
            let is_bootstrap = buf.get_u8() != 0;
            let indirect_root = decode_reference(&mut buf)?;
            Page::Uber(UberPage::from_parts(
                revision_number,
                revision_count,
                max_node_key,
                indirect_root,
                is_bootstrap,
            ))
        }
        PageType::Indirect => {
            ensure_remaining(&buf, 2, "indirect page")?;
            let count = buf.get_u16() as usize;
            let mut indirect = IndirectPage::new();
            for _ in 0..count {
                ensure_remaining(&buf, 2, "indirect offset")?;
                let offset = buf.get_u16() as usize;
                let reference = decode_reference(&mut buf)?;
                let capacity = indirect.capacity();
                *indirect
                    .reference_mut(offset)
                    .ok_or(StorageError::SlotOutOfRange {
                        slot: offset,
                        capacity,
                    })? = reference;
            }
            Page::Indirect(indirect)
        }
        PageType::RevisionRoot => {
            ensure_remaining(&buf, 32, "revision root page")?;
            let revision = Revision::new(buf.get_u64());
            let max_node_key = NodeKey::new(buf.get_u64());
            let node_count = buf.get_u64();
            let timestamp = buf.get_u64();
            let name_page_ref = decode_reference(&mut buf)?;
            let node_indirect_root = decode_reference(&mut buf)?;
            Page::RevisionRoot(RevisionRootPage::from_parts(
                revision,
                max_node_key,
                node_count,
                timestamp,
                name_page_ref,
                node_indirect_root,
            ))
        }
        PageType::Node => {
            ensure_remaining(&buf, 20, "node page")?;
            let page_key = PageKey::new(buf.get_u64());
            let revision = Revision::new(buf.get_u64());
            let chain_len = buf.get_u32();
            let previous = decode_location(&mut buf)?;
            ensure_remaining(&buf, 2, "node slot count")?;
            let count = buf.get_u16() as usize;

            let mut node = NodePage::new(page_key, revision);
            node.set_chain_len(chain_len);
            node.set_previous(previous);
            for _ in 0..count {
                ensure_remaining(&buf, 3, "node slot")?;
                let slot = buf.get_u16() as usize;
                let content = match buf.get_u8() {
                    SLOT_LIVE => NodeSlot::Live(N::decode(&mut buf)?),
                    SLOT_DELETED => {
                        ensure_remaining(&buf, 8, "tombstone")?;
                        NodeSlot::Deleted(NodeKey::new(buf.get_u64()))
                    }
                    other => {
                        return Err(StorageError::corrupted(format!("unknown slot tag {other}")))
                    }
                };
                node.set_slot(slot, content)?;
            }
            Page::Node(node)
        }
        PageType::Name => {
            ensure_remaining(&buf, 4, "name page")?;
            let count = buf.get_u32() as usize;
            let mut names = NamePage::new();
            for _ in 0..count {
                ensure_remaining(&buf, 8, "name entry")?;
                let key = NameKey::new(buf.get_i32());
                let len = buf.get_u32() as usize;
                ensure_remaining(&buf, len, "name bytes")?;
                let name = std::str::from_utf8(&buf[..len])
                    .map_err(|e| StorageError::corrupted(format!("name is not UTF-8: {e}")))?
                    .to_owned();
                buf.advance(len);
                names.insert(key, name);
            }
            Page::Name(names)
        }
    };

    if buf.has_remaining() {
        return Err(StorageError::corrupted(format!(
            "{} trailing bytes after {page_type} page",
            buf.remaining()
        )));
    }
    Ok(page)
}

/// Serializes a reference. Fails if the reference is dirty.
pub fn encode_reference<N: NodeRecord, B: BufMut>(
    reference: &PageReference<N>,
    buf: &mut B,
) -> StorageResult<()> {
    if reference.is_dirty() {
        return Err(StorageError::DirtyReference);
    }
    encode_location(reference.location(), buf);
    Ok(())
}

/// Deserializes an unresolved reference.
pub fn decode_reference<N: NodeRecord, B: Buf>(buf: &mut B) -> StorageResult<PageReference<N>> {
    Ok(match decode_location(buf)? {
        Some(location) => PageReference::persisted(location),
        None => PageReference::new(),
    })
}

fn encode_location<B: BufMut>(location: Option<PageLocation>, buf: &mut B) {
    match location {
        Some(location) => {
            buf.put_u8(REFERENCE_PRESENT);
            buf.put_u64(location.offset);
            buf.put_u32(location.checksum);
        }
        None => buf.put_u8(REFERENCE_ABSENT),
    }
}

fn decode_location<B: Buf>(buf: &mut B) -> StorageResult<Option<PageLocation>> {
    ensure_remaining(&*buf, 1, "reference flag")?;
    match buf.get_u8() {
        REFERENCE_ABSENT => Ok(None),
        REFERENCE_PRESENT => {
            ensure_remaining(&*buf, 12, "reference")?;
            let offset = buf.get_u64();
            let checksum = buf.get_u32();
            Ok(Some(PageLocation::new(offset, checksum)))
        }
        other => Err(StorageError::corrupted(format!("unknown reference flag {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TreeNode;

    fn live(key: u64, value: &str) -> NodeSlot<TreeNode> {
        let mut node = TreeNode::text(value.to_owned());
        node.key = NodeKey::new(key);
        NodeSlot::Live(node)
    }

    #[test]
    fn test_node_page_codec() {
        let mut page = NodePage::new(PageKey::new(2), Revision::new(7));
        page.set_chain_len(3);
        page.set_previous(Some(PageLocation::new(40, 0xDEAD_BEEF)));
        page.set_slot(0, live(256, "first")).unwrap();
        page.set_slot(9, NodeSlot::Deleted(NodeKey::new(265))).unwrap();

        let bytes = encode_page(&Page::Node(page)).unwrap();
        let decoded: Page<TreeNode> = decode_page(&bytes).unwrap();
        let decoded = decoded.as_node().unwrap();

        assert_eq!(decoded.page_key(), PageKey::new(2));
        assert_eq!(decoded.revision(), Revision::new(7));
        assert_eq!(decoded.chain_len(), 3);
        assert_eq!(decoded.previous(), Some(PageLocation::new(40, 0xDEAD_BEEF)));
        assert_eq!(decoded.node(0).unwrap().value.as_ref(), b"first");
        assert!(decoded.slot(9).unwrap().is_deleted());
        assert_eq!(decoded.occupied_count(), 2);
    }

    #[test]
    fn test_indirect_page_keeps_offsets() {
        let mut page: IndirectPage<TreeNode> = IndirectPage::new();
        *page.reference_mut(3).unwrap() = PageReference::persisted(PageLocation::new(1, 2));
        *page.reference_mut(127).unwrap() = PageReference::persisted(PageLocation::new(5, 6));

        let bytes = encode_page(&Page::Indirect(page)).unwrap();
        let decoded: Page<TreeNode> = decode_page(&bytes).unwrap();
        let decoded = decoded.as_indirect().unwrap();

        let occupied: Vec<_> = decoded
            .occupied()
            .map(|(offset, reference)| (offset, reference.location().unwrap().offset))
            .collect();
        assert_eq!(occupied, vec![(3, 1), (127, 5)]);
    }

    #[test]
    fn test_dirty_reference_is_rejected() {
        let mut root: RevisionRootPage<TreeNode> = RevisionRootPage::new(Revision::new(1), 0);
        root.name_page_ref_mut().set_page(Page::Name(NamePage::new()));
        let result = encode_page(&Page::RevisionRoot(root));
        assert!(matches!(result, Err(StorageError::DirtyReference)));
    }

    #[test]
    fn test_name_page_codec() {
        let mut names = NamePage::new();
        let a = names.intern("alpha");
        let b = names.intern("βeta");

        let bytes = encode_page::<TreeNode>(&Page::Name(names)).unwrap();
        let decoded: Page<TreeNode> = decode_page(&bytes).unwrap();
        let decoded = decoded.as_name().unwrap();
        assert_eq!(decoded.get(a), Some("alpha"));
        assert_eq!(decoded.get(b), Some("βeta"));
    }

    #[test]
    fn test_truncated_and_unknown_input() {
        assert!(decode_page::<TreeNode>(&[]).is_err());
        assert!(decode_page::<TreeNode>(&[99]).is_err());

        let root: RevisionRootPage<TreeNode> = RevisionRootPage::new(Revision::new(1), 0);
        let bytes = encode_page(&Page::RevisionRoot(root)).unwrap();
        assert!(decode_page::<TreeNode>(&bytes[..bytes.len() - 1]).is_err());

        let mut extended = bytes.to_vec();
        extended.push(0);
        assert!(decode_page::<TreeNode>(&extended).is_err());
    }
}
