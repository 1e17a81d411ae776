//! Writing dirty page trees.
//!
//! A commit leaves a tree of dirty pages hanging off the new uber page. They
//! are written children first, so that every parent is encoded with the
//! locations of its children. The walk uses an explicit stack of owned
//! pages: a dirty child is detached from its parent, pushed, written when
//! all of its own dirty children are done, and reattached as a clean
//! reference. Node pages are reattached by location only and reloaded on
//! demand; the smaller structural pages stay in memory.

use std::sync::Arc;

use tracing::trace;

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::page::{Page, PageReference};
use crate::record::NodeRecord;

struct Frame<N> {
    page: Page<N>,
    next_child: usize,
    slot_in_parent: usize,
}

/// Writes every dirty page reachable from `root` exactly once and replaces
/// `root` with a clean reference. Returns the number of pages written.
///
/// On error the tree is left partially detached and must be discarded.
pub fn persist<N: NodeRecord>(
    root: &mut PageReference<N>,
    backend: &dyn StorageBackend<N>,
) -> StorageResult<usize> {
    if !root.is_dirty() {
        return Ok(0);
    }

    let mut stack = vec![Frame {
        page: take_dirty(root)?,
        next_child: 0,
        slot_in_parent: 0,
    }];
    let mut written = 0;

    while let Some(frame) = stack.last_mut() {
        let mut dirty_child = None;
        while frame.next_child < frame.page.child_count() {
            let index = frame.next_child;
            frame.next_child += 1;
            if let Some(child) = frame.page.child_mut(index) {
                if child.is_dirty() {
                    dirty_child = Some((index, take_dirty(child)?));
                    break;
                }
            }
        }

        if let Some((slot_in_parent, page)) = dirty_child {
            stack.push(Frame {
                page,
                next_child: 0,
                slot_in_parent,
            });
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let location = backend.write(&done.page)?;
        written += 1;
        trace!(page_type = %done.page.page_type(), %location, "persisted page");

        let reference = match done.page {
            Page::Node(_) => PageReference::persisted(location),
            page => PageReference::written(location, Arc::new(page)),
        };
        match stack.last_mut() {
            Some(parent) => {
                let slot = parent
                    .page
                    .child_mut(done.slot_in_parent)
                    .ok_or(StorageError::UnresolvableReference)?;
                *slot = reference;
            }
            None => *root = reference,
        }
    }

    Ok(written)
}

fn take_dirty<N: NodeRecord>(reference: &mut PageReference<N>) -> StorageResult<Page<N>> {
    let page = reference
        .take_page()
        .ok_or(StorageError::UnresolvableReference)?;
    Ok(Arc::try_unwrap(page).unwrap_or_else(|shared| (*shared).clone()))
}
