//! Private page map of one write transaction.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use revdb_common::types::{NodeKey, PageKey};
use revdb_mvcc::NodePageContainer;
use revdb_storage::record::NodeRecord;

use crate::error::{TransactionError, TxnResult};

/// Node page containers touched by a write transaction, keyed by page key.
///
/// Readers never see the log. It is drained in key order on commit and
/// cleared on abort. At most one node may be prepared for modification at a
/// time.
#[derive(Debug)]
pub struct TransactionLog<N: NodeRecord> {
    containers: BTreeMap<PageKey, NodePageContainer<N>>,
    in_flight: Option<NodeKey>,
}

impl<N: NodeRecord> Default for TransactionLog<N> {
    fn default() -> Self {
        Self {
            containers: BTreeMap::new(),
            in_flight: None,
        }
    }
}

impl<N: NodeRecord> TransactionLog<N> {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Container for `page_key`, if the transaction touched it.
    pub fn get(&self, page_key: PageKey) -> Option<&NodePageContainer<N>> {
        self.containers.get(&page_key)
    }

    /// Mutable container for `page_key`.
    pub fn get_mut(&mut self, page_key: PageKey) -> Option<&mut NodePageContainer<N>> {
        self.containers.get_mut(&page_key)
    }

    /// Returns the container for `page_key`, building it with `load` the
    /// first time the page is touched.
    pub fn get_or_create(
        &mut self,
        page_key: PageKey,
        load: impl FnOnce() -> TxnResult<NodePageContainer<N>>,
    ) -> TxnResult<&mut NodePageContainer<N>> {
        match self.containers.entry(page_key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(load()?)),
        }
    }

    /// Stores a container, replacing any previous one.
    pub fn put(&mut self, container: NodePageContainer<N>) {
        self.containers.insert(container.page_key(), container);
    }

    /// Returns true if `page_key` has a container.
    pub fn contains(&self, page_key: PageKey) -> bool {
        self.containers.contains_key(&page_key)
    }

    /// Number of touched pages.
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Returns true if no page was touched.
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Marks `key` as being modified.
    pub fn begin_modification(&mut self, key: NodeKey) -> TxnResult<()> {
        if let Some(in_flight) = self.in_flight {
            return Err(TransactionError::NestedModification { in_flight });
        }
        self.in_flight = Some(key);
        Ok(())
    }

    /// Ends the modification of `key`.
    pub fn finish_modification(&mut self, key: NodeKey) -> TxnResult<()> {
        match self.in_flight {
            Some(in_flight) if in_flight == key => {
                self.in_flight = None;
                Ok(())
            }
            _ => Err(TransactionError::NotInFlight { key }),
        }
    }

    /// Node currently prepared for modification.
    pub fn in_flight(&self) -> Option<NodeKey> {
        self.in_flight
    }

    /// Removes every container in page key order.
    pub fn drain(&mut self) -> impl Iterator<Item = (PageKey, NodePageContainer<N>)> {
        self.in_flight = None;
        std::mem::take(&mut self.containers).into_iter()
    }

    /// Discards all containers.
    pub fn clear(&mut self) {
        self.containers.clear();
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revdb_common::types::Revision;
    use revdb_storage::record::TreeNode;

    fn container(page_key: u64) -> NodePageContainer<TreeNode> {
        NodePageContainer::empty(PageKey::new(page_key), Revision::new(1))
    }

    #[test]
    fn test_get_or_create_loads_once() {
        let mut log = TransactionLog::new();
        let mut loads = 0;
        for _ in 0..3 {
            log.get_or_create(PageKey::new(4), || {
                loads += 1;
                Ok(container(4))
            })
            .unwrap();
        }
        assert_eq!(loads, 1);
        assert!(log.contains(PageKey::new(4)));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_failed_load_leaves_no_entry() {
        let mut log: TransactionLog<TreeNode> = TransactionLog::new();
        let result = log.get_or_create(PageKey::new(1), || Err(TransactionError::Closed));
        assert!(matches!(result, Err(TransactionError::Closed)));
        assert!(log.is_empty());
    }

    #[test]
    fn test_nested_modification_fails_fast() {
        let mut log: TransactionLog<TreeNode> = TransactionLog::new();
        log.begin_modification(NodeKey::new(1)).unwrap();

        let err = log.begin_modification(NodeKey::new(2)).unwrap_err();
        assert!(matches!(
            err,
            TransactionError::NestedModification { in_flight } if in_flight == NodeKey::new(1)
        ));

        assert!(log.finish_modification(NodeKey::new(2)).is_err());
        log.finish_modification(NodeKey::new(1)).unwrap();
        log.begin_modification(NodeKey::new(2)).unwrap();
    }

    #[test]
    fn test_drain_in_key_order() {
        let mut log = TransactionLog::new();
        for key in [9, 2, 5] {
            log.put(container(key));
        }
        log.begin_modification(NodeKey::new(0)).unwrap();

        let keys: Vec<u64> = log.drain().map(|(key, _)| key.as_u64()).collect();
        assert_eq!(keys, vec![2, 5, 9]);
        assert!(log.is_empty());
        assert!(log.in_flight().is_none());
    }

    #[test]
    fn test_put_replaces_by_page_key() {
        let mut log = TransactionLog::new();
        log.put(container(3));
        log.put(container(3));
        assert_eq!(log.len(), 1);
        assert_eq!(log.get(PageKey::new(3)).unwrap().page_key(), PageKey::new(3));
        assert!(log.get(PageKey::new(4)).is_none());
    }
}
