//! Helpers shared by the integration tests.

use std::sync::Once;

use revdb_common::config::{Revisioning, StoreConfig};
use revdb_common::types::NodeKey;
use revdb_storage::record::TreeNode;
use revdb_txn::{ReadTxn, Store, TxnResult};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to warnings only.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Store configuration for tests using the given revisioning layout.
pub fn test_config(revisioning: Revisioning, window: u32) -> StoreConfig {
    StoreConfig::for_testing().with_revisioning(revisioning, window)
}

/// Fresh in-memory store.
pub fn memory_store(revisioning: Revisioning, window: u32) -> TxnResult<Store> {
    init_tracing();
    Store::open_in_memory(test_config(revisioning, window))
}

/// Text node carrying `value`.
pub fn text(value: impl Into<String>) -> TreeNode {
    TreeNode::text(value.into())
}

/// Value of node `key` as a string, if the node exists.
pub fn read_value(reader: &ReadTxn<TreeNode>, key: NodeKey) -> TxnResult<Option<String>> {
    Ok(reader.get_node(key)?.map(|node| value_of(&node)))
}

/// Value of `node` as a string.
pub fn value_of(node: &TreeNode) -> String {
    String::from_utf8_lossy(&node.value).into_owned()
}
