//! Benchmark utilities and helpers.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use revdb_common::config::{Revisioning, StoreConfig};
use revdb_common::types::NodeKey;
use revdb_storage::record::TreeNode;
use revdb_txn::{Store, TxnResult};

/// Generates random string data for benchmarks.
pub fn random_string(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generates `count` text nodes with values of `value_size` bytes.
pub fn generate_nodes(count: usize, value_size: usize) -> Vec<TreeNode> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| TreeNode::text(random_string(&mut rng, value_size)))
        .collect()
}

/// In-memory store with the given layout and a large read cache.
pub fn bench_store(revisioning: Revisioning, window: u32) -> TxnResult<Store> {
    let config = StoreConfig::new(revisioning, window).with_page_cache_capacity(4096);
    Store::open_in_memory(config)
}

/// Store with `nodes` nodes and `revisions` further revisions, each
/// rewriting a random tenth of the nodes.
pub fn populated_store(
    revisioning: Revisioning,
    window: u32,
    nodes: usize,
    revisions: usize,
) -> TxnResult<(Store, Vec<NodeKey>)> {
    let store = bench_store(revisioning, window)?;
    let mut rng = StdRng::seed_from_u64(7);
    let mut writer = store.begin_write()?;
    let keys = generate_nodes(nodes, 32)
        .into_iter()
        .map(|node| writer.create_node(node))
        .collect::<TxnResult<Vec<_>>>()?;
    writer.commit()?;

    for _ in 0..revisions {
        for _ in 0..(nodes / 10).max(1) {
            let key = keys[rng.gen_range(0..keys.len())];
            let value = random_string(&mut rng, 32);
            writer.prepare_for_modification(key)?.set_value(value);
        }
        writer.commit()?;
    }
    writer.close();
    Ok((store, keys))
}
