//! Operation logs replayed against a store.
//!
//! The same log applied to stores with different revisioning layouts must
//! read back identically in every revision.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use revdb_common::types::NodeKey;
use revdb_storage::record::TreeNode;
use revdb_txn::{Store, TxnResult};
use tracing::debug;

use crate::utils::{text, value_of};

/// One step of a workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Create a text node.
    Create(String),
    /// Overwrite the value of an earlier node; `target` indexes the created
    /// nodes modulo their count.
    Modify {
        /// Index into the created nodes.
        target: usize,
        /// New value.
        value: String,
    },
    /// Remove an earlier node.
    Remove {
        /// Index into the created nodes.
        target: usize,
    },
    /// Replace the pending revision with a committed one; `target` is taken
    /// modulo the number of committed revisions.
    Revert {
        /// Revision selector.
        target: u64,
    },
    /// Discard the pending revision.
    Abort,
    /// Commit the pending revision.
    Commit,
}

/// Random workload of `len` operations.
pub fn generate(seed: u64, len: usize) -> Vec<Operation> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| match rng.gen_range(0..100) {
            0..=36 => Operation::Create(random_value(&mut rng)),
            37..=63 => Operation::Modify {
                target: rng.gen(),
                value: random_value(&mut rng),
            },
            64..=76 => Operation::Remove { target: rng.gen() },
            77..=80 => Operation::Revert { target: rng.gen() },
            81..=84 => Operation::Abort,
            _ => Operation::Commit,
        })
        .collect()
}

fn random_value(rng: &mut StdRng) -> String {
    let len = rng.gen_range(1..12);
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Replays `ops` in one write transaction and commits at the end.
///
/// Modifications and removals of nodes that no longer exist are skipped.
/// Returns every key created, in creation order, including keys whose
/// creation was later aborted or reverted.
pub fn apply(store: &Store, ops: &[Operation]) -> TxnResult<Vec<NodeKey>> {
    let mut writer = store.begin_write()?;
    let mut keys = Vec::new();

    for op in ops {
        match op {
            Operation::Create(value) => keys.push(writer.create_node(text(value.as_str()))?),
            Operation::Modify { target, value } => {
                if let Some(key) = pick(&keys, *target) {
                    if writer.get_node(key)?.is_some() {
                        let mut node = writer.prepare_for_modification(key)?;
                        node.set_value(value.clone());
                    }
                }
            }
            Operation::Remove { target } => {
                if let Some(key) = pick(&keys, *target) {
                    if writer.get_node(key)?.is_some() {
                        writer.remove_node(key)?;
                    }
                }
            }
            Operation::Revert { target } => {
                let committed = store.revision_number().as_u64() + 1;
                writer.revert_to(target % committed)?;
            }
            Operation::Abort => writer.abort(),
            Operation::Commit => {
                writer.commit()?;
            }
        }
    }
    let published = writer.commit()?;
    writer.close();
    debug!(
        ops = ops.len(),
        created = keys.len(),
        revision = %published.revision_number(),
        "applied workload"
    );
    Ok(keys)
}

fn pick(keys: &[NodeKey], target: usize) -> Option<NodeKey> {
    (!keys.is_empty()).then(|| keys[target % keys.len()])
}

/// Values of `keys` in every committed revision, oldest first.
pub fn read_all_revisions(
    store: &Store,
    keys: &[NodeKey],
) -> TxnResult<Vec<(u64, Vec<Option<String>>)>> {
    let latest = store.revision_number().as_u64();
    (0..=latest)
        .map(|revision| {
            let reader = store.begin_read(Some(revision))?;
            let values = keys
                .iter()
                .map(|key| Ok(reader.get_node(*key)?.map(|node: TreeNode| value_of(&node))))
                .collect::<TxnResult<Vec<_>>>()?;
            Ok((reader.node_count(), values))
        })
        .collect()
}
