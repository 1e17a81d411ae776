//! # revdb-txn
//!
//! Sessions and transactions for revdb.
//!
//! - **Store / session**: one published uber page per store, swapped
//!   atomically on commit; a counting permit pool for readers and a single
//!   write permit that fails fast.
//!
//! - **Read transactions**: pin a committed revision and read it for their
//!   whole lifetime, regardless of later commits.
//!
//! - **Write transactions**: build the next revision in a private
//!   transaction log; commit writes every dirty page exactly once, children
//!   first, then publishes. Optional auto-commit by modification count or
//!   by interval.
//!
//! # Example
//!
//! ```rust
//! use revdb_common::config::StoreConfig;
//! use revdb_storage::record::TreeNode;
//! use revdb_txn::Store;
//!
//! let store: Store = Store::open_in_memory(StoreConfig::default()).unwrap();
//!
//! let mut writer = store.begin_write().unwrap();
//! let key = writer.create_node(TreeNode::text("hello")).unwrap();
//! writer.commit().unwrap();
//! writer.close();
//!
//! let reader = store.begin_read(None).unwrap();
//! assert_eq!(reader.revision_number().as_u64(), 1);
//! assert_eq!(reader.node_count(), 1);
//! assert!(reader.get_node(key).unwrap().is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Transaction and session errors.
pub mod error;

/// Private page map of a write transaction.
pub mod log;

/// Stores, sessions and the store registry.
pub mod session;

/// Read and write transaction state.
pub mod state;

/// Public transaction handles.
pub mod txn;

pub use error::{TransactionError, TxnResult};
pub use session::{SessionStats, Store, StoreRegistry};
pub use state::CommitStats;
pub use txn::{NodeGuard, ReadTxn, WriteTxn};
