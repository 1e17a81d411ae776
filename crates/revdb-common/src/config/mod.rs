//! Configuration for revdb.
//!
//! This module provides the store-level and write-transaction-level
//! configuration structures.

mod store;

pub use store::{Revisioning, StoreConfig, WriteOptions};
