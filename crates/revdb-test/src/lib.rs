//! # revdb-test
//!
//! Integration tests for revdb.
//!
//! This crate contains:
//! - End-to-end scenarios over in-memory and file-backed stores
//! - Fault injection for commit atomicity
//! - Workload generators for revisioning equivalence

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Test utilities and helpers
pub mod utils;

/// Fault-injecting storage backend
pub mod chaos;

/// Workload generators
pub mod workload;
