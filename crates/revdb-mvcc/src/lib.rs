//! # revdb-mvcc
//!
//! Node page versioning for revdb.
//!
//! Each node page is stored as a chain of versions linked newest to oldest.
//! A revisioning strategy decides how many versions a reader must combine
//! and what a writer stores for a new version:
//!
//! - **Incremental**: a complete page every `milestone` revisions, deltas in
//!   between
//! - **Sliding snapshot**: the newest `window` versions jointly hold every
//!   slot; slots about to leave the window are carried into the new version
//!
//! Both strategies read back the same logical content.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Version chains of node pages
pub mod chain;

/// Read view and write copy of one node page
pub mod container;

/// Revisioning strategies
pub mod strategy;

pub use chain::VersionChain;
pub use container::NodePageContainer;
pub use strategy::{strategy_for, Incremental, RevisioningStrategy, SlidingSnapshot};
