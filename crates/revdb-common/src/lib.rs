//! # revdb-common
//!
//! Common types, configuration, and error categories for revdb.
//!
//! This crate provides the foundational vocabulary shared by every revdb
//! component:
//!
//! - **Types**: identifiers (`NodeKey`, `PageKey`, `Revision`, `NameKey`) and
//!   persisted page locations
//! - **Config**: store and write-transaction configuration
//! - **Errors**: the error categories every crate maps its errors onto
//! - **Constants**: indirect-tree geometry and store defaults
//!
//! ## Example
//!
//! ```rust
//! use revdb_common::types::{NodeKey, PageKey};
//!
//! let key = NodeKey::new(300);
//! assert_eq!(key.page_key(), PageKey::new(2));
//! assert_eq!(key.slot(), 44);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::{Revisioning, StoreConfig, WriteOptions};
pub use constants::*;
pub use error::ErrorCategory;
pub use types::{NameKey, NodeKey, PageKey, PageLocation, Revision};
