//! Core types for revdb.

mod ids;

pub use ids::{NameKey, NodeKey, PageKey, PageLocation, Revision};
