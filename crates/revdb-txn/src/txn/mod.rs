//! Public transaction handles.
//!
//! A [`ReadTxn`] pins one committed revision. A [`WriteTxn`] owns the single
//! pending revision of a store and may commit many times.

mod read;
mod timer;
mod write;

pub use read::ReadTxn;
pub use write::{NodeGuard, WriteTxn};

pub(crate) use write::WriterShared;
