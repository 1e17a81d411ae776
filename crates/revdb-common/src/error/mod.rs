//! Error categories for revdb.
//!
//! Each crate defines its own error enum; every variant maps onto one of
//! the categories here so callers can decide how to react without matching
//! on crate-specific variants.

mod category;

pub use category::ErrorCategory;
