//! revdb performance benchmarks.
//!
//! - Page codec and commit walk
//! - Commit cost and read reconstruction for each revisioning layout
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p revdb-bench
//! ```

pub mod utils;
