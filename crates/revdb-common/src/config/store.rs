//! Store configuration structures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::constants::{
    DEFAULT_MAX_CONCURRENT_READERS, DEFAULT_PAGE_CACHE_CAPACITY, DEFAULT_REVISION_WINDOW,
};

/// Policy used to reconstruct node pages from their version history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Revisioning {
    /// Full checkpoint pages every `window` revisions, deltas in between.
    Incremental,
    /// The most recent `window` versions jointly hold every live slot.
    SlidingSnapshot,
}

impl fmt::Display for Revisioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incremental => write!(f, "INCREMENTAL"),
            Self::SlidingSnapshot => write!(f, "SLIDING_SNAPSHOT"),
        }
    }
}

/// Store configuration.
///
/// # Example
///
/// ```rust
/// use revdb_common::config::{Revisioning, StoreConfig};
///
/// let config = StoreConfig::default()
///     .with_revisioning(Revisioning::SlidingSnapshot, 4)
///     .with_max_concurrent_readers(8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Revisioning policy for node pages.
    /// Default: Incremental
    pub revisioning: Revisioning,

    /// Milestone interval (Incremental) or window size (SlidingSnapshot).
    /// Must be at least 1. Default: 4
    pub revision_window: u32,

    /// Maximum number of concurrently open read transactions.
    /// Default: 64
    pub max_concurrent_readers: u32,

    /// How long `begin_read` waits for a read permit. `None` waits forever.
    /// Default: None
    pub read_permit_timeout: Option<Duration>,

    /// Reconstructed node pages cached per read transaction.
    /// Default: 256
    pub page_cache_capacity: usize,

    /// Fsync the page file and first reference on every commit.
    /// Default: true
    pub sync_on_commit: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            revisioning: Revisioning::Incremental,
            revision_window: DEFAULT_REVISION_WINDOW,
            max_concurrent_readers: DEFAULT_MAX_CONCURRENT_READERS,
            read_permit_timeout: None,
            page_cache_capacity: DEFAULT_PAGE_CACHE_CAPACITY,
            sync_on_commit: true,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for the given revisioning policy.
    #[must_use]
    pub fn new(revisioning: Revisioning, revision_window: u32) -> Self {
        Self {
            revisioning,
            revision_window,
            ..Default::default()
        }
    }

    /// Creates a minimal configuration for testing.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            max_concurrent_readers: 16,
            read_permit_timeout: Some(Duration::from_secs(5)),
            page_cache_capacity: 32,
            sync_on_commit: false, // Faster tests
            ..Default::default()
        }
    }

    /// Sets the revisioning policy and its window.
    #[must_use]
    pub fn with_revisioning(mut self, revisioning: Revisioning, revision_window: u32) -> Self {
        self.revisioning = revisioning;
        self.revision_window = revision_window;
        self
    }

    /// Sets the maximum number of concurrent readers.
    #[must_use]
    pub fn with_max_concurrent_readers(mut self, readers: u32) -> Self {
        self.max_concurrent_readers = readers;
        self
    }

    /// Sets the read permit timeout.
    #[must_use]
    pub fn with_read_permit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_permit_timeout = timeout;
        self
    }

    /// Sets the per-reader page cache capacity.
    #[must_use]
    pub fn with_page_cache_capacity(mut self, capacity: usize) -> Self {
        self.page_cache_capacity = capacity;
        self
    }

    /// Enables or disables fsync on commit.
    #[must_use]
    pub fn with_sync_on_commit(mut self, sync: bool) -> Self {
        self.sync_on_commit = sync;
        self
    }

    /// Returns true if `other` reconstructs pages the same way as `self`.
    #[must_use]
    pub fn same_layout(&self, other: &Self) -> bool {
        self.revisioning == other.revisioning && self.revision_window == other.revision_window
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.revision_window == 0 {
            return Err("revision_window must be at least 1".to_string());
        }

        if self.max_concurrent_readers == 0 {
            return Err("max_concurrent_readers must be at least 1".to_string());
        }

        if self.page_cache_capacity == 0 {
            return Err("page_cache_capacity must be at least 1".to_string());
        }

        Ok(())
    }
}

/// Options for a write transaction.
///
/// A zero threshold or interval disables the corresponding auto-commit
/// trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Commit once more than this many modifications are pending.
    /// Default: 0 (disabled)
    pub auto_commit_node_count: u32,

    /// Commit pending modifications at this interval.
    /// Default: 0 (disabled)
    pub auto_commit_interval: Duration,
}

impl WriteOptions {
    /// Creates options from a node-count threshold and an interval in seconds.
    #[must_use]
    pub fn new(auto_commit_node_count: u32, auto_commit_seconds: u32) -> Self {
        Self {
            auto_commit_node_count,
            auto_commit_interval: Duration::from_secs(u64::from(auto_commit_seconds)),
        }
    }

    /// Sets the modification-count trigger.
    #[must_use]
    pub fn with_auto_commit_node_count(mut self, count: u32) -> Self {
        self.auto_commit_node_count = count;
        self
    }

    /// Sets the time-based trigger.
    #[must_use]
    pub fn with_auto_commit_interval(mut self, interval: Duration) -> Self {
        self.auto_commit_interval = interval;
        self
    }

    /// Returns true if the modification-count trigger is armed.
    #[must_use]
    pub fn counts_modifications(&self) -> bool {
        self.auto_commit_node_count > 0
    }

    /// Returns true if the time-based trigger is armed.
    #[must_use]
    pub fn is_timed(&self) -> bool {
        !self.auto_commit_interval.is_zero()
    }
}
