//! Transaction and session errors.

use revdb_common::error::ErrorCategory;
use revdb_common::types::{NodeKey, Revision};
use revdb_storage::error::StorageError;
use thiserror::Error;

/// Result alias for transaction operations.
pub type TxnResult<T> = Result<T, TransactionError>;

/// Errors raised by sessions and transactions.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The requested revision does not exist.
    #[error("invalid revision {requested}: latest committed revision is {latest}")]
    InvalidRevision {
        /// Revision asked for.
        requested: u64,
        /// Latest committed revision.
        latest: Revision,
    },

    /// Another write transaction holds the write permit.
    #[error("a write transaction is already active")]
    WriterActive,

    /// The transaction has been closed.
    #[error("transaction is closed")]
    Closed,

    /// A commit failed part-way; only abort is allowed.
    #[error("transaction must be aborted after a failed commit")]
    Poisoned,

    /// A node is already prepared for modification.
    #[error("node {in_flight} is already prepared for modification")]
    NestedModification {
        /// Node whose modification has not finished.
        in_flight: NodeKey,
    },

    /// No modification is in flight for the node.
    #[error("node {key} is not prepared for modification")]
    NotInFlight {
        /// Node named by the caller.
        key: NodeKey,
    },

    /// The node does not exist in the pending revision.
    #[error("node {key} not found")]
    NodeNotFound {
        /// Requested key.
        key: NodeKey,
    },

    /// Node keys are exhausted.
    #[error("node key space exhausted")]
    KeysExhausted,

    /// No read permit became available in time.
    #[error("timed out waiting for a read permit")]
    ReaderTimeout,

    /// The stored configuration differs from the requested one.
    #[error("store configuration mismatch: {message}")]
    ConfigMismatch {
        /// What differs.
        message: String,
    },

    /// The configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Why it was rejected.
        message: String,
    },

    /// The store has been closed.
    #[error("store is closed")]
    StoreClosed,

    /// Storage layer failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TransactionError {
    /// Maps this error onto the engine-wide taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRevision { .. }
            | Self::WriterActive
            | Self::Closed
            | Self::Poisoned
            | Self::NestedModification { .. }
            | Self::NotInFlight { .. }
            | Self::NodeNotFound { .. }
            | Self::KeysExhausted
            | Self::ReaderTimeout
            | Self::ConfigMismatch { .. }
            | Self::InvalidConfig { .. }
            | Self::StoreClosed => ErrorCategory::Usage,
            Self::Storage(e) => e.category(),
        }
    }

    /// Returns true for caller mistakes that leave the store untouched.
    pub fn is_usage(&self) -> bool {
        self.category() == ErrorCategory::Usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revdb_common::types::PageLocation;

    #[test]
    fn test_categories() {
        assert!(TransactionError::WriterActive.is_usage());
        assert!(TransactionError::NestedModification {
            in_flight: NodeKey::new(1)
        }
        .is_usage());

        let io = TransactionError::from(StorageError::from(std::io::Error::other("disk")));
        assert_eq!(io.category(), ErrorCategory::Io);

        let broken = TransactionError::from(StorageError::ChecksumMismatch {
            location: PageLocation::new(0, 0),
            expected: 1,
            actual: 2,
        });
        assert_eq!(broken.category(), ErrorCategory::Consistency);
    }

    #[test]
    fn test_display() {
        let err = TransactionError::InvalidRevision {
            requested: 9,
            latest: Revision::new(3),
        };
        assert_eq!(
            err.to_string(),
            "invalid revision 9: latest committed revision is 3"
        );
    }
}
