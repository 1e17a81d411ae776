use std::fmt;

/// Broad classification of a failure.
///
/// # Example
///
/// ```rust
/// use revdb_common::error::ErrorCategory;
///
/// assert!(ErrorCategory::Usage.is_recoverable());
/// assert!(!ErrorCategory::Consistency.is_recoverable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// The caller misused the API. The store is untouched.
    Usage = 1,
    /// The backend failed to read or write. The current operation is lost.
    Io = 2,
    /// An internal invariant was violated. The transaction must be aborted.
    Consistency = 3,
}

impl ErrorCategory {
    /// Returns true if the caller can retry or correct the operation.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::Usage)
    }

    /// Returns true if the transaction that hit this error must be aborted.
    #[inline]
    #[must_use]
    pub const fn requires_abort(self) -> bool {
        !self.is_recoverable()
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage => write!(f, "usage"),
            Self::Io => write!(f, "I/O"),
            Self::Consistency => write!(f, "consistency"),
        }
    }
}
