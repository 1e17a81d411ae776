//! Storage error types.

use std::io;
use std::path::PathBuf;

use revdb_common::error::ErrorCategory;
use revdb_common::types::PageLocation;
use thiserror::Error;

use crate::page::PageType;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by pages, the codec, and storage backends.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum StorageError {
    /// Underlying I/O failure.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// I/O failure on a specific file.
    #[error("I/O error on {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Checksum of a stored page did not match.
    #[error("checksum mismatch at {location}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        location: PageLocation,
        expected: u32,
        actual: u32,
    },

    /// Encoded bytes could not be decoded.
    #[error("corrupted page data: {message}")]
    Corrupted { message: String },

    /// A location does not name a stored page.
    #[error("no page stored at {location}")]
    PageNotFound { location: PageLocation },

    /// Injected or backend-reported write failure.
    #[error("write failed: {message}")]
    WriteFailed { message: String },

    /// Store configuration file could not be read or written.
    #[error("invalid store configuration: {message}")]
    Config { message: String },

    /// The backend has been closed.
    #[error("storage backend is closed")]
    Closed,

    /// Another backend in this process holds the store directory.
    #[error("store directory {path} is already open")]
    Locked { path: PathBuf },

    /// The store has never been bootstrapped.
    #[error("store has no first reference")]
    NotBootstrapped,

    /// A key lies beyond the range the indirect tree can address.
    #[error("key {key} exceeds the addressable maximum {max}")]
    KeyOutOfRange { key: u64, max: u64 },

    /// A reference has neither an in-memory page nor a location.
    #[error("page reference resolves to neither memory nor location")]
    UnresolvableReference,

    /// A dirty reference was reached while encoding its parent.
    #[error("dirty page reference encountered while encoding a persisted page")]
    DirtyReference,

    /// A page of one type was found where another was required.
    #[error("unexpected page type: expected {expected}, found {actual}")]
    UnexpectedPage { expected: PageType, actual: PageType },

    /// A slot index outside the page was addressed.
    #[error("slot {slot} out of range for page with {capacity} slots")]
    SlotOutOfRange { slot: usize, capacity: usize },
}

impl StorageError {
    /// Creates a new Corrupted error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates a new File error.
    pub fn file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteFailed error.
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Creates a new Config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new UnexpectedPage error.
    pub fn unexpected_page(expected: PageType, actual: PageType) -> Self {
        Self::UnexpectedPage { expected, actual }
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Io { .. }
            | Self::File { .. }
            | Self::WriteFailed { .. }
            | Self::Closed
            | Self::NotBootstrapped => ErrorCategory::Io,
            Self::Config { .. }
            | Self::Locked { .. }
            | Self::KeyOutOfRange { .. }
            | Self::SlotOutOfRange { .. } => ErrorCategory::Usage,
            Self::ChecksumMismatch { .. }
            | Self::Corrupted { .. }
            | Self::PageNotFound { .. }
            | Self::UnresolvableReference
            | Self::DirtyReference
            | Self::UnexpectedPage { .. } => ErrorCategory::Consistency,
        }
    }

    /// Returns true if this is an I/O failure.
    #[must_use]
    pub fn is_io(&self) -> bool {
        self.category() == ErrorCategory::Io
    }

    /// Returns true if this indicates a violated invariant.
    #[must_use]
    pub fn is_consistency(&self) -> bool {
        self.category() == ErrorCategory::Consistency
    }
}
