//! System-wide constants for revdb.
//!
//! The indirect-tree geometry is part of the persisted format: changing any
//! of these values makes existing stores unreadable.

// =============================================================================
// Indirect Tree Geometry
// =============================================================================

/// Number of references held by one indirect page.
pub const INDIRECT_FANOUT: usize = 1 << INDIRECT_FANOUT_EXPONENT;

/// log2 of [`INDIRECT_FANOUT`].
pub const INDIRECT_FANOUT_EXPONENT: u32 = 7;

/// Number of indirect levels between a root reference and a leaf page.
pub const INDIRECT_HEIGHT: usize = 4;

/// Per-level shift applied to a key when descending the indirect tree.
///
/// Level 0 is the root. The offset at level `i` is `key >> EXPONENTS[i]`,
/// after which `offset << EXPONENTS[i]` is subtracted from the key.
pub const INDIRECT_LEVEL_EXPONENTS: [u32; INDIRECT_HEIGHT] = [21, 14, 7, 0];

/// Largest key (node-page key or revision number) the indirect tree addresses.
pub const MAX_INDIRECT_KEY: u64 = (1u64 << (INDIRECT_FANOUT_EXPONENT * INDIRECT_HEIGHT as u32)) - 1;

// =============================================================================
// Node Pages
// =============================================================================

/// log2 of the number of node slots per node page.
pub const NODE_PAGE_EXPONENT: u32 = 7;

/// Number of node slots per node page.
pub const NODE_PAGE_SLOTS: usize = 1 << NODE_PAGE_EXPONENT;

/// Largest node key the store can address.
pub const MAX_NODE_KEY: u64 = ((MAX_INDIRECT_KEY + 1) << NODE_PAGE_EXPONENT) - 1;

// =============================================================================
// Store Defaults
// =============================================================================

/// Default milestone interval / sliding window.
pub const DEFAULT_REVISION_WINDOW: u32 = 4;

/// Default number of concurrently admitted read transactions.
pub const DEFAULT_MAX_CONCURRENT_READERS: u32 = 64;

/// Default number of reconstructed node pages cached per read transaction.
pub const DEFAULT_PAGE_CACHE_CAPACITY: usize = 256;

// =============================================================================
// File Layout
// =============================================================================

/// Magic number at the start of the first-reference file ("RVDB").
pub const STORE_MAGIC: u32 = 0x5256_4442;

/// Current on-disk format version.
pub const FORMAT_VERSION: u16 = 1;

/// Append-only page data file.
pub const PAGES_FILE_NAME: &str = "pages.dat";

/// File holding the reference to the published uber page.
pub const FIRST_REFERENCE_FILE_NAME: &str = "uber.ref";

/// Persisted store configuration.
pub const CONFIG_FILE_NAME: &str = "store.json";

/// Size of the frame header preceding each page payload (length + crc32).
pub const PAGE_FRAME_HEADER_SIZE: usize = 8;
