//! Page checksum utilities.

/// Computes a CRC32 checksum for the given data.
///
/// # Example
///
/// ```rust
/// use revdb_storage::page::compute_checksum;
///
/// let checksum = compute_checksum(b"page bytes");
/// assert_ne!(checksum, 0);
/// ```
#[inline]
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Verifies that the checksum matches the data.
#[inline]
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
