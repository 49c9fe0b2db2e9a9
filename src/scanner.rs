// Page length detection - there is no stored length field

/// Logical length of the stored page: the offset of the first zero byte, or
/// the full region size when no terminator is present (a page that exactly
/// fills the region is served whole).
///
/// A length of 0 means no page is stored; the marker byte at offset 0 is
/// cleared by [`delete`](crate::store::PageStore::delete).
///
/// The original firmware scanned 32-bit words and picked the zero byte out
/// with per-byte masks, which bakes in the flash controller's endianness.
/// Byte-wise scanning gives the same answer portably.
pub fn page_length(data: &[u8]) -> usize {
    data.iter().position(|&b| b == 0).unwrap_or(data.len())
}
