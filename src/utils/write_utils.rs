//! TIFF writing utilities
//!
//! Word alignment and entry ordering helpers for the TIFF writer.

use std::collections::HashSet;
use std::io::Write;

use crate::tiff::errors::TiffResult;
use crate::tiff::ifd::IFDEntry;

/// Round an offset up to the next 4-byte boundary
pub fn align_to_4_bytes(offset: u64) -> u64 {
    (offset + 3) & !3
}

/// Zero bytes needed after `data_len` bytes to reach a 4-byte boundary
pub fn calculate_padding(data_len: usize) -> usize {
    (4 - (data_len % 4)) % 4
}

/// Write the padding that follows a block of `data_len` bytes
pub fn write_padding(writer: &mut impl Write, data_len: usize) -> TiffResult<()> {
    let padding = calculate_padding(data_len);
    if padding > 0 {
        writer.write_all(&[0u8; 3][..padding])?;
    }
    Ok(())
}

/// Entries in ascending tag order, one per tag
///
/// When a tag appears more than once the last occurrence wins.
pub fn get_unique_sorted_entries(entries: &[IFDEntry]) -> Vec<IFDEntry> {
    let mut seen_tags = HashSet::new();
    let mut unique: Vec<IFDEntry> = entries.iter()
        .rev()
        .filter(|entry| seen_tags.insert(entry.tag))
        .cloned()
        .collect();

    unique.sort_by_key(|entry| entry.tag);
    unique
}
