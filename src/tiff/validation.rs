//! Sanity checks applied while parsing untrusted TIFF files

use log::{debug, error};

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::constants::header;
use crate::tiff::errors::{TiffError, TiffResult};

/// Largest raster, in pixels per band, the decoder will allocate
pub const MAX_PIXELS_PER_BAND: u64 = 1 << 32;

/// Validates an IFD offset against the file size
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> TiffResult<()> {
    if offset >= file_size || offset < 8 {
        return Err(TiffError::GenericError(format!(
            "Invalid IFD offset: {} (file size: {})",
            offset, file_size
        )));
    }

    Ok(())
}

/// Validates that a block of `len` bytes at `offset` lies inside the file
pub fn validate_data_range(offset: u64, len: u64, file_size: u64, what: &str) -> TiffResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= file_size => Ok(()),
        _ => Err(TiffError::CorruptData(format!(
            "{} at offset {} with length {} runs past end of file ({} bytes)",
            what, offset, len, file_size
        ))),
    }
}

/// Validates the BigTIFF header fields following the version number
pub fn validate_bigtiff_header(
    reader: &mut dyn SeekableReader,
    byte_order_handler: &dyn ByteOrderHandler
) -> TiffResult<()> {
    let offset_size = byte_order_handler.read_u16(reader)?;
    let zeros = byte_order_handler.read_u16(reader)?;

    debug!("BigTIFF offset size: {}, reserved: {}", offset_size, zeros);

    if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
        error!("Invalid BigTIFF header: offset_size={}, zeros={}", offset_size, zeros);
        return Err(TiffError::InvalidBigTIFFHeader);
    }

    Ok(())
}

/// Validates raster dimensions before any pixel buffer is allocated
pub fn validate_dimensions(width: u64, height: u64) -> TiffResult<()> {
    if width == 0 || height == 0 {
        return Err(TiffError::MissingDimensions);
    }

    if width.saturating_mul(height) > MAX_PIXELS_PER_BAND {
        return Err(TiffError::GenericError(format!(
            "Image of {}x{} pixels exceeds the decoder limit of {} pixels per band",
            width, height, MAX_PIXELS_PER_BAND
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ifd_offset_bounds() {
        assert!(validate_ifd_offset(8, 100).is_ok());
        assert!(validate_ifd_offset(4, 100).is_err());
        assert!(validate_ifd_offset(100, 100).is_err());
    }

    #[test]
    fn test_data_range_overflow() {
        assert!(validate_data_range(10, 20, 30, "strip").is_ok());
        assert!(validate_data_range(10, 21, 30, "strip").is_err());
        assert!(validate_data_range(u64::MAX, 2, 30, "strip").is_err());
    }

    #[test]
    fn test_dimensions() {
        assert!(validate_dimensions(2, 2).is_ok());
        assert!(matches!(validate_dimensions(0, 2), Err(TiffError::MissingDimensions)));
    }
}
