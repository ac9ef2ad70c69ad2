//! Factory for creating compression handlers

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::DeflateHandler;
use super::lzw::LzwHandler;
use super::packbits::PackBitsHandler;
use super::zstd::ZstdHandler;

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a decoder for the Compression tag value of a source image
    pub fn create_handler(code: u64) -> TiffResult<Box<dyn CompressionHandler>> {
        match u16::try_from(code).unwrap_or(0) {
            compression::NONE => Ok(Box::new(UncompressedHandler)),
            compression::LZW => Ok(Box::new(LzwHandler)),
            compression::DEFLATE | compression::ADOBE_DEFLATE_LEGACY => Ok(Box::new(DeflateHandler::new())),
            compression::PACKBITS => Ok(Box::new(PackBitsHandler)),
            compression::ZSTD => Ok(Box::new(ZstdHandler::new())),
            _ => Err(TiffError::UnsupportedCompression(code))
        }
    }

    /// Create an encoder by name for GeoTIFF output (none, deflate, zstd, packbits)
    pub fn get_handler_by_name(name: &str) -> TiffResult<Box<dyn CompressionHandler>> {
        match name.trim().to_lowercase().as_str() {
            "uncompressed" | "none" => Ok(Box::new(UncompressedHandler)),
            "deflate" | "zip" => Ok(Box::new(DeflateHandler::new())),
            "zstd" => Ok(Box::new(ZstdHandler::new())),
            "packbits" => Ok(Box::new(PackBitsHandler)),
            _ => Err(TiffError::GenericError(format!("Unknown compression type: {}", name)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_codes() {
        assert_eq!(CompressionFactory::create_handler(1).unwrap().name(), "None");
        assert_eq!(CompressionFactory::create_handler(5).unwrap().name(), "LZW");
        assert_eq!(CompressionFactory::create_handler(32946).unwrap().code(), 8);
        assert_eq!(CompressionFactory::create_handler(50000).unwrap().name(), "ZSTD");
        assert!(matches!(CompressionFactory::create_handler(7), Err(TiffError::UnsupportedCompression(7))));
    }

    #[test]
    fn test_writer_names_round_trip() {
        for name in ["none", "deflate", "zstd", "packbits"] {
            let handler = CompressionFactory::get_handler_by_name(name).unwrap();
            let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
            let packed = handler.compress(&data).unwrap();
            assert_eq!(handler.decompress(&packed).unwrap(), data, "{}", name);
        }
        assert!(CompressionFactory::get_handler_by_name("jpeg").is_err());
    }
}
