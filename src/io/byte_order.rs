//! Byte order handling for TIFF files
//!
//! This module implements the Strategy pattern for handling different
//! byte orders (little-endian vs big-endian) when reading TIFF structures
//! and when turning decoded strip/tile bytes into typed samples.

use byteorder::{BigEndian, ByteOrder as _, LittleEndian, ReadBytesExt};
use std::io::Result;

use crate::io::seekable::SeekableReader;
use crate::tiff::errors::{TiffError, TiffResult};

/// Represents the byte order of a TIFF file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (II)
    LittleEndian,
    /// Big-endian byte order (MM)
    BigEndian,
}

impl ByteOrder {
    /// Detects the byte order from the TIFF header
    pub fn detect(reader: &mut dyn SeekableReader) -> TiffResult<Self> {
        let byte_order = reader.read_u16::<LittleEndian>()?;
        match byte_order {
            0x4949 => Ok(ByteOrder::LittleEndian), // "II" (Intel)
            0x4D4D => Ok(ByteOrder::BigEndian),    // "MM" (Motorola)
            _ => Err(TiffError::InvalidByteOrder(byte_order)),
        }
    }

    /// Returns a string representation of this byte order
    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "Little Endian (II)",
            ByteOrder::BigEndian => "Big Endian (MM)",
        }
    }

    /// Creates the appropriate handler for this byte order
    pub fn create_handler(&self) -> Box<dyn ByteOrderHandler> {
        match self {
            ByteOrder::LittleEndian => Box::new(LittleEndianHandler),
            ByteOrder::BigEndian => Box::new(BigEndianHandler),
        }
    }
}

/// Trait for byte order handling strategies
///
/// The `read_*` methods pull single values out of a stream (header, IFD
/// entries, tag arrays). The `decode_*` methods convert a whole buffer of
/// raw sample bytes in one go, which is what the band decoder needs after
/// decompressing a strip or tile.
pub trait ByteOrderHandler: Send + Sync {
    /// The byte order this handler implements
    fn byte_order(&self) -> ByteOrder;

    /// Read a u16 value
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16>;

    /// Read a u32 value
    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32>;

    /// Read a u64 value
    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64>;

    /// Read an f32 value
    fn read_f32(&self, reader: &mut dyn SeekableReader) -> Result<f32>;

    /// Read an f64 value
    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64>;

    /// Decode packed u16 samples
    fn decode_u16(&self, bytes: &[u8]) -> Vec<u16>;

    /// Decode packed i16 samples
    fn decode_i16(&self, bytes: &[u8]) -> Vec<i16>;

    /// Decode packed u32 samples
    fn decode_u32(&self, bytes: &[u8]) -> Vec<u32>;

    /// Decode packed i32 samples
    fn decode_i32(&self, bytes: &[u8]) -> Vec<i32>;

    /// Decode packed f32 samples
    fn decode_f32(&self, bytes: &[u8]) -> Vec<f32>;

    /// Decode packed f64 samples
    fn decode_f64(&self, bytes: &[u8]) -> Vec<f64>;
}

/// Generates the buffer decoders for one `byteorder` endianness marker.
///
/// Trailing bytes that do not form a whole sample are ignored.
macro_rules! impl_decoders {
    ($order:ty) => {
        fn decode_u16(&self, bytes: &[u8]) -> Vec<u16> {
            let mut out = vec![0u16; bytes.len() / 2];
            <$order>::read_u16_into(&bytes[..out.len() * 2], &mut out);
            out
        }

        fn decode_i16(&self, bytes: &[u8]) -> Vec<i16> {
            let mut out = vec![0i16; bytes.len() / 2];
            <$order>::read_i16_into(&bytes[..out.len() * 2], &mut out);
            out
        }

        fn decode_u32(&self, bytes: &[u8]) -> Vec<u32> {
            let mut out = vec![0u32; bytes.len() / 4];
            <$order>::read_u32_into(&bytes[..out.len() * 4], &mut out);
            out
        }

        fn decode_i32(&self, bytes: &[u8]) -> Vec<i32> {
            let mut out = vec![0i32; bytes.len() / 4];
            <$order>::read_i32_into(&bytes[..out.len() * 4], &mut out);
            out
        }

        fn decode_f32(&self, bytes: &[u8]) -> Vec<f32> {
            let mut out = vec![0f32; bytes.len() / 4];
            <$order>::read_f32_into(&bytes[..out.len() * 4], &mut out);
            out
        }

        fn decode_f64(&self, bytes: &[u8]) -> Vec<f64> {
            let mut out = vec![0f64; bytes.len() / 8];
            <$order>::read_f64_into(&bytes[..out.len() * 8], &mut out);
            out
        }
    };
}

/// Little-endian byte order handler
pub struct LittleEndianHandler;

impl ByteOrderHandler for LittleEndianHandler {
    fn byte_order(&self) -> ByteOrder {
        ByteOrder::LittleEndian
    }

    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<LittleEndian>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<LittleEndian>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<LittleEndian>()
    }

    fn read_f32(&self, reader: &mut dyn SeekableReader) -> Result<f32> {
        reader.read_f32::<LittleEndian>()
    }

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
        reader.read_f64::<LittleEndian>()
    }

    impl_decoders!(LittleEndian);
}

/// Big-endian byte order handler
pub struct BigEndianHandler;

impl ByteOrderHandler for BigEndianHandler {
    fn byte_order(&self) -> ByteOrder {
        ByteOrder::BigEndian
    }

    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<BigEndian>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<BigEndian>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<BigEndian>()
    }

    fn read_f32(&self, reader: &mut dyn SeekableReader) -> Result<f32> {
        reader.read_f32::<BigEndian>()
    }

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
        reader.read_f64::<BigEndian>()
    }

    impl_decoders!(BigEndian);
}
