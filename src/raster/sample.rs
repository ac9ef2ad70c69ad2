//! Typed raster samples
//!
//! `SampleType` names the numeric type of a band as TIFF declares it
//! (BitsPerSample + SampleFormat). `BandData` holds one decoded band in
//! that type, so the value type survives from source to sink unchanged.

use std::fmt;

use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::constants::sample_format;
use crate::tiff::errors::{TiffError, TiffResult};

/// Numeric type of the samples in a band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Maps TIFF BitsPerSample and SampleFormat onto a sample type
    pub fn from_tiff(bits_per_sample: u16, format: u16) -> TiffResult<Self> {
        let sample_type = match (bits_per_sample, format) {
            (8, sample_format::UNSIGNED) => SampleType::U8,
            (8, sample_format::SIGNED) => SampleType::I8,
            (16, sample_format::UNSIGNED) => SampleType::U16,
            (16, sample_format::SIGNED) => SampleType::I16,
            (32, sample_format::UNSIGNED) => SampleType::U32,
            (32, sample_format::SIGNED) => SampleType::I32,
            (32, sample_format::IEEEFP) => SampleType::F32,
            (64, sample_format::IEEEFP) => SampleType::F64,
            _ => return Err(TiffError::UnsupportedSampleLayout { bits_per_sample, sample_format: format }),
        };
        Ok(sample_type)
    }

    pub fn bits(&self) -> u16 {
        (self.bytes() * 8) as u16
    }

    pub fn bytes(&self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    /// TIFF SampleFormat value
    pub fn sample_format(&self) -> u16 {
        match self {
            SampleType::U8 | SampleType::U16 | SampleType::U32 => sample_format::UNSIGNED,
            SampleType::I8 | SampleType::I16 | SampleType::I32 => sample_format::SIGNED,
            SampleType::F32 | SampleType::F64 => sample_format::IEEEFP,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, SampleType::F32 | SampleType::F64)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SampleType::U8 => "uint8",
            SampleType::I8 => "int8",
            SampleType::U16 => "uint16",
            SampleType::I16 => "int16",
            SampleType::U32 => "uint32",
            SampleType::I32 => "int32",
            SampleType::F32 => "float32",
            SampleType::F64 => "float64",
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A primitive sample value
pub trait Sample: Copy + Send + Sync + 'static {
    /// Converts a fill value, saturating at the type's range
    fn from_f64(value: f64) -> Self;

    fn to_f64(self) -> f64;
}

macro_rules! impl_sample {
    ($($t:ty),*) => {
        $(
            impl Sample for $t {
                fn from_f64(value: f64) -> Self {
                    value as $t
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_sample!(u8, i8, u16, i16, u32, i32, f32, f64);

/// One band of samples in row-major order
#[derive(Debug, Clone, PartialEq)]
pub enum BandData {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Runs `$body` with `$v` bound to the inner vector of any `BandData`
macro_rules! with_band {
    ($band:expr, $v:ident => $body:expr) => {
        match $band {
            BandData::U8($v) => $body,
            BandData::I8($v) => $body,
            BandData::U16($v) => $body,
            BandData::I16($v) => $body,
            BandData::U32($v) => $body,
            BandData::I32($v) => $body,
            BandData::F32($v) => $body,
            BandData::F64($v) => $body,
        }
    };
}

/// Like `with_band!`, but rewraps the result in the same variant
macro_rules! map_band {
    ($band:expr, $v:ident => $body:expr) => {
        match $band {
            BandData::U8($v) => BandData::U8($body),
            BandData::I8($v) => BandData::I8($body),
            BandData::U16($v) => BandData::U16($body),
            BandData::I16($v) => BandData::I16($body),
            BandData::U32($v) => BandData::U32($body),
            BandData::I32($v) => BandData::I32($body),
            BandData::F32($v) => BandData::F32($body),
            BandData::F64($v) => BandData::F64($body),
        }
    };
}

pub(crate) use map_band;

impl BandData {
    /// Decodes packed sample bytes written in the handler's byte order
    pub fn decode(sample_type: SampleType, bytes: &[u8], handler: &dyn ByteOrderHandler) -> Self {
        match sample_type {
            SampleType::U8 => BandData::U8(bytes.to_vec()),
            SampleType::I8 => BandData::I8(bytes.iter().map(|&b| b as i8).collect()),
            SampleType::U16 => BandData::U16(handler.decode_u16(bytes)),
            SampleType::I16 => BandData::I16(handler.decode_i16(bytes)),
            SampleType::U32 => BandData::U32(handler.decode_u32(bytes)),
            SampleType::I32 => BandData::I32(handler.decode_i32(bytes)),
            SampleType::F32 => BandData::F32(handler.decode_f32(bytes)),
            SampleType::F64 => BandData::F64(handler.decode_f64(bytes)),
        }
    }

    /// A band of `len` samples all set to `value`
    pub fn filled(sample_type: SampleType, len: usize, value: f64) -> Self {
        fn fill<T: Sample>(len: usize, value: f64) -> Vec<T> {
            vec![T::from_f64(value); len]
        }

        match sample_type {
            SampleType::U8 => BandData::U8(fill(len, value)),
            SampleType::I8 => BandData::I8(fill(len, value)),
            SampleType::U16 => BandData::U16(fill(len, value)),
            SampleType::I16 => BandData::I16(fill(len, value)),
            SampleType::U32 => BandData::U32(fill(len, value)),
            SampleType::I32 => BandData::I32(fill(len, value)),
            SampleType::F32 => BandData::F32(fill(len, value)),
            SampleType::F64 => BandData::F64(fill(len, value)),
        }
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            BandData::U8(_) => SampleType::U8,
            BandData::I8(_) => SampleType::I8,
            BandData::U16(_) => SampleType::U16,
            BandData::I16(_) => SampleType::I16,
            BandData::U32(_) => SampleType::U32,
            BandData::I32(_) => SampleType::I32,
            BandData::F32(_) => SampleType::F32,
            BandData::F64(_) => SampleType::F64,
        }
    }

    pub fn len(&self) -> usize {
        with_band!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index` widened to f64
    pub fn value_at(&self, index: usize) -> Option<f64> {
        with_band!(self, v => v.get(index).map(|s| s.to_f64()))
    }

    /// Size of the band's samples in bytes
    pub fn byte_len(&self) -> u64 {
        (self.len() * self.sample_type().bytes()) as u64
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            BandData::U8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<&[u16]> {
        match self {
            BandData::U16(v) => Some(v),
            _ => None,
        }
    }

    /// Appends sample `index` in little-endian byte order
    pub fn push_le_bytes(&self, index: usize, out: &mut Vec<u8>) {
        match self {
            BandData::U8(v) => out.push(v[index]),
            BandData::I8(v) => out.push(v[index] as u8),
            BandData::U16(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            BandData::I16(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            BandData::U32(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            BandData::I32(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            BandData::F32(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            BandData::F64(v) => out.extend_from_slice(&v[index].to_le_bytes()),
        }
    }
}

/// Interleaves bands pixel by pixel into little-endian bytes
///
/// `range` selects pixels by index, so callers can cut strips directly.
pub fn interleave_le(bands: &[&BandData], range: std::ops::Range<usize>) -> Vec<u8> {
    let bytes_per_pixel: usize = bands.iter().map(|b| b.sample_type().bytes()).sum();
    let mut out = Vec::with_capacity(range.len() * bytes_per_pixel);
    for index in range {
        for band in bands {
            band.push_le_bytes(index, &mut out);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::byte_order::{BigEndianHandler, LittleEndianHandler};

    #[test]
    fn test_from_tiff() {
        assert_eq!(SampleType::from_tiff(8, 1).unwrap(), SampleType::U8);
        assert_eq!(SampleType::from_tiff(16, 2).unwrap(), SampleType::I16);
        assert_eq!(SampleType::from_tiff(32, 3).unwrap(), SampleType::F32);
        assert!(matches!(
            SampleType::from_tiff(12, 1),
            Err(TiffError::UnsupportedSampleLayout { bits_per_sample: 12, sample_format: 1 })
        ));
        assert!(SampleType::from_tiff(8, 3).is_err());
    }

    #[test]
    fn test_tiff_codes_round_trip() {
        for t in [SampleType::U8, SampleType::I8, SampleType::U16, SampleType::I16,
                  SampleType::U32, SampleType::I32, SampleType::F32, SampleType::F64] {
            assert_eq!(SampleType::from_tiff(t.bits(), t.sample_format()).unwrap(), t);
        }
    }

    #[test]
    fn test_decode_respects_byte_order() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(BandData::decode(SampleType::U16, &bytes, &LittleEndianHandler), BandData::U16(vec![0x0201, 0x0403]));
        assert_eq!(BandData::decode(SampleType::U16, &bytes, &BigEndianHandler), BandData::U16(vec![0x0102, 0x0304]));
        assert_eq!(BandData::decode(SampleType::I8, &[0xFF], &BigEndianHandler), BandData::I8(vec![-1]));
    }

    #[test]
    fn test_filled_saturates() {
        assert_eq!(BandData::filled(SampleType::U8, 2, -9999.0), BandData::U8(vec![0, 0]));
        assert_eq!(BandData::filled(SampleType::I16, 1, -9999.0), BandData::I16(vec![-9999]));
        assert_eq!(BandData::filled(SampleType::U8, 1, f64::NAN), BandData::U8(vec![0]));
        assert!(matches!(BandData::filled(SampleType::F32, 1, f64::NAN), BandData::F32(v) if v[0].is_nan()));
    }

    #[test]
    fn test_interleave() {
        let red = BandData::U8(vec![1, 2]);
        let green = BandData::U8(vec![3, 4]);
        assert_eq!(interleave_le(&[&red, &green], 0..2), vec![1, 3, 2, 4]);
        assert_eq!(interleave_le(&[&BandData::U16(vec![0x0102, 0x0304])], 1..2), vec![0x04, 0x03]);
    }
}
