//! TIFF tag utilities
//!
//! Field type sizes, tag array decoding and human-readable names used
//! in log output.

use byteorder::ReadBytesExt;

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFDEntry;
use crate::tiff::constants::{field_types, tags};

/// Size in bytes of one value of the given field type
pub fn get_field_type_size(field_type: u16) -> usize {
    match field_type {
        field_types::BYTE | field_types::ASCII | field_types::SBYTE | field_types::UNDEFINED => 1,
        field_types::SHORT | field_types::SSHORT => 2,
        field_types::LONG | field_types::SLONG | field_types::FLOAT | field_types::IFD => 4,
        field_types::RATIONAL | field_types::SRATIONAL | field_types::DOUBLE => 8,
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => 8,
        _ => 1,
    }
}

/// Reads `entry.count` integer values from the reader's current position
///
/// Rationals are folded to their integer quotient; the tags this crate
/// reads as integers never carry rationals in practice.
pub fn read_tag_value_array(
    reader: &mut dyn SeekableReader,
    entry: &IFDEntry,
    handler: &dyn ByteOrderHandler,
    values: &mut Vec<u64>
) -> TiffResult<()> {
    for _ in 0..entry.count {
        let value = match entry.field_type {
            field_types::BYTE | field_types::UNDEFINED => reader.read_u8()? as u64,
            field_types::SBYTE => reader.read_u8()? as i8 as i64 as u64,
            field_types::SHORT => handler.read_u16(reader)? as u64,
            field_types::SSHORT => handler.read_u16(reader)? as i16 as i64 as u64,
            field_types::LONG | field_types::IFD => handler.read_u32(reader)? as u64,
            field_types::SLONG => handler.read_u32(reader)? as i32 as i64 as u64,
            field_types::RATIONAL => {
                let num = handler.read_u32(reader)? as u64;
                let den = handler.read_u32(reader)? as u64;
                if den == 0 { 0 } else { num / den }
            },
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.read_u64(reader)?,
            _ => return Err(TiffError::UnsupportedFieldType(entry.field_type)),
        };

        values.push(value);
    }

    Ok(())
}

/// Reads `entry.count` values as floating point from the reader's current position
pub fn read_tag_double_array(
    reader: &mut dyn SeekableReader,
    entry: &IFDEntry,
    handler: &dyn ByteOrderHandler,
    values: &mut Vec<f64>
) -> TiffResult<()> {
    for _ in 0..entry.count {
        let value = match entry.field_type {
            field_types::DOUBLE => handler.read_f64(reader)?,
            field_types::FLOAT => handler.read_f32(reader)? as f64,
            field_types::RATIONAL => {
                let num = handler.read_u32(reader)? as f64;
                let den = handler.read_u32(reader)? as f64;
                num / den
            },
            field_types::SRATIONAL => {
                let num = handler.read_u32(reader)? as i32 as f64;
                let den = handler.read_u32(reader)? as i32 as f64;
                num / den
            },
            field_types::SHORT => handler.read_u16(reader)? as f64,
            field_types::LONG => handler.read_u32(reader)? as f64,
            _ => return Err(TiffError::UnsupportedFieldType(entry.field_type)),
        };

        values.push(value);
    }

    Ok(())
}

/// Get the name of a TIFF tag, or "Unknown"
pub fn get_tag_name(tag: u16) -> &'static str {
    match tag {
        tags::NEW_SUBFILE_TYPE => "NewSubfileType",
        tags::IMAGE_WIDTH => "ImageWidth",
        tags::IMAGE_LENGTH => "ImageLength",
        tags::BITS_PER_SAMPLE => "BitsPerSample",
        tags::COMPRESSION => "Compression",
        tags::PHOTOMETRIC_INTERPRETATION => "PhotometricInterpretation",
        tags::STRIP_OFFSETS => "StripOffsets",
        tags::SAMPLES_PER_PIXEL => "SamplesPerPixel",
        tags::ROWS_PER_STRIP => "RowsPerStrip",
        tags::STRIP_BYTE_COUNTS => "StripByteCounts",
        tags::PLANAR_CONFIGURATION => "PlanarConfiguration",
        tags::SOFTWARE => "Software",
        tags::PREDICTOR => "Predictor",
        tags::TILE_WIDTH => "TileWidth",
        tags::TILE_LENGTH => "TileLength",
        tags::TILE_OFFSETS => "TileOffsets",
        tags::TILE_BYTE_COUNTS => "TileByteCounts",
        tags::EXTRA_SAMPLES => "ExtraSamples",
        tags::SAMPLE_FORMAT => "SampleFormat",
        tags::MODEL_PIXEL_SCALE_TAG => "ModelPixelScaleTag",
        tags::MODEL_TIEPOINT_TAG => "ModelTiepointTag",
        tags::MODEL_TRANSFORMATION_TAG => "ModelTransformationTag",
        tags::GEO_KEY_DIRECTORY_TAG => "GeoKeyDirectoryTag",
        tags::GEO_DOUBLE_PARAMS_TAG => "GeoDoubleParamsTag",
        tags::GEO_ASCII_PARAMS_TAG => "GeoAsciiParamsTag",
        tags::GDAL_NODATA => "GDAL_NODATA",
        _ => "Unknown",
    }
}

/// Get the name of a field type, or "Unknown"
pub fn get_field_type_name(field_type: u16) -> &'static str {
    match field_type {
        field_types::BYTE => "BYTE",
        field_types::ASCII => "ASCII",
        field_types::SHORT => "SHORT",
        field_types::LONG => "LONG",
        field_types::RATIONAL => "RATIONAL",
        field_types::SBYTE => "SBYTE",
        field_types::UNDEFINED => "UNDEFINED",
        field_types::SSHORT => "SSHORT",
        field_types::SLONG => "SLONG",
        field_types::SRATIONAL => "SRATIONAL",
        field_types::FLOAT => "FLOAT",
        field_types::DOUBLE => "DOUBLE",
        field_types::IFD => "IFD",
        field_types::LONG8 => "LONG8",
        field_types::SLONG8 => "SLONG8",
        field_types::IFD8 => "IFD8",
        _ => "Unknown",
    }
}
