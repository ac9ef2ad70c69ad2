//! In-memory TIFF fixtures

use std::io::Cursor;
use byteorder::{ByteOrder as Endian, WriteBytesExt};

use crate::tiff::constants::{field_types, tags};

/// A tag value as it should be encoded in a fixture
pub enum TagValue {
    Short(Vec<u16>),
    Long(Vec<u32>),
    Double(Vec<f64>),
    Ascii(&'static str),
}

impl TagValue {
    fn encode<E: Endian>(&self) -> (u16, u32, Vec<u8>) {
        let mut bytes = Vec::new();
        match self {
            TagValue::Short(values) => {
                for v in values { bytes.write_u16::<E>(*v).unwrap(); }
                (field_types::SHORT, values.len() as u32, bytes)
            },
            TagValue::Long(values) => {
                for v in values { bytes.write_u32::<E>(*v).unwrap(); }
                (field_types::LONG, values.len() as u32, bytes)
            },
            TagValue::Double(values) => {
                for v in values { bytes.write_f64::<E>(*v).unwrap(); }
                (field_types::DOUBLE, values.len() as u32, bytes)
            },
            TagValue::Ascii(text) => {
                bytes.extend_from_slice(text.as_bytes());
                bytes.push(0);
                (field_types::ASCII, bytes.len() as u32, bytes)
            },
        }
    }
}

/// Builds a classic TIFF in byte order `E` holding `entries` and a single strip
///
/// StripOffsets and StripByteCounts are added automatically.
pub fn build_tiff<E: Endian>(entries: Vec<(u16, TagValue)>, strip: &[u8]) -> Vec<u8> {
    let mut all: Vec<(u16, u16, u32, Vec<u8>)> = entries.iter()
        .map(|(tag, value)| {
            let (field_type, count, bytes) = value.encode::<E>();
            (*tag, field_type, count, bytes)
        })
        .collect();

    let mut byte_count = Vec::new();
    byte_count.write_u32::<E>(strip.len() as u32).unwrap();
    all.push((tags::STRIP_BYTE_COUNTS, field_types::LONG, 1, byte_count));
    all.push((tags::STRIP_OFFSETS, field_types::LONG, 1, vec![0; 4]));
    all.sort_by_key(|entry| entry.0);

    let ifd_end = 8 + 2 + 12 * all.len() + 4;
    let external: usize = all.iter().filter(|e| e.3.len() > 4).map(|e| e.3.len()).sum();
    let strip_offset = (ifd_end + external) as u32;
    for entry in all.iter_mut().filter(|e| e.0 == tags::STRIP_OFFSETS) {
        entry.3.clear();
        entry.3.write_u32::<E>(strip_offset).unwrap();
    }

    let mut first_byte = [0u8; 2];
    E::write_u16(&mut first_byte, 1);
    let marker: &[u8] = if first_byte[0] == 0 { b"MM" } else { b"II" };

    let mut buffer = Vec::new();
    buffer.extend_from_slice(marker);
    buffer.write_u16::<E>(42).unwrap();
    buffer.write_u32::<E>(8).unwrap();
    buffer.write_u16::<E>(all.len() as u16).unwrap();

    let mut next_data = ifd_end;
    for (tag, field_type, count, bytes) in &all {
        buffer.write_u16::<E>(*tag).unwrap();
        buffer.write_u16::<E>(*field_type).unwrap();
        buffer.write_u32::<E>(*count).unwrap();
        if bytes.len() <= 4 {
            let mut field = bytes.clone();
            field.resize(4, 0);
            buffer.extend_from_slice(&field);
        } else {
            buffer.write_u32::<E>(next_data as u32).unwrap();
            next_data += bytes.len();
        }
    }
    buffer.write_u32::<E>(0).unwrap();

    for (_, _, _, bytes) in &all {
        if bytes.len() > 4 {
            buffer.extend_from_slice(bytes);
        }
    }
    buffer.extend_from_slice(strip);
    buffer
}

/// A 2x2 single-band u16 GeoTIFF in EPSG:4326 with pixels `[1, 2, 3, 4]`
///
/// Transform is `(1, 0, 0, 0, -1, 2)` and GDAL_NODATA is 255.
pub fn geotiff_2x2_u16<E: Endian>() -> Cursor<Vec<u8>> {
    let mut strip = Vec::new();
    for v in [1u16, 2, 3, 4] {
        strip.write_u16::<E>(v).unwrap();
    }

    let entries = vec![
        (tags::IMAGE_WIDTH, TagValue::Short(vec![2])),
        (tags::IMAGE_LENGTH, TagValue::Short(vec![2])),
        (tags::BITS_PER_SAMPLE, TagValue::Short(vec![16])),
        (tags::COMPRESSION, TagValue::Short(vec![1])),
        (tags::PHOTOMETRIC_INTERPRETATION, TagValue::Short(vec![1])),
        (tags::SAMPLES_PER_PIXEL, TagValue::Short(vec![1])),
        (tags::ROWS_PER_STRIP, TagValue::Short(vec![2])),
        (tags::SAMPLE_FORMAT, TagValue::Short(vec![1])),
        (tags::MODEL_PIXEL_SCALE_TAG, TagValue::Double(vec![1.0, 1.0, 0.0])),
        (tags::MODEL_TIEPOINT_TAG, TagValue::Double(vec![0.0, 0.0, 0.0, 0.0, 2.0, 0.0])),
        (tags::GEO_KEY_DIRECTORY_TAG, TagValue::Short(vec![
            1, 1, 0, 3,
            1024, 0, 1, 2,
            1025, 0, 1, 1,
            2048, 0, 1, 4326,
        ])),
        (tags::GDAL_NODATA, TagValue::Ascii("255")),
    ];

    Cursor::new(build_tiff::<E>(entries, &strip))
}

/// Creates a test buffer with BigTIFF header and a bare two-entry IFD
pub fn create_test_bigtiff_buffer() -> Cursor<Vec<u8>> {
    use byteorder::LittleEndian;
    let mut buffer = Vec::new();

    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II
    buffer.write_u16::<LittleEndian>(43).unwrap();     // BigTIFF version
    buffer.write_u16::<LittleEndian>(8).unwrap();      // Offset size
    buffer.write_u16::<LittleEndian>(0).unwrap();      // Reserved
    buffer.write_u64::<LittleEndian>(16).unwrap();     // IFD offset

    buffer.write_u64::<LittleEndian>(2).unwrap();      // Entry count

    buffer.write_u16::<LittleEndian>(256).unwrap();    // ImageWidth
    buffer.write_u16::<LittleEndian>(4).unwrap();      // LONG
    buffer.write_u64::<LittleEndian>(1).unwrap();
    buffer.write_u64::<LittleEndian>(1024).unwrap();

    buffer.write_u16::<LittleEndian>(257).unwrap();    // ImageLength
    buffer.write_u16::<LittleEndian>(4).unwrap();      // LONG
    buffer.write_u64::<LittleEndian>(1).unwrap();
    buffer.write_u64::<LittleEndian>(768).unwrap();

    buffer.write_u64::<LittleEndian>(0).unwrap();      // No next IFD

    Cursor::new(buffer)
}
