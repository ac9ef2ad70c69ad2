//! Tests for the TIFF writer, read back through the parser

use std::io::Cursor;

use crate::coordinate::AffineTransform;
use crate::tiff::builder::TiffBuilder;
use crate::tiff::builders::{BasicTagsBuilder, GeoKeyCrs, GeoTagsBuilder, ImageStructure, MetadataBuilder};
use crate::tiff::constants::{sample_format, tags};
use crate::tiff::geo_key_parser::GeoKeyParser;
use crate::tiff::reader::TiffReader;

fn build(is_big_tiff: bool, strips: Vec<Vec<u8>>, rows_per_strip: u32) -> Vec<u8> {
    let mut builder = TiffBuilder::new(is_big_tiff);
    let structure = ImageStructure {
        width: 3,
        height: 2,
        samples_per_pixel: 1,
        bits_per_sample: 8,
        sample_format: sample_format::UNSIGNED,
        compression: 1,
    };
    BasicTagsBuilder::add_image_structure(&mut builder, &structure);
    BasicTagsBuilder::add_software(&mut builder);
    GeoTagsBuilder::add_transform(&mut builder, &AffineTransform::from_origin(100.0, 200.0, 5.0, 5.0));
    GeoTagsBuilder::add_geo_keys(&mut builder, &GeoKeyCrs {
        epsg_code: 3857,
        is_geographic: false,
        citation: "EPSG:3857".to_string(),
    });
    MetadataBuilder::add_nodata_tag(&mut builder, 0.0);
    builder.set_strips(strips, rows_per_strip);

    let mut out = Vec::new();
    builder.write_to(&mut out).unwrap();
    out
}

#[test]
fn test_round_trip_classic_and_bigtiff() {
    for is_big_tiff in [false, true] {
        let bytes = build(is_big_tiff, vec![vec![1, 2, 3], vec![4, 5, 6]], 1);
        let mut cursor = Cursor::new(bytes);
        let mut reader = TiffReader::new();
        let tiff = reader.read(&mut cursor).unwrap();
        assert_eq!(tiff.is_big_tiff, is_big_tiff);

        let ifd = tiff.main_ifd().unwrap();
        assert_eq!(ifd.get_dimensions(), Some((3, 2)));
        assert_eq!(ifd.get_tag_value(tags::ROWS_PER_STRIP), Some(1));

        let offsets = reader.read_tag_values(&mut cursor, ifd, tags::STRIP_OFFSETS).unwrap();
        let counts = reader.read_tag_values(&mut cursor, ifd, tags::STRIP_BYTE_COUNTS).unwrap();
        assert_eq!(counts, vec![3, 3]);
        let data = cursor.get_ref();
        assert_eq!(&data[offsets[0] as usize..offsets[0] as usize + 3], &[1, 2, 3]);
        assert_eq!(&data[offsets[1] as usize..offsets[1] as usize + 3], &[4, 5, 6]);

        let geo = GeoKeyParser::extract_geo_reference(&reader, &mut cursor, ifd).unwrap();
        assert_eq!(geo.epsg_code, Some(3857));
        assert_eq!(geo.transform, Some(AffineTransform::from_origin(100.0, 200.0, 5.0, 5.0)));
        assert_eq!(geo.nodata, Some(0.0));

        let software = reader.read_tag_ascii(&mut cursor, ifd, tags::SOFTWARE).unwrap();
        assert!(software.starts_with("georeproject"));
    }
}

#[test]
fn test_single_strip_offset_inline() {
    let bytes = build(false, vec![vec![9, 8, 7, 6, 5, 4]], 2);
    let mut cursor = Cursor::new(bytes);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    let offset = ifd.get_tag_value(tags::STRIP_OFFSETS).unwrap() as usize;
    assert_eq!(&cursor.get_ref()[offset..offset + 6], &[9, 8, 7, 6, 5, 4]);
}

#[test]
fn test_entries_sorted_and_word_aligned() {
    let bytes = build(false, vec![vec![1, 2, 3], vec![4, 5, 6]], 1);
    let mut cursor = Cursor::new(bytes);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    let tags_in_order: Vec<u16> = ifd.entries.iter().map(|e| e.tag).collect();
    let mut sorted = tags_in_order.clone();
    sorted.sort_unstable();
    assert_eq!(tags_in_order, sorted);

    for offset in reader.read_tag_values(&mut cursor, ifd, tags::STRIP_OFFSETS).unwrap() {
        assert_eq!(offset % 4, 0);
    }
}
