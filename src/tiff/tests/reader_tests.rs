//! Tests for header, IFD and GeoKey parsing

use byteorder::{BigEndian, LittleEndian};

use crate::coordinate::AffineTransform;
use crate::raster::CrsDescriptor;
use crate::reproject::ReprojectError;
use crate::tiff::constants::tags;
use crate::tiff::geo_key_parser::GeoKeyParser;
use crate::tiff::reader::TiffReader;
use crate::tiff::tests::test_utils::{self, TagValue};

#[test]
fn test_big_endian_inline_shorts() {
    let mut cursor = test_utils::geotiff_2x2_u16::<BigEndian>();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let ifd = tiff.main_ifd().unwrap();
    assert_eq!(ifd.get_dimensions(), Some((2, 2)));
    assert_eq!(ifd.get_tag_value(tags::BITS_PER_SAMPLE), Some(16));
    assert!(!reader.is_big_tiff());
}

#[test]
fn test_geo_reference_both_byte_orders() {
    for mut cursor in [test_utils::geotiff_2x2_u16::<LittleEndian>(), test_utils::geotiff_2x2_u16::<BigEndian>()] {
        let mut reader = TiffReader::new();
        let tiff = reader.read(&mut cursor).unwrap();
        let ifd = tiff.main_ifd().unwrap();

        let geo = GeoKeyParser::extract_geo_reference(&reader, &mut cursor, ifd).unwrap();
        assert_eq!(geo.epsg_code, Some(4326));
        assert_eq!(geo.crs_descriptor().as_deref(), Some("EPSG:4326"));
        assert_eq!(geo.transform, Some(AffineTransform::new(1.0, 0.0, 0.0, 0.0, -1.0, 2.0)));
        assert_eq!(geo.nodata, Some(255.0));
    }
}

#[test]
fn test_pixel_is_point_shifts_origin() {
    let entries = vec![
        (tags::IMAGE_WIDTH, TagValue::Short(vec![1])),
        (tags::IMAGE_LENGTH, TagValue::Short(vec![1])),
        (tags::MODEL_PIXEL_SCALE_TAG, TagValue::Double(vec![10.0, 10.0, 0.0])),
        (tags::MODEL_TIEPOINT_TAG, TagValue::Double(vec![0.0, 0.0, 0.0, 500.0, 1000.0, 0.0])),
        (tags::GEO_KEY_DIRECTORY_TAG, TagValue::Short(vec![
            1, 1, 0, 2,
            1025, 0, 1, 2,
            3072, 0, 1, 32633,
        ])),
    ];
    let mut cursor = std::io::Cursor::new(test_utils::build_tiff::<LittleEndian>(entries, &[0]));
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let geo = GeoKeyParser::extract_geo_reference(&reader, &mut cursor, tiff.main_ifd().unwrap()).unwrap();
    assert_eq!(geo.epsg_code, Some(32633));
    assert_eq!(geo.transform, Some(AffineTransform::new(10.0, 0.0, 495.0, 0.0, -10.0, 1005.0)));
    assert_eq!(geo.nodata, None);
}

#[test]
fn test_user_defined_crs_falls_back_to_citation() {
    let entries = vec![
        (tags::IMAGE_WIDTH, TagValue::Short(vec![1])),
        (tags::IMAGE_LENGTH, TagValue::Short(vec![1])),
        (tags::GEO_KEY_DIRECTORY_TAG, TagValue::Short(vec![
            1, 1, 0, 2,
            1026, 34737, 11, 0,
            3072, 0, 1, 32767,
        ])),
        (tags::GEO_ASCII_PARAMS_TAG, TagValue::Ascii("Custom LCC|")),
    ];
    let mut cursor = std::io::Cursor::new(test_utils::build_tiff::<LittleEndian>(entries, &[0]));
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let geo = GeoKeyParser::extract_geo_reference(&reader, &mut cursor, tiff.main_ifd().unwrap()).unwrap();
    assert_eq!(geo.epsg_code, None);
    assert_eq!(geo.crs_descriptor().as_deref(), Some("Custom LCC"));
    assert!(geo.transform.is_none());
}

fn geo_reference_for_keys(geo_keys: Vec<u16>) -> crate::tiff::GeoReference {
    let entries = vec![
        (tags::IMAGE_WIDTH, TagValue::Short(vec![2])),
        (tags::IMAGE_LENGTH, TagValue::Short(vec![2])),
        (tags::MODEL_PIXEL_SCALE_TAG, TagValue::Double(vec![10.0, 10.0, 0.0])),
        (tags::MODEL_TIEPOINT_TAG, TagValue::Double(vec![0.0, 0.0, 0.0, 700_000.0, 6_600_000.0, 0.0])),
        (tags::GEO_KEY_DIRECTORY_TAG, TagValue::Short(geo_keys)),
        (tags::GEO_ASCII_PARAMS_TAG, TagValue::Ascii("WGS 84|")),
    ];
    let mut cursor = std::io::Cursor::new(test_utils::build_tiff::<LittleEndian>(entries, &[0, 0, 0, 0]));
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    GeoKeyParser::extract_geo_reference(&reader, &mut cursor, tiff.main_ifd().unwrap()).unwrap()
}

#[test]
fn test_user_defined_projection_ignores_datum_code() {
    let geo = geo_reference_for_keys(vec![
        1, 1, 0, 4,
        1024, 0, 1, 1,
        2048, 0, 1, 4326,
        2049, 34737, 7, 0,
        3072, 0, 1, 32767,
    ]);
    assert_eq!(geo.epsg_code, None);
    assert_eq!(geo.crs_descriptor(), None);

    let descriptor = CrsDescriptor { epsg: geo.epsg_code, citation: geo.citation };
    assert!(matches!(descriptor.resolve(), Err(ReprojectError::InvalidCrs(_))));
}

#[test]
fn test_model_type_selects_crs_key() {
    // Projected model without a ProjectedCSType
    let geo = geo_reference_for_keys(vec![
        1, 1, 0, 2,
        1024, 0, 1, 1,
        2048, 0, 1, 4326,
    ]);
    assert_eq!(geo.epsg_code, None);

    // Geographic model with a stray ProjectedCSType
    let geo = geo_reference_for_keys(vec![
        1, 1, 0, 4,
        1024, 0, 1, 2,
        2048, 0, 1, 4326,
        2049, 34737, 7, 0,
        3072, 0, 1, 32633,
    ]);
    assert_eq!(geo.epsg_code, Some(4326));
    assert_eq!(geo.citation.as_deref(), Some("WGS 84"));

    // No model type: a ProjectedCSType key implies a projected model
    let geo = geo_reference_for_keys(vec![
        1, 1, 0, 2,
        2048, 0, 1, 4326,
        3072, 0, 1, 32633,
    ]);
    assert_eq!(geo.epsg_code, Some(32633));
}

#[test]
fn test_bigtiff_header() {
    let mut cursor = test_utils::create_test_bigtiff_buffer();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    assert!(tiff.is_big_tiff);
    assert_eq!(tiff.main_ifd().and_then(|ifd| ifd.get_dimensions()), Some((1024, 768)));
}

#[test]
fn test_rejects_bad_version() {
    let mut bytes = test_utils::geotiff_2x2_u16::<LittleEndian>().into_inner();
    bytes[2] = 41;
    let mut cursor = std::io::Cursor::new(bytes);
    assert!(TiffReader::new().read(&mut cursor).is_err());
}
