//! Tests for byte order detection and value decoding

use std::io::Cursor;
use byteorder::{LittleEndian, BigEndian, WriteBytesExt};
use crate::io::byte_order::{ByteOrder, ByteOrderHandler, LittleEndianHandler, BigEndianHandler};

#[test]
fn test_byte_order_detection() {
    let mut little = Cursor::new(b"II".to_vec());
    assert_eq!(ByteOrder::detect(&mut little).unwrap(), ByteOrder::LittleEndian);

    let mut big = Cursor::new(b"MM".to_vec());
    assert_eq!(ByteOrder::detect(&mut big).unwrap(), ByteOrder::BigEndian);
}

#[test]
fn test_byte_order_detection_invalid() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x1234).unwrap();
    let mut cursor = Cursor::new(buffer);

    assert!(ByteOrder::detect(&mut cursor).is_err());
}

#[test]
fn test_handlers_read_scalars() {
    let mut little = Vec::new();
    little.write_u16::<LittleEndian>(0x1234).unwrap();
    little.write_u64::<LittleEndian>(0x1234567890ABCDEF).unwrap();
    little.write_f64::<LittleEndian>(-2.5).unwrap();
    let mut cursor = Cursor::new(little);

    let handler = LittleEndianHandler;
    assert_eq!(handler.read_u16(&mut cursor).unwrap(), 0x1234);
    assert_eq!(handler.read_u64(&mut cursor).unwrap(), 0x1234567890ABCDEF);
    assert_eq!(handler.read_f64(&mut cursor).unwrap(), -2.5);

    let mut big = Vec::new();
    big.write_u32::<BigEndian>(0x12345678).unwrap();
    let mut cursor = Cursor::new(big);
    assert_eq!(BigEndianHandler.read_u32(&mut cursor).unwrap(), 0x12345678);
}

#[test]
fn test_bulk_decoding_follows_byte_order() {
    let bytes = [0x00, 0x01, 0xFF, 0xFE];
    assert_eq!(BigEndianHandler.decode_u16(&bytes), vec![1, 0xFFFE]);
    assert_eq!(LittleEndianHandler.decode_u16(&bytes), vec![0x0100, 0xFEFF]);
    assert_eq!(BigEndianHandler.decode_i16(&bytes), vec![1, -2]);

    let mut floats = Vec::new();
    floats.write_f32::<BigEndian>(1.5).unwrap();
    floats.write_f32::<BigEndian>(-0.25).unwrap();
    assert_eq!(BigEndianHandler.decode_f32(&floats), vec![1.5, -0.25]);
}
