//! Tests for the TIFF container type

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::tags;
use crate::tiff::types::TIFF;
use crate::tiff::ifd::{IFD, IFDEntry};

#[test]
fn test_tiff_creation() {
    let tiff = TIFF::new(false, ByteOrder::LittleEndian);
    assert!(!tiff.is_big_tiff);
    assert_eq!(tiff.ifd_count(), 0);
    assert!(tiff.main_ifd().is_none());
    assert!(tiff.primary_image().is_none());
}

#[test]
fn test_primary_image_skips_masks_and_overviews() {
    let mut tiff = TIFF::new(true, ByteOrder::BigEndian);

    // A transparency mask written ahead of the image
    let mut mask = IFD::new(0, 16);
    mask.add_entry(IFDEntry::new(tags::NEW_SUBFILE_TYPE, 4, 1, 4));
    mask.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, 4, 1, 1024));
    mask.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, 4, 1, 768));
    tiff.ifds.push(mask);

    let mut full = IFD::new(1, 100);
    full.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, 4, 1, 1024));
    full.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, 4, 1, 768));
    tiff.ifds.push(full);

    let mut overview = IFD::new(2, 200);
    overview.add_entry(IFDEntry::new(tags::NEW_SUBFILE_TYPE, 4, 1, 1));
    overview.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, 4, 1, 512));
    overview.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, 4, 1, 384));
    tiff.ifds.push(overview);

    assert_eq!(tiff.ifd_count(), 3);
    assert_eq!(tiff.primary_image().map(|ifd| ifd.number), Some(1));
    assert_eq!(tiff.primary_image().and_then(|ifd| ifd.get_dimensions()), Some((1024, 768)));
}
