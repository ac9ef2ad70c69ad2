//! TIFF file construction utilities
//!
//! `TiffBuilder` assembles a single-image TIFF or BigTIFF: tag entries,
//! out-of-line tag data and the encoded strips. Values that fit in an
//! entry's value field are stored inline; everything else is laid out by
//! the writer after the IFD.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use log::{debug, info};

use crate::tiff::builders::writer::WriterBuilder;
use crate::tiff::constants::{field_types, tags};
use crate::tiff::errors::TiffResult;
use crate::tiff::ifd::{IFD, IFDEntry};

/// Builder for creating single-image TIFF files
pub struct TiffBuilder {
    is_big_tiff: bool,
    pub ifd: IFD,
    external_data: BTreeMap<u16, Vec<u8>>,
    strips: Vec<Vec<u8>>,
}

impl TiffBuilder {
    /// Create a new TIFF builder
    pub fn new(is_big_tiff: bool) -> Self {
        debug!("Creating new TiffBuilder (is_big_tiff: {})", is_big_tiff);
        TiffBuilder {
            is_big_tiff,
            ifd: IFD::new(0, 0),
            external_data: BTreeMap::new(),
            strips: Vec::new(),
        }
    }

    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Out-of-line data for a tag, if the tag was too large to inline
    pub fn external_data(&self, tag: u16) -> Option<&[u8]> {
        self.external_data.get(&tag).map(Vec::as_slice)
    }

    /// Store a tag from its little-endian encoded values
    pub fn add_raw(&mut self, tag: u16, field_type: u16, count: u64, bytes: Vec<u8>) {
        let inline_len = if self.is_big_tiff { 8 } else { 4 };

        if bytes.len() <= inline_len {
            let mut field = [0u8; 8];
            field[..bytes.len()].copy_from_slice(&bytes);
            self.ifd.add_entry(IFDEntry::new(tag, field_type, count, u64::from_le_bytes(field)));
            self.external_data.remove(&tag);
        } else {
            self.ifd.add_entry(IFDEntry::new(tag, field_type, count, 0));
            self.external_data.insert(tag, bytes);
        }
    }

    pub fn add_short(&mut self, tag: u16, value: u16) {
        self.add_shorts(tag, &[value]);
    }

    pub fn add_shorts(&mut self, tag: u16, values: &[u16]) {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.add_raw(tag, field_types::SHORT, values.len() as u64, bytes);
    }

    pub fn add_long(&mut self, tag: u16, value: u32) {
        self.add_raw(tag, field_types::LONG, 1, value.to_le_bytes().to_vec());
    }

    pub fn add_doubles(&mut self, tag: u16, values: &[f64]) {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.add_raw(tag, field_types::DOUBLE, values.len() as u64, bytes);
    }

    /// Add a NUL-terminated ASCII tag
    pub fn add_ascii(&mut self, tag: u16, value: &str) {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        let count = bytes.len() as u64;
        self.add_raw(tag, field_types::ASCII, count, bytes);
    }

    /// Attach encoded strips, each `rows_per_strip` rows tall except the last
    pub fn set_strips(&mut self, strips: Vec<Vec<u8>>, rows_per_strip: u32) {
        info!("Setting {} strips ({} rows each)", strips.len(), rows_per_strip);

        let (offset_type, offset_size) = if self.is_big_tiff {
            (field_types::LONG8, 8)
        } else {
            (field_types::LONG, 4)
        };

        // Real offsets are only known at write time
        let placeholder = vec![0u8; strips.len() * offset_size];
        self.add_raw(tags::STRIP_OFFSETS, offset_type, strips.len() as u64, placeholder);

        let byte_counts: Vec<u8> = strips.iter()
            .flat_map(|s| {
                let len = s.len() as u64;
                if self.is_big_tiff { len.to_le_bytes().to_vec() } else { (len as u32).to_le_bytes().to_vec() }
            })
            .collect();
        self.add_raw(tags::STRIP_BYTE_COUNTS, offset_type, strips.len() as u64, byte_counts);
        self.add_long(tags::ROWS_PER_STRIP, rows_per_strip);

        self.strips = strips;
    }

    /// Serialize into any writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> TiffResult<()> {
        WriterBuilder::write(self.is_big_tiff, &self.ifd, &self.external_data, &self.strips, writer)
    }

    /// Write the TIFF file to disk
    pub fn write(&self, output_path: &Path) -> TiffResult<()> {
        info!("Writing TIFF to {}", output_path.display());
        WriterBuilder::write_file(self.is_big_tiff, &self.ifd, &self.external_data, &self.strips, output_path)
    }
}
