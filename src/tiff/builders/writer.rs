//! TIFF writing strategies
//!
//! Lays out a single-image file as header, IFD, out-of-line tag data and
//! strips, in that order, then writes it front to back. Every offset is
//! computed before the first byte is written.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::tiff::constants::{header, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::utils::write_utils;

/// Handles writing TIFF files
pub struct WriterBuilder;

struct Layout {
    ifd_offset: u64,
    data_offsets: HashMap<u16, u64>,
    strip_offsets: Vec<u64>,
    total_size: u64,
}

impl WriterBuilder {
    /// Write a complete TIFF file to disk
    pub fn write_file(
        is_big_tiff: bool,
        ifd: &IFD,
        external_data: &BTreeMap<u16, Vec<u8>>,
        strips: &[Vec<u8>],
        output_path: &Path,
    ) -> TiffResult<()> {
        let file = File::create(output_path)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);
        Self::write(is_big_tiff, ifd, external_data, strips, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a complete TIFF file to `writer`
    pub fn write<W: Write>(
        is_big_tiff: bool,
        ifd: &IFD,
        external_data: &BTreeMap<u16, Vec<u8>>,
        strips: &[Vec<u8>],
        writer: &mut W,
    ) -> TiffResult<()> {
        let mut sorted_ifd = ifd.clone();
        sorted_ifd.entries = write_utils::get_unique_sorted_entries(&ifd.entries);

        let layout = Self::calculate_layout(&sorted_ifd, external_data, strips, is_big_tiff);
        if !is_big_tiff && layout.total_size > u32::MAX as u64 {
            return Err(TiffError::GenericError(format!(
                "{} bytes do not fit a classic TIFF; BigTIFF is required", layout.total_size
            )));
        }
        debug!("TIFF layout: IFD at {}, {} external blocks, {} strips, {} bytes total",
               layout.ifd_offset, layout.data_offsets.len(), strips.len(), layout.total_size);

        let strip_offset_bytes = Self::encode_offsets(&layout.strip_offsets, is_big_tiff);

        Self::write_header(writer, layout.ifd_offset, is_big_tiff)?;
        Self::write_ifd(writer, &sorted_ifd, &layout, &strip_offset_bytes, is_big_tiff)?;

        for (tag, data) in external_data {
            let data = if *tag == tags::STRIP_OFFSETS { &strip_offset_bytes } else { data };
            writer.write_all(data)?;
            write_utils::write_padding(writer, data.len())?;
        }

        for strip in strips {
            writer.write_all(strip)?;
            write_utils::write_padding(writer, strip.len())?;
        }

        Ok(())
    }

    /// Calculate size of the IFD
    fn calculate_ifd_size(ifd: &IFD, is_big_tiff: bool) -> u64 {
        let entries_count = ifd.entries.len() as u64;

        match is_big_tiff {
            // 8-byte count, 20-byte entries, 8-byte next offset
            true => 8 + (20 * entries_count) + 8,
            // 2-byte count, 12-byte entries, 4-byte next offset
            false => 2 + (12 * entries_count) + 4,
        }
    }

    fn calculate_layout(
        ifd: &IFD,
        external_data: &BTreeMap<u16, Vec<u8>>,
        strips: &[Vec<u8>],
        is_big_tiff: bool,
    ) -> Layout {
        let ifd_offset: u64 = if is_big_tiff { 16 } else { 8 };
        let mut current = write_utils::align_to_4_bytes(ifd_offset + Self::calculate_ifd_size(ifd, is_big_tiff));

        let mut data_offsets = HashMap::new();
        for (tag, data) in external_data {
            data_offsets.insert(*tag, current);
            current = write_utils::align_to_4_bytes(current + data.len() as u64);
        }

        let mut strip_offsets = Vec::with_capacity(strips.len());
        for strip in strips {
            strip_offsets.push(current);
            current = write_utils::align_to_4_bytes(current + strip.len() as u64);
        }

        Layout { ifd_offset, data_offsets, strip_offsets, total_size: current }
    }

    fn encode_offsets(offsets: &[u64], is_big_tiff: bool) -> Vec<u8> {
        offsets.iter()
            .flat_map(|&o| if is_big_tiff { o.to_le_bytes().to_vec() } else { (o as u32).to_le_bytes().to_vec() })
            .collect()
    }

    /// Write TIFF header: byte order, version and first IFD offset
    fn write_header(writer: &mut impl Write, ifd_offset: u64, is_big_tiff: bool) -> TiffResult<()> {
        // Always little endian (II)
        writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;

        if is_big_tiff {
            writer.write_all(&header::BIG_TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&header::BIGTIFF_OFFSET_SIZE.to_le_bytes())?;
            writer.write_all(&[0u8, 0])?;
            writer.write_all(&ifd_offset.to_le_bytes())?;
        } else {
            writer.write_all(&header::TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&(ifd_offset as u32).to_le_bytes())?;
        }

        Ok(())
    }

    /// Write the IFD, resolving each entry's value field
    fn write_ifd(
        writer: &mut impl Write,
        ifd: &IFD,
        layout: &Layout,
        strip_offset_bytes: &[u8],
        is_big_tiff: bool,
    ) -> TiffResult<()> {
        match is_big_tiff {
            true => writer.write_all(&(ifd.entries.len() as u64).to_le_bytes())?,
            false => writer.write_all(&(ifd.entries.len() as u16).to_le_bytes())?,
        }

        let field_len = if is_big_tiff { 8 } else { 4 };

        for entry in &ifd.entries {
            let mut field = [0u8; 8];
            if let Some(offset) = layout.data_offsets.get(&entry.tag) {
                field = offset.to_le_bytes();
            } else if entry.tag == tags::STRIP_OFFSETS {
                field[..strip_offset_bytes.len()].copy_from_slice(strip_offset_bytes);
            } else {
                field = entry.value_offset.to_le_bytes();
            }

            writer.write_all(&entry.tag.to_le_bytes())?;
            writer.write_all(&entry.field_type.to_le_bytes())?;
            match is_big_tiff {
                true => writer.write_all(&entry.count.to_le_bytes())?,
                false => writer.write_all(&(entry.count as u32).to_le_bytes())?,
            }
            writer.write_all(&field[..field_len])?;
        }

        // Single-image files: no next IFD
        writer.write_all(&vec![0u8; field_len])?;
        write_utils::write_padding(writer, Self::calculate_ifd_size(ifd, is_big_tiff) as usize)?;

        Ok(())
    }
}
