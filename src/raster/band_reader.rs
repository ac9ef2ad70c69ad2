//! Band decoding for stripped and tiled TIFF images
//!
//! A `BandReader` captures the data layout of one IFD (block geometry,
//! offsets, compression, predictor, planar configuration) and decodes
//! single bands from it on demand. Each strip or tile is read,
//! decompressed and un-predicted, then the band's samples are copied out
//! of it into a full-size band buffer.

use std::io::SeekFrom;

use byteorder::{BigEndian, ByteOrder as Endian, LittleEndian};
use log::{debug, trace};

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::{self, SeekableReader};
use crate::tiff::constants::{planar_config, predictor, sample_format, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::validation;

use super::sample::{BandData, SampleType};

/// Decodes individual bands of one TIFF image
pub struct BandReader {
    width: usize,
    height: usize,
    samples_per_pixel: usize,
    sample_type: SampleType,
    planar: bool,
    block_width: usize,
    block_height: usize,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
    predictor: u16,
    byte_order: ByteOrder,
    handler: Box<dyn ByteOrderHandler>,
    decompressor: Box<dyn CompressionHandler>,
}

impl BandReader {
    /// Reads the layout tags of `ifd`
    pub fn new(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD, byte_order: ByteOrder) -> TiffResult<Self> {
        let (width, height) = ifd.get_dimensions().ok_or(TiffError::MissingDimensions)?;
        validation::validate_dimensions(width, height)?;
        let samples_per_pixel = ifd.get_samples_per_pixel().max(1) as usize;

        let bits = Self::first_value(tiff_reader, reader, ifd, tags::BITS_PER_SAMPLE)?.unwrap_or(1) as u16;
        let format = Self::first_value(tiff_reader, reader, ifd, tags::SAMPLE_FORMAT)?
            .unwrap_or(sample_format::UNSIGNED as u64) as u16;
        let sample_type = SampleType::from_tiff(bits, format)?;

        let planar = ifd.get_tag_value(tags::PLANAR_CONFIGURATION)
            .unwrap_or(planar_config::CHUNKY as u64) == planar_config::PLANAR as u64;

        let (block_width, block_height, offsets, byte_counts) = if ifd.is_tiled() {
            let tile_width = ifd.get_tag_value(tags::TILE_WIDTH).unwrap_or(0) as usize;
            let tile_height = ifd.get_tag_value(tags::TILE_LENGTH).unwrap_or(0) as usize;
            if tile_width == 0 || tile_height == 0 {
                return Err(TiffError::CorruptData(format!("Invalid tile size {}x{}", tile_width, tile_height)));
            }
            (
                tile_width,
                tile_height,
                tiff_reader.read_tag_values(reader, ifd, tags::TILE_OFFSETS)?,
                tiff_reader.read_tag_values(reader, ifd, tags::TILE_BYTE_COUNTS)?,
            )
        } else {
            let rows_per_strip = ifd.get_tag_value(tags::ROWS_PER_STRIP)
                .map(|r| (r as usize).clamp(1, height as usize))
                .unwrap_or(height as usize);
            (
                width as usize,
                rows_per_strip,
                tiff_reader.read_tag_values(reader, ifd, tags::STRIP_OFFSETS)?,
                tiff_reader.read_tag_values(reader, ifd, tags::STRIP_BYTE_COUNTS)?,
            )
        };

        let compression = ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1);
        let decompressor = CompressionFactory::create_handler(compression)?;
        let predictor = ifd.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64) as u16;

        let band_reader = BandReader {
            width: width as usize,
            height: height as usize,
            samples_per_pixel,
            sample_type,
            planar: planar && samples_per_pixel > 1,
            block_width,
            block_height,
            offsets,
            byte_counts,
            predictor,
            byte_order,
            handler: byte_order.create_handler(),
            decompressor,
        };

        let expected = band_reader.blocks_per_plane() * band_reader.plane_count();
        if band_reader.offsets.len() < expected || band_reader.byte_counts.len() < expected {
            return Err(TiffError::CorruptData(format!(
                "Expected {} data blocks, found {} offsets and {} byte counts",
                expected, band_reader.offsets.len(), band_reader.byte_counts.len()
            )));
        }

        debug!("Band layout: {}x{} {} x{}, blocks {}x{}, {}, compression {}, predictor {}",
               width, height, sample_type, samples_per_pixel, block_width, block_height,
               if band_reader.planar { "planar" } else { "chunky" },
               band_reader.decompressor.name(), predictor);

        Ok(band_reader)
    }

    fn first_value(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Option<u64>> {
        if !ifd.has_tag(tag) {
            return Ok(None);
        }
        Ok(tiff_reader.read_tag_values(reader, ifd, tag)?.first().copied())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn band_count(&self) -> usize {
        self.samples_per_pixel
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    fn blocks_across(&self) -> usize {
        self.width.div_ceil(self.block_width)
    }

    fn blocks_per_plane(&self) -> usize {
        self.blocks_across() * self.height.div_ceil(self.block_height)
    }

    fn plane_count(&self) -> usize {
        if self.planar { self.samples_per_pixel } else { 1 }
    }

    /// Decodes band `band` (0-based)
    pub fn read_band(&self, reader: &mut dyn SeekableReader, band: usize) -> TiffResult<BandData> {
        if band >= self.samples_per_pixel {
            return Err(TiffError::GenericError(format!(
                "Band {} out of range, image has {} bands", band + 1, self.samples_per_pixel
            )));
        }

        let bytes_per_sample = self.sample_type.bytes();
        let (plane, samples_in_block, sample_in_pixel) = if self.planar {
            (band, 1, 0)
        } else {
            (0, self.samples_per_pixel, band)
        };

        let file_size = seekable::stream_len(reader)?;
        let mut out = vec![0u8; self.width * self.height * bytes_per_sample];
        let block_row_bytes = self.block_width * samples_in_block * bytes_per_sample;

        for block in 0..self.blocks_per_plane() {
            let index = plane * self.blocks_per_plane() + block;
            let origin_x = (block % self.blocks_across()) * self.block_width;
            let origin_y = (block / self.blocks_across()) * self.block_height;
            let rows = self.block_height.min(self.height - origin_y);
            let cols = self.block_width.min(self.width - origin_x);

            let data = self.read_block(reader, index, file_size, samples_in_block)?;
            if data.len() < (rows - 1) * block_row_bytes + cols * samples_in_block * bytes_per_sample {
                return Err(TiffError::CorruptData(format!(
                    "Block {} decoded to {} bytes, too short for {} rows", index, data.len(), rows
                )));
            }

            for row in 0..rows {
                let src_row = &data[row * block_row_bytes..];
                let dst_start = ((origin_y + row) * self.width + origin_x) * bytes_per_sample;
                let dst_row = &mut out[dst_start..dst_start + cols * bytes_per_sample];

                if samples_in_block == 1 {
                    dst_row.copy_from_slice(&src_row[..cols * bytes_per_sample]);
                } else {
                    for col in 0..cols {
                        let src = (col * samples_in_block + sample_in_pixel) * bytes_per_sample;
                        dst_row[col * bytes_per_sample..(col + 1) * bytes_per_sample]
                            .copy_from_slice(&src_row[src..src + bytes_per_sample]);
                    }
                }
            }
        }

        Ok(BandData::decode(self.sample_type, &out, self.handler.as_ref()))
    }

    /// Reads, decompresses and un-predicts one strip or tile
    fn read_block(&self, reader: &mut dyn SeekableReader, index: usize, file_size: u64, samples_in_block: usize) -> TiffResult<Vec<u8>> {
        let offset = self.offsets[index];
        let byte_count = self.byte_counts[index];
        trace!("Reading block {} at offset {} ({} bytes)", index, offset, byte_count);

        validation::validate_data_range(offset, byte_count, file_size, "data block")?;
        reader.seek(SeekFrom::Start(offset))?;
        let mut compressed = vec![0u8; byte_count as usize];
        reader.read_exact(&mut compressed)?;

        let mut data = self.decompressor.decompress(&compressed)?;

        let row_bytes = self.block_width * samples_in_block * self.sample_type.bytes();
        match self.predictor {
            predictor::HORIZONTAL_DIFFERENCING => {
                for row in data.chunks_exact_mut(row_bytes) {
                    match self.byte_order {
                        ByteOrder::LittleEndian => undo_horizontal_differencing::<LittleEndian>(row, self.sample_type.bytes(), samples_in_block),
                        ByteOrder::BigEndian => undo_horizontal_differencing::<BigEndian>(row, self.sample_type.bytes(), samples_in_block),
                    }
                }
            },
            predictor::FLOATING_POINT => {
                let big_endian = self.byte_order == ByteOrder::BigEndian;
                for row in data.chunks_exact_mut(row_bytes) {
                    undo_floating_point_differencing(row, self.sample_type.bytes(), samples_in_block, big_endian);
                }
            },
            _ => {}
        }

        Ok(data)
    }
}

/// Reverses TIFF predictor 2 on one row, in the file's byte order
fn undo_horizontal_differencing<E: Endian>(row: &mut [u8], bytes_per_sample: usize, stride: usize) {
    match bytes_per_sample {
        1 => {
            for i in stride..row.len() {
                row[i] = row[i].wrapping_add(row[i - stride]);
            }
        },
        2 => {
            for i in stride..row.len() / 2 {
                let value = E::read_u16(&row[i * 2..]).wrapping_add(E::read_u16(&row[(i - stride) * 2..]));
                E::write_u16(&mut row[i * 2..], value);
            }
        },
        4 => {
            for i in stride..row.len() / 4 {
                let value = E::read_u32(&row[i * 4..]).wrapping_add(E::read_u32(&row[(i - stride) * 4..]));
                E::write_u32(&mut row[i * 4..], value);
            }
        },
        _ => {
            for i in stride..row.len() / 8 {
                let value = E::read_u64(&row[i * 8..]).wrapping_add(E::read_u64(&row[(i - stride) * 8..]));
                E::write_u64(&mut row[i * 8..], value);
            }
        },
    }
}

/// Reverses TIFF predictor 3 on one row
///
/// The encoder splits each sample into byte planes, most significant
/// first, and differences the bytes. The result is written back in the
/// file's byte order so the normal sample decoder applies.
fn undo_floating_point_differencing(row: &mut [u8], bytes_per_sample: usize, stride: usize, big_endian: bool) {
    for i in stride..row.len() {
        row[i] = row[i].wrapping_add(row[i - stride]);
    }

    let count = row.len() / bytes_per_sample;
    let planes = row.to_vec();
    for i in 0..count {
        for b in 0..bytes_per_sample {
            let plane = if big_endian { b } else { bytes_per_sample - 1 - b };
            row[i * bytes_per_sample + b] = planes[plane * count + i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_differencing_u8_rgb() {
        let mut row = vec![10, 20, 30, 1, 1, 1, 255, 0, 2];
        undo_horizontal_differencing::<LittleEndian>(&mut row, 1, 3);
        assert_eq!(row, vec![10, 20, 30, 11, 21, 31, 10, 21, 33]);
    }

    #[test]
    fn test_horizontal_differencing_u16_big_endian() {
        let mut row = vec![0x01, 0x00, 0x00, 0x02, 0xFF, 0xFF];
        undo_horizontal_differencing::<BigEndian>(&mut row, 2, 1);
        assert_eq!(row, vec![0x01, 0x00, 0x01, 0x02, 0x01, 0x01]);
    }

    #[test]
    fn test_floating_point_predictor() {
        let values = [1.5f32, -2.25, 1024.0];
        // Encode: big-endian byte planes, then byte-wise differencing
        let be: Vec<[u8; 4]> = values.iter().map(|v| v.to_be_bytes()).collect();
        let mut planes = Vec::new();
        for b in 0..4 {
            for v in &be {
                planes.push(v[b]);
            }
        }
        let mut encoded = planes.clone();
        for i in (1..encoded.len()).rev() {
            encoded[i] = encoded[i].wrapping_sub(encoded[i - 1]);
        }

        let mut little = encoded.clone();
        undo_floating_point_differencing(&mut little, 4, 1, false);
        let decoded: Vec<f32> = little.chunks(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect();
        assert_eq!(decoded, values);

        let mut big = encoded;
        undo_floating_point_differencing(&mut big, 4, 1, true);
        let decoded: Vec<f32> = big.chunks(4).map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]])).collect();
        assert_eq!(decoded, values);
    }
}
