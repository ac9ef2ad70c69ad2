//! TIFF file reader implementation
//!
//! Parses the header and IFD chain of a TIFF/BigTIFF file and provides
//! typed access to tag values. Pixel data is decoded separately by
//! `raster::band_reader`, which reuses this reader for tag lookups.

use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use crate::io::seekable::{self, SeekableReader};
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::tiff::constants::{field_types, header};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;
use crate::tiff::validation;
use crate::utils::{string_utils, tag_utils};

/// Upper bound on the IFD chain length, guards against offset loops
const MAX_IFDS: usize = 100;

/// Reader for TIFF and BigTIFF files
pub struct TiffReader {
    /// Current byte order handler
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Whether currently reading BigTIFF format
    is_big_tiff: bool,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    /// Creates a new TIFF reader
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            is_big_tiff: false,
        }
    }

    /// Returns the byte order handler once the header has been read
    pub fn handler(&self) -> TiffResult<&dyn ByteOrderHandler> {
        self.byte_order_handler.as_deref()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Returns whether the current file is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Loads a TIFF file from the given path
    ///
    /// # Arguments
    /// * `path` - Path to the TIFF file to load
    ///
    /// # Returns
    /// The parsed directory chain
    pub fn load(&mut self, path: &Path) -> TiffResult<TIFF> {
        info!("Loading TIFF file: {}", path.display());
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);

        self.read(&mut reader)
    }

    /// Reads a TIFF file from the given reader
    ///
    /// 1. Detect byte order (little/big endian)
    /// 2. Check for TIFF or BigTIFF format
    /// 3. Read all IFDs (Image File Directories)
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<TIFF> {
        reader.seek(SeekFrom::Start(0))?;

        let byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", byte_order.name());
        let handler = byte_order.create_handler();

        let version = handler.read_u16(reader)?;
        self.is_big_tiff = match version {
            header::BIG_TIFF_VERSION => {
                validation::validate_bigtiff_header(reader, handler.as_ref())?;
                true
            },
            header::TIFF_VERSION => false,
            _ => return Err(TiffError::UnsupportedVersion(version)),
        };
        debug!("TIFF version {} ({})", version, if self.is_big_tiff { "BigTIFF" } else { "classic" });

        let first_ifd_offset = self.read_offset(reader, handler.as_ref())?;
        let file_size = seekable::stream_len(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        self.byte_order_handler = Some(handler);

        let mut tiff = TIFF::new(self.is_big_tiff, byte_order);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        if tiff.ifds.is_empty() {
            return Err(TiffError::InvalidHeader);
        }

        info!("Read {} IFDs from TIFF file", tiff.ifds.len());
        Ok(tiff)
    }

    /// Reads a 4- or 8-byte offset depending on the format
    fn read_offset(&self, reader: &mut dyn SeekableReader, handler: &dyn ByteOrderHandler) -> TiffResult<u64> {
        if self.is_big_tiff {
            Ok(handler.read_u64(reader)?)
        } else {
            Ok(handler.read_u32(reader)? as u64)
        }
    }

    /// Reads the chain of IFDs starting from the given offset
    ///
    /// A broken link after the first IFD ends the chain with a warning;
    /// only the first directory is required to be readable.
    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64, file_size: u64) -> TiffResult<Vec<IFD>> {
        let handler = self.handler()?;
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < MAX_IFDS {
            if ifd_offset >= file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain", ifd_offset, file_size);
                break;
            }

            let ifd = match self.read_ifd(reader, ifd_offset, ifds.len()) {
                Ok(ifd) => ifd,
                Err(e) if !ifds.is_empty() => {
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                },
                Err(e) => return Err(e),
            };

            // The reader sits right after the last entry, on the next-IFD link
            let next_ifd_offset = match self.read_offset(reader, handler) {
                Ok(offset) => offset,
                Err(e) => {
                    warn!("Error reading next IFD offset: {}", e);
                    ifds.push(ifd);
                    break;
                }
            };

            ifds.push(ifd);

            if next_ifd_offset != 0 && (next_ifd_offset >= file_size || next_ifd_offset < 8) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next_ifd_offset);
                break;
            }
            ifd_offset = next_ifd_offset;
        }

        Ok(ifds)
    }

    /// Reads an IFD located at `offset`
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> TiffResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;
        let handler = self.handler()?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };
        debug!("IFD #{} at {} has {} entries", number, offset, entry_count);

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            let entry = self.read_ifd_entry(reader, handler)?;
            ifd.add_entry(entry);
        }

        Ok(ifd)
    }

    /// Reads a single IFD entry
    ///
    /// Single inline values are decoded in the file's byte order so that
    /// `IFD::get_tag_value` is correct for SHORT tags in big-endian files.
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader, handler: &dyn ByteOrderHandler) -> TiffResult<IFDEntry> {
        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let field_len = if self.is_big_tiff { 8 } else { 4 };
        let mut value_bytes = [0u8; 8];
        reader.read_exact(&mut value_bytes[..field_len])?;

        let mut entry = IFDEntry::from_raw(tag, field_type, count, 0, value_bytes);
        let mut field = Cursor::new(&value_bytes[..field_len]);
        entry.value_offset = if entry.is_value_inline(self.is_big_tiff) && count == 1 {
            match field_type {
                field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED | field_types::ASCII => value_bytes[0] as u64,
                field_types::SHORT | field_types::SSHORT => handler.read_u16(&mut field)? as u64,
                field_types::LONG | field_types::SLONG | field_types::FLOAT | field_types::IFD => handler.read_u32(&mut field)? as u64,
                _ => handler.read_u64(&mut field)?,
            }
        } else if self.is_big_tiff {
            handler.read_u64(&mut field)?
        } else {
            handler.read_u32(&mut field)? as u64
        };

        Ok(entry)
    }

    /// Positions a reader over an entry's values and runs `read` against it
    fn with_entry_values<T>(
        &self,
        reader: &mut dyn SeekableReader,
        entry: &IFDEntry,
        read: impl FnOnce(&mut dyn SeekableReader, &dyn ByteOrderHandler) -> TiffResult<T>,
    ) -> TiffResult<T> {
        let handler = self.handler()?;
        if entry.is_value_inline(self.is_big_tiff) {
            let field_len = if self.is_big_tiff { 8 } else { 4 };
            let mut inline = Cursor::new(&entry.value_bytes[..field_len]);
            read(&mut inline, handler)
        } else {
            let file_size = seekable::stream_len(reader)?;
            let len = entry.count.saturating_mul(entry.get_field_type_size() as u64);
            validation::validate_data_range(entry.value_offset, len, file_size, tag_utils::get_tag_name(entry.tag))?;
            reader.seek(SeekFrom::Start(entry.value_offset))?;
            read(reader, handler)
        }
    }

    /// Reads a tag's values as a vector of u64
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        self.with_entry_values(reader, entry, |r, handler| {
            let mut values = Vec::with_capacity(entry.count as usize);
            tag_utils::read_tag_value_array(r, entry, handler, &mut values)?;
            Ok(values)
        })
    }

    /// Reads a tag's values as a vector of f64
    pub fn read_tag_doubles(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<f64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        self.with_entry_values(reader, entry, |r, handler| {
            let mut values = Vec::with_capacity(entry.count as usize);
            tag_utils::read_tag_double_array(r, entry, handler, &mut values)?;
            Ok(values)
        })
    }

    /// Reads an ASCII tag, with trailing NULs removed
    pub fn read_tag_ascii(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<String> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        self.with_entry_values(reader, entry, |r, _| {
            let mut buffer = vec![0u8; entry.count as usize];
            r.read_exact(&mut buffer)?;
            string_utils::trim_trailing_nulls(&mut buffer);

            String::from_utf8(buffer)
                .map_err(|e| TiffError::GenericError(format!("Invalid UTF-8 string: {}", e)))
        })
    }
}
