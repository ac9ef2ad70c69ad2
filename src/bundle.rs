//! ZIP packaging of produced artifacts
//!
//! Writes plain ZIP archives: one local header per entry followed by its
//! DEFLATE payload, then the central directory and the end record. No
//! ZIP64, so entries and the archive itself stay below 4 GiB.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};
use log::{debug, info};

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

const VERSION: u16 = 20;
const METHOD_DEFLATE: u16 = 8;
// 1980-01-01 00:00, so archives of identical inputs are identical
const DOS_TIME: u16 = 0;
const DOS_DATE: u16 = 0x0021;

struct CentralEntry {
    name: String,
    crc: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    local_header_offset: u32,
}

fn to_u32(value: u64, what: &str) -> io::Result<u32> {
    u32::try_from(value).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("{} of {} bytes exceeds the ZIP limit", what, value))
    })
}

/// Streams entries into a ZIP archive
pub struct ArchiveWriter<W: Write> {
    writer: W,
    offset: u64,
    entries: Vec<CentralEntry>,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(writer: W) -> Self {
        ArchiveWriter { writer, offset: 0, entries: Vec::new() }
    }

    /// Names added so far, in order
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Compress `data` and append it under `name`
    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        if self.entries.iter().any(|e| e.name == name) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, format!("Duplicate archive entry {}", name)));
        }
        let name_len = u16::try_from(name.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Archive entry name too long"))?;

        let mut crc = Crc::new();
        crc.update(data);

        let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
        encoder.write_all(data)?;
        let compressed = encoder.finish()?;

        let entry = CentralEntry {
            name: name.to_string(),
            crc: crc.sum(),
            compressed_size: to_u32(compressed.len() as u64, "Compressed entry")?,
            uncompressed_size: to_u32(data.len() as u64, "Entry")?,
            local_header_offset: to_u32(self.offset, "Archive")?,
        };

        let w = &mut self.writer;
        w.write_u32::<LittleEndian>(LOCAL_HEADER_SIGNATURE)?;
        w.write_u16::<LittleEndian>(VERSION)?;
        w.write_u16::<LittleEndian>(0)?;
        w.write_u16::<LittleEndian>(METHOD_DEFLATE)?;
        w.write_u16::<LittleEndian>(DOS_TIME)?;
        w.write_u16::<LittleEndian>(DOS_DATE)?;
        w.write_u32::<LittleEndian>(entry.crc)?;
        w.write_u32::<LittleEndian>(entry.compressed_size)?;
        w.write_u32::<LittleEndian>(entry.uncompressed_size)?;
        w.write_u16::<LittleEndian>(name_len)?;
        w.write_u16::<LittleEndian>(0)?;
        w.write_all(name.as_bytes())?;
        w.write_all(&compressed)?;

        self.offset += 30 + name.len() as u64 + compressed.len() as u64;
        debug!("Archived {} ({} -> {} bytes)", name, data.len(), compressed.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Append a file under its own file name
    pub fn add_file(&mut self, path: &Path) -> io::Result<()> {
        let name = path.file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput,
                                          format!("No usable file name in {}", path.display())))?
            .to_string();
        let data = fs::read(path)?;
        self.add_entry(&name, &data)
    }

    /// Write the central directory and end record, returning the writer
    pub fn finish(mut self) -> io::Result<W> {
        let directory_offset = to_u32(self.offset, "Archive")?;
        let mut directory_size: u64 = 0;

        for entry in &self.entries {
            let w = &mut self.writer;
            w.write_u32::<LittleEndian>(CENTRAL_HEADER_SIGNATURE)?;
            w.write_u16::<LittleEndian>(VERSION)?;
            w.write_u16::<LittleEndian>(VERSION)?;
            w.write_u16::<LittleEndian>(0)?;
            w.write_u16::<LittleEndian>(METHOD_DEFLATE)?;
            w.write_u16::<LittleEndian>(DOS_TIME)?;
            w.write_u16::<LittleEndian>(DOS_DATE)?;
            w.write_u32::<LittleEndian>(entry.crc)?;
            w.write_u32::<LittleEndian>(entry.compressed_size)?;
            w.write_u32::<LittleEndian>(entry.uncompressed_size)?;
            w.write_u16::<LittleEndian>(entry.name.len() as u16)?;
            w.write_u16::<LittleEndian>(0)?;
            w.write_u16::<LittleEndian>(0)?;
            w.write_u16::<LittleEndian>(0)?;
            w.write_u16::<LittleEndian>(0)?;
            w.write_u32::<LittleEndian>(0)?;
            w.write_u32::<LittleEndian>(entry.local_header_offset)?;
            w.write_all(entry.name.as_bytes())?;
            directory_size += 46 + entry.name.len() as u64;
        }

        let count = u16::try_from(self.entries.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Too many archive entries"))?;
        let w = &mut self.writer;
        w.write_u32::<LittleEndian>(END_OF_CENTRAL_DIRECTORY_SIGNATURE)?;
        w.write_u16::<LittleEndian>(0)?;
        w.write_u16::<LittleEndian>(0)?;
        w.write_u16::<LittleEndian>(count)?;
        w.write_u16::<LittleEndian>(count)?;
        w.write_u32::<LittleEndian>(to_u32(directory_size, "Central directory")?)?;
        w.write_u32::<LittleEndian>(directory_offset)?;
        w.write_u16::<LittleEndian>(0)?;
        w.flush()?;

        Ok(self.writer)
    }
}

/// Bundle `files` into a new archive at `archive_path`
///
/// The archive is assembled next to its destination and renamed into place,
/// so a failure never leaves a truncated archive behind.
pub fn write_archive(archive_path: &Path, files: &[&Path]) -> io::Result<PathBuf> {
    if let Some(parent) = archive_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut partial = archive_path.as_os_str().to_os_string();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let result = File::create(&partial).and_then(|file| {
        let mut archive = ArchiveWriter::new(BufWriter::new(file));
        for path in files {
            archive.add_file(path)?;
        }
        archive.finish()?.into_inner().map_err(|e| e.into_error())?.sync_all()
    });

    match result.and_then(|_| fs::rename(&partial, archive_path)) {
        Ok(()) => {
            info!("Wrote archive {} with {} entries", archive_path.display(), files.len());
            Ok(archive_path.to_path_buf())
        },
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        },
    }
}
