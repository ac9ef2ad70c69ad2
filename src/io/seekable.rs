//! Seekable reader trait
//!
//! Every TIFF structure is addressed by absolute offsets, so the container
//! readers work against anything that can both read and seek: an open file,
//! or an in-memory cursor in tests.

use std::io::{Read, Seek, SeekFrom};

/// Trait for readers that can both read and seek
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}

/// Total length of the stream, leaving the current position untouched
///
/// Offsets read from a file are only trusted after they have been
/// checked against this length.
pub fn stream_len(reader: &mut dyn SeekableReader) -> std::io::Result<u64> {
    let position = reader.stream_position()?;
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(position))?;
    Ok(len)
}
