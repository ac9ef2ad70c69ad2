//! Handler for TIFF LZW compressed data
//!
//! TIFF LZW codes are packed MSB-first, start at 9 bits and widen one
//! code early (when the next free code reaches `2^width - 1`), up to 12 bits.

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;

const CLEAR_CODE: u16 = 256;
const EOI_CODE: u16 = 257;
const FIRST_FREE: u16 = 258;
const MAX_CODES: usize = 4096;

/// LZW decoder (compression code 5)
pub struct LzwHandler;

/// MSB-first bit reader over a strip
struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    buffer: u32,
    bits: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        BitReader { data, position: 0, buffer: 0, bits: 0 }
    }

    fn read(&mut self, width: u32) -> Option<u16> {
        while self.bits < width {
            let byte = *self.data.get(self.position)?;
            self.position += 1;
            self.buffer = (self.buffer << 8) | byte as u32;
            self.bits += 8;
        }
        self.bits -= width;
        let code = (self.buffer >> self.bits) & ((1 << width) - 1);
        Some(code as u16)
    }
}

/// String table stored as prefix chains
struct Table {
    prefix: Vec<u16>,
    suffix: Vec<u8>,
    first: Vec<u8>,
    len: Vec<u32>,
    next: u16,
}

impl Table {
    fn new() -> Self {
        let mut table = Table {
            prefix: vec![0; MAX_CODES],
            suffix: vec![0; MAX_CODES],
            first: vec![0; MAX_CODES],
            len: vec![0; MAX_CODES],
            next: FIRST_FREE,
        };
        for byte in 0..256usize {
            table.suffix[byte] = byte as u8;
            table.first[byte] = byte as u8;
            table.len[byte] = 1;
        }
        table
    }

    fn reset(&mut self) {
        self.next = FIRST_FREE;
    }

    fn push(&mut self, prefix: u16, byte: u8) {
        let slot = self.next as usize;
        if slot >= MAX_CODES {
            return;
        }
        self.prefix[slot] = prefix;
        self.suffix[slot] = byte;
        self.first[slot] = self.first[prefix as usize];
        self.len[slot] = self.len[prefix as usize] + 1;
        self.next += 1;
    }

    fn emit(&self, code: u16, out: &mut Vec<u8>) {
        let len = self.len[code as usize] as usize;
        let start = out.len();
        out.resize(start + len, 0);
        let mut current = code as usize;
        for i in (0..len).rev() {
            out[start + i] = self.suffix[current];
            current = self.prefix[current] as usize;
        }
    }
}

impl CompressionHandler for LzwHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() * 2);
        let mut bits = BitReader::new(data);
        let mut table = Table::new();
        let mut width = 9u32;
        let mut previous: Option<u16> = None;

        while let Some(code) = bits.read(width) {
            if code == CLEAR_CODE {
                table.reset();
                width = 9;
                previous = None;
                continue;
            }
            if code == EOI_CODE {
                break;
            }

            match previous {
                None => {
                    if code > 255 {
                        return Err(TiffError::CorruptData(format!("LZW stream starts with code {}", code)));
                    }
                    table.emit(code, &mut out);
                },
                Some(prev) => {
                    let first = if code < table.next {
                        table.first[code as usize]
                    } else if code == table.next {
                        table.first[prev as usize]
                    } else {
                        return Err(TiffError::CorruptData(format!(
                            "LZW code {} ahead of table size {}", code, table.next
                        )));
                    };
                    table.push(prev, first);
                    table.emit(code, &mut out);
                },
            }
            previous = Some(code);

            if table.next as u32 + 1 >= (1 << width) && width < 12 {
                width += 1;
            }
        }

        Ok(out)
    }

    fn compress(&self, _data: &[u8]) -> TiffResult<Vec<u8>> {
        Err(TiffError::UnsupportedCompression(compression::LZW as u64))
    }

    fn name(&self) -> &'static str {
        "LZW"
    }

    fn code(&self) -> u64 {
        compression::LZW as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_codes(codes: &[(u16, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buffer: u64 = 0;
        let mut bits = 0u32;
        for &(code, width) in codes {
            buffer = (buffer << width) | code as u64;
            bits += width;
            while bits >= 8 {
                bits -= 8;
                out.push((buffer >> bits) as u8);
            }
        }
        if bits > 0 {
            out.push((buffer << (8 - bits)) as u8);
        }
        out
    }

    #[test]
    fn test_decodes_repeated_pair() {
        let stream = pack_codes(&[(CLEAR_CODE, 9), (65, 9), (66, 9), (258, 9), (EOI_CODE, 9)]);
        let decoded = LzwHandler.decompress(&stream).unwrap();
        assert_eq!(decoded, b"ABAB");
    }

    #[test]
    fn test_decodes_code_defined_by_itself() {
        // 258 is referenced in the same step that defines it ("AA")
        let stream = pack_codes(&[(CLEAR_CODE, 9), (65, 9), (258, 9), (EOI_CODE, 9)]);
        let decoded = LzwHandler.decompress(&stream).unwrap();
        assert_eq!(decoded, b"AAA");
    }

    #[test]
    fn test_rejects_code_ahead_of_table() {
        let stream = pack_codes(&[(CLEAR_CODE, 9), (65, 9), (300, 9), (EOI_CODE, 9)]);
        assert!(LzwHandler.decompress(&stream).is_err());
    }
}
