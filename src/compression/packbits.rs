//! Handler for PackBits run-length encoded data

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;

/// PackBits handler (compression code 32773)
pub struct PackBitsHandler;

impl CompressionHandler for PackBitsHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() * 2);
        let mut i = 0;

        while i < data.len() {
            let header = data[i] as i8;
            i += 1;
            match header {
                0..=127 => {
                    let run = header as usize + 1;
                    let literal = data.get(i..i + run).ok_or_else(|| {
                        TiffError::CorruptData("PackBits literal run past end of strip".to_string())
                    })?;
                    out.extend_from_slice(literal);
                    i += run;
                },
                -127..=-1 => {
                    let byte = *data.get(i).ok_or_else(|| {
                        TiffError::CorruptData("PackBits repeat run past end of strip".to_string())
                    })?;
                    let run = 1 - header as isize;
                    out.extend(std::iter::repeat(byte).take(run as usize));
                    i += 1;
                },
                // -128 is a no-op
                _ => {},
            }
        }

        Ok(out)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() + data.len() / 128 + 1);
        let mut i = 0;

        while i < data.len() {
            let mut run = 1;
            while i + run < data.len() && run < 128 && data[i + run] == data[i] {
                run += 1;
            }

            if run >= 3 {
                out.push((1 - run as isize) as i8 as u8);
                out.push(data[i]);
                i += run;
                continue;
            }

            let start = i;
            while i < data.len() && i - start < 128 {
                if i + 2 < data.len() && data[i] == data[i + 1] && data[i] == data[i + 2] {
                    break;
                }
                i += 1;
            }
            out.push((i - start - 1) as u8);
            out.extend_from_slice(&data[start..i]);
        }

        Ok(out)
    }

    fn name(&self) -> &'static str {
        "PackBits"
    }

    fn code(&self) -> u64 {
        compression::PACKBITS as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_mixed_runs() {
        // Apple's reference sequence from the TIFF 6.0 specification
        let packed = [0xFE, 0xAA, 0x02, 0x80, 0x00, 0x2A, 0xFD, 0xAA, 0x03, 0x80, 0x00, 0x2A, 0x22, 0xF7, 0xAA];
        let expected = [
            0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0xAA, 0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0x22,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        ];
        assert_eq!(PackBitsHandler.decompress(&packed).unwrap(), expected);
    }

    #[test]
    fn test_encoder_output_decodes() {
        let data: Vec<u8> = [vec![7u8; 200], (0..50).collect(), vec![1, 1, 2]].concat();
        let packed = PackBitsHandler.compress(&data).unwrap();
        assert_eq!(PackBitsHandler.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_truncated_literal_is_error() {
        assert!(PackBitsHandler.decompress(&[0x05, 0x01]).is_err());
    }
}
