//! PalmDOC LZ77 decompression
//!
//! The compression scheme is simple:
//! - Bytes 0x01-0x08: Copy next 'n' bytes literally
//! - Bytes 0x00, 0x09-0x7F: Literal character
//! - Bytes 0x80-0xBF: Back-reference (LZ77)
//!   - Combined with next byte: distance = (val & 0x3FFF) >> 3, length = (val & 7) + 3
//! - Bytes 0xC0-0xFF: Space + (byte ^ 0x80)

use crate::error::{Error, Result};

/// Decompress `input` into `output`, never growing it past `capacity`.
///
/// `output` is cleared first. Returns the number of bytes written.
pub fn decompress_into(input: &[u8], output: &mut Vec<u8>, capacity: usize) -> Result<usize> {
    output.clear();
    let mut i = 0;

    while i < input.len() {
        let c = input[i];
        i += 1;

        match c {
            1..=8 => {
                let count = (c as usize).min(input.len() - i);
                ensure_room(output, capacity, count)?;
                output.extend_from_slice(&input[i..i + count]);
                i += count;
            }
            0x00 | 0x09..=0x7F => {
                ensure_room(output, capacity, 1)?;
                output.push(c);
            }
            0xC0..=0xFF => {
                ensure_room(output, capacity, 2)?;
                output.push(b' ');
                output.push(c ^ 0x80);
            }
            _ => {
                let Some(&next) = input.get(i) else {
                    break;
                };
                i += 1;

                let combined = (u16::from(c) << 8) | u16::from(next);
                let distance = ((combined & 0x3FFF) >> 3) as usize;
                let length = ((combined & 7) + 3) as usize;

                if distance == 0 || distance > output.len() {
                    return Err(Error::Decompression(format!(
                        "back-reference distance {distance} outside {} decoded bytes",
                        output.len()
                    )));
                }
                ensure_room(output, capacity, length)?;
                // Overlapping copies repeat the freshly written bytes.
                for _ in 0..length {
                    let byte = output[output.len() - distance];
                    output.push(byte);
                }
            }
        }
    }

    Ok(output.len())
}

fn ensure_room(output: &[u8], capacity: usize, extra: usize) -> Result<()> {
    if output.len() + extra > capacity {
        return Err(Error::Decompression(format!(
            "PalmDOC record expands past {capacity} bytes"
        )));
    }
    Ok(())
}
