//! Big-endian field decoding.
//!
//! Every integer in the PDB family is stored big-endian, whatever the host.

use std::io::{self, Read, Seek, SeekFrom};

/// Big-endian integer reads for any byte stream.
pub trait ReadBe: Read {
    fn read_u8(&mut self) -> io::Result<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    fn read_u16_be(&mut self) -> io::Result<u16> {
        let mut b = [0u8; 2];
        self.read_exact(&mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    fn read_u32_be(&mut self) -> io::Result<u32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }
}

impl<R: Read + ?Sized> ReadBe for R {}

/// Seeks forward `count` bytes and returns the new position.
pub fn skip<S: Seek + ?Sized>(stream: &mut S, count: i64) -> io::Result<u64> {
    stream.seek(SeekFrom::Current(count))
}

/// Reads a big-endian u16 at `pos`, or `None` when the slice is too short.
pub fn be_u16(data: &[u8], pos: usize) -> Option<u16> {
    let bytes = data.get(pos..pos.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Reads a big-endian u32 at `pos`, or `None` when the slice is too short.
pub fn be_u32(data: &[u8], pos: usize) -> Option<u32> {
    let bytes = data.get(pos..pos.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
