//! HUFF/CDIC decompression for Mobipocket text records.
//!
//! The first record of the dictionary section is the HUFF record holding the
//! canonical code tables; every following record is a CDIC record holding
//! phrase slices. Slices may themselves be compressed and are expanded the
//! first time they are referenced.

use crate::error::{Error, Result};
use crate::io::{be_u16, be_u32};

#[derive(Clone)]
enum Phrase {
    Leaf(Vec<u8>),
    Packed(Vec<u8>),
}

/// Longest phrase expansion chain tolerated before the dictionary is considered cyclic.
const MAX_DEPTH: usize = 32;

/// HUFF/CDIC decompressor, built once per document and reused for every text record.
pub struct HuffCdicReader {
    /// 256 entries of (codelen, term, maxcode) indexed by the top code byte.
    dict1: Vec<(u8, bool, u32)>,
    /// Minimum left-aligned code for each code length (index 0 unused).
    mincode: Vec<u32>,
    /// Maximum left-aligned code for each code length (index 0 unused).
    maxcode: Vec<u32>,
    dictionary: Vec<Phrase>,
}

impl HuffCdicReader {
    /// Create a reader from the HUFF record and the CDIC records that follow it.
    pub fn new(huff: &[u8], cdics: &[&[u8]]) -> Result<Self> {
        let mut reader = Self {
            dict1: Vec::with_capacity(256),
            mincode: Vec::with_capacity(33),
            maxcode: Vec::with_capacity(33),
            dictionary: Vec::new(),
        };

        reader.load_huff(huff)?;
        for cdic in cdics {
            reader.load_cdic(cdic)?;
        }

        Ok(reader)
    }

    fn load_huff(&mut self, huff: &[u8]) -> Result<()> {
        if huff.len() < 24 || &huff[0..8] != b"HUFF\x00\x00\x00\x18" {
            return Err(Error::UnsupportedCompression("invalid HUFF header".into()));
        }

        let truncated = || Error::UnsupportedCompression("HUFF tables truncated".into());
        let off1 = be_u32(huff, 8).ok_or_else(truncated)? as usize;
        let off2 = be_u32(huff, 12).ok_or_else(truncated)? as usize;

        for i in 0..256 {
            let v = be_u32(huff, off1 + i * 4).ok_or_else(truncated)?;
            let codelen = (v & 0x1f) as u8;
            let term = (v & 0x80) != 0;
            let maxcode = if codelen > 0 {
                ((v >> 8).wrapping_add(1) << (32 - u32::from(codelen))).wrapping_sub(1)
            } else {
                0
            };
            self.dict1.push((codelen, term, maxcode));
        }

        self.mincode.push(0);
        self.maxcode.push(0);
        for i in 0..32 {
            let min_raw = be_u32(huff, off2 + i * 8).ok_or_else(truncated)?;
            let max_raw = be_u32(huff, off2 + i * 8 + 4).ok_or_else(truncated)?;
            let shift = 32 - (i as u32 + 1);
            self.mincode.push(min_raw << shift);
            self.maxcode
                .push((max_raw.wrapping_add(1) << shift).wrapping_sub(1));
        }

        Ok(())
    }

    fn load_cdic(&mut self, cdic: &[u8]) -> Result<()> {
        if cdic.len() < 16 || &cdic[0..8] != b"CDIC\x00\x00\x00\x10" {
            return Err(Error::UnsupportedCompression("invalid CDIC header".into()));
        }

        let phrases = be_u32(cdic, 8).unwrap_or(0) as usize;
        let bits = be_u32(cdic, 12).unwrap_or(0).min(31);
        let n = (1usize << bits).min(phrases.saturating_sub(self.dictionary.len()));

        for i in 0..n {
            let off = be_u16(cdic, 16 + i * 2).ok_or_else(|| {
                Error::UnsupportedCompression("CDIC offset table truncated".into())
            })? as usize;
            let blen = be_u16(cdic, 16 + off)
                .ok_or_else(|| Error::UnsupportedCompression("CDIC entry truncated".into()))?;

            let start = 16 + off + 2;
            let end = (start + (blen & 0x7fff) as usize).min(cdic.len());
            let slice = cdic[start..end].to_vec();

            self.dictionary.push(if blen & 0x8000 != 0 {
                Phrase::Leaf(slice)
            } else {
                Phrase::Packed(slice)
            });
        }

        Ok(())
    }

    pub fn phrase_count(&self) -> usize {
        self.dictionary.len()
    }

    /// Decompress one text record into `output`, never growing it past `capacity`.
    pub fn decompress_into(
        &mut self,
        data: &[u8],
        output: &mut Vec<u8>,
        capacity: usize,
    ) -> Result<usize> {
        output.clear();
        self.unpack(data, output, capacity, 0)?;
        Ok(output.len())
    }

    fn unpack(
        &mut self,
        data: &[u8],
        output: &mut Vec<u8>,
        capacity: usize,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::Decompression("HUFF phrase nesting too deep".into()));
        }

        let mut bits_remaining = (data.len() * 8) as i64;
        let mut pos = 0usize;
        let mut x = read_u64_be(data, pos);
        let mut n: i32 = 32;

        while bits_remaining > 0 {
            if n <= 0 {
                pos += 4;
                x = read_u64_be(data, pos);
                n += 32;
            }

            let code = ((x >> n) & 0xFFFF_FFFF) as u32;

            let (mut codelen, term, mut maxcode) = self.dict1[(code >> 24) as usize];
            if !term {
                while codelen < 32 && code < self.mincode[codelen as usize] {
                    codelen += 1;
                }
                maxcode = self.maxcode[codelen as usize];
            }
            if codelen == 0 {
                return Err(Error::Decompression("zero-length HUFF code".into()));
            }

            n -= i32::from(codelen);
            bits_remaining -= i64::from(codelen);
            if bits_remaining < 0 {
                break;
            }

            let r = (maxcode.wrapping_sub(code) >> (32 - u32::from(codelen))) as usize;
            let phrase = self.dictionary.get(r).cloned().ok_or_else(|| {
                Error::Decompression(format!(
                    "dictionary index {r} out of bounds (len {})",
                    self.dictionary.len()
                ))
            })?;

            let expanded = match phrase {
                Phrase::Leaf(slice) => slice,
                Phrase::Packed(slice) => {
                    let mut unpacked = Vec::new();
                    self.unpack(&slice, &mut unpacked, capacity, depth + 1)?;
                    self.dictionary[r] = Phrase::Leaf(unpacked.clone());
                    unpacked
                }
            };

            if output.len() + expanded.len() > capacity {
                return Err(Error::Decompression(format!(
                    "HUFF record expands past {capacity} bytes"
                )));
            }
            output.extend_from_slice(&expanded);
        }

        Ok(())
    }
}

/// Reads 8 bytes big-endian, zero-padding past the end of `data`.
fn read_u64_be(data: &[u8], pos: usize) -> u64 {
    let mut bytes = [0u8; 8];
    if pos < data.len() {
        let available = (data.len() - pos).min(8);
        bytes[..available].copy_from_slice(&data[pos..pos + available]);
    }
    u64::from_be_bytes(bytes)
}
