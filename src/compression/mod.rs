//! Record decompression.
//!
//! Every text record of a container is compressed independently with the
//! document's [`Compression`] mode. [`Decompressor`] dispatches one record at
//! a time into a caller-owned buffer whose capacity is fixed up front.

mod huffcdic;
pub mod palmdoc;

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::{Error, Result};

pub use huffcdic::HuffCdicReader;

/// Compression mode of a document's text records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    PalmDoc,
    /// HUFF/CDIC ("DH")
    Huffman,
    /// zlib, used by Plucker documents.
    Zlib,
}

impl Compression {
    /// Mode stored in the first field of PalmDoc/Mobipocket record 0.
    pub fn from_record0(value: u16) -> Result<Self> {
        match value {
            1 => Ok(Compression::None),
            2 => Ok(Compression::PalmDoc),
            0x4448 => Ok(Compression::Huffman),
            n => Err(Error::UnsupportedCompression(format!(
                "unknown compression mode {n}"
            ))),
        }
    }

    /// Mode announced by the version field of a Plucker index record.
    pub fn from_plucker_version(version: u16) -> Self {
        match version {
            1 => Compression::PalmDoc,
            _ => Compression::Zlib,
        }
    }
}

/// Decompresses records of one document.
///
/// The HUFF/CDIC tables are built once and shared by every record.
pub struct Decompressor {
    compression: Compression,
    huff: Option<HuffCdicReader>,
    extra_flags: u16,
}

impl Decompressor {
    pub fn new(compression: Compression) -> Self {
        Self {
            compression,
            huff: None,
            extra_flags: 0,
        }
    }

    pub fn huffman(reader: HuffCdicReader) -> Self {
        Self {
            compression: Compression::Huffman,
            huff: Some(reader),
            extra_flags: 0,
        }
    }

    /// Trailing per-record entries (Mobipocket extra data flags) to strip before decoding.
    pub fn with_extra_flags(mut self, extra_flags: u16) -> Self {
        self.extra_flags = extra_flags;
        self
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Decompress `source` into `dest`, which is cleared first and never
    /// grows past `capacity`. Returns the number of bytes written.
    ///
    /// A failure leaves earlier records untouched; `dest` content is unspecified.
    pub fn decompress(&mut self, source: &[u8], dest: &mut Vec<u8>, capacity: usize) -> Result<usize> {
        let source = strip_trailing_entries(source, self.extra_flags);
        match self.compression {
            Compression::None => {
                dest.clear();
                let len = source.len().min(capacity);
                dest.extend_from_slice(&source[..len]);
                Ok(len)
            }
            Compression::PalmDoc => palmdoc::decompress_into(source, dest, capacity),
            Compression::Huffman => match self.huff.as_mut() {
                Some(reader) => reader.decompress_into(source, dest, capacity),
                None => Err(Error::UnsupportedCompression(
                    "HUFF/CDIC tables were not loaded".into(),
                )),
            },
            Compression::Zlib => inflate_into(source, dest, capacity),
        }
    }
}

/// Inflate a zlib stream into `dest`, failing if it expands past `capacity`.
pub fn inflate_into(source: &[u8], dest: &mut Vec<u8>, capacity: usize) -> Result<usize> {
    dest.clear();
    let mut decoder = ZlibDecoder::new(source).take(capacity as u64 + 1);
    decoder
        .read_to_end(dest)
        .map_err(|e| Error::Decompression(format!("zlib: {e}")))?;
    if dest.len() > capacity {
        return Err(Error::Decompression(format!(
            "zlib record expands past {capacity} bytes"
        )));
    }
    Ok(dest.len())
}

/// Strip trailing multibyte extra data from a Mobipocket text record.
///
/// Bits 1-15 of `flags` each announce a trailing entry whose size is stored
/// as a backward variable-width integer at the end of the record. Bit 0
/// announces multibyte overlap bytes and is processed last.
pub fn strip_trailing_entries(record: &[u8], flags: u16) -> &[u8] {
    if flags == 0 || record.is_empty() {
        return record;
    }

    let mut end = record.len();

    let mut shifted_flags = flags >> 1;
    while shifted_flags != 0 {
        if shifted_flags & 1 != 0 {
            if end == 0 {
                break;
            }
            // Low 7 bits carry the value; a set high bit marks the first byte.
            let mut size = 0usize;
            let mut shift = 0;
            let mut pos = end;
            while pos > 0 {
                pos -= 1;
                let byte = record[pos];
                size |= ((byte & 0x7F) as usize) << shift;
                shift += 7;
                if byte & 0x80 != 0 || shift >= 28 {
                    break;
                }
            }
            if size > 0 && size <= end {
                end -= size;
            }
        }
        shifted_flags >>= 1;
    }

    if flags & 1 != 0 && end > 0 {
        let overlap = (record[end - 1] & 3) as usize + 1;
        if overlap <= end {
            end -= overlap;
        }
    }

    &record[..end]
}

#[cfg(test)]
pub(crate) use huffcdic::tests::{cdic as test_cdic, identity_huff as test_identity_huff};

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression as Level;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    #[test]
    fn test_compression_modes() {
        assert_eq!(Compression::from_record0(1).unwrap(), Compression::None);
        assert_eq!(Compression::from_record0(2).unwrap(), Compression::PalmDoc);
        assert_eq!(Compression::from_record0(17480).unwrap(), Compression::Huffman);
        assert!(matches!(
            Compression::from_record0(3),
            Err(Error::UnsupportedCompression(_))
        ));
        assert_eq!(Compression::from_plucker_version(1), Compression::PalmDoc);
        assert_eq!(Compression::from_plucker_version(2), Compression::Zlib);
    }

    #[test]
    fn test_none_copies_up_to_capacity() {
        let mut out = Vec::new();
        let mut d = Decompressor::new(Compression::None);
        assert_eq!(d.decompress(b"abcdef", &mut out, 4).unwrap(), 4);
        assert_eq!(out, b"abcd");
        assert_eq!(d.decompress(b"xy", &mut out, 4).unwrap(), 2);
        assert_eq!(out, b"xy");
    }

    #[test]
    fn test_zlib_roundtrip_and_overflow() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Level::default());
        encoder.write_all(b"plucker text record").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut out = Vec::new();
        let mut d = Decompressor::new(Compression::Zlib);
        assert_eq!(d.decompress(&compressed, &mut out, 64).unwrap(), 19);
        assert_eq!(out, b"plucker text record");

        assert!(d.decompress(&compressed, &mut out, 10).is_err());
        assert!(d.decompress(b"not zlib", &mut out, 64).is_err());
    }

    #[test]
    fn test_huffman_without_tables_fails() {
        let mut out = Vec::new();
        let mut d = Decompressor::new(Compression::Huffman);
        assert!(d.decompress(&[0xFF], &mut out, 16).is_err());
    }

    #[test]
    fn test_strip_trailing_entries() {
        // One trailing entry of size 3 (including its own size byte 0x83).
        let record = [b'a', b'b', b'c', 0xAA, 0xBB, 0x83];
        assert_eq!(strip_trailing_entries(&record, 0b10), b"abc");

        // Multibyte overlap: low two bits + 1 bytes.
        let record = [b'a', b'b', 0x01];
        assert_eq!(strip_trailing_entries(&record, 0b1), b"a");

        assert_eq!(strip_trailing_entries(b"plain", 0), b"plain");
    }
}
