use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::compression::Compression;
use crate::error::{Error, Result};
use crate::io::{be_u16, be_u32};
use crate::pdb::ContainerKind;

pub const NULL_INDEX: u32 = 0xFFFFFFFF;

/// Record 0 of a PalmDoc or Mobipocket document.
///
/// The first 16 bytes are the PalmDoc header shared by both formats; the
/// remaining fields come from the optional `MOBI` header that follows.
#[derive(Debug, Clone)]
pub struct Record0Header {
    pub compression: Compression,
    /// Total uncompressed text length.
    pub text_length: u32,
    pub text_record_count: u16,
    /// Upper bound on the uncompressed size of one text record.
    pub max_record_size: u16,
    pub encryption: u16,
    /// Length of the `MOBI` header, 0 when absent.
    pub header_length: u32,
    pub codepage: u32,
    pub first_image_index: u32,
    // HUFF/CDIC indices (for Huffman compression)
    pub huff_record_index: u32,
    pub huff_record_count: u32,
    pub extra_data_flags: u16,
}

impl Record0Header {
    /// Parse record 0 of a container of the given kind.
    ///
    /// Fails on an unknown compression mode, a zero record size, or (for
    /// kinds that carry the field) a set encryption flag.
    pub fn parse(data: &[u8], kind: ContainerKind) -> Result<Self> {
        if data.len() < 14 {
            return Err(Error::Structural(format!(
                "record 0 is only {} bytes",
                data.len()
            )));
        }

        let compression = Compression::from_record0(u16::from_be_bytes([data[0], data[1]]))?;
        let text_length = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let text_record_count = u16::from_be_bytes([data[8], data[9]]);
        let max_record_size = u16::from_be_bytes([data[10], data[11]]);
        if max_record_size == 0 {
            return Err(Error::Structural("record 0 declares a zero record size".into()));
        }

        let encryption = if kind.signals_encryption() {
            u16::from_be_bytes([data[12], data[13]])
        } else {
            0
        };
        if encryption != 0 {
            return Err(Error::Encrypted);
        }

        let has_mobi_header = data.get(16..20) == Some(b"MOBI".as_slice());
        let header_length = if has_mobi_header {
            be_u32(data, 20).unwrap_or(0)
        } else {
            0
        };
        let codepage = if has_mobi_header {
            be_u32(data, 28).unwrap_or(1252)
        } else {
            1252
        };
        let first_image_index = if has_mobi_header {
            be_u32(data, 0x6C).unwrap_or(NULL_INDEX)
        } else {
            NULL_INDEX
        };

        // HUFF/CDIC indices at 0x70 and 0x74
        let (huff_record_index, huff_record_count) = match (be_u32(data, 0x70), be_u32(data, 0x74)) {
            (Some(index), Some(count)) => (index, count),
            _ => (NULL_INDEX, 0),
        };

        let extra_data_flags = if header_length >= 0xE4 {
            be_u16(data, 0xF2).unwrap_or(0)
        } else {
            0
        };

        Ok(Self {
            compression,
            text_length,
            text_record_count,
            max_record_size,
            encryption,
            header_length,
            codepage,
            first_image_index,
            huff_record_index,
            huff_record_count,
            extra_data_flags,
        })
    }

    /// Encoding of the text records; anything but UTF-8 is read as cp1252.
    pub fn text_encoding(&self) -> &'static Encoding {
        match self.codepage {
            65001 => UTF_8,
            _ => WINDOWS_1252,
        }
    }

    pub fn first_image_index(&self) -> Option<usize> {
        (self.first_image_index != NULL_INDEX).then_some(self.first_image_index as usize)
    }
}
