use std::io::{self, Read, Seek};
use std::ops::Range;

use crate::error::{Error, Result};
use crate::io::{ReadBe, skip};

/// Bytes of fixed structural fields preceding the record list.
pub const STRUCTURAL_HEADER_LEN: u64 = 72;

/// Sub-format selected by the 8-byte type/creator tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// `DataPlkr`
    Plucker,
    /// `TEXtREAd`
    PalmDoc,
    /// `BOOKMOBI`
    Mobipocket,
}

impl ContainerKind {
    pub fn from_type_id(id: &[u8]) -> Option<Self> {
        if id == b"DataPlkr" {
            Some(ContainerKind::Plucker)
        } else if id == b"BOOKMOBI" {
            Some(ContainerKind::Mobipocket)
        } else if id.eq_ignore_ascii_case(b"TEXtREAd") {
            Some(ContainerKind::PalmDoc)
        } else {
            None
        }
    }

    /// Only Mobipocket record 0 carries an encryption field.
    pub fn signals_encryption(self) -> bool {
        self == ContainerKind::Mobipocket
    }
}

/// PDB header: name, flags, type tag and the record offset table.
///
/// Offsets are stored as read. They are trusted until used; walkers must
/// check monotonicity and bounds themselves.
#[derive(Debug, Clone)]
pub struct PdbHeader {
    pub name: String,
    pub flags: u16,
    /// Raw 8-byte type/creator tag, e.g. `BOOKMOBI`.
    pub type_id: [u8; 8],
    pub record_offsets: Vec<u32>,
}

impl PdbHeader {
    /// Parse the header from the current position of `reader`.
    ///
    /// On success the reader is positioned at the first byte after the
    /// record list.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        Self::read_inner(reader).map_err(|e| match e {
            Error::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof => {
                Error::Structural("container ends inside the PDB header".into())
            }
            other => other,
        })
    }

    fn read_inner<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let start = reader.stream_position()?;

        let mut name = [0u8; 32];
        reader.read_exact(&mut name)?;
        let name_end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        let name = String::from_utf8_lossy(&name[..name_end]).into_owned();

        let flags = reader.read_u16_be()?;

        // Attributes, version, dates, modification number and info ids.
        skip(reader, 26)?;

        let mut type_id = [0u8; 8];
        reader.read_exact(&mut type_id)?;

        // Unique id seed.
        let end = skip(reader, 4)?;
        if end != start + STRUCTURAL_HEADER_LEN {
            return Err(Error::Structural(format!(
                "header consumed {} bytes instead of {STRUCTURAL_HEADER_LEN}",
                end.saturating_sub(start)
            )));
        }

        // Next record list id.
        skip(reader, 4)?;
        let num_records = reader.read_u16_be()?;

        let mut record_offsets = Vec::with_capacity(num_records as usize);
        for _ in 0..num_records {
            record_offsets.push(reader.read_u32_be()?);
            // Record attributes and unique id.
            skip(reader, 4)?;
        }

        // Two bytes of padding before the first record; meaningless but always present.
        skip(reader, 2)?;

        Ok(Self {
            name,
            flags,
            type_id,
            record_offsets,
        })
    }

    pub fn kind(&self) -> Option<ContainerKind> {
        ContainerKind::from_type_id(&self.type_id)
    }

    pub fn type_id_str(&self) -> String {
        String::from_utf8_lossy(&self.type_id).into_owned()
    }

    pub fn num_records(&self) -> usize {
        self.record_offsets.len()
    }

    /// Offset where record `index` starts; indices past the table map to the
    /// end of the stream.
    pub fn record_offset(&self, index: usize, stream_len: u64) -> u64 {
        self.record_offsets
            .get(index)
            .map(|&o| u64::from(o))
            .unwrap_or(stream_len)
    }

    /// Byte range `[offsets[i], offsets[i+1])` of a record; the last record
    /// ends at `stream_len`. `None` for unknown indices or inverted ranges.
    pub fn record_range(&self, index: usize, stream_len: u64) -> Option<Range<u64>> {
        if index >= self.record_offsets.len() {
            return None;
        }
        let start = u64::from(self.record_offsets[index]);
        let end = self.record_offset(index + 1, stream_len);
        if end < start {
            return None;
        }
        Some(start..end)
    }
}
