//! Plucker record walker.

use std::io::{Seek, SeekFrom};
use std::ops::Range;

use encoding_rs::WINDOWS_1252;
use log::{debug, info, warn};

use super::markup::MarkupInterpreter;
use crate::compression::{Compression, Decompressor};
use crate::error::{Error, Result};
use crate::io::{ByteSourceCursor, be_u16};
use crate::model::{DocumentBuilder, Image, MultiImage, RecordImage, RecordImageEncoding};
use crate::options::ReadOptions;
use crate::pdb::PdbHeader;

/// Uncompressed sizes are 16-bit, so one buffer of this size fits any record.
const RECORD_BUFFER_SIZE: usize = u16::MAX as usize;

/// Bytes of the per-record header: uid, paragraphs, size, type, flags.
const RECORD_HEADER_LEN: usize = 8;

/// uid of the index record announcing the document compression.
const INDEX_RECORD_UID: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordType {
    Text,
    CompressedText,
    Image,
    CompressedImage,
    Metadata,
    MultiImage,
    Other(u8),
}

impl From<u8> for RecordType {
    fn from(value: u8) -> Self {
        match value {
            0 => RecordType::Text,
            1 => RecordType::CompressedText,
            2 => RecordType::Image,
            3 => RecordType::CompressedImage,
            10 => RecordType::Metadata,
            15 => RecordType::MultiImage,
            n => RecordType::Other(n),
        }
    }
}

struct RecordHeader {
    uid: u16,
    paragraphs: u16,
    size: u16,
    kind: RecordType,
    flags: u8,
}

/// Reads a Plucker document record by record into a [`DocumentBuilder`].
pub struct PluckerReader<'a> {
    cursor: ByteSourceCursor,
    header: &'a PdbHeader,
    options: &'a ReadOptions,
    decompressor: Decompressor,
    interpreter: MarkupInterpreter,
    /// Decompressed text of the current record.
    buffer: Vec<u8>,
    /// Raw bytes of the current record.
    record: Vec<u8>,
}

impl<'a> PluckerReader<'a> {
    /// `cursor` must be positioned right after the PDB header.
    pub fn new(cursor: ByteSourceCursor, header: &'a PdbHeader, options: &'a ReadOptions) -> Self {
        Self {
            cursor,
            header,
            options,
            decompressor: Decompressor::new(Compression::Zlib),
            interpreter: MarkupInterpreter::new(),
            buffer: Vec::with_capacity(RECORD_BUFFER_SIZE),
            record: Vec::new(),
        }
    }

    /// Walk the records in offset order.
    ///
    /// The walk stops, keeping what was emitted, as soon as an offset lies
    /// behind the current position or past the end of the container.
    pub fn read_document(&mut self, builder: &mut dyn DocumentBuilder) -> Result<()> {
        builder.set_encoding(WINDOWS_1252);
        let len = self.cursor.len();
        info!(
            "reading Plucker document '{}' with {} records",
            self.header.name,
            self.header.num_records()
        );

        for index in 0..self.header.num_records() {
            let offset = self.header.record_offset(index, len);
            let current = self.cursor.stream_position()?;
            if current > offset || offset > len {
                warn!("record {index} at offset {offset} is unreachable from {current}; stopping");
                break;
            }
            let end = self.header.record_offset(index + 1, len).min(len);
            let Some(size) = end.checked_sub(offset) else {
                warn!("record {index} ends before it starts; stopping");
                break;
            };

            // Each record is parsed from its own bytes and never reads into the next.
            let mut record = std::mem::take(&mut self.record);
            record.resize(size as usize, 0);
            self.cursor.source().read_at_into(offset, &mut record)?;
            self.cursor.seek(SeekFrom::Start(end))?;

            let result = self.read_record(&record, offset, builder);
            self.record = record;
            match result {
                Ok(()) => {}
                Err(e) if e.is_record_local() => warn!("skipping record {index}: {e}"),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn read_record(
        &mut self,
        data: &[u8],
        offset: u64,
        builder: &mut dyn DocumentBuilder,
    ) -> Result<()> {
        let size = data.len();
        let (Some(uid), Some(word)) = (be_u16(data, 0), be_u16(data, 2)) else {
            return Err(Error::TruncatedRecord(format!("{size}-byte record")));
        };
        if uid == INDEX_RECORD_UID {
            let compression = Compression::from_plucker_version(word);
            debug!("index record version {word}: {compression:?}");
            self.decompressor = Decompressor::new(compression);
            return Ok(());
        }
        if size < RECORD_HEADER_LEN {
            return Err(Error::TruncatedRecord(format!(
                "record {uid} is only {size} bytes"
            )));
        }

        let record = RecordHeader {
            uid,
            paragraphs: word,
            size: u16::from_be_bytes([data[4], data[5]]),
            kind: RecordType::from(data[6]),
            flags: data[7],
        };
        debug!(
            "record {}: {:?}, {} bytes, {} paragraphs",
            record.uid, record.kind, record.size, record.paragraphs
        );
        let body = &data[RECORD_HEADER_LEN..];

        match record.kind {
            RecordType::Text | RecordType::CompressedText => {
                let result = self.read_text_record(&record, body, builder);
                if record.flags & 0x1 == 0 && self.options.section_breaks {
                    builder.insert_section_boundary();
                }
                result
            }
            RecordType::Image | RecordType::CompressedImage => {
                let start = offset + RECORD_HEADER_LEN as u64;
                self.register_image(&record, start..offset + size as u64, builder);
                Ok(())
            }
            RecordType::Metadata => {
                let type_code = be_u16(body, 0).ok_or_else(|| {
                    Error::TruncatedRecord(format!("metadata record {} has no type", record.uid))
                })?;
                debug!("metadata record {} of type {type_code}", record.uid);
                Ok(())
            }
            RecordType::MultiImage => self.register_multi_image(&record, body, builder),
            RecordType::Other(kind) => {
                debug!("skipping record {} of type {kind}", record.uid);
                Ok(())
            }
        }
    }

    fn read_text_record(
        &mut self,
        record: &RecordHeader,
        body: &[u8],
        builder: &mut dyn DocumentBuilder,
    ) -> Result<()> {
        let table_len = 4 * usize::from(record.paragraphs);
        if table_len > body.len() {
            return Err(Error::TruncatedRecord(format!(
                "record {} paragraph table exceeds the record",
                record.uid
            )));
        }
        let (table, payload) = body.split_at(table_len);
        // Each entry is a length followed by paragraph attributes.
        let lengths: Vec<u16> = table
            .chunks_exact(4)
            .map(|entry| u16::from_be_bytes([entry[0], entry[1]]))
            .collect();

        builder.add_hyperlink_label(&record.uid.to_string());

        let expected = usize::from(record.size);
        let produced = if record.kind == RecordType::CompressedText {
            self.decompressor
                .decompress(payload, &mut self.buffer, RECORD_BUFFER_SIZE)?
        } else {
            self.buffer.clear();
            self.buffer.extend_from_slice(payload);
            self.buffer.len()
        };
        if produced != expected {
            return Err(Error::TruncatedRecord(format!(
                "record {} decoded to {produced} bytes, expected {expected}",
                record.uid
            )));
        }

        self.interpreter
            .process_record(&mut self.buffer, &lengths, builder)
    }

    fn register_image(
        &self,
        record: &RecordHeader,
        range: Range<u64>,
        builder: &mut dyn DocumentBuilder,
    ) {
        let encoding = match (record.kind, self.decompressor.compression()) {
            (RecordType::Image, _) => RecordImageEncoding::Raw,
            (_, Compression::PalmDoc) => RecordImageEncoding::PalmDoc,
            _ => RecordImageEncoding::Zlib,
        };
        let image = RecordImage::new(self.cursor.source().clone(), range, "image/palm", encoding);
        builder.add_image(&record.uid.to_string(), Image::Record(image));
    }

    fn register_multi_image(
        &self,
        record: &RecordHeader,
        body: &[u8],
        builder: &mut dyn DocumentBuilder,
    ) -> Result<()> {
        let (Some(columns), Some(rows)) = (be_u16(body, 0), be_u16(body, 2)) else {
            return Err(Error::TruncatedRecord(format!(
                "multi-image record {} has no grid size",
                record.uid
            )));
        };
        let declared = (usize::from(record.size) / 2).saturating_sub(2);
        let ids = &body[4..];
        if declared * 2 > ids.len() {
            debug!(
                "multi-image record {} declares {declared} ids but holds {}",
                record.uid,
                ids.len() / 2
            );
        }
        let mut image = MultiImage::new(rows, columns);
        for id in ids.chunks_exact(2).take(declared) {
            image.add_id(u16::from_be_bytes([id[0], id[1]]).to_string());
        }
        builder.add_image(&record.uid.to_string(), Image::Multi(image));
        Ok(())
    }
}
