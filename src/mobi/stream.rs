//! Sequential decompression of PalmDoc/Mobipocket text records.

use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;

use log::debug;

use super::headers::Record0Header;
use super::resources::ResourceLocator;
use crate::compression::{Compression, Decompressor, HuffCdicReader};
use crate::error::{Error, Result};
use crate::pdb::{ContainerKind, PdbHeader};

/// Presents records `1..=max_record_index` as one byte stream.
///
/// Records are decompressed one at a time into a buffer sized by record 0's
/// maximum record size. The underlying reader only ever moves forward while
/// text is being read.
pub struct RecordStream<R> {
    input: R,
    header: PdbHeader,
    record0: Record0Header,
    decompressor: Decompressor,
    stream_len: u64,
    record_index: usize,
    max_record_index: usize,
    buffer: Vec<u8>,
    buffer_offset: usize,
    compressed: Vec<u8>,
}

impl<R: Read + Seek> RecordStream<R> {
    /// Read record 0 and prepare the decompressor.
    ///
    /// For HUFF/CDIC documents the dictionary records are loaded here; a
    /// dictionary range outside the record table, or one without any CDIC
    /// record, is reported as [`Error::UnsupportedCompression`].
    pub fn open(mut input: R, header: PdbHeader, kind: ContainerKind) -> Result<Self> {
        let stream_len = input.seek(SeekFrom::End(0))?;
        let range = header
            .record_range(0, stream_len)
            .ok_or_else(|| Error::Structural("container has no record 0".into()))?;
        let data = read_range(&mut input, range.clone())?;
        let record0 = Record0Header::parse(&data, kind)?;
        debug!(
            "record 0: {:?}, {} text records of at most {} bytes",
            record0.compression, record0.text_record_count, record0.max_record_size
        );

        let decompressor = match record0.compression {
            Compression::Huffman => {
                let reader = load_huffcdic(&mut input, &header, &record0, stream_len)?;
                // Resume right after record 0.
                input.seek(SeekFrom::Start(range.end))?;
                Decompressor::huffman(reader)
            }
            compression => Decompressor::new(compression),
        }
        .with_extra_flags(record0.extra_data_flags);

        let max_record_index = usize::from(record0.text_record_count)
            .min(header.num_records().saturating_sub(1));
        let capacity = usize::from(record0.max_record_size);

        Ok(Self {
            input,
            header,
            record0,
            decompressor,
            stream_len,
            record_index: 0,
            max_record_index,
            buffer: Vec::with_capacity(capacity),
            buffer_offset: 0,
            compressed: Vec::new(),
        })
    }

    /// Make sure unread bytes are buffered, decompressing the next record if
    /// needed. Returns false once every text record has been consumed.
    pub fn fill_buffer(&mut self) -> Result<bool> {
        while self.buffer_offset == self.buffer.len() {
            if self.record_index >= self.max_record_index {
                return Ok(false);
            }
            self.record_index += 1;
            self.process_record()?;
        }
        Ok(true)
    }

    /// The unread part of the current record, marked as consumed.
    pub fn next_chunk(&mut self) -> Result<Option<&[u8]>> {
        if !self.fill_buffer()? {
            return Ok(None);
        }
        let start = self.buffer_offset;
        self.buffer_offset = self.buffer.len();
        Ok(Some(&self.buffer[start..]))
    }

    fn process_record(&mut self) -> Result<()> {
        let index = self.record_index;
        let start = self.header.record_offset(index, self.stream_len);
        let position = self.input.stream_position()?;
        if start < position {
            return Err(Error::Structural(format!(
                "record {index} starts at {start}, behind position {position}"
            )));
        }
        let end = self.header.record_offset(index + 1, self.stream_len);
        if end < start {
            return Err(Error::Structural(format!(
                "record {index} ends at {end}, before its start {start}"
            )));
        }
        if end > self.stream_len {
            return Err(Error::Structural(format!(
                "record {index} ends at {end}, past the container end {}",
                self.stream_len
            )));
        }

        self.input.seek(SeekFrom::Start(start))?;
        self.compressed.resize((end - start) as usize, 0);
        self.input.read_exact(&mut self.compressed)?;

        let capacity = usize::from(self.record0.max_record_size);
        let produced = self
            .decompressor
            .decompress(&self.compressed, &mut self.buffer, capacity)?;
        debug!(
            "text record {index}: {} -> {produced} bytes",
            self.compressed.len()
        );
        self.buffer_offset = 0;
        Ok(())
    }

    pub fn record0(&self) -> &Record0Header {
        &self.record0
    }

    pub fn header(&self) -> &PdbHeader {
        &self.header
    }

    /// Index of the record currently buffered; 0 before the first read.
    pub fn record_index(&self) -> usize {
        self.record_index
    }

    /// Index of the last text record.
    pub fn max_record_index(&self) -> usize {
        self.max_record_index
    }

    pub fn record_byte_range(&self, index: usize) -> Option<Range<u64>> {
        self.header.record_range(index, self.stream_len)
    }

    /// Locator for the records following the text.
    pub fn resources(&self) -> ResourceLocator<'_> {
        ResourceLocator::new(&self.header, self.max_record_index, self.stream_len)
    }
}

impl<R: Read + Seek> Read for RecordStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let filled = self.fill_buffer().map_err(|e| match e {
            Error::Io(io) => io,
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        })?;
        if !filled {
            return Ok(0);
        }
        let available = &self.buffer[self.buffer_offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.buffer_offset += n;
        Ok(n)
    }
}

fn read_range<R: Read + Seek>(input: &mut R, range: Range<u64>) -> Result<Vec<u8>> {
    input.seek(SeekFrom::Start(range.start))?;
    let mut data = vec![0u8; (range.end - range.start) as usize];
    input.read_exact(&mut data)?;
    Ok(data)
}

/// Load the HUFF record and the CDIC records that follow it.
fn load_huffcdic<R: Read + Seek>(
    input: &mut R,
    header: &PdbHeader,
    record0: &Record0Header,
    stream_len: u64,
) -> Result<HuffCdicReader> {
    let first = record0.huff_record_index as usize;
    let count = record0.huff_record_count as usize;
    if count <= 1 || first.saturating_add(count) > header.num_records() {
        return Err(Error::UnsupportedCompression(format!(
            "HUFF/CDIC records {first}+{count} do not fit {} records",
            header.num_records()
        )));
    }

    let mut records = Vec::with_capacity(count);
    for index in first..first + count {
        let range = header.record_range(index, stream_len).ok_or_else(|| {
            Error::UnsupportedCompression(format!("HUFF/CDIC record {index} has no valid range"))
        })?;
        records.push(read_range(input, range)?);
    }
    let cdics: Vec<&[u8]> = records[1..].iter().map(Vec::as_slice).collect();
    HuffCdicReader::new(&records[0], &cdics)
}
