//! Builders for synthetic PDB containers.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use tempfile::NamedTempFile;

pub const NULL_INDEX: u32 = 0xFFFFFFFF;

/// Header bytes for a container holding `count` records.
fn header_len(count: usize) -> usize {
    72 + 4 + 2 + 8 * count + 2
}

/// Lay out `records` after a PDB header.
pub fn pdb(name: &str, type_id: &[u8; 8], records: &[Vec<u8>]) -> Vec<u8> {
    let mut data = vec![0u8; 32];
    data[..name.len()].copy_from_slice(name.as_bytes());
    data.extend_from_slice(&0u16.to_be_bytes());
    data.extend_from_slice(&[0u8; 26]);
    data.extend_from_slice(type_id);
    data.extend_from_slice(&[0u8; 4]);
    data.extend_from_slice(&[0u8; 4]);
    data.extend_from_slice(&(records.len() as u16).to_be_bytes());

    let mut offset = header_len(records.len()) as u32;
    for (i, record) in records.iter().enumerate() {
        data.extend_from_slice(&offset.to_be_bytes());
        data.extend_from_slice(&(i as u32).to_be_bytes());
        offset += record.len() as u32;
    }
    data.extend_from_slice(&[0u8; 2]);

    for record in records {
        data.extend_from_slice(record);
    }
    data
}

pub fn write_temp(data: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(data).expect("Failed to write container");
    file.flush().expect("Failed to flush container");
    file
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

// ----------------------------------------------------------------------------
// Plucker
// ----------------------------------------------------------------------------

/// Index record announcing the document compression (1 = PalmDOC, 2 = zlib).
pub fn plucker_index(version: u16) -> Vec<u8> {
    let mut record = Vec::new();
    record.extend_from_slice(&1u16.to_be_bytes());
    record.extend_from_slice(&version.to_be_bytes());
    record.extend_from_slice(&[0u8; 4]);
    record
}

fn plucker_header(uid: u16, paragraphs: u16, size: u16, kind: u8, flags: u8) -> Vec<u8> {
    let mut record = Vec::new();
    record.extend_from_slice(&uid.to_be_bytes());
    record.extend_from_slice(&paragraphs.to_be_bytes());
    record.extend_from_slice(&size.to_be_bytes());
    record.push(kind);
    record.push(flags);
    record
}

/// A text record; `payload` is stored as given, `lengths` form the paragraph table.
pub fn plucker_text_with(
    uid: u16,
    lengths: &[u16],
    size: u16,
    compressed: bool,
    flags: u8,
    payload: &[u8],
) -> Vec<u8> {
    let kind = if compressed { 1 } else { 0 };
    let mut record = plucker_header(uid, lengths.len() as u16, size, kind, flags);
    for &len in lengths {
        record.extend_from_slice(&len.to_be_bytes());
        record.extend_from_slice(&0u16.to_be_bytes());
    }
    record.extend_from_slice(payload);
    record
}

/// A zlib-compressed text record with one table entry per paragraph.
pub fn plucker_text(uid: u16, paragraphs: &[&[u8]], flags: u8) -> Vec<u8> {
    let body = paragraphs.concat();
    let lengths: Vec<u16> = paragraphs.iter().map(|p| p.len() as u16).collect();
    plucker_text_with(uid, &lengths, body.len() as u16, true, flags, &zlib(&body))
}

/// An uncompressed image record.
pub fn plucker_image(uid: u16, data: &[u8]) -> Vec<u8> {
    let mut record = plucker_header(uid, 0, (8 + data.len()) as u16, 2, 0);
    record.extend_from_slice(data);
    record
}

/// A multi-image record laying out `ids` in a `rows` x `columns` grid.
pub fn plucker_multi_image(uid: u16, rows: u16, columns: u16, ids: &[u16]) -> Vec<u8> {
    let size = (2 * (2 + ids.len())) as u16;
    let mut record = plucker_header(uid, 0, size, 15, 0);
    record.extend_from_slice(&columns.to_be_bytes());
    record.extend_from_slice(&rows.to_be_bytes());
    for id in ids {
        record.extend_from_slice(&id.to_be_bytes());
    }
    record
}

// ----------------------------------------------------------------------------
// PalmDoc / Mobipocket
// ----------------------------------------------------------------------------

/// Record 0 without a MOBI header.
pub fn palmdoc_record0(compression: u16, text_records: u16, max_size: u16) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&compression.to_be_bytes());
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(&(u32::from(text_records) * u32::from(max_size)).to_be_bytes());
    data.extend_from_slice(&text_records.to_be_bytes());
    data.extend_from_slice(&max_size.to_be_bytes());
    data.extend_from_slice(&[0, 0, 0, 0]);
    data
}

/// Record 0 with a MOBI header carrying the given image index and extra flags.
pub fn mobi_record0(
    compression: u16,
    text_records: u16,
    max_size: u16,
    first_image: u32,
    extra_flags: u16,
) -> Vec<u8> {
    let mut data = palmdoc_record0(compression, text_records, max_size);
    data.resize(0xF4, 0);
    data[16..20].copy_from_slice(b"MOBI");
    data[20..24].copy_from_slice(&0xE4u32.to_be_bytes());
    data[28..32].copy_from_slice(&1252u32.to_be_bytes());
    data[0x6C..0x70].copy_from_slice(&first_image.to_be_bytes());
    data[0x70..0x74].copy_from_slice(&NULL_INDEX.to_be_bytes());
    data[0xF2..0xF4].copy_from_slice(&extra_flags.to_be_bytes());
    data
}

pub const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00";
pub const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF";
