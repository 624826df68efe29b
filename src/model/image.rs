use std::collections::HashMap;
use std::fmt;
use std::io;
use std::ops::Range;
use std::sync::Arc;

use crate::compression::{inflate_into, palmdoc};
use crate::io::ByteSource;

/// Images registered by a document, keyed by their textual id.
pub type ImageMap = HashMap<String, Image>;

/// An image resource. Decoding the raster data is left to the consumer.
#[derive(Debug, Clone)]
pub enum Image {
    Record(RecordImage),
    Multi(MultiImage),
}

impl Image {
    pub fn as_record(&self) -> Option<&RecordImage> {
        match self {
            Image::Record(image) => Some(image),
            Image::Multi(_) => None,
        }
    }

    pub fn as_multi(&self) -> Option<&MultiImage> {
        match self {
            Image::Multi(image) => Some(image),
            Image::Record(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordImageEncoding {
    /// Bytes are the image file as-is.
    Raw,
    /// Bytes are a zlib stream wrapping the image.
    Zlib,
    /// Bytes are PalmDOC-compressed.
    PalmDoc,
}

/// An image stored in a container record, read only when asked for.
#[derive(Clone)]
pub struct RecordImage {
    source: Arc<dyn ByteSource>,
    range: Range<u64>,
    media_type: &'static str,
    encoding: RecordImageEncoding,
}

impl fmt::Debug for RecordImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordImage")
            .field("range", &self.range)
            .field("media_type", &self.media_type)
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// Upper bound on a decompressed Palm image.
const MAX_INFLATED_IMAGE: usize = 1 << 20;

impl RecordImage {
    pub fn new(
        source: Arc<dyn ByteSource>,
        range: Range<u64>,
        media_type: &'static str,
        encoding: RecordImageEncoding,
    ) -> Self {
        Self {
            source,
            range,
            media_type,
            encoding,
        }
    }

    pub fn range(&self) -> Range<u64> {
        self.range.clone()
    }

    pub fn media_type(&self) -> &'static str {
        self.media_type
    }

    pub fn encoding(&self) -> RecordImageEncoding {
        self.encoding
    }

    /// Read (and inflate, if needed) the image bytes.
    pub fn data(&self) -> io::Result<Vec<u8>> {
        let raw = self.source.read_range(self.range.clone())?;
        match self.encoding {
            RecordImageEncoding::Raw => Ok(raw),
            RecordImageEncoding::Zlib => {
                let mut out = Vec::new();
                inflate_into(&raw, &mut out, MAX_INFLATED_IMAGE).map_err(invalid_data)?;
                Ok(out)
            }
            RecordImageEncoding::PalmDoc => {
                let mut out = Vec::new();
                palmdoc::decompress_into(&raw, &mut out, MAX_INFLATED_IMAGE)
                    .map_err(invalid_data)?;
                Ok(out)
            }
        }
    }
}

fn invalid_data(e: crate::error::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

/// A grid of sub-images chosen by (row, column).
///
/// Sub-images are referenced by id and resolved against the document's
/// [`ImageMap`] at lookup time, so they may be registered after the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiImage {
    rows: u16,
    columns: u16,
    ids: Vec<String>,
}

impl MultiImage {
    pub fn new(rows: u16, columns: u16) -> Self {
        Self {
            rows,
            columns,
            ids: Vec::new(),
        }
    }

    pub fn add_id(&mut self, id: impl Into<String>) {
        self.ids.push(id.into());
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Id stored for a grid cell, if the id table reaches that far.
    pub fn sub_image_id(&self, row: u16, column: u16) -> Option<&str> {
        let index = usize::from(row) * usize::from(self.columns) + usize::from(column);
        self.ids.get(index).map(String::as_str)
    }

    /// Resolve a grid cell to a registered image.
    pub fn sub_image<'a>(&self, row: u16, column: u16, images: &'a ImageMap) -> Option<&'a Image> {
        images.get(self.sub_image_id(row, column)?)
    }
}
