//! Location of the records that follow the text records.

use std::ops::Range;

use log::debug;

use crate::io::ByteSource;
use crate::pdb::PdbHeader;

/// Detect image type from magic bytes.
///
/// Only the formats found in Palm e-books are recognised.
pub fn detect_image_type(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8]) {
        Some("image/jpeg")
    } else if data.starts_with(b"GIF8") {
        Some("image/gif")
    } else if data.starts_with(b"BM") {
        Some("image/bmp")
    } else {
        None
    }
}

/// Maps resource indices, counted from the first record after the text,
/// onto byte ranges of the container.
#[derive(Debug, Clone, Copy)]
pub struct ResourceLocator<'a> {
    header: &'a PdbHeader,
    max_text_index: usize,
    stream_len: u64,
}

impl<'a> ResourceLocator<'a> {
    pub fn new(header: &'a PdbHeader, max_text_index: usize, stream_len: u64) -> Self {
        Self {
            header,
            max_text_index,
            stream_len,
        }
    }

    pub fn max_text_index(&self) -> usize {
        self.max_text_index
    }

    /// Byte range of a record by its absolute index.
    pub fn record_byte_range(&self, index: usize) -> Option<Range<u64>> {
        self.header.record_range(index, self.stream_len)
    }

    /// Byte range of the `index`-th record after the last text record.
    pub fn image_location(&self, index: usize) -> Option<Range<u64>> {
        let absolute = self.max_text_index.checked_add(1)?.checked_add(index)?;
        self.record_byte_range(absolute)
    }

    /// Absolute index of the record holding resource `index`.
    pub fn absolute_index(&self, index: usize) -> usize {
        self.max_text_index + 1 + index
    }

    /// Scan forward from the first non-text record for one that starts like
    /// an image. The scan stops at the first empty or missing record.
    ///
    /// Returns the index relative to the first non-text record.
    pub fn first_image_record_index(&self, source: &dyn ByteSource) -> Option<usize> {
        let mut index = 0;
        while let Some(range) = self.image_location(index) {
            if range.is_empty() {
                break;
            }
            if range.end - range.start > 4 {
                let mut magic = [0u8; 4];
                if source.read_at_into(range.start, &mut magic).is_ok()
                    && detect_image_type(&magic).is_some()
                {
                    debug!("first image is resource {index}");
                    return Some(index);
                }
            }
            index += 1;
        }
        None
    }
}
