use super::byte_source::ByteSource;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

/// Wraps an `Arc<dyn ByteSource>` into a stateful `Read + Seek` stream.
///
/// Sequential parsers (header, Plucker records, record stream) consume this
/// cursor while image handles share the same source for later random reads.
pub struct ByteSourceCursor {
    inner: Arc<dyn ByteSource>,
    position: u64,
}

impl ByteSourceCursor {
    pub fn new(inner: Arc<dyn ByteSource>) -> Self {
        Self { inner, position: 0 }
    }

    /// Size of the underlying source.
    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn source(&self) -> &Arc<dyn ByteSource> {
        &self.inner
    }
}

impl Read for ByteSourceCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let total_len = self.inner.len();
        if self.position >= total_len {
            return Ok(0);
        }
        let count = (total_len - self.position).min(buf.len() as u64) as usize;
        let read = self.inner.read_at_into(self.position, &mut buf[..count])?;
        self.position += read as u64;
        Ok(read)
    }
}

impl Seek for ByteSourceCursor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let total_len = self.inner.len() as i64;
        let current = self.position as i64;

        let new_pos = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::End(p) => total_len + p,
            SeekFrom::Current(p) => current + p,
        };

        if new_pos < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "Seek before 0"));
        }

        self.position = new_pos as u64;
        Ok(self.position)
    }
}
