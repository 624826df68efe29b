//! Input abstractions: random-access byte sources, a seekable cursor over
//! them, and big-endian field decoding.

mod adapter;
mod be;
mod byte_source;

pub use adapter::ByteSourceCursor;
pub use be::{ReadBe, be_u16, be_u32, skip};
pub use byte_source::{ByteSource, FileSource, MemorySource};
