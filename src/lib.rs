//! # pdbook
//!
//! A reader for Palm e-book containers: PalmDoc, Mobipocket and Plucker.
//!
//! ## Features
//!
//! - Parse the PDB header and record offset table
//! - Decompress text records (PalmDOC LZ77, HUFF/CDIC, zlib)
//! - Interpret Plucker paragraph markup and the Mobipocket HTML dialect
//! - Locate image records for lazy loading
//!
//! Decoders never build a book themselves; they drive a [`DocumentBuilder`].
//! [`Document`] records every event and is what most callers want.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdbook::{Document, read_document};
//!
//! let mut doc = Document::new();
//! if read_document("book.pdb", &mut doc) {
//!     for text in doc.texts() {
//!         println!("{text}");
//!     }
//! }
//! ```
//!
//! A failed read keeps whatever was decoded before the failure:
//!
//! ```no_run
//! use pdbook::{Document, ReadOptions, try_read_document};
//!
//! let mut doc = Document::new();
//! let options = ReadOptions::new().with_section_breaks(false);
//! if let Err(e) = try_read_document("book.prc", &mut doc, &options) {
//!     eprintln!("{}: {e}", e.user_message());
//! }
//! println!("{} paragraphs", doc.paragraphs.len());
//! ```

pub mod compression;
pub mod error;
pub mod io;
pub mod mobi;
pub mod model;
pub mod options;
pub mod pdb;
pub mod plucker;

use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

pub use error::{Error, FailureReason, Result};
pub use io::{ByteSource, FileSource, MemorySource};
pub use model::{Document, DocumentBuilder, Image, ImageMap, MultiImage, TextKind};
pub use options::ReadOptions;
pub use pdb::{ContainerKind, PdbHeader};

/// Read the container at `path` into `sink` with default options.
///
/// Returns false if decoding failed; the reason is logged. Content emitted
/// before the failure stays in `sink`.
pub fn read_document<P: AsRef<Path>>(path: P, sink: &mut dyn DocumentBuilder) -> bool {
    let path = path.as_ref();
    match try_read_document(path, sink, &ReadOptions::default()) {
        Ok(()) => true,
        Err(e) => {
            warn!("failed to read {}: {e}", path.display());
            false
        }
    }
}

/// Read the container at `path` into `sink`.
pub fn try_read_document<P: AsRef<Path>>(
    path: P,
    sink: &mut dyn DocumentBuilder,
    options: &ReadOptions,
) -> Result<()> {
    let source = FileSource::open(path)?;
    read_document_from_source(Arc::new(source), sink, options)
}

/// Read a container from any [`ByteSource`].
///
/// Image handles registered in `sink` keep a reference to `source`.
pub fn read_document_from_source(
    source: Arc<dyn ByteSource>,
    sink: &mut dyn DocumentBuilder,
    options: &ReadOptions,
) -> Result<()> {
    let mut cursor = io::ByteSourceCursor::new(source);
    let header = PdbHeader::read(&mut cursor)?;
    let kind = header.kind().ok_or_else(|| {
        Error::UnsupportedFormat(format!("unknown type tag '{}'", header.type_id_str()))
    })?;
    debug!(
        "'{}': {kind:?} container with {} records",
        header.name,
        header.num_records()
    );

    match kind {
        ContainerKind::Plucker => {
            plucker::PluckerReader::new(cursor, &header, options).read_document(sink)
        }
        ContainerKind::PalmDoc | ContainerKind::Mobipocket => {
            mobi::read_document(cursor, header, kind, options, sink)
        }
    }
}
