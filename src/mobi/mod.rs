//! PalmDoc and Mobipocket documents.
//!
//! Both formats share the record 0 layout and the text record stream;
//! Mobipocket adds an HTML-like markup and image records after the text.

mod headers;
mod resources;
mod stream;
mod text;

use std::sync::Arc;

use log::{debug, info, warn};

pub use headers::{NULL_INDEX, Record0Header};
pub use resources::{ResourceLocator, detect_image_type};
pub use stream::RecordStream;
pub use text::TextExtractor;

use crate::error::Result;
use crate::io::{ByteSource, ByteSourceCursor};
use crate::model::{DocumentBuilder, Image, RecordImage, RecordImageEncoding};
use crate::options::ReadOptions;
use crate::pdb::{ContainerKind, PdbHeader};

/// Decode a PalmDoc or Mobipocket container into `builder`.
///
/// A text record that fails to decompress ends the text; what was emitted
/// before it stays in the builder and the error is returned.
pub fn read_document(
    cursor: ByteSourceCursor,
    header: PdbHeader,
    kind: ContainerKind,
    options: &ReadOptions,
    builder: &mut dyn DocumentBuilder,
) -> Result<()> {
    let source = cursor.source().clone();
    let mut stream = RecordStream::open(cursor, header, kind)?;
    let encoding = stream.record0().text_encoding();
    builder.set_encoding(encoding);
    info!(
        "reading {kind:?} document '{}' with {} text records",
        stream.header().name,
        stream.max_record_index()
    );

    if kind == ContainerKind::Mobipocket {
        register_images(&stream.resources(), stream.record0(), &source, options, builder);
    }

    let markup = kind == ContainerKind::Mobipocket && options.mobi_markup;
    let mut extractor = TextExtractor::new(builder, encoding, markup, options.section_breaks);
    let result = loop {
        match stream.next_chunk() {
            Ok(Some(chunk)) => extractor.feed(chunk),
            Ok(None) => break Ok(()),
            Err(e) => {
                warn!("text ends at record {}: {e}", stream.record_index());
                break Err(e);
            }
        }
    };
    extractor.finish();
    result
}

/// Register every image record from the first image on, under its 1-based
/// position as used by `recindex` references.
fn register_images(
    locator: &ResourceLocator<'_>,
    record0: &Record0Header,
    source: &Arc<dyn ByteSource>,
    options: &ReadOptions,
    builder: &mut dyn DocumentBuilder,
) {
    let first = match record0.first_image_index() {
        Some(index) if index > locator.max_text_index() => index,
        _ if options.sniff_images => {
            match locator.first_image_record_index(&**source) {
                Some(relative) => locator.absolute_index(relative),
                None => return,
            }
        }
        _ => return,
    };

    let mut registered = 0;
    for index in first.. {
        let Some(range) = locator.record_byte_range(index) else {
            break;
        };
        let len = (range.end - range.start).min(4) as usize;
        let Ok(magic) = source.read_at(range.start, len) else {
            break;
        };
        if let Some(media_type) = detect_image_type(&magic) {
            let image = RecordImage::new(source.clone(), range, media_type, RecordImageEncoding::Raw);
            builder.add_image(&(index - first + 1).to_string(), Image::Record(image));
            registered += 1;
        }
    }
    debug!("registered {registered} images from record {first}");
}
