//! Document model boundary.
//!
//! Decoders never build a book structure themselves; they drive a
//! [`DocumentBuilder`]. [`Document`] is a builder that simply records what
//! it is told, which is what tests and simple consumers want.

mod document;
mod image;

pub use document::{Document, Entry, Paragraph, ParagraphKind};
pub use image::{Image, ImageMap, MultiImage, RecordImage, RecordImageEncoding};

use encoding_rs::Encoding;

/// Style and structure kinds carried by controls and the paragraph kind stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    Regular,
    SectionTitle,
    Strong,
    Emphasis,
    Code,
    Sub,
    Sup,
    Hyperlink,
    LeftAligned,
    RightAligned,
    CenterAligned,
    JustifyAligned,
}

/// Capability through which decoders emit document events.
pub trait DocumentBuilder {
    fn begin_paragraph(&mut self);

    fn end_paragraph(&mut self);

    /// Append raw text bytes to the open paragraph.
    fn add_text(&mut self, bytes: &[u8]);

    fn push_kind(&mut self, kind: TextKind);

    /// Pop the innermost kind; returns false when the stack was already empty.
    fn pop_kind(&mut self) -> bool;

    /// Open (`start == true`) or close a style span.
    fn add_control(&mut self, kind: TextKind, start: bool);

    fn add_hyperlink_control(&mut self, kind: TextKind, target: &str);

    fn enter_title(&mut self);

    fn exit_title(&mut self);

    /// Register an image resource under `id`.
    fn add_image(&mut self, id: &str, image: Image);

    /// Reference a registered image from the current position.
    fn add_image_reference(&mut self, id: &str);

    /// Mark the current position as the target of hyperlinks to `id`.
    fn add_hyperlink_label(&mut self, id: &str);

    fn insert_section_boundary(&mut self);

    /// Text encoding of the bytes passed to [`add_text`](Self::add_text).
    fn set_encoding(&mut self, _encoding: &'static Encoding) {}
}
