use std::collections::HashMap;

use bstr::BString;
use encoding_rs::{Encoding, WINDOWS_1252};

use super::{DocumentBuilder, Image, ImageMap, TextKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphKind {
    Text,
    /// End of a section; carries no entries.
    SectionBoundary,
}

/// One recorded event inside a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Text(BString),
    Control { kind: TextKind, start: bool },
    Hyperlink { kind: TextKind, target: String },
    Image(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub kind: ParagraphKind,
    /// Innermost kind on the builder's kind stack when the paragraph began.
    pub style: Option<TextKind>,
    pub entries: Vec<Entry>,
}

impl Paragraph {
    fn new(kind: ParagraphKind, style: Option<TextKind>) -> Self {
        Self {
            kind,
            style,
            entries: Vec::new(),
        }
    }

    /// All text of the paragraph, undecoded.
    pub fn text_bytes(&self) -> BString {
        let mut text = BString::from(Vec::new());
        for entry in &self.entries {
            if let Entry::Text(bytes) = entry {
                text.extend_from_slice(bytes);
            }
        }
        text
    }

    pub fn decode(&self, encoding: &'static Encoding) -> String {
        let bytes = self.text_bytes();
        let (text, _, _) = encoding.decode(&bytes);
        text.into_owned()
    }
}

/// A [`DocumentBuilder`] that records every event.
#[derive(Debug)]
pub struct Document {
    pub paragraphs: Vec<Paragraph>,
    pub images: ImageMap,
    /// Hyperlink label → index of the first paragraph after it.
    pub labels: HashMap<String, usize>,
    /// Text collected between `enter_title` and `exit_title`.
    pub titles: Vec<BString>,
    encoding: &'static Encoding,
    kinds: Vec<TextKind>,
    open: Option<Paragraph>,
    title: Option<BString>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            paragraphs: Vec::new(),
            images: ImageMap::new(),
            labels: HashMap::new(),
            titles: Vec::new(),
            encoding: WINDOWS_1252,
            kinds: Vec::new(),
            open: None,
            title: None,
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Paragraphs holding text, images or controls (section boundaries excluded).
    pub fn text_paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.paragraphs
            .iter()
            .filter(|p| p.kind == ParagraphKind::Text)
    }

    /// Decoded text of every text paragraph, in order.
    pub fn texts(&self) -> Vec<String> {
        self.text_paragraphs()
            .map(|p| p.decode(self.encoding))
            .collect()
    }

    pub fn section_count(&self) -> usize {
        self.paragraphs
            .iter()
            .filter(|p| p.kind == ParagraphKind::SectionBoundary)
            .count()
    }

    pub fn image(&self, id: &str) -> Option<&Image> {
        self.images.get(id)
    }

    /// Closes a paragraph left open by an interrupted decode.
    pub fn finish(&mut self) {
        if let Some(paragraph) = self.open.take() {
            self.paragraphs.push(paragraph);
        }
    }

    fn push_entry(&mut self, entry: Entry) {
        if let Some(paragraph) = self.open.as_mut() {
            paragraph.entries.push(entry);
        }
    }
}

impl DocumentBuilder for Document {
    fn begin_paragraph(&mut self) {
        self.finish();
        self.open = Some(Paragraph::new(ParagraphKind::Text, self.kinds.last().copied()));
    }

    fn end_paragraph(&mut self) {
        self.finish();
    }

    fn add_text(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Some(title) = self.title.as_mut() {
            title.extend_from_slice(bytes);
        }
        let Some(paragraph) = self.open.as_mut() else {
            return;
        };
        match paragraph.entries.last_mut() {
            Some(Entry::Text(text)) => text.extend_from_slice(bytes),
            _ => paragraph.entries.push(Entry::Text(BString::from(bytes))),
        }
    }

    fn push_kind(&mut self, kind: TextKind) {
        self.kinds.push(kind);
    }

    fn pop_kind(&mut self) -> bool {
        self.kinds.pop().is_some()
    }

    fn add_control(&mut self, kind: TextKind, start: bool) {
        self.push_entry(Entry::Control { kind, start });
    }

    fn add_hyperlink_control(&mut self, kind: TextKind, target: &str) {
        self.push_entry(Entry::Hyperlink {
            kind,
            target: target.to_string(),
        });
    }

    fn enter_title(&mut self) {
        self.title = Some(BString::from(Vec::new()));
    }

    fn exit_title(&mut self) {
        if let Some(title) = self.title.take()
            && !title.is_empty()
        {
            self.titles.push(title);
        }
    }

    fn add_image(&mut self, id: &str, image: Image) {
        self.images.insert(id.to_string(), image);
    }

    fn add_image_reference(&mut self, id: &str) {
        self.push_entry(Entry::Image(id.to_string()));
    }

    fn add_hyperlink_label(&mut self, id: &str) {
        let index = self.paragraphs.len() + usize::from(self.open.is_some());
        self.labels.insert(id.to_string(), index);
    }

    fn insert_section_boundary(&mut self) {
        self.finish();
        self.paragraphs
            .push(Paragraph::new(ParagraphKind::SectionBoundary, None));
    }

    fn set_encoding(&mut self, encoding: &'static Encoding) {
        self.encoding = encoding;
    }
}
