//! Paragraph extraction from the decompressed text stream.
//!
//! PalmDoc text is plain: every line is a paragraph. Mobipocket text is a
//! small HTML dialect; only the tags that map onto builder events are
//! interpreted and the rest are dropped. Input arrives one record at a time,
//! so tags and entities may be split across calls to [`TextExtractor::feed`].

use bstr::ByteSlice;
use encoding_rs::Encoding;
use log::debug;
use memchr::{memchr, memchr2};

use crate::model::{DocumentBuilder, TextKind};

/// Longest entity name looked for after `&`.
const MAX_ENTITY_LEN: usize = 10;

/// A `<` with no `>` within this many bytes is literal text.
const MAX_TAG_LEN: usize = 1024;

/// Controls seen before the paragraph they apply to has opened.
#[derive(Debug)]
enum Pending {
    Control(TextKind, bool),
    Link(String),
}

pub struct TextExtractor<'b> {
    builder: &'b mut dyn DocumentBuilder,
    encoding: &'static Encoding,
    markup: bool,
    section_breaks: bool,
    paragraph_open: bool,
    title_open: bool,
    link_open: bool,
    pending: Vec<Pending>,
    /// Text not yet handed to the builder.
    text: Vec<u8>,
    /// Collapsed whitespace waiting for the next visible byte.
    space: bool,
    tag: Option<Vec<u8>>,
    entity: Option<Vec<u8>>,
}

impl<'b> TextExtractor<'b> {
    /// With `markup` unset the input is treated as plain text lines.
    pub fn new(
        builder: &'b mut dyn DocumentBuilder,
        encoding: &'static Encoding,
        markup: bool,
        section_breaks: bool,
    ) -> Self {
        Self {
            builder,
            encoding,
            markup,
            section_breaks,
            paragraph_open: false,
            title_open: false,
            link_open: false,
            pending: Vec::new(),
            text: Vec::new(),
            space: false,
            tag: None,
            entity: None,
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        if self.markup {
            self.feed_markup(chunk);
        } else {
            self.feed_plain(chunk);
        }
    }

    /// Flush buffered text and close whatever is still open.
    pub fn finish(&mut self) {
        while let Some(tag) = self.tag.take() {
            debug!("unterminated tag at end of text kept as text");
            self.push_text(b"<");
            self.feed_markup(&tag);
        }
        if let Some(name) = self.entity.take() {
            self.push_text(b"&");
            self.push_text(&name);
        }
        self.break_paragraph();
        self.close_title();
    }

    fn feed_plain(&mut self, chunk: &[u8]) {
        let mut rest = chunk;
        while let Some(i) = memchr2(b'\n', b'\r', rest) {
            self.text.extend_from_slice(&rest[..i]);
            if rest[i] == b'\n' {
                self.break_paragraph();
            }
            rest = &rest[i + 1..];
        }
        self.text.extend_from_slice(rest);
    }

    fn feed_markup(&mut self, chunk: &[u8]) {
        let mut rest = chunk;
        while !rest.is_empty() {
            if self.tag.is_some() {
                rest = self.consume_tag(rest);
            } else if self.entity.is_some() {
                rest = self.consume_entity(rest);
            } else {
                match memchr2(b'<', b'&', rest) {
                    Some(i) => {
                        self.push_text(&rest[..i]);
                        if rest[i] == b'<' {
                            self.tag = Some(Vec::new());
                        } else {
                            self.entity = Some(Vec::new());
                        }
                        rest = &rest[i + 1..];
                    }
                    None => {
                        self.push_text(rest);
                        rest = &[];
                    }
                }
            }
        }
    }

    fn consume_tag<'c>(&mut self, rest: &'c [u8]) -> &'c [u8] {
        let room = MAX_TAG_LEN.saturating_sub(self.tag.as_ref().map_or(0, Vec::len));
        let window = &rest[..rest.len().min(room + 1)];
        match memchr(b'>', window) {
            Some(i) => {
                if let Some(mut tag) = self.tag.take() {
                    tag.extend_from_slice(&rest[..i]);
                    self.handle_tag(&tag);
                }
                &rest[i + 1..]
            }
            None if window.len() > room => {
                // Too long for a tag: re-read what followed the '<' as text.
                if let Some(tag) = self.tag.take() {
                    self.push_text(b"<");
                    self.feed_markup(&tag);
                }
                rest
            }
            None => {
                if let Some(tag) = self.tag.as_mut() {
                    tag.extend_from_slice(rest);
                }
                &rest[rest.len()..]
            }
        }
    }

    fn consume_entity<'c>(&mut self, rest: &'c [u8]) -> &'c [u8] {
        for (i, &b) in rest.iter().enumerate() {
            if b == b';' {
                if let Some(name) = self.entity.take() {
                    self.emit_entity(&name);
                }
                return &rest[i + 1..];
            }
            let len = self.entity.as_ref().map_or(0, Vec::len);
            if !(b.is_ascii_alphanumeric() || b == b'#') || len >= MAX_ENTITY_LEN {
                // A bare ampersand.
                if let Some(name) = self.entity.take() {
                    self.push_text(b"&");
                    self.push_text(&name);
                }
                return &rest[i..];
            }
            if let Some(entity) = self.entity.as_mut() {
                entity.push(b);
            }
        }
        &rest[rest.len()..]
    }

    fn emit_entity(&mut self, name: &[u8]) {
        let decoded = match name {
            b"amp" => Some('&'),
            b"lt" => Some('<'),
            b"gt" => Some('>'),
            b"quot" => Some('"'),
            b"apos" => Some('\''),
            b"nbsp" => Some(' '),
            _ => numeric_entity(name),
        };
        match decoded {
            Some(c) => {
                let mut utf8 = [0u8; 4];
                let (bytes, _, _) = self.encoding.encode(c.encode_utf8(&mut utf8));
                self.push_literal(&bytes);
            }
            None => {
                self.push_text(b"&");
                self.push_text(name);
                self.push_text(b";");
            }
        }
    }

    fn handle_tag(&mut self, raw: &[u8]) {
        let tag = raw.trim_ascii().to_ascii_lowercase();
        if tag.starts_with(b"!") || tag.starts_with(b"?") {
            return;
        }
        let (closing, body) = match tag.strip_prefix(b"/") {
            Some(body) => (true, body),
            None => (false, tag.as_slice()),
        };
        let name_end = body
            .iter()
            .position(|b| b.is_ascii_whitespace() || *b == b'/')
            .unwrap_or(body.len());
        let (name, attrs) = body.split_at(name_end);

        match name {
            b"p" | b"div" | b"br" | b"blockquote" | b"li" | b"tr" => self.break_paragraph(),
            [b'h', b'1'..=b'6'] => {
                if closing {
                    self.close_title();
                } else {
                    self.open_title();
                }
            }
            b"b" | b"strong" => self.control(TextKind::Strong, !closing),
            b"i" | b"em" => self.control(TextKind::Emphasis, !closing),
            b"code" | b"tt" => self.control(TextKind::Code, !closing),
            b"sub" => self.control(TextKind::Sub, !closing),
            b"sup" => self.control(TextKind::Sup, !closing),
            b"a" => {
                if closing {
                    if self.link_open {
                        self.link_open = false;
                        self.control(TextKind::Hyperlink, false);
                    }
                } else if let Some(position) = attribute(attrs, b"filepos").and_then(parse_number)
                {
                    if self.link_open {
                        self.control(TextKind::Hyperlink, false);
                    }
                    self.link_open = true;
                    self.link(format!("filepos{position}"));
                }
            }
            b"img" => {
                if let Some(index) = attribute(attrs, b"recindex").and_then(parse_number) {
                    self.image_reference(&index.to_string());
                }
            }
            b"mbp:pagebreak" => {
                self.break_paragraph();
                if self.section_breaks {
                    self.builder.insert_section_boundary();
                }
            }
            _ => {}
        }
    }

    /// Append text, collapsing runs of whitespace into one space.
    fn push_text(&mut self, bytes: &[u8]) {
        if !self.markup {
            self.text.extend_from_slice(bytes);
            return;
        }
        for &b in bytes {
            if b.is_ascii_whitespace() {
                self.space = true;
            } else {
                self.push_literal(&[b]);
            }
        }
    }

    fn push_literal(&mut self, bytes: &[u8]) {
        if self.space && (self.paragraph_open || !self.text.is_empty()) {
            self.text.push(b' ');
        }
        self.space = false;
        self.text.extend_from_slice(bytes);
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        self.open_paragraph();
        self.builder.add_text(&self.text);
        self.text.clear();
    }

    fn open_paragraph(&mut self) {
        if self.paragraph_open {
            return;
        }
        self.paragraph_open = true;
        self.builder.begin_paragraph();
        for pending in self.pending.drain(..) {
            match pending {
                Pending::Control(kind, start) => self.builder.add_control(kind, start),
                Pending::Link(target) => {
                    self.builder
                        .add_hyperlink_control(TextKind::Hyperlink, &target)
                }
            }
        }
    }

    fn break_paragraph(&mut self) {
        self.flush_text();
        if self.paragraph_open {
            self.builder.end_paragraph();
            self.paragraph_open = false;
        }
        self.space = false;
    }

    fn control(&mut self, kind: TextKind, start: bool) {
        self.flush_text();
        if self.paragraph_open {
            self.builder.add_control(kind, start);
        } else {
            self.pending.push(Pending::Control(kind, start));
        }
    }

    fn link(&mut self, target: String) {
        self.flush_text();
        if self.paragraph_open {
            self.builder
                .add_hyperlink_control(TextKind::Hyperlink, &target);
        } else {
            self.pending.push(Pending::Link(target));
        }
    }

    fn image_reference(&mut self, id: &str) {
        self.flush_text();
        self.open_paragraph();
        self.builder.add_image_reference(id);
    }

    fn open_title(&mut self) {
        self.close_title();
        self.break_paragraph();
        self.builder.enter_title();
        self.builder.push_kind(TextKind::SectionTitle);
        self.title_open = true;
    }

    fn close_title(&mut self) {
        self.break_paragraph();
        if self.title_open {
            self.builder.pop_kind();
            self.builder.exit_title();
            self.title_open = false;
        }
    }
}

/// Value of `name=...` in a lowercased attribute list, quoted or bare.
fn attribute<'t>(attrs: &'t [u8], name: &[u8]) -> Option<&'t [u8]> {
    let mut from = 0;
    while let Some(i) = attrs[from..].find(name) {
        let at = from + i;
        from = at + name.len();
        if at > 0 && !attrs[at - 1].is_ascii_whitespace() {
            continue;
        }
        let Some(value) = attrs[from..].trim_ascii_start().strip_prefix(b"=") else {
            continue;
        };
        let value = value.trim_ascii_start();
        return Some(match value.first() {
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                let value = &value[1..];
                &value[..memchr(quote, value).unwrap_or(value.len())]
            }
            _ => {
                let end = value
                    .iter()
                    .position(|b| b.is_ascii_whitespace() || *b == b'/')
                    .unwrap_or(value.len());
                &value[..end]
            }
        });
    }
    None
}

fn parse_number(value: &[u8]) -> Option<u64> {
    value.to_str().ok()?.parse().ok()
}

/// `#123` or `#x7B`.
fn numeric_entity(name: &[u8]) -> Option<char> {
    let digits = name.strip_prefix(b"#")?.to_str().ok()?;
    let code = match digits.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}
