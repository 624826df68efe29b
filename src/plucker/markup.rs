//! Interpreter for the Plucker paragraph markup.
//!
//! A paragraph is Closed until its first content byte, Open from then on,
//! and Closed again at its declared end. Controls met while Closed are
//! queued and replayed in order the moment the paragraph opens.

use std::collections::VecDeque;

use log::{debug, warn};
use memchr::memchr;

use super::opcode::{Font, Op, arg_count};
use crate::error::{Error, Result};
use crate::model::{DocumentBuilder, TextKind};

/// Controls seen before the paragraph opened.
#[derive(Debug, Default)]
struct PendingControls {
    controls: VecDeque<(TextKind, bool)>,
    /// Targets of the queued `(Hyperlink, true)` controls, in the same order.
    hyperlinks: VecDeque<String>,
}

impl PendingControls {
    fn clear(&mut self) {
        self.controls.clear();
        self.hyperlinks.clear();
    }
}

/// Interpreter state carried across the paragraphs of a document.
#[derive(Debug)]
pub struct MarkupInterpreter {
    font: Font,
    paragraph_open: bool,
    pending: PendingControls,
}

impl Default for MarkupInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupInterpreter {
    pub fn new() -> Self {
        Self {
            font: Font::Regular,
            paragraph_open: false,
            pending: PendingControls::default(),
        }
    }

    pub fn font(&self) -> Font {
        self.font
    }

    /// Interpret every paragraph of a decompressed text record.
    ///
    /// Stops with [`Error::TruncatedRecord`] at the first paragraph reaching
    /// past `data`; the paragraphs before it have already been emitted.
    pub fn process_record(
        &mut self,
        data: &mut [u8],
        paragraph_lengths: &[u16],
        builder: &mut dyn DocumentBuilder,
    ) -> Result<()> {
        let mut start = 0usize;
        for (index, &len) in paragraph_lengths.iter().enumerate() {
            let end = start + usize::from(len);
            if end > data.len() {
                return Err(Error::TruncatedRecord(format!(
                    "paragraph {index} ends at {end}, record holds {} bytes",
                    data.len()
                )));
            }
            self.process_paragraph(&mut data[start..end], builder);
            start = end;
        }
        Ok(())
    }

    /// Interpret one paragraph. `0xA0` bytes in its text are rewritten to spaces.
    pub fn process_paragraph(&mut self, text: &mut [u8], builder: &mut dyn DocumentBuilder) {
        self.change_font(Font::Regular, builder);
        while builder.pop_kind() {}
        self.paragraph_open = false;

        let end = text.len();
        let mut pos = 0usize;
        while pos < end {
            let escape = memchr(0, &text[pos..]).map_or(end, |i| pos + i);
            if escape > pos {
                let run = &mut text[pos..escape];
                for byte in run.iter_mut().filter(|b| **b == 0xA0) {
                    *byte = b' ';
                }
                self.open_paragraph(builder);
                builder.add_text(run);
            }
            let code_pos = escape + 1;
            if code_pos >= end {
                break;
            }

            let code = text[code_pos];
            if code == 0 {
                // A second escape: the code follows it.
                pos = code_pos;
                continue;
            }
            let argc = arg_count(code);
            if end - code_pos < 1 + argc {
                debug!("function 0x{code:02X} truncated at paragraph end");
                break;
            }
            let op = Op::decode(code, &text[code_pos + 1..code_pos + 1 + argc]);
            self.apply(op, builder);
            pos = code_pos + 1 + argc;
        }

        self.close_paragraph(builder);
    }

    fn apply(&mut self, op: Op, builder: &mut dyn DocumentBuilder) {
        match op {
            Op::EndLink => self.add_control(TextKind::Hyperlink, false, builder),
            Op::Link(target) => self.add_hyperlink(target, builder),
            Op::Font(font) => self.change_font(font, builder),
            Op::Image(id) => {
                self.open_paragraph(builder);
                builder.add_image_reference(&id);
            }
            Op::Align(kind) => self.add_control(kind, true, builder),
            Op::Emphasis(start) => self.add_control(TextKind::Emphasis, start, builder),
            Op::Ignored | Op::Skip => {}
            // TODO: render tables once the model has a table representation.
            Op::Table => {}
        }
    }

    fn add_control(&mut self, kind: TextKind, start: bool, builder: &mut dyn DocumentBuilder) {
        if self.paragraph_open {
            builder.add_control(kind, start);
        } else {
            self.pending.controls.push_back((kind, start));
        }
    }

    fn add_hyperlink(&mut self, target: String, builder: &mut dyn DocumentBuilder) {
        if self.paragraph_open {
            builder.add_hyperlink_control(TextKind::Hyperlink, &target);
        } else {
            self.pending.controls.push_back((TextKind::Hyperlink, true));
            self.pending.hyperlinks.push_back(target);
        }
    }

    /// Closed → Open: begin the paragraph and replay queued controls.
    fn open_paragraph(&mut self, builder: &mut dyn DocumentBuilder) {
        if self.paragraph_open {
            return;
        }
        self.paragraph_open = true;
        builder.begin_paragraph();
        while let Some((kind, start)) = self.pending.controls.pop_front() {
            if kind == TextKind::Hyperlink && start {
                match self.pending.hyperlinks.pop_front() {
                    Some(target) => builder.add_hyperlink_control(kind, &target),
                    None => warn!("queued hyperlink without a target"),
                }
            } else {
                builder.add_control(kind, start);
            }
        }
        self.pending.clear();
    }

    /// Open → Closed: close the font span and end the paragraph.
    fn close_paragraph(&mut self, builder: &mut dyn DocumentBuilder) {
        self.change_font(Font::Regular, builder);
        if self.paragraph_open {
            builder.end_paragraph();
        }
        self.paragraph_open = false;
        self.pending.clear();
    }

    /// Fonts never nest: the current one is closed before the next opens.
    fn change_font(&mut self, font: Font, builder: &mut dyn DocumentBuilder) {
        if self.font == font {
            return;
        }
        self.set_font(self.font, false, builder);
        self.font = font;
        self.set_font(font, true, builder);
    }

    fn set_font(&mut self, font: Font, start: bool, builder: &mut dyn DocumentBuilder) {
        if let Font::Heading(_) = font {
            if start {
                builder.enter_title();
                builder.push_kind(TextKind::SectionTitle);
            } else {
                builder.pop_kind();
                builder.exit_title();
            }
        } else if let Some(kind) = font.control_kind() {
            self.add_control(kind, start, builder);
        }
    }
}
