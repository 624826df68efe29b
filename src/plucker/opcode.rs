//! Plucker text function codes.
//!
//! Inside a paragraph a NUL byte introduces a function code. The low three
//! bits of the code give the number of argument bytes that follow it.

use crate::model::TextKind;

/// Number of argument bytes following `code`.
pub fn arg_count(code: u8) -> usize {
    (code % 8) as usize
}

/// Font selected by the font-change function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Heading(u8),
    Bold,
    Monospace,
    Small,
    Sub,
    Sup,
    /// A font number this reader does not know; it opens no span.
    Other(u8),
}

impl Font {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Font::Regular,
            1..=6 => Font::Heading(value),
            7 => Font::Bold,
            8 => Font::Monospace,
            9 => Font::Small,
            10 => Font::Sub,
            11 => Font::Sup,
            n => Font::Other(n),
        }
    }

    /// Inline style span opened by this font, if any.
    pub fn control_kind(self) -> Option<TextKind> {
        match self {
            Font::Bold => Some(TextKind::Strong),
            Font::Monospace => Some(TextKind::Code),
            Font::Sub => Some(TextKind::Sub),
            Font::Sup => Some(TextKind::Sup),
            Font::Regular | Font::Small | Font::Heading(_) | Font::Other(_) => None,
        }
    }
}

/// A decoded function with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    EndLink,
    Link(String),
    Font(Font),
    Image(String),
    Align(TextKind),
    Emphasis(bool),
    /// Colour, underline, strike-through: recognised, no visual effect.
    Ignored,
    /// Table markers; tables are not rendered.
    Table,
    /// Unknown code, or known code with an out-of-range argument.
    Skip,
}

fn word(args: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([args[at], args[at + 1]])
}

impl Op {
    /// Decode `code`; `args` must hold exactly [`arg_count`]`(code)` bytes.
    pub fn decode(code: u8, args: &[u8]) -> Op {
        debug_assert_eq!(args.len(), arg_count(code));
        match code {
            0x08 => Op::EndLink,
            0x0A => Op::Link(word(args, 0).to_string()),
            0x0C => Op::Link(format!("{}#{}", word(args, 0), word(args, 2))),
            0x11 => Op::Font(Font::from_u8(args[0])),
            0x1A => Op::Image(word(args, 0).to_string()),
            0x29 => match args[0] {
                0 => Op::Align(TextKind::LeftAligned),
                1 => Op::Align(TextKind::RightAligned),
                2 => Op::Align(TextKind::CenterAligned),
                3 => Op::Align(TextKind::JustifyAligned),
                _ => Op::Skip,
            },
            0x40 => Op::Emphasis(true),
            0x48 => Op::Emphasis(false),
            0x53 | 0x60 | 0x68 | 0x70 | 0x78 => Op::Ignored,
            // Extended image reference: alternate image id, then the id to show.
            0x5C => Op::Image(word(args, 2).to_string()),
            0x90 | 0x92 | 0x97 => Op::Table,
            _ => Op::Skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_counts() {
        assert_eq!(arg_count(0x08), 0);
        assert_eq!(arg_count(0x0A), 2);
        assert_eq!(arg_count(0x0C), 4);
        assert_eq!(arg_count(0x11), 1);
        assert_eq!(arg_count(0x5C), 4);
        assert_eq!(arg_count(0x97), 7);
    }

    #[test]
    fn test_decode_links() {
        assert_eq!(Op::decode(0x0A, &[0x01, 0x02]), Op::Link("258".into()));
        assert_eq!(
            Op::decode(0x0C, &[0x00, 0x05, 0x00, 0x09]),
            Op::Link("5#9".into())
        );
        assert_eq!(Op::decode(0x08, &[]), Op::EndLink);
    }

    #[test]
    fn test_decode_images() {
        assert_eq!(Op::decode(0x1A, &[0x00, 0x2A]), Op::Image("42".into()));
        assert_eq!(
            Op::decode(0x5C, &[0x00, 0x01, 0x00, 0x2B]),
            Op::Image("43".into())
        );
    }

    #[test]
    fn test_decode_fonts_and_alignment() {
        assert_eq!(Op::decode(0x11, &[3]), Op::Font(Font::Heading(3)));
        assert_eq!(Op::decode(0x11, &[7]), Op::Font(Font::Bold));
        assert_eq!(Op::decode(0x11, &[12]), Op::Font(Font::Other(12)));
        assert_eq!(Op::decode(0x29, &[2]), Op::Align(TextKind::CenterAligned));
        assert_eq!(Op::decode(0x29, &[9]), Op::Skip);
    }

    #[test]
    fn test_decode_ignored_and_unknown() {
        assert_eq!(Op::decode(0x53, &[0, 0, 0]), Op::Ignored);
        assert_eq!(Op::decode(0x60, &[]), Op::Ignored);
        assert_eq!(Op::decode(0x92, &[0, 0]), Op::Table);
        assert_eq!(Op::decode(0x22, &[0, 0]), Op::Skip);
        assert_eq!(Op::decode(0x00, &[]), Op::Skip);
    }

    #[test]
    fn test_font_controls() {
        assert_eq!(Font::Bold.control_kind(), Some(TextKind::Strong));
        assert_eq!(Font::Monospace.control_kind(), Some(TextKind::Code));
        assert_eq!(Font::Small.control_kind(), None);
        assert_eq!(Font::Heading(1).control_kind(), None);
    }
}
