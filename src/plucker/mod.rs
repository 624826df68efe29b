//! Plucker (`DataPlkr`) documents.
//!
//! Each record carries its own header and type tag. Text records hold a
//! paragraph length table followed by compressed markup, which the
//! [`MarkupInterpreter`] turns into builder events.

mod markup;
mod opcode;
mod reader;

pub use markup::MarkupInterpreter;
pub use opcode::{Font, Op, arg_count};
pub use reader::PluckerReader;
