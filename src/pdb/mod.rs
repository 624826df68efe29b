//! PDB (Palm Database) container envelope shared by PalmDoc, Mobipocket and Plucker.

mod header;

pub use header::{ContainerKind, PdbHeader, STRUCTURAL_HEADER_LEN};

#[cfg(test)]
pub(crate) use header::tests::header_bytes;
