//! Error types for pdbook operations.

use thiserror::Error;

/// Errors that can occur while reading a PDB container.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The container header or offset table does not have the expected shape.
    #[error("Invalid container structure: {0}")]
    Structural(String),

    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    #[error("Encrypted content is not supported")]
    Encrypted,

    /// A single record could not be decoded; earlier content is unaffected.
    #[error("Truncated record: {0}")]
    TruncatedRecord(String),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Coarse reason shown to a user when a document fails to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Unknown,
    UnsupportedCompression,
    EncryptedFile,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FailureReason::Unknown => "Error reading the book",
            FailureReason::UnsupportedCompression => "Unsupported compression method",
            FailureReason::EncryptedFile => "Encrypted file",
        })
    }
}

impl Error {
    pub fn user_message(&self) -> FailureReason {
        match self {
            Error::UnsupportedCompression(_) => FailureReason::UnsupportedCompression,
            Error::Encrypted => FailureReason::EncryptedFile,
            _ => FailureReason::Unknown,
        }
    }

    /// Whether the failure is confined to one record and later records may still be read.
    pub fn is_record_local(&self) -> bool {
        matches!(self, Error::TruncatedRecord(_) | Error::Decompression(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
