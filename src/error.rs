//! Library-wide error and result types.

use std::fmt;
use std::io;

use thiserror::Error;

/// Result alias used throughout garckit.
pub type Result<T> = std::result::Result<T, Error>;

/// GARC section whose tag is checked while opening an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// The `CRAG` file header.
    Container,
    /// The `OTAF` (FATO) offset table.
    OffsetTable,
    /// The `BTAF` (FATB) length table.
    LengthTable,
    /// The `BMIF` (FIMB) data section.
    Data,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Container => "container",
            Section::OffsetTable => "offset-table",
            Section::LengthTable => "length-table",
            Section::Data => "data",
        })
    }
}

/// All errors the library can produce.
///
/// Every variant is fatal for the operation that raised it: opening an
/// archive, reading a record or decoding one. Nothing is retried.
#[derive(Debug, Error)]
pub enum Error {
    /// A section tag did not match its expected value.
    #[error("bad magic in {0} section")]
    BadMagic(Section),
    /// A raw record is not the size its schema describes.
    #[error("record size mismatch: expected {expected} bytes, found {found}")]
    SizeMismatch { expected: usize, found: usize },
    /// The stream ended before a header-declared structure was complete.
    #[error("truncated {context}")]
    Truncated { context: &'static str },
    /// A record index past the end of the archive's descriptor table.
    #[error("record {index} out of range (archive holds {count})")]
    RecordOutOfRange { index: usize, count: usize },
    /// An offset or size field points outside the region it belongs to.
    #[error("invalid offset or size")]
    InvalidRange,
    /// A record schema was built with inconsistent fields.
    #[error("invalid schema: {0}")]
    InvalidSchema(&'static str),
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Turn an I/O failure into [`Error::Truncated`] when it is a short read.
    pub(crate) fn from_read(e: io::Error, context: &'static str) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::Truncated { context }
        } else {
            Error::Io(e)
        }
    }
}
