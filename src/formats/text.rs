//! Text table - a GARC record holding encrypted UTF-16 lines.
//!
//! Each text GARC (one per language) stores one table per record; a table
//! holds the lines of one text bank (species names, move names, ...).
//!
//! ## Layout
//! ```text
//! [0x00] SectionCount (unused)                  (u16 LE)
//! [0x02] LineCount                              (u16 LE)
//! [0x04] TotalLength (unused)                   (u32 LE)
//! [0x08] InitialKey (unused, always 0)          (u32 LE)
//! [0x0C] SectionOffset (unused, always 0x10)    (u32 LE)
//! [0x10] SectionLength (repeats TotalLength)    (u32 LE)
//! [0x14] LineTable                              (LineCount × 8 bytes)
//! [...]  Encrypted line data
//! ```
//!
//! ## Line entry (8 bytes)
//! ```text
//! [0x00] Offset - relative to record start + 0x10   (u32 LE)
//! [0x04] Length in UTF-16 code units                (u16 LE)
//! [0x06] Unused                                     (u16 LE)
//! ```
//!
//! Line data is not guaranteed to be stored in table order, so every line
//! is read with its own seek. See [`crate::crypto::text`] for the cipher.

use std::io::{Read, Seek};

use tracing::{debug, trace};

use crate::crypto::text::{TextKeys, decrypt_line};
use crate::utils::{bytesv, le_u16, le_u32, seek_to};
use crate::{Error, Result};

/// Offset from the record start that line offsets are relative to.
pub const TEXT_DATA_OFFSET: u64 = 0x10;

/// Location of one encrypted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEntry {
    /// Byte offset relative to the table's data region.
    pub offset: u32,
    /// Length in UTF-16 code units.
    pub len: u16,
}

/// Parsed text table header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTable {
    /// Declared total length of the table data.
    pub total_length: u32,
    /// Line entries in table order.
    pub entries: Vec<TextEntry>,
}

impl TextTable {
    /// Parse a text table header from `r`.
    ///
    /// `r` must be positioned at the start of the record.
    pub fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let _sections = le_u16(r)?;
        let count = le_u16(r)?;
        let total_length = le_u32(r)?;
        let _initial_key = le_u32(r)?;
        let _section_offset = le_u32(r)?;
        // Repeats the section length; neither copy is checked.
        let _section_length = le_u32(r)?;

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let offset = le_u32(r)?;
            let len = le_u16(r)?;
            let _unused = le_u16(r)?;
            entries.push(TextEntry { offset, len });
        }

        debug!(count, total_length, "parsed text table header");
        Ok(Self {
            total_length,
            entries,
        })
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no lines.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes taken by the header and line table.
    pub fn header_size(&self) -> u64 {
        0x14 + 8 * self.entries.len() as u64
    }
}

/// Iterator over the decrypted lines of one text table.
///
/// Created by [`crate::formats::garc::GarcReader::strings`]. The line key
/// starts at [`TextKeys::base`] and grows by [`TextKeys::advance`] after
/// every line. A line that runs past the end of its record fails with
/// [`Error::Truncated`].
pub struct Strings<'a, R> {
    inner: &'a mut R,
    table: TextTable,
    data_base: u64,
    record_end: u64,
    key: u16,
    advance: u16,
    next: usize,
}

impl<'a, R: Read + Seek> Strings<'a, R> {
    /// `record_base..record_end` is the absolute byte range of the record.
    pub(crate) fn new(
        inner: &'a mut R,
        table: TextTable,
        record_base: u64,
        record_end: u64,
        keys: TextKeys,
    ) -> Self {
        Self {
            inner,
            table,
            data_base: record_base + TEXT_DATA_OFFSET,
            record_end,
            key: keys.base,
            advance: keys.advance,
            next: 0,
        }
    }

    /// The parsed header this iterator walks.
    pub fn table(&self) -> &TextTable {
        &self.table
    }

    fn read_line(&mut self, entry: TextEntry) -> Result<String> {
        let start = self.data_base + entry.offset as u64;
        if start + entry.len as u64 * 2 > self.record_end {
            return Err(Error::Truncated {
                context: "text line",
            });
        }
        seek_to(self.inner, start)?;
        let raw = bytesv(self.inner, entry.len as usize * 2, "text line")?;
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(decrypt_line(&units, self.key))
    }
}

impl<R: Read + Seek> Iterator for Strings<'_, R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = *self.table.entries.get(self.next)?;
        trace!(index = self.next, key = self.key, len = entry.len, "decrypting line");

        match self.read_line(entry) {
            Ok(line) => {
                self.key = self.key.wrapping_add(self.advance);
                self.next += 1;
                Some(Ok(line))
            }
            Err(e) => {
                self.next = self.table.len();
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.table.len() - self.next;
        (left, Some(left))
    }
}
