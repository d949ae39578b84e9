//! Mini-archive - nested table of variable-length sub-records.
//!
//! Some GARC records are themselves small archives, one per entry (the
//! move data file packs every move into a single mini-archive).
//!
//! ## Layout
//! ```text
//! [0x00] Size (unused)                         (u16 LE)
//! [0x02] SubRecordCount                        (u16 LE)
//! [0x04] Offsets  ((SubRecordCount + 1) × 4 bytes)
//! [...]  Payload  - sub-records back to back
//! ```
//!
//! ## Offset entry (4 bytes)
//! ```text
//! [0x00] Offset                                (u16 LE)
//! [0x02] Unused                                (u16 LE)
//! ```
//!
//! Sub-record `k` spans `offsets[k]..offsets[k + 1]`; the final offset is a
//! sentinel closing the last sub-record. Payloads are contiguous, so they
//! are read back to back starting right after the offset table.

use std::io::{Read, Seek};

use tracing::{debug, trace};

use crate::utils::{bytesv, le_u16, seek_to};
use crate::{Error, Result};

/// Parsed mini-archive header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniArchive {
    /// Declared size field (not used for decoding).
    pub size: u16,
    /// `count + 1` non-decreasing offsets.
    pub offsets: Vec<u16>,
}

impl MiniArchive {
    /// Parse a mini-archive header from `r`.
    ///
    /// `r` must be positioned at the start of the record. On return it sits
    /// at the first payload byte.
    pub fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let size = le_u16(r)?;
        let count = le_u16(r)?;

        let mut offsets = Vec::with_capacity(count as usize + 1);
        for _ in 0..=count {
            let offset = le_u16(r)?;
            let _unused = le_u16(r)?;
            offsets.push(offset);
        }

        if offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::InvalidRange);
        }

        debug!(count, size, "parsed mini-archive header");
        Ok(Self { size, offsets })
    }

    /// Number of sub-records.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Whether the mini-archive holds no sub-records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of sub-record `k`, if it exists.
    pub fn sub_len(&self, k: usize) -> Option<usize> {
        let start = *self.offsets.get(k)?;
        let end = *self.offsets.get(k + 1)?;
        Some((end - start) as usize)
    }

    /// Bytes occupied by the size/count fields and the offset table.
    pub fn header_size(&self) -> u64 {
        4 + self.offsets.len() as u64 * 4
    }

    /// Total bytes covered by all sub-records.
    pub fn payload_len(&self) -> u64 {
        let first = self.offsets.first().copied().unwrap_or(0);
        let last = self.offsets.last().copied().unwrap_or(0);
        (last - first) as u64
    }
}

/// Iterator over the sub-records of one mini-archive.
///
/// Created by [`crate::formats::garc::GarcReader::sub_records`]. Each item
/// seeks to where the previous one ended before reading.
pub struct SubRecords<'a, R> {
    inner: &'a mut R,
    mini: MiniArchive,
    pos: u64,
    next: usize,
}

impl<'a, R: Read + Seek> SubRecords<'a, R> {
    pub(crate) fn new(inner: &'a mut R, mini: MiniArchive, payload_start: u64) -> Self {
        Self {
            inner,
            mini,
            pos: payload_start,
            next: 0,
        }
    }

    /// The parsed header this iterator walks.
    pub fn archive(&self) -> &MiniArchive {
        &self.mini
    }
}

impl<R: Read + Seek> Iterator for SubRecords<'_, R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.mini.sub_len(self.next)?;
        let index = self.next;
        trace!(index, pos = self.pos, len, "reading sub-record");

        let item = seek_to(self.inner, self.pos)
            .and_then(|()| bytesv(self.inner, len, "mini-archive sub-record"));
        match item {
            Ok(bytes) => {
                self.pos += len as u64;
                self.next += 1;
                Some(Ok(bytes))
            }
            Err(e) => {
                self.next = self.mini.len();
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.mini.len() - self.next;
        (left, Some(left))
    }
}
