//! GARC - Nintendo 3DS general-purpose archive.
//!
//! The RomFS of 3DS titles stores most game data (stat tables, move data,
//! text banks) as GARC files: a header plus three sections describing a
//! flat list of records.
//!
//! ## Layout
//! ```text
//! [0x00] Header "CRAG"
//! [...]  FATO offset table  "OTAF"
//! [...]  FATB length table  "BTAF"  + RecordCount × 0x10 descriptors
//! [...]  FIMB data section  "BMIF"  + record payloads
//! ```
//!
//! ## Header
//! ```text
//! [0x00] Magic "CRAG"                       (4 bytes)
//! [0x04] FATO offset (absolute)             (u32 LE)
//! ```
//!
//! ## FATO
//! ```text
//! [0x00] Magic "OTAF"                       (4 bytes)
//! [0x04] FATB offset (relative to FATO)     (u32 LE)
//! ```
//!
//! ## FATB
//! ```text
//! [0x00] Magic "BTAF"                       (4 bytes)
//! [0x04] FIMB offset (relative to FATB)     (u32 LE)
//! [0x08] RecordCount                        (u32 LE)
//! [0x0C] Descriptors                        (RecordCount × 0x10 bytes)
//! ```
//!
//! ## FATB descriptor (0x10 bytes)
//! ```text
//! [0x00] Bit vector (unused)                (u32 LE)
//! [0x04] Start - relative to the data base  (u32 LE)
//! [0x08] End (unused)                       (u32 LE)
//! [0x0C] Size                               (u16 LE)
//! [0x0E] Unused                             (2 bytes)
//! ```
//!
//! ## FIMB
//! ```text
//! [0x00] Magic "BMIF"                       (4 bytes)
//! [0x04] Header size - data base is FIMB + this value  (u16 LE)
//! ```
//!
//! All integers are little-endian. A wrong tag anywhere aborts parsing:
//! every later offset would be meaningless.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Take};
use std::path::Path;

use tracing::{debug, trace};

use crate::crypto::text::TextKeys;
use crate::error::Section;
use crate::formats::mini::{MiniArchive, SubRecords};
use crate::formats::text::{Strings, TextTable};
use crate::utils::{bytesv, le_u16, le_u32, magic, seek_to, u8};
use crate::{Error, Result};

/// Tag of the GARC file header.
pub const GARC_MAGIC: &[u8; 4] = b"CRAG";
/// Tag of the FATO offset table.
pub const FATO_MAGIC: &[u8; 4] = b"OTAF";
/// Tag of the FATB length table.
pub const FATB_MAGIC: &[u8; 4] = b"BTAF";
/// Tag of the FIMB data section.
pub const FIMB_MAGIC: &[u8; 4] = b"BMIF";

/// Size of one FATB descriptor on disk.
const DESCRIPTOR_SIZE: u64 = 0x10;

/// Location of one record inside the data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RecordDescriptor {
    /// Offset relative to [`Garc::data_offset`].
    pub start: u32,
    /// Record length in bytes.
    pub size: u16,
}

impl RecordDescriptor {
    /// Offset one past the last byte, relative to the data segment.
    pub fn end(&self) -> u64 {
        self.start as u64 + self.size as u64
    }
}

/// Parsed GARC archive (metadata only).
///
/// Record data is accessed via [`GarcReader`].
#[derive(Debug, Clone)]
pub struct Garc {
    /// Absolute offset of the FATO section.
    pub fato_offset: u64,
    /// Absolute offset of the FATB section.
    pub fatb_offset: u64,
    /// Absolute offset of the FIMB section.
    pub fimb_offset: u64,
    /// Record descriptors in on-disk order; the index is the record id.
    pub records: Vec<RecordDescriptor>,
    /// Absolute stream offset where record payloads begin.
    pub(crate) data_offset: u64,
}

impl Garc {
    /// Parse a GARC archive from `r`.
    ///
    /// Offsets in the file are absolute, so `r` may be positioned anywhere;
    /// it is left at an unspecified position.
    pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Self> {
        seek_to(r, 0)?;
        magic(r, GARC_MAGIC, Section::Container)?;
        let fato_offset = le_u32(r)? as u64;

        seek_to(r, fato_offset)?;
        magic(r, FATO_MAGIC, Section::OffsetTable)?;
        let fatb_offset = fato_offset + le_u32(r)? as u64;

        seek_to(r, fatb_offset)?;
        magic(r, FATB_MAGIC, Section::LengthTable)?;
        let fimb_offset = fatb_offset + le_u32(r)? as u64;
        let record_count = le_u32(r)?;
        debug!(
            fato_offset,
            fatb_offset,
            fimb_offset,
            record_count,
            "parsed GARC section offsets"
        );

        // Refuse counts the stream cannot possibly hold before allocating.
        let stream_len = r.seek(SeekFrom::End(0))?;
        let table_start = fatb_offset + 0x0C;
        if table_start + record_count as u64 * DESCRIPTOR_SIZE > stream_len {
            return Err(Error::Truncated {
                context: "FATB descriptor table",
            });
        }
        seek_to(r, table_start)?;

        let mut records = Vec::with_capacity(record_count as usize);
        for _ in 0..record_count {
            let _bit_vector = le_u32(r)?;
            let start = le_u32(r)?;
            let _end = le_u32(r)?;
            let size = le_u16(r)?;
            let _unused0 = u8(r)?;
            let _unused1 = u8(r)?;
            records.push(RecordDescriptor { start, size });
        }

        seek_to(r, fimb_offset)?;
        magic(r, FIMB_MAGIC, Section::Data)?;
        let data_offset = fimb_offset + le_u16(r)? as u64;

        if let Some(bad) = records
            .iter()
            .position(|d| data_offset + d.end() > stream_len)
        {
            debug!(record = bad, stream_len, "record extends past end of stream");
            return Err(Error::Truncated {
                context: "record data",
            });
        }

        debug!(data_offset, records = records.len(), "opened GARC archive");
        Ok(Self {
            fato_offset,
            fatb_offset,
            fimb_offset,
            records,
            data_offset,
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the archive holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Absolute stream offset where record payloads begin.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Descriptor of record `index`.
    pub fn descriptor(&self, index: usize) -> Result<&RecordDescriptor> {
        self.records.get(index).ok_or(Error::RecordOutOfRange {
            index,
            count: self.records.len(),
        })
    }

    /// Absolute stream offset of record `index`.
    pub fn record_offset(&self, index: usize) -> Result<u64> {
        Ok(self.data_offset + self.descriptor(index)?.start as u64)
    }
}

/// Reader wrapper over a parsed [`Garc`] archive.
///
/// Every read seeks explicitly first, so record, sub-record and text
/// traversals may be interleaved freely on the same reader.
pub struct GarcReader<R> {
    inner: R,
    /// Parsed metadata.
    pub garc: Garc,
}

impl GarcReader<BufReader<File>> {
    /// Open and parse the GARC file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening GARC file");
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> GarcReader<R> {
    /// Parse a GARC archive and wrap the provided reader.
    pub fn new(mut reader: R) -> Result<Self> {
        let garc = Garc::parse(&mut reader)?;
        Ok(Self {
            inner: reader,
            garc,
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.garc.len()
    }

    /// Whether the archive holds no records.
    pub fn is_empty(&self) -> bool {
        self.garc.is_empty()
    }

    /// Open record `index` for streaming access.
    ///
    /// Seeks to the record's start and returns a [`Take`] limited to its
    /// byte range. The borrow ends when the [`Take`] is dropped.
    pub fn record_reader(&mut self, index: usize) -> Result<Take<&mut R>> {
        let size = self.garc.descriptor(index)?.size;
        seek_to(&mut self.inner, self.garc.record_offset(index)?)?;
        Ok(self.inner.by_ref().take(size as u64))
    }

    /// Read record `index` into memory.
    pub fn read_record(&mut self, index: usize) -> Result<Vec<u8>> {
        read_descriptor(&mut self.inner, &self.garc, index)
    }

    /// Iterate over every record's bytes in on-disk order.
    ///
    /// Each call starts a fresh traversal from record 0.
    pub fn records(&mut self) -> Records<'_, R> {
        Records {
            inner: &mut self.inner,
            garc: &self.garc,
            next: 0,
        }
    }

    /// Iterate over the sub-records of record `index`, read as a
    /// mini-archive.
    pub fn sub_records(&mut self, index: usize) -> Result<SubRecords<'_, R>> {
        let base = self.garc.record_offset(index)?;
        let size = self.garc.descriptor(index)?.size;
        seek_to(&mut self.inner, base)?;
        let mini = MiniArchive::parse(&mut self.inner)?;
        let payload_start = base + mini.header_size();
        if payload_start + mini.payload_len() > base + size as u64 {
            return Err(Error::Truncated {
                context: "mini-archive payload",
            });
        }
        Ok(SubRecords::new(&mut self.inner, mini, payload_start))
    }

    /// Iterate over the decrypted strings of text table `index` using the
    /// default key constants.
    pub fn strings(&mut self, index: usize) -> Result<Strings<'_, R>> {
        self.strings_with(index, TextKeys::default())
    }

    /// Iterate over the decrypted strings of text table `index` using
    /// `keys`.
    pub fn strings_with(&mut self, index: usize, keys: TextKeys) -> Result<Strings<'_, R>> {
        let base = self.garc.record_offset(index)?;
        let end = base + self.garc.descriptor(index)?.size as u64;
        seek_to(&mut self.inner, base)?;
        let table = TextTable::parse(&mut self.inner)?;
        if base + table.header_size() > end {
            return Err(Error::Truncated {
                context: "text table header",
            });
        }
        Ok(Strings::new(&mut self.inner, table, base, end, keys))
    }

    /// Consume the reader, returning the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Iterator over the raw bytes of every record in a [`GarcReader`].
///
/// Yields exactly [`Garc::len`] items unless a read fails; the first error
/// ends the traversal.
pub struct Records<'a, R> {
    inner: &'a mut R,
    garc: &'a Garc,
    next: usize,
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.garc.len() {
            return None;
        }
        let index = self.next;
        let item = read_descriptor(self.inner, self.garc, index);
        // Fail fast: no records after an error.
        self.next = if item.is_ok() {
            index + 1
        } else {
            self.garc.len()
        };
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.garc.len() - self.next;
        (left, Some(left))
    }
}

fn read_descriptor<R: Read + Seek>(r: &mut R, garc: &Garc, index: usize) -> Result<Vec<u8>> {
    let desc = garc.descriptor(index)?;
    trace!(index, start = desc.start, size = desc.size, "reading record");
    seek_to(r, garc.data_offset + desc.start as u64)?;
    bytesv(r, desc.size as usize, "record data")
}
