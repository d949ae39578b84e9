//! Low-level I/O primitives shared by all parsers.
//!
//! Each function reads exactly the bytes it promises or returns an error -
//! there is no partial-read ambiguity. Short reads surface as
//! [`Error::Truncated`].

use std::io::{Read, Seek, SeekFrom};

use crate::error::Section;
use crate::{Error, Result};

/// Read one byte.
#[inline]
pub(crate) fn u8<R: Read>(r: &mut R) -> Result<u8> {
    Ok(bytesa::<1>(r)?[0])
}

/// Read a little-endian `u16`.
#[inline]
pub(crate) fn le_u16<R: Read>(r: &mut R) -> Result<u16> {
    Ok(u16::from_le_bytes(bytesa(r)?))
}

/// Read a little-endian `u32`.
#[inline]
pub(crate) fn le_u32<R: Read>(r: &mut R) -> Result<u32> {
    Ok(u32::from_le_bytes(bytesa(r)?))
}

/// Read exactly `N` bytes into a fixed-size array.
#[inline]
pub(crate) fn bytesa<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut b = [0u8; N];
    r.read_exact(&mut b)
        .map_err(|e| Error::from_read(e, "header"))?;
    Ok(b)
}

/// Read exactly `len` bytes into a `Vec`.
#[inline]
pub(crate) fn bytesv<R: Read>(r: &mut R, len: usize, context: &'static str) -> Result<Vec<u8>> {
    let mut b = vec![0u8; len];
    r.read_exact(&mut b).map_err(|e| Error::from_read(e, context))?;
    Ok(b)
}

/// Seek to an absolute stream position.
#[inline]
pub(crate) fn seek_to<R: Seek>(r: &mut R, pos: u64) -> Result<()> {
    r.seek(SeekFrom::Start(pos))?;
    Ok(())
}

/// Verify that the next four bytes in the stream are the tag of `section`.
///
/// Returns [`Error::BadMagic`] naming the section on mismatch.
#[inline]
pub(crate) fn magic<R: Read>(r: &mut R, expected: &[u8; 4], section: Section) -> Result<()> {
    let got = bytesa::<4>(r)?;
    if &got != expected {
        return Err(Error::BadMagic(section));
    }
    Ok(())
}
