//! In-memory builders for GARC test fixtures.

#![allow(dead_code)]

use garckit::crypto::text::{TextKeys, encrypt_line};

/// Absolute offsets of the four sections in a built archive.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub fato: usize,
    pub fatb: usize,
    pub fimb: usize,
    pub data: usize,
}

/// Builds a GARC file the way the games lay them out: a 0x1C byte header,
/// FATO, FATB, then FIMB with 4-byte aligned records.
#[derive(Default)]
pub struct GarcBuilder {
    records: Vec<Vec<u8>>,
}

impl GarcBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.records.push(bytes.into());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_with_layout().0
    }

    pub fn build_with_layout(&self) -> (Vec<u8>, Layout) {
        let n = self.records.len();
        let fato = 0x1C;
        let fato_size = 0x0C + 4 * n;
        let fatb = fato + fato_size;
        let fatb_size = 0x0C + 0x10 * n;
        let fimb = fatb + fatb_size;
        let data = fimb + 0x0C;

        let mut payload = Vec::new();
        let mut spans = Vec::with_capacity(n);
        for record in &self.records {
            let start = payload.len();
            payload.extend_from_slice(record);
            spans.push((start, record.len()));
            while payload.len() % 4 != 0 {
                payload.push(0xFF);
            }
        }
        let largest = self.records.iter().map(Vec::len).max().unwrap_or(0);

        let mut out = Vec::new();
        out.extend_from_slice(b"CRAG");
        put32(&mut out, fato);
        out.extend_from_slice(&0xFEFFu16.to_le_bytes());
        out.extend_from_slice(&0x0400u16.to_le_bytes());
        put32(&mut out, 4);
        put32(&mut out, data);
        put32(&mut out, data + payload.len());
        put32(&mut out, largest);
        assert_eq!(out.len(), fato);

        out.extend_from_slice(b"OTAF");
        put32(&mut out, fato_size);
        out.extend_from_slice(&(n as u16).to_le_bytes());
        out.extend_from_slice(&0xFFFFu16.to_le_bytes());
        for i in 0..n {
            put32(&mut out, i * 0x10);
        }
        assert_eq!(out.len(), fatb);

        out.extend_from_slice(b"BTAF");
        put32(&mut out, fatb_size);
        put32(&mut out, n);
        for &(start, len) in &spans {
            put32(&mut out, 1);
            put32(&mut out, start);
            put32(&mut out, start + len);
            put32(&mut out, len);
        }
        assert_eq!(out.len(), fimb);

        out.extend_from_slice(b"BMIF");
        put32(&mut out, 0x0C);
        put32(&mut out, payload.len());
        out.extend_from_slice(&payload);

        (out, Layout { fato, fatb, fimb, data })
    }
}

/// A mini-archive record holding `subs` back to back.
pub fn mini_archive(subs: &[&[u8]]) -> Vec<u8> {
    let header = 4 + 4 * (subs.len() + 1);
    let total = header + subs.iter().map(|s| s.len()).sum::<usize>();

    let mut out = Vec::new();
    out.extend_from_slice(&(total as u16).to_le_bytes());
    out.extend_from_slice(&(subs.len() as u16).to_le_bytes());
    let mut offset = header;
    for sub in subs {
        out.extend_from_slice(&(offset as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        offset += sub.len();
    }
    out.extend_from_slice(&(offset as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    for sub in subs {
        out.extend_from_slice(sub);
    }
    out
}

/// A text table record; each line gets one trailing NUL like the games.
pub fn text_table(lines: &[&str], keys: TextKeys) -> Vec<u8> {
    let count = lines.len();
    let data_start = 0x14 + 8 * count;

    let mut payload = Vec::new();
    let mut entries = Vec::with_capacity(count);
    for (i, line) in lines.iter().enumerate() {
        let units = encrypt_line(&format!("{line}\0"), keys.line_key(i));
        entries.push(((data_start - 0x10 + payload.len()) as u32, units.len() as u16));
        for u in units {
            payload.extend_from_slice(&u.to_le_bytes());
        }
    }
    let section_len = (payload.len() + 4 + 8 * count) as u32;

    let mut out = Vec::new();
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&(count as u16).to_le_bytes());
    out.extend_from_slice(&section_len.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0x10u32.to_le_bytes());
    out.extend_from_slice(&section_len.to_le_bytes());
    for (offset, len) in entries {
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out.extend_from_slice(&payload);
    out
}

fn put32(out: &mut Vec<u8>, v: usize) {
    out.extend_from_slice(&(v as u32).to_le_bytes());
}
