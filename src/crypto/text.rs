//! Text table keystream and line decryption.

/// Private-use code points the games use for gender symbols.
const SYMBOL_REMAP: [(char, char); 2] = [('\u{E08F}', '♀'), ('\u{E08E}', '♂')];

/// Key constants for one text archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextKeys {
    /// Key of the first line in a table.
    pub base: u16,
    /// Added (wrapping) to the key after every line.
    pub advance: u16,
}

impl TextKeys {
    /// Key of line `index` in a table.
    pub fn line_key(&self, index: usize) -> u16 {
        // The key cycles mod 0x10000, so only the low 16 bits of the index matter.
        self.base.wrapping_add(self.advance.wrapping_mul(index as u16))
    }
}

impl Default for TextKeys {
    fn default() -> Self {
        Self {
            base: 0x7C89,
            advance: 0x2983,
        }
    }
}

/// Infinite keystream seeded by one line key.
///
/// Each step rotates the previous word left by three bits. Because 3 and 16
/// are coprime the stream visits all 16 rotations of the seed and repeats
/// with period 16.
#[derive(Debug, Clone)]
pub struct KeyStream {
    key: u16,
}

impl KeyStream {
    /// Start a keystream whose first word is `seed`.
    pub fn new(seed: u16) -> Self {
        Self { key: seed }
    }
}

impl Iterator for KeyStream {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        let key = self.key;
        self.key = key.rotate_left(3);
        Some(key)
    }
}

/// The keystream for `seed`, as a free function.
pub fn key_sequence(seed: u16) -> KeyStream {
    KeyStream::new(seed)
}

/// XOR `units` in place with the keystream seeded at `key`.
///
/// XOR is symmetric: applying this twice with the same key restores the input.
pub fn apply_keystream(units: &mut [u16], key: u16) {
    for (unit, k) in units.iter_mut().zip(KeyStream::new(key)) {
        *unit ^= k;
    }
}

/// Decrypt one line of code units into a cleaned string.
///
/// Trailing NULs are stripped and the gender-symbol code points are replaced
/// with their Unicode glyphs. Unpaired surrogates become U+FFFD.
pub fn decrypt_line(units: &[u16], key: u16) -> String {
    let plain = units.iter().zip(KeyStream::new(key)).map(|(&u, k)| u ^ k);
    let text: String = char::decode_utf16(plain)
        .map(|c| remap(c.unwrap_or(char::REPLACEMENT_CHARACTER)))
        .collect();
    text.trim_end_matches('\0').to_owned()
}

/// Encrypt a string into code units for the given line key.
///
/// The inverse of [`decrypt_line`] for strings without trailing NULs;
/// gender glyphs are written back as their private-use code points.
pub fn encrypt_line(text: &str, key: u16) -> Vec<u16> {
    let mut units: Vec<u16> = text
        .chars()
        .map(unmap)
        .collect::<String>()
        .encode_utf16()
        .collect();
    apply_keystream(&mut units, key);
    units
}

#[inline]
fn remap(c: char) -> char {
    SYMBOL_REMAP
        .iter()
        .find(|(from, _)| *from == c)
        .map_or(c, |&(_, to)| to)
}

#[inline]
fn unmap(c: char) -> char {
    SYMBOL_REMAP
        .iter()
        .find(|(_, to)| *to == c)
        .map_or(c, |&(from, _)| from)
}
