//! Cipher used by GARC text tables.
//!
//! Strings are stored as UTF-16 code units XORed with a keystream. The
//! keystream is cheap to regenerate, so decryption never caches it; each
//! line restarts the stream from its own key.
//!
//! The implementation is intended for **offline file-format parsing**
//! only. It is an obfuscation layer, not a cryptographic primitive.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`text`] | 16-bit rotating keystream, per-line key evolution, line decryption |
//!
//! ## Key schedule (brief)
//!
//! ```text
//! line 0 key = base                      (0x7C89)
//! line n key = line n-1 key + advance    (0x2983, mod 0x10000)
//!
//! keystream for one line:
//!   k[0]   = line key
//!   k[i+1] = rotl16(k[i], 3)
//! ```

pub mod text;
