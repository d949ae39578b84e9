//! Parsers for GARC archives and the tables stored inside them.
//!
//! All parsers follow the same conventions:
//!
//! * **Generic over** [`std::io::Read`] + [`std::io::Seek`] - pass a [`std::fs::File`], a
//!   [`std::io::Cursor`], or anything else that implements both traits.
//! * **Metadata only** - the `parse` methods read headers and build an
//!   in-memory description of the contents. Payloads are never eagerly
//!   loaded.
//! * **Iterators borrow the reader** - [`garc::GarcReader`] hands out
//!   iterators that hold `&mut R` and seek before every read, so a new
//!   traversal can always be started from the beginning.
//! * **Interpretation is the caller's choice** - a GARC record carries no
//!   type tag. Whether it is raw data, a mini-archive or a text table
//!   depends on which archive it came from.
//!
//! ## Format overview
//!
//! | Module   | Format | Description |
//! |----------|--------|-------------|
//! | [`garc`] | GARC   | Top-level archive; flat list of records |
//! | [`mini`] | Mini-archive | A record holding a nested table of sub-records |
//! | [`text`] | Text table | A record holding XOR-encrypted UTF-16 lines |

pub mod garc;
pub mod mini;
pub mod text;
