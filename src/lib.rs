//! **garckit** - a Rust library for reading Nintendo 3DS GARC archives.
//!
//! # Supported formats
//! | Module | Format |
//! |--------|--------|
//! | [`formats::garc`] | GARC - record archive (`CRAG`/`OTAF`/`BTAF`/`BMIF`) |
//! | [`formats::mini`] | Mini-archive - nested sub-record table |
//! | [`formats::text`] | Text table - encrypted UTF-16 lines |
//!
//! Fixed-size records are decoded into named values with [`schema`].
//!
//! ```no_run
//! use garckit::formats::garc::GarcReader;
//! use garckit::schema::presets;
//!
//! let mut personal = GarcReader::open("romfs/a/0/1/7")?;
//! let schema = presets::personal()?;
//! for raw in personal.records() {
//!     let raw = raw?;
//!     if schema.matches(&raw) {
//!         println!("{:?}", schema.decode(&raw)?);
//!     }
//! }
//!
//! let mut text = GarcReader::open("romfs/a/0/3/2")?;
//! let species: Vec<String> = text.strings(60)?.collect::<garckit::Result<_>>()?;
//! # Ok::<(), garckit::Error>(())
//! ```

pub mod crypto;
pub mod error;
pub mod formats;
pub mod schema;
pub(crate) mod utils;

pub use error::{Error, Result, Section};
