//! A TOML v1.0.0 reader and writer that keeps the side-band information
//! most parsers throw away: document key order, per-value formatting
//! (integer base, string style, datetime shape, inline layout), comments
//! attached to keys, and the exact source position of everything.
//!
//! Decoding runs source text through a streaming lexer and a one-pass
//! parser into an owned value tree plus [`MetaData`]; encoding walks a
//! tree back to canonical TOML, replaying the recorded hints so documents
//! survive a round trip.
//!
//! # Quick start
//!
//! ```
//! # fn main() -> Result<(), toml_scribe::Error> {
//! let (root, meta) = toml_scribe::parse("key = 'value'")?;
//! assert_eq!(root.get("key").and_then(|v| v.as_str()), Some("value"));
//! assert_eq!(meta.keys().len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! Writing it back preserves formatting:
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let src = "mask = 0x00ff\nport = 8080\n";
//! let (root, meta) = toml_scribe::parse(src)?;
//! assert_eq!(toml_scribe::to_string_with_meta(&root, &meta)?, src);
//! # Ok(())
//! # }
//! ```
//!
//! # Decoding into host types
//!
//! The crate carries its own [`Deserialize`] trait so host records stay
//! out of the core. [`de::TableHelper`] handles field extraction and marks
//! what was consumed, leaving [`MetaData::undecoded`] for the rest.
//!
//! ```
//! use toml_scribe::{de::TableHelper, Context, Deserialize, Error, Item};
//!
//! struct Server {
//!     host: String,
//!     port: u16,
//! }
//!
//! impl Deserialize for Server {
//!     fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
//!         let mut th = TableHelper::new(ctx, value)?;
//!         let host = th.required("host")?;
//!         let port = th.optional("port")?.unwrap_or(8080);
//!         th.expect_empty()?;
//!         Ok(Server { host, port })
//!     }
//! }
//!
//! # fn main() -> Result<(), Error> {
//! let server: Server = toml_scribe::from_str("host = \"example.com\"\n")?;
//! assert_eq!(server.host, "example.com");
//! assert_eq!(server.port, 8080);
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Every error carries a [`Position`]; [`Error::to_string_with_usage`]
//! renders a caret-annotated snippet with targeted help for the common
//! mistakes (out-of-range integers, malformed datetimes, bad duration
//! units).
//!
//! ```text
//! toml: error: invalid datetime: "2006-01-30T"
//!              at line 1 col 5
//!
//!   1 | d = 2006-01-30T
//!     |     ^^^^^^^^^^^
//!
//! Error help:
//! ...
//! ```

pub mod de;
pub mod encode;
mod error;
mod lexer;
mod meta;
mod parser;
mod pos;
mod table;
mod time;
mod value;

pub use de::{from_str, from_str_with_meta, Context, Deserialize, Primitive};
pub use encode::{to_string, to_string_with_meta, EncodeError, EncodeErrorKind, Encoder, ToToml};
pub use error::{Error, ErrorKind};
pub use lexer::{Lexer, Token, TokenKind};
pub use meta::{Comment, CommentPlacement, IntBase, Key, MetaData, TypeHint};
pub use parser::{parse, parse_with, TomlVersion};
pub use pos::{Position, Source, Spanned};
pub use table::Table;
pub use time::{Date, Datetime, DatetimeKind, Time, TimeOffset};
pub use value::{Item, Value};

#[cfg(feature = "serde")]
pub mod impl_serde;
