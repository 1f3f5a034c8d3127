//! The type-driven encoder: canonical TOML text from a value tree, with
//! formatting replayed from the recorded [`TypeHint`]s.

#[cfg(test)]
#[path = "./encode_tests.rs"]
mod tests;

use crate::meta::{maybe_quoted, CommentPlacement, IntBase, Key, MetaData, TypeHint};
use crate::table::Table;
use crate::value::{Item, Value};
use std::fmt::{self, Write};

/// Error produced while encoding.
#[derive(Debug, Clone)]
pub struct EncodeError {
    /// What went wrong.
    pub kind: EncodeErrorKind,
    /// The key being written when the error occurred.
    pub key: Option<Key>,
}

impl std::error::Error for EncodeError {}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(key) = &self.key {
            if !key.is_empty() {
                write!(f, "key `{key}`: ")?;
            }
        }
        self.kind.fmt(f)
    }
}

/// The classes of encoder failure. The middle three are produced by host
/// adapters translating user records into the value tree; the core itself
/// cannot reach them but adapters need concrete values to return.
#[derive(Debug, Clone)]
pub enum EncodeErrorKind {
    /// The top-level value must be a table.
    NoKey,
    /// A literal string cannot hold a `'` or a raw newline.
    InvalidLiteralString,
    /// An array element was nil/absent on the host side.
    ArrayNilElement,
    /// A host map with non-string keys cannot become a TOML table.
    NonStringMapKey,
    /// An anonymous host value that is not a struct/table.
    AnonNonStruct,
    /// A host value with no TOML representation.
    UnsupportedType(&'static str),
    /// A host `to_toml`/`to_text` callback failed; the message is passed
    /// through unchanged.
    Callback(String),
    /// The output writer failed.
    Write,
}

impl fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoKey => f.write_str("top-level value must be a table"),
            Self::InvalidLiteralString => {
                f.write_str("literal strings cannot contain single quotes or newlines")
            }
            Self::ArrayNilElement => f.write_str("cannot encode array with nil element"),
            Self::NonStringMapKey => {
                f.write_str("cannot encode a map with non-string key type")
            }
            Self::AnonNonStruct => f.write_str("anonymous value must be a struct"),
            Self::UnsupportedType(name) => write!(f, "unsupported type: {name}"),
            Self::Callback(msg) => f.write_str(msg),
            Self::Write => f.write_str("writer error"),
        }
    }
}

impl From<fmt::Error> for EncodeError {
    fn from(_: fmt::Error) -> Self {
        EncodeError {
            kind: EncodeErrorKind::Write,
            key: None,
        }
    }
}

/// Host values that can render themselves into the value tree before
/// encoding. A failing implementation's error is wrapped unchanged as
/// [`EncodeErrorKind::Callback`].
pub trait ToToml {
    fn to_toml(&self) -> Result<Item, EncodeError>;
}

impl ToToml for Item {
    fn to_toml(&self) -> Result<Item, EncodeError> {
        Ok(self.clone())
    }
}

/// Encodes a value tree as canonical TOML with default settings.
pub fn to_string(root: &Table) -> Result<String, EncodeError> {
    Encoder::new().encode(root)
}

/// Encodes a value tree, replaying hints and comments from `meta`.
pub fn to_string_with_meta(root: &Table, meta: &MetaData) -> Result<String, EncodeError> {
    Encoder::new().meta(meta).encode(root)
}

/// A configurable TOML writer.
///
/// ```
/// # use toml_scribe::{Encoder, Table};
/// let mut root = Table::new();
/// root.insert("name", "toml");
/// let text = Encoder::new().encode(&root)?;
/// assert_eq!(text, "name = \"toml\"\n");
/// # Ok::<(), toml_scribe::EncodeError>(())
/// ```
pub struct Encoder<'m> {
    indent: String,
    meta: Option<&'m MetaData>,
}

impl Default for Encoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'m> Encoder<'m> {
    /// An encoder with two-space indentation and no metadata.
    pub fn new() -> Self {
        Encoder {
            indent: "  ".to_owned(),
            meta: None,
        }
    }

    /// Sets the string written per nesting level.
    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Attaches metadata whose comments are replayed while writing.
    pub fn meta(mut self, meta: &'m MetaData) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Encodes a table into a fresh string.
    pub fn encode(&self, root: &Table) -> Result<String, EncodeError> {
        let mut out = String::new();
        self.encode_to(root, &mut out)?;
        Ok(out)
    }

    /// Encodes an arbitrary item; the top level of a document must be a
    /// table.
    pub fn encode_item(&self, item: &Item) -> Result<String, EncodeError> {
        match item.as_table() {
            Some(table) => self.encode(table),
            None => Err(EncodeError {
                kind: EncodeErrorKind::NoKey,
                key: None,
            }),
        }
    }

    /// Encodes into a caller-supplied writer. Writer failures are returned
    /// verbatim as [`EncodeErrorKind::Write`].
    pub fn encode_to(&self, root: &Table, out: &mut dyn Write) -> Result<(), EncodeError> {
        let mut w = Writer {
            out,
            indent: &self.indent,
            meta: self.meta,
            has_written: false,
        };
        w.table_body(&Key::root(), root)
    }
}

struct Writer<'w, 'm> {
    out: &'w mut dyn Write,
    indent: &'m str,
    meta: Option<&'m MetaData>,
    has_written: bool,
}

impl Writer<'_, '_> {
    /// Writes one table: direct key/value pairs first in insertion order,
    /// then sub-tables and arrays of tables.
    fn table_body(&mut self, key: &Key, table: &Table) -> Result<(), EncodeError> {
        for (name, item) in table.iter() {
            if !is_sub_table(item) {
                self.pair(&key.join(name), item)?;
            }
        }
        for (name, item) in table.iter() {
            if !is_sub_table(item) {
                continue;
            }
            let sub_key = key.join(name);
            match &item.value {
                Value::Table(sub) => {
                    self.header(&sub_key, false)?;
                    self.table_body(&sub_key, sub)?;
                }
                Value::ArrayTable(tables) => {
                    for sub in tables {
                        self.header(&sub_key, true)?;
                        self.table_body(&sub_key, sub)?;
                    }
                }
                _ => unreachable!("is_sub_table matched a non-table"),
            }
        }
        Ok(())
    }

    fn pair(&mut self, key: &Key, item: &Item) -> Result<(), EncodeError> {
        let level = key.len().saturating_sub(1);
        self.doc_comments(key, level)?;
        self.write_indent(level).map_err(|e| self.err(e, key))?;
        let result: Result<(), EncodeError> = (|| {
            let name = key.last().expect("pair keys are never empty");
            write!(self.out, "{} = ", maybe_quoted(name))?;
            self.element(item, level)?;
            Ok(())
        })();
        result.map_err(|mut e| {
            e.key.get_or_insert_with(|| key.clone());
            e
        })?;
        self.inline_comment(key).map_err(|e| self.err(e, key))?;
        self.out.write_char('\n').map_err(|e| self.err(e, key))?;
        self.has_written = true;
        Ok(())
    }

    fn header(&mut self, key: &Key, array: bool) -> Result<(), EncodeError> {
        let level = key.len().saturating_sub(1);
        self.doc_comments(key, level)?;
        let result: Result<(), fmt::Error> = (|| {
            // A blank line separates every header from the previous block;
            // doc comments bring their own.
            if self.has_written {
                self.out.write_char('\n')?;
            }
            self.write_indent(level)?;
            if array {
                write!(self.out, "[[{}]]", key.to_quoted_string())?;
            } else {
                write!(self.out, "[{}]", key.to_quoted_string())?;
            }
            Ok(())
        })();
        result.map_err(|e| self.err(e, key))?;
        self.inline_comment(key).map_err(|e| self.err(e, key))?;
        self.out.write_char('\n').map_err(|e| self.err(e, key))?;
        self.has_written = true;
        Ok(())
    }

    fn doc_comments(&mut self, key: &Key, level: usize) -> Result<(), EncodeError> {
        let Some(meta) = self.meta else { return Ok(()) };
        let docs: Vec<&str> = meta
            .comments_for(key)
            .iter()
            .filter(|c| c.placement == CommentPlacement::Doc)
            .map(|c| c.text.as_str())
            .collect();
        if docs.is_empty() {
            return Ok(());
        }
        let result: Result<(), fmt::Error> = (|| {
            if self.has_written {
                self.out.write_char('\n')?;
                self.has_written = false;
            }
            for text in docs {
                for line in text.split('\n') {
                    self.write_indent(level)?;
                    if line.is_empty() {
                        self.out.write_str("#\n")?;
                    } else {
                        writeln!(self.out, "# {line}")?;
                    }
                }
            }
            Ok(())
        })();
        result.map_err(|e| self.err(e, key))
    }

    fn inline_comment(&mut self, key: &Key) -> Result<(), fmt::Error> {
        let Some(meta) = self.meta else { return Ok(()) };
        for c in meta.comments_for(key) {
            if c.placement == CommentPlacement::Inline {
                write!(self.out, "  # {}", c.text)?;
            }
        }
        Ok(())
    }

    fn write_indent(&mut self, level: usize) -> Result<(), fmt::Error> {
        for _ in 0..level {
            self.out.write_str(self.indent)?;
        }
        Ok(())
    }

    fn err(&self, _: fmt::Error, key: &Key) -> EncodeError {
        EncodeError {
            kind: EncodeErrorKind::Write,
            key: Some(key.clone()),
        }
    }

    /// Renders any value that can stand on the right of `=` or inside an
    /// array. `level` is the indentation depth of the enclosing line.
    fn element(&mut self, item: &Item, level: usize) -> Result<(), EncodeError> {
        match &item.value {
            Value::Boolean(b) => {
                write!(self.out, "{b}")?;
                Ok(())
            }
            Value::Integer(i) => self.integer(*i, item.hint),
            Value::Float(f) => self.float(*f, item.hint),
            Value::String(s) => self.string(s, item.hint),
            Value::Datetime(dt) => {
                write!(self.out, "{dt}")?;
                Ok(())
            }
            Value::Array(items) => self.array(items, item.hint, level),
            Value::Table(table) => self.inline_table(table),
            Value::ArrayTable(tables) => {
                // An array of tables in element position can only render
                // inline.
                self.out.write_char('[')?;
                for (i, t) in tables.iter().enumerate() {
                    if i > 0 {
                        self.out.write_str(", ")?;
                    }
                    self.inline_table(t)?;
                }
                self.out.write_char(']')?;
                Ok(())
            }
        }
    }

    fn integer(&mut self, value: i64, hint: TypeHint) -> Result<(), EncodeError> {
        let (base, width) = match hint {
            TypeHint::Integer { base, width } => (base, width as usize),
            _ => (IntBase::Decimal, 0),
        };
        // Non-decimal bases are unsigned in TOML; negative values fall
        // back to decimal.
        if value < 0 || base == IntBase::Decimal {
            write!(self.out, "{value}")?;
            return Ok(());
        }
        match base {
            IntBase::Hex => write!(self.out, "0x{value:0>width$x}")?,
            IntBase::Octal => write!(self.out, "0o{value:0>width$o}")?,
            IntBase::Binary => write!(self.out, "0b{value:0>width$b}")?,
            IntBase::Decimal => unreachable!(),
        }
        Ok(())
    }

    fn float(&mut self, value: f64, hint: TypeHint) -> Result<(), EncodeError> {
        if value.is_nan() {
            let s = if value.is_sign_negative() { "-nan" } else { "nan" };
            self.out.write_str(s)?;
            return Ok(());
        }
        if value.is_infinite() {
            let s = if value.is_sign_negative() { "-inf" } else { "+inf" };
            self.out.write_str(s)?;
            return Ok(());
        }
        if matches!(hint, TypeHint::Float { exponent: true }) {
            write!(self.out, "{value:e}")?;
            return Ok(());
        }
        let repr = format!("{value}");
        self.out.write_str(&repr)?;
        if !repr.contains(['.', 'e', 'E']) {
            // A float always shows a decimal point.
            self.out.write_str(".0")?;
        }
        Ok(())
    }

    fn string(&mut self, s: &str, hint: TypeHint) -> Result<(), EncodeError> {
        let (literal, multiline) = match hint {
            TypeHint::String { literal, multiline } => (literal, multiline),
            _ => (false, s.contains('\n')),
        };
        match (literal, multiline) {
            (true, false) => {
                if s.contains(['\'', '\n'])
                    || s.chars().any(|c| c.is_control() && c != '\t')
                {
                    return Err(EncodeError {
                        kind: EncodeErrorKind::InvalidLiteralString,
                        key: None,
                    });
                }
                write!(self.out, "'{s}'")?;
            }
            (true, true) => {
                if s.contains("'''")
                    || s.chars().any(|c| c.is_control() && c != '\t' && c != '\n')
                {
                    return Err(EncodeError {
                        kind: EncodeErrorKind::InvalidLiteralString,
                        key: None,
                    });
                }
                write!(self.out, "'''\n{s}'''")?;
            }
            (false, false) => {
                self.out.write_char('"')?;
                for c in s.chars() {
                    self.basic_escape(c)?;
                }
                self.out.write_char('"')?;
            }
            (false, true) => {
                self.out.write_str("\"\"\"\n")?;
                let mut quotes = 0u32;
                for c in s.chars() {
                    if c == '"' {
                        quotes += 1;
                        if quotes == 3 {
                            // Break up any run of three quotes.
                            self.out.write_str("\\\"")?;
                            quotes = 0;
                            continue;
                        }
                        self.out.write_char('"')?;
                        continue;
                    }
                    quotes = 0;
                    if c == '\n' {
                        self.out.write_char('\n')?;
                    } else {
                        self.basic_escape(c)?;
                    }
                }
                self.out.write_str("\"\"\"")?;
            }
        }
        Ok(())
    }

    fn basic_escape(&mut self, c: char) -> Result<(), fmt::Error> {
        match c {
            '\u{8}' => self.out.write_str("\\b"),
            '\t' => self.out.write_str("\\t"),
            '\n' => self.out.write_str("\\n"),
            '\u{c}' => self.out.write_str("\\f"),
            '\r' => self.out.write_str("\\r"),
            '"' => self.out.write_str("\\\""),
            '\\' => self.out.write_str("\\\\"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                write!(self.out, "\\u{:04X}", c as u32)
            }
            c => self.out.write_char(c),
        }
    }

    fn array(&mut self, items: &[Item], hint: TypeHint, level: usize) -> Result<(), EncodeError> {
        let single_line = match hint {
            TypeHint::Array { single_line } => single_line,
            _ => true,
        };
        if single_line {
            self.out.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    self.out.write_str(", ")?;
                }
                self.element(item, level)?;
            }
            self.out.write_char(']')?;
            return Ok(());
        }
        self.out.write_str("[\n")?;
        for item in items {
            self.write_indent(level + 1)?;
            self.element(item, level + 1)?;
            self.out.write_str(",\n")?;
        }
        self.write_indent(level)?;
        self.out.write_char(']')?;
        Ok(())
    }

    fn inline_table(&mut self, table: &Table) -> Result<(), EncodeError> {
        if table.is_empty() {
            self.out.write_str("{}")?;
            return Ok(());
        }
        self.out.write_str("{ ")?;
        for (i, (name, item)) in table.iter().enumerate() {
            if i > 0 {
                self.out.write_str(", ")?;
            }
            write!(self.out, "{} = ", maybe_quoted(name))?;
            match &item.value {
                // Nothing nested inside an inline table may break the line.
                Value::Table(t) => self.inline_table(t)?,
                Value::Array(elems) => {
                    self.out.write_char('[')?;
                    for (j, e) in elems.iter().enumerate() {
                        if j > 0 {
                            self.out.write_str(", ")?;
                        }
                        self.element(e, 0)?;
                    }
                    self.out.write_char(']')?;
                }
                _ => self.element(item, 0)?,
            }
        }
        self.out.write_str(" }")?;
        Ok(())
    }
}

/// Whether the entry renders as `[header]` / `[[header]]` sections rather
/// than as a `key = value` pair.
fn is_sub_table(item: &Item) -> bool {
    match &item.value {
        Value::Table(_) => item.hint != (TypeHint::Table { inline: true }),
        Value::ArrayTable(_) => item.hint != (TypeHint::ArrayTable { inline: true }),
        _ => false,
    }
}
