//! Position-carrying errors and the snippet renderers.

#[cfg(test)]
#[path = "./error_tests.rs"]
mod tests;

use crate::meta::Key;
use crate::pos::{Position, Source};
use std::fmt::{self, Debug, Display, Write};

/// Error that can occur when reading or decoding TOML.
#[derive(Debug, Clone)]
pub struct Error {
    /// The error kind.
    pub kind: ErrorKind,
    /// The position where the error occurs.
    ///
    /// Note some [`ErrorKind`] carry additional position information.
    pub pos: Position,
    /// The key being processed when the error occurred, if the failure came
    /// from the decoder adapter.
    pub key: Option<Key>,
}

impl std::error::Error for Error {}

impl Error {
    pub(crate) fn new(kind: ErrorKind, pos: Position) -> Self {
        Self {
            kind,
            pos,
            key: None,
        }
    }

    pub(crate) fn with_key(kind: ErrorKind, pos: Position, key: Key) -> Self {
        Self {
            kind,
            pos,
            key: Some(key),
        }
    }
}

/// Everything that can go wrong while lexing, parsing, or decoding.
#[derive(Clone)]
pub enum ErrorKind {
    /// EOF was reached when looking for a value.
    UnexpectedEof,

    /// A NUL byte appeared in the first few bytes of the document, which
    /// almost always means the file is UTF-16 encoded.
    ProbablyUtf16,

    /// An invalid character not allowed in a string was found.
    InvalidCharInString(char),

    /// An invalid character was found as an escape.
    InvalidEscape(char),

    /// An invalid character was found in a hex escape.
    InvalidHexEscape(char),

    /// An invalid escape value was specified in a hex escape in a string.
    ///
    /// Valid values are in the plane of Unicode scalar values.
    InvalidEscapeValue(u32),

    /// An unexpected character was encountered, typically when looking for
    /// a value.
    Unexpected(char),

    /// An unterminated string was found where EOF was reached before the
    /// closing delimiter.
    UnterminatedString,

    /// A number failed to parse.
    InvalidNumber,

    /// An integer literal does not fit in 64 signed bits.
    IntegerOutOfRange {
        /// The number as written.
        text: String,
    },

    /// The number cannot be losslessly converted to the host number type.
    OutOfRange {
        /// The target type that could not hold the value.
        target: &'static str,
        /// The value as written or decoded.
        value: String,
    },

    /// A value looked like a datetime but matched none of the four shapes.
    InvalidDatetime {
        /// The text as written.
        text: String,
    },

    /// A duration string used an unknown unit or had no number.
    InvalidDuration {
        /// The text as written.
        input: String,
    },

    /// Wanted one sort of token, but found another.
    Wanted {
        /// Expected token type.
        expected: &'static str,
        /// Actually found token type.
        found: &'static str,
    },

    /// An array element was not followed by a comma or the closing bracket.
    ExpectedArraySeparator {
        /// The character found instead.
        found: char,
    },

    /// An inline-table entry was not followed by a comma or the closing
    /// brace.
    ExpectedInlineSeparator {
        /// The character found instead.
        found: char,
    },

    /// A newline inside an inline table (an error before v1.1).
    NewlineInInlineTable,

    /// A trailing comma inside an inline table (an error before v1.1).
    TrailingCommaInInlineTable,

    /// A duplicate table definition was found.
    DuplicateTable {
        /// The name of the duplicate table.
        name: String,
        /// The position where the table was first defined.
        first: Position,
    },

    /// Duplicate key in a table.
    DuplicateKey {
        /// The duplicate key.
        key: String,
        /// The position where the key was first defined.
        first: Position,
    },

    /// A previously defined table was redefined as an array.
    RedefineAsArray,

    /// Multiline strings are not allowed for keys.
    MultilineStringKey,

    /// Dotted key attempted to extend something that is not a table.
    DottedKeyInvalidType {
        /// The position where the non-table value was defined.
        first: Position,
    },

    /// Unquoted string was found when a value was expected.
    UnquotedString,

    /// A required field is missing from a table.
    MissingField(&'static str),

    /// Unexpected keys were encountered while decoding a closed table.
    UnexpectedKeys {
        /// The unexpected keys with their positions.
        keys: Vec<(String, Position)>,
    },

    /// A custom error from a host (un)marshaller, passed through with the
    /// current key and position attached.
    Custom(std::borrow::Cow<'static, str>),
}

impl ErrorKind {
    /// Targeted help text for the class of error, if the class has one.
    pub fn usage(&self) -> Option<&'static str> {
        match self {
            Self::IntegerOutOfRange { .. } | Self::OutOfRange { .. } => Some(
                "TOML integers are 64-bit signed; decoders may map them to\n\
                 narrower host types:\n\
                 \n\
                 \x20   int8   -128 to 127\n\
                 \x20   int16  -32,768 to 32,767\n\
                 \x20   int32  -2,147,483,648 to 2,147,483,647\n\
                 \x20   int64  -9.2 x 10^18 to 9.2 x 10^18\n\
                 \n\
                 unsigned types run from 0 to double the upper bound.",
            ),
            Self::InvalidDatetime { .. } => Some(
                "A TOML datetime must be in one of the following formats:\n\
                 \n\
                 \x20   2006-01-02T15:04:05Z07:00  offset datetime\n\
                 \x20   2006-01-02T15:04:05        local datetime\n\
                 \x20   2006-01-02                 local date\n\
                 \x20   15:04:05                   local time\n\
                 \n\
                 Seconds may carry a fractional part; 'T' may be a space.",
            ),
            Self::InvalidDuration { .. } => Some(
                "A duration is a decimal number with a unit suffix, such as\n\
                 \"300ms\", \"-1.5h\", or \"2h45m\". Valid units are \"ns\",\n\
                 \"us\" (or \"\u{b5}s\"), \"ms\", \"s\", \"m\", \"h\".",
            ),
            _ => None,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnexpectedEof => "unexpected-eof",
            Self::ProbablyUtf16 => "probably-utf16",
            Self::InvalidCharInString(..) => "invalid-char-in-string",
            Self::InvalidEscape(..) => "invalid-escape",
            Self::InvalidHexEscape(..) => "invalid-hex-escape",
            Self::InvalidEscapeValue(..) => "invalid-escape-value",
            Self::Unexpected(..) => "unexpected",
            Self::UnterminatedString => "unterminated-string",
            Self::InvalidNumber => "invalid-number",
            Self::IntegerOutOfRange { .. } => "integer-out-of-range",
            Self::OutOfRange { .. } => "out-of-range",
            Self::InvalidDatetime { .. } => "invalid-datetime",
            Self::InvalidDuration { .. } => "invalid-duration",
            Self::Wanted { .. } => "wanted",
            Self::ExpectedArraySeparator { .. } => "expected-array-separator",
            Self::ExpectedInlineSeparator { .. } => "expected-inline-separator",
            Self::NewlineInInlineTable => "newline-in-inline-table",
            Self::TrailingCommaInInlineTable => "trailing-comma-in-inline-table",
            Self::DuplicateTable { .. } => "duplicate-table",
            Self::DuplicateKey { .. } => "duplicate-key",
            Self::RedefineAsArray => "redefine-as-array",
            Self::MultilineStringKey => "multiline-string-key",
            Self::DottedKeyInvalidType { .. } => "dotted-key-invalid-type",
            Self::UnquotedString => "unquoted-string",
            Self::MissingField(..) => "missing-field",
            Self::UnexpectedKeys { .. } => "unexpected-keys",
            Self::Custom(..) => "custom",
        };
        f.write_str(text)
    }
}

impl Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

struct Escape(char);

impl fmt::Display for Escape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_whitespace() || self.0.is_control() {
            for esc in self.0.escape_default() {
                f.write_char(esc)?;
            }
            Ok(())
        } else {
            f.write_char(self.0)
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(key) = &self.key {
            if !key.is_empty() {
                write!(f, "key `{key}`: ")?;
            }
        }
        match &self.kind {
            ErrorKind::UnexpectedEof => f.write_str("unexpected eof encountered"),
            ErrorKind::ProbablyUtf16 => f.write_str(
                "files cannot contain NULL bytes; probably using UTF-16; \
                 TOML files must be UTF-8",
            ),
            ErrorKind::InvalidCharInString(c) => {
                write!(f, "invalid character in string: `{}`", Escape(*c))
            }
            ErrorKind::InvalidEscape(c) => write!(f, "invalid escape: '\\{}'", Escape(*c)),
            ErrorKind::InvalidHexEscape(c) => {
                write!(f, "invalid hex escape character: `{}`", Escape(*c))
            }
            ErrorKind::InvalidEscapeValue(c) => {
                write!(f, "invalid escape value: `{c}` is not a Unicode scalar value")
            }
            ErrorKind::Unexpected(c) => {
                write!(f, "unexpected character found: `{}`", Escape(*c))
            }
            ErrorKind::UnterminatedString => f.write_str("unterminated string"),
            ErrorKind::InvalidNumber => f.write_str("invalid number"),
            ErrorKind::IntegerOutOfRange { text } => {
                write!(f, "{text} is out of range for int64")
            }
            ErrorKind::OutOfRange { target, value } => {
                write!(f, "{value} is out of range for {target}")
            }
            ErrorKind::InvalidDatetime { text } => write!(f, "invalid datetime: \"{text}\""),
            ErrorKind::InvalidDuration { input } => {
                write!(f, "invalid duration: \"{input}\"")
            }
            ErrorKind::Wanted { expected, found } => {
                write!(f, "expected {expected}, but got {found}")
            }
            ErrorKind::ExpectedArraySeparator { found } => write!(
                f,
                "expected a comma (',') or array terminator (']'), but got '{}'",
                Escape(*found)
            ),
            ErrorKind::ExpectedInlineSeparator { found } => write!(
                f,
                "expected a comma (',') or an inline table terminator ('}}'), but got '{}'",
                Escape(*found)
            ),
            ErrorKind::NewlineInInlineTable => {
                f.write_str("newlines are not allowed within inline tables")
            }
            ErrorKind::TrailingCommaInInlineTable => {
                f.write_str("trailing commas are not allowed within inline tables")
            }
            ErrorKind::DuplicateTable { name, .. } => {
                write!(f, "table `{name}` has already been defined")
            }
            ErrorKind::DuplicateKey { key, .. } => {
                write!(f, "key `{key}` has already been defined")
            }
            ErrorKind::RedefineAsArray => f.write_str("table redefined as array"),
            ErrorKind::MultilineStringKey => {
                f.write_str("multiline strings are not allowed for key")
            }
            ErrorKind::DottedKeyInvalidType { .. } => {
                f.write_str("dotted key attempted to extend non-table type")
            }
            ErrorKind::UnquotedString => {
                f.write_str("invalid TOML value, did you mean to use a quoted string?")
            }
            ErrorKind::MissingField(field) => {
                write!(f, "missing field '{field}' in table")
            }
            ErrorKind::UnexpectedKeys { keys } => {
                f.write_str("unexpected keys in table: [")?;
                for (i, (key, _)) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "\"{key}\"")?;
                }
                f.write_str("]")
            }
            ErrorKind::Custom(message) => f.write_str(message),
        }
    }
}

impl Error {
    /// Single-line rendering: `toml: error: <message> at line L col C`.
    pub fn to_short_string(&self) -> String {
        format!(
            "toml: error: {} at line {} col {}",
            self, self.pos.line, self.pos.col
        )
    }

    /// Multi-line rendering with a two-line source snippet and a caret
    /// under the reported span.
    pub fn to_string_with_position(&self, src: &Source<'_>) -> String {
        let mut out = String::new();
        self.render_position(src, &mut out);
        out
    }

    /// [`Error::to_string_with_position`] followed by an "Error help:"
    /// section when the error class has targeted help text.
    pub fn to_string_with_usage(&self, src: &Source<'_>) -> String {
        let mut out = String::new();
        self.render_position(src, &mut out);
        if let Some(usage) = self.kind.usage() {
            out.push_str("Error help:\n\n");
            for line in usage.lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    fn render_position(&self, src: &Source<'_>, out: &mut String) {
        let line = self.pos.line;
        let col = self.pos.col;
        let _ = writeln!(out, "toml: error: {self}");
        let _ = writeln!(out, "             at line {line} col {col}");
        out.push('\n');

        let gutter = line_number_width(line);
        if line > 1 {
            let _ = writeln!(
                out,
                "  {:>gutter$} | {}",
                line - 1,
                src.line(line - 1),
                gutter = gutter
            );
        }
        let err_line = src.line(line);
        let _ = writeln!(out, "  {:>gutter$} | {}", line, err_line, gutter = gutter);

        // Caret under the reported span, clamped to the line it starts on.
        let avail = err_line.len().saturating_sub(col as usize - 1);
        let carets = (self.pos.len as usize).clamp(1, avail.max(1));
        let _ = writeln!(
            out,
            "  {:>gutter$} | {}{}",
            "",
            " ".repeat(col as usize - 1),
            "^".repeat(carets),
            gutter = gutter
        );
        out.push('\n');
    }
}

fn line_number_width(line: u32) -> usize {
    let mut width = 1;
    let mut n = line;
    while n >= 10 {
        width += 1;
        n /= 10;
    }
    width
}

#[cfg(feature = "reporting")]
#[cfg_attr(docsrs, doc(cfg(feature = "reporting")))]
impl Error {
    /// Converts this [`Error`] into a
    /// [`codespan_reporting::diagnostic::Diagnostic`].
    pub fn to_diagnostic<FileId: Copy + PartialEq>(
        &self,
        fid: FileId,
    ) -> codespan_reporting::diagnostic::Diagnostic<FileId> {
        use codespan_reporting::diagnostic::{Diagnostic, Label};

        let diag = Diagnostic::error().with_code(self.kind.to_string());
        let primary = Label::primary(fid, self.pos.span());

        match &self.kind {
            ErrorKind::DuplicateKey { first, .. } => {
                diag.with_message(self.to_string()).with_labels(vec![
                    Label::secondary(fid, first.span()).with_message("first key instance"),
                    primary.with_message("duplicate key"),
                ])
            }
            ErrorKind::DuplicateTable { first, .. } => {
                diag.with_message(self.to_string()).with_labels(vec![
                    Label::secondary(fid, first.span()).with_message("first table instance"),
                    primary.with_message("duplicate table"),
                ])
            }
            ErrorKind::DottedKeyInvalidType { first } => {
                diag.with_message(self.to_string()).with_labels(vec![
                    primary.with_message("attempted to extend table here"),
                    Label::secondary(fid, first.span()).with_message("non-table"),
                ])
            }
            ErrorKind::UnexpectedKeys { keys } => diag.with_message(self.to_string()).with_labels(
                keys.iter()
                    .map(|(_, p)| Label::secondary(fid, p.span()))
                    .collect(),
            ),
            _ => diag.with_message(self.to_string()).with_labels(vec![primary]),
        }
    }
}
