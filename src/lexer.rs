//! Streaming tokenizer for TOML source text.
//!
//! The lexer is a pull-based state machine: [`Lexer::next`] runs state
//! steps until a token is ready. State is strictly forward-moving; balanced
//! constructs (arrays, inline tables) are tracked with an explicit state
//! stack, never recursion. The lexer stays zero-copy: string tokens borrow
//! the content between the delimiters and escape decoding is left to the
//! parser, flagged through [`TokenKind::BasicStringEsc`].

#[cfg(test)]
#[path = "./lexer_tests.rs"]
mod tests;

use crate::error::{Error, ErrorKind};
use crate::parser::TomlVersion;
use crate::pos::Position;
use std::collections::VecDeque;

/// The classification of a [`Token`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// A lexical error; the lexer holds the details until
    /// [`Lexer::take_error`] is called.
    Error,
    /// End of input. Emitted exactly once.
    Eof,
    /// A bare key segment or a comment body.
    BareText,
    /// A `"..."` string with no escape sequences; usable as-is.
    BasicString,
    /// A `"..."` string containing escapes; requires an unescape pass.
    BasicStringEsc,
    /// A `'...'` string.
    LiteralString,
    /// A `"""..."""` string. Always unescaped by the parser.
    MultilineBasicString,
    /// A `'''...'''` string.
    MultilineLiteralString,
    /// `true` or `false`.
    Bool,
    /// An integer shape (validated by the parser).
    Integer,
    /// A float shape, including `inf` and `nan`.
    Float,
    /// A datetime shape (validated by the parser).
    Datetime,
    /// `[` at value position.
    ArrayOpen,
    /// `]` closing an array value.
    ArrayClose,
    /// `[` opening a table header.
    TableOpen,
    /// `]` closing a table header.
    TableClose,
    /// `[[` opening an array-of-tables header.
    ArrayTableOpen,
    /// `]]` closing an array-of-tables header.
    ArrayTableClose,
    /// `{` at value position.
    InlineTableOpen,
    /// `}` closing an inline table.
    InlineTableClose,
    /// Zero-width marker before a key path.
    KeyStart,
    /// Marker at the `=` ending a key path.
    KeyEnd,
    /// The `#` beginning a comment; followed by a `BareText` body.
    CommentStart,
    /// A run of spaces and tabs.
    Whitespace,
}

/// One lexed token. `text` borrows from the input; for strings it is the
/// content between the delimiters.
#[derive(Copy, Clone, Debug)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub pos: Position,
}

#[derive(Copy, Clone, Debug)]
enum State {
    /// Start of a top-level line.
    Top,
    /// Inside `[...]` / `[[...]]`, expecting a key segment.
    TableName { array: bool },
    /// After a header segment: expecting `.` or `]`.
    TableNameSep { array: bool },
    /// Expecting a key segment (top level or inline table).
    KeyName,
    /// After a key segment: expecting `.` or `=`.
    KeySep,
    /// Expecting a value.
    Value,
    /// After a top-level value or header: whitespace, optional comment,
    /// then newline or EOF.
    LineEnd,
    /// Inside an array, expecting a value or `]`.
    ArrayValue,
    /// Inside an array after a value: expecting `,` or `]`.
    ArrayValueEnd,
    /// Inside an inline table, expecting a key or `}`.
    InlineKey { after_comma: bool },
    /// Inside an inline table after a value: expecting `,` or `}`.
    InlineValueEnd,
}

#[derive(Copy, Clone)]
struct Mark {
    at: usize,
    line: u32,
    col: u32,
}

/// The streaming tokenizer.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    cursor: usize,
    line: u32,
    line_start: usize,
    version: TomlVersion,
    state: State,
    stack: Vec<State>,
    queue: VecDeque<Token<'a>>,
    error: Option<Error>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `input`, stripping a UTF-8 BOM and rejecting
    /// inputs whose first bytes contain NUL (a UTF-16 tell).
    pub fn new(input: &'a str, version: TomlVersion) -> Self {
        let bytes = input.as_bytes();
        let cursor = if bytes.starts_with(b"\xef\xbb\xbf") { 3 } else { 0 };
        let error = if bytes.iter().take(6).any(|&b| b == 0) {
            Some(Error::new(
                ErrorKind::ProbablyUtf16,
                Position::new(1, 1, 0, 1),
            ))
        } else {
            None
        };
        Lexer {
            input,
            bytes,
            cursor,
            line: 1,
            line_start: cursor,
            version,
            state: State::Top,
            stack: Vec::new(),
            queue: VecDeque::new(),
            error,
            finished: false,
        }
    }

    /// Returns the next token. After the single `Eof` (or an `Error`)
    /// token, further calls repeat it.
    pub fn next(&mut self) -> Token<'a> {
        loop {
            if let Some(tok) = self.queue.pop_front() {
                return tok;
            }
            if self.finished {
                let kind = if self.error.is_some() {
                    TokenKind::Error
                } else {
                    TokenKind::Eof
                };
                return self.zero_width(kind);
            }
            if let Some(err) = &self.error {
                let pos = err.pos;
                self.finished = true;
                return Token {
                    kind: TokenKind::Error,
                    text: "",
                    pos,
                };
            }
            if let Err(err) = self.step() {
                let pos = err.pos;
                self.error = Some(err);
                self.finished = true;
                return Token {
                    kind: TokenKind::Error,
                    text: "",
                    pos,
                };
            }
        }
    }

    /// Takes the error backing the last `Error` token.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    fn zero_width(&self, kind: TokenKind) -> Token<'a> {
        Token {
            kind,
            text: "",
            pos: Position::new(
                self.line,
                (self.cursor - self.line_start) as u32 + 1,
                self.cursor as u32,
                0,
            ),
        }
    }

    // Cursor helpers.

    #[inline]
    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.cursor).copied()
    }

    #[inline]
    fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.cursor + offset).copied()
    }

    #[inline]
    fn eat_byte(&mut self, b: u8) -> bool {
        if self.peek_byte() == Some(b) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Consumes `width` bytes of newline and starts a fresh line.
    fn advance_newline(&mut self, width: usize) {
        self.cursor += width;
        self.line += 1;
        self.line_start = self.cursor;
    }

    fn mark(&self) -> Mark {
        Mark {
            at: self.cursor,
            line: self.line,
            col: (self.cursor - self.line_start) as u32 + 1,
        }
    }

    fn pos_from(&self, m: Mark) -> Position {
        Position::new(m.line, m.col, m.at as u32, (self.cursor - m.at) as u32)
    }

    fn pos_at(&self, at: usize, len: usize) -> Position {
        Position::new(
            self.line,
            (at - self.line_start) as u32 + 1,
            at as u32,
            len as u32,
        )
    }

    fn token_at(&self, kind: TokenKind, text: &'a str, m: Mark) -> Token<'a> {
        Token {
            kind,
            text,
            pos: self.pos_from(m),
        }
    }

    fn emit(&mut self, tok: Token<'a>) {
        self.queue.push_back(tok);
    }

    fn emit_span(&mut self, kind: TokenKind, m: Mark) {
        let text = &self.input[m.at..self.cursor];
        let tok = self.token_at(kind, text, m);
        self.emit(tok);
    }

    fn emit_eof(&mut self) {
        let tok = self.zero_width(TokenKind::Eof);
        self.emit(tok);
        self.finished = true;
    }

    fn char_at(&self, at: usize) -> char {
        self.input
            .get(at..)
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn skip_whitespace_emit(&mut self) {
        let m = self.mark();
        while matches!(self.peek_byte(), Some(b' ' | b'\t')) {
            self.cursor += 1;
        }
        if self.cursor > m.at {
            self.emit_span(TokenKind::Whitespace, m);
        }
    }

    fn skip_whitespace_silent(&mut self) {
        while matches!(self.peek_byte(), Some(b' ' | b'\t')) {
            self.cursor += 1;
        }
    }

    /// Describes the "token" at the cursor for error messages, together
    /// with its end offset for the error span.
    fn describe_ahead(&self) -> (&'static str, usize) {
        let Some(b) = self.peek_byte() else {
            return ("eof", self.bytes.len());
        };
        match b {
            b'\n' => ("a newline", self.cursor + 1),
            b'\r' => ("a carriage return", self.cursor + 1),
            b' ' | b'\t' => {
                let mut end = self.cursor + 1;
                while end < self.bytes.len()
                    && (self.bytes[end] == b' ' || self.bytes[end] == b'\t')
                {
                    end += 1;
                }
                ("whitespace", end)
            }
            b'#' => ("a comment", self.cursor + 1),
            b'=' => ("an equals", self.cursor + 1),
            b'.' => ("a period", self.cursor + 1),
            b',' => ("a comma", self.cursor + 1),
            b':' => ("a colon", self.cursor + 1),
            b'+' => ("a plus", self.cursor + 1),
            b'{' => ("a left brace", self.cursor + 1),
            b'}' => ("a right brace", self.cursor + 1),
            b'[' => ("a left bracket", self.cursor + 1),
            b']' => ("a right bracket", self.cursor + 1),
            b'\'' | b'"' => ("a string", self.cursor + 1),
            _ if is_keylike_byte(b) => {
                let mut end = self.cursor + 1;
                while end < self.bytes.len() && is_keylike_byte(self.bytes[end]) {
                    end += 1;
                }
                ("an identifier", end)
            }
            _ => ("a character", self.cursor + 1),
        }
    }

    fn wanted_here(&self, expected: &'static str) -> Error {
        let (found, end) = self.describe_ahead();
        Error::new(
            ErrorKind::Wanted { expected, found },
            self.pos_at(self.cursor, end - self.cursor),
        )
    }

    fn pop_state(&mut self) -> State {
        self.stack.pop().expect("value state always has a return state")
    }

    // State steps.

    fn step(&mut self) -> Result<(), Error> {
        match self.state {
            State::Top => self.lex_top(),
            State::TableName { array } => self.lex_table_name(array),
            State::TableNameSep { array } => self.lex_table_name_sep(array),
            State::KeyName => self.lex_key_name(),
            State::KeySep => self.lex_key_sep(),
            State::Value => self.lex_value(),
            State::LineEnd => self.lex_line_end(),
            State::ArrayValue => self.lex_array_value(),
            State::ArrayValueEnd => self.lex_array_value_end(),
            State::InlineKey { after_comma } => self.lex_inline_key(after_comma),
            State::InlineValueEnd => self.lex_inline_value_end(),
        }
    }

    fn lex_top(&mut self) -> Result<(), Error> {
        self.skip_whitespace_emit();
        match self.peek_byte() {
            None => self.emit_eof(),
            Some(b'\n') => self.advance_newline(1),
            Some(b'\r') => {
                if self.peek_byte_at(1) == Some(b'\n') {
                    self.advance_newline(2);
                } else {
                    return Err(Error::new(
                        ErrorKind::Unexpected('\r'),
                        self.pos_at(self.cursor, 1),
                    ));
                }
            }
            Some(b'#') => self.lex_comment()?,
            Some(b'[') => {
                let m = self.mark();
                self.cursor += 1;
                let array = self.eat_byte(b'[');
                let kind = if array {
                    TokenKind::ArrayTableOpen
                } else {
                    TokenKind::TableOpen
                };
                self.emit_span(kind, m);
                self.state = State::TableName { array };
            }
            Some(_) => {
                let tok = self.zero_width(TokenKind::KeyStart);
                self.emit(tok);
                self.stack.push(State::LineEnd);
                self.state = State::KeyName;
            }
        }
        Ok(())
    }

    /// Emits the `CommentStart` / `BareText` pair for a `#` comment. The
    /// terminating newline is left for the surrounding state.
    fn lex_comment(&mut self) -> Result<(), Error> {
        let m = self.mark();
        self.cursor += 1;
        self.emit_span(TokenKind::CommentStart, m);
        let body = self.mark();
        loop {
            match self.peek_byte() {
                None | Some(b'\n') => break,
                Some(b'\r') if self.peek_byte_at(1) == Some(b'\n') => break,
                Some(0x09) | Some(0x20..=0x7E) | Some(0x80..=0xFF) => self.cursor += 1,
                Some(b) => {
                    return Err(Error::new(
                        ErrorKind::Unexpected(b as char),
                        self.pos_at(self.cursor, 1),
                    ));
                }
            }
        }
        self.emit_span(TokenKind::BareText, body);
        Ok(())
    }

    fn lex_table_name(&mut self, array: bool) -> Result<(), Error> {
        self.skip_whitespace_silent();
        let tok = self.scan_key_segment()?;
        self.emit(tok);
        self.state = State::TableNameSep { array };
        Ok(())
    }

    fn lex_table_name_sep(&mut self, array: bool) -> Result<(), Error> {
        self.skip_whitespace_silent();
        match self.peek_byte() {
            Some(b'.') => {
                self.cursor += 1;
                self.state = State::TableName { array };
                Ok(())
            }
            Some(b']') => {
                let m = self.mark();
                self.cursor += 1;
                if array {
                    if !self.eat_byte(b']') {
                        return Err(self.wanted_here("a right bracket (']]')"));
                    }
                    self.emit_span(TokenKind::ArrayTableClose, m);
                } else {
                    self.emit_span(TokenKind::TableClose, m);
                }
                self.state = State::LineEnd;
                Ok(())
            }
            _ => Err(self.wanted_here("a period ('.') or a right bracket (']')")),
        }
    }

    fn lex_key_name(&mut self) -> Result<(), Error> {
        self.skip_whitespace_silent();
        let tok = self.scan_key_segment()?;
        self.emit(tok);
        self.state = State::KeySep;
        Ok(())
    }

    fn lex_key_sep(&mut self) -> Result<(), Error> {
        self.skip_whitespace_silent();
        match self.peek_byte() {
            Some(b'.') => {
                self.cursor += 1;
                self.state = State::KeyName;
                Ok(())
            }
            Some(b'=') => {
                let m = self.mark();
                self.cursor += 1;
                self.emit_span(TokenKind::KeyEnd, m);
                self.state = State::Value;
                Ok(())
            }
            _ => Err(self.wanted_here("an equals ('=')")),
        }
    }

    fn lex_value(&mut self) -> Result<(), Error> {
        self.skip_whitespace_silent();
        match self.peek_byte() {
            None => Err(Error::new(
                ErrorKind::UnexpectedEof,
                self.pos_at(self.bytes.len(), 0),
            )),
            Some(b'\n') | Some(b'\r') => Err(self.wanted_here("a value")),
            Some(delim @ (b'"' | b'\'')) => {
                let tok = self.scan_string(delim)?;
                self.emit(tok);
                self.state = self.pop_state();
                Ok(())
            }
            Some(b'{') => {
                let m = self.mark();
                self.cursor += 1;
                self.emit_span(TokenKind::InlineTableOpen, m);
                self.state = State::InlineKey { after_comma: false };
                Ok(())
            }
            Some(b'[') => {
                let m = self.mark();
                self.cursor += 1;
                self.emit_span(TokenKind::ArrayOpen, m);
                self.state = State::ArrayValue;
                Ok(())
            }
            Some(_) => {
                let tok = self.scan_scalar()?;
                self.emit(tok);
                self.state = self.pop_state();
                Ok(())
            }
        }
    }

    fn lex_line_end(&mut self) -> Result<(), Error> {
        self.skip_whitespace_emit();
        match self.peek_byte() {
            None => {
                self.emit_eof();
                Ok(())
            }
            Some(b'#') => {
                self.lex_comment()?;
                self.state = State::Top;
                Ok(())
            }
            Some(b'\n') => {
                self.advance_newline(1);
                self.state = State::Top;
                Ok(())
            }
            Some(b'\r') if self.peek_byte_at(1) == Some(b'\n') => {
                self.advance_newline(2);
                self.state = State::Top;
                Ok(())
            }
            _ => Err(self.wanted_here("a newline")),
        }
    }

    fn lex_array_value(&mut self) -> Result<(), Error> {
        loop {
            self.skip_whitespace_emit();
            match self.peek_byte() {
                Some(b'\n') => self.advance_newline(1),
                Some(b'\r') if self.peek_byte_at(1) == Some(b'\n') => self.advance_newline(2),
                Some(b'#') => self.lex_comment()?,
                Some(b']') => {
                    let m = self.mark();
                    self.cursor += 1;
                    self.emit_span(TokenKind::ArrayClose, m);
                    self.state = self.pop_state();
                    return Ok(());
                }
                None => {
                    return Err(Error::new(
                        ErrorKind::UnexpectedEof,
                        self.pos_at(self.bytes.len(), 0),
                    ));
                }
                Some(b'\r') => {
                    return Err(Error::new(
                        ErrorKind::Unexpected('\r'),
                        self.pos_at(self.cursor, 1),
                    ));
                }
                Some(_) => {
                    self.stack.push(State::ArrayValueEnd);
                    self.state = State::Value;
                    return Ok(());
                }
            }
        }
    }

    fn lex_array_value_end(&mut self) -> Result<(), Error> {
        loop {
            self.skip_whitespace_emit();
            match self.peek_byte() {
                Some(b'\n') => self.advance_newline(1),
                Some(b'\r') if self.peek_byte_at(1) == Some(b'\n') => self.advance_newline(2),
                Some(b'#') => self.lex_comment()?,
                Some(b',') => {
                    self.cursor += 1;
                    self.state = State::ArrayValue;
                    return Ok(());
                }
                Some(b']') => {
                    let m = self.mark();
                    self.cursor += 1;
                    self.emit_span(TokenKind::ArrayClose, m);
                    self.state = self.pop_state();
                    return Ok(());
                }
                None => {
                    return Err(Error::new(
                        ErrorKind::UnexpectedEof,
                        self.pos_at(self.bytes.len(), 0),
                    ));
                }
                Some(_) => {
                    let (_, end) = self.describe_ahead();
                    return Err(Error::new(
                        ErrorKind::ExpectedArraySeparator {
                            found: self.char_at(self.cursor),
                        },
                        self.pos_at(self.cursor, end - self.cursor),
                    ));
                }
            }
        }
    }

    fn lex_inline_key(&mut self, after_comma: bool) -> Result<(), Error> {
        loop {
            self.skip_whitespace_emit();
            match self.peek_byte() {
                Some(b'\n') | Some(b'\r')
                    if self.version == TomlVersion::V1_1 && self.at_newline() =>
                {
                    self.eat_any_newline();
                }
                Some(b'#') if self.version == TomlVersion::V1_1 => self.lex_comment()?,
                Some(b'\n') | Some(b'\r') if self.at_newline() => {
                    return Err(Error::new(
                        ErrorKind::NewlineInInlineTable,
                        self.pos_at(self.cursor, 1),
                    ));
                }
                Some(b'}') => {
                    if after_comma && self.version == TomlVersion::V1_0 {
                        return Err(Error::new(
                            ErrorKind::TrailingCommaInInlineTable,
                            self.pos_at(self.cursor, 1),
                        ));
                    }
                    let m = self.mark();
                    self.cursor += 1;
                    self.emit_span(TokenKind::InlineTableClose, m);
                    self.state = self.pop_state();
                    return Ok(());
                }
                None => {
                    return Err(Error::new(
                        ErrorKind::UnexpectedEof,
                        self.pos_at(self.bytes.len(), 0),
                    ));
                }
                Some(_) => {
                    let tok = self.zero_width(TokenKind::KeyStart);
                    self.emit(tok);
                    self.stack.push(State::InlineValueEnd);
                    self.state = State::KeyName;
                    return Ok(());
                }
            }
        }
    }

    fn lex_inline_value_end(&mut self) -> Result<(), Error> {
        loop {
            self.skip_whitespace_emit();
            match self.peek_byte() {
                Some(b'\n') | Some(b'\r')
                    if self.version == TomlVersion::V1_1 && self.at_newline() =>
                {
                    self.eat_any_newline();
                }
                Some(b'#') if self.version == TomlVersion::V1_1 => self.lex_comment()?,
                Some(b'\n') | Some(b'\r') if self.at_newline() => {
                    return Err(Error::new(
                        ErrorKind::NewlineInInlineTable,
                        self.pos_at(self.cursor, 1),
                    ));
                }
                Some(b',') => {
                    self.cursor += 1;
                    self.state = State::InlineKey { after_comma: true };
                    return Ok(());
                }
                Some(b'}') => {
                    let m = self.mark();
                    self.cursor += 1;
                    self.emit_span(TokenKind::InlineTableClose, m);
                    self.state = self.pop_state();
                    return Ok(());
                }
                None => {
                    return Err(Error::new(
                        ErrorKind::UnexpectedEof,
                        self.pos_at(self.bytes.len(), 0),
                    ));
                }
                Some(_) => {
                    let (_, end) = self.describe_ahead();
                    return Err(Error::new(
                        ErrorKind::ExpectedInlineSeparator {
                            found: self.char_at(self.cursor),
                        },
                        self.pos_at(self.cursor, end - self.cursor),
                    ));
                }
            }
        }
    }

    fn at_newline(&self) -> bool {
        match self.peek_byte() {
            Some(b'\n') => true,
            Some(b'\r') => self.peek_byte_at(1) == Some(b'\n'),
            _ => false,
        }
    }

    fn eat_any_newline(&mut self) {
        match self.peek_byte() {
            Some(b'\n') => self.advance_newline(1),
            Some(b'\r') => self.advance_newline(2),
            _ => {}
        }
    }

    // Scanners.

    /// A quoted or bare key segment. Quoted segments must be single-line.
    fn scan_key_segment(&mut self) -> Result<Token<'a>, Error> {
        match self.peek_byte() {
            None => Err(self.wanted_here("a table key")),
            Some(delim @ (b'"' | b'\'')) => {
                let tok = self.scan_string(delim)?;
                match tok.kind {
                    TokenKind::MultilineBasicString | TokenKind::MultilineLiteralString => {
                        Err(Error::new(ErrorKind::MultilineStringKey, tok.pos))
                    }
                    _ => Ok(tok),
                }
            }
            Some(b) if is_keylike_byte(b) || self.bare_unicode_start() => {
                let m = self.mark();
                self.eat_bare_key();
                let text = &self.input[m.at..self.cursor];
                Ok(self.token_at(TokenKind::BareText, text, m))
            }
            _ => Err(self.wanted_here("a table key")),
        }
    }

    fn bare_unicode_start(&self) -> bool {
        self.version == TomlVersion::V1_1
            && self
                .peek_byte()
                .is_some_and(|b| b >= 0x80 && self.char_at(self.cursor).is_alphanumeric())
    }

    fn eat_bare_key(&mut self) {
        loop {
            match self.peek_byte() {
                Some(b) if is_keylike_byte(b) => self.cursor += 1,
                Some(b) if b >= 0x80 && self.version == TomlVersion::V1_1 => {
                    let c = self.char_at(self.cursor);
                    if c.is_alphanumeric() {
                        self.cursor += c.len_utf8();
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    /// Scans a string of either quote kind, single-line or multiline. The
    /// cursor sits on the opening delimiter. Escape sequences are validated
    /// against the escape alphabet but left encoded; control characters and
    /// bad line endings are rejected here.
    fn scan_string(&mut self, delim: u8) -> Result<Token<'a>, Error> {
        let m = self.mark();
        self.cursor += 1;
        let mut multiline = false;
        if self.eat_byte(delim) {
            if self.eat_byte(delim) {
                multiline = true;
            } else {
                let kind = if delim == b'"' {
                    TokenKind::BasicString
                } else {
                    TokenKind::LiteralString
                };
                // Empty content, sliced from the input so the parser can
                // relate it back to a source offset.
                let text = &self.input[m.at + 1..m.at + 1];
                return Ok(self.token_at(kind, text, m));
            }
        }

        let mut content_start = self.cursor;
        if multiline {
            if self.at_newline() {
                self.eat_any_newline();
                content_start = self.cursor;
            } else if self.peek_byte() == Some(b'\r') {
                return Err(Error::new(
                    ErrorKind::InvalidCharInString('\r'),
                    self.pos_at(self.cursor, 1),
                ));
            }
        }

        let mut saw_esc = false;
        loop {
            let i = self.cursor;
            let Some(b) = self.peek_byte() else {
                return Err(Error::new(ErrorKind::UnterminatedString, self.pos_from(m)));
            };
            match b {
                d if d == delim => {
                    self.cursor += 1;
                    if !multiline {
                        let text = &self.input[content_start..i];
                        let kind = match (delim, saw_esc) {
                            (b'"', true) => TokenKind::BasicStringEsc,
                            (b'"', false) => TokenKind::BasicString,
                            _ => TokenKind::LiteralString,
                        };
                        return Ok(self.token_at(kind, text, m));
                    }
                    if !self.eat_byte(delim) {
                        continue;
                    }
                    if !self.eat_byte(delim) {
                        continue;
                    }
                    // Up to two extra delimiters belong to the content.
                    let mut end = i;
                    if self.eat_byte(delim) {
                        end += 1;
                    }
                    if self.eat_byte(delim) {
                        end += 1;
                    }
                    let text = &self.input[content_start..end];
                    let kind = if delim == b'"' {
                        TokenKind::MultilineBasicString
                    } else {
                        TokenKind::MultilineLiteralString
                    };
                    return Ok(self.token_at(kind, text, m));
                }
                b'\\' if delim == b'"' => {
                    saw_esc = true;
                    self.cursor += 1;
                    match self.peek_byte() {
                        None => {
                            return Err(Error::new(
                                ErrorKind::UnterminatedString,
                                self.pos_from(m),
                            ));
                        }
                        Some(b'b' | b't' | b'n' | b'f' | b'r' | b'"' | b'\\') => {
                            self.cursor += 1;
                        }
                        Some(b'u') => {
                            self.cursor += 1;
                            self.expect_hex_digits(4, m)?;
                        }
                        Some(b'U') => {
                            self.cursor += 1;
                            self.expect_hex_digits(8, m)?;
                        }
                        Some(b'x') if self.version == TomlVersion::V1_1 => {
                            self.cursor += 1;
                            self.expect_hex_digits(2, m)?;
                        }
                        Some(b'e') if self.version == TomlVersion::V1_1 => {
                            self.cursor += 1;
                        }
                        // Line continuation; the unescape pass checks that
                        // only whitespace runs to the newline.
                        Some(b' ' | b'\t' | b'\n' | b'\r') if multiline => {}
                        Some(_) => {
                            return Err(Error::new(
                                ErrorKind::InvalidEscape(self.char_at(self.cursor)),
                                self.pos_at(i, self.char_at(self.cursor).len_utf8() + 1),
                            ));
                        }
                    }
                }
                b'\n' => {
                    if !multiline {
                        return Err(Error::new(
                            ErrorKind::InvalidCharInString('\n'),
                            self.pos_at(i, 1),
                        ));
                    }
                    self.advance_newline(1);
                }
                b'\r' => {
                    if multiline && self.peek_byte_at(1) == Some(b'\n') {
                        self.advance_newline(2);
                    } else {
                        let c = if self.peek_byte_at(1) == Some(b'\n') {
                            '\n'
                        } else {
                            '\r'
                        };
                        return Err(Error::new(
                            ErrorKind::InvalidCharInString(c),
                            self.pos_at(i, 1),
                        ));
                    }
                }
                0x09 => self.cursor += 1,
                0x00..=0x1F | 0x7F => {
                    return Err(Error::new(
                        ErrorKind::InvalidCharInString(b as char),
                        self.pos_at(i, 1),
                    ));
                }
                _ => self.cursor += 1,
            }
        }
    }

    /// A non-string, non-container value: boolean, number, or datetime.
    /// Numbers and datetimes are segmented here and validated by the
    /// parser.
    fn scan_scalar(&mut self) -> Result<Token<'a>, Error> {
        let m = self.mark();
        let signed = matches!(self.peek_byte(), Some(b'+' | b'-'));
        if signed {
            self.cursor += 1;
        }
        let run_start = self.cursor;
        self.eat_keylike();
        let run = &self.input[run_start..self.cursor];

        if !signed {
            if run == "true" || run == "false" {
                let text = &self.input[m.at..self.cursor];
                return Ok(self.token_at(TokenKind::Bool, text, m));
            }
            let rb = run.as_bytes();
            let datish = (rb.len() >= 5
                && rb[..4].iter().all(u8::is_ascii_digit)
                && rb[4] == b'-')
                || (rb.len() == 2
                    && rb.iter().all(u8::is_ascii_digit)
                    && self.peek_byte() == Some(b':'));
            if datish {
                self.cursor = run_start;
                self.eat_datetime_chars();
                let text = &self.input[m.at..self.cursor];
                return Ok(self.token_at(TokenKind::Datetime, text, m));
            }
        }

        if run == "inf" || run == "nan" {
            let text = &self.input[m.at..self.cursor];
            return Ok(self.token_at(TokenKind::Float, text, m));
        }

        if run.is_empty() {
            return Err(self.wanted_here("a value"));
        }
        if !run.as_bytes()[0].is_ascii_digit() {
            return Err(Error::new(ErrorKind::UnquotedString, self.pos_from(m)));
        }

        let base_prefixed =
            !signed && (run.starts_with("0x") || run.starts_with("0o") || run.starts_with("0b"));
        if !base_prefixed {
            // Pull in fraction digits and a '+'-signed exponent; '-' is
            // keylike so negative exponents never split the token.
            loop {
                if self.peek_byte() == Some(b'.') {
                    self.cursor += 1;
                    self.eat_keylike();
                } else if matches!(self.bytes.get(self.cursor - 1), Some(b'e' | b'E'))
                    && self.peek_byte() == Some(b'+')
                {
                    self.cursor += 1;
                    self.eat_keylike();
                } else {
                    break;
                }
            }
        }

        let text = &self.input[m.at..self.cursor];
        let kind = if base_prefixed {
            TokenKind::Integer
        } else if text.contains(['.', 'e', 'E']) {
            TokenKind::Float
        } else {
            TokenKind::Integer
        };
        Ok(self.token_at(kind, text, m))
    }

    /// Requires `n` hex digits at the cursor, for `\u`/`\U`/`\x` escapes.
    /// The digits stay in place; the parser decodes and range-checks them.
    fn expect_hex_digits(&mut self, n: usize, string_start: Mark) -> Result<(), Error> {
        for _ in 0..n {
            match self.peek_byte() {
                None => {
                    return Err(Error::new(
                        ErrorKind::UnterminatedString,
                        self.pos_from(string_start),
                    ));
                }
                Some(b) if b.is_ascii_hexdigit() => self.cursor += 1,
                Some(_) => {
                    return Err(Error::new(
                        ErrorKind::InvalidHexEscape(self.char_at(self.cursor)),
                        self.pos_at(self.cursor, self.char_at(self.cursor).len_utf8()),
                    ));
                }
            }
        }
        Ok(())
    }

    fn eat_keylike(&mut self) {
        while let Some(b) = self.peek_byte() {
            if !is_keylike_byte(b) {
                break;
            }
            self.cursor += 1;
        }
    }

    fn eat_datetime_chars(&mut self) {
        while let Some(b) = self.peek_byte() {
            match b {
                b'0'..=b'9' | b'-' | b'+' | b':' | b'.' | b'T' | b't' | b'Z' | b'z' => {
                    self.cursor += 1;
                }
                b' ' if self.peek_byte_at(1).is_some_and(|n| n.is_ascii_digit()) => {
                    self.cursor += 1;
                }
                _ => break,
            }
        }
    }
}

#[inline]
fn is_keylike_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}
