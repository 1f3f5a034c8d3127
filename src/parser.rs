//! The parser: consumes the token stream and builds the value tree plus
//! [`MetaData`], enforcing TOML's table, array-of-tables, and dotted-key
//! rules in a single pass.

#[cfg(test)]
#[path = "./parser_tests.rs"]
mod tests;

use crate::error::{Error, ErrorKind};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::meta::{IntBase, Key, MetaData, TypeHint};
use crate::pos::Position;
use crate::table::Table;
use crate::time::Datetime;
use crate::value::{Item, Value};

/// Which TOML language version to accept.
///
/// v1.1 additionally allows: times without seconds, `\x` and `\e` escapes,
/// Unicode bare keys, and trailing commas and newlines in inline tables.
/// The flag is per-parser configuration, never global state.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum TomlVersion {
    /// TOML v1.0.0.
    #[default]
    V1_0,
    /// TOML v1.1.0 (opt-in).
    V1_1,
}

/// Nesting deeper than this is rejected rather than recursed into.
const MAX_NESTING_DEPTH: u32 = 256;

/// Parses a TOML v1.0.0 document into a value tree and its metadata.
pub fn parse(source: &str) -> Result<(Table, MetaData), Error> {
    parse_with(source, TomlVersion::V1_0)
}

/// Parses a TOML document under an explicit [`TomlVersion`].
pub fn parse_with(source: &str, version: TomlVersion) -> Result<(Table, MetaData), Error> {
    let mut parser = Parser::new(source, version);
    let mut root = Table::new();
    parser.parse_document(&mut root)?;
    Ok((root, parser.meta))
}

struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    version: TomlVersion,
    meta: MetaData,

    /// The `[x.y.z]` or `[[x.y]]` currently in effect.
    context: Key,
    /// Terminal segment being assigned, for error attribution.
    current_key: Option<Key>,

    /// Tables created implicitly as parents of a deeper header. May be
    /// upgraded to explicit by their own header exactly once.
    implicits: foldhash::HashSet<Key>,
    /// Keys explicitly declared: headers, terminal assignments, upgraded
    /// implicits.
    seen_explicit: foldhash::HashSet<Key>,
    /// Tables created by dotted-key intermediates. Closed to traversal by
    /// later headers.
    dotted: foldhash::HashSet<Key>,

    /// Comment lines waiting for the next key, as `(line, text)`.
    pending_docs: Vec<(u32, String)>,
    /// The most recently recorded key and the line its definition ended on.
    last_key: Option<(Key, u32)>,
    /// Line of the most recently consumed token.
    last_token_line: u32,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, version: TomlVersion) -> Self {
        Parser {
            source,
            lexer: Lexer::new(source, version),
            version,
            meta: MetaData::new(),
            context: Key::root(),
            current_key: None,
            implicits: foldhash::HashSet::default(),
            seen_explicit: foldhash::HashSet::default(),
            dotted: foldhash::HashSet::default(),
            pending_docs: Vec::new(),
            last_key: None,
            last_token_line: 1,
        }
    }

    /// Next token, skipping whitespace and surfacing lexer errors.
    fn next(&mut self) -> Result<Token<'a>, Error> {
        loop {
            let tok = self.lexer.next();
            match tok.kind {
                TokenKind::Whitespace => continue,
                TokenKind::Error => {
                    return Err(self
                        .lexer
                        .take_error()
                        .expect("error token implies a stored error"));
                }
                _ => {
                    self.last_token_line = tok.pos.line;
                    return Ok(tok);
                }
            }
        }
    }

    fn expect_comment_body(&mut self) -> Result<Token<'a>, Error> {
        let tok = self.next()?;
        debug_assert_eq!(tok.kind, TokenKind::BareText);
        Ok(tok)
    }

    fn parse_document(&mut self, root: &mut Table) -> Result<(), Error> {
        loop {
            let tok = self.next()?;
            match tok.kind {
                TokenKind::Eof => return Ok(()),
                TokenKind::CommentStart => {
                    let body = self.expect_comment_body()?;
                    self.record_comment(tok.pos.line, body.text);
                }
                TokenKind::TableOpen => self.table_header(root, tok, false)?,
                TokenKind::ArrayTableOpen => self.table_header(root, tok, true)?,
                TokenKind::KeyStart => self.key_value(root)?,
                _ => unreachable!("lexer emitted {:?} at top level", tok.kind),
            }
        }
    }

    // Comment attachment.

    fn record_comment(&mut self, line: u32, text: &str) {
        // One space after the `#` is convention, not content.
        let text = text.strip_prefix(' ').unwrap_or(text);
        if let Some((key, key_line)) = &self.last_key {
            if *key_line == line {
                self.meta.comment(key.clone(), text);
                return;
            }
        }
        self.pending_docs.push((line, text.to_owned()));
    }

    /// Attaches the contiguous run of pending comment lines directly above
    /// `key_line` as doc comments of `key`. Non-adjacent comments are
    /// dropped.
    fn attach_pending_docs(&mut self, key: &Key, key_line: u32) {
        let mut start = self.pending_docs.len();
        let mut expect = key_line;
        for (i, (line, _)) in self.pending_docs.iter().enumerate().rev() {
            if expect > 0 && *line == expect - 1 {
                start = i;
                expect -= 1;
            } else {
                break;
            }
        }
        let docs: Vec<(u32, String)> = self.pending_docs.drain(..).collect();
        for (_, text) in docs.into_iter().skip(start) {
            self.meta.doc(key.clone(), text);
        }
    }

    // Key paths.

    /// Reads key segments up to the terminator (`KeyEnd` for assignments,
    /// the closing bracket for headers). Returns the segments with their
    /// positions, plus the terminating token.
    fn parse_key_path(
        &mut self,
        header: bool,
    ) -> Result<(Vec<(String, Position)>, Token<'a>), Error> {
        let mut segments = Vec::new();
        loop {
            let tok = self.next()?;
            match tok.kind {
                TokenKind::BareText | TokenKind::BasicString | TokenKind::LiteralString => {
                    segments.push((tok.text.to_owned(), tok.pos));
                }
                TokenKind::BasicStringEsc => {
                    let seg = self.unescape(&tok, false)?;
                    segments.push((seg, tok.pos));
                }
                TokenKind::KeyEnd if !header => return Ok((segments, tok)),
                TokenKind::TableClose | TokenKind::ArrayTableClose if header => {
                    return Ok((segments, tok));
                }
                _ => unreachable!("lexer emitted {:?} inside a key path", tok.kind),
            }
        }
    }

    // Headers.

    fn table_header(
        &mut self,
        root: &mut Table,
        open: Token<'a>,
        array: bool,
    ) -> Result<(), Error> {
        let (segments, close) = self.parse_key_path(true)?;
        debug_assert!(!segments.is_empty(), "lexer guarantees a segment");
        let header_pos = open.pos.cover(close.pos);

        let mut table = &mut *root;
        let mut path = Key::root();
        let last_index = segments.len() - 1;
        for (seg, seg_pos) in &segments[..last_index] {
            path.push(seg.clone());
            table = self.navigate_intermediate(table, &path, seg, *seg_pos)?;
        }

        let (last, last_pos) = &segments[last_index];
        let full = path.join(last.clone());
        if array {
            self.header_array_final(table, full, last, *last_pos, header_pos)?;
        } else {
            self.header_table_final(table, full, last, *last_pos, header_pos)?;
        }
        Ok(())
    }

    /// Navigate an intermediate segment of a header (e.g. `a` in
    /// `[a.b.c]`). Creates implicit tables; descends into the last element
    /// of an array of tables. Inline and dotted-created tables are closed
    /// to header traversal.
    fn navigate_intermediate<'t>(
        &mut self,
        table: &'t mut Table,
        path: &Key,
        seg: &str,
        seg_pos: Position,
    ) -> Result<&'t mut Table, Error> {
        match table.find_index(seg) {
            None => {
                self.implicits.insert(path.clone());
                self.meta.record_defined(path.clone());
                table.push_unchecked(
                    seg.to_owned(),
                    seg_pos,
                    Item::with_pos(
                        Value::Table(Table::new()),
                        TypeHint::Table { inline: false },
                        seg_pos,
                    ),
                );
                match &mut table.item_at_mut(table.len() - 1).value {
                    Value::Table(sub) => Ok(sub),
                    _ => unreachable!("just inserted a table"),
                }
            }
            Some(idx) => {
                let first = table.key_pos(seg).unwrap_or_default();
                let closed = self.dotted.contains(path);
                let item = table.item_at_mut(idx);
                match &mut item.value {
                    Value::Table(_) if closed || item.hint == (TypeHint::Table { inline: true }) => {
                        Err(Error::new(
                            ErrorKind::DuplicateKey {
                                key: path.to_string(),
                                first,
                            },
                            seg_pos,
                        ))
                    }
                    Value::Table(sub) => Ok(sub),
                    Value::ArrayTable(ts) => {
                        Ok(ts.last_mut().expect("arrays of tables are never empty"))
                    }
                    _ => Err(Error::new(
                        ErrorKind::DuplicateKey {
                            key: path.to_string(),
                            first,
                        },
                        seg_pos,
                    )),
                }
            }
        }
    }

    /// Final segment of `[a.b.c]`.
    fn header_table_final(
        &mut self,
        table: &mut Table,
        full: Key,
        last: &str,
        last_pos: Position,
        header_pos: Position,
    ) -> Result<(), Error> {
        match table.find_index(last) {
            None => {
                table.push_unchecked(
                    last.to_owned(),
                    last_pos,
                    Item::with_pos(
                        Value::Table(Table::new()),
                        TypeHint::Table { inline: false },
                        header_pos,
                    ),
                );
                self.finish_header(full, header_pos, TypeHint::Table { inline: false });
                Ok(())
            }
            Some(idx) => {
                let first = table.key_pos(last).unwrap_or_default();
                let item = table.item_at_mut(idx);
                let is_plain_table = matches!(item.value, Value::Table(_))
                    && item.hint != (TypeHint::Table { inline: true });
                if is_plain_table && !self.seen_explicit.contains(&full) {
                    // An implicit or dotted-created table is upgraded to
                    // explicit by its own header, exactly once.
                    self.implicits.remove(&full);
                    self.dotted.remove(&full);
                    item.pos = header_pos;
                    self.finish_header(full, header_pos, TypeHint::Table { inline: false });
                    Ok(())
                } else if is_plain_table || matches!(item.value, Value::ArrayTable(_)) {
                    Err(Error::new(
                        ErrorKind::DuplicateTable {
                            name: last.to_owned(),
                            first,
                        },
                        header_pos,
                    ))
                } else {
                    Err(Error::new(
                        ErrorKind::DuplicateKey {
                            key: full.to_string(),
                            first,
                        },
                        last_pos,
                    ))
                }
            }
        }
    }

    /// Final segment of `[[a.b.c]]`: appends a fresh table to the array.
    fn header_array_final(
        &mut self,
        table: &mut Table,
        full: Key,
        last: &str,
        last_pos: Position,
        header_pos: Position,
    ) -> Result<(), Error> {
        match table.find_index(last) {
            None => {
                table.push_unchecked(
                    last.to_owned(),
                    last_pos,
                    Item::with_pos(
                        Value::ArrayTable(vec![Table::new()]),
                        TypeHint::ArrayTable { inline: false },
                        header_pos,
                    ),
                );
                self.finish_header(full, header_pos, TypeHint::ArrayTable { inline: false });
                Ok(())
            }
            Some(idx) => {
                let first = table.key_pos(last).unwrap_or_default();
                let item = table.item_at_mut(idx);
                match &mut item.value {
                    Value::ArrayTable(ts) => {
                        ts.push(Table::new());
                        self.finish_header(full, header_pos, TypeHint::ArrayTable {
                            inline: false,
                        });
                        Ok(())
                    }
                    Value::Table(_) => Err(Error::new(ErrorKind::RedefineAsArray, header_pos)),
                    _ => Err(Error::new(
                        ErrorKind::DuplicateKey {
                            key: full.to_string(),
                            first,
                        },
                        last_pos,
                    )),
                }
            }
        }
    }

    fn finish_header(&mut self, full: Key, header_pos: Position, hint: TypeHint) {
        self.seen_explicit.insert(full.clone());
        self.attach_pending_docs(&full, header_pos.line);
        self.meta.record_key(full.clone());
        self.meta.set_type(full.clone(), hint);
        self.context = full.clone();
        self.last_key = Some((full, self.last_token_line));
    }

    // Key-value pairs.

    fn key_value(&mut self, root: &mut Table) -> Result<(), Error> {
        let (segments, _eq) = self.parse_key_path(false)?;
        debug_assert!(!segments.is_empty(), "lexer guarantees a segment");
        let key_line = segments[0].1.line;

        let mut full = self.context.clone();
        for (seg, _) in &segments {
            full.push(seg.clone());
        }
        self.current_key = Some(full.clone());
        // Recorded before the value is parsed so keys inside an inline
        // table list after their parent, in textual order. Nothing leaks on
        // failure; an errored parse exposes no tree or metadata.
        self.meta.record_key(full.clone());

        let value = match self.parse_value(Some(&full), 0) {
            Ok(v) => v,
            Err(mut err) => {
                if err.key.is_none() {
                    err.key = self.current_key.take();
                }
                return Err(err);
            }
        };

        // Walk to the context table, then through dotted intermediates.
        let mut table = table_at_context(root, &self.context);
        let mut path = self.context.clone();
        let last_index = segments.len() - 1;
        for (seg, seg_pos) in &segments[..last_index] {
            path.push(seg.clone());
            table = self.navigate_dotted(table, &path, seg, *seg_pos)?;
        }

        let (last, last_pos) = &segments[last_index];
        if table.contains_key(last) {
            let first = table.key_pos(last).unwrap_or_default();
            return Err(Error::new(
                ErrorKind::DuplicateKey {
                    key: full.to_string(),
                    first,
                },
                *last_pos,
            ));
        }

        let hint = value.hint;
        table.push_unchecked(last.clone(), *last_pos, value);

        self.seen_explicit.insert(full.clone());
        self.attach_pending_docs(&full, key_line);
        self.meta.set_type(full.clone(), hint);
        self.last_key = Some((full, self.last_token_line));
        self.current_key = None;
        Ok(())
    }

    /// Navigate into (or create) a dotted-key intermediate table. Only
    /// tables created by dotted keys may be extended this way; anything
    /// else was defined by other means and is closed.
    fn navigate_dotted<'t>(
        &mut self,
        table: &'t mut Table,
        path: &Key,
        seg: &str,
        seg_pos: Position,
    ) -> Result<&'t mut Table, Error> {
        match table.find_index(seg) {
            None => {
                self.dotted.insert(path.clone());
                self.meta.record_defined(path.clone());
                table.push_unchecked(
                    seg.to_owned(),
                    seg_pos,
                    Item::with_pos(
                        Value::Table(Table::new()),
                        TypeHint::Table { inline: false },
                        seg_pos,
                    ),
                );
                match &mut table.item_at_mut(table.len() - 1).value {
                    Value::Table(sub) => Ok(sub),
                    _ => unreachable!("just inserted a table"),
                }
            }
            Some(idx) => {
                let first = table.key_pos(seg).unwrap_or_default();
                let extendable = self.dotted.contains(path);
                let item = table.item_at_mut(idx);
                match &mut item.value {
                    Value::Table(sub) if extendable => Ok(sub),
                    Value::Table(_) => Err(Error::new(
                        ErrorKind::DuplicateKey {
                            key: path.to_string(),
                            first,
                        },
                        seg_pos,
                    )),
                    _ => Err(Error::new(
                        ErrorKind::DottedKeyInvalidType { first },
                        seg_pos,
                    )),
                }
            }
        }
    }

    // Values.

    fn parse_value(&mut self, base: Option<&Key>, depth: u32) -> Result<Item, Error> {
        let tok = self.next()?;
        self.parse_value_token(tok, base, depth)
    }

    fn parse_value_token(
        &mut self,
        tok: Token<'a>,
        base: Option<&Key>,
        depth: u32,
    ) -> Result<Item, Error> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::new(
                ErrorKind::Custom("maximum nesting depth exceeded".into()),
                tok.pos,
            ));
        }
        match tok.kind {
            TokenKind::BasicString => Ok(Item::with_pos(
                Value::String(tok.text.to_owned()),
                TypeHint::String {
                    literal: false,
                    multiline: false,
                },
                tok.pos,
            )),
            TokenKind::BasicStringEsc => {
                let s = self.unescape(&tok, false)?;
                Ok(Item::with_pos(
                    Value::String(s),
                    TypeHint::String {
                        literal: false,
                        multiline: false,
                    },
                    tok.pos,
                ))
            }
            TokenKind::LiteralString => Ok(Item::with_pos(
                Value::String(tok.text.to_owned()),
                TypeHint::String {
                    literal: true,
                    multiline: false,
                },
                tok.pos,
            )),
            TokenKind::MultilineBasicString => {
                let s = self.unescape(&tok, true)?;
                Ok(Item::with_pos(
                    Value::String(s),
                    TypeHint::String {
                        literal: false,
                        multiline: true,
                    },
                    tok.pos,
                ))
            }
            TokenKind::MultilineLiteralString => Ok(Item::with_pos(
                Value::String(tok.text.to_owned()),
                TypeHint::String {
                    literal: true,
                    multiline: true,
                },
                tok.pos,
            )),
            TokenKind::Bool => Ok(Item::with_pos(
                Value::Boolean(tok.text == "true"),
                TypeHint::Bool,
                tok.pos,
            )),
            TokenKind::Integer => self.convert_integer(&tok),
            TokenKind::Float => self.convert_float(&tok),
            TokenKind::Datetime => self.convert_datetime(&tok),
            TokenKind::ArrayOpen => self.parse_array(tok, depth),
            TokenKind::InlineTableOpen => self.parse_inline_table(tok, base, depth),
            _ => unreachable!("lexer emitted {:?} at value position", tok.kind),
        }
    }

    fn parse_array(&mut self, open: Token<'a>, depth: u32) -> Result<Item, Error> {
        let mut items = Vec::new();
        loop {
            let tok = self.next()?;
            match tok.kind {
                TokenKind::ArrayClose => {
                    let single_line = open.pos.line == tok.pos.line;
                    return Ok(Item::with_pos(
                        Value::Array(items),
                        TypeHint::Array { single_line },
                        open.pos.cover(tok.pos),
                    ));
                }
                TokenKind::CommentStart => {
                    self.expect_comment_body()?;
                }
                _ => {
                    let item = self.parse_value_token(tok, None, depth + 1)?;
                    items.push(item);
                }
            }
        }
    }

    /// Inline tables are parsed to completion and closed: no later header
    /// or dotted key may reach inside. `base` carries the key path when the
    /// table sits at one, so its entries land in the metadata.
    fn parse_inline_table(
        &mut self,
        open: Token<'a>,
        base: Option<&Key>,
        depth: u32,
    ) -> Result<Item, Error> {
        let mut table = Table::new();
        loop {
            let tok = self.next()?;
            match tok.kind {
                TokenKind::InlineTableClose => {
                    return Ok(Item::with_pos(
                        Value::Table(table),
                        TypeHint::Table { inline: true },
                        open.pos.cover(tok.pos),
                    ));
                }
                TokenKind::CommentStart => {
                    self.expect_comment_body()?;
                }
                TokenKind::KeyStart => {
                    let (segments, _eq) = self.parse_key_path(false)?;
                    debug_assert!(!segments.is_empty());

                    let full = base.map(|b| {
                        let mut k = b.clone();
                        for (seg, _) in &segments {
                            k.push(seg.clone());
                        }
                        k
                    });
                    if let Some(full) = &full {
                        self.meta.record_key(full.clone());
                        // Dotted intermediates inside the inline table are
                        // defined, if unlisted.
                        if let Some(b) = base {
                            let mut prefix = b.clone();
                            for (seg, _) in &segments[..segments.len() - 1] {
                                prefix.push(seg.clone());
                                self.meta.record_defined(prefix.clone());
                            }
                        }
                    }
                    let value = self.parse_value(full.as_ref(), depth + 1)?;

                    let mut target = &mut table;
                    let last_index = segments.len() - 1;
                    for (seg, seg_pos) in &segments[..last_index] {
                        target = navigate_inline_dotted(target, seg, *seg_pos)?;
                    }
                    let (last, last_pos) = &segments[last_index];
                    if target.contains_key(last) {
                        let first = target.key_pos(last).unwrap_or_default();
                        return Err(Error::new(
                            ErrorKind::DuplicateKey {
                                key: last.clone(),
                                first,
                            },
                            *last_pos,
                        ));
                    }
                    let hint = value.hint;
                    target.push_unchecked(last.clone(), *last_pos, value);
                    if let Some(full) = full {
                        self.meta.set_type(full, hint);
                    }
                }
                _ => unreachable!("lexer emitted {:?} inside an inline table", tok.kind),
            }
        }
    }

    // Scalar conversion.

    fn convert_integer(&mut self, tok: &Token<'a>) -> Result<Item, Error> {
        let bytes = tok.text.as_bytes();
        let (negative, unsigned, digits) = match bytes {
            [b'-', rest @ ..] => (true, false, rest),
            [b'+', rest @ ..] => (false, false, rest),
            _ => (false, true, bytes),
        };

        if unsigned {
            // Base prefixes are only legal unsigned.
            if let [b'0', base, rest @ ..] = digits {
                let parsed = match base {
                    b'x' => Some(self.integer_radix(rest, 16, tok)),
                    b'o' => Some(self.integer_radix(rest, 8, tok)),
                    b'b' => Some(self.integer_radix(rest, 2, tok)),
                    _ => None,
                };
                if let Some(result) = parsed {
                    let value = result?;
                    let ndigits = rest.iter().filter(|b| **b != b'_').count();
                    let width = if rest.first() == Some(&b'0') {
                        ndigits.min(u8::MAX as usize) as u8
                    } else {
                        0
                    };
                    let base = match base {
                        b'x' => IntBase::Hex,
                        b'o' => IntBase::Octal,
                        _ => IntBase::Binary,
                    };
                    return Ok(Item::with_pos(
                        Value::Integer(value),
                        TypeHint::Integer { base, width },
                        tok.pos,
                    ));
                }
            }
        }

        let value = self.integer_decimal(digits, negative, tok)?;
        Ok(Item::with_pos(
            Value::Integer(value),
            TypeHint::Integer {
                base: IntBase::Decimal,
                width: 0,
            },
            tok.pos,
        ))
    }

    /// Decimal integers: underscores between digits, no leading zero, must
    /// fit in 64 signed bits.
    fn integer_decimal(
        &mut self,
        digits: &[u8],
        negative: bool,
        tok: &Token<'a>,
    ) -> Result<i64, Error> {
        let mut acc: u64 = 0;
        let mut prev_underscore = false;
        let mut has_digit = false;
        let mut leading_zero = false;
        let mut overflow = false;
        for &b in digits {
            if b == b'_' {
                if !has_digit || prev_underscore {
                    return Err(self.invalid_number(tok));
                }
                prev_underscore = true;
                continue;
            }
            if !b.is_ascii_digit() {
                return Err(self.invalid_number(tok));
            }
            if leading_zero {
                return Err(self.invalid_number(tok));
            }
            if !has_digit && b == b'0' {
                leading_zero = true;
            }
            has_digit = true;
            prev_underscore = false;
            let digit = (b - b'0') as u64;
            acc = match acc.checked_mul(10).and_then(|a| a.checked_add(digit)) {
                Some(v) => v,
                None => {
                    overflow = true;
                    acc
                }
            };
        }
        if !has_digit || prev_underscore {
            return Err(self.invalid_number(tok));
        }
        let max = if negative {
            (i64::MAX as u64) + 1
        } else {
            i64::MAX as u64
        };
        if overflow || acc > max {
            return Err(Error::new(
                ErrorKind::IntegerOutOfRange {
                    text: tok.text.to_owned(),
                },
                tok.pos,
            ));
        }
        Ok(if negative {
            (acc as i64).wrapping_neg()
        } else {
            acc as i64
        })
    }

    /// Base-prefixed integers: hex, octal, or binary digits with
    /// underscores between digits.
    fn integer_radix(&mut self, digits: &[u8], radix: u32, tok: &Token<'a>) -> Result<i64, Error> {
        if digits.is_empty() {
            return Err(self.invalid_number(tok));
        }
        let mut acc: u64 = 0;
        let mut prev_underscore = false;
        let mut has_digit = false;
        for &b in digits {
            if b == b'_' {
                if !has_digit || prev_underscore {
                    return Err(self.invalid_number(tok));
                }
                prev_underscore = true;
                continue;
            }
            let Some(digit) = (b as char).to_digit(radix) else {
                return Err(self.invalid_number(tok));
            };
            has_digit = true;
            prev_underscore = false;
            acc = match acc
                .checked_mul(radix as u64)
                .and_then(|a| a.checked_add(digit as u64))
            {
                Some(v) => v,
                None => {
                    return Err(Error::new(
                        ErrorKind::IntegerOutOfRange {
                            text: tok.text.to_owned(),
                        },
                        tok.pos,
                    ));
                }
            };
        }
        if !has_digit || prev_underscore {
            return Err(self.invalid_number(tok));
        }
        if acc > i64::MAX as u64 {
            return Err(Error::new(
                ErrorKind::IntegerOutOfRange {
                    text: tok.text.to_owned(),
                },
                tok.pos,
            ));
        }
        Ok(acc as i64)
    }

    fn invalid_number(&self, tok: &Token<'a>) -> Error {
        Error::new(ErrorKind::InvalidNumber, tok.pos)
    }

    /// Floats: `inf`/`nan` with optional sign, otherwise digits with an
    /// optional fraction and exponent. Underscores are stripped after
    /// placement validation; the sign bit of `-0.0` and `-nan` survives.
    fn convert_float(&mut self, tok: &Token<'a>) -> Result<Item, Error> {
        let text = tok.text;
        let (negative, body) = match text.as_bytes() {
            [b'-', ..] => (true, &text[1..]),
            [b'+', ..] => (false, &text[1..]),
            _ => (false, text),
        };

        let value = match body {
            "inf" => {
                if negative {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                }
            }
            "nan" => {
                if negative {
                    f64::NAN.copysign(-1.0)
                } else {
                    f64::NAN.copysign(1.0)
                }
            }
            _ => {
                let clean = self.clean_float(body, tok)?;
                let signed = if negative {
                    format!("-{clean}")
                } else {
                    clean
                };
                let n: f64 = signed
                    .parse()
                    .map_err(|_| self.invalid_number(tok))?;
                if n.is_infinite() {
                    return Err(Error::new(
                        ErrorKind::OutOfRange {
                            target: "float64",
                            value: tok.text.to_owned(),
                        },
                        tok.pos,
                    ));
                }
                n
            }
        };

        let exponent = body.contains(['e', 'E']);
        Ok(Item::with_pos(
            Value::Float(value),
            TypeHint::Float { exponent },
            tok.pos,
        ))
    }

    /// Validates a float body and returns it with underscores stripped.
    /// Rejects `1.`, `.1`, `1.e2`, leading zeros, and misplaced
    /// underscores.
    fn clean_float(&self, body: &str, tok: &Token<'a>) -> Result<String, Error> {
        #[derive(PartialEq)]
        enum Part {
            Int,
            Frac,
            ExpSign,
            Exp,
        }
        let mut out = String::with_capacity(body.len());
        let mut part = Part::Int;
        let mut digits_in_part = 0usize;
        let mut prev_underscore = false;
        let bytes = body.as_bytes();

        // No leading zeros in the integer part ("03.14", "0_1.0").
        if let [b'0', b'0'..=b'9' | b'_', ..] = bytes {
            return Err(self.invalid_number(tok));
        }

        for &b in bytes {
            match b {
                b'0'..=b'9' => {
                    if part == Part::ExpSign {
                        part = Part::Exp;
                    }
                    digits_in_part += 1;
                    prev_underscore = false;
                    out.push(b as char);
                }
                b'_' => {
                    if digits_in_part == 0 || prev_underscore || part == Part::ExpSign {
                        return Err(self.invalid_number(tok));
                    }
                    prev_underscore = true;
                }
                b'.' => {
                    if part != Part::Int || digits_in_part == 0 || prev_underscore {
                        return Err(self.invalid_number(tok));
                    }
                    part = Part::Frac;
                    digits_in_part = 0;
                    out.push('.');
                }
                b'e' | b'E' => {
                    if !matches!(part, Part::Int | Part::Frac)
                        || digits_in_part == 0
                        || prev_underscore
                    {
                        return Err(self.invalid_number(tok));
                    }
                    part = Part::ExpSign;
                    digits_in_part = 0;
                    out.push('e');
                }
                b'+' | b'-' => {
                    if part != Part::ExpSign || digits_in_part > 0 {
                        return Err(self.invalid_number(tok));
                    }
                    out.push(b as char);
                    // Sign consumed; digits must follow.
                    part = Part::ExpSign;
                    prev_underscore = false;
                    // Mark the sign as seen by requiring digits next.
                    digits_in_part = 0;
                }
                _ => return Err(self.invalid_number(tok)),
            }
        }
        let complete = match part {
            Part::Int | Part::Frac | Part::Exp => digits_in_part > 0,
            Part::ExpSign => false,
        };
        if !complete || prev_underscore {
            return Err(self.invalid_number(tok));
        }
        Ok(out)
    }

    fn convert_datetime(&mut self, tok: &Token<'a>) -> Result<Item, Error> {
        let Some(dt) = Datetime::parse(tok.text) else {
            return Err(Error::new(
                ErrorKind::InvalidDatetime {
                    text: tok.text.to_owned(),
                },
                tok.pos,
            ));
        };
        if self.version == TomlVersion::V1_0 {
            if let Some(t) = dt.time {
                if !t.has_seconds {
                    return Err(Error::new(
                        ErrorKind::InvalidDatetime {
                            text: tok.text.to_owned(),
                        },
                        tok.pos,
                    ));
                }
            }
        }
        Ok(Item::with_pos(
            Value::Datetime(dt),
            TypeHint::Datetime { format: dt.kind() },
            tok.pos,
        ))
    }

    // Escape decoding.

    /// Decodes the escape sequences of a basic string token. Multiline
    /// tokens additionally fold line-continuations: a `\` at the end of a
    /// line swallows whitespace up to the next non-whitespace character.
    fn unescape(&self, tok: &Token<'a>, multiline: bool) -> Result<String, Error> {
        let text = tok.text;
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(bytes.len());
        let mut i = 0usize;
        while i < bytes.len() {
            let Some(backslash) = bytes[i..].iter().position(|&b| b == b'\\') else {
                out.push_str(&text[i..]);
                break;
            };
            let esc_at = i + backslash;
            out.push_str(&text[i..esc_at]);
            i = esc_at + 1;
            let Some(&e) = bytes.get(i) else {
                // The lexer terminates strings before a trailing backslash
                // can survive to here.
                return Err(self.err_in_token(tok, esc_at, 1, ErrorKind::UnterminatedString));
            };
            i += 1;
            match e {
                b'b' => out.push('\u{8}'),
                b't' => out.push('\t'),
                b'n' => out.push('\n'),
                b'f' => out.push('\u{c}'),
                b'r' => out.push('\r'),
                b'"' => out.push('"'),
                b'\\' => out.push('\\'),
                b'e' if self.version == TomlVersion::V1_1 => out.push('\u{1b}'),
                b'u' => {
                    let c = self.hex_escape(tok, &mut i, 4, esc_at)?;
                    out.push(c);
                }
                b'U' => {
                    let c = self.hex_escape(tok, &mut i, 8, esc_at)?;
                    out.push(c);
                }
                b'x' if self.version == TomlVersion::V1_1 => {
                    let c = self.hex_escape(tok, &mut i, 2, esc_at)?;
                    out.push(c);
                }
                b' ' | b'\t' | b'\r' | b'\n' if multiline => {
                    // Line continuation: whitespace, then a newline, then
                    // any amount of whitespace and newlines.
                    let mut j = i - 1;
                    while let Some(b' ' | b'\t') = bytes.get(j) {
                        j += 1;
                    }
                    match bytes.get(j) {
                        Some(b'\n') => j += 1,
                        Some(b'\r') if bytes.get(j + 1) == Some(&b'\n') => j += 2,
                        _ => {
                            return Err(self.err_in_token(
                                tok,
                                esc_at,
                                2,
                                ErrorKind::InvalidEscape(e as char),
                            ));
                        }
                    }
                    loop {
                        match bytes.get(j) {
                            Some(b' ' | b'\t' | b'\n') => j += 1,
                            Some(b'\r') if bytes.get(j + 1) == Some(&b'\n') => j += 2,
                            _ => break,
                        }
                    }
                    i = j;
                }
                _ => {
                    let c = text[i - 1..].chars().next().unwrap_or('\u{fffd}');
                    return Err(self.err_in_token(
                        tok,
                        esc_at,
                        c.len_utf8() + 1,
                        ErrorKind::InvalidEscape(c),
                    ));
                }
            }
        }
        Ok(out)
    }

    fn hex_escape(
        &self,
        tok: &Token<'a>,
        i: &mut usize,
        n: usize,
        esc_at: usize,
    ) -> Result<char, Error> {
        let bytes = tok.text.as_bytes();
        let mut val: u32 = 0;
        for k in 0..n {
            let Some(&b) = bytes.get(*i + k) else {
                return Err(self.err_in_token(tok, esc_at, 2, ErrorKind::UnterminatedString));
            };
            let Some(d) = (b as char).to_digit(16) else {
                return Err(self.err_in_token(
                    tok,
                    *i + k,
                    1,
                    ErrorKind::InvalidHexEscape(b as char),
                ));
            };
            val = (val << 4) | d;
        }
        *i += n;
        match char::from_u32(val) {
            Some(c) => Ok(c),
            None => Err(self.err_in_token(
                tok,
                esc_at,
                n + 2,
                ErrorKind::InvalidEscapeValue(val),
            )),
        }
    }

    /// Builds an error positioned at a byte offset inside a token's text,
    /// accounting for newlines in multiline strings.
    fn err_in_token(&self, tok: &Token<'a>, offset: usize, len: usize, kind: ErrorKind) -> Error {
        let base = tok.text.as_ptr() as usize - self.source.as_ptr() as usize;
        let start = (base + offset) as u32;
        let before = &tok.text[..offset];
        let newlines = before.matches('\n').count() as u32;
        let (line, col) = match before.rfind('\n') {
            Some(p) => (tok.pos.line + newlines, (offset - p - 1) as u32 + 1),
            None => (tok.pos.line, tok.pos.col + (start - tok.pos.start)),
        };
        Error::new(kind, Position::new(line, col, start, len as u32))
    }
}

/// Walks from the root to the table the current header context points at.
/// The path always exists; headers created it.
fn table_at_context<'t>(root: &'t mut Table, context: &Key) -> &'t mut Table {
    let mut table = root;
    for seg in context.segments() {
        let idx = table
            .find_index(seg)
            .expect("header context path always exists");
        table = match &mut table.item_at_mut(idx).value {
            Value::Table(sub) => sub,
            Value::ArrayTable(ts) => ts.last_mut().expect("arrays of tables are never empty"),
            _ => unreachable!("header context is always a table"),
        };
    }
    table
}

/// Dotted-key navigation inside an inline table. Intermediates must be
/// tables created by dotted keys in the same inline table; nested inline
/// tables are closed.
fn navigate_inline_dotted<'t>(
    table: &'t mut Table,
    seg: &str,
    seg_pos: Position,
) -> Result<&'t mut Table, Error> {
    match table.find_index(seg) {
        None => {
            table.push_unchecked(
                seg.to_owned(),
                seg_pos,
                Item::with_pos(
                    Value::Table(Table::new()),
                    TypeHint::Table { inline: false },
                    seg_pos,
                ),
            );
            match &mut table.item_at_mut(table.len() - 1).value {
                Value::Table(sub) => Ok(sub),
                _ => unreachable!("just inserted a table"),
            }
        }
        Some(idx) => {
            let first = table.key_pos(seg).unwrap_or_default();
            let item = table.item_at_mut(idx);
            match &mut item.value {
                Value::Table(sub) if item.hint == (TypeHint::Table { inline: false }) => Ok(sub),
                Value::Table(_) => Err(Error::new(
                    ErrorKind::DuplicateKey {
                        key: seg.to_owned(),
                        first,
                    },
                    seg_pos,
                )),
                _ => Err(Error::new(
                    ErrorKind::DottedKeyInvalidType { first },
                    seg_pos,
                )),
            }
        }
    }
}
