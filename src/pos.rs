//! Source positions and the byte-offset → line/column index.

#[cfg(test)]
#[path = "./pos_tests.rs"]
mod tests;

/// A location within a TOML document.
///
/// `line` and `col` are 1-based; `start` is the byte offset of the first
/// byte and `len` the byte length of the region. Positions are created when
/// a token is emitted and copied into errors and tree nodes unchanged.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number, counted in bytes from the line start.
    pub col: u32,
    /// Byte offset of the first byte (inclusive).
    pub start: u32,
    /// Byte length of the region.
    pub len: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            line: 1,
            col: 1,
            start: 0,
            len: 0,
        }
    }
}

impl Position {
    /// Creates a new [`Position`].
    #[inline]
    pub fn new(line: u32, col: u32, start: u32, len: u32) -> Self {
        Self {
            line,
            col,
            start,
            len,
        }
    }

    /// Byte offset one past the last byte.
    #[inline]
    pub fn end(&self) -> u32 {
        self.start + self.len
    }

    /// The position as a byte range into the source.
    #[inline]
    pub fn span(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end() as usize
    }

    /// Extends `self` so it also covers `other`.
    #[inline]
    pub(crate) fn cover(&self, other: Position) -> Position {
        let end = self.end().max(other.end());
        Position {
            len: end - self.start,
            ..*self
        }
    }
}

/// A borrowed view of the source text with a lazily usable line index.
///
/// Error renderers use this to recover the lines around a [`Position`]; the
/// parser itself never needs it since the lexer tracks line/column while
/// scanning.
pub struct Source<'a> {
    text: &'a str,
    /// Byte offset of the first byte of each line, in order. Always starts
    /// with 0.
    line_starts: Vec<u32>,
}

impl<'a> Source<'a> {
    /// Indexes `text` for line lookups.
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { text, line_starts }
    }

    /// The full source text.
    #[inline]
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Number of lines in the source. An empty source has one (empty) line.
    #[inline]
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Returns the 1-based line containing byte offset `offset`.
    pub fn line_of(&self, offset: u32) -> u32 {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx as u32 + 1,
            Err(idx) => idx as u32,
        }
    }

    /// Returns line `line` (1-based) without its trailing newline, or an
    /// empty string when out of range.
    pub fn line(&self, line: u32) -> &'a str {
        let Some(&start) = self.line_starts.get(line as usize - 1) else {
            return "";
        };
        let rest = &self.text[start as usize..];
        let end = rest.find('\n').unwrap_or(rest.len());
        rest[..end].trim_end_matches('\r')
    }

    /// Rebuilds the full [`Position`] for a byte region.
    pub fn position(&self, start: u32, len: u32) -> Position {
        let line = self.line_of(start);
        let line_start = self.line_starts[line as usize - 1];
        Position {
            line,
            col: start - line_start + 1,
            start,
            len,
        }
    }
}

/// Wraps a value `T` with the [`Position`] it was read from.
///
/// Use this as a field type with the [`Deserialize`](crate::Deserialize)
/// helpers when the position must survive alongside the decoded value.
pub struct Spanned<T> {
    /// The deserialized value.
    pub value: T,
    /// Where in the document the value came from.
    pub pos: Position,
}

impl<T> Spanned<T> {
    /// Creates a [`Spanned`] with the given value and a default position.
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            value,
            pos: Position::default(),
        }
    }

    /// Creates a [`Spanned`] from a value and its [`Position`].
    #[inline]
    pub fn with_pos(value: T, pos: Position) -> Self {
        Self { value, pos }
    }

    /// Consumes the wrapper, returning the inner value.
    #[inline]
    pub fn take(self) -> T {
        self.value
    }
}

impl<T> Default for Spanned<T>
where
    T: Default,
{
    fn default() -> Self {
        Self {
            value: Default::default(),
            pos: Position::default(),
        }
    }
}

impl<T> AsRef<T> for Spanned<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T> std::fmt::Debug for Spanned<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}

impl<T> Clone for Spanned<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            pos: self.pos,
        }
    }
}

impl<T> PartialEq for Spanned<T>
where
    T: PartialEq,
{
    fn eq(&self, o: &Spanned<T>) -> bool {
        self.value == o.value
    }
}

impl<T> Eq for Spanned<T> where T: Eq {}

impl<T> PartialEq<T> for Spanned<T>
where
    T: PartialEq,
{
    fn eq(&self, o: &T) -> bool {
        &self.value == o
    }
}

impl<T> crate::de::Deserialize for Spanned<T>
where
    T: crate::de::Deserialize,
{
    #[inline]
    fn deserialize(
        ctx: &mut crate::de::Context,
        value: &mut crate::value::Item,
    ) -> Result<Self, crate::error::Error> {
        let pos = value.pos;
        let inner = T::deserialize(ctx, value)?;
        Ok(Self { pos, value: inner })
    }
}
