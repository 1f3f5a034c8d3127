//! Side-band metadata: key paths, per-key formatting hints, comments, and
//! the decoded-key bookkeeping used by adapters.

#[cfg(test)]
#[path = "./meta_tests.rs"]
mod tests;

use crate::time::DatetimeKind;
use crate::value::Value;
use std::borrow::Cow;
use std::fmt;

/// A full key path: one segment per dotted component.
///
/// `a.b.c` is three segments. Equality and hashing are segment-wise; the
/// [`fmt::Display`] form joins segments with `.` without quoting, while
/// [`Key::to_quoted_string`] quotes any segment that leaves the bare-key
/// set.
#[derive(Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Key {
    segments: Vec<String>,
}

impl Key {
    /// An empty (root) key path.
    #[inline]
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a new key with `segment` appended.
    pub fn join(&self, segment: impl Into<String>) -> Key {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment.into());
        Key { segments }
    }

    /// Appends a segment in place.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// Drops the last segment.
    pub fn pop(&mut self) {
        self.segments.pop();
    }

    /// The path segments.
    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final segment, if any.
    #[inline]
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Number of segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root path.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Display form with each segment quoted only when it contains a
    /// character outside the bare-key set.
    pub fn to_quoted_string(&self) -> String {
        let mut out = String::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(&maybe_quoted(seg));
        }
        out
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(seg)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<&str> for Key {
    fn from(segment: &str) -> Self {
        Key {
            segments: vec![segment.to_owned()],
        }
    }
}

impl From<&[&str]> for Key {
    fn from(segments: &[&str]) -> Self {
        Key {
            segments: segments.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl<const N: usize> From<[&str; N]> for Key {
    fn from(segments: [&str; N]) -> Self {
        Key {
            segments: segments.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl FromIterator<String> for Key {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Key {
            segments: iter.into_iter().collect(),
        }
    }
}

/// True for characters that may appear in an unquoted key segment.
pub(crate) fn is_bare_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Quotes a key segment if it contains anything outside the bare-key set.
pub(crate) fn maybe_quoted(segment: &str) -> Cow<'_, str> {
    if segment.is_empty() {
        return Cow::Borrowed("\"\"");
    }
    if segment.chars().all(is_bare_key_char) {
        return Cow::Borrowed(segment);
    }
    let mut out = String::with_capacity(segment.len() + 2);
    out.push('"');
    for c in segment.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    Cow::Owned(out)
}

/// Radix of an integer literal.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum IntBase {
    Binary,
    Octal,
    Decimal,
    Hex,
}

impl IntBase {
    /// The literal prefix for the base; empty for decimal.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Binary => "0b",
            Self::Octal => "0o",
            Self::Decimal => "",
            Self::Hex => "0x",
        }
    }
}

/// Formatting observed for a value in the source, replayed by the encoder.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TypeHint {
    /// A boolean; no sub-options.
    Bool,
    /// String style.
    String { literal: bool, multiline: bool },
    /// Integer base and zero-pad width. `width` is meaningful only for
    /// non-decimal bases; 0 means no padding.
    Integer { base: IntBase, width: u8 },
    /// Whether the float was written in exponent form.
    Float { exponent: bool },
    /// Which of the four datetime shapes was written.
    Datetime { format: DatetimeKind },
    /// Whether the table was written inline (`{ ... }`).
    Table { inline: bool },
    /// Whether the array's `[` and `]` shared a line.
    Array { single_line: bool },
    /// An array of tables. `inline` records an array of inline tables that
    /// was re-tagged by an adapter; headers otherwise.
    ArrayTable { inline: bool },
}

impl TypeHint {
    /// The default hint for a host-built value.
    pub fn for_value(value: &Value) -> TypeHint {
        match value {
            Value::Boolean(..) => TypeHint::Bool,
            Value::Integer(..) => TypeHint::Integer {
                base: IntBase::Decimal,
                width: 0,
            },
            Value::Float(..) => TypeHint::Float { exponent: false },
            Value::String(..) => TypeHint::String {
                literal: false,
                multiline: false,
            },
            Value::Datetime(dt) => TypeHint::Datetime { format: dt.kind() },
            Value::Array(..) => TypeHint::Array { single_line: true },
            Value::Table(..) => TypeHint::Table { inline: false },
            Value::ArrayTable(..) => TypeHint::ArrayTable { inline: false },
        }
    }

    /// A short name for error messages and the type tree.
    pub fn type_str(&self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::String { .. } => "string",
            Self::Integer { .. } => "integer",
            Self::Float { .. } => "float",
            Self::Datetime { .. } => "datetime",
            Self::Table { .. } => "table",
            Self::Array { .. } => "array",
            Self::ArrayTable { .. } => "array of tables",
        }
    }
}

/// Where a recorded comment sits relative to its key.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CommentPlacement {
    /// On its own line(s) immediately above the key.
    Doc,
    /// Trailing the key's line.
    Inline,
}

/// A comment attached to a key.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Comment {
    pub placement: CommentPlacement,
    pub text: String,
}

/// Metadata recorded alongside the value tree.
///
/// Holds the complete ordered key list, the per-key [`TypeHint`]s, comments
/// attached to keys, and the set of keys an adapter has decoded.
#[derive(Default)]
pub struct MetaData {
    keys: Vec<Key>,
    /// Every defined key, including implicit intermediate tables that the
    /// ordered list omits.
    defined: foldhash::HashSet<Key>,
    types: foldhash::HashMap<Key, TypeHint>,
    comments: foldhash::HashMap<Key, Vec<Comment>>,
    decoded: foldhash::HashSet<Key>,
}

impl MetaData {
    /// Creates empty metadata, for producers that build trees by hand.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every defined key in document order, including table headers and one
    /// entry per `[[header]]` occurrence. Implicit intermediate tables are
    /// not listed; see [`MetaData::is_defined`].
    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Reports whether the key path was defined in the document, counting
    /// tables created implicitly by dotted keys or child headers.
    pub fn is_defined<K: Into<Key> + Clone>(&self, key: &K) -> bool {
        let key: Key = key.clone().into();
        !key.is_empty() && self.defined.contains(&key)
    }

    /// The [`TypeHint`] recorded for a key, if the key was defined.
    pub fn type_of<K: Into<Key> + Clone>(&self, key: &K) -> Option<&TypeHint> {
        let key: Key = key.clone().into();
        self.types.get(&key)
    }

    /// The hint for an exact [`Key`].
    pub fn type_of_key(&self, key: &Key) -> Option<&TypeHint> {
        self.types.get(key)
    }

    /// Comments attached to a key, in recorded order.
    pub fn comments_for(&self, key: &Key) -> &[Comment] {
        self.comments.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Records a doc comment to be written above `key` when encoding.
    pub fn doc(&mut self, key: Key, text: impl Into<String>) {
        self.comments.entry(key).or_default().push(Comment {
            placement: CommentPlacement::Doc,
            text: text.into(),
        });
    }

    /// Records an inline comment to be written after `key`'s value.
    pub fn comment(&mut self, key: Key, text: impl Into<String>) {
        self.comments.entry(key).or_default().push(Comment {
            placement: CommentPlacement::Inline,
            text: text.into(),
        });
    }

    /// Marks a key (and its occurrences) as decoded.
    pub fn mark_decoded(&mut self, key: Key) {
        self.decoded.insert(key);
    }

    /// Whether a key has been marked decoded.
    pub fn is_decoded(&self, key: &Key) -> bool {
        self.decoded.contains(key)
    }

    /// All keys that have not been decoded, in document order.
    ///
    /// This includes keys captured in a [`Primitive`](crate::de::Primitive);
    /// decoding the primitive later marks them. Decoding into nothing
    /// decodes nothing, so every key is returned.
    pub fn undecoded(&self) -> Vec<Key> {
        self.keys
            .iter()
            .filter(|k| !self.decoded.contains(*k))
            .cloned()
            .collect()
    }

    // Parser-side recording.

    /// Appends to the ordered key list and marks the key defined.
    pub(crate) fn record_key(&mut self, key: Key) {
        self.defined.insert(key.clone());
        self.keys.push(key);
    }

    /// Marks a key defined without listing it (implicit intermediates).
    pub(crate) fn record_defined(&mut self, key: Key) {
        self.defined.insert(key);
    }

    pub(crate) fn set_type(&mut self, key: Key, hint: TypeHint) {
        self.types.insert(key, hint);
    }
}

impl fmt::Debug for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for key in &self.keys {
            match self.types.get(key) {
                Some(hint) => map.entry(key, &hint.type_str()),
                None => map.entry(key, &"?"),
            };
        }
        map.finish()
    }
}
