//! Decoding the value tree into host types, guided by [`MetaData`].
//!
//! The core never holds host types; implement [`Deserialize`] to pull your
//! records out of a parsed tree. [`TableHelper`] does the field
//! bookkeeping, and every successfully decoded key is recorded in the
//! metadata so [`MetaData::undecoded`] can report what the host ignored.

#[cfg(test)]
#[path = "./de_tests.rs"]
mod tests;

use crate::error::{Error, ErrorKind};
use crate::meta::{Key, MetaData, TypeHint};
use crate::parser::{parse_with, TomlVersion};
use crate::pos::{Position, Spanned};
use crate::table::Table;
use crate::time::Datetime;
use crate::value::{Item, Value};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Types that can be decoded from a TOML [`Item`].
pub trait Deserialize: Sized {
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error>;
}

/// Parses `source` and decodes the root table into `T`.
pub fn from_str<T: Deserialize>(source: &str) -> Result<T, Error> {
    from_str_with_meta(source, TomlVersion::V1_0).map(|(value, _)| value)
}

/// Like [`from_str`], returning the [`MetaData`] for undecoded-key and
/// type queries.
pub fn from_str_with_meta<T: Deserialize>(
    source: &str,
    version: TomlVersion,
) -> Result<(T, MetaData), Error> {
    let (root, meta) = parse_with(source, version)?;
    let mut ctx = Context::new(meta);
    let mut item = Item::with_pos(
        Value::Table(root),
        TypeHint::Table { inline: false },
        Position::default(),
    );
    let value = T::deserialize(&mut ctx, &mut item)?;
    Ok((value, ctx.into_meta()))
}

/// Decoding state: the metadata being annotated and the key path being
/// decoded, used for error attribution and decoded-key marking.
pub struct Context {
    meta: MetaData,
    path: Key,
}

impl Context {
    /// A context rooted at the top of the document.
    pub fn new(meta: MetaData) -> Self {
        Context {
            meta,
            path: Key::root(),
        }
    }

    /// The key currently being decoded.
    #[inline]
    pub fn path(&self) -> &Key {
        &self.path
    }

    /// Read access to the metadata.
    #[inline]
    pub fn meta(&self) -> &MetaData {
        &self.meta
    }

    /// Finishes decoding, returning the annotated metadata.
    pub fn into_meta(self) -> MetaData {
        self.meta
    }

    /// Marks the current key as decoded.
    pub fn mark_decoded(&mut self) {
        if !self.path.is_empty() {
            self.meta.mark_decoded(self.path.clone());
        }
    }

    /// Builds a "wanted X, found Y" error at `value`, attributed to the
    /// current key.
    pub fn error_expected_but_found(&self, expected: &'static str, value: &Item) -> Error {
        Error::with_key(
            ErrorKind::Wanted {
                expected,
                found: value.type_str(),
            },
            value.pos,
            self.path.clone(),
        )
    }

    fn push(&mut self, segment: &str) {
        self.path.push(segment);
    }

    fn pop(&mut self) {
        self.path.pop();
    }
}

/// Field-by-field decoding of a table value.
///
/// Takes the table out of the item; [`TableHelper::expect_empty`] then
/// reports any fields the host did not consume.
pub struct TableHelper<'ctx> {
    ctx: &'ctx mut Context,
    table: Table,
    pos: Position,
}

impl<'ctx> TableHelper<'ctx> {
    /// Creates a helper for the value, failing if it is not a table.
    pub fn new(ctx: &'ctx mut Context, value: &mut Item) -> Result<Self, Error> {
        let pos = value.pos;
        let table = match value.take() {
            Value::Table(t) => t,
            other => {
                let err = Error::with_key(
                    ErrorKind::Wanted {
                        expected: "a table",
                        found: other.type_str(),
                    },
                    pos,
                    ctx.path.clone(),
                );
                value.value = other;
                return Err(err);
            }
        };
        ctx.mark_decoded();
        Ok(TableHelper { ctx, table, pos })
    }

    /// Returns true if the table contains the specified key.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Takes the specified key and its value if it exists, without
    /// decoding it.
    #[inline]
    pub fn take(&mut self, name: &str) -> Option<Item> {
        self.table.remove(name)
    }

    /// Decodes the specified key, failing if it is absent.
    pub fn required<T: Deserialize>(&mut self, name: &'static str) -> Result<T, Error> {
        Ok(self.required_s(name)?.value)
    }

    /// The same as [`TableHelper::required`], wrapped in a [`Spanned`].
    pub fn required_s<T: Deserialize>(&mut self, name: &'static str) -> Result<Spanned<T>, Error> {
        let Some(mut item) = self.table.remove(name) else {
            return Err(Error::with_key(
                ErrorKind::MissingField(name),
                self.pos,
                self.ctx.path.clone(),
            ));
        };
        self.field(name, &mut item)
    }

    /// Decodes the specified key if it exists.
    pub fn optional<T: Deserialize>(&mut self, name: &str) -> Result<Option<T>, Error> {
        Ok(self.optional_s(name)?.map(|s| s.value))
    }

    /// The same as [`TableHelper::optional`], wrapped in a [`Spanned`].
    pub fn optional_s<T: Deserialize>(&mut self, name: &str) -> Result<Option<Spanned<T>>, Error> {
        let Some(mut item) = self.table.remove(name) else {
            return Ok(None);
        };
        self.field(name, &mut item).map(Some)
    }

    fn field<T: Deserialize>(&mut self, name: &str, item: &mut Item) -> Result<Spanned<T>, Error> {
        self.ctx.push(name);
        let result = Spanned::<T>::deserialize(self.ctx, item);
        let path = self.ctx.path.clone();
        self.ctx.pop();
        result.map_err(|mut err| {
            err.key.get_or_insert(path);
            err
        })
    }

    /// Finishes with this helper, erroring if unconsumed fields remain.
    pub fn expect_empty(self) -> Result<(), Error> {
        if self.table.is_empty() {
            return Ok(());
        }
        let keys = self
            .table
            .iter()
            .map(|(name, item)| (name.to_owned(), item.pos))
            .collect();
        Err(Error::with_key(
            ErrorKind::UnexpectedKeys { keys },
            self.pos,
            self.ctx.path.clone(),
        ))
    }
}

/// Attempts to take a string value and parse it with [`FromStr`].
///
/// This is the bridge for host types with a text form (the `from_text`
/// half of the custom-marshalling contract); parse failures surface as
/// callback errors with the key and position attached.
pub fn parse<T, E>(ctx: &mut Context, value: &mut Item) -> Result<T, Error>
where
    T: FromStr<Err = E>,
    E: Display,
{
    let pos = value.pos;
    let s = value.take_string(None)?;
    match s.parse() {
        Ok(v) => {
            ctx.mark_decoded();
            Ok(v)
        }
        Err(err) => Err(Error::with_key(
            ErrorKind::Custom(format!("failed to parse string: {err}").into()),
            pos,
            ctx.path().clone(),
        )),
    }
}

/// An undecoded subtree captured with its key context.
///
/// Decoding a `Primitive` defers the real decode; the captured keys stay
/// in [`MetaData::undecoded`] until [`MetaData::primitive_decode`] runs.
pub struct Primitive {
    item: Item,
    key: Key,
}

impl Primitive {
    /// The key the subtree was captured at.
    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// A borrowed view of the captured value.
    #[inline]
    pub fn item(&self) -> &Item {
        &self.item
    }
}

impl Deserialize for Primitive {
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
        let item = Item::with_pos(value.take(), value.hint, value.pos);
        Ok(Primitive {
            item,
            key: ctx.path().clone(),
        })
    }
}

impl MetaData {
    /// Decodes a deferred [`Primitive`], marking its keys decoded.
    pub fn primitive_decode<T: Deserialize>(&mut self, primitive: Primitive) -> Result<T, Error> {
        let meta = std::mem::take(self);
        let mut ctx = Context {
            meta,
            path: primitive.key,
        };
        let mut item = primitive.item;
        let result = T::deserialize(&mut ctx, &mut item);
        let path = ctx.path.clone();
        if result.is_ok() {
            ctx.mark_decoded();
        }
        *self = ctx.into_meta();
        result.map_err(|mut err| {
            err.key.get_or_insert(path);
            err
        })
    }
}

// Scalar implementations.

impl Deserialize for String {
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
        let s = value.take_string(None)?;
        ctx.mark_decoded();
        Ok(s)
    }
}

impl Deserialize for bool {
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
        match value.as_bool() {
            Some(b) => {
                ctx.mark_decoded();
                Ok(b)
            }
            None => Err(ctx.error_expected_but_found("a boolean", value)),
        }
    }
}

fn deser_integer(
    ctx: &mut Context,
    value: &mut Item,
    min: i64,
    max: i64,
    name: &'static str,
) -> Result<i64, Error> {
    match value.as_integer() {
        Some(i) if i >= min && i <= max => {
            ctx.mark_decoded();
            Ok(i)
        }
        Some(i) => Err(Error::with_key(
            ErrorKind::OutOfRange {
                target: name,
                value: i.to_string(),
            },
            value.pos,
            ctx.path().clone(),
        )),
        None => Err(ctx.error_expected_but_found("an integer", value)),
    }
}

macro_rules! integer {
    ($($num:ty),+) => {$(
        impl Deserialize for $num {
            fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
                match deser_integer(ctx, value, <$num>::MIN as i64, <$num>::MAX as i64, stringify!($num)) {
                    Ok(i) => Ok(i as $num),
                    Err(e) => Err(e),
                }
            }
        }
    )+};
}

integer!(i8, i16, i32, isize, u8, u16, u32);

impl Deserialize for i64 {
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
        deser_integer(ctx, value, i64::MIN, i64::MAX, "i64")
    }
}

impl Deserialize for u64 {
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
        match deser_integer(ctx, value, 0, i64::MAX, "u64") {
            Ok(i) => Ok(i as u64),
            Err(e) => Err(e),
        }
    }
}

impl Deserialize for usize {
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
        const MAX: i64 = if usize::BITS < 64 {
            usize::MAX as i64
        } else {
            i64::MAX
        };
        match deser_integer(ctx, value, 0, MAX, "usize") {
            Ok(i) => Ok(i as usize),
            Err(e) => Err(e),
        }
    }
}

impl Deserialize for f32 {
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
        f64::deserialize(ctx, value).map(|f| f as f32)
    }
}

impl Deserialize for f64 {
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
        match value.value {
            Value::Float(f) => {
                ctx.mark_decoded();
                Ok(f)
            }
            // Integers widen losslessly enough for config use.
            Value::Integer(i) => {
                ctx.mark_decoded();
                Ok(i as f64)
            }
            _ => Err(ctx.error_expected_but_found("a float", value)),
        }
    }
}

impl Deserialize for Datetime {
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
        match value.as_datetime() {
            Some(dt) => {
                let dt = *dt;
                ctx.mark_decoded();
                Ok(dt)
            }
            None => Err(ctx.error_expected_but_found("a datetime", value)),
        }
    }
}

impl<T> Deserialize for Vec<T>
where
    T: Deserialize,
{
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
        let pos = value.pos;
        let items = match value.take() {
            Value::Array(items) => items,
            Value::ArrayTable(tables) => tables
                .into_iter()
                .map(|t| Item::new(Value::Table(t)))
                .collect(),
            other => {
                let err = Error::with_key(
                    ErrorKind::Wanted {
                        expected: "an array",
                        found: other.type_str(),
                    },
                    pos,
                    ctx.path().clone(),
                );
                value.value = other;
                return Err(err);
            }
        };
        ctx.mark_decoded();
        let mut out = Vec::with_capacity(items.len());
        for mut item in items {
            out.push(T::deserialize(ctx, &mut item)?);
        }
        Ok(out)
    }
}

impl Deserialize for Duration {
    /// Durations decode from strings like `"300ms"` or `"2h45m"`: decimal
    /// numbers with unit suffixes `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`.
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
        let pos = value.pos;
        let s = value.take_string(Some("a duration string"))?;
        match parse_duration(&s) {
            Some(d) => {
                ctx.mark_decoded();
                Ok(d)
            }
            None => Err(Error::with_key(
                ErrorKind::InvalidDuration { input: s },
                pos,
                ctx.path().clone(),
            )),
        }
    }
}

/// Parses a duration string: one or more `<decimal><unit>` components,
/// e.g. `"1h30m"`, `"1.5s"`, `"300ms"`. A bare `"0"` is allowed. Returns
/// `None` for unknown units, missing numbers, or negative durations.
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.starts_with('-') {
        return None;
    }
    if s == "0" {
        return Some(Duration::ZERO);
    }
    if s.is_empty() {
        return None;
    }

    let mut total_nanos: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let number = &rest[..digits_end];
        if number.is_empty() || number == "." {
            return None;
        }
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "\u{b5}s" | "\u{3bc}s" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            _ => return None,
        };

        let (int_part, frac_part) = match number.split_once('.') {
            Some((i, f)) => (i, f),
            None => (number, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        let int: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().ok()?
        };
        total_nanos = total_nanos.checked_add(int.checked_mul(scale)?)?;

        if !frac_part.is_empty() {
            let mut frac_nanos: u128 = 0;
            let mut denom: u128 = 1;
            for c in frac_part.chars() {
                let d = c.to_digit(10)? as u128;
                frac_nanos = frac_nanos.checked_mul(10)?.checked_add(d)?;
                denom = denom.checked_mul(10)?;
            }
            total_nanos = total_nanos.checked_add(frac_nanos.checked_mul(scale)? / denom)?;
        }
    }

    let secs = (total_nanos / 1_000_000_000) as u64;
    let nanos = (total_nanos % 1_000_000_000) as u32;
    Some(Duration::new(secs, nanos))
}
