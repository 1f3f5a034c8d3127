//! The owned value tree produced by the parser.
//!
//! An [`Item`] pairs a [`Value`] with the [`TypeHint`] observed in the
//! source and the [`Position`] it was read from. After a parse returns, the
//! tree owns every string it holds; the source buffer may be dropped.

#[cfg(test)]
#[path = "./value_tests.rs"]
mod tests;

use crate::error::{Error, ErrorKind};
use crate::meta::TypeHint;
use crate::pos::Position;
use crate::table::Table;
use crate::time::Datetime;
use std::fmt;

/// A TOML value as a tagged variant.
///
/// The encoder switches on this tag; it never introspects host types. Host
/// adapters translate between user records and this tree at the boundary.
#[derive(Clone, PartialEq)]
pub enum Value {
    /// A boolean
    Boolean(bool),
    /// A 64-bit signed integer
    Integer(i64),
    /// A 64-bit IEEE-754 float
    Float(f64),
    /// A string
    String(String),
    /// A datetime in one of the four TOML shapes
    Datetime(Datetime),
    /// An array of values
    Array(Vec<Item>),
    /// A table
    Table(Table),
    /// An array of tables, one entry per `[[header]]` occurrence
    ArrayTable(Vec<Table>),
}

impl Value {
    /// Gets the type of the value as a string.
    pub fn type_str(&self) -> &'static str {
        match self {
            Self::Boolean(..) => "boolean",
            Self::Integer(..) => "integer",
            Self::Float(..) => "float",
            Self::String(..) => "string",
            Self::Datetime(..) => "datetime",
            Self::Array(..) => "array",
            Self::Table(..) => "table",
            Self::ArrayTable(..) => "array of tables",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => b.fmt(f),
            Self::Integer(i) => i.fmt(f),
            Self::Float(v) => v.fmt(f),
            Self::String(s) => s.fmt(f),
            Self::Datetime(dt) => write!(f, "{dt}"),
            Self::Array(a) => f.debug_list().entries(a).finish(),
            Self::Table(t) => t.fmt(f),
            Self::ArrayTable(ts) => f.debug_list().entries(ts).finish(),
        }
    }
}

/// A [`Value`] together with its formatting hint and source position.
#[derive(Clone)]
pub struct Item {
    /// The value itself.
    pub value: Value,
    /// Formatting observed in the source, used for round-trip encoding.
    pub hint: TypeHint,
    /// Where the value was read from. Default for host-built items.
    pub pos: Position,
}

impl Item {
    /// Creates an [`Item`] with the default formatting hint for `value` and
    /// no source position. This is the constructor for host-built trees.
    pub fn new(value: Value) -> Self {
        let hint = TypeHint::for_value(&value);
        Self {
            value,
            hint,
            pos: Position::default(),
        }
    }

    /// Creates an [`Item`] carrying an explicit hint and position.
    pub(crate) fn with_pos(value: Value, hint: TypeHint, pos: Position) -> Self {
        Self { value, hint, pos }
    }

    /// Gets the type of the value as a string.
    #[inline]
    pub fn type_str(&self) -> &'static str {
        self.value.type_str()
    }

    /// Returns a borrowed string if this is a string value.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns an `i64` if this is an integer value.
    #[inline]
    pub fn as_integer(&self) -> Option<i64> {
        match self.value {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// Returns an `f64` if this is a float value.
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self.value {
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Returns a `bool` if this is a boolean value.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the datetime if this is a datetime value.
    #[inline]
    pub fn as_datetime(&self) -> Option<&Datetime> {
        match &self.value {
            Value::Datetime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Returns the elements if this is an array value.
    #[inline]
    pub fn as_array(&self) -> Option<&[Item]> {
        match &self.value {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns a mutable element vector if this is an array value.
    #[inline]
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Item>> {
        match &mut self.value {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns a borrowed table if this is a table value.
    #[inline]
    pub fn as_table(&self) -> Option<&Table> {
        match &self.value {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Returns a mutable table reference.
    #[inline]
    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match &mut self.value {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the table list if this is an array of tables.
    #[inline]
    pub fn as_array_tables(&self) -> Option<&[Table]> {
        match &self.value {
            Value::ArrayTable(ts) => Some(ts),
            _ => None,
        }
    }

    /// Returns true if the value is a table and has the specified key.
    #[inline]
    pub fn has_key(&self, key: &str) -> bool {
        self.as_table().is_some_and(|t| t.contains_key(key))
    }

    /// Takes the payload, replacing self with `Boolean(false)`.
    /// The hint and position are preserved on the husk.
    #[inline]
    pub fn take(&mut self) -> Value {
        std::mem::replace(&mut self.value, Value::Boolean(false))
    }

    /// Takes the value as a string, returning an error if it is not one.
    pub fn take_string(&mut self, msg: Option<&'static str>) -> Result<String, Error> {
        match self.take() {
            Value::String(s) => Ok(s),
            other => {
                let err = Error::new(
                    ErrorKind::Wanted {
                        expected: msg.unwrap_or("a string"),
                        found: other.type_str(),
                    },
                    self.pos,
                );
                self.value = other;
                Err(err)
            }
        }
    }

    /// Builds a "wanted X, found Y" error located at this item.
    pub fn expected(&self, expected: &'static str) -> Error {
        Error::new(
            ErrorKind::Wanted {
                expected,
                found: self.type_str(),
            },
            self.pos,
        )
    }
}

impl PartialEq for Item {
    /// Items compare by value; hint and position are presentation data.
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl From<Value> for Item {
    fn from(value: Value) -> Self {
        Item::new(value)
    }
}

impl From<bool> for Item {
    fn from(v: bool) -> Self {
        Item::new(Value::Boolean(v))
    }
}

impl From<i64> for Item {
    fn from(v: i64) -> Self {
        Item::new(Value::Integer(v))
    }
}

impl From<f64> for Item {
    fn from(v: f64) -> Self {
        Item::new(Value::Float(v))
    }
}

impl From<&str> for Item {
    fn from(v: &str) -> Self {
        Item::new(Value::String(v.to_owned()))
    }
}

impl From<String> for Item {
    fn from(v: String) -> Self {
        Item::new(Value::String(v))
    }
}

impl From<Datetime> for Item {
    fn from(v: Datetime) -> Self {
        Item::new(Value::Datetime(v))
    }
}

impl From<Table> for Item {
    fn from(v: Table) -> Self {
        Item::new(Value::Table(v))
    }
}
