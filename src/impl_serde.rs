//! `serde::Serialize` for the value tree, enabled by the `serde` feature.
//! Datetimes serialize as their canonical string form.

use crate::table::Table;
use crate::value::{Item, Value};
use serde::ser::{SerializeMap, SerializeSeq};

impl serde::Serialize for Item {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(ser)
    }
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Boolean(b) => ser.serialize_bool(*b),
            Value::Integer(i) => ser.serialize_i64(*i),
            Value::Float(f) => ser.serialize_f64(*f),
            Value::String(s) => ser.serialize_str(s),
            Value::Datetime(dt) => ser.serialize_str(&dt.to_string()),
            Value::Array(items) => {
                let mut seq = ser.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Table(table) => table.serialize(ser),
            Value::ArrayTable(tables) => {
                let mut seq = ser.serialize_seq(Some(tables.len()))?;
                for table in tables {
                    seq.serialize_element(table)?;
                }
                seq.end()
            }
        }
    }
}

impl serde::Serialize for Table {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = ser.serialize_map(Some(self.len()))?;
        for (key, item) in self.iter() {
            map.serialize_entry(key, item)?;
        }
        map.end()
    }
}
