use super::*;
use crate::time::DatetimeKind;
use crate::value::{Item, Value};

#[test]
fn key_construction_and_display() {
    let k = Key::from(["a", "b", "c"]);
    assert_eq!(k.len(), 3);
    assert_eq!(k.to_string(), "a.b.c");
    assert_eq!(k.last(), Some("c"));
    assert_eq!(k.segments(), &["a", "b", "c"]);

    let mut k2 = Key::root();
    assert!(k2.is_empty());
    k2.push("a");
    let k3 = k2.join("b");
    assert_eq!(k3.to_string(), "a.b");
    assert_eq!(k2.to_string(), "a");
    k2.pop();
    assert!(k2.is_empty());
}

#[test]
fn key_equality_is_segment_wise() {
    assert_eq!(Key::from(["a", "b"]), Key::from(["a", "b"]));
    // "a.b" as one segment is not the path a.b.
    assert_ne!(Key::from(["a.b"]), Key::from(["a", "b"]));
}

#[test]
fn key_quoting() {
    assert_eq!(Key::from(["plain", "k-1"]).to_quoted_string(), "plain.k-1");
    assert_eq!(Key::from(["has space"]).to_quoted_string(), "\"has space\"");
    assert_eq!(Key::from(["a.b", "c"]).to_quoted_string(), "\"a.b\".c");
    assert_eq!(Key::from([""]).to_quoted_string(), "\"\"");
    assert_eq!(Key::from(["say \"hi\""]).to_quoted_string(), "\"say \\\"hi\\\"\"");
    assert_eq!(Key::from(["tab\there"]).to_quoted_string(), "\"tab\\there\"");
}

#[test]
fn type_hints_for_values() {
    assert_eq!(TypeHint::for_value(&Value::Boolean(true)), TypeHint::Bool);
    assert_eq!(
        TypeHint::for_value(&Value::Array(vec![])),
        TypeHint::Array { single_line: true }
    );
    let dt = crate::time::Datetime::parse("07:32:00").unwrap();
    assert_eq!(
        TypeHint::for_value(&Value::Datetime(dt)),
        TypeHint::Datetime {
            format: DatetimeKind::Time
        }
    );
    assert_eq!(TypeHint::Bool.type_str(), "boolean");
    assert_eq!(
        TypeHint::ArrayTable { inline: false }.type_str(),
        "array of tables"
    );
}

#[test]
fn recording_and_queries() {
    let mut meta = MetaData::new();
    meta.record_key(Key::from(["a"]));
    meta.record_key(Key::from(["t", "b"]));
    meta.record_defined(Key::from(["t"]));
    meta.set_type(
        Key::from(["a"]),
        TypeHint::Integer {
            base: IntBase::Decimal,
            width: 0,
        },
    );

    assert_eq!(meta.keys().len(), 2);
    assert!(meta.is_defined(&["a"]));
    assert!(meta.is_defined(&["t"]));
    assert!(meta.is_defined(&["t", "b"]));
    assert!(!meta.is_defined(&["missing"]));
    // An empty path is never defined.
    let empty: [&str; 0] = [];
    assert!(!meta.is_defined(&empty));

    assert!(meta.type_of(&["a"]).is_some());
    assert!(meta.type_of(&["t", "b"]).is_none());
}

#[test]
fn decoded_tracking() {
    let mut meta = MetaData::new();
    meta.record_key(Key::from(["a"]));
    meta.record_key(Key::from(["b"]));
    meta.record_key(Key::from(["c"]));

    assert_eq!(meta.undecoded().len(), 3);
    meta.mark_decoded(Key::from(["b"]));
    let undecoded: Vec<String> = meta.undecoded().iter().map(|k| k.to_string()).collect();
    assert_eq!(undecoded, vec!["a", "c"]);
    assert!(meta.is_decoded(&Key::from(["b"])));

    // Repeated array-of-tables keys clear together.
    let mut meta = MetaData::new();
    meta.record_key(Key::from(["aot"]));
    meta.record_key(Key::from(["aot"]));
    meta.mark_decoded(Key::from(["aot"]));
    assert!(meta.undecoded().is_empty());
}

#[test]
fn comment_recording() {
    let mut meta = MetaData::new();
    let key = Key::from(["a"]);
    meta.doc(key.clone(), "above");
    meta.comment(key.clone(), "beside");

    let comments = meta.comments_for(&key);
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].placement, CommentPlacement::Doc);
    assert_eq!(comments[0].text, "above");
    assert_eq!(comments[1].placement, CommentPlacement::Inline);
    assert!(meta.comments_for(&Key::from(["other"])).is_empty());
}

#[test]
fn item_hint_agrees_with_meta() {
    let (root, meta) = crate::parser::parse("x = 0b101").unwrap();
    let item: &Item = root.get("x").unwrap();
    assert_eq!(Some(&item.hint), meta.type_of(&["x"]));
}
