use super::{parse, parse_with, TomlVersion};
use crate::error::{Error, ErrorKind};
use crate::meta::{CommentPlacement, IntBase, MetaData, TypeHint};
use crate::table::Table;
use crate::time::DatetimeKind;

#[track_caller]
fn parse_ok(input: &str) -> (Table, MetaData) {
    parse(input).unwrap_or_else(|e| panic!("parse failed for {input:?}: {e}"))
}

#[track_caller]
fn parse_err(input: &str) -> Error {
    match parse(input) {
        Ok(_) => panic!("expected parse error for {input:?}"),
        Err(e) => e,
    }
}

fn key_strings(meta: &MetaData) -> Vec<String> {
    meta.keys().iter().map(|k| k.to_string()).collect()
}

#[test]
fn empty_documents() {
    for input in ["", "\n", "# just a comment\n", "   \t  \n\n"] {
        let (root, meta) = parse_ok(input);
        assert!(root.is_empty(), "for {input:?}");
        assert!(meta.keys().is_empty());
    }
}

#[test]
fn basic_scalar_values() {
    let (root, _) = parse_ok("a = \"hello\"");
    assert_eq!(root.get("a").unwrap().as_str(), Some("hello"));

    let (root, _) = parse_ok("a = 42");
    assert_eq!(root.get("a").unwrap().as_integer(), Some(42));

    let (root, _) = parse_ok("a = -100");
    assert_eq!(root.get("a").unwrap().as_integer(), Some(-100));

    let (root, _) = parse_ok("a = 3.14");
    let f = root.get("a").unwrap().as_float().unwrap();
    assert!((f - 3.14).abs() < f64::EPSILON);

    let (root, _) = parse_ok("a = true\nb = false");
    assert_eq!(root.get("a").unwrap().as_bool(), Some(true));
    assert_eq!(root.get("b").unwrap().as_bool(), Some(false));

    let (root, _) = parse_ok("a = 1\nb = 2\nc = 3");
    assert_eq!(root.len(), 3);
    assert_eq!(root.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
}

#[test]
fn scenario_single_key() {
    // S1: a = 1
    let (root, meta) = parse_ok("a = 1");
    assert_eq!(root.get("a").unwrap().as_integer(), Some(1));
    assert_eq!(key_strings(&meta), vec!["a"]);
    assert_eq!(
        meta.type_of(&["a"]),
        Some(&TypeHint::Integer {
            base: IntBase::Decimal,
            width: 0
        })
    );
}

#[test]
fn scenario_implicit_and_explicit_tables() {
    // S2: two sibling tables under an implicit parent.
    let input = "[servers.alpha]\nip = \"10.0.0.1\"\n[servers.beta]\nip = \"10.0.0.2\"\n";
    let (root, meta) = parse_ok(input);

    let servers = root.get("servers").unwrap().as_table().unwrap();
    let alpha = servers.get("alpha").unwrap().as_table().unwrap();
    assert_eq!(alpha.get("ip").unwrap().as_str(), Some("10.0.0.1"));
    let beta = servers.get("beta").unwrap().as_table().unwrap();
    assert_eq!(beta.get("ip").unwrap().as_str(), Some("10.0.0.2"));

    assert_eq!(
        key_strings(&meta),
        vec![
            "servers.alpha",
            "servers.alpha.ip",
            "servers.beta",
            "servers.beta.ip"
        ]
    );
    // The implicit parent is defined but not listed.
    assert!(meta.is_defined(&["servers"]));
    assert!(meta.is_defined(&["servers", "alpha"]));
    assert!(!meta.is_defined(&["servers", "gamma"]));
}

#[test]
fn scenario_array_missing_comma() {
    // S3.
    let err = parse_err("wrong = [ 1 2 3 ]");
    assert_eq!(
        err.to_string(),
        "expected a comma (',') or array terminator (']'), but got '2'"
    );
    assert_eq!((err.pos.line, err.pos.col), (1, 13));
}

#[test]
fn scenario_invalid_datetime() {
    // S5.
    let err = parse_err("d = 2006-01-30T");
    assert!(matches!(err.kind, ErrorKind::InvalidDatetime { .. }));
    assert_eq!(err.pos.col, 5);
    assert_eq!(err.pos.len, "2006-01-30T".len() as u32);
    let usage = err.kind.usage().expect("datetime errors carry help");
    assert!(usage.contains("2006-01-02"));
    assert!(usage.contains("local date"));
}

#[test]
fn scenario_array_of_inline_tables() {
    // S7.
    let (root, meta) = parse_ok("points = [ { x = 1, y = 2 }, { x = 3, y = 4 } ]");
    assert_eq!(
        meta.type_of(&["points"]),
        Some(&TypeHint::Array { single_line: true })
    );
    let points = root.get("points").unwrap().as_array().unwrap();
    assert_eq!(points.len(), 2);
    for p in points {
        assert_eq!(p.hint, TypeHint::Table { inline: true });
    }
    assert_eq!(points[1].as_table().unwrap().get("y").unwrap().as_integer(), Some(4));
}

#[test]
fn scenario_dotted_then_header() {
    // S8: the header may reopen the dotted table, but the key clash is
    // fatal.
    let err = parse_err("a.b = 1\n[a]\nb = 2\n");
    match err.kind {
        ErrorKind::DuplicateKey { key, .. } => assert_eq!(key, "a.b"),
        other => panic!("expected duplicate key, got {other:?}"),
    }
    assert_eq!(err.pos.line, 3);
}

#[test]
fn integer_bases() {
    let (root, meta) = parse_ok("h = 0xDEAD_BEEF\no = 0o755\nb = 0b1010\nz = 0x00ff");
    assert_eq!(root.get("h").unwrap().as_integer(), Some(0xDEADBEEF));
    assert_eq!(root.get("o").unwrap().as_integer(), Some(0o755));
    assert_eq!(root.get("b").unwrap().as_integer(), Some(10));
    assert_eq!(root.get("z").unwrap().as_integer(), Some(255));
    assert_eq!(
        meta.type_of(&["h"]),
        Some(&TypeHint::Integer {
            base: IntBase::Hex,
            width: 0
        })
    );
    assert_eq!(
        meta.type_of(&["z"]),
        Some(&TypeHint::Integer {
            base: IntBase::Hex,
            width: 4
        })
    );
}

#[test]
fn integer_shapes_rejected() {
    for input in [
        "a = 01",
        "a = 1__2",
        "a = 1_",
        "a = 0x",
        "a = 0x_1",
        "a = 0b2",
        "a = 0o8",
        "a = +0x1",
        "a = 1-2",
    ] {
        let err = parse_err(input);
        assert!(
            matches!(err.kind, ErrorKind::InvalidNumber | ErrorKind::UnquotedString),
            "for {input:?}: {:?}",
            err.kind
        );
    }
}

#[test]
fn integer_out_of_range() {
    let err = parse_err("a = 9223372036854775808");
    match &err.kind {
        ErrorKind::IntegerOutOfRange { text } => {
            assert_eq!(text, "9223372036854775808");
        }
        other => panic!("expected out-of-range, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "9223372036854775808 is out of range for int64"
    );
    assert!(err.kind.usage().unwrap().contains("int64"));

    // The extremes themselves fit.
    let (root, _) = parse_ok("min = -9223372036854775808\nmax = 9223372036854775807");
    assert_eq!(root.get("min").unwrap().as_integer(), Some(i64::MIN));
    assert_eq!(root.get("max").unwrap().as_integer(), Some(i64::MAX));

    let err = parse_err("a = 0xFFFF_FFFF_FFFF_FFFF");
    assert!(matches!(err.kind, ErrorKind::IntegerOutOfRange { .. }));
}

#[test]
fn float_values() {
    let (root, meta) = parse_ok(
        "pi = 3.14\nexp = 5e+22\nneg = 6.626e-34\nzero = -0.0\ninf1 = inf\ninf2 = -inf\nn1 = nan\nn2 = -nan\nfrac = 0.5",
    );
    assert_eq!(root.get("pi").unwrap().as_float(), Some(3.14));
    assert_eq!(root.get("exp").unwrap().as_float(), Some(5e22));
    assert_eq!(root.get("neg").unwrap().as_float(), Some(6.626e-34));

    let zero = root.get("zero").unwrap().as_float().unwrap();
    assert_eq!(zero, 0.0);
    assert!(zero.is_sign_negative());

    assert_eq!(root.get("inf1").unwrap().as_float(), Some(f64::INFINITY));
    assert_eq!(root.get("inf2").unwrap().as_float(), Some(f64::NEG_INFINITY));

    let n1 = root.get("n1").unwrap().as_float().unwrap();
    assert!(n1.is_nan() && !n1.is_sign_negative());
    let n2 = root.get("n2").unwrap().as_float().unwrap();
    assert!(n2.is_nan() && n2.is_sign_negative());

    assert_eq!(meta.type_of(&["pi"]), Some(&TypeHint::Float { exponent: false }));
    assert_eq!(meta.type_of(&["exp"]), Some(&TypeHint::Float { exponent: true }));
}

#[test]
fn float_shapes_rejected() {
    for input in ["a = 1.", "a = 1.e2", "a = 00.5", "a = 1._5", "a = 1e", "a = 1e_2"] {
        let err = parse_err(input);
        assert!(
            matches!(err.kind, ErrorKind::InvalidNumber | ErrorKind::Wanted { .. }),
            "for {input:?}: {:?}",
            err.kind
        );
    }
}

#[test]
fn datetime_values() {
    let (root, meta) = parse_ok(
        "full = 1979-05-27T07:32:00Z\nlocal = 1979-05-27T07:32:00\ndate = 1979-05-27\ntime = 07:32:00\nspaced = 1979-05-27 07:32:00-07:00",
    );
    let full = root.get("full").unwrap().as_datetime().unwrap();
    assert_eq!(full.kind(), DatetimeKind::Full);
    assert_eq!(
        meta.type_of(&["local"]),
        Some(&TypeHint::Datetime {
            format: DatetimeKind::Local
        })
    );
    assert_eq!(
        meta.type_of(&["date"]),
        Some(&TypeHint::Datetime {
            format: DatetimeKind::Date
        })
    );
    assert_eq!(
        meta.type_of(&["time"]),
        Some(&TypeHint::Datetime {
            format: DatetimeKind::Time
        })
    );
    let spaced = root.get("spaced").unwrap().as_datetime().unwrap();
    assert_eq!(spaced.kind(), DatetimeKind::Full);
}

#[test]
fn seconds_optional_only_in_v1_1() {
    let err = parse_err("t = 07:32");
    assert!(matches!(err.kind, ErrorKind::InvalidDatetime { .. }));
    let (root, _) = parse_with("t = 07:32", TomlVersion::V1_1).unwrap();
    let t = root.get("t").unwrap().as_datetime().unwrap();
    assert_eq!(t.time.unwrap().minute, 32);

    let err = parse_err("t = 1979-05-27T07:32Z");
    assert!(matches!(err.kind, ErrorKind::InvalidDatetime { .. }));
    assert!(parse_with("t = 1979-05-27T07:32Z", TomlVersion::V1_1).is_ok());
}

#[test]
fn string_escapes() {
    let (root, _) = parse_ok(r#"a = "line1\nline2""#);
    assert_eq!(root.get("a").unwrap().as_str(), Some("line1\nline2"));

    let (root, _) = parse_ok(r#"a = "col1\tcol2""#);
    assert_eq!(root.get("a").unwrap().as_str(), Some("col1\tcol2"));

    let (root, _) = parse_ok(r#"a = "say \"hi\"""#);
    assert_eq!(root.get("a").unwrap().as_str(), Some("say \"hi\""));

    let (root, _) = parse_ok(r#"a = "A\U0001F600""#);
    assert_eq!(root.get("a").unwrap().as_str(), Some("A\u{1F600}"));

    // Literal strings take no escapes.
    let (root, _) = parse_ok(r"a = 'no\nescape'");
    assert_eq!(root.get("a").unwrap().as_str(), Some("no\\nescape"));
}

#[test]
fn string_escape_errors() {
    let err = parse_err(r#"a = "\uD800""#);
    assert!(matches!(err.kind, ErrorKind::InvalidEscapeValue(0xD800)));

    let err = parse_err(r#"a = "\U00110000""#);
    assert!(matches!(err.kind, ErrorKind::InvalidEscapeValue(0x110000)));
}

#[test]
fn v1_1_escapes() {
    let (root, _) = parse_with(r#"a = "\x41\e""#, TomlVersion::V1_1).unwrap();
    assert_eq!(root.get("a").unwrap().as_str(), Some("A\u{1b}"));
}

#[test]
fn multiline_strings() {
    let (root, _) = parse_ok("a = \"\"\"\nhello\nworld\"\"\"");
    assert_eq!(root.get("a").unwrap().as_str(), Some("hello\nworld"));

    let (root, _) = parse_ok("a = '''\nhello\nworld'''");
    assert_eq!(root.get("a").unwrap().as_str(), Some("hello\nworld"));

    // Line continuation trims to the next non-whitespace.
    let (root, _) = parse_ok("a = \"\"\"one \\\n    two\"\"\"");
    assert_eq!(root.get("a").unwrap().as_str(), Some("one two"));

    let (root, _) = parse_ok("a = \"\"\"\\\n  leading\\\n  gone\"\"\"");
    assert_eq!(root.get("a").unwrap().as_str(), Some("leadinggone"));

    // Escapes still decode inside multiline basic strings.
    let (root, _) = parse_ok("a = \"\"\"tab\\there\"\"\"");
    assert_eq!(root.get("a").unwrap().as_str(), Some("tab\there"));
}

#[test]
fn string_hints() {
    let (_, meta) = parse_ok("a = \"x\"\nb = 'x'\nc = \"\"\"\nx\"\"\"\nd = '''x'''");
    assert_eq!(
        meta.type_of(&["a"]),
        Some(&TypeHint::String { literal: false, multiline: false })
    );
    assert_eq!(
        meta.type_of(&["b"]),
        Some(&TypeHint::String { literal: true, multiline: false })
    );
    assert_eq!(
        meta.type_of(&["c"]),
        Some(&TypeHint::String { literal: false, multiline: true })
    );
    assert_eq!(
        meta.type_of(&["d"]),
        Some(&TypeHint::String { literal: true, multiline: true })
    );
}

#[test]
fn duplicate_keys() {
    let err = parse_err("a = 1\na = 2");
    assert!(matches!(err.kind, ErrorKind::DuplicateKey { .. }));

    // Quoted and bare spellings collide.
    let err = parse_err("a = 1\n\"a\" = 2");
    assert!(matches!(err.kind, ErrorKind::DuplicateKey { .. }));

    let err = parse_err("p = { x = 1, x = 2 }");
    assert!(matches!(err.kind, ErrorKind::DuplicateKey { .. }));

    let err = parse_err("[t]\na = 1\na = 2");
    assert!(matches!(err.kind, ErrorKind::DuplicateKey { .. }));
}

#[test]
fn implicit_upgrade_once() {
    // An implicit table may be claimed by its own header exactly once.
    parse_ok("[a.b]\nx = 1\n[a]\ny = 2");
    let err = parse_err("[a.b]\n[a]\n[a]");
    assert!(matches!(err.kind, ErrorKind::DuplicateTable { .. }));

    let err = parse_err("[a]\n[a]");
    assert!(matches!(err.kind, ErrorKind::DuplicateTable { .. }));
}

#[test]
fn dotted_key_scopes() {
    // Extending your own dotted table is fine.
    parse_ok("a.b = 1\na.c = 2");
    parse_ok("[t]\na.b = 1\na.c = 2");

    // A header may not traverse a dotted-created table.
    let err = parse_err("a.b.c = 1\n[a.b]\nd = 2");
    assert!(matches!(err.kind, ErrorKind::DuplicateKey { .. }));

    // Dotted keys may not extend a table defined by a header.
    let err = parse_err("[a.b]\n[a]\nb.c = 1");
    assert!(matches!(err.kind, ErrorKind::DuplicateKey { .. }));

    // Dotted keys may not pierce a value.
    let err = parse_err("a = 1\na.b = 2");
    assert!(matches!(err.kind, ErrorKind::DottedKeyInvalidType { .. }));
}

#[test]
fn inline_tables_are_closed() {
    let err = parse_err("p = { x = 1 }\n[p]\ny = 2");
    assert!(matches!(err.kind, ErrorKind::DuplicateKey { .. }));

    let err = parse_err("p = { x = 1 }\n[p.q]\ny = 2");
    assert!(matches!(err.kind, ErrorKind::DuplicateKey { .. }));

    let err = parse_err("p = { x = 1 }\np.y = 2");
    assert!(matches!(err.kind, ErrorKind::DuplicateKey { .. }));

    // Nested inline tables are closed to dotted keys in the same table.
    let err = parse_err("p = { a = { b = 1 }, a.c = 2 }");
    assert!(matches!(err.kind, ErrorKind::DuplicateKey { .. }));
}

#[test]
fn inline_table_values() {
    let (root, meta) = parse_ok("p = { x = 1, y.z = \"deep\" }");
    let p = root.get("p").unwrap().as_table().unwrap();
    assert_eq!(p.get("x").unwrap().as_integer(), Some(1));
    let y = p.get("y").unwrap().as_table().unwrap();
    assert_eq!(y.get("z").unwrap().as_str(), Some("deep"));
    assert_eq!(meta.type_of(&["p"]), Some(&TypeHint::Table { inline: true }));
    // Directly-keyed inline entries land in the metadata.
    assert_eq!(
        meta.type_of(&["p", "x"]),
        Some(&TypeHint::Integer {
            base: IntBase::Decimal,
            width: 0
        })
    );
}

#[test]
fn arrays() {
    let (root, _) = parse_ok("a = [1, 2, 3]");
    let a = root.get("a").unwrap().as_array().unwrap();
    assert_eq!(a.len(), 3);
    assert_eq!(a[2].as_integer(), Some(3));

    // Heterogeneous arrays are accepted.
    let (root, _) = parse_ok("a = [1, \"two\", 3.0, [4]]");
    let a = root.get("a").unwrap().as_array().unwrap();
    assert_eq!(a[1].as_str(), Some("two"));
    assert_eq!(a[3].as_array().unwrap()[0].as_integer(), Some(4));

    // Trailing commas and comments.
    let (root, meta) = parse_ok("a = [\n  1, # one\n  2,\n]");
    assert_eq!(root.get("a").unwrap().as_array().unwrap().len(), 2);
    assert_eq!(
        meta.type_of(&["a"]),
        Some(&TypeHint::Array { single_line: false })
    );

    let (_, meta) = parse_ok("a = []");
    assert_eq!(
        meta.type_of(&["a"]),
        Some(&TypeHint::Array { single_line: true })
    );
}

#[test]
fn array_of_tables() {
    let input = "[[bin]]\nname = \"a\"\n[[bin]]\nname = \"b\"\n";
    let (root, meta) = parse_ok(input);
    let bins = root.get("bin").unwrap().as_array_tables().unwrap();
    assert_eq!(bins.len(), 2);
    assert_eq!(bins[0].get("name").unwrap().as_str(), Some("a"));
    assert_eq!(bins[1].get("name").unwrap().as_str(), Some("b"));

    // One key entry per [[...]] occurrence.
    assert_eq!(key_strings(&meta), vec!["bin", "bin.name", "bin", "bin.name"]);
    assert_eq!(
        meta.type_of(&["bin"]),
        Some(&TypeHint::ArrayTable { inline: false })
    );
}

#[test]
fn array_of_tables_sub_tables() {
    let input = "[[fruit]]\nname = \"apple\"\n[fruit.physical]\ncolor = \"red\"\n[[fruit]]\nname = \"banana\"\n";
    let (root, _) = parse_ok(input);
    let fruit = root.get("fruit").unwrap().as_array_tables().unwrap();
    assert_eq!(fruit.len(), 2);
    let physical = fruit[0].get("physical").unwrap().as_table().unwrap();
    assert_eq!(physical.get("color").unwrap().as_str(), Some("red"));
    assert_eq!(fruit[1].get("name").unwrap().as_str(), Some("banana"));
}

#[test]
fn array_of_tables_conflicts() {
    let err = parse_err("[a]\n[[a]]");
    assert!(matches!(err.kind, ErrorKind::RedefineAsArray));

    let err = parse_err("[[a]]\n[a]");
    assert!(matches!(err.kind, ErrorKind::DuplicateTable { .. }));

    // A static array cannot be extended by [[...]].
    let err = parse_err("a = []\n[[a]]");
    assert!(matches!(err.kind, ErrorKind::DuplicateKey { .. }));
}

#[test]
fn quoted_and_empty_keys() {
    let (root, _) = parse_ok("\"\" = 1\n\"a b\" = 2\n'c.d' = 3");
    assert_eq!(root.get("").unwrap().as_integer(), Some(1));
    assert_eq!(root.get("a b").unwrap().as_integer(), Some(2));
    assert_eq!(root.get("c.d").unwrap().as_integer(), Some(3));

    // An escaped quoted key unescapes before comparison.
    let err = parse_err("\"a\\u0062\" = 1\nab = 2");
    assert!(matches!(err.kind, ErrorKind::DuplicateKey { .. }));
}

#[test]
fn comment_attachment() {
    let input = "# first\n# second\na = 1  # trailing\n\n# orphan\n\nb = 2\n";
    let (_, meta) = parse_ok(input);

    let a = crate::meta::Key::from(["a"]);
    let comments = meta.comments_for(&a);
    assert_eq!(comments.len(), 3);
    assert_eq!(comments[0].placement, CommentPlacement::Doc);
    assert_eq!(comments[0].text, "first");
    assert_eq!(comments[1].text, "second");
    assert_eq!(comments[2].placement, CommentPlacement::Inline);
    assert_eq!(comments[2].text, "trailing");

    // The orphan comment has a blank line before `b`; nothing attaches.
    let b = crate::meta::Key::from(["b"]);
    assert!(meta.comments_for(&b).is_empty());
}

#[test]
fn header_comment_attachment() {
    let input = "# about t\n[t]  # inline\na = 1\n";
    let (_, meta) = parse_ok(input);
    let t = crate::meta::Key::from(["t"]);
    let comments = meta.comments_for(&t);
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].placement, CommentPlacement::Doc);
    assert_eq!(comments[0].text, "about t");
    assert_eq!(comments[1].placement, CommentPlacement::Inline);
}

#[test]
fn key_order_is_document_order() {
    let input = "b = 1\na = 2\n[z]\nq = 3\n[m]\np = 4\n";
    let (_, meta) = parse_ok(input);
    assert_eq!(key_strings(&meta), vec!["b", "a", "z", "z.q", "m", "m.p"]);
}

#[test]
fn parse_is_deterministic() {
    let input = "x = [1, 2]\n[t]\ny = 'z'\n[[aot]]\nn = 0.5\n";
    let (r1, m1) = parse_ok(input);
    let (r2, m2) = parse_ok(input);
    assert!(r1 == r2);
    assert_eq!(key_strings(&m1), key_strings(&m2));
}

#[test]
fn nesting_depth_limited() {
    let deep_ok = format!("a = {}1{}", "[".repeat(40), "]".repeat(40));
    parse_ok(&deep_ok);

    let too_deep = format!("a = {}1{}", "[".repeat(300), "]".repeat(300));
    let err = parse_err(&too_deep);
    assert!(matches!(err.kind, ErrorKind::Custom(_)));
}

#[test]
fn error_attribution_carries_key() {
    let err = parse_err("[server]\nretries = 99999999999999999999");
    assert_eq!(err.key.as_ref().map(|k| k.to_string()), Some("server.retries".into()));
}

#[test]
fn values_own_their_strings() {
    // The tree must outlive the source buffer.
    let (root, _) = {
        let source = String::from("a = \"owned\"");
        parse_ok(&source)
    };
    assert_eq!(root.get("a").unwrap().as_str(), Some("owned"));
}

#[test]
fn crlf_documents() {
    let (root, _) = parse_ok("a = 1\r\n[t]\r\nb = \"x\"\r\n");
    assert_eq!(root.get("a").unwrap().as_integer(), Some(1));
    let t = root.get("t").unwrap().as_table().unwrap();
    assert_eq!(t.get("b").unwrap().as_str(), Some("x"));
}

#[test]
fn value_positions() {
    let (root, _) = parse_ok("a = 1\nbb = \"xyz\"\n");
    let a = root.get("a").unwrap();
    assert_eq!((a.pos.line, a.pos.col), (1, 5));
    let bb = root.get("bb").unwrap();
    assert_eq!(bb.pos.line, 2);
    assert_eq!(bb.pos.col, 6);
    assert_eq!(bb.pos.len, 5);
}

#[test]
fn randomized_valid_documents() {
    // Build random flat documents and check every key parses back.
    let mut rng = oorandom::Rand32::new(7);
    for _ in 0..200 {
        let n = 1 + (rng.rand_u32() % 20) as usize;
        let mut doc = String::new();
        for i in 0..n {
            match rng.rand_u32() % 4 {
                0 => doc.push_str(&format!("k{i} = {}\n", rng.rand_u32())),
                1 => doc.push_str(&format!("k{i} = \"s{}\"\n", rng.rand_u32())),
                2 => doc.push_str(&format!("k{i} = {}.5\n", rng.rand_u32())),
                _ => doc.push_str(&format!("k{i} = [{}, {}]\n", rng.rand_u32(), rng.rand_u32())),
            }
        }
        let (root, meta) = parse_ok(&doc);
        assert_eq!(root.len(), n);
        assert_eq!(meta.keys().len(), n);
    }
}
