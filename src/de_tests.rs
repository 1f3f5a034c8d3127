use super::*;
use crate::error::ErrorKind;
use crate::meta::Key;

#[derive(Debug, PartialEq)]
struct Server {
    host: String,
    port: u16,
    tags: Vec<String>,
}

impl Deserialize for Server {
    fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
        let mut th = TableHelper::new(ctx, value)?;
        let host = th.required("host")?;
        let port = th.optional("port")?.unwrap_or(80);
        let tags = th.optional("tags")?.unwrap_or_default();
        th.expect_empty()?;
        Ok(Server { host, port, tags })
    }
}

#[test]
fn struct_decoding() {
    let server: Server =
        from_str("host = \"example.com\"\nport = 8080\ntags = [\"a\", \"b\"]\n").unwrap();
    assert_eq!(
        server,
        Server {
            host: "example.com".into(),
            port: 8080,
            tags: vec!["a".into(), "b".into()],
        }
    );
}

#[test]
fn optional_fields_default() {
    let server: Server = from_str("host = \"h\"\n").unwrap();
    assert_eq!(server.port, 80);
    assert!(server.tags.is_empty());
}

#[test]
fn missing_required_field() {
    let err = from_str::<Server>("port = 1\n").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingField("host")));
}

#[test]
fn unexpected_keys_rejected() {
    let err = from_str::<Server>("host = \"h\"\nbogus = 1\nworse = 2\n").unwrap_err();
    match err.kind {
        ErrorKind::UnexpectedKeys { keys } => {
            let names: Vec<_> = keys.iter().map(|(n, _)| n.as_str()).collect();
            assert_eq!(names, vec!["bogus", "worse"]);
        }
        other => panic!("expected unexpected-keys, got {other:?}"),
    }
}

#[test]
fn type_mismatch_carries_key_path() {
    let err = from_str::<Server>("host = 42\n").unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::Wanted {
            expected: "a string",
            ..
        }
    ));
    assert_eq!(err.key.as_ref().map(|k| k.to_string()), Some("host".into()));
}

#[test]
fn integer_width_check() {
    // S4: a value that does not fit the host type.
    #[derive(Debug)]
    struct Narrow {
        int: i8,
    }
    impl Deserialize for Narrow {
        fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
            let mut th = TableHelper::new(ctx, value)?;
            let int = th.required("Int")?;
            th.expect_empty()?;
            Ok(Narrow { int })
        }
    }

    let ok: Narrow = from_str("Int = -128\n").unwrap();
    assert_eq!(ok.int, -128);

    let err = from_str::<Narrow>("Int = 200\n").unwrap_err();
    match &err.kind {
        ErrorKind::OutOfRange { target, value } => {
            assert_eq!(*target, "i8");
            assert_eq!(value, "200");
        }
        other => panic!("expected out-of-range, got {other:?}"),
    }
    assert_eq!(err.key.as_ref().map(|k| k.to_string()), Some("Int".into()));
    assert_eq!(err.to_string(), "key `Int`: 200 is out of range for i8");
    assert!(err.kind.usage().unwrap().contains("int8"));
    // The error points at the offending value in the source.
    assert_eq!((err.pos.line, err.pos.col), (1, 7));
}

#[test]
fn scalar_conversions() {
    struct All {
        u: u64,
        f: f64,
        widened: f64,
        b: bool,
        dt: crate::time::Datetime,
    }
    impl Deserialize for All {
        fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
            let mut th = TableHelper::new(ctx, value)?;
            Ok(All {
                u: th.required("u")?,
                f: th.required("f")?,
                widened: th.required("widened")?,
                b: th.required("b")?,
                dt: th.required("dt")?,
            })
        }
    }
    let all: All =
        from_str("u = 18\nf = 2.5\nwidened = 3\nb = true\ndt = 1979-05-27T07:32:00Z\n").unwrap();
    assert_eq!(all.u, 18);
    assert_eq!(all.f, 2.5);
    assert_eq!(all.widened, 3.0);
    assert!(all.b);
    assert_eq!(all.dt.to_string(), "1979-05-27T07:32:00Z");
}

#[test]
fn negative_into_unsigned() {
    #[derive(Debug)]
    struct U {
        n: u32,
    }
    impl Deserialize for U {
        fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
            let mut th = TableHelper::new(ctx, value)?;
            Ok(U {
                n: th.required("n")?,
            })
        }
    }
    let err = from_str::<U>("n = -1\n").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::OutOfRange { target: "u32", .. }));
}

#[test]
fn durations() {
    #[derive(Debug)]
    struct Timeouts {
        t: std::time::Duration,
    }
    impl Deserialize for Timeouts {
        fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
            let mut th = TableHelper::new(ctx, value)?;
            Ok(Timeouts {
                t: th.required("t")?,
            })
        }
    }
    use std::time::Duration;

    let cases = [
        ("300ms", Duration::from_millis(300)),
        ("2s", Duration::from_secs(2)),
        ("1h30m", Duration::from_secs(5400)),
        ("1.5h", Duration::from_secs(5400)),
        ("2h45m", Duration::from_secs(9900)),
        ("100ns", Duration::from_nanos(100)),
        ("15us", Duration::from_micros(15)),
        ("15\u{b5}s", Duration::from_micros(15)),
        ("0", Duration::ZERO),
        ("0.5s", Duration::from_millis(500)),
    ];
    for (text, expected) in cases {
        let t: Timeouts = from_str(&format!("t = \"{text}\"\n")).unwrap();
        assert_eq!(t.t, expected, "for {text:?}");
    }

    // S6: unknown units fail with the units help.
    let err = from_str::<Timeouts>("t = \"99 bottles\"\n").unwrap_err();
    assert_eq!(
        err.to_string(),
        "key `t`: invalid duration: \"99 bottles\""
    );
    assert!(err.kind.usage().unwrap().contains("\"ms\""));

    for bad in ["", "12", "s", "-1s", "1x", "1h30"] {
        let res = from_str::<Timeouts>(&format!("t = \"{bad}\"\n"));
        assert!(res.is_err(), "expected failure for {bad:?}");
    }
}

#[test]
fn decoded_key_tracking() {
    struct Partial {
        a: i64,
    }
    impl Deserialize for Partial {
        fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
            let mut th = TableHelper::new(ctx, value)?;
            let a = th.required("a")?;
            // Leave the rest unconsumed.
            let _ = th.take("rest");
            Ok(Partial { a })
        }
    }
    let (p, meta) = from_str_with_meta::<Partial>("a = 1\nrest = 2\nmore = 3\n", TomlVersion::V1_0)
        .unwrap();
    assert_eq!(p.a, 1);
    let undecoded: Vec<String> = meta.undecoded().iter().map(|k| k.to_string()).collect();
    assert_eq!(undecoded, vec!["rest", "more"]);
}

#[test]
fn primitive_defers_decoding() {
    struct Outer {
        late: Primitive,
    }
    impl Deserialize for Outer {
        fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
            let mut th = TableHelper::new(ctx, value)?;
            Ok(Outer {
                late: th.required("late")?,
            })
        }
    }
    let (outer, mut meta) =
        from_str_with_meta::<Outer>("late = 42\n", TomlVersion::V1_0).unwrap();
    assert_eq!(outer.late.key().to_string(), "late");
    assert_eq!(
        meta.undecoded().iter().map(|k| k.to_string()).collect::<Vec<_>>(),
        vec!["late"]
    );

    let n: i64 = meta.primitive_decode(outer.late).unwrap();
    assert_eq!(n, 42);
    assert!(meta.undecoded().is_empty());
}

#[test]
fn primitive_decode_failure_keeps_key() {
    struct Outer {
        late: Primitive,
    }
    impl Deserialize for Outer {
        fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
            let mut th = TableHelper::new(ctx, value)?;
            Ok(Outer {
                late: th.required("late")?,
            })
        }
    }
    let (outer, mut meta) =
        from_str_with_meta::<Outer>("late = \"nope\"\n", TomlVersion::V1_0).unwrap();
    let err = meta.primitive_decode::<i64>(outer.late).unwrap_err();
    assert_eq!(err.key.as_ref().map(|k| k.to_string()), Some("late".into()));
    assert!(!meta.undecoded().is_empty());
}

#[test]
fn spanned_fields() {
    struct S {
        name: crate::pos::Spanned<String>,
    }
    impl Deserialize for S {
        fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
            let mut th = TableHelper::new(ctx, value)?;
            Ok(S {
                name: th.required_s("name")?.take(),
            })
        }
    }
    let s: S = from_str("name = \"hello\"\n").unwrap();
    assert_eq!(s.name.value, "hello");
    assert_eq!(s.name.pos.line, 1);
    assert_eq!(s.name.pos.col, 8);
}

#[test]
fn vec_from_array_of_tables() {
    #[derive(Debug, PartialEq)]
    struct Thing {
        name: String,
    }
    impl Deserialize for Thing {
        fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
            let mut th = TableHelper::new(ctx, value)?;
            Ok(Thing {
                name: th.required("name")?,
            })
        }
    }
    struct Doc {
        things: Vec<Thing>,
    }
    impl Deserialize for Doc {
        fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
            let mut th = TableHelper::new(ctx, value)?;
            Ok(Doc {
                things: th.required("things")?,
            })
        }
    }
    let doc: Doc =
        from_str("[[things]]\nname = \"hammer\"\n[[things]]\nname = \"drill\"\n").unwrap();
    assert_eq!(doc.things.len(), 2);
    assert_eq!(doc.things[1].name, "drill");

    // Inline arrays of tables work the same way.
    let doc: Doc = from_str("things = [{ name = \"x\" }]\n").unwrap();
    assert_eq!(doc.things[0].name, "x");
}

#[test]
fn fromstr_bridge() {
    #[derive(Debug)]
    struct Net {
        ip: std::net::Ipv4Addr,
    }
    impl Deserialize for Net {
        fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
            let mut th = TableHelper::new(ctx, value)?;
            let mut item = th.take("ip").ok_or_else(|| {
                Error::with_key(ErrorKind::MissingField("ip"), value.pos, ctx.path().clone())
            })?;
            let ip = super::parse(ctx, &mut item)?;
            Ok(Net { ip })
        }
    }
    let net: Net = from_str("ip = \"10.0.0.1\"\n").unwrap();
    assert_eq!(net.ip, std::net::Ipv4Addr::new(10, 0, 0, 1));

    let err = from_str::<Net>("ip = \"not an ip\"\n").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Custom(_)));
}

#[test]
fn nested_tables_decode() {
    #[derive(Debug)]
    struct Outer {
        server: Server,
    }
    impl Deserialize for Outer {
        fn deserialize(ctx: &mut Context, value: &mut Item) -> Result<Self, Error> {
            let mut th = TableHelper::new(ctx, value)?;
            Ok(Outer {
                server: th.required("server")?,
            })
        }
    }
    let outer: Outer = from_str("[server]\nhost = \"h\"\nport = 9\n").unwrap();
    assert_eq!(outer.server.port, 9);

    // Errors inside nested tables carry the full path.
    let err = from_str::<Outer>("[server]\nhost = \"h\"\nport = 70000\n").unwrap_err();
    assert_eq!(
        err.key.as_ref().map(|k| k.to_string()),
        Some("server.port".into())
    );
}
